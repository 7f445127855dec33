/// All errors that can be returned by a `RemoteClient` implementation.
///
/// Every variant carries the store path of the failing call so that an
/// operator can tell how far a partially applied migration got.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The call did not complete: network failure, non-success HTTP
    /// status, or a backend refusing the request.
    #[error("transport error at '{path}': {message}")]
    Transport { path: String, message: String },

    /// The store answered but the body was not a JSON document.
    #[error("could not decode response for '{path}': {message}")]
    Decode { path: String, message: String },

    /// The path cannot address a node (forbidden characters in a key).
    #[error("invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },
}

impl StoreError {
    /// The store path the failing call targeted.
    pub fn path(&self) -> &str {
        match self {
            StoreError::Transport { path, .. }
            | StoreError::Decode { path, .. }
            | StoreError::InvalidPath { path, .. } => path,
        }
    }

    pub(crate) fn transport(path: &str, message: impl Into<String>) -> Self {
        StoreError::Transport {
            path: path.to_string(),
            message: message.into(),
        }
    }
}
