use serde_json::Value;
use singpath_store::StoreError;

/// Errors produced while selecting, running, or recording migrations.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    /// A remote call failed. Fatal to the running routine; surfaced
    /// exactly as the store reported it.
    #[error(transparent)]
    Transport(#[from] StoreError),

    /// A record does not have the shape a routine needs. Routines log and
    /// skip these; they never abort a run.
    #[error("malformed record at '{path}': {reason}")]
    MalformedRecord { path: String, reason: String },

    /// The version counter holds something other than a non-negative integer.
    #[error("invalid schema version at '{path}': {found}")]
    InvalidVersion { path: String, found: Value },

    /// Two routines claim the same version.
    #[error("duplicate migration routine for version {0}")]
    DuplicateVersion(u32),
}

impl MigrationError {
    pub(crate) fn malformed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        MigrationError::MalformedRecord {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
