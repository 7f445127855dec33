use async_trait::async_trait;
use singpath_store::RemoteClient;

use crate::error::MigrationError;
use crate::options::MigrateOptions;

/// A versioned transformation of the remote data.
///
/// The client passed in is already bound to the store root and the
/// operator's credential.
///
/// ## Contract
///
/// - `upgrade` is only invoked while the stored version is below
///   `version()`, and resolves to `version()` on success.
/// - `revert` resolves to `version() - 1`. The default implementation
///   undoes nothing but the version number; routines with a definable
///   inverse transform override it.
/// - Any `Err` leaves the version counter where it was. Writes already
///   issued are not rolled back.
#[async_trait]
pub trait MigrationRoutine: Send + Sync {
    /// Schema version this routine upgrades to. Unique within a registry.
    fn version(&self) -> u32;

    /// One-line, human readable summary.
    fn description(&self) -> &str;

    async fn upgrade(
        &self,
        client: &dyn RemoteClient,
        options: &MigrateOptions,
    ) -> Result<u32, MigrationError>;

    async fn revert(
        &self,
        _client: &dyn RemoteClient,
        _options: &MigrateOptions,
    ) -> Result<u32, MigrationError> {
        Ok(self.version().saturating_sub(1))
    }
}
