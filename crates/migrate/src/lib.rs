//! Versioned schema migrations for the SingPath document store.
//!
//! The store keeps a single schema version at `meta/version`. A [`Migrator`]
//! reads it, picks the next (or last applied) [`MigrationRoutine`] from an
//! ordered [`Registry`], runs it against a [`RemoteClient`], and records the
//! version the routine reports. Exactly one routine runs per call.
//!
//! Routines walk the `Path -> Level -> Problem` hierarchy strictly in
//! sequence, one remote call at a time. Nothing here is transactional
//! across calls: a failed run leaves the counter untouched and may leave
//! some nodes migrated, so routines overwrite rather than append wherever
//! they can.
//!
//! [`RemoteClient`]: singpath_store::RemoteClient

pub mod error;
pub mod migrator;
pub mod model;
pub mod options;
pub mod registry;
pub mod routine;
pub mod routines;

pub use error::MigrationError;
pub use migrator::{MigrationStatus, Migrator, RoutineSummary, VERSION_PATH};
pub use options::MigrateOptions;
pub use registry::Registry;
pub use routine::MigrationRoutine;
pub use routines::{is_wrapped_java_tests, wrap_java_tests, JavaProblemsUpgrade, SolutionsUpgrade};
