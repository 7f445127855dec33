use std::fmt;
use std::sync::Arc;

use crate::error::MigrationError;
use crate::routine::MigrationRoutine;
use crate::routines::{JavaProblemsUpgrade, SolutionsUpgrade};

/// Immutable, version-ordered set of migration routines.
///
/// Built once; routines are sorted ascending by version and no two share
/// a version.
#[derive(Clone, Default)]
pub struct Registry {
    routines: Vec<Arc<dyn MigrationRoutine>>,
}

impl Registry {
    pub fn new(mut routines: Vec<Arc<dyn MigrationRoutine>>) -> Result<Self, MigrationError> {
        routines.sort_by_key(|r| r.version());
        if let Some(pair) = routines
            .windows(2)
            .find(|pair| pair[0].version() == pair[1].version())
        {
            return Err(MigrationError::DuplicateVersion(pair[0].version()));
        }
        Ok(Registry { routines })
    }

    /// The routines shipped with this crate.
    pub fn standard() -> Self {
        Registry {
            routines: vec![Arc::new(SolutionsUpgrade), Arc::new(JavaProblemsUpgrade)],
        }
    }

    pub fn routines(&self) -> &[Arc<dyn MigrationRoutine>] {
        &self.routines
    }

    pub fn is_empty(&self) -> bool {
        self.routines.is_empty()
    }

    /// Routines with a version above `version`, lowest first.
    pub fn pending(&self, version: u32) -> Vec<&Arc<dyn MigrationRoutine>> {
        self.routines
            .iter()
            .filter(|r| r.version() > version)
            .collect()
    }

    /// The routine with the greatest version not above `version`.
    pub fn last_applied(&self, version: u32) -> Option<&Arc<dyn MigrationRoutine>> {
        self.routines.iter().rev().find(|r| r.version() <= version)
    }

    /// Highest registered version, or 0 for an empty registry.
    pub fn latest_version(&self) -> u32 {
        self.routines.last().map_or(0, |r| r.version())
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(
                self.routines
                    .iter()
                    .map(|r| format!("v{}: {}", r.version(), r.description())),
            )
            .finish()
    }
}
