use std::path::PathBuf;

use serde::Serialize;

/// Outcome of mounting the fstab entries.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MountReport {
    pub mounted: Vec<PathBuf>,
    /// `noauto`, swap, or already-mounted entries.
    pub skipped: Vec<PathBuf>,
    /// Mount point and error text; only ever non-empty when `fail_fast` is off.
    pub failed: Vec<(PathBuf, String)>,
}

/// Outcome of loading a module directory.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ModuleReport {
    pub loaded: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

impl MountReport {
    #[must_use]
    pub fn ok(&self) -> bool {
        self.failed.is_empty()
    }
}

impl ModuleReport {
    #[must_use]
    pub fn ok(&self) -> bool {
        self.failed.is_empty()
    }
}
