//! Runtime configuration: input file locations and failure policy.
//!
//! Defaults come from `constants.rs`; `Config::rooted_at` re-bases every path
//! under another root.
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::constants::{BY_LABEL_DIR, BY_UUID_DIR, FSTAB_PATH, HOSTNAME_PATH, MODULES_ROOT};
use crate::types::errors::{Error, Result};

/// Config governs where the boot-time helpers look for their inputs and how the
/// `Init` facade reacts to failures.
///
/// Every field has a default, so a JSON file only needs the keys it overrides.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub fstab_path: PathBuf,
    pub hostname_path: PathBuf,
    pub modules_root: PathBuf,
    pub by_label_dir: PathBuf,
    pub by_uuid_dir: PathBuf,
    /// Stop at the first failed mount or module instead of carrying on.
    pub fail_fast: bool,
    /// Zero timestamps in emitted facts.
    pub redact: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fstab_path: PathBuf::from(FSTAB_PATH),
            hostname_path: PathBuf::from(HOSTNAME_PATH),
            modules_root: PathBuf::from(MODULES_ROOT),
            by_label_dir: PathBuf::from(BY_LABEL_DIR),
            by_uuid_dir: PathBuf::from(BY_UUID_DIR),
            fail_fast: true,
            redact: false,
        }
    }
}

impl Config {
    /// Load a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the file cannot be read, `Error::InvalidArgument` if
    /// it is not a valid configuration.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw)
            .map_err(|e| Error::InvalidArgument(format!("{}: {e}", path.display())))
    }

    /// Rebase every path below `root`, for running against a staged root filesystem.
    #[must_use]
    pub fn rooted_at(mut self, root: &Path) -> Self {
        for p in [
            &mut self.fstab_path,
            &mut self.hostname_path,
            &mut self.modules_root,
            &mut self.by_label_dir,
            &mut self.by_uuid_dir,
        ] {
            let rel = p
                .strip_prefix("/")
                .map_or_else(|_| p.clone(), Path::to_path_buf);
            *p = root.join(rel);
        }
        self
    }
}
