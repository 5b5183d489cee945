//! Kernel module loading through `finit_module(2)`.
//!
//! The boolean functions are the minimal surface: every kernel-side rejection
//! collapses to `false`. The `try_*` twins carry the underlying OS error.
//!
//! The descriptor form borrows the caller's handle and never closes it. The path
//! form owns the handle it opens; it is dropped (closed) on every exit path.
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use rustix::fd::{AsFd, BorrowedFd, OwnedFd};
use rustix::fs::{Mode, OFlags};
use rustix::io::Errno;

use crate::config::Config;
use crate::constants::DEFAULT_MODULES_DIR;
use crate::system::UnameInfo;
use crate::types::errors::{Error, Result};

fn errno_to_io(e: Errno) -> std::io::Error {
    std::io::Error::from_raw_os_error(e.raw_os_error())
}

/// Ask the kernel to load the module image behind `fd`, with an empty parameter
/// string and no flags.
///
/// The handle is not inspected beforehand; whether it is readable or a regular
/// file is for the kernel to decide.
///
/// # Errors
///
/// Returns `Error::Load` carrying the OS error when the kernel rejects the image.
pub fn try_load_module_fd(fd: BorrowedFd<'_>) -> Result<()> {
    rustix::system::finit_module(fd, Default::default(), 0).map_err(|e| Error::Load {
        source: errno_to_io(e),
    })
}

/// Load the module image behind `fd`. Returns `true` if the kernel accepted it.
///
/// `fd` stays open and owned by the caller whatever the outcome.
#[must_use]
pub fn load_module_fd(fd: BorrowedFd<'_>) -> bool {
    match try_load_module_fd(fd) {
        Ok(()) => true,
        Err(e) => {
            debug!("finit_module failed: {e}");
            false
        }
    }
}

fn open_image(path: &Path) -> Result<OwnedFd> {
    rustix::fs::open(path, OFlags::RDONLY | OFlags::CLOEXEC, Mode::empty()).map_err(|e| {
        Error::Open {
            path: path.to_path_buf(),
            source: errno_to_io(e),
        }
    })
}

/// Open `path` read-only and load the module image it holds.
///
/// When the open fails the load primitive is never invoked.
///
/// # Errors
///
/// Returns `Error::Open` when the image cannot be opened, `Error::Load` when the
/// kernel rejects it.
pub fn try_load_module(path: &Path) -> Result<()> {
    let fd = open_image(path)?;
    let res = try_load_module_fd(fd.as_fd());
    // Closed on success and on failure alike.
    drop(fd);
    res
}

/// Load the module image at `path`. Returns `true` if the kernel accepted it.
///
/// Open failures and load failures are both reported as `false`.
#[must_use]
pub fn load_module(path: &Path) -> bool {
    match try_load_module(path) {
        Ok(()) => true,
        Err(e) => {
            debug!("{e}");
            false
        }
    }
}

/// Load every regular file below `dir`, descending into subdirectories first as
/// they are met. Symlinks and special files are skipped.
///
/// Stops at the first failure. On success returns the paths loaded, in order.
///
/// # Errors
///
/// Returns `Error::Io` if a directory cannot be read, or the loading error of the
/// first module that fails.
pub fn load_all(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut loaded = Vec::new();
    load_all_with(dir, &mut |p| {
        info!("Loading module `{}`...", p.display());
        try_load_module(p)?;
        loaded.push(p.to_path_buf());
        Ok(())
    })?;
    Ok(loaded)
}

/// Walk `dir` like [`load_all`] but hand every module path to `load`.
///
/// # Errors
///
/// Returns `Error::Io` for unreadable directories, or the first error from `load`.
pub fn load_all_with<F>(dir: &Path, load: &mut F) -> Result<()>
where
    F: FnMut(&Path) -> Result<()>,
{
    let mut entries = fs::read_dir(dir)?.collect::<std::io::Result<Vec<_>>>()?;
    // read_dir order is filesystem-defined; sort for reproducible boots.
    entries.sort_by_key(fs::DirEntry::file_name);
    for entry in entries {
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            load_all_with(&path, load)?;
        } else if file_type.is_file() {
            load(&path)?;
        } else {
            warn!("Skipping `{}`: not a regular file", path.display());
        }
    }
    Ok(())
}

/// Directory holding the modules loaded at boot for the running kernel.
#[must_use]
pub fn default_modules_dir(config: &Config, uname: &UnameInfo) -> PathBuf {
    config
        .modules_root
        .join(format!("{}-{}", uname.sysname, uname.release))
        .join(DEFAULT_MODULES_DIR)
}

/// Load the default modules of the running kernel.
///
/// # Errors
///
/// Returns `Error::Io` if the default directory does not exist or cannot be read,
/// or the first module loading error.
pub fn load_default(config: &Config, uname: &UnameInfo) -> Result<Vec<PathBuf>> {
    load_all(&default_modules_dir(config, uname))
}
