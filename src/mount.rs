//! Filesystem mounting through `mount(2)`, and mount table inspection.
//!
//! `mount_fs` forwards its five parameters to the kernel unchanged: the flag word
//! is passed bit for bit and `None` data becomes a NULL pointer.
use std::ffi::{CStr, CString};
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::ptr;

use log::debug;

use crate::constants::PROC_SELF_MOUNTS;
use crate::types::errors::{Error, Result};
use crate::types::mount::MountFlags;

fn to_cstring(what: &str, bytes: &[u8]) -> Result<CString> {
    CString::new(bytes).map_err(|_| Error::InvalidArgument(format!("{what} contains a NUL byte")))
}

/// Mount `source` on `target`.
///
/// # Errors
///
/// Returns `Error::InvalidArgument` if a string argument contains a NUL byte (the
/// kernel is not called), or `Error::Mount` carrying the OS error on rejection.
pub fn try_mount_fs(
    source: &str,
    target: &Path,
    fstype: &str,
    flags: MountFlags,
    data: Option<&CStr>,
) -> Result<()> {
    let c_source = to_cstring("mount source", source.as_bytes())?;
    let c_target = to_cstring("mount target", target.as_os_str().as_bytes())?;
    let c_fstype = to_cstring("filesystem type", fstype.as_bytes())?;
    let c_data = data.map_or(ptr::null(), |d| d.as_ptr().cast::<libc::c_void>());

    // SAFETY: the three strings are NUL-terminated and outlive the call; the data
    // pointer is either NULL or a NUL-terminated string borrowed for the call.
    #[allow(unsafe_code)]
    let rc = unsafe {
        libc::mount(
            c_source.as_ptr(),
            c_target.as_ptr(),
            c_fstype.as_ptr(),
            flags.bits(),
            c_data,
        )
    };
    if rc < 0 {
        return Err(Error::Mount {
            device: source.to_string(),
            target: target.to_path_buf(),
            source: io::Error::last_os_error(),
        });
    }
    Ok(())
}

/// Mount `source` on `target`. Returns `true` if the mount was established.
///
/// Not idempotent: repeating an identical call fails or stacks a second mount,
/// depending on the filesystem.
#[must_use]
pub fn mount_fs(
    source: &str,
    target: &Path,
    fstype: &str,
    flags: MountFlags,
    data: Option<&CStr>,
) -> bool {
    match try_mount_fs(source, target, fstype, flags, data) {
        Ok(()) => true,
        Err(e) => {
            debug!("{e}");
            false
        }
    }
}

/// One line of the kernel's mount table.
///
/// Octal escapes (`\040` for a space) are decoded; the trailing dump and pass
/// columns are not kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    /// Mount source as the kernel reports it (device, `tmpfs`, `proc`, ...).
    pub source: String,
    /// Mount point.
    pub target: PathBuf,
    pub fstype: String,
    /// Comma-separated option list, split.
    pub options: Vec<String>,
}

/// Snapshot of a mount table in `/proc/self/mounts` format.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountTable {
    entries: Vec<MountEntry>,
}

/// The kernel escapes space, tab, newline and backslash as `\ooo`.
fn unescape_octal(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() {
            let digits = &bytes[i + 1..i + 4];
            if digits.iter().all(|b| (b'0'..=b'7').contains(b)) {
                let v = digits
                    .iter()
                    .fold(0u16, |acc, b| acc * 8 + u16::from(b - b'0'));
                if let Ok(v) = u8::try_from(v) {
                    out.push(v);
                    i += 4;
                    continue;
                }
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

impl MountTable {
    /// Parse mount table text. Lines with fewer than four fields are ignored.
    #[must_use]
    pub fn parse(content: &str) -> Self {
        let entries = content
            .lines()
            .filter_map(|line| {
                let mut parts = line.split_whitespace();
                let source = parts.next()?;
                let target = parts.next()?;
                let fstype = parts.next()?;
                let opts = parts.next()?;
                Some(MountEntry {
                    source: unescape_octal(source),
                    target: PathBuf::from(unescape_octal(target)),
                    fstype: unescape_octal(fstype),
                    options: opts.split(',').map(str::to_owned).collect(),
                })
            })
            .collect();
        Self { entries }
    }

    /// Read the mount table of the calling process.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if `/proc/self/mounts` cannot be read.
    pub fn read() -> Result<Self> {
        Self::read_from(Path::new(PROC_SELF_MOUNTS))
    }

    /// Read a mount table from an arbitrary file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the file cannot be read.
    pub fn read_from(path: &Path) -> Result<Self> {
        Ok(Self::parse(&std::fs::read_to_string(path)?))
    }

    #[must_use]
    pub fn entries(&self) -> &[MountEntry] {
        &self.entries
    }

    /// Number of mounts stacked on `target`.
    #[must_use]
    pub fn count_at(&self, target: &Path) -> usize {
        self.entries.iter().filter(|e| e.target == target).count()
    }
}

/// Source of truth for "is something mounted here".
pub trait MountInspector {
    /// Tell whether something is mounted on `target`.
    ///
    /// # Errors
    ///
    /// Returns an error if the mount table cannot be obtained.
    fn is_mounted(&self, target: &Path) -> Result<bool>;
}

/// Production inspector reading `/proc/self/mounts` on every query.
#[derive(Debug, Copy, Clone, Default)]
pub struct ProcMountsInspector;

impl MountInspector for ProcMountsInspector {
    fn is_mounted(&self, target: &Path) -> Result<bool> {
        // Canonicalize best-effort; the table stores resolved paths.
        let p = target.canonicalize().unwrap_or_else(|_| target.to_path_buf());
        Ok(MountTable::read()?.count_at(&p) > 0)
    }
}
