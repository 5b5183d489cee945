//! Kernel identification and hostname helpers.
use std::ffi::CStr;
use std::io;
use std::path::Path;

use log::info;
use serde::Serialize;

use crate::types::errors::{Error, Result};

/// Identification of the running kernel, as returned by `uname(2)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnameInfo {
    pub sysname: String,
    pub nodename: String,
    pub release: String,
    pub version: String,
    pub machine: String,
}

fn lossy(s: &CStr) -> String {
    s.to_string_lossy().into_owned()
}

impl UnameInfo {
    #[must_use]
    pub fn get() -> Self {
        let u = rustix::system::uname();
        Self {
            sysname: lossy(u.sysname()),
            nodename: lossy(u.nodename()),
            release: lossy(u.release()),
            version: lossy(u.version()),
            machine: lossy(u.machine()),
        }
    }
}

/// Read a hostname file: first line, surrounding whitespace removed.
///
/// # Errors
///
/// Returns `Error::Io` if the file cannot be read, `Error::InvalidArgument` if it
/// holds no hostname.
pub fn read_hostname(path: &Path) -> Result<String> {
    let raw = std::fs::read_to_string(path)?;
    let name = raw.lines().next().unwrap_or("").trim();
    if name.is_empty() {
        return Err(Error::InvalidArgument(format!(
            "{}: empty hostname",
            path.display()
        )));
    }
    Ok(name.to_string())
}

/// Set the system hostname from the file at `path`.
///
/// Returns the hostname applied.
///
/// # Errors
///
/// Returns the read error, or `Error::Io` if the kernel refuses the name.
pub fn set_hostname(path: &Path) -> Result<String> {
    let name = read_hostname(path)?;
    rustix::system::sethostname(name.as_bytes())
        .map_err(|e| Error::Io(io::Error::from_raw_os_error(e.raw_os_error())))?;
    info!("Hostname set to `{name}`");
    Ok(name)
}
