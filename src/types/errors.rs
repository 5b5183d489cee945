//! Error types used across initkit.
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure reasons surfaced by the widened (`try_*`) API.
///
/// The boolean wrappers collapse every variant into `false`.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot open module image `{}`: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("kernel rejected module: {source}")]
    Load {
        #[source]
        source: io::Error,
    },
    #[error("failed to mount `{device}` into `{}`: {source}", .target.display())]
    Mount {
        device: String,
        target: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    /// Stable identifier for this failure class.
    #[must_use]
    pub const fn id(&self) -> ErrorId {
        match self {
            Error::Open { .. } => ErrorId::E_OPEN,
            Error::Load { .. } => ErrorId::E_LOAD,
            Error::Mount { .. } => ErrorId::E_MOUNT,
            Error::InvalidArgument(_) => ErrorId::E_INVALID,
            Error::Io(_) => ErrorId::E_IO,
        }
    }

    /// The raw OS error code behind this failure, if there is one.
    #[must_use]
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Error::Open { source, .. } | Error::Load { source } | Error::Mount { source, .. } => {
                source.raw_os_error()
            }
            Error::Io(e) => e.raw_os_error(),
            Error::InvalidArgument(_) => None,
        }
    }
}

/// Convenient alias for results returning an initkit `Error`.
pub type Result<T> = std::result::Result<T, Error>;

// Emitted verbatim in facts, hence SCREAMING_SNAKE_CASE.
#[allow(non_camel_case_types)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorId {
    E_OPEN,
    E_LOAD,
    E_MOUNT,
    E_INVALID,
    E_IO,
}

#[must_use]
pub const fn id_str(id: ErrorId) -> &'static str {
    match id {
        ErrorId::E_OPEN => "E_OPEN",
        ErrorId::E_LOAD => "E_LOAD",
        ErrorId::E_MOUNT => "E_MOUNT",
        ErrorId::E_INVALID => "E_INVALID",
        ErrorId::E_IO => "E_IO",
    }
}
