//! Shared crate-wide constants for initkit.
//!
//! Default locations consulted by the boot-time helpers. Every one of them can be
//! overridden through `config::Config`.

/// fstab file listing the filesystems mounted at boot.
pub const FSTAB_PATH: &str = "/etc/fstab";

/// File holding the hostname applied at boot.
pub const HOSTNAME_PATH: &str = "/etc/hostname";

/// Root of the per-kernel module trees. Default modules live under
/// `<MODULES_ROOT>/<sysname>-<release>/default/`.
pub const MODULES_ROOT: &str = "/lib/modules";

/// Name of the per-kernel subdirectory holding modules loaded at boot.
pub const DEFAULT_MODULES_DIR: &str = "default";

/// udev-style symlink directories used to resolve `LABEL=` and `UUID=` fstab sources.
pub const BY_LABEL_DIR: &str = "/dev/disk/by-label";
pub const BY_UUID_DIR: &str = "/dev/disk/by-uuid";

/// Mount table of the calling process.
pub const PROC_SELF_MOUNTS: &str = "/proc/self/mounts";

/// Subsystem name stamped on every emitted fact.
pub const FACTS_SUBSYSTEM: &str = "initkit";
