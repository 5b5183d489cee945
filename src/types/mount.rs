//! Data-only mount types used across the crate.
use std::ffi::CString;

bitflags::bitflags! {
    /// Flag word handed to `mount(2)`.
    ///
    /// Bits without a named constant are kept as-is; meanings are the kernel's.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MountFlags: libc::c_ulong {
        const RDONLY = libc::MS_RDONLY;
        const NOSUID = libc::MS_NOSUID;
        const NODEV = libc::MS_NODEV;
        const NOEXEC = libc::MS_NOEXEC;
        const SYNCHRONOUS = libc::MS_SYNCHRONOUS;
        const REMOUNT = libc::MS_REMOUNT;
        const MANDLOCK = libc::MS_MANDLOCK;
        const DIRSYNC = libc::MS_DIRSYNC;
        const NOATIME = libc::MS_NOATIME;
        const NODIRATIME = libc::MS_NODIRATIME;
        const BIND = libc::MS_BIND;
        const MOVE = libc::MS_MOVE;
        const REC = libc::MS_REC;
        const SILENT = libc::MS_SILENT;
        const UNBINDABLE = libc::MS_UNBINDABLE;
        const PRIVATE = libc::MS_PRIVATE;
        const SLAVE = libc::MS_SLAVE;
        const SHARED = libc::MS_SHARED;
        const RELATIME = libc::MS_RELATIME;
        const STRICTATIME = libc::MS_STRICTATIME;
        const LAZYTIME = libc::MS_LAZYTIME;

        const _ = !0;
    }
}

/// Mount options of an fstab entry, split into the kernel flag word and the
/// filesystem-specific remainder.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MountOptions {
    pub flags: MountFlags,
    /// Comma-joined options the kernel passes to the filesystem driver.
    pub data: Option<CString>,
}

impl Default for MountFlags {
    fn default() -> Self {
        MountFlags::empty()
    }
}
