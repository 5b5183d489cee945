#![deny(unsafe_code)]
//! initkit: kernel module loading and filesystem mounting for an init process.
//!
//! Leaf wrappers:
//! - `kmod::load_module_fd` / `kmod::load_module` call `finit_module(2)`.
//! - `mount::mount_fs` calls `mount(2)`.
//!
//! Each returns `bool`; the `try_*` twins return the OS error instead. Around them
//! sit fstab parsing, recursive module loading and the `Init` facade that runs the
//! boot steps and reports each one as a fact.
//!
//! Syscalls go through `rustix` except `mount(2)`, which needs the raw flag word
//! and a nullable data pointer and is the crate's only `unsafe` call.

pub mod api;
pub mod config;
pub mod constants;
pub mod fstab;
pub mod kmod;
pub mod logging;
pub mod mount;
pub mod system;
pub mod types;

pub use api::Init;
pub use config::Config;
pub use kmod::{load_module, load_module_fd, try_load_module, try_load_module_fd};
pub use mount::{mount_fs, try_mount_fs};
pub use types::errors::{Error, Result};
pub use types::mount::MountFlags;
