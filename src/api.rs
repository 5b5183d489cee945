// Facade driving the boot-time steps and reporting each one as a fact.

use std::path::Path;

use log::Level;
use serde_json::json;
use uuid::Uuid;

use crate::config::Config;
use crate::fstab;
use crate::kmod;
use crate::logging::audit::AuditCtx;
use crate::logging::{now_iso, AuditSink, FactsEmitter, StageLogger, TS_ZERO};
use crate::mount::{MountInspector, ProcMountsInspector};
use crate::system::{self, UnameInfo};
use crate::types::errors::Result;
use crate::types::{ModuleReport, MountReport};

/// Init drives the boot-time steps (hostname, fstab mounts, default modules) and
/// reports each one as a fact through `E` and as a human-readable line through `A`.
///
/// Whether a mount target is already in use is decided by a [`MountInspector`],
/// `/proc/self/mounts` unless replaced with [`Init::with_mount_inspector`].
pub struct Init<E: FactsEmitter, A: AuditSink> {
    facts: E,
    audit: A,
    config: Config,
    inspector: Box<dyn MountInspector>,
    run_id: String,
    ts: String,
}

impl<E: FactsEmitter, A: AuditSink> Init<E, A> {
    /// Build a facade over `config`.
    ///
    /// The run id is a UUIDv5 of the fstab path and start time; with `redact` the
    /// start time is zeroed, so the id is stable across runs.
    pub fn new(facts: E, audit: A, config: Config) -> Self {
        let ts = if config.redact {
            TS_ZERO.to_string()
        } else {
            now_iso()
        };
        let seed = format!("initkit:{}:{ts}", config.fstab_path.display());
        let run_id = Uuid::new_v5(&Uuid::NAMESPACE_URL, seed.as_bytes()).to_string();
        Self {
            facts,
            audit,
            config,
            inspector: Box::new(ProcMountsInspector),
            run_id,
            ts,
        }
    }

    /// Replace the mount inspector consulted before each fstab mount.
    #[must_use]
    pub fn with_mount_inspector(mut self, inspector: Box<dyn MountInspector>) -> Self {
        self.inspector = inspector;
        self
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    fn ctx(&self) -> AuditCtx<'_> {
        AuditCtx::new(
            &self.facts as &dyn FactsEmitter,
            self.run_id.clone(),
            self.ts.clone(),
            self.config.redact,
        )
    }

    /// Apply the hostname file from the configuration.
    ///
    /// # Errors
    ///
    /// Returns the read or `sethostname` error; callers usually log and go on.
    pub fn set_hostname(&self) -> Result<String> {
        let ctx = self.ctx();
        let path = self.config.hostname_path.display().to_string();
        match system::set_hostname(&self.config.hostname_path) {
            Ok(name) => {
                StageLogger::new(&ctx)
                    .hostname()
                    .path(path)
                    .field("hostname", json!(name))
                    .emit_success();
                Ok(name)
            }
            Err(e) => {
                self.audit
                    .log(Level::Warn, &format!("Cannot set system's hostname: {e}"));
                StageLogger::new(&ctx).hostname().path(path).error(&e).emit_failure();
                Err(e)
            }
        }
    }

    /// Mount every automatic fstab entry in file order.
    ///
    /// Entries already mounted are skipped. With `fail_fast` the first failure is
    /// returned as an error; otherwise failures are collected in the report.
    ///
    /// # Errors
    ///
    /// Returns the fstab read error, or the first mount error under `fail_fast`.
    pub fn mount_fstab(&self) -> Result<MountReport> {
        let ctx = self.ctx();
        let slog = StageLogger::new(&ctx);
        let entries = fstab::parse(&self.config.fstab_path).map_err(|e| {
            self.audit
                .log(Level::Error, &format!("Failed to read the fstab file: {e}"));
            e
        })?;

        let mut report = MountReport::default();
        for entry in &entries {
            let target = entry.path().to_path_buf();
            let fields = json!({
                "source": entry.fs_spec.to_string(),
                "fstype": entry.fs_vfstype,
                "options": entry.fs_mntops.join(","),
            });
            if !entry.is_auto() || self.already_mounted(&target) {
                slog.mount()
                    .path(entry.fs_file.clone())
                    .merge(fields)
                    .emit_skip();
                report.skipped.push(target);
                continue;
            }

            self.audit
                .log(Level::Info, &format!("Mounting `{}`...", entry.fs_file));
            match entry.mount(&self.config) {
                Ok(()) => {
                    slog.mount()
                        .path(entry.fs_file.clone())
                        .merge(fields)
                        .emit_success();
                    report.mounted.push(target);
                }
                Err(e) => {
                    self.audit.log(
                        Level::Error,
                        &format!("Failed to mount `{}`: {e}", entry.fs_file),
                    );
                    slog.mount()
                        .path(entry.fs_file.clone())
                        .merge(fields)
                        .error(&e)
                        .emit_failure();
                    if self.config.fail_fast {
                        return Err(e);
                    }
                    report.failed.push((target, e.to_string()));
                }
            }
        }
        Ok(report)
    }

    /// An unreadable mount table counts as "not mounted": the mount is attempted
    /// and the kernel decides.
    fn already_mounted(&self, target: &Path) -> bool {
        match self.inspector.is_mounted(target) {
            Ok(mounted) => mounted,
            Err(e) => {
                self.audit.log(
                    Level::Warn,
                    &format!("Cannot tell whether `{}` is mounted: {e}", target.display()),
                );
                false
            }
        }
    }

    /// Load every module below `dir`.
    ///
    /// # Errors
    ///
    /// Returns the directory walk error, or the first load error under `fail_fast`.
    pub fn load_modules(&self, dir: &Path) -> Result<ModuleReport> {
        let ctx = self.ctx();
        let slog = StageLogger::new(&ctx);
        let mut report = ModuleReport::default();
        kmod::load_all_with(dir, &mut |p| {
            self.audit
                .log(Level::Info, &format!("Loading module `{}`...", p.display()));
            let path = p.display().to_string();
            match kmod::try_load_module(p) {
                Ok(()) => {
                    slog.module_load().path(path).emit_success();
                    report.loaded.push(p.to_path_buf());
                    Ok(())
                }
                Err(e) => {
                    slog.module_load().path(path).error(&e).emit_failure();
                    if self.config.fail_fast {
                        return Err(e);
                    }
                    report.failed.push((p.to_path_buf(), e.to_string()));
                    Ok(())
                }
            }
        })
        .map_err(|e| {
            self.audit
                .log(Level::Error, &format!("Failed to load modules: {e}"));
            e
        })?;
        Ok(report)
    }

    /// Load the default modules of the running kernel.
    ///
    /// # Errors
    ///
    /// See [`Init::load_modules`].
    pub fn load_default_modules(&self, uname: &UnameInfo) -> Result<ModuleReport> {
        self.load_modules(&kmod::default_modules_dir(&self.config, uname))
    }

    /// Run the boot sequence: hostname, fstab mounts, default modules.
    ///
    /// A hostname failure is reported and tolerated; the other steps are not.
    ///
    /// # Errors
    ///
    /// Returns the first error of `mount_fstab` or `load_default_modules`.
    pub fn boot(&self) -> Result<(MountReport, ModuleReport)> {
        let _ = self.set_hostname();
        let uname = UnameInfo::get();
        self.audit.log(
            Level::Info,
            &format!(
                "Booting system with {} kernel, release {}",
                uname.sysname, uname.release
            ),
        );
        let mounts = self.mount_fstab()?;
        let modules = self.load_default_modules(&uname)?;

        let ctx = self.ctx();
        let summary = StageLogger::new(&ctx).summary().merge(json!({
            "mounted": mounts.mounted.len(),
            "mount_skipped": mounts.skipped.len(),
            "mount_failed": mounts.failed.len(),
            "modules_loaded": modules.loaded.len(),
            "modules_failed": modules.failed.len(),
            "kernel": uname,
        }));
        if mounts.ok() && modules.ok() {
            summary.emit_success();
        } else {
            summary.emit_failure();
        }
        Ok((mounts, modules))
    }
}
