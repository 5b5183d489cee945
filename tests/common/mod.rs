//! Shared test helpers for the initkit integration tests.
#![allow(dead_code)]

use log::Level;
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};

use initkit::logging::{AuditSink, FactsEmitter};
use initkit::mount::MountInspector;

/// A simple in-memory emitter to capture facts during tests.
#[derive(Clone, Default, Debug)]
pub struct TestEmitter {
    pub events: Arc<Mutex<Vec<(String, String, String, Value)>>>,
}

impl FactsEmitter for TestEmitter {
    fn emit(&self, subsystem: &str, event: &str, decision: &str, fields: Value) {
        self.events
            .lock()
            .unwrap()
            .push((subsystem.into(), event.into(), decision.into(), fields));
    }
}

impl TestEmitter {
    /// (event, decision) pairs in emission order.
    pub fn decisions(&self) -> Vec<(String, String)> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(_, e, d, _)| (e.clone(), d.clone()))
            .collect()
    }
}

/// A no-op audit sink for tests.
#[derive(Clone, Default)]
pub struct TestAudit;

impl AuditSink for TestAudit {
    fn log(&self, _level: Level, _msg: &str) {}
}

/// Audit sink keeping every line it receives.
#[derive(Clone, Default)]
pub struct RecordingAudit {
    pub lines: Arc<Mutex<Vec<(Level, String)>>>,
}

impl AuditSink for RecordingAudit {
    fn log(&self, level: Level, msg: &str) {
        self.lines.lock().unwrap().push((level, msg.to_string()));
    }
}

impl RecordingAudit {
    pub fn warnings(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| *l == Level::Warn)
            .map(|(_, m)| m.clone())
            .collect()
    }
}

/// Inspector whose mount table is never readable.
pub struct UnreadableMounts;

impl MountInspector for UnreadableMounts {
    fn is_mounted(&self, _target: &Path) -> initkit::Result<bool> {
        Err(initkit::Error::Io(std::io::Error::from_raw_os_error(
            libc::EACCES,
        )))
    }
}

/// Inspector that reports nothing as mounted.
pub struct NothingMounted;

impl MountInspector for NothingMounted {
    fn is_mounted(&self, _target: &Path) -> initkit::Result<bool> {
        Ok(false)
    }
}

/// Number of open descriptors of this process.
pub fn open_fd_count() -> usize {
    std::fs::read_dir("/proc/self/fd").unwrap().count()
}

/// Scratch file whose content is not a loadable module.
pub fn garbage_image(dir: &Path) -> std::path::PathBuf {
    let p = dir.join("garbage.ko");
    std::fs::write(&p, b"\x7fELF but not really a kernel module").unwrap();
    p
}
