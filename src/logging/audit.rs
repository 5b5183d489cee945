// Fact emission for the boot steps driven by `Init`.
//
// Every fact carries the envelope `schema_version`, `ts`, `run_id`, `stage` and
// `decision`. With redaction on, timestamps are zeroed and volatile fields dropped.
use crate::constants::FACTS_SUBSYSTEM;
use crate::logging::{redact_event, FactsEmitter};
use crate::types::errors::{id_str, Error};
use serde_json::{json, Value};

pub(crate) const SCHEMA_VERSION: i64 = 1;

pub(crate) struct AuditCtx<'a> {
    pub facts: &'a dyn FactsEmitter,
    pub run_id: String,
    pub ts: String,
    pub redact: bool,
}

impl<'a> AuditCtx<'a> {
    pub(crate) fn new(facts: &'a dyn FactsEmitter, run_id: String, ts: String, redact: bool) -> Self {
        Self {
            facts,
            run_id,
            ts,
            redact,
        }
    }
}

/// Stage for typed audit emission.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Hostname,
    Mount,
    ModuleLoad,
    Summary,
}

impl Stage {
    #[must_use]
    pub fn as_event(&self) -> &'static str {
        match self {
            Stage::Hostname => "hostname",
            Stage::Mount => "mount",
            Stage::ModuleLoad => "module.load",
            Stage::Summary => "summary",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Success,
    Failure,
    Skip,
}

impl Decision {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Success => "success",
            Decision::Failure => "failure",
            Decision::Skip => "skip",
        }
    }
}

/// Builder facade over fact emission with centralized envelope and redaction.
pub struct StageLogger<'a> {
    ctx: &'a AuditCtx<'a>,
}

impl<'a> StageLogger<'a> {
    pub(crate) fn new(ctx: &'a AuditCtx<'a>) -> Self {
        Self { ctx }
    }

    pub fn hostname(&self) -> EventBuilder<'a> {
        EventBuilder::new(self.ctx, Stage::Hostname)
    }
    pub fn mount(&self) -> EventBuilder<'a> {
        EventBuilder::new(self.ctx, Stage::Mount)
    }
    pub fn module_load(&self) -> EventBuilder<'a> {
        EventBuilder::new(self.ctx, Stage::ModuleLoad)
    }
    pub fn summary(&self) -> EventBuilder<'a> {
        EventBuilder::new(self.ctx, Stage::Summary)
    }
}

pub struct EventBuilder<'a> {
    ctx: &'a AuditCtx<'a>,
    stage: Stage,
    fields: serde_json::Map<String, Value>,
}

impl<'a> EventBuilder<'a> {
    fn new(ctx: &'a AuditCtx<'a>, stage: Stage) -> Self {
        let mut fields = serde_json::Map::new();
        fields.insert("stage".to_string(), json!(stage.as_event()));
        Self { ctx, stage, fields }
    }

    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.fields.insert("path".into(), json!(path.into()));
        self
    }

    #[must_use]
    pub fn field(mut self, key: &str, value: Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }

    #[must_use]
    pub fn merge(mut self, extra: Value) -> Self {
        if let Value::Object(obj) = extra {
            self.fields.extend(obj);
        }
        self
    }

    /// Attach `error`, `error_id` and, when known, `errno`.
    #[must_use]
    pub fn error(mut self, e: &Error) -> Self {
        self.fields.insert("error".into(), json!(e.to_string()));
        self.fields.insert("error_id".into(), json!(id_str(e.id())));
        if let Some(errno) = e.raw_os_error() {
            self.fields.insert("errno".into(), json!(errno));
        }
        self
    }

    pub fn emit(self, decision: Decision) {
        let mut fields = Value::Object(self.fields);
        if let Some(obj) = fields.as_object_mut() {
            obj.insert("decision".into(), json!(decision.as_str()));
            obj.entry("schema_version").or_insert(json!(SCHEMA_VERSION));
            obj.entry("ts").or_insert(json!(self.ctx.ts));
            obj.entry("run_id").or_insert(json!(self.ctx.run_id));
            obj.entry("path").or_insert(json!(""));
        }
        let out = if self.ctx.redact {
            redact_event(fields)
        } else {
            fields
        };
        self.ctx
            .facts
            .emit(FACTS_SUBSYSTEM, self.stage.as_event(), decision.as_str(), out);
    }

    pub fn emit_success(self) {
        self.emit(Decision::Success);
    }
    pub fn emit_failure(self) {
        self.emit(Decision::Failure);
    }
    pub fn emit_skip(self) {
        self.emit(Decision::Skip);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Capture(RefCell<Vec<(String, String, Value)>>);

    impl FactsEmitter for Capture {
        fn emit(&self, _subsystem: &str, event: &str, decision: &str, fields: Value) {
            self.0
                .borrow_mut()
                .push((event.into(), decision.into(), fields));
        }
    }

    #[test]
    fn envelope_is_filled_in() {
        let cap = Capture::default();
        let ctx = AuditCtx::new(&cap, "run-1".into(), "2026-10-16T00:00:00Z".into(), false);
        StageLogger::new(&ctx).mount().path("/proc").emit_success();

        let events = cap.0.borrow();
        let (event, decision, f) = &events[0];
        assert_eq!(event, "mount");
        assert_eq!(decision, "success");
        assert_eq!(f["schema_version"], json!(1));
        assert_eq!(f["run_id"], json!("run-1"));
        assert_eq!(f["path"], json!("/proc"));
        assert_eq!(f["ts"], json!("2026-10-16T00:00:00Z"));
    }

    #[test]
    fn errors_carry_id_and_errno_unless_redacted() {
        let cap = Capture::default();
        let err = Error::Load {
            source: std::io::Error::from_raw_os_error(libc::ENOEXEC),
        };
        let ctx = AuditCtx::new(&cap, "r".into(), "2026-10-16T00:00:00Z".into(), false);
        StageLogger::new(&ctx).module_load().error(&err).emit_failure();
        let rctx = AuditCtx::new(&cap, "r".into(), "2026-10-16T00:00:00Z".into(), true);
        StageLogger::new(&rctx).module_load().error(&err).emit_failure();

        let events = cap.0.borrow();
        assert_eq!(events[0].2["error_id"], json!("E_LOAD"));
        assert_eq!(events[0].2["errno"], json!(libc::ENOEXEC));
        assert!(events[1].2.get("errno").is_none());
        assert_eq!(events[1].2["ts"], json!(crate::logging::TS_ZERO));
    }
}
