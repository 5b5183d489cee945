use log::Level;
use serde_json::{json, Value};

/// Receiver of structured facts, one per boot step.
pub trait FactsEmitter {
    fn emit(&self, subsystem: &str, event: &str, decision: &str, fields: Value);
}

/// Receiver of human-readable progress lines.
pub trait AuditSink {
    fn log(&self, level: Level, msg: &str);
}

/// Default sink: facts become single-line JSON records on the `initkit::facts`
/// log target, audit lines go to the `log` facade at their own level.
#[derive(Default, Debug, Clone, Copy)]
pub struct JsonlSink;

impl FactsEmitter for JsonlSink {
    fn emit(&self, subsystem: &str, event: &str, decision: &str, fields: Value) {
        let line = json!({
            "subsystem": subsystem,
            "event": event,
            "decision": decision,
            "fields": fields,
        });
        log::info!(target: "initkit::facts", "{line}");
    }
}

impl AuditSink for JsonlSink {
    fn log(&self, level: Level, msg: &str) {
        log::log!(level, "{msg}");
    }
}
