//! Structured logging interface (spec §6): "structured events with at
//! minimum `event, message, session_id?, status?`, plus arbitrary
//! key/value detail." Grounded on the teacher's `tracing`-based, field-
//! first logging throughout `core-new/src/infrastructure/jobs/manager.rs`
//! and `core-new/src/operations/indexing/phases/content.rs`; wrapped in a
//! trait so components can depend on an object instead of the global
//! subscriber, matching the "no global state" guidance of spec §9.

use std::fmt::Display;

pub trait EventLog: Send + Sync {
    fn event(&self, name: &str, session_id: Option<&str>, detail: &[(&str, &dyn Display)]);
    fn warn(&self, name: &str, session_id: Option<&str>, detail: &[(&str, &dyn Display)]);
    fn error(&self, name: &str, session_id: Option<&str>, detail: &[(&str, &dyn Display)]);
}

/// Production implementation: forwards to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventLog;

fn render(detail: &[(&str, &dyn Display)]) -> String {
    detail
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(" ")
}

impl EventLog for TracingEventLog {
    fn event(&self, name: &str, session_id: Option<&str>, detail: &[(&str, &dyn Display)]) {
        tracing::info!(event = name, session_id = session_id.unwrap_or(""), "{}", render(detail));
    }

    fn warn(&self, name: &str, session_id: Option<&str>, detail: &[(&str, &dyn Display)]) {
        tracing::warn!(event = name, session_id = session_id.unwrap_or(""), "{}", render(detail));
    }

    fn error(&self, name: &str, session_id: Option<&str>, detail: &[(&str, &dyn Display)]) {
        tracing::error!(event = name, session_id = session_id.unwrap_or(""), "{}", render(detail));
    }
}

/// Test double: collects every event so assertions can inspect them
/// (spec §9: "tests substitute a deterministic fake").
#[derive(Debug, Default)]
pub struct RecordingEventLog {
    pub events: std::sync::Mutex<Vec<(String, Option<String>, String)>>,
}

impl EventLog for RecordingEventLog {
    fn event(&self, name: &str, session_id: Option<&str>, detail: &[(&str, &dyn Display)]) {
        self.events.lock().unwrap().push((
            name.to_string(),
            session_id.map(str::to_string),
            render(detail),
        ));
    }

    fn warn(&self, name: &str, session_id: Option<&str>, detail: &[(&str, &dyn Display)]) {
        self.event(name, session_id, detail);
    }

    fn error(&self, name: &str, session_id: Option<&str>, detail: &[(&str, &dyn Display)]) {
        self.event(name, session_id, detail);
    }
}

impl RecordingEventLog {
    pub fn contains(&self, name: &str) -> bool {
        self.events.lock().unwrap().iter().any(|(n, _, _)| n == name)
    }

    pub fn count(&self, name: &str) -> usize {
        self.events.lock().unwrap().iter().filter(|(n, _, _)| n == name).count()
    }
}
