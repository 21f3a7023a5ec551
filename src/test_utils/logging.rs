//! Log capture for tests.
//!
//! [`capture_logs`] installs a subscriber for the duration of a closure on
//! the current thread only, so parallel tests never see each other's events.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;

const MAX_ENTRIES: usize = 1000;

/// A captured log event.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: Level,
    pub target: String,
    pub message: String,
    pub fields: Vec<(String, String)>,
}

impl LogEntry {
    #[must_use]
    pub fn new(level: Level, target: &str, message: &str) -> Self {
        Self {
            level,
            target: target.to_string(),
            message: message.to_string(),
            fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_field(mut self, key: &str, value: &str) -> Self {
        self.fields.push((key.to_string(), value.to_string()));
        self
    }

    /// Value of a structured field, as recorded.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Everything logged while a closure ran.
#[derive(Debug, Clone, Default)]
pub struct CapturedLogs {
    entries: Vec<LogEntry>,
}

impl CapturedLogs {
    #[must_use]
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    #[must_use]
    pub fn contains(&self, level: Level, message: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.level == level && e.message.contains(message))
    }

    #[must_use]
    pub fn has_warnings(&self) -> bool {
        self.entries.iter().any(|e| e.level == Level::WARN)
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|e| e.level == Level::ERROR)
    }

    #[must_use]
    pub fn filter_by_level(&self, level: Level) -> Vec<&LogEntry> {
        self.entries.iter().filter(|e| e.level == level).collect()
    }

    /// Human-readable dump for assertion messages.
    #[must_use]
    pub fn format_for_display(&self) -> String {
        if self.entries.is_empty() {
            return String::from("No logs captured");
        }
        let mut output = format!("Captured {} log entries:\n", self.entries.len());
        for entry in &self.entries {
            output.push_str(&format!("[{}] {}: {}\n", entry.level, entry.target, entry.message));
            for (key, value) in &entry.fields {
                output.push_str(&format!("    {key} = {value}\n"));
            }
        }
        output
    }
}

/// Layer that records events into shared storage.
struct CaptureLayer {
    storage: Arc<Mutex<Vec<LogEntry>>>,
}

impl<S> tracing_subscriber::Layer<S> for CaptureLayer
where
    S: tracing::Subscriber,
{
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        struct FieldVisitor<'a> {
            entry: &'a mut LogEntry,
        }

        impl tracing::field::Visit for FieldVisitor<'_> {
            fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
                if field.name() == "message" {
                    self.entry.message = value.to_string();
                } else {
                    self.entry.fields.push((field.name().to_string(), value.to_string()));
                }
            }

            fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
                let rendered = format!("{value:?}");
                if field.name() == "message" {
                    self.entry.message = rendered;
                } else {
                    self.entry.fields.push((field.name().to_string(), rendered));
                }
            }
        }

        let metadata = event.metadata();
        let mut entry = LogEntry::new(*metadata.level(), metadata.target(), "");
        event.record(&mut FieldVisitor { entry: &mut entry });

        let mut storage = self.storage.lock();
        if storage.len() < MAX_ENTRIES {
            storage.push(entry);
        }
    }
}

/// Run `f` with events at `level` and above captured.
pub fn capture_logs<R>(level: Level, f: impl FnOnce() -> R) -> (R, CapturedLogs) {
    let storage = Arc::new(Mutex::new(Vec::new()));
    let subscriber = tracing_subscriber::registry()
        .with(LevelFilter::from_level(level))
        .with(CaptureLayer {
            storage: storage.clone(),
        });
    let result = tracing::subscriber::with_default(subscriber, f);
    let entries = std::mem::take(&mut *storage.lock());
    (result, CapturedLogs { entries })
}

/// Assert that captured logs hold an event with this level and message.
#[macro_export]
macro_rules! assert_log_contains {
    ($logs:expr, $level:expr, $message:expr) => {{
        let logs = &$logs;
        assert!(
            logs.contains($level, $message),
            "Expected log with level {} containing '{}'\n{}",
            $level,
            $message,
            logs.format_for_display()
        );
    }};
}

/// Assert that no warnings or errors were captured.
#[macro_export]
macro_rules! assert_no_warnings {
    ($logs:expr) => {{
        let logs = &$logs;
        assert!(
            !logs.has_warnings() && !logs.has_errors(),
            "Expected no warnings but found some:\n{}",
            logs.format_for_display()
        );
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_message_and_fields() {
        let ((), logs) = capture_logs(Level::DEBUG, || {
            tracing::info!(entity = "teacher-1", removed = 3, "invalidated match cache");
        });
        assert_log_contains!(logs, Level::INFO, "invalidated match cache");
        let entry = &logs.entries()[0];
        assert_eq!(entry.field("entity"), Some("teacher-1"));
        assert_eq!(entry.field("removed"), Some("3"));
    }

    #[test]
    fn level_filter_applies() {
        let ((), logs) = capture_logs(Level::WARN, || {
            tracing::debug!("noise");
            tracing::warn!("dropping item");
        });
        assert_eq!(logs.entries().len(), 1);
        assert!(logs.has_warnings());
        assert_eq!(logs.filter_by_level(Level::DEBUG).len(), 0);
    }

    #[test]
    fn returns_closure_result() {
        let (value, logs) = capture_logs(Level::INFO, || 42);
        assert_eq!(value, 42);
        assert_no_warnings!(logs);
        assert_eq!(logs.format_for_display(), "No logs captured");
    }

    #[test]
    fn entry_builder() {
        let entry = LogEntry::new(Level::ERROR, "nexus_match::search", "cache write failed")
            .with_field("key", "matches:x");
        assert_eq!(entry.field("key"), Some("matches:x"));
        assert_eq!(entry.field("missing"), None);
    }
}
