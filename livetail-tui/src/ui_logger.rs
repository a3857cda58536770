use log::{Level, Log, Metadata, Record};
use std::sync::{Arc, Mutex};

// keep the debug pane backlog bounded; old entries fall off the front
const MAX_ENTRIES: usize = 500;

/// Logger that collects formatted records into a shared vector so the
/// debug pane can render them without touching stdout.
pub struct UiLogger {
    entries: Arc<Mutex<Vec<String>>>,
}

impl UiLogger {
    pub fn new(entries: Arc<Mutex<Vec<String>>>) -> Self {
        Self { entries }
    }
}

impl Log for UiLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Debug
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let entry = format!("{:5} {}: {}", record.level(), record.target(), record.args());
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry);
            if entries.len() > MAX_ENTRIES {
                let excess = entries.len() - MAX_ENTRIES;
                entries.drain(..excess);
            }
        }
    }

    fn flush(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_line(logger: &UiLogger, message: &str) {
        logger.log(
            &Record::builder()
                .args(format_args!("{}", message))
                .level(Level::Debug)
                .target("test")
                .build(),
        );
    }

    #[test]
    fn test_entries_are_collected_in_order() {
        let entries = Arc::new(Mutex::new(Vec::new()));
        let logger = UiLogger::new(entries.clone());

        log_line(&logger, "first");
        log_line(&logger, "second");

        let collected = entries.lock().unwrap();
        assert_eq!(collected.len(), 2);
        assert!(collected[0].ends_with("first"));
        assert!(collected[1].ends_with("second"));
    }

    #[test]
    fn test_backlog_is_capped() {
        let entries = Arc::new(Mutex::new(Vec::new()));
        let logger = UiLogger::new(entries.clone());

        for i in 0..(MAX_ENTRIES + 25) {
            log_line(&logger, &format!("entry {}", i));
        }

        let collected = entries.lock().unwrap();
        assert_eq!(collected.len(), MAX_ENTRIES);
        assert!(collected[0].ends_with("entry 25"));
    }

    #[test]
    fn test_trace_is_filtered_out() {
        let entries = Arc::new(Mutex::new(Vec::new()));
        let logger = UiLogger::new(entries.clone());

        logger.log(
            &Record::builder()
                .args(format_args!("too chatty"))
                .level(Level::Trace)
                .target("test")
                .build(),
        );

        assert!(entries.lock().unwrap().is_empty());
    }
}
