use std::collections::VecDeque;

use chrono::{DateTime, Local};

/// Maximum number of retained event log entries.
pub const LOG_CAPACITY: usize = 30;

/// One operator-visible event line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub at: DateTime<Local>,
    pub text: String,
}

/// Bounded event log, newest entry first, feeding the operator report.
pub struct EventLog {
    entries: VecDeque<LogEntry>,
}

impl EventLog {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::with_capacity(LOG_CAPACITY + 1),
        }
    }

    /// Prepends an entry, dropping the oldest once capacity is reached.
    pub fn push(&mut self, at: DateTime<Local>, text: String) {
        self.entries.push_front(LogEntry { at, text });
        if self.entries.len() > LOG_CAPACITY {
            self.entries.pop_back();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates newest to oldest.
    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(second: u32) -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2026, 8, 23, 15, 0, second)
            .unwrap()
    }

    #[test]
    fn test_newest_first() {
        let mut log = EventLog::new();
        log.push(at(1), "first".to_string());
        log.push(at(2), "second".to_string());

        let texts: Vec<&str> = log.entries().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, ["second", "first"]);
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let mut log = EventLog::new();
        for i in 0..40u32 {
            log.push(at(i), format!("event {i}"));
            assert!(log.len() <= LOG_CAPACITY);
        }

        assert_eq!(log.len(), LOG_CAPACITY);
        assert_eq!(log.entries().next().map(|e| e.text.as_str()), Some("event 39"));
        assert_eq!(log.entries().last().map(|e| e.text.as_str()), Some("event 10"));
    }
}
