//! Output capture - bounded log of the most recent lines a hosted
//! application wrote to stdout/stderr

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;

/// Default number of lines kept per process
pub const DEFAULT_LOG_CAPACITY: usize = 10;

/// Stream a captured line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStream {
    Stdout,
    Stderr,
}

impl LogStream {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogStream::Stdout => "stdout",
            LogStream::Stderr => "stderr",
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            LogStream::Stdout => "STDOUT",
            LogStream::Stderr => "STDERR",
        }
    }
}

/// A single captured line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,

    pub stream: LogStream,

    pub content: String,

    /// 1-based position in everything the process has written so far,
    /// including lines already evicted
    pub line_number: usize,
}

impl LogEntry {
    pub fn new(stream: LogStream, content: impl Into<String>, line_number: usize) -> Self {
        Self {
            timestamp: Utc::now(),
            stream,
            content: content.into(),
            line_number,
        }
    }
}

impl std::fmt::Display for LogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.stream.tag(), self.content)
    }
}

/// FIFO of the most recent captured lines
#[derive(Debug, Clone)]
pub struct OutputLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
    line_count: usize,
}

impl OutputLog {
    /// `capacity` is clamped to at least one line
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            line_count: 0,
        }
    }

    pub fn shared(capacity: usize) -> SharedOutputLog {
        Arc::new(Mutex::new(Self::new(capacity)))
    }

    /// Append a line, evicting the oldest once full
    pub fn push(&mut self, stream: LogStream, content: impl Into<String>) {
        self.line_count += 1;
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries
            .push_back(LogEntry::new(stream, content, self.line_count));
    }

    pub fn push_stdout(&mut self, content: impl Into<String>) {
        self.push(LogStream::Stdout, content);
    }

    pub fn push_stderr(&mut self, content: impl Into<String>) {
        self.push(LogStream::Stderr, content);
    }

    /// Last `n` entries, oldest first
    pub fn tail(&self, n: usize) -> Vec<LogEntry> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip).cloned().collect()
    }

    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total lines ever pushed
    pub fn line_count(&self) -> usize {
        self.line_count
    }
}

impl Default for OutputLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

/// Output log shared between the stream readers and the supervisor
pub type SharedOutputLog = Arc<Mutex<OutputLog>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_tail_order() {
        let mut log = OutputLog::new(10);
        log.push_stdout("one");
        log.push_stderr("two");
        log.push_stdout("three");

        let tail = log.tail(2);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].content, "two");
        assert_eq!(tail[0].stream, LogStream::Stderr);
        assert_eq!(tail[1].content, "three");
        assert_eq!(tail[1].stream, LogStream::Stdout);
    }

    #[test]
    fn test_eleventh_line_evicts_oldest() {
        let mut log = OutputLog::new(10);
        for i in 1..=10 {
            log.push_stdout(format!("line {}", i));
        }
        assert_eq!(log.len(), 10);

        log.push_stdout("line 11");
        assert_eq!(log.len(), 10);
        assert_eq!(log.line_count(), 11);
        let first = log.entries().next().unwrap();
        assert_eq!(first.content, "line 2");
        assert_eq!(first.line_number, 2);
    }

    #[test]
    fn test_never_exceeds_capacity() {
        let mut log = OutputLog::new(3);
        for i in 0..100 {
            log.push_stdout(i.to_string());
            assert!(log.len() <= 3);
        }
        let contents: Vec<_> = log.tail(10).into_iter().map(|e| e.content).collect();
        assert_eq!(contents, vec!["97", "98", "99"]);
    }

    #[test]
    fn test_tail_larger_than_log() {
        let mut log = OutputLog::new(10);
        log.push_stdout("only");
        assert_eq!(log.tail(5).len(), 1);
        assert!(log.tail(0).is_empty());
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let mut log = OutputLog::new(0);
        assert_eq!(log.capacity(), 1);
        log.push_stdout("a");
        log.push_stdout("b");
        assert_eq!(log.tail(5)[0].content, "b");
    }

    #[test]
    fn test_entry_display() {
        let entry = LogEntry::new(LogStream::Stderr, "boom", 1);
        assert_eq!(entry.to_string(), "[STDERR] boom");
    }
}
