//! Bounded status/log line buffer shown in the dashboard's log panel.
//!
//! Holds at most `capacity` lines; pushing onto a full buffer evicts the
//! oldest line first.

use std::collections::VecDeque;

/// Default number of retained lines.
pub const DEFAULT_LOG_CAPACITY: usize = bleach_core::config::DEFAULT_LOG_CAPACITY;

/// Ring buffer of display lines.
#[derive(Debug, Clone)]
pub struct LogBuffer {
    /// Lines, oldest first
    lines: VecDeque<String>,
    /// Maximum number of lines kept
    capacity: usize,
    /// Total lines ever pushed
    total_added: usize,
    /// Lines evicted by the capacity limit
    dropped_count: usize,
}

impl LogBuffer {
    /// Create a buffer holding at most `capacity` lines (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            lines: VecDeque::with_capacity(capacity.min(10_000)),
            capacity,
            total_added: 0,
            dropped_count: 0,
        }
    }

    /// Append a line, evicting the oldest if the buffer is full.
    pub fn push(&mut self, line: impl Into<String>) {
        if self.lines.len() >= self.capacity {
            self.lines.pop_front();
            self.dropped_count += 1;
        }
        self.lines.push_back(line.into());
        self.total_added += 1;
    }

    /// Drop every line. Counters are kept.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn total_added(&self) -> usize {
        self.total_added
    }

    pub fn dropped_count(&self) -> usize {
        self.dropped_count
    }

    /// Lines oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    /// The most recent `n` lines, oldest first.
    pub fn last_n(&self, n: usize) -> impl Iterator<Item = &str> {
        let skip = self.lines.len().saturating_sub(n);
        self.iter().skip(skip)
    }

    pub fn newest(&self) -> Option<&str> {
        self.lines.back().map(String::as_str)
    }

    /// Owned copy of the lines, oldest first.
    pub fn to_vec(&self) -> Vec<String> {
        self.lines.iter().cloned().collect()
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_buffer_new() {
        let buffer = LogBuffer::new(20);
        assert_eq!(buffer.capacity(), 20);
        assert!(buffer.is_empty());
        assert_eq!(LogBuffer::new(0).capacity(), 1);
    }

    #[test]
    fn test_log_buffer_capacity_limit() {
        let mut buffer = LogBuffer::new(3);
        for line in ["1", "2", "3"] {
            buffer.push(line);
        }
        assert_eq!(buffer.dropped_count(), 0);

        buffer.push("4");
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.total_added(), 4);
        assert_eq!(buffer.dropped_count(), 1);
        assert_eq!(buffer.to_vec(), vec!["2", "3", "4"]);
    }

    #[test]
    fn test_log_buffer_keeps_last_lines() {
        // Retained lines are always the last min(N, total) pushed
        for total in [0usize, 1, 19, 20, 21, 57] {
            let mut buffer = LogBuffer::new(20);
            for i in 0..total {
                buffer.push(format!("line {i}"));
            }
            let expected: Vec<String> = (total.saturating_sub(20)..total)
                .map(|i| format!("line {i}"))
                .collect();
            assert_eq!(buffer.to_vec(), expected, "total = {total}");
        }
    }

    #[test]
    fn test_log_buffer_last_n() {
        let mut buffer = LogBuffer::new(10);
        for i in 1..=5 {
            buffer.push(i.to_string());
        }
        assert_eq!(buffer.last_n(2).collect::<Vec<_>>(), vec!["4", "5"]);
        assert_eq!(buffer.last_n(10).count(), 5);
        assert_eq!(buffer.newest(), Some("5"));
    }

    #[test]
    fn test_log_buffer_clear_keeps_stats() {
        let mut buffer = LogBuffer::new(10);
        buffer.push("Test");
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.total_added(), 1);
    }
}
