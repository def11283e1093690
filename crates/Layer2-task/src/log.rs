//! Output Log - Real-time capture of external tool output
//!
//! Provides:
//! - Line-by-line streaming of stdout/stderr as it arrives
//! - Bounded history with structured entries
//! - Broadcast subscription for live viewers (terminal, editor panel)
//!
//! One `OutputLog` is created by whoever owns the runner and passed in
//! explicitly; there is no process-wide instance.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Maximum log entries kept in memory
const DEFAULT_MAX_ENTRIES: usize = 10000;

/// Broadcast channel capacity
const BROADCAST_CAPACITY: usize = 1000;

/// Log level for tool output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    /// Standard output
    Stdout,
    /// Standard error
    Stderr,
    /// System messages (start, exit, etc.)
    System,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Stdout => "stdout",
            LogLevel::Stderr => "stderr",
            LogLevel::System => "system",
        }
    }
}

/// A single log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Timestamp
    pub timestamp: DateTime<Utc>,

    /// Log level
    pub level: LogLevel,

    /// Operation that produced the line
    pub operation: String,

    /// Log content
    pub content: String,

    /// Line number across the whole log
    pub line_number: usize,
}

impl LogEntry {
    pub fn new(level: LogLevel, operation: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            operation: operation.into(),
            content: content.into(),
            line_number: 0,
        }
    }

    /// Format for display in a terminal / output panel
    pub fn format_line(&self) -> String {
        match self.level {
            LogLevel::Stdout => format!("[{}] {}", self.operation, self.content),
            LogLevel::Stderr => format!("[{}] [stderr] {}", self.operation, self.content),
            LogLevel::System => format!("[{}] -- {}", self.operation, self.content),
        }
    }
}

struct LogBuffer {
    entries: VecDeque<LogEntry>,
    line_count: usize,
}

/// Output log - the sink every tool invocation streams into
pub struct OutputLog {
    /// Display name (e.g. shown as the output panel title)
    name: String,

    buffer: Mutex<LogBuffer>,

    /// Real-time broadcast sender
    tx: broadcast::Sender<LogEntry>,
}

impl OutputLog {
    pub fn new(name: impl Into<String>) -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            name: name.into(),
            buffer: Mutex::new(LogBuffer {
                entries: VecDeque::new(),
                line_count: 0,
            }),
            tx,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a log entry
    pub fn push(&self, mut entry: LogEntry) {
        {
            let mut buffer = self.buffer.lock();
            buffer.line_count += 1;
            entry.line_number = buffer.line_count;

            if buffer.entries.len() >= DEFAULT_MAX_ENTRIES {
                buffer.entries.pop_front();
            }
            buffer.entries.push_back(entry.clone());
        }

        match entry.level {
            LogLevel::System => info!(operation = %entry.operation, "{}", entry.content),
            _ => debug!(
                operation = %entry.operation,
                stream = entry.level.as_str(),
                "{}",
                entry.content
            ),
        }

        // Send to real-time subscribers
        let _ = self.tx.send(entry);
    }

    /// Add stdout line
    pub fn push_stdout(&self, operation: &str, content: impl Into<String>) {
        self.push(LogEntry::new(LogLevel::Stdout, operation, content));
    }

    /// Add stderr line
    pub fn push_stderr(&self, operation: &str, content: impl Into<String>) {
        self.push(LogEntry::new(LogLevel::Stderr, operation, content));
    }

    /// Add system message
    pub fn push_system(&self, operation: &str, content: impl Into<String>) {
        self.push(LogEntry::new(LogLevel::System, operation, content));
    }

    /// Subscribe to real-time logs
    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.tx.subscribe()
    }

    /// Get all entries
    pub fn entries(&self) -> Vec<LogEntry> {
        self.buffer.lock().entries.iter().cloned().collect()
    }

    /// Entries produced by one operation
    pub fn for_operation(&self, operation: &str) -> Vec<LogEntry> {
        self.buffer
            .lock()
            .entries
            .iter()
            .filter(|e| e.operation == operation)
            .cloned()
            .collect()
    }
}

impl Default for OutputLog {
    fn default() -> Self {
        Self::new("flagbridge")
    }
}
