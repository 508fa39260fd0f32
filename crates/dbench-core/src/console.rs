//! User-visible console log
//!
//! A bounded, append-only buffer of typed entries that every store writes
//! activity and failures into. This is the log the console panel renders;
//! diagnostic logging goes through `tracing` instead.

use std::collections::VecDeque;
use std::sync::Mutex;

/// Maximum number of entries retained; the oldest are evicted first.
pub const MAX_ENTRIES: usize = 500;

/// Severity/kind of a console entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleKind {
    Info,
    Success,
    Error,
    /// An echoed command, rendered with a `> ` marker
    Command,
}

/// A single immutable console line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleEntry {
    /// Wall-clock time the entry was created, `HH:MM:SS`
    pub time: String,
    pub kind: ConsoleKind,
    pub message: String,
}

/// Shared console buffer with FIFO eviction at [`MAX_ENTRIES`].
///
/// Entries are never mutated after insertion, only evicted. The lock is
/// held for single push/snapshot operations, never across awaits.
#[derive(Debug)]
pub struct ConsoleLog {
    entries: Mutex<VecDeque<ConsoleEntry>>,
    capacity: usize,
}

impl ConsoleLog {
    pub fn new() -> Self {
        Self::with_capacity(MAX_ENTRIES)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(MAX_ENTRIES))),
            capacity,
        }
    }

    fn push(&self, kind: ConsoleKind, message: impl Into<String>) {
        let entry = ConsoleEntry {
            time: chrono::Local::now().format("%H:%M:%S").to_string(),
            kind,
            message: message.into(),
        };

        let mut entries = self.entries.lock().expect("console lock poisoned");
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.push(ConsoleKind::Info, message);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.push(ConsoleKind::Success, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.push(ConsoleKind::Error, message);
    }

    /// Echo an executed command into the console
    pub fn command(&self, cmd: impl AsRef<str>) {
        self.push(ConsoleKind::Command, format!("> {}", cmd.as_ref()));
    }

    /// Remove all entries unconditionally
    pub fn clear(&self) {
        self.entries.lock().expect("console lock poisoned").clear();
    }

    /// Snapshot of the current entries, oldest first
    pub fn entries(&self) -> Vec<ConsoleEntry> {
        self.entries
            .lock()
            .expect("console lock poisoned")
            .iter()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("console lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ConsoleLog {
    fn default() -> Self {
        Self::new()
    }
}
