// Integration test utilities
//
// Builders for binary trace logs shaped like the ones the kernel writes.

#![allow(dead_code)]

use hartrace::category::Category;
use hartrace::record::{EventId, RawRecord};
use std::io::Write;
use tempfile::NamedTempFile;

/// Pack an event id from its fields
pub fn eid(category: Category, subtype: u8, hart: u8, pid: u8, extra: u64) -> u64 {
    EventId {
        category: category.code(),
        subtype,
        hart,
        pid,
        extra,
    }
    .pack()
}

/// In-memory trace log
#[derive(Debug, Default, Clone)]
pub struct TraceLog {
    bytes: Vec<u8>,
}

impl TraceLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(mut self, event_id: u64, cycle: u64) -> Self {
        self.bytes
            .extend_from_slice(&RawRecord { event_id, cycle }.to_bytes());
        self
    }

    pub fn event(self, category: Category, subtype: u8, hart: u8, pid: u8, extra: u64, cycle: u64) -> Self {
        self.record(eid(category, subtype, hart, pid, extra), cycle)
    }

    /// Flush-trace syscall that ends the pass
    pub fn sentinel(self, cycle: u64) -> Self {
        self.event(Category::Syscall, 0, 0, 4, 555, cycle)
    }

    /// Trailing bytes that do not form a full record
    pub fn partial(mut self, len: usize) -> Self {
        self.bytes.extend(std::iter::repeat(0xAB).take(len));
        self
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Write the log to a temporary file
    pub fn to_file(&self) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp trace");
        file.write_all(&self.bytes).expect("Failed to write temp trace");
        file.flush().expect("Failed to flush temp trace");
        file
    }
}

/// Hart 0 and hart 1 taking the same kernel trap at overlapping times
pub fn two_hart_trace(cause: u64) -> TraceLog {
    TraceLog::new()
        .event(Category::STrap, 2, 0, 3, cause, 10)
        .event(Category::STrap, 2, 1, 3, cause, 12)
        .event(Category::STrap, 3, 1, 3, cause, 33)
        .event(Category::STrap, 3, 0, 3, cause, 40)
}
