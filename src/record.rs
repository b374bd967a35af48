//! Binary trace records and event-id bit layout
//!
//! A trace is a flat run of 16-byte little-endian records `(event_id, cycle)`
//! with no header, footer or checksum. The kernel packs the event id as:
//!
//! ```text
//!  63            44 43     36 35  32 31          16 15  12 11     0
//! ┌────────────────┬─────────┬──────┬──────────────┬──────┬────────┐
//! │  extra (high)  │   pid   │ hart │   category   │ sub  │ extra  │
//! └────────────────┴─────────┴──────┴──────────────┴──────┴────────┘
//! ```
//!
//! The two extra ranges stay in place, so a syscall number or a trap cause
//! with its interrupt bit set is recovered as one value.

use crate::error::Result;
use std::io::{ErrorKind, Read};

/// Size of one record on disk
pub const RECORD_SIZE: usize = 16;

const SUBTYPE_SHIFT: u32 = 12;
const CATEGORY_SHIFT: u32 = 16;
const HART_SHIFT: u32 = 32;
const PID_SHIFT: u32 = 36;

const SUBTYPE_MASK: u64 = 0xF;
const CATEGORY_MASK: u64 = 0xFFFF;
const HART_MASK: u64 = 0xF;
const PID_MASK: u64 = 0xFF;

/// Bits 0–11 and 44–63 of the event id
pub const EXTRA_MASK: u64 = 0xFFFF_F000_0000_0FFF;

/// One undecoded record as it appears in the log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawRecord {
    pub event_id: u64,
    pub cycle: u64,
}

impl RawRecord {
    /// Parse a record from its on-disk bytes
    pub fn from_bytes(bytes: &[u8; RECORD_SIZE]) -> Self {
        let (event_id, cycle) = bytes.split_at(8);
        let mut word = [0u8; 8];
        word.copy_from_slice(event_id);
        let event_id = u64::from_le_bytes(word);
        word.copy_from_slice(cycle);
        let cycle = u64::from_le_bytes(word);
        Self { event_id, cycle }
    }

    /// Encode the record as it would appear on disk
    pub fn to_bytes(&self) -> [u8; RECORD_SIZE] {
        let mut bytes = [0u8; RECORD_SIZE];
        bytes[..8].copy_from_slice(&self.event_id.to_le_bytes());
        bytes[8..].copy_from_slice(&self.cycle.to_le_bytes());
        bytes
    }

    pub fn decode(&self) -> DecodedEvent {
        DecodedEvent {
            id: EventId::decode(self.event_id),
            cycle: self.cycle,
        }
    }
}

/// The five fields packed into an event id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventId {
    /// 16-bit category code
    pub category: u16,
    /// 4-bit subtype within the category
    pub subtype: u8,
    /// 4-bit hart id
    pub hart: u8,
    /// 8-bit process id
    pub pid: u8,
    /// Payload (cause, syscall number, call id) with bits 12–43 cleared
    pub extra: u64,
}

impl EventId {
    /// Split an event id into its fields. Total over all 64-bit inputs.
    pub fn decode(event_id: u64) -> Self {
        Self {
            category: ((event_id >> CATEGORY_SHIFT) & CATEGORY_MASK) as u16,
            subtype: ((event_id >> SUBTYPE_SHIFT) & SUBTYPE_MASK) as u8,
            hart: ((event_id >> HART_SHIFT) & HART_MASK) as u8,
            pid: ((event_id >> PID_SHIFT) & PID_MASK) as u8,
            extra: event_id & EXTRA_MASK,
        }
    }

    /// Re-pack the fields. Out-of-range values are masked to their width.
    pub fn pack(&self) -> u64 {
        (self.extra & EXTRA_MASK)
            | ((self.subtype as u64 & SUBTYPE_MASK) << SUBTYPE_SHIFT)
            | ((self.category as u64 & CATEGORY_MASK) << CATEGORY_SHIFT)
            | ((self.hart as u64 & HART_MASK) << HART_SHIFT)
            | ((self.pid as u64 & PID_MASK) << PID_SHIFT)
    }
}

/// A decoded record: event fields plus the cycle counter it was stamped with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedEvent {
    pub id: EventId,
    pub cycle: u64,
}

impl DecodedEvent {
    pub fn new(id: EventId, cycle: u64) -> Self {
        Self { id, cycle }
    }

    pub fn to_raw(&self) -> RawRecord {
        RawRecord {
            event_id: self.id.pack(),
            cycle: self.cycle,
        }
    }
}

/// Iterator over the records of a trace stream
///
/// Ends at end of input. A trailing partial record is treated as end of
/// input, not as an error.
#[derive(Debug)]
pub struct RecordReader<R> {
    inner: R,
    records_read: u64,
    done: bool,
}

impl<R: Read> RecordReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            records_read: 0,
            done: false,
        }
    }

    /// Number of complete records yielded so far
    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    fn read_record(&mut self) -> Result<Option<RawRecord>> {
        let mut buf = [0u8; RECORD_SIZE];
        let mut filled = 0;

        while filled < RECORD_SIZE {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        if filled < RECORD_SIZE {
            if filled > 0 {
                tracing::debug!(
                    bytes = filled,
                    record = self.records_read,
                    "ignoring truncated trailing record"
                );
            }
            return Ok(None);
        }

        self.records_read += 1;
        Ok(Some(RawRecord::from_bytes(&buf)))
    }
}

impl<R: Read> Iterator for RecordReader<R> {
    type Item = Result<RawRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
