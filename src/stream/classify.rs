use crate::category::{Category, PairedStream, FLUSH_TRACE_SYSCALL};
use crate::config::EngineConfig;
use crate::record::EventId;
use serde::Serialize;

/// First half of a key: which hart or process a record belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Group {
    Hart(u8),
    Pid(u8),
}

impl Group {
    pub fn kind(&self) -> &'static str {
        match self {
            Group::Hart(_) => "hart",
            Group::Pid(_) => "pid",
        }
    }

    pub fn value(&self) -> u8 {
        match *self {
            Group::Hart(v) | Group::Pid(v) => v,
        }
    }
}

/// Grouping key of one event sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EventKey {
    pub group: Group,
    /// Trap cause, syscall number or serial call number
    pub id: u64,
}

impl EventKey {
    pub fn hart(hart: u8, id: u64) -> Self {
        Self {
            group: Group::Hart(hart),
            id,
        }
    }

    pub fn pid(pid: u8, id: u64) -> Self {
        Self {
            group: Group::Pid(pid),
            id,
        }
    }
}

/// What the classifier decided for one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Flush-trace syscall: the pass ends here
    Sentinel,
    /// Record belongs to a paired stream under `key`
    Accepted { stream: PairedStream, key: EventKey },
    /// Record takes no part in pairing
    Rejected,
}

/// Syscall record carrying the flush-trace number
pub fn is_sentinel(id: &EventId) -> bool {
    id.category == Category::Syscall.code() && id.extra == FLUSH_TRACE_SYSCALL
}

/// Apply the acceptance policy of the record's category
pub fn classify(id: &EventId, config: &EngineConfig) -> Classification {
    if is_sentinel(id) {
        return Classification::Sentinel;
    }

    let Some(stream) = PairedStream::ALL
        .into_iter()
        .find(|s| s.category().code() == id.category)
    else {
        return Classification::Rejected;
    };

    if !stream.is_boundary(id.subtype) {
        return Classification::Rejected;
    }

    let key = match stream {
        PairedStream::STrap => {
            if id.extra == config.excluded_s_trap_cause || !config.kernel_pids.contains(&id.pid) {
                return Classification::Rejected;
            }
            EventKey::hart(id.hart, id.extra)
        }
        PairedStream::UTrap | PairedStream::Syscall | PairedStream::SerialCall => {
            if !config.accepted_pids.contains(&id.pid) {
                return Classification::Rejected;
            }
            EventKey::pid(id.pid, id.extra)
        }
    };

    Classification::Accepted { stream, key }
}
