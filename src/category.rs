//! Category registry and the paired streams built from it
//!
//! The set of category codes is closed: the kernel only emits the eight
//! categories below. Only four of them carry enter/exit pairs that the
//! engine turns into latency samples.

use serde::{Deserialize, Serialize};

/// Event categories emitted by the kernel tracer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    STrap,
    Scheduler,
    UTrap,
    Syscall,
    SbiCall,
    SerialDriver,
    Plic,
    Misc,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::STrap,
        Category::Scheduler,
        Category::UTrap,
        Category::Syscall,
        Category::SbiCall,
        Category::SerialDriver,
        Category::Plic,
        Category::Misc,
    ];

    /// 16-bit code stored in bits 16–31 of the event id
    pub const fn code(self) -> u16 {
        match self {
            Category::STrap => 0x57AB,
            Category::Scheduler => 0x5CED,
            Category::UTrap => 0xC7AB,
            Category::Syscall => 0x575C,
            Category::SbiCall => 0x5B1C,
            Category::SerialDriver => 0x5E1A,
            Category::Plic => 0x911C,
            Category::Misc => 0x315C,
        }
    }

    pub fn from_code(code: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.code() == code)
    }
}

/// Subtype codes the classifier depends on
pub mod subtype {
    pub const S_TRAP_HANDLER: u8 = 0x2;
    pub const S_TRAP_RETURN: u8 = 0x3;

    pub const U_TRAP_HANDLER: u8 = 0x8;
    pub const U_TRAP_RETURN: u8 = 0x9;

    pub const SYSCALL_U_ENTER: u8 = 0x0;
    pub const SYSCALL_U_EXIT: u8 = 0x1;
    pub const SYSCALL_S_ENTER: u8 = 0x2;
    pub const SYSCALL_S_EXIT: u8 = 0x3;
    pub const SYSCALL_WRITE_FIND_FD: u8 = 0x4;
    pub const SYSCALL_WRITE_RES: u8 = 0x5;
    pub const SYSCALL_READ_FIND_FD: u8 = 0x6;
    pub const SYSCALL_READ_RES: u8 = 0x7;

    pub const SERIAL_CALL_ENTER: u8 = 0x2;
    pub const SERIAL_CALL_EXIT: u8 = 0x3;
}

/// Syscall payload that flushes the trace buffer and ends a capture
pub const FLUSH_TRACE_SYSCALL: u64 = 555;

/// How the records of a paired stream are grouped before the cause/id split
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grouping {
    ByHart,
    ByPid,
}

/// A category whose enter/exit events are paired into latency samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairedStream {
    /// Kernel trap handler enter → trap return, per hart
    STrap,
    /// User trap handler enter → return, per process
    UTrap,
    /// Syscall entry from user mode → return to user mode, per process
    Syscall,
    /// Serial driver call enter → exit, per process
    SerialCall,
}

impl PairedStream {
    pub const ALL: [PairedStream; 4] = [
        PairedStream::STrap,
        PairedStream::UTrap,
        PairedStream::Syscall,
        PairedStream::SerialCall,
    ];

    pub const fn category(self) -> Category {
        match self {
            PairedStream::STrap => Category::STrap,
            PairedStream::UTrap => Category::UTrap,
            PairedStream::Syscall => Category::Syscall,
            PairedStream::SerialCall => Category::SerialDriver,
        }
    }

    pub const fn enter_subtype(self) -> u8 {
        match self {
            PairedStream::STrap => subtype::S_TRAP_HANDLER,
            PairedStream::UTrap => subtype::U_TRAP_HANDLER,
            PairedStream::Syscall => subtype::SYSCALL_U_ENTER,
            PairedStream::SerialCall => subtype::SERIAL_CALL_ENTER,
        }
    }

    pub const fn exit_subtype(self) -> u8 {
        match self {
            PairedStream::STrap => subtype::S_TRAP_RETURN,
            PairedStream::UTrap => subtype::U_TRAP_RETURN,
            PairedStream::Syscall => subtype::SYSCALL_U_EXIT,
            PairedStream::SerialCall => subtype::SERIAL_CALL_EXIT,
        }
    }

    pub const fn grouping(self) -> Grouping {
        match self {
            PairedStream::STrap => Grouping::ByHart,
            _ => Grouping::ByPid,
        }
    }

    /// Whether `subtype` is one of this stream's enter/exit subtypes
    pub fn is_boundary(self, subtype: u8) -> bool {
        subtype == self.enter_subtype() || subtype == self.exit_subtype()
    }

    /// Short label used in reports
    pub const fn label(self) -> &'static str {
        match self {
            PairedStream::STrap => "s_trap",
            PairedStream::UTrap => "u_trap",
            PairedStream::Syscall => "syscall",
            PairedStream::SerialCall => "serial_call",
        }
    }
}
