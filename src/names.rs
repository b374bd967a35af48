//! Display names for categories, subtypes, trap causes and call ids
//!
//! Only renderers look names up. The engine runs the same with
//! [`NoNames`] as with [`KernelNames`].

use crate::category::{Category, PairedStream};

/// Read-only name lookup handed to renderers
pub trait NameTable {
    fn category(&self, code: u16) -> Option<&str>;
    fn subtype(&self, code: u16, subtype: u8) -> Option<&str>;
    /// Name of a cause/id within a paired stream
    fn id(&self, stream: PairedStream, id: u64) -> Option<&str>;
}

/// Table that knows no names
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNames;

impl NameTable for NoNames {
    fn category(&self, _code: u16) -> Option<&str> {
        None
    }

    fn subtype(&self, _code: u16, _subtype: u8) -> Option<&str> {
        None
    }

    fn id(&self, _stream: PairedStream, _id: u64) -> Option<&str> {
        None
    }
}

/// Names used by the instrumented kernel
#[derive(Debug, Clone, Copy, Default)]
pub struct KernelNames;

impl KernelNames {
    fn category_name(category: Category) -> &'static str {
        match category {
            Category::STrap => "S trap",
            Category::Scheduler => "scheduler",
            Category::UTrap => "U trap",
            Category::Syscall => "syscall",
            Category::SbiCall => "SBI call",
            Category::SerialDriver => "serial driver",
            Category::Plic => "PLIC",
            Category::Misc => "misc",
        }
    }

    fn subtype_name(category: Category, subtype: u8) -> Option<&'static str> {
        let name = match (category, subtype) {
            (Category::STrap, 0x0) => "stvec enter",
            (Category::STrap, 0x1) => "stvec restore",
            (Category::STrap, 0x2) => "trap handler",
            (Category::STrap, 0x3) => "trap return",
            (Category::STrap, 0x4) => "SEI enter",
            (Category::STrap, 0x5) => "SEI exit",

            (Category::Scheduler, 0x0) => "schedule",
            (Category::Scheduler, 0x1) => "run next",
            (Category::Scheduler, 0x2) => "suspend current",

            (Category::UTrap, 0x0) => "enable UEI enter",
            (Category::UTrap, 0x1) => "enable UEI exit",
            (Category::UTrap, 0x2) => "disable UEI enter",
            (Category::UTrap, 0x3) => "disable UEI exit",
            (Category::UTrap, 0x4) => "push trap record enter",
            (Category::UTrap, 0x5) => "push trap record exit",
            (Category::UTrap, 0x6) => "trap queue enter",
            (Category::UTrap, 0x7) => "trap queue exit",
            (Category::UTrap, 0x8) => "trap handler",
            (Category::UTrap, 0x9) => "trap return",
            (Category::UTrap, 0xA) => "UEI handler",
            (Category::UTrap, 0xB) => "USI handler",
            (Category::UTrap, 0xC) => "UTI handler",

            (Category::Syscall, 0x0) => "U enter",
            (Category::Syscall, 0x1) => "U exit",
            (Category::Syscall, 0x2) => "S enter",
            (Category::Syscall, 0x3) => "S exit",
            (Category::Syscall, 0x4) => "write find fd",
            (Category::Syscall, 0x5) => "write res",
            (Category::Syscall, 0x6) => "read find fd",
            (Category::Syscall, 0x7) => "read res",

            (Category::SbiCall, 0x0) => "send IPI enter",
            (Category::SbiCall, 0x1) => "send IPI exit",

            (Category::SerialDriver, 0x0) => "intr enter",
            (Category::SerialDriver, 0x1) => "intr exit",
            (Category::SerialDriver, 0x2) => "call enter",
            (Category::SerialDriver, 0x3) => "call exit",
            (Category::SerialDriver, 0x4) => "test enter",
            (Category::SerialDriver, 0x5) => "test exit",

            (Category::Plic, 0x0) => "claim",
            (Category::Plic, 0x1) => "complete enter",
            (Category::Plic, 0x2) => "complete exit",

            (Category::Misc, 0x0) => "trace test",
            _ => return None,
        };
        Some(name)
    }

    /// Trap cause name; causes with the interrupt bit set are >= 64
    pub fn trap_cause(cause: u64) -> Option<&'static str> {
        if cause < 64 {
            return match cause {
                0 => Some("Instruction Address Misaligned"),
                8 => Some("User Environment Call"),
                9 => Some("s-ecall"),
                11 => Some("m-ecall"),
                13 => Some("Load Page Fault"),
                15 => Some("Store Page Fault"),
                _ => None,
            };
        }
        match cause & 0xF {
            0 => Some("usi"),
            1 => Some("ssi"),
            2 => Some("hsi"),
            3 => Some("msi"),
            4 => Some("uti"),
            5 => Some("Supervisor Timer Interrupt"),
            6 => Some("hti"),
            7 => Some("mti"),
            8 => Some("User External Interrupt"),
            9 => Some("Supervisor External Interrupt"),
            10 => Some("hei"),
            11 => Some("mei"),
            _ => None,
        }
    }

    pub fn syscall(id: u64) -> Option<&'static str> {
        let name = match id {
            57 => "CLOSE",
            59 => "PIPE",
            63 => "READ",
            64 => "WRITE",
            93 => "EXIT",
            124 => "YIELD",
            140 => "SET_PRIORITY",
            169 => "GET_TIME",
            172 => "GETPID",
            215 => "MUNMAP",
            220 => "FORK",
            221 => "EXEC",
            222 => "MMAP",
            260 => "WAITPID",
            400 => "SPAWN",
            401 => "MAILREAD",
            402 => "MAILWRITE",
            555 => "FLUSH_TRACE",
            600 => "INIT_USER_TRAP",
            601 => "SEND_MSG",
            602 => "SET_TIMER",
            603 => "CLAIM_EXT_INT",
            604 => "SET_EXT_INT_ENABLE",
            _ => return None,
        };
        Some(name)
    }

    pub fn serial_call(id: u64) -> Option<&'static str> {
        match id {
            63 => Some("User Serial Read (Poll)"),
            64 => Some("User Serial Write (Poll)"),
            65 => Some("User Serial Read (Intr)"),
            66 => Some("User Serial Write (Intr)"),
            _ => None,
        }
    }
}

impl NameTable for KernelNames {
    fn category(&self, code: u16) -> Option<&str> {
        Category::from_code(code).map(Self::category_name)
    }

    fn subtype(&self, code: u16, subtype: u8) -> Option<&str> {
        Self::subtype_name(Category::from_code(code)?, subtype)
    }

    fn id(&self, stream: PairedStream, id: u64) -> Option<&str> {
        match stream {
            PairedStream::STrap | PairedStream::UTrap => Self::trap_cause(id),
            PairedStream::Syscall => Self::syscall(id),
            PairedStream::SerialCall => Self::serial_call(id),
        }
    }
}

/// Name of `id` in `stream`, or a numeric fallback when the table has none
pub fn describe_id(names: &dyn NameTable, stream: PairedStream, id: u64) -> String {
    match names.id(stream, id) {
        Some(name) => name.to_string(),
        None => match stream {
            PairedStream::STrap | PairedStream::UTrap => format!("cause {:#x}", id),
            PairedStream::Syscall => format!("syscall {}", id),
            PairedStream::SerialCall => format!("serial call {}", id),
        },
    }
}
