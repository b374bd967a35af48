//! Syscall phase breakdown
//!
//! Splits one representative READ or WRITE syscall of a process into the
//! phases the kernel stamps along the way: kernel entry, fd lookup, result,
//! kernel exit and return to user mode. A call is representative when its
//! total latency falls strictly inside the configured window, which keeps
//! cold-cache and preempted calls out.

use crate::category::subtype;
use crate::config::BreakdownConfig;
use crate::matcher::cycle_delta;
use crate::record::DecodedEvent;
use serde::Serialize;
use std::collections::BTreeMap;

pub const SYSCALL_READ: u64 = 63;
pub const SYSCALL_WRITE: u64 = 64;

/// Point inside a syscall at which the kernel emits a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    KernelEnter,
    FindFd,
    Result,
    KernelExit,
    Exit,
}

/// Offsets, in cycles from the user-mode enter, of each phase of one call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseBreakdown {
    pub syscall: u64,
    pub enter_cycle: u64,
    pub phases: BTreeMap<Phase, i64>,
}

impl PhaseBreakdown {
    pub fn total(&self) -> Option<i64> {
        self.phases.get(&Phase::Exit).copied()
    }
}

/// Phase of `event` within a call to `syscall`, if it belongs to one
///
/// The fd-lookup and result records carry no syscall number; they are
/// attributed by their subtype, which differs between READ and WRITE.
fn phase_of(event: &DecodedEvent, syscall: u64) -> Option<Phase> {
    let id = &event.id;
    match id.subtype {
        subtype::SYSCALL_U_EXIT if id.extra == syscall => Some(Phase::Exit),
        subtype::SYSCALL_S_ENTER if id.extra == syscall => Some(Phase::KernelEnter),
        subtype::SYSCALL_S_EXIT if id.extra == syscall => Some(Phase::KernelExit),
        subtype::SYSCALL_WRITE_FIND_FD if syscall == SYSCALL_WRITE => Some(Phase::FindFd),
        subtype::SYSCALL_WRITE_RES if syscall == SYSCALL_WRITE => Some(Phase::Result),
        subtype::SYSCALL_READ_FIND_FD if syscall == SYSCALL_READ => Some(Phase::FindFd),
        subtype::SYSCALL_READ_RES if syscall == SYSCALL_READ => Some(Phase::Result),
        _ => None,
    }
}

/// First call to `syscall` in `timeline` whose latency is inside the window
pub fn find_representative(
    timeline: &[DecodedEvent],
    syscall: u64,
    min_cycles: i64,
    max_cycles: i64,
) -> Option<PhaseBreakdown> {
    for (i, enter) in timeline.iter().enumerate() {
        if enter.id.subtype != subtype::SYSCALL_U_ENTER || enter.id.extra != syscall {
            continue;
        }

        let mut phases = BTreeMap::new();
        for later in &timeline[i + 1..] {
            let Some(phase) = phase_of(later, syscall) else {
                continue;
            };
            let offset = cycle_delta(enter.cycle, later.cycle);
            phases.insert(phase, offset);

            if phase == Phase::Exit {
                if offset > min_cycles && offset < max_cycles {
                    return Some(PhaseBreakdown {
                        syscall,
                        enter_cycle: enter.cycle,
                        phases,
                    });
                }
                break;
            }
        }
    }
    None
}

/// Representative breakdown for every configured syscall that has one
pub fn breakdown(timeline: &[DecodedEvent], config: &BreakdownConfig) -> Vec<PhaseBreakdown> {
    config
        .syscalls
        .iter()
        .filter_map(|&syscall| {
            let found =
                find_representative(timeline, syscall, config.min_cycles, config.max_cycles);
            if found.is_none() {
                tracing::debug!(syscall, pid = config.pid, "no call inside breakdown window");
            }
            found
        })
        .collect()
}
