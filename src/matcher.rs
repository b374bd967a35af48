//! Enter/exit pairing
//!
//! Every enter is paired with the nearest exit that follows it in the same
//! keyed sequence. Sequences are expected to alternate enter/exit strictly.
//! When they do not, two enters seen before one exit both pair with that
//! exit; nothing tries to reconstruct nesting.

use crate::record::DecodedEvent;

/// Samples produced from one keyed sequence
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchOutcome {
    /// `exit.cycle - enter.cycle` for every matched enter, in enter order
    pub samples: Vec<i64>,
    /// Enters with no exit after them
    pub unmatched_enters: usize,
}

/// Signed cycle delta between two stamps
pub fn cycle_delta(enter: u64, exit: u64) -> i64 {
    exit.wrapping_sub(enter) as i64
}

/// Pair the enters and exits of one keyed sequence
///
/// Scans with an index cursor. The exit cursor only moves forward: the
/// exit found for one enter is the nearest exit for every later enter
/// that still precedes it.
pub fn match_pairs(sequence: &[DecodedEvent], enter: u8, exit: u8) -> MatchOutcome {
    let mut outcome = MatchOutcome::default();
    let mut exit_cursor = 0;

    for (i, event) in sequence.iter().enumerate() {
        if event.id.subtype != enter {
            continue;
        }

        if exit_cursor <= i {
            exit_cursor = i + 1;
            while exit_cursor < sequence.len() && sequence[exit_cursor].id.subtype != exit {
                exit_cursor += 1;
            }
        }

        match sequence.get(exit_cursor) {
            Some(exit_event) => outcome
                .samples
                .push(cycle_delta(event.cycle, exit_event.cycle)),
            None => outcome.unmatched_enters += 1,
        }
    }

    outcome
}

/// Pairing state of a [`PairTracker`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerState {
    Idle,
    /// Enter cycles waiting for the next exit
    AwaitingExit(Vec<u64>),
}

/// Single-pass equivalent of [`match_pairs`]
///
/// Holds only the enters that have not seen an exit yet, so memory stays
/// bounded by the nesting depth instead of the sequence length.
#[derive(Debug, Clone)]
pub struct PairTracker {
    enter: u8,
    exit: u8,
    state: TrackerState,
    outcome: MatchOutcome,
}

impl PairTracker {
    pub fn new(enter: u8, exit: u8) -> Self {
        Self {
            enter,
            exit,
            state: TrackerState::Idle,
            outcome: MatchOutcome::default(),
        }
    }

    pub fn state(&self) -> &TrackerState {
        &self.state
    }

    /// Feed the next event of the keyed sequence
    pub fn push(&mut self, event: &DecodedEvent) {
        let subtype = event.id.subtype;
        if subtype == self.enter {
            match &mut self.state {
                TrackerState::Idle => self.state = TrackerState::AwaitingExit(vec![event.cycle]),
                TrackerState::AwaitingExit(pending) => pending.push(event.cycle),
            }
        } else if subtype == self.exit {
            if let TrackerState::AwaitingExit(pending) =
                std::mem::replace(&mut self.state, TrackerState::Idle)
            {
                self.outcome.samples.extend(
                    pending
                        .into_iter()
                        .map(|enter| cycle_delta(enter, event.cycle)),
                );
            }
        }
    }

    /// Close the sequence; enters still pending are counted as unmatched
    pub fn finish(mut self) -> MatchOutcome {
        if let TrackerState::AwaitingExit(pending) = self.state {
            self.outcome.unmatched_enters += pending.len();
        }
        self.outcome
    }
}
