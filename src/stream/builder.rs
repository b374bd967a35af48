use super::classify::{classify, Classification, EventKey};
use crate::category::{Category, PairedStream};
use crate::config::EngineConfig;
use crate::matcher::{match_pairs, MatchOutcome, PairTracker};
use crate::record::DecodedEvent;
use serde::Serialize;
use std::collections::BTreeMap;

/// Storage for the accepted events of one key
///
/// Batch passes keep the full sequence and pair it at the end; streaming
/// passes pair as events arrive.
pub trait Bucket {
    fn open(stream: PairedStream) -> Self;
    fn push(&mut self, event: DecodedEvent);
    fn finish(self) -> MatchOutcome;
}

/// Ordered events of one key, in arrival order
#[derive(Debug, Clone)]
pub struct EventSequence {
    stream: PairedStream,
    events: Vec<DecodedEvent>,
}

impl EventSequence {
    pub fn events(&self) -> &[DecodedEvent] {
        &self.events
    }
}

impl Bucket for EventSequence {
    fn open(stream: PairedStream) -> Self {
        Self {
            stream,
            events: Vec::new(),
        }
    }

    fn push(&mut self, event: DecodedEvent) {
        self.events.push(event);
    }

    fn finish(self) -> MatchOutcome {
        match_pairs(
            &self.events,
            self.stream.enter_subtype(),
            self.stream.exit_subtype(),
        )
    }
}

/// Bucket that pairs on the fly and keeps only pending enters
#[derive(Debug, Clone)]
pub struct TrackedSequence(PairTracker);

impl Bucket for TrackedSequence {
    fn open(stream: PairedStream) -> Self {
        Self(PairTracker::new(stream.enter_subtype(), stream.exit_subtype()))
    }

    fn push(&mut self, event: DecodedEvent) {
        self.0.push(&event);
    }

    fn finish(self) -> MatchOutcome {
        self.0.finish()
    }
}

/// A bucket plus the bookkeeping the builder keeps for every key
#[derive(Debug, Clone)]
pub struct Slot<B> {
    pub bucket: B,
    pub events: usize,
    last_cycle: u64,
}

/// Records consumed per category
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategoryCounts {
    pub known: BTreeMap<Category, u64>,
    /// Records whose category code is not in the registry
    pub unknown: u64,
}

impl CategoryCounts {
    pub fn record(&mut self, code: u16) {
        match Category::from_code(code) {
            Some(category) => *self.known.entry(category).or_insert(0) += 1,
            None => self.unknown += 1,
        }
    }

    pub fn get(&self, category: Category) -> u64 {
        self.known.get(&category).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.known.values().sum::<u64>() + self.unknown
    }
}

/// Whether the pass should keep reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Halt,
}

/// Everything the builder collected in one pass
#[derive(Debug)]
pub struct BuiltStreams<B> {
    pub buckets: BTreeMap<(PairedStream, EventKey), Slot<B>>,
    /// All syscall records of the breakdown process, when configured
    pub timeline: Vec<DecodedEvent>,
    pub counts: CategoryCounts,
    /// Records consumed before the pass ended (the sentinel excluded)
    pub records: u64,
    /// Position of the sentinel record in the log, if one was reached
    pub sentinel_at: Option<u64>,
}

/// Routes accepted events to per-key buckets
#[derive(Debug)]
pub struct StreamBuilder<B> {
    config: EngineConfig,
    built: BuiltStreams<B>,
}

impl<B: Bucket> StreamBuilder<B> {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            built: BuiltStreams {
                buckets: BTreeMap::new(),
                timeline: Vec::new(),
                counts: CategoryCounts::default(),
                records: 0,
                sentinel_at: None,
            },
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_halted(&self) -> bool {
        self.built.sentinel_at.is_some()
    }

    /// Classify one event and file it under its key
    ///
    /// Returns [`Flow::Halt`] on the sentinel; every later call is ignored.
    pub fn push(&mut self, event: DecodedEvent) -> Flow {
        if self.is_halted() {
            return Flow::Halt;
        }

        let classification = classify(&event.id, &self.config);
        if classification == Classification::Sentinel {
            tracing::info!(
                record = self.built.records,
                cycle = event.cycle,
                "flush-trace sentinel reached, ending pass"
            );
            self.built.sentinel_at = Some(self.built.records);
            return Flow::Halt;
        }

        self.built.records += 1;
        self.built.counts.record(event.id.category);
        self.retain_for_breakdown(&event);

        if let Classification::Accepted { stream, key } = classification {
            let slot = self.built.buckets.entry((stream, key)).or_insert_with(|| {
                tracing::trace!(stream = stream.label(), ?key, "new event sequence");
                Slot {
                    bucket: B::open(stream),
                    events: 0,
                    last_cycle: 0,
                }
            });

            if slot.events > 0 && event.cycle < slot.last_cycle {
                tracing::debug!(
                    stream = stream.label(),
                    ?key,
                    previous = slot.last_cycle,
                    cycle = event.cycle,
                    "cycle counter went backwards within a sequence"
                );
            }
            slot.last_cycle = event.cycle;
            slot.events += 1;
            slot.bucket.push(event);
        }

        Flow::Continue
    }

    fn retain_for_breakdown(&mut self, event: &DecodedEvent) {
        let Some(breakdown) = &self.config.breakdown else {
            return;
        };
        if event.id.category == Category::Syscall.code()
            && event.id.pid == breakdown.pid
            && self.config.accepted_pids.contains(&event.id.pid)
        {
            self.built.timeline.push(*event);
        }
    }

    pub fn finish(self) -> BuiltStreams<B> {
        self.built
    }
}
