//! Two-phase analysis pass over a trace stream
//!
//! Phase one reads and classifies every record into keyed buckets until end
//! of input or the flush-trace sentinel. Phase two pairs each bucket and
//! trims outliers, one key at a time.

use crate::breakdown::{breakdown, PhaseBreakdown};
use crate::category::PairedStream;
use crate::config::EngineConfig;
use crate::error::{Result, TraceError};
use crate::outlier::filter_outliers;
use crate::record::RecordReader;
use crate::stream::{Bucket, BuiltStreams, CategoryCounts, EventKey, EventSequence, Flow, StreamBuilder, TrackedSequence};
use std::collections::BTreeMap;
use std::io::Read;

/// Pairing result for one key
#[derive(Debug, Clone, PartialEq)]
pub struct KeyReport {
    /// Accepted records filed under the key
    pub events: usize,
    /// Every matched delta, in enter order
    pub raw: Vec<i64>,
    /// `raw` with outliers removed
    pub samples: Vec<i64>,
    pub unmatched_enters: usize,
}

/// All keys of one paired stream
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamReport {
    pub keys: BTreeMap<EventKey, KeyReport>,
}

impl StreamReport {
    pub fn get(&self, key: &EventKey) -> Option<&KeyReport> {
        self.keys.get(key)
    }

    /// Raw samples of every group merged per cause/id, then trimmed
    ///
    /// This is the per-cause view: hart 0 and hart 3 taking the same trap
    /// feed one distribution.
    pub fn by_id(&self, factor: f64) -> BTreeMap<u64, Vec<i64>> {
        let mut merged: BTreeMap<u64, Vec<i64>> = BTreeMap::new();
        for (key, report) in &self.keys {
            merged.entry(key.id).or_default().extend(&report.raw);
        }
        merged
            .into_iter()
            .map(|(id, raw)| (id, filter_outliers(&raw, factor)))
            .collect()
    }

    pub fn unmatched_enters(&self) -> usize {
        self.keys.values().map(|k| k.unmatched_enters).sum()
    }
}

/// Output of one pass, read-only for renderers and loaders
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub streams: BTreeMap<PairedStream, StreamReport>,
    pub counts: CategoryCounts,
    /// Records consumed, the sentinel excluded
    pub records: u64,
    /// Index of the sentinel record, if the pass stopped on one
    pub sentinel_at: Option<u64>,
    pub breakdown: Vec<PhaseBreakdown>,
    pub outlier_factor: f64,
}

impl Analysis {
    pub fn stream(&self, stream: PairedStream) -> Option<&StreamReport> {
        self.streams.get(&stream)
    }

    /// Trimmed samples of one key
    pub fn samples(&self, stream: PairedStream, key: &EventKey) -> Option<&[i64]> {
        self.stream(stream)?.get(key).map(|k| k.samples.as_slice())
    }
}

/// Decode → classify → build → pair → trim
#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate().map_err(TraceError::InvalidConfig)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Batch pass: build every sequence, then pair
    pub fn run<R: Read>(&self, input: R) -> Result<Analysis> {
        self.pass::<EventSequence, R>(input)
    }

    /// Single pass keeping only pending enters per key
    ///
    /// Produces the same [`Analysis`] as [`Engine::run`].
    pub fn run_streaming<R: Read>(&self, input: R) -> Result<Analysis> {
        self.pass::<TrackedSequence, R>(input)
    }

    fn pass<B: Bucket, R: Read>(&self, input: R) -> Result<Analysis> {
        let mut builder = StreamBuilder::<B>::new(self.config.clone());
        for record in RecordReader::new(input) {
            if builder.push(record?.decode()) == Flow::Halt {
                break;
            }
        }
        let built = builder.finish();
        tracing::debug!(
            records = built.records,
            keys = built.buckets.len(),
            "classification finished"
        );
        Ok(self.correlate(built))
    }

    fn correlate<B: Bucket>(&self, built: BuiltStreams<B>) -> Analysis {
        let factor = self.config.outlier_factor;
        let mut streams: BTreeMap<PairedStream, StreamReport> = BTreeMap::new();

        for ((stream, key), slot) in built.buckets {
            let outcome = slot.bucket.finish();
            let samples = filter_outliers(&outcome.samples, factor);
            if outcome.unmatched_enters > 0 {
                tracing::debug!(
                    stream = stream.label(),
                    ?key,
                    unmatched = outcome.unmatched_enters,
                    "enters without exit dropped"
                );
            }
            streams.entry(stream).or_default().keys.insert(
                key,
                KeyReport {
                    events: slot.events,
                    raw: outcome.samples,
                    samples,
                    unmatched_enters: outcome.unmatched_enters,
                },
            );
        }

        let breakdown = self
            .config
            .breakdown
            .as_ref()
            .map(|cfg| breakdown(&built.timeline, cfg))
            .unwrap_or_default();

        Analysis {
            streams,
            counts: built.counts,
            records: built.records,
            sentinel_at: built.sentinel_at,
            breakdown,
            outlier_factor: factor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Category;
    use crate::config::BreakdownConfig;
    use crate::record::{EventId, RawRecord};

    fn eid(category: Category, subtype: u8, hart: u8, pid: u8, extra: u64) -> u64 {
        EventId {
            category: category.code(),
            subtype,
            hart,
            pid,
            extra,
        }
        .pack()
    }

    fn log(records: &[(u64, u64)]) -> Vec<u8> {
        records
            .iter()
            .flat_map(|&(event_id, cycle)| RawRecord { event_id, cycle }.to_bytes())
            .collect()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = EngineConfig {
            outlier_factor: f64::INFINITY,
            ..EngineConfig::default()
        };
        assert!(matches!(Engine::new(config), Err(TraceError::InvalidConfig(_))));
    }

    #[test]
    fn test_two_harts_do_not_cross_contaminate() {
        let cause = 5;
        let bytes = log(&[
            (eid(Category::STrap, 2, 0, 3, cause), 10),
            (eid(Category::STrap, 2, 1, 3, cause), 12),
            (eid(Category::STrap, 3, 1, 3, cause), 33),
            (eid(Category::STrap, 3, 0, 3, cause), 40),
        ]);
        let engine = Engine::new(EngineConfig::default()).unwrap();
        let analysis = engine.run(bytes.as_slice()).unwrap();

        assert_eq!(
            analysis.samples(PairedStream::STrap, &EventKey::hart(0, cause)),
            Some(&[30][..])
        );
        assert_eq!(
            analysis.samples(PairedStream::STrap, &EventKey::hart(1, cause)),
            Some(&[21][..])
        );
        let by_id = analysis.stream(PairedStream::STrap).unwrap().by_id(2.0);
        assert_eq!(by_id[&cause], vec![30, 21]);
    }

    #[test]
    fn test_sentinel_stops_the_pass() {
        let bytes = log(&[
            (eid(Category::Syscall, 0, 0, 4, 64), 100),
            (eid(Category::Syscall, 0, 0, 4, 555), 120),
            (eid(Category::Syscall, 1, 0, 4, 64), 150),
            (eid(Category::Misc, 0, 0, 3, 0), 160),
        ]);
        let engine = Engine::new(EngineConfig::default()).unwrap();
        let analysis = engine.run(bytes.as_slice()).unwrap();

        assert_eq!(analysis.records, 1);
        assert_eq!(analysis.sentinel_at, Some(1));
        assert_eq!(analysis.counts.get(Category::Misc), 0);
        let key = analysis
            .stream(PairedStream::Syscall)
            .unwrap()
            .get(&EventKey::pid(4, 64))
            .unwrap();
        assert!(key.raw.is_empty());
        assert_eq!(key.unmatched_enters, 1);
    }

    #[test]
    fn test_outliers_trimmed_per_key() {
        let mut records = Vec::new();
        for (i, delta) in [10u64, 11, 12, 13, 500].iter().enumerate() {
            let start = 1_000 * i as u64;
            records.push((eid(Category::SerialDriver, 2, 0, 6, 64), start));
            records.push((eid(Category::SerialDriver, 3, 0, 6, 64), start + delta));
        }
        let engine = Engine::new(EngineConfig::default()).unwrap();
        let analysis = engine.run(log(&records).as_slice()).unwrap();
        let key = analysis
            .stream(PairedStream::SerialCall)
            .unwrap()
            .get(&EventKey::pid(6, 64))
            .unwrap();
        assert_eq!(key.raw, vec![10, 11, 12, 13, 500]);
        assert_eq!(key.samples, vec![10, 11, 12, 13]);
        assert_eq!(key.events, 10);
    }

    #[test]
    fn test_streaming_matches_batch() {
        let bytes = log(&[
            (eid(Category::UTrap, 8, 0, 5, 4), 0),
            (eid(Category::UTrap, 8, 0, 5, 4), 5),
            (eid(Category::Syscall, 0, 1, 5, 63), 6),
            (eid(Category::UTrap, 9, 0, 5, 4), 20),
            (eid(Category::Syscall, 1, 1, 5, 63), 30),
            (eid(Category::UTrap, 8, 0, 5, 4), 40),
        ]);
        let engine = Engine::new(EngineConfig::default()).unwrap();
        let batch = engine.run(bytes.as_slice()).unwrap();
        let streamed = engine.run_streaming(bytes.as_slice()).unwrap();
        assert_eq!(batch, streamed);
        let u_trap = batch
            .stream(PairedStream::UTrap)
            .unwrap()
            .get(&EventKey::pid(5, 4))
            .unwrap();
        assert_eq!(u_trap.raw, vec![20, 15]);
        assert_eq!(u_trap.unmatched_enters, 1);
    }

    #[test]
    fn test_empty_input() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        let analysis = engine.run(&[][..]).unwrap();
        assert!(analysis.streams.is_empty());
        assert_eq!(analysis.records, 0);
        assert_eq!(analysis.sentinel_at, None);
    }

    #[test]
    fn test_breakdown_included_when_configured() {
        let config = EngineConfig {
            breakdown: Some(BreakdownConfig::for_pid(4)),
            ..EngineConfig::default()
        };
        let bytes = log(&[
            (eid(Category::Syscall, 0, 0, 4, 64), 0),
            (eid(Category::Syscall, 2, 0, 4, 64), 500),
            (eid(Category::Syscall, 3, 0, 4, 64), 29_000),
            (eid(Category::Syscall, 1, 0, 4, 64), 30_000),
        ]);
        let analysis = Engine::new(config).unwrap().run(bytes.as_slice()).unwrap();
        assert_eq!(analysis.breakdown.len(), 1);
        assert_eq!(analysis.breakdown[0].total(), Some(30_000));
    }
}
