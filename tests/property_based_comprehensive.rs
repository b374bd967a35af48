//! Comprehensive property-based tests for hartrace
//!
//! Core features tested:
//! 1. Event id decoding and packing
//! 2. Record reading over arbitrary bytes
//! 3. Enter/exit pairing, batch and streaming
//! 4. IQR outlier trimming
//! 5. Category accounting

mod utils;

use hartrace::category::Category;
use hartrace::config::EngineConfig;
use hartrace::engine::Engine;
use hartrace::matcher::{match_pairs, PairTracker};
use hartrace::outlier::{filter_outliers, percentile};
use hartrace::record::{DecodedEvent, EventId, RecordReader, RECORD_SIZE};
use proptest::prelude::*;
use utils::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_event_id_pack_is_inverse_of_decode(raw in any::<u64>()) {
        prop_assert_eq!(EventId::decode(raw).pack(), raw);
    }

    #[test]
    fn prop_decoded_fields_fit_their_widths(raw in any::<u64>()) {
        let id = EventId::decode(raw);
        prop_assert!(id.subtype < 16);
        prop_assert!(id.hart < 16);
        prop_assert_eq!(id.extra & !hartrace::record::EXTRA_MASK, 0);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_reader_yields_whole_records(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let mut reader = RecordReader::new(bytes.as_slice());
        let mut count = 0usize;
        for record in reader.by_ref() {
            prop_assert!(record.is_ok());
            count += 1;
        }
        prop_assert_eq!(count, bytes.len() / RECORD_SIZE);
        prop_assert_eq!(reader.records_read(), count as u64);
    }

    #[test]
    fn prop_engine_never_panics_on_arbitrary_bytes(bytes in prop::collection::vec(any::<u8>(), 0..1024)) {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        let analysis = engine.run(bytes.as_slice()).unwrap();
        prop_assert!(analysis.records <= (bytes.len() / RECORD_SIZE) as u64);
        // Sentinel record is never counted
        prop_assert_eq!(analysis.counts.total(), analysis.records);
    }
}

/// Strategy for one record of a small, realistic log
fn arb_event() -> impl Strategy<Value = (usize, u8, u8, u8, u64, u64)> {
    (
        0usize..4,          // stream category
        0u8..4,             // subtype, boundaries and a non-boundary
        0u8..4,             // hart
        prop::sample::select(vec![3u8, 4, 5, 9]),
        prop::sample::select(vec![5u64, 8, 63, 64]),
        0u64..50,           // cycle increment
    )
}

fn build_log(events: &[(usize, u8, u8, u8, u64, u64)]) -> TraceLog {
    let categories = [
        Category::STrap,
        Category::UTrap,
        Category::Syscall,
        Category::SerialDriver,
    ];
    let mut cycle = 0u64;
    let mut log = TraceLog::new();
    for &(cat, subtype, hart, pid, extra, step) in events {
        cycle += step;
        // U-trap boundaries sit at 8/9
        let subtype = if categories[cat] == Category::UTrap { subtype + 6 } else { subtype };
        log = log.event(categories[cat], subtype, hart, pid, extra, cycle);
    }
    log
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_streaming_equals_batch(events in prop::collection::vec(arb_event(), 0..200)) {
        let log = build_log(&events);
        let engine = Engine::new(EngineConfig::default()).unwrap();
        let batch = engine.run(log.bytes()).unwrap();
        let streamed = engine.run_streaming(log.bytes()).unwrap();
        prop_assert_eq!(batch, streamed);
    }

    #[test]
    fn prop_tracker_matches_batch_matcher(
        pattern in prop::collection::vec((prop::bool::ANY, 0u64..100), 0..100)
    ) {
        let mut cycle = 0;
        let events: Vec<DecodedEvent> = pattern
            .iter()
            .map(|&(enter, step)| {
                cycle += step;
                let id = EventId {
                    category: Category::Syscall.code(),
                    subtype: if enter { 0 } else { 1 },
                    hart: 0,
                    pid: 4,
                    extra: 64,
                };
                DecodedEvent::new(id, cycle)
            })
            .collect();

        let batch = match_pairs(&events, 0, 1);
        let mut tracker = PairTracker::new(0, 1);
        for event in &events {
            tracker.push(event);
        }
        prop_assert_eq!(tracker.finish(), batch.clone());

        // Monotonic cycles never produce negative deltas
        prop_assert!(batch.samples.iter().all(|&d| d >= 0));
        let enters = pattern.iter().filter(|(enter, _)| *enter).count();
        prop_assert_eq!(batch.samples.len() + batch.unmatched_enters, enters);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_filter_keeps_an_ordered_subsequence(
        samples in prop::collection::vec(-10_000i64..10_000, 0..100),
        factor in 0.0f64..5.0,
    ) {
        let kept = filter_outliers(&samples, factor);
        prop_assert!(kept.len() <= samples.len());

        let mut rest = samples.iter();
        for k in &kept {
            prop_assert!(rest.any(|s| s == k), "{} out of order or missing", k);
        }
    }

    #[test]
    fn prop_filter_keeps_the_interquartile_range(
        samples in prop::collection::vec(0i64..1_000_000, 1..100),
        factor in 0.0f64..5.0,
    ) {
        let mut sorted = samples.clone();
        sorted.sort_unstable();
        let p25 = percentile(&sorted, 25.0).unwrap();
        let p75 = percentile(&sorted, 75.0).unwrap();

        let kept = filter_outliers(&samples, factor);
        let expected = samples
            .iter()
            .filter(|&&s| (s as f64) >= p25 && (s as f64) <= p75)
            .count();
        let kept_inner = kept
            .iter()
            .filter(|&&s| (s as f64) >= p25 && (s as f64) <= p75)
            .count();
        prop_assert_eq!(kept_inner, expected);
    }

    #[test]
    fn prop_percentile_bounded_by_extremes(
        samples in prop::collection::vec(any::<i32>(), 1..100),
        p in 0.0f64..=100.0,
    ) {
        let mut sorted: Vec<i64> = samples.iter().map(|&s| s as i64).collect();
        sorted.sort_unstable();
        let value = percentile(&sorted, p).unwrap();
        prop_assert!(value >= sorted[0] as f64);
        prop_assert!(value <= sorted[sorted.len() - 1] as f64);
    }
}
