//! Rendering of an [`Analysis`] as text, JSON or CSV
//!
//! Renderers are consumers: they read the analysis and a name table and
//! never feed anything back into the engine.

use crate::breakdown::PhaseBreakdown;
use crate::category::{Category, PairedStream};
use crate::cli::OutputFormat;
use crate::engine::{Analysis, StreamReport};
use crate::names::{describe_id, NameTable};
use crate::outlier::percentile;
use crate::stream::{CategoryCounts, EventKey};
use serde::Serialize;
use std::fmt::Write;

/// Descriptive statistics of one sample set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleSummary {
    pub count: usize,
    pub mean: f32,
    pub stddev: f32,
    pub min: i64,
    pub max: i64,
    pub median: f64,
    pub p90: f64,
    pub p99: f64,
}

/// Summarize samples; `None` for an empty set
///
/// Mean and standard deviation go through Trueno's SIMD reductions; min,
/// max and percentiles are computed exactly on the integer samples.
pub fn summarize(samples: &[i64]) -> Option<SampleSummary> {
    if samples.is_empty() {
        return None;
    }

    let as_f32: Vec<f32> = samples.iter().map(|&s| s as f32).collect();
    let v = trueno::Vector::from_slice(&as_f32);
    let mean = v.mean().unwrap_or(0.0);
    let stddev = v.stddev().unwrap_or(0.0);

    let mut sorted = samples.to_vec();
    sorted.sort_unstable();

    Some(SampleSummary {
        count: sorted.len(),
        mean,
        stddev,
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        median: percentile(&sorted, 50.0)?,
        p90: percentile(&sorted, 90.0)?,
        p99: percentile(&sorted, 99.0)?,
    })
}

/// What to include besides the per-key tables
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportOptions {
    /// Merge all groups per cause/id before trimming
    pub by_id: bool,
    /// Include per-category record counts
    pub counts: bool,
}

/// A key row ready for any output format
#[derive(Debug, Clone, Serialize)]
pub struct KeyRow {
    pub stream: PairedStream,
    pub group: &'static str,
    pub group_id: u8,
    pub id: u64,
    pub name: String,
    pub events: usize,
    pub unmatched_enters: usize,
    pub raw_count: usize,
    pub samples: Vec<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<SampleSummary>,
}

/// A merged per-id row (`--by-id`)
#[derive(Debug, Clone, Serialize)]
pub struct IdRow {
    pub stream: PairedStream,
    pub id: u64,
    pub name: String,
    pub samples: Vec<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<SampleSummary>,
}

/// Top-level JSON document
#[derive(Debug, Clone, Serialize)]
pub struct JsonReport {
    pub records: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentinel_at: Option<u64>,
    pub outlier_factor: f64,
    pub keys: Vec<KeyRow>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub by_id: Vec<IdRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counts: Option<CategoryCounts>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub breakdown: Vec<PhaseBreakdown>,
}

fn key_row(stream: PairedStream, key: &EventKey, report: &StreamReport, names: &dyn NameTable) -> Option<KeyRow> {
    let k = report.get(key)?;
    Some(KeyRow {
        stream,
        group: key.group.kind(),
        group_id: key.group.value(),
        id: key.id,
        name: describe_id(names, stream, key.id),
        events: k.events,
        unmatched_enters: k.unmatched_enters,
        raw_count: k.raw.len(),
        samples: k.samples.clone(),
        summary: summarize(&k.samples),
    })
}

pub fn key_rows(analysis: &Analysis, names: &dyn NameTable) -> Vec<KeyRow> {
    analysis
        .streams
        .iter()
        .flat_map(|(&stream, report)| {
            report
                .keys
                .keys()
                .filter_map(move |key| key_row(stream, key, report, names))
        })
        .collect()
}

pub fn id_rows(analysis: &Analysis, names: &dyn NameTable) -> Vec<IdRow> {
    let mut rows = Vec::new();
    for (&stream, report) in &analysis.streams {
        for (id, samples) in report.by_id(analysis.outlier_factor) {
            rows.push(IdRow {
                stream,
                id,
                name: describe_id(names, stream, id),
                summary: summarize(&samples),
                samples,
            });
        }
    }
    rows
}

pub fn to_json(analysis: &Analysis, names: &dyn NameTable, options: ReportOptions) -> serde_json::Result<String> {
    let report = JsonReport {
        records: analysis.records,
        sentinel_at: analysis.sentinel_at,
        outlier_factor: analysis.outlier_factor,
        keys: key_rows(analysis, names),
        by_id: if options.by_id {
            id_rows(analysis, names)
        } else {
            Vec::new()
        },
        counts: options.counts.then(|| analysis.counts.clone()),
        breakdown: analysis.breakdown.clone(),
    };
    serde_json::to_string_pretty(&report)
}

/// Escape CSV field (handle commas, quotes, newlines)
fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// One row per key (or per id with `by_id`), summary columns only
pub fn to_csv(analysis: &Analysis, names: &dyn NameTable, options: ReportOptions) -> String {
    let mut out = String::new();
    let summary_cols = |s: &Option<SampleSummary>| match s {
        Some(s) => format!(
            "{},{},{:.2},{:.2},{}",
            s.min, s.median, s.mean, s.p99, s.max
        ),
        None => ",,,,".to_string(),
    };

    if options.by_id {
        out.push_str("stream,id,name,samples,min,median,mean,p99,max\n");
        for row in id_rows(analysis, names) {
            let _ = writeln!(
                out,
                "{},{},{},{},{}",
                row.stream.label(),
                row.id,
                escape_field(&row.name),
                row.samples.len(),
                summary_cols(&row.summary)
            );
        }
        return out;
    }

    out.push_str("stream,group,group_id,id,name,events,unmatched,samples,min,median,mean,p99,max\n");
    for row in key_rows(analysis, names) {
        let _ = writeln!(
            out,
            "{},{},{},{},{},{},{},{},{}",
            row.stream.label(),
            row.group,
            row.group_id,
            row.id,
            escape_field(&row.name),
            row.events,
            row.unmatched_enters,
            row.samples.len(),
            summary_cols(&row.summary)
        );
    }
    out
}

fn write_summary(out: &mut String, summary: &SampleSummary) {
    let _ = writeln!(out, "    Samples:      {}", summary.count);
    let _ = writeln!(out, "    Mean:         {:.2} cycles", summary.mean);
    let _ = writeln!(out, "    Std Dev:      {:.2} cycles", summary.stddev);
    let _ = writeln!(out, "    Min:          {} cycles", summary.min);
    let _ = writeln!(out, "    Median (P50): {:.2} cycles", summary.median);
    let _ = writeln!(out, "    P90:          {:.2} cycles", summary.p90);
    let _ = writeln!(out, "    P99:          {:.2} cycles", summary.p99);
    let _ = writeln!(out, "    Max:          {} cycles", summary.max);
}

pub fn to_text(analysis: &Analysis, names: &dyn NameTable, options: ReportOptions) -> String {
    let mut out = String::new();

    let _ = write!(out, "{} records analyzed", analysis.records);
    if let Some(at) = analysis.sentinel_at {
        let _ = write!(out, " (flush-trace sentinel at record {})", at);
    }
    let _ = writeln!(out, ", outlier factor {}", analysis.outlier_factor);

    if options.counts {
        let _ = writeln!(out, "\n=== Records per Category ===\n");
        for category in Category::ALL {
            let name = names.category(category.code()).unwrap_or(category_label(category));
            let _ = writeln!(out, "  {:<16} {:>10}", name, analysis.counts.get(category));
        }
        if analysis.counts.unknown > 0 {
            let _ = writeln!(out, "  {:<16} {:>10}", "unknown", analysis.counts.unknown);
        }
    }

    if analysis.streams.is_empty() {
        let _ = writeln!(out, "\nNo enter/exit pairs found.");
    }

    for (&stream, report) in &analysis.streams {
        let title = names
            .category(stream.category().code())
            .unwrap_or(stream.label());
        let _ = writeln!(out, "\n=== {} latency ===\n", title);

        if options.by_id {
            for (id, samples) in report.by_id(analysis.outlier_factor) {
                let _ = writeln!(out, "  {}:", describe_id(names, stream, id));
                match summarize(&samples) {
                    Some(summary) => write_summary(&mut out, &summary),
                    None => {
                        let _ = writeln!(out, "    No samples.");
                    }
                }
            }
            continue;
        }

        for (key, k) in &report.keys {
            let _ = writeln!(
                out,
                "  {} {} / {} ({} events, {} unmatched enters):",
                key.group.kind(),
                key.group.value(),
                describe_id(names, stream, key.id),
                k.events,
                k.unmatched_enters
            );
            match summarize(&k.samples) {
                Some(summary) => write_summary(&mut out, &summary),
                None => {
                    let _ = writeln!(out, "    No samples.");
                }
            }
        }
    }

    if !analysis.breakdown.is_empty() {
        let _ = writeln!(out, "\n=== Syscall Phase Breakdown ===\n");
        for b in &analysis.breakdown {
            let _ = writeln!(
                out,
                "  {} (enter at cycle {}):",
                describe_id(names, PairedStream::Syscall, b.syscall),
                b.enter_cycle
            );
            for (phase, offset) in &b.phases {
                let _ = writeln!(out, "    {:<14} +{}", format!("{:?}", phase), offset);
            }
        }
    }

    out
}

fn category_label(category: Category) -> &'static str {
    match category {
        Category::STrap => "s_trap",
        Category::Scheduler => "scheduler",
        Category::UTrap => "u_trap",
        Category::Syscall => "syscall",
        Category::SbiCall => "sbi_call",
        Category::SerialDriver => "serial_driver",
        Category::Plic => "plic",
        Category::Misc => "misc",
    }
}

/// Render in the requested format
pub fn render(
    analysis: &Analysis,
    names: &dyn NameTable,
    format: OutputFormat,
    options: ReportOptions,
) -> serde_json::Result<String> {
    match format {
        OutputFormat::Text => Ok(to_text(analysis, names, options)),
        OutputFormat::Json => to_json(analysis, names, options),
        OutputFormat::Csv => Ok(to_csv(analysis, names, options)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::engine::Engine;
    use crate::names::{KernelNames, NoNames};
    use crate::record::{EventId, RawRecord};

    fn analysis() -> Analysis {
        let pack = |category: Category, subtype, hart, pid, extra| {
            EventId {
                category: category.code(),
                subtype,
                hart,
                pid,
                extra,
            }
            .pack()
        };
        let records = [
            (pack(Category::Syscall, 0, 0, 4, 64), 100),
            (pack(Category::Syscall, 1, 0, 4, 64), 150),
            (pack(Category::Syscall, 0, 0, 4, 64), 200),
            (pack(Category::Syscall, 1, 0, 4, 64), 260),
            (pack(Category::STrap, 2, 1, 3, 13), 300),
            (pack(Category::STrap, 2, 1, 3, 13), 305),
            (pack(Category::Scheduler, 0, 0, 3, 0), 310),
        ];
        let bytes: Vec<u8> = records
            .iter()
            .flat_map(|&(event_id, cycle)| RawRecord { event_id, cycle }.to_bytes())
            .collect();
        Engine::new(EngineConfig::default())
            .unwrap()
            .run(bytes.as_slice())
            .unwrap()
    }

    #[test]
    fn test_summarize() {
        let s = summarize(&[50, 60]).unwrap();
        assert_eq!(s.count, 2);
        assert_eq!(s.min, 50);
        assert_eq!(s.max, 60);
        assert_eq!(s.median, 55.0);
        assert!((s.mean - 55.0).abs() < 0.01);
        assert!(summarize(&[]).is_none());
    }

    #[test]
    fn test_key_rows_use_names() {
        let rows = key_rows(&analysis(), &KernelNames);
        assert_eq!(rows.len(), 2);
        let write = rows.iter().find(|r| r.stream == PairedStream::Syscall).unwrap();
        assert_eq!(write.name, "WRITE");
        assert_eq!(write.samples, vec![50, 60]);
        assert_eq!(write.group, "pid");
        let trap = rows.iter().find(|r| r.stream == PairedStream::STrap).unwrap();
        assert_eq!(trap.name, "Load Page Fault");
        assert_eq!(trap.unmatched_enters, 2);
        assert!(trap.summary.is_none());
    }

    #[test]
    fn test_json_report() {
        let options = ReportOptions {
            by_id: true,
            counts: true,
        };
        let json = to_json(&analysis(), &NoNames, options).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["records"], 7);
        assert!(value.get("sentinel_at").is_none());
        assert_eq!(value["keys"].as_array().unwrap().len(), 2);
        assert_eq!(value["counts"]["known"]["scheduler"], 1);
        assert_eq!(value["by_id"][0]["stream"], "s_trap");
        assert_eq!(value["keys"][1]["name"], "syscall 64");
    }

    #[test]
    fn test_csv_report() {
        let csv = to_csv(&analysis(), &KernelNames, ReportOptions::default());
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("stream,group,group_id,id,name"));
        assert!(lines[2].starts_with("syscall,pid,4,64,WRITE,4,0,2,50,55"));
    }

    #[test]
    fn test_csv_escapes_names() {
        assert_eq!(escape_field("a,b"), "\"a,b\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_field("plain"), "plain");
    }

    #[test]
    fn test_text_report() {
        let options = ReportOptions {
            by_id: false,
            counts: true,
        };
        let text = to_text(&analysis(), &KernelNames, options);
        assert!(text.starts_with("7 records analyzed"));
        assert!(text.contains("=== Records per Category ==="));
        assert!(text.contains("=== syscall latency ==="));
        assert!(text.contains("pid 4 / WRITE (4 events, 0 unmatched enters)"));
        assert!(text.contains("No samples."));
    }

    #[test]
    fn test_text_report_empty() {
        let analysis = Engine::new(EngineConfig::default())
            .unwrap()
            .run(&[][..])
            .unwrap();
        let text = to_text(&analysis, &NoNames, ReportOptions::default());
        assert!(text.contains("No enter/exit pairs found."));
    }
}
