//! CLI argument parsing for hartrace

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for latency reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
    /// CSV format for spreadsheet analysis
    Csv,
}

#[derive(Parser, Debug)]
#[command(name = "hartrace")]
#[command(version)]
#[command(about = "Enter/exit latency analysis for multi-hart kernel event logs", long_about = None)]
pub struct Cli {
    /// Binary trace file (16-byte little-endian records)
    #[arg(value_name = "TRACE")]
    pub trace: PathBuf,

    /// TOML file with acceptance sets, excluded trap cause and outlier factor
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// IQR multiplier for outlier trimming (overrides the config file)
    #[arg(long = "factor", value_name = "FACTOR")]
    pub factor: Option<f64>,

    /// Output format
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Pair in a single pass, keeping only pending enters per key
    #[arg(long = "streaming")]
    pub streaming: bool,

    /// Merge samples of all harts/processes per cause or call id
    #[arg(long = "by-id")]
    pub by_id: bool,

    /// Show record counts per category
    #[arg(long = "counts")]
    pub counts: bool,

    /// Break down READ/WRITE syscalls of this process into phases
    #[arg(long = "breakdown-pid", value_name = "PID")]
    pub breakdown_pid: Option<u8>,

    /// Enable debug tracing output on stderr
    #[arg(long = "debug")]
    pub debug: bool,
}
