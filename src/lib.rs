//! hartrace - enter/exit latency analysis for multi-hart kernel event logs
//!
//! This library decodes the flat binary event log written by an instrumented
//! kernel, groups records into per-hart or per-process sequences, pairs
//! enter/exit events into cycle deltas and trims outliers with an IQR rule.

pub mod breakdown;
pub mod category;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod names;
pub mod outlier;
pub mod record;
pub mod report;
pub mod stream;
