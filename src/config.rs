//! Engine configuration
//!
//! Process-id acceptance sets, the excluded kernel trap cause and the
//! outlier factor used to be baked into the analysis scripts. They live
//! here instead and are handed to the stream builder at construction.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Configuration for a single analysis pass
///
/// # Example
/// ```
/// use hartrace::config::EngineConfig;
///
/// let config = EngineConfig::default();
/// assert!(config.kernel_pids.contains(&3));
/// assert_eq!(config.outlier_factor, 2.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Processes whose kernel trap records are kept (S-trap stream)
    pub kernel_pids: BTreeSet<u8>,

    /// Processes whose U-trap, syscall and serial call records are kept
    pub accepted_pids: BTreeSet<u8>,

    /// Kernel trap cause left out of S-trap pairing
    ///
    /// Cause 8 is the user environment call. Its trap latency includes the
    /// whole syscall and is measured by the syscall stream instead.
    pub excluded_s_trap_cause: u64,

    /// IQR multiplier for outlier trimming
    pub outlier_factor: f64,

    /// Optional syscall phase breakdown for one process
    pub breakdown: Option<BreakdownConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            kernel_pids: BTreeSet::from([3, 4, 11, 12]),
            accepted_pids: BTreeSet::from([3, 4, 5, 6, 7, 8, 11, 12, 13, 14, 15, 16]),
            excluded_s_trap_cause: 8,
            outlier_factor: 2.0,
            breakdown: None,
        }
    }
}

/// Which syscall invocations the phase breakdown looks at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakdownConfig {
    /// Process whose full syscall timeline is retained
    pub pid: u8,
    /// Syscall ids to break down
    pub syscalls: Vec<u64>,
    /// Lower bound (exclusive) on total latency of a representative call
    pub min_cycles: i64,
    /// Upper bound (exclusive) on total latency of a representative call
    pub max_cycles: i64,
}

impl Default for BreakdownConfig {
    fn default() -> Self {
        Self {
            pid: 4,
            syscalls: vec![crate::breakdown::SYSCALL_READ, crate::breakdown::SYSCALL_WRITE],
            min_cycles: 25_000,
            max_cycles: 35_000,
        }
    }
}

impl BreakdownConfig {
    pub fn for_pid(pid: u8) -> Self {
        Self {
            pid,
            ..Self::default()
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file
    ///
    /// Missing keys fall back to their defaults.
    ///
    /// # Example TOML
    /// ```toml
    /// kernel_pids = [3, 4]
    /// accepted_pids = [3, 4, 5]
    /// outlier_factor = 1.5
    ///
    /// [breakdown]
    /// pid = 4
    /// syscalls = [63, 64]
    /// ```
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read config file: {}", path.as_ref().display())
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse TOML config")?;
        config.validate().map_err(|e| anyhow::anyhow!(e))?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.outlier_factor.is_finite() || self.outlier_factor < 0.0 {
            return Err(format!(
                "outlier_factor must be a finite non-negative number, got {}",
                self.outlier_factor
            ));
        }

        if let Some(breakdown) = &self.breakdown {
            if breakdown.min_cycles >= breakdown.max_cycles {
                return Err(format!(
                    "breakdown window is empty: min_cycles {} >= max_cycles {}",
                    breakdown.min_cycles, breakdown.max_cycles
                ));
            }
            if !self.accepted_pids.contains(&breakdown.pid) {
                return Err(format!(
                    "breakdown pid {} is not in accepted_pids",
                    breakdown.pid
                ));
            }
        }

        Ok(())
    }
}
