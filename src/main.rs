use anyhow::{Context, Result};
use clap::Parser;
use hartrace::{
    cli::Cli,
    config::{BreakdownConfig, EngineConfig},
    engine::Engine,
    names::KernelNames,
    report::{self, ReportOptions},
};
use std::fs::File;
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Build the engine configuration from the config file and CLI overrides
fn load_config(args: &Cli) -> Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::from_toml(path)?,
        None => EngineConfig::default(),
    };

    if let Some(factor) = args.factor {
        config.outlier_factor = factor;
    }

    if let Some(pid) = args.breakdown_pid {
        config.breakdown = Some(match config.breakdown.take() {
            Some(existing) => BreakdownConfig { pid, ..existing },
            None => BreakdownConfig::for_pid(pid),
        });
    }

    config.validate().map_err(|e| anyhow::anyhow!(e))?;
    Ok(config)
}

/// Map the trace file and run the engine over it
fn analyze(engine: &Engine, path: &Path, streaming: bool) -> Result<hartrace::engine::Analysis> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open trace: {}", path.display()))?;
    let len = file
        .metadata()
        .with_context(|| format!("Failed to stat trace: {}", path.display()))?
        .len();

    if len == 0 {
        tracing::debug!(path = %path.display(), "empty trace file");
        return Ok(engine.run(&[][..])?);
    }

    // SAFETY: the trace is a finished capture; nothing writes to it while mapped.
    let mmap = unsafe { memmap2::Mmap::map(&file) }.context("Failed to memory-map trace")?;
    let bytes: &[u8] = &mmap;

    let analysis = if streaming {
        engine.run_streaming(bytes)?
    } else {
        engine.run(bytes)?
    };
    Ok(analysis)
}

fn main() -> Result<()> {
    let args = Cli::parse();

    // Initialize tracing if --debug flag is set
    init_tracing(args.debug);

    let config = load_config(&args)?;
    let engine = Engine::new(config)?;
    let analysis = analyze(&engine, &args.trace, args.streaming)?;

    let options = ReportOptions {
        by_id: args.by_id,
        counts: args.counts,
    };
    let output = report::render(&analysis, &KernelNames, args.format, options)
        .context("Failed to render report")?;
    if output.ends_with('\n') {
        print!("{}", output);
    } else {
        println!("{}", output);
    }

    Ok(())
}
