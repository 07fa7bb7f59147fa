use anyhow::Context;
use cardprint_cli::{
    BatchRunner, BatchSettings, BatchSummary, ConsolePrompt, CsvSink, NoPrompt, OperatorPrompt,
    RecordSource,
};
use cardprint_core::{AppConfig, PreferenceList, PrintBackend, UidBytes};
use cardprint_hardware::CardSubsystem;
use cardprint_hardware::mock::{MockCard, MockSubsystem};
use cardprint_render::{
    CardRenderer, PostScriptTarget, PrintTarget, RecordingTarget, Resolution, SpoolMode,
};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const SIMULATED_READER: &str = "Simulated Contactless Reader";

/// Read contactless card UIDs and print them next to enrollment codes.
#[derive(Debug, Parser)]
#[command(name = "cardprint", version, about)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, env = "CARDPRINT_CONFIG")]
    config: Option<PathBuf>,

    /// Enrollment codes, one per line
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output log of code,UID pairs (appended)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Destination printer (default: system default printer)
    #[arg(short, long, env = "CARDPRINT_PRINTER")]
    printer: Option<String>,

    /// Write PostScript jobs into this directory instead of printing
    #[arg(long, value_name = "DIR")]
    spool_dir: Option<PathBuf>,

    /// Reader preference terms, highest priority first
    #[arg(long, value_delimiter = ',', value_name = "TERM,...")]
    prefer: Option<Vec<String>>,

    /// How long to wait for each card, in milliseconds
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Record print jobs in memory instead of printing
    #[arg(long)]
    dry_run: bool,

    /// Use a simulated reader that returns this UID for every record
    #[arg(long, value_name = "HEX")]
    simulate_uid: Option<String>,

    /// Do not wait for Enter before each card
    #[arg(long)]
    no_prompt: bool,

    /// Verbose logging (overridden by RUST_LOG)
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = build_config(&cli)?;
    let source = RecordSource::from_path(&config.batch.input)?;
    let mut sink = CsvSink::open_append(&config.batch.output)?;
    tracing::debug!(config = ?config, "configuration resolved");

    let mut prompt: Box<dyn OperatorPrompt> = if cli.no_prompt {
        Box::new(NoPrompt)
    } else {
        Box::new(ConsolePrompt::stdio())
    };

    let summary = match &cli.simulate_uid {
        Some(hex) => {
            let uid = UidBytes::from_hex(hex).context("invalid --simulate-uid")?;
            let (subsystem, handle) = MockSubsystem::new();
            handle.attach_reader(SIMULATED_READER);
            for _ in 0..source.len() {
                handle.present_card(SIMULATED_READER, MockCard::with_uid(uid.as_bytes()));
            }
            tracing::info!("Simulating reader {} with UID {}", SIMULATED_READER, uid);
            run_with_subsystem(&cli, &config, &subsystem, &source, &mut sink, prompt.as_mut())?
        }
        None => run_with_system_reader(&cli, &config, &source, &mut sink, prompt.as_mut())?,
    };

    println!(
        "Done: {} processed, {} recorded, {} failed",
        summary.processed, summary.succeeded, summary.failed
    );
    Ok(())
}

/// Load the configuration file, then apply command-line overrides.
fn build_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("failed to load configuration {}", path.display()))?,
        None => AppConfig::default(),
    };

    if let Some(input) = &cli.input {
        config.batch.input = input.clone();
    }
    if let Some(output) = &cli.output {
        config.batch.output = output.clone();
    }
    if let Some(printer) = &cli.printer {
        config = config.printer_target(printer.clone());
    }
    if let Some(dir) = &cli.spool_dir {
        config.printer.backend = PrintBackend::Directory;
        config.printer.spool_dir = dir.clone();
    }
    if let Some(terms) = &cli.prefer {
        let preferences = PreferenceList::new(terms).context("invalid --prefer")?;
        config = config.preferences(preferences);
    }
    if let Some(ms) = cli.timeout_ms {
        config = config.presence_timeout(Duration::from_millis(ms));
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

#[cfg(feature = "pcsc")]
fn run_with_system_reader(
    cli: &Cli,
    config: &AppConfig,
    source: &RecordSource,
    sink: &mut CsvSink<std::fs::File>,
    prompt: &mut dyn OperatorPrompt,
) -> anyhow::Result<BatchSummary> {
    let subsystem = cardprint_hardware::PcscSubsystem::new();
    run_with_subsystem(cli, config, &subsystem, source, sink, prompt)
}

#[cfg(not(feature = "pcsc"))]
fn run_with_system_reader(
    _cli: &Cli,
    _config: &AppConfig,
    _source: &RecordSource,
    _sink: &mut CsvSink<std::fs::File>,
    _prompt: &mut dyn OperatorPrompt,
) -> anyhow::Result<BatchSummary> {
    anyhow::bail!("built without PC/SC support; rebuild with --features pcsc or use --simulate-uid")
}

fn run_with_subsystem<S: CardSubsystem>(
    cli: &Cli,
    config: &AppConfig,
    subsystem: &S,
    source: &RecordSource,
    sink: &mut CsvSink<std::fs::File>,
    prompt: &mut dyn OperatorPrompt,
) -> anyhow::Result<BatchSummary> {
    let resolution = Resolution::new(config.printer.dpi_x, config.printer.dpi_y);

    if cli.dry_run {
        let target = RecordingTarget::new(resolution);
        let summary = run_batch(config, subsystem, target.clone(), source, sink, prompt)?;
        tracing::info!("Dry run recorded {} print jobs", target.submitted().len());
        return Ok(summary);
    }

    let spool = match config.printer.backend {
        PrintBackend::Spooler => SpoolMode::Lp,
        PrintBackend::Directory => SpoolMode::Directory(config.printer.spool_dir.clone()),
    };
    let target = PostScriptTarget::new(resolution, config.card.surface, spool);
    run_batch(config, subsystem, target, source, sink, prompt)
}

fn run_batch<S: CardSubsystem, T: PrintTarget>(
    config: &AppConfig,
    subsystem: &S,
    target: T,
    source: &RecordSource,
    sink: &mut CsvSink<std::fs::File>,
    prompt: &mut dyn OperatorPrompt,
) -> anyhow::Result<BatchSummary> {
    let renderer = CardRenderer::new(target)
        .with_device(config.printer.target.clone())
        .with_document_name(config.printer.document_name.clone());
    let settings = BatchSettings {
        preferences: config.reader.preferences.clone(),
        presence_timeout: config.reader.presence_timeout(),
        layout: config.card,
    };

    let runner = BatchRunner::new(subsystem, &renderer, settings);
    Ok(runner.run(source, sink, prompt)?)
}
