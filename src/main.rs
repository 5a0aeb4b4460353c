//! scanfind - Prefix lookup over delimited data, fed by typing or barcode scans

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use termcolor::WriteColor;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use scanfind::config::{Config, IngestPolicy, OutputFormat};
use scanfind::output::{self, render_to_stdout, OutputFactory, OutputFormatter};
use scanfind::scan::{
    capability, BarcodeFormat, Camera, CaptureTarget, Detector, LineCamera, LineDetector, ScanEvent,
    ScanLoop, ScanState,
};
use scanfind::search::QueryOrigin;
use scanfind::{LookupService, SearchOutcome, Session};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliOutputFormat {
    Terminal,
    Json,
}

impl From<CliOutputFormat> for OutputFormat {
    fn from(f: CliOutputFormat) -> Self {
        match f {
            CliOutputFormat::Terminal => OutputFormat::Terminal,
            CliOutputFormat::Json => OutputFormat::Json,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliPolicy {
    ClearFirst,
    Preserve,
}

impl From<CliPolicy> for IngestPolicy {
    fn from(p: CliPolicy) -> Self {
        match p {
            CliPolicy::ClearFirst => IngestPolicy::ClearFirst,
            CliPolicy::Preserve => IngestPolicy::PreserveOnFailure,
        }
    }
}

/// Prefix lookup over CSV data, by typing or scanning barcodes
#[derive(Parser, Debug)]
#[command(name = "scanfind")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// What a failed load does to previously loaded data
    #[arg(long, value_enum, default_value = "clear-first", global = true)]
    policy: CliPolicy,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search identifiers once and print the result
    Query {
        /// Delimited data file, keyed by its first column
        file: PathBuf,

        /// Identifier or identifier prefix
        query: String,

        /// Maximum number of matches
        #[arg(short, long, default_value_t = 10)]
        limit: usize,

        /// Match the whole identifier instead of a prefix
        #[arg(long)]
        exact: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "terminal")]
        format: CliOutputFormat,
    },

    /// Search as you type; one query per line, `:select ID` shows one row
    Repl {
        file: PathBuf,

        #[arg(short, long, default_value_t = 10)]
        limit: usize,

        /// Shorter typed queries clear the results instead of searching
        #[arg(long, default_value_t = 3)]
        min_len: usize,

        /// Quiet period before a typed query is searched, in milliseconds
        #[arg(long, default_value_t = 300)]
        debounce_ms: u64,

        #[arg(short, long, value_enum, default_value = "terminal")]
        format: CliOutputFormat,
    },

    /// Look up every scanned barcode until interrupted
    Scan {
        file: PathBuf,

        /// Read scanned codes from this file instead of standard input
        #[arg(long)]
        source: Option<PathBuf>,

        /// Barcode symbologies to accept (comma-separated)
        #[arg(long, value_delimiter = ',')]
        barcode_format: Vec<BarcodeFormat>,

        #[arg(short, long, value_enum, default_value = "terminal")]
        format: CliOutputFormat,
    },

    /// Print the header labels of a data file
    Headers {
        file: PathBuf,

        #[arg(short, long, value_enum, default_value = "terminal")]
        format: CliOutputFormat,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(found) => {
            if found {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1) // No results
            }
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load(file: &Path, policy: IngestPolicy) -> Result<LookupService> {
    let service = LookupService::new(policy);
    let items = service
        .load_path(file)
        .with_context(|| format!("Failed to load data file: {}", file.display()))?;
    info!(items, file = %file.display(), "data file ready");
    Ok(service)
}

/// Returns false when a one-shot query found nothing
async fn run(cli: Cli) -> Result<bool> {
    match cli.command {
        Command::Query {
            file,
            query,
            limit,
            exact,
            format,
        } => {
            let service = load(&file, cli.policy.into())?;
            let result = if exact {
                service.search_exact(&query)
            } else {
                service.search(&query, limit)
            };
            render_to_stdout(&result, format.into())?;
            Ok(!result.is_empty())
        }

        Command::Repl {
            file,
            limit,
            min_len,
            debounce_ms,
            format,
        } => {
            let config = Config::new(file)
                .with_ingest_policy(cli.policy.into())
                .with_result_limit(limit)
                .with_min_query_len(min_len)
                .with_debounce(Duration::from_millis(debounce_ms))
                .with_output_format(format.into());
            run_repl(&config).await?;
            Ok(true)
        }

        Command::Scan {
            file,
            source,
            barcode_format,
            format,
        } => {
            let mut config = Config::new(file)
                .with_ingest_policy(cli.policy.into())
                .with_output_format(format.into());
            if !barcode_format.is_empty() {
                config = config.with_barcode_formats(barcode_format);
            }
            run_scan(&config, source).await?;
            Ok(true)
        }

        Command::Headers { file, format } => {
            let service = load(&file, cli.policy.into())?;
            let headers = service.headers();
            match OutputFormat::from(format) {
                OutputFormat::Terminal => {
                    for header in &headers {
                        println!("{}", header);
                    }
                }
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&headers)?);
                }
            }
            Ok(true)
        }
    }
}

async fn run_repl(config: &Config) -> Result<()> {
    let service = load(&config.file, config.ingest_policy)?;
    let session = Session::start(service, config, None);
    let printer = spawn_printer(session.outcomes(), config.output_format);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines
        .next_line()
        .await
        .context("Failed to read standard input")?
    {
        match line.trim().strip_prefix(":select ") {
            Some(id) => session.select(id.trim()),
            None => session.type_text(line),
        }
    }

    session.shutdown().await;
    printer.await.context("Output task panicked")?
}

async fn run_scan(config: &Config, source: Option<PathBuf>) -> Result<()> {
    let service = load(&config.file, config.ingest_policy)?;

    let camera: Arc<dyn Camera> = Arc::new(match source {
        Some(path) => LineCamera::file(path),
        None => LineCamera::stdin(),
    });
    let detector: Arc<dyn Detector> = Arc::new(LineDetector::new(config.barcode_formats.clone()));
    let capability = capability::probe(camera.as_ref(), detector.as_ref()).clone();
    let scanner = ScanLoop::new(camera, detector, capability, config.detection_flash);

    let session = Session::start(service, config, Some(scanner.clone()));
    let formatter = OutputFactory::create_streaming(config.output_format);
    let mut out = output::stdout();
    let mut outcomes = session.outcomes();
    let mut events = scanner.subscribe();
    let mut state = scanner.state_stream();

    session
        .scan_start(CaptureTarget::new("barcode scanner"))
        .context("Failed to start scanner")?;
    formatter.render_scan_state(ScanState::Starting, &mut out)?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    // Detections are printed from their scanned lookups, so output follows arrival order
    let mut failures = Vec::new();
    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("interrupted");
                break;
            }
            changed = state.changed() => {
                if changed.is_err() || *state.borrow_and_update() == ScanState::Idle {
                    break;
                }
            }
            event = events.recv() => match event {
                Ok(ScanEvent::Failed(message)) => failures.push(message),
                Ok(ScanEvent::Detected(_)) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            },
            outcome = outcomes.recv() => match outcome {
                Ok(outcome) => render_outcome(formatter.as_ref(), &outcome, &mut out)?,
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "search results dropped"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    // Shutdown evaluates every queued scan before the pump exits
    session.shutdown().await;
    loop {
        match outcomes.try_recv() {
            Ok(outcome) => render_outcome(formatter.as_ref(), &outcome, &mut out)?,
            Err(TryRecvError::Lagged(skipped)) => warn!(skipped, "search results dropped"),
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
    loop {
        match events.try_recv() {
            Ok(ScanEvent::Failed(message)) => failures.push(message),
            Ok(ScanEvent::Detected(_)) | Err(TryRecvError::Lagged(_)) => continue,
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
    for message in &failures {
        formatter.render_error(message, &mut out)?;
    }
    formatter.render_scan_state(ScanState::Idle, &mut out)?;
    out.flush()?;
    Ok(())
}

fn spawn_printer(
    mut outcomes: broadcast::Receiver<SearchOutcome>,
    format: OutputFormat,
) -> JoinHandle<Result<()>> {
    tokio::spawn(async move {
        let formatter = OutputFactory::create_streaming(format);
        let mut out = output::stdout();
        loop {
            match outcomes.recv().await {
                Ok(outcome) => render_outcome(formatter.as_ref(), &outcome, &mut out)?,
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "search results dropped"),
                Err(RecvError::Closed) => return Ok(()),
            }
        }
    })
}

fn render_outcome(
    formatter: &dyn OutputFormatter,
    outcome: &SearchOutcome,
    out: &mut dyn WriteColor,
) -> Result<()> {
    if let SearchOutcome::Results { query, origin, result } = outcome {
        if *origin == QueryOrigin::Scanned {
            formatter.render_detection(query, out)?;
        }
        formatter.render(result, out)?;
        out.flush()?;
    }
    Ok(())
}
