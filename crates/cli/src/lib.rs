use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use convoq_client::{AuthToken, ChatUpload, ClientConfig, Dashboard, HttpAnalysisService};
use convoq_core::{AnalysisViewModel, DeepOutcome, Disclosure, HistoryEntry};
use convoq_protocol::{
    serialize_json_pretty, DateFormat, DeepAnalysisRequest, DeepMergeResult, FastResult,
    HistoricalRecord, UsageStats, PROTOCOL_SCHEMA_VERSION,
};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

mod report;

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "convoq")]
#[command(about = "Chat health analysis from the terminal", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for output)
    #[arg(long, global = true)]
    quiet: bool,

    /// Analysis service base URL (overrides CONVOQ_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Bearer token (overrides CONVOQ_AUTH_TOKEN)
    #[arg(long, global = true)]
    auth_token: Option<String>,

    /// Request timeout in seconds (overrides CONVOQ_TIMEOUT_SECS)
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a chat export and show the fast analysis
    Analyze(AnalyzeArgs),

    /// List past analyses, or show one of them
    History(HistoryArgs),

    /// Show request and token quota
    Usage(UsageArgs),

    /// Normalize a saved service payload without touching the network
    Normalize(NormalizeArgs),

    /// Print the JSON Schema of a payload or of the view model
    Schema(SchemaArgs),
}

#[derive(Args)]
struct AnalyzeArgs {
    /// Exported chat (.txt)
    file: PathBuf,

    /// Date format of the export: auto, mm/dd/yyyy, dd/mm/yyyy, mm/dd/yy, dd/mm/yy
    #[arg(long, default_value = "auto", value_parser = parse_date_format)]
    date_format: DateFormat,

    /// Run the deep scan right after the fast analysis
    #[arg(long)]
    deep: bool,

    /// Output JSON format
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct HistoryArgs {
    /// Show the analysis at this row of the listing
    #[arg(long)]
    select: Option<usize>,

    /// Output JSON format
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct UsageArgs {
    /// Output JSON format
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PayloadKind {
    /// Response of POST /analyze/fast
    Fast,
    /// One entry of GET /history
    History,
}

#[derive(Args)]
struct NormalizeArgs {
    /// JSON payload file ("-" for stdin)
    file: PathBuf,

    #[arg(long, value_enum, default_value = "fast")]
    kind: PayloadKind,

    /// Output JSON format
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SchemaTarget {
    View,
    Fast,
    Deep,
    History,
    Usage,
}

#[derive(Args)]
struct SchemaArgs {
    #[arg(value_enum, default_value = "view")]
    target: SchemaTarget,
}

fn parse_date_format(raw: &str) -> std::result::Result<DateFormat, String> {
    raw.parse()
}

/// JSON shape printed for a view model.
#[derive(Serialize)]
struct ViewOutput<'a> {
    schema_version: u32,
    state: &'static str,
    deep_scan_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    deep_request: Option<DeepAnalysisRequest>,
    view: &'a AnalysisViewModel,
}

#[derive(Serialize)]
struct HistoryOutput {
    entries: Vec<HistoryEntry>,
}

pub async fn main_entry() -> Result<()> {
    let mut cli = Cli::parse();

    let json_output = match &cli.command {
        Commands::Analyze(args) => args.json,
        Commands::History(args) => args.json,
        Commands::Usage(args) => args.json,
        Commands::Normalize(args) => args.json,
        Commands::Schema(_) => true,
    };
    if json_output {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    match cli.command {
        Commands::Analyze(ref args) => run_analyze(args, client_config(&cli)?).await?,
        Commands::History(ref args) => run_history(args, client_config(&cli)?).await?,
        Commands::Usage(ref args) => run_usage(args, client_config(&cli)?).await?,
        Commands::Normalize(args) => run_normalize(args)?,
        Commands::Schema(args) => run_schema(args)?,
    }

    Ok(())
}

/// Environment first, then global flags on top.
fn client_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = ClientConfig::from_env().context("Invalid client configuration")?;
    if let Some(url) = &cli.api_url {
        config = config.with_base_url(url.clone());
    }
    if cli.auth_token.is_some() {
        config = config.with_auth_token(AuthToken::parse(cli.auth_token.as_deref())?);
    }
    if let Some(secs) = cli.timeout_secs {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    config.validate().context("Invalid client configuration")?;
    Ok(config)
}

fn dashboard(config: ClientConfig) -> Result<Dashboard<HttpAnalysisService>> {
    log::debug!("using analysis service at {}", config.base_url);
    let service = HttpAnalysisService::new(config).context("Failed to build HTTP client")?;
    Ok(Dashboard::new(service))
}

fn print_view(
    view: &AnalysisViewModel,
    state: &Disclosure,
    deep_scan_available: bool,
    json: bool,
) -> Result<()> {
    if json {
        let out = ViewOutput {
            schema_version: PROTOCOL_SCHEMA_VERSION,
            state: state.name(),
            deep_scan_available,
            deep_request: None,
            view,
        };
        print_stdout(&serialize_json_pretty(&out)?)
    } else {
        print_stdout(&report::render_view_report(view, state))
    }
}

async fn run_analyze(args: &AnalyzeArgs, config: ClientConfig) -> Result<()> {
    let upload = ChatUpload::from_path(&args.file)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let mut dashboard = dashboard(config)?;
    dashboard
        .upload(&upload, args.date_format)
        .await
        .context("Fast analysis failed")?;

    if args.deep {
        if dashboard.deep_scan_enabled() {
            // A failed deep scan keeps the fast view.
            match dashboard.deep_scan().await {
                Ok(DeepOutcome::Applied) => log::info!("deep scan complete"),
                Ok(DeepOutcome::Discarded) => log::warn!("deep scan result was discarded"),
                Err(err) => log::warn!("deep scan failed, showing fast results only: {err}"),
            }
        } else {
            log::warn!("deep scan unavailable: the service returned no correlation keys");
        }
    }

    let Some(view) = dashboard.view() else {
        anyhow::bail!("No analysis to show");
    };
    print_view(
        view,
        dashboard.state(),
        dashboard.deep_scan_enabled(),
        args.json,
    )
}

async fn run_history(args: &HistoryArgs, config: ClientConfig) -> Result<()> {
    let mut dashboard = dashboard(config)?;
    let entries = dashboard
        .load_history()
        .await
        .context("Failed to load history")?;

    let Some(index) = args.select else {
        if args.json {
            return print_stdout(&serialize_json_pretty(&HistoryOutput { entries })?);
        }
        if entries.is_empty() {
            return print_stdout("No past analyses.");
        }
        return print_stdout(&report::render_history(&entries));
    };

    let selected = dashboard
        .select_history_at(index)
        .with_context(|| format!("History entry {index} is unreadable"))?;
    if selected.is_none() {
        anyhow::bail!(
            "No history entry {index} (only {} available)",
            entries.len()
        );
    }
    let Some(view) = dashboard.view() else {
        anyhow::bail!("No analysis to show");
    };
    print_view(view, dashboard.state(), false, args.json)
}

async fn run_usage(args: &UsageArgs, config: ClientConfig) -> Result<()> {
    let dashboard = dashboard(config)?;
    let usage: UsageStats = dashboard.usage().await.context("Failed to load usage")?;
    if args.json {
        print_stdout(&serialize_json_pretty(&usage)?)
    } else {
        print_stdout(&report::render_usage(&usage))
    }
}

fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        io::Read::read_to_string(&mut io::stdin(), &mut buf).context("Failed to read stdin")?;
        return Ok(buf);
    }
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn run_normalize(args: NormalizeArgs) -> Result<()> {
    let raw = read_input(&args.file)?;
    let (view, state, deep_request) = match args.kind {
        PayloadKind::Fast => {
            let fast: FastResult =
                serde_json::from_str(&raw).context("Payload is not a fast analysis result")?;
            let normalized = convoq_core::normalize_fast(&fast)?;
            let deep_request = normalized.token.as_ref().map(|t| t.to_request());
            let state = Disclosure::FastOnly {
                token: normalized.token,
            };
            (normalized.view, state, deep_request)
        }
        PayloadKind::History => {
            let record: HistoricalRecord =
                serde_json::from_str(&raw).context("Payload is not a history record")?;
            let view = convoq_core::normalize_history(&record)?;
            (view, Disclosure::DeepUnlocked, None)
        }
    };

    if args.json {
        let out = ViewOutput {
            schema_version: PROTOCOL_SCHEMA_VERSION,
            state: state.name(),
            deep_scan_available: deep_request.is_some(),
            deep_request,
            view: &view,
        };
        print_stdout(&serialize_json_pretty(&out)?)
    } else {
        print_stdout(&report::render_view_report(&view, &state))
    }
}

fn run_schema(args: SchemaArgs) -> Result<()> {
    let schema = match args.target {
        SchemaTarget::View => schemars::schema_for!(AnalysisViewModel),
        SchemaTarget::Fast => schemars::schema_for!(FastResult),
        SchemaTarget::Deep => schemars::schema_for!(DeepMergeResult),
        SchemaTarget::History => schemars::schema_for!(HistoricalRecord),
        SchemaTarget::Usage => schemars::schema_for!(UsageStats),
    };
    print_stdout(&serialize_json_pretty(&schema)?)
}
