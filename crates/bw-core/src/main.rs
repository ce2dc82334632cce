//! Bridgewatch Core - Adaptive Refresh-Interval Engine
//!
//! The main entry point for bw-core, handling:
//! - Refresh-interval recommendations from an exported event log
//! - Full analysis reports, qualitative state, and insights
//! - Synthetic event generation for tuning and demos
//! - Configuration inspection and schema export

use std::io::Read;
use std::path::{Path, PathBuf};

use bw_common::{OutputFormat, RecommendationMethod, SCHEMA_VERSION};
use bw_core::config::{list_presets, load_config, load_file, ConfigOptions, ResolvedConfig};
use bw_core::engine::RefreshAnalyzer;
use bw_core::exit_codes::ExitCode;
use bw_core::log_event;
use bw_core::logging::{
    event_names, generate_run_id, init_logging, LogConfig, LogContext, LogFormat, Stage,
};
use bw_core::output::render;
use bw_core::schema::{available_schemas, generate_all_schemas, generate_schema};
use bw_core::snapshot::EventSnapshot;
use bw_core::synthetic::{self, Scenario, SyntheticConfig};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

/// Bridgewatch Core - how often to poll for drawbridge openings
#[derive(Parser)]
#[command(name = "bw-core")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Analysis config file (must exist when given)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Built-in preset (balanced, battery_saver, realtime); ignored with --config
    #[arg(long, global = true)]
    preset: Option<String>,

    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "json")]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log line format on stderr (human, jsonl)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// Recommend a polling interval for an event log
    Recommend(InputArgs),

    /// Full analysis report (every analyzer's output plus the recommendation)
    Analyze(InputArgs),

    /// Qualitative state: stability, seasonal patterns, trend
    State(InputArgs),

    /// Descriptive insights: counts, open bridges, busy hours
    Insights(InputArgs),

    /// Generate a synthetic event log
    Simulate(SimulateArgs),

    /// Configuration management
    Config(ConfigArgs),

    /// Print JSON schemas for the input and output contracts
    Schema(SchemaArgs),

    /// Print version information
    Version,
}

// ============================================================================
// Command argument structs
// ============================================================================

#[derive(Args, Debug)]
struct InputArgs {
    /// JSON array of events; `-` reads stdin
    #[arg(default_value = "-")]
    events: String,

    /// Evaluate as of this instant (RFC 3339) instead of the wall clock
    #[arg(long)]
    now: Option<DateTime<Utc>>,
}

#[derive(Args, Debug)]
struct SimulateArgs {
    /// Shape of the generated log
    #[arg(long, value_enum, default_value = "poisson")]
    scenario: Scenario,

    /// Number of events
    #[arg(long, default_value = "300")]
    count: usize,

    /// RNG seed
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Mean spacing in seconds (poisson, regular, regime_shift)
    #[arg(long, default_value = "3600")]
    mean_interval: f64,

    /// Bridge identifier for every event
    #[arg(long, default_value = "fremont")]
    bridge: String,

    /// First event time (RFC 3339); defaults to Monday 2024-01-01 UTC
    #[arg(long)]
    start: Option<DateTime<Utc>>,
}

#[derive(Args, Debug)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show the effective configuration and where it came from
    Show,

    /// Validate a config file (or the resolved one)
    Validate {
        /// File to validate
        path: Option<PathBuf>,
    },

    /// List built-in presets
    Presets,
}

#[derive(Args, Debug)]
struct SchemaArgs {
    /// Type name (see --list)
    name: Option<String>,

    /// List available types
    #[arg(long)]
    list: bool,

    /// Print every schema
    #[arg(long)]
    all: bool,
}

// ============================================================================
// Main entry point
// ============================================================================

fn main() {
    let cli = Cli::parse();

    init_logging(&LogConfig::for_cli(
        cli.global.verbose,
        cli.global.quiet,
        cli.global.log_format,
    ));

    let exit_code = match &cli.command {
        Commands::Recommend(args) => run_recommend(&cli.global, args),
        Commands::Analyze(args) => run_analyze(&cli.global, args),
        Commands::State(args) => run_state(&cli.global, args),
        Commands::Insights(args) => run_insights(&cli.global, args),
        Commands::Simulate(args) => run_simulate(&cli.global, args),
        Commands::Config(args) => run_config(&cli.global, args),
        Commands::Schema(args) => run_schema(&cli.global, args),
        Commands::Version => {
            print_version(&cli.global);
            ExitCode::Ok
        }
    };

    std::process::exit(exit_code.as_i32());
}

// ============================================================================
// Shared helpers
// ============================================================================

/// Print an error to stderr (structured for JSON) and map it to an exit code.
fn fail(global: &GlobalOpts, err: bw_common::Error) -> ExitCode {
    let code = ExitCode::from_error(&err);
    if global.format.is_machine() {
        let body = serde_json::json!({
            "schema_version": SCHEMA_VERSION,
            "error": err.to_structured(),
            "exit_code": code.code_name(),
        });
        match serde_json::to_string_pretty(&body) {
            Ok(text) => eprintln!("{text}"),
            Err(_) => eprintln!("{err}"),
        }
    } else {
        eprintln!("{}", err.format_human());
    }
    code
}

fn emit<T: bw_core::output::Render>(global: &GlobalOpts, value: &T) -> Result<(), bw_common::Error> {
    let text = render(value, global.format)?;
    print!("{text}");
    Ok(())
}

fn emit_json<T: Serialize>(value: &T) -> Result<(), bw_common::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn resolve(global: &GlobalOpts) -> Result<ResolvedConfig, bw_common::Error> {
    let options = ConfigOptions {
        config_path: global.config.clone(),
        preset: global.preset.clone(),
    };
    load_config(&options).map_err(|err| {
        tracing::debug!(target: event_names::CONFIG_ERROR, error = %err, "config rejected");
        err.into()
    })
}

fn read_events(source: &str) -> Result<EventSnapshot, bw_common::Error> {
    let json = if source == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(Path::new(source))?
    };
    EventSnapshot::from_json(&json).map_err(|e| match e {
        bw_common::Error::Json(inner) => {
            bw_common::Error::Input(format!("{source}: not a JSON array of events ({inner})"))
        }
        other => other,
    })
}

/// Everything an analysis command needs.
struct Prepared {
    analyzer: RefreshAnalyzer,
    snapshot: EventSnapshot,
    now: DateTime<Utc>,
    ctx: LogContext,
}

fn prepare(global: &GlobalOpts, args: &InputArgs) -> Result<Prepared, bw_common::Error> {
    let resolved = resolve(global)?;
    let snapshot = read_events(&args.events)?;
    let ctx = LogContext::new(generate_run_id()).with_snapshot(snapshot.digest());
    log_event!(
        ctx,
        INFO,
        event_names::RUN_STARTED,
        Stage::Ingest,
        "analysis run started",
        events = snapshot.len(),
        config = resolved.config.fingerprint().as_str()
    );
    Ok(Prepared {
        analyzer: RefreshAnalyzer::new(resolved.config),
        snapshot,
        now: args.now.unwrap_or_else(Utc::now),
        ctx,
    })
}

fn finish(ctx: &LogContext, method: RecommendationMethod) -> ExitCode {
    log_event!(
        ctx,
        INFO,
        event_names::RUN_FINISHED,
        Stage::Output,
        "analysis run finished",
        method = method.as_str()
    );
    if method == RecommendationMethod::InsufficientData {
        ExitCode::InsufficientData
    } else {
        ExitCode::Ok
    }
}

// ============================================================================
// Command implementations
// ============================================================================

fn run_recommend(global: &GlobalOpts, args: &InputArgs) -> ExitCode {
    let result = prepare(global, args).and_then(|p| {
        let report = p.analyzer.analyze_logged(&p.snapshot, p.now, &p.ctx);
        emit(global, &report.recommendation)?;
        Ok(finish(&p.ctx, report.recommendation.method))
    });
    result.unwrap_or_else(|e| fail(global, e))
}

fn run_analyze(global: &GlobalOpts, args: &InputArgs) -> ExitCode {
    let result = prepare(global, args).and_then(|p| {
        let report = p.analyzer.analyze_logged(&p.snapshot, p.now, &p.ctx);
        emit(global, &report)?;
        Ok(finish(&p.ctx, report.recommendation.method))
    });
    result.unwrap_or_else(|e| fail(global, e))
}

fn run_state(global: &GlobalOpts, args: &InputArgs) -> ExitCode {
    let result = prepare(global, args).and_then(|p| {
        emit(global, &p.analyzer.analysis_state(&p.snapshot))?;
        Ok(ExitCode::Ok)
    });
    result.unwrap_or_else(|e| fail(global, e))
}

fn run_insights(global: &GlobalOpts, args: &InputArgs) -> ExitCode {
    let result = prepare(global, args).and_then(|p| {
        emit(global, &p.analyzer.insights(&p.snapshot))?;
        Ok(ExitCode::Ok)
    });
    result.unwrap_or_else(|e| fail(global, e))
}

fn run_simulate(global: &GlobalOpts, args: &SimulateArgs) -> ExitCode {
    if !(args.mean_interval.is_finite() && args.mean_interval > 0.0) {
        return fail(
            global,
            bw_common::Error::Input(format!(
                "--mean-interval must be a positive number of seconds, got {}",
                args.mean_interval
            )),
        );
    }
    let config = SyntheticConfig {
        scenario: args.scenario,
        count: args.count,
        seed: args.seed,
        start: args.start.unwrap_or_else(synthetic::default_start),
        mean_interval_seconds: args.mean_interval,
        bridge_id: args.bridge.clone(),
    };
    let events = synthetic::generate(&config);
    let result = match global.format {
        OutputFormat::Summary => {
            println!(
                "generated {} {:?} events (seed {})",
                events.len(),
                args.scenario,
                args.seed
            );
            Ok(())
        }
        // The log itself is the payload; Markdown would not round-trip.
        OutputFormat::Json | OutputFormat::Md => emit_json(&events),
    };
    match result {
        Ok(()) => ExitCode::Ok,
        Err(e) => fail(global, e),
    }
}

fn run_config(global: &GlobalOpts, args: &ConfigArgs) -> ExitCode {
    let result = match &args.command {
        ConfigCommands::Show => run_config_show(global),
        ConfigCommands::Validate { path } => run_config_validate(global, path.as_deref()),
        ConfigCommands::Presets => run_config_presets(global),
    };
    result.unwrap_or_else(|e| fail(global, e))
}

fn run_config_show(global: &GlobalOpts) -> Result<ExitCode, bw_common::Error> {
    let resolved = resolve(global)?;
    let snapshot = resolved.snapshot();
    match global.format {
        OutputFormat::Json => emit_json(&serde_json::json!({
            "schema_version": SCHEMA_VERSION,
            "snapshot": snapshot,
            "config": resolved.config,
        }))?,
        OutputFormat::Md => {
            println!("# Analysis config\n");
            println!("- Source: {}", snapshot.config_source);
            if let Some(path) = &snapshot.config_path {
                println!("- Path: `{path}`");
            }
            if let Some(preset) = &snapshot.preset {
                println!("- Preset: {preset}");
            }
            println!("- Strategy: {}", snapshot.summary.strategy);
            println!(
                "- Interval bounds: {:.0}..{:.0} s (default {:.0} s)",
                snapshot.summary.min_interval_seconds,
                snapshot.summary.max_interval_seconds,
                snapshot.summary.default_interval_seconds
            );
            println!("- Fingerprint: `{}`", snapshot.config_hash);
        }
        OutputFormat::Summary => println!(
            "config: {} ({}), strategy {}",
            snapshot.config_source,
            &snapshot.config_hash[..12.min(snapshot.config_hash.len())],
            snapshot.summary.strategy
        ),
    }
    Ok(ExitCode::Ok)
}

fn run_config_validate(
    global: &GlobalOpts,
    path: Option<&Path>,
) -> Result<ExitCode, bw_common::Error> {
    let (config, shown) = match path {
        Some(path) => (load_file(path)?, path.display().to_string()),
        None => {
            let resolved = resolve(global)?;
            let shown = resolved
                .paths
                .analysis
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| resolved.paths.source.to_string());
            (resolved.config, shown)
        }
    };
    match global.format {
        OutputFormat::Json => emit_json(&serde_json::json!({
            "schema_version": SCHEMA_VERSION,
            "status": "valid",
            "config": shown,
            "fingerprint": config.fingerprint(),
        }))?,
        OutputFormat::Md | OutputFormat::Summary => println!("config validate: OK ({shown})"),
    }
    Ok(ExitCode::Ok)
}

fn run_config_presets(global: &GlobalOpts) -> Result<ExitCode, bw_common::Error> {
    let presets = list_presets();
    match global.format {
        OutputFormat::Json => {
            let list: Vec<_> = presets
                .iter()
                .map(|(name, description)| {
                    serde_json::json!({ "name": name.as_str(), "description": description })
                })
                .collect();
            emit_json(&serde_json::json!({ "presets": list }))?;
        }
        OutputFormat::Md | OutputFormat::Summary => {
            for (name, description) in presets {
                println!("{:<14} {description}", name.as_str());
            }
        }
    }
    Ok(ExitCode::Ok)
}

fn run_schema(global: &GlobalOpts, args: &SchemaArgs) -> ExitCode {
    let result = if args.list {
        let list: Vec<_> = available_schemas()
            .into_iter()
            .map(|(name, description)| serde_json::json!({ "name": name, "description": description }))
            .collect();
        emit_json(&list)
    } else if args.all {
        emit_json(&generate_all_schemas())
    } else {
        let name = args.name.as_deref().unwrap_or("RefreshIntervalRecommendation");
        match generate_schema(name) {
            Some(schema) => emit_json(&schema),
            None => {
                eprintln!("Unknown schema type '{name}'. Use --list to see available types.");
                return ExitCode::ArgsError;
            }
        }
    };
    match result {
        Ok(()) => ExitCode::Ok,
        Err(e) => fail(global, e),
    }
}

fn print_version(global: &GlobalOpts) {
    let version = env!("CARGO_PKG_VERSION");
    match global.format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({
                "bw_core": version,
                "schema_version": SCHEMA_VERSION,
                "config_schema_version": bw_config::CONFIG_SCHEMA_VERSION,
            })
        ),
        OutputFormat::Md | OutputFormat::Summary => {
            println!("bw-core {version} (schema {SCHEMA_VERSION})")
        }
    }
}
