use std::time::Duration;

use facet::Facet;
use figue as args;
use leakwatch::{CheckOptions, ReportFormat, Tracker, TrackerConfig};

mod scenarios;

type AnyResult<T> = Result<T, String>;

#[derive(Facet, Debug)]
struct Cli {
    #[facet(flatten)]
    builtins: args::FigueBuiltins,
    /// short, summary, details or json
    #[facet(args::named, default)]
    format: Option<String>,
    #[facet(args::named, default)]
    idle_threshold_ms: Option<u64>,
    #[facet(args::named, default)]
    settle_delay_ms: Option<u64>,
    #[facet(args::subcommand)]
    command: CommandKind,
}

#[derive(Facet, Debug)]
#[repr(u8)]
enum CommandKind {
    CleanWorker,
    LeakedWorker,
    TransferredEndpoint,
    IdleWorker,
    SharedBuffer,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

async fn run() -> AnyResult<()> {
    let cli = parse_cli()?;
    let config = config_from_cli(&cli)?;
    let tracker = Tracker::with_config(config);
    let options = CheckOptions::default().format(config.format);

    tracker.track().map_err(|e| e.to_string())?;
    match cli.command {
        CommandKind::CleanWorker => scenarios::clean_worker::run(&tracker, options).await,
        CommandKind::LeakedWorker => scenarios::leaked_worker::run(&tracker, options).await,
        CommandKind::TransferredEndpoint => {
            scenarios::transferred_endpoint::run(&tracker, options).await
        }
        CommandKind::IdleWorker => scenarios::idle_worker::run(&tracker, options).await,
        CommandKind::SharedBuffer => scenarios::shared_buffer::run(&tracker, options).await,
    }
}

fn parse_cli() -> AnyResult<Cli> {
    let figue_config = args::builder::<Cli>()
        .map_err(|e| format!("failed to build CLI schema: {e}"))?
        .cli(|cli| cli.strict())
        .help(|h| {
            h.program_name("leakwatch-examples")
                .description("Run leak detection scenarios as subcommands")
                .version(option_env!("CARGO_PKG_VERSION").unwrap_or("dev"))
        })
        .build();

    args::Driver::new(figue_config)
        .run()
        .into_result()
        .map(|v| v.value)
        .map_err(|e| e.to_string())
}

/// Environment first, then command-line flags on top.
fn config_from_cli(cli: &Cli) -> AnyResult<TrackerConfig> {
    let mut config = TrackerConfig::from_env().map_err(|e| e.to_string())?;
    if let Some(format) = &cli.format {
        let format: ReportFormat = format.parse().map_err(|e| format!("--format: {e}"))?;
        config = config.with_format(format);
    }
    if let Some(ms) = cli.idle_threshold_ms {
        config = config
            .with_idle_threshold(Duration::from_millis(ms))
            .map_err(|e| e.to_string())?;
    }
    if let Some(ms) = cli.settle_delay_ms {
        config = config.with_settle_delay(Duration::from_millis(ms));
    }
    Ok(config)
}
