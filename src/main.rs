//! kafka-topic-sync
//!
//! Main entry point. Loads settings, resolves the topic declarations to
//! process and runs them through the reconciler one at a time.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use kafka_topic_sync::{
    adapters::{KafkaTopicsCli, ZkTopicRegistry},
    driver::{Driver, ErrorPolicy, OutputFormat, RunSummary},
    error::FATAL_EXIT_CODE,
    metrics,
    reconcilers::TopicReconciler,
    settings::Settings,
    topic, Error,
};

/// Exit code after SIGINT/SIGTERM
const INTERRUPTED_EXIT_CODE: u8 = 130;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Create Kafka topics and sync their configs from YAML declarations",
    long_about = None
)]
struct Args {
    /// Topics to reconcile; defaults to every declaration in the topics directory
    topics: Vec<String>,

    /// Settings file (YAML)
    #[arg(long, env = "KAFKA_TOPIC_SYNC_SETTINGS")]
    settings: Option<PathBuf>,

    /// ZooKeeper connect string
    #[arg(long)]
    zookeeper: Option<String>,

    /// Directory containing kafka-topics.sh
    #[arg(long)]
    kafka_bin_dir: Option<PathBuf>,

    /// Directory containing <topic>.yaml declarations
    #[arg(long)]
    topics_dir: Option<PathBuf>,

    /// Keep reconciling remaining topics after one fails
    #[arg(long)]
    continue_on_error: bool,

    /// Report format on stdout
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,

    /// Log format on stderr
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Write Prometheus metrics to this file when the run ends
    #[arg(long)]
    metrics_file: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize tracing
    init_tracing(args.log_format);

    let metrics_file = args.metrics_file.clone();

    let code = tokio::select! {
        result = run(args) => match result {
            Ok(summary) if summary.is_success() => ExitCode::SUCCESS,
            Ok(summary) => {
                for failure in &summary.failures {
                    eprintln!("ERROR: {}: {}", failure.source.display(), failure.error);
                }
                ExitCode::from(FATAL_EXIT_CODE)
            }
            Err(e) => {
                error!(error = %e, "Sync aborted");
                eprintln!("ERROR: {}", e);
                let code = e
                    .downcast_ref::<Error>()
                    .map(Error::exit_code)
                    .unwrap_or(FATAL_EXIT_CODE);
                ExitCode::from(code)
            }
        },
        _ = shutdown_signal() => {
            warn!("Interrupted, remaining topics were not processed");
            ExitCode::from(INTERRUPTED_EXIT_CODE)
        }
    };

    if let Some(path) = metrics_file {
        if let Err(e) = metrics::write_textfile(&path) {
            error!(path = %path.display(), error = %e, "Failed to write metrics");
        }
    }

    code
}

async fn run(args: Args) -> anyhow::Result<RunSummary> {
    let settings = load_settings(&args)?;
    info!(
        zookeeper = %settings.zookeeper_connect,
        topics_dir = %settings.topics_dir.display(),
        "Starting kafka-topic-sync"
    );

    let files = if args.topics.is_empty() {
        topic::discover(&settings.topics_dir)?
    } else {
        args.topics
            .iter()
            .map(|name| topic::resolve(&settings.topics_dir, name))
            .collect()
    };

    if files.is_empty() {
        warn!(topics_dir = %settings.topics_dir.display(), "No topic declarations found");
    }

    let registry = ZkTopicRegistry::from_settings(&settings);
    let admin = KafkaTopicsCli::from_settings(&settings);
    let reconciler = TopicReconciler::new(&registry, &admin, &settings.documentation_url);

    let mut driver = Driver::new(
        reconciler,
        ErrorPolicy::from_continue_flag(settings.continue_on_error),
        std::io::stdout(),
    )
    .with_format(args.output);

    Ok(driver.run(&files).await?)
}

/// Settings file first, then command-line overrides
fn load_settings(args: &Args) -> kafka_topic_sync::Result<Settings> {
    let mut settings = Settings::load(args.settings.as_deref())?;

    if let Some(zookeeper) = &args.zookeeper {
        settings.zookeeper_connect = zookeeper.clone();
    }
    if let Some(dir) = &args.kafka_bin_dir {
        settings.kafka_bin_dir = dir.clone();
    }
    if let Some(dir) = &args.topics_dir {
        settings.topics_dir = dir.clone();
    }
    if args.continue_on_error {
        settings.continue_on_error = true;
    }

    settings.validate()?;
    Ok(settings)
}

/// Initialize tracing subscriber
fn init_tracing(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);
    match format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install CTRL+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received CTRL+C signal");
        }
        _ = terminate => {
            info!("Received SIGTERM signal");
        }
    }
}
