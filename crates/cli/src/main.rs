use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use chatrelay_config::{ChatrelayConfig, Severity};

#[derive(Parser)]
#[command(name = "chatrelay", about = "chatrelay — visitor chat to operator channel router")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file path (overrides standard discovery).
    #[arg(long, global = true, env = "CHATRELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind to (overrides config value).
    #[arg(long, global = true)]
    bind: Option<String>,

    /// Port to listen on (overrides config value).
    #[arg(long, global = true)]
    port: Option<u16>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway server (default when no subcommand is provided).
    Serve,
    /// Validate the configuration and print diagnostics.
    Check,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<ChatrelayConfig> {
    let mut config = match &cli.config {
        Some(path) => chatrelay_config::load_config(path)?,
        None => chatrelay_config::discover_and_load(),
    };
    if let Some(bind) = &cli.bind {
        config.server.bind = bind.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    Ok(config)
}

async fn open_pool(config: &ChatrelayConfig) -> anyhow::Result<sqlx::SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(&config.storage.database)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;
    Ok(pool)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);
    info!(version = env!("CARGO_PKG_VERSION"), "chatrelay starting");

    let config = load_config(&cli)?;

    match cli.command {
        None | Some(Commands::Serve) => {
            for diagnostic in chatrelay_config::validate(&config) {
                match diagnostic.severity {
                    Severity::Error => {
                        anyhow::bail!("config error at {}: {}", diagnostic.field, diagnostic.message)
                    },
                    Severity::Warning => {
                        tracing::warn!(field = %diagnostic.field, "{}", diagnostic.message)
                    },
                }
            }

            let pool = open_pool(&config).await?;
            chatrelay_gateway::start_gateway(config, pool).await
        },
        Some(Commands::Check) => {
            let diagnostics = chatrelay_config::validate(&config);
            if diagnostics.is_empty() {
                println!("config OK");
                return Ok(());
            }
            let mut has_errors = false;
            for diagnostic in &diagnostics {
                let tag = match diagnostic.severity {
                    Severity::Error => {
                        has_errors = true;
                        "error"
                    },
                    Severity::Warning => "warning",
                };
                println!("{tag}: [{}] {}", diagnostic.field, diagnostic.message);
            }
            if has_errors {
                anyhow::bail!("configuration has errors");
            }
            Ok(())
        },
    }
}
