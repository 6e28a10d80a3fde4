use anyhow::Result;
use clap::Parser;
use tracing::info;

use mailbox_agent::config::Config;
use mailbox_agent::control::ControlLoop;
use mailbox_agent::notifier;
use mailbox_agent::sampling::TokioWait;
use mailbox_agent::sensor;

#[derive(Parser, Debug)]
#[command(name = "mailbox-agent", about = "IR proximity mailbox monitor")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "/etc/mailbox-agent/config.toml")]
    config: String,

    /// Validate config and exit
    #[arg(long)]
    check: bool,

    /// Print version and exit
    #[arg(short, long)]
    version: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("mailbox-agent {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // Load configuration
    let config = Config::load(&cli.config)?;

    if cli.check {
        println!("Configuration is valid.");
        return Ok(());
    }

    // Initialize logging
    init_logging(&config)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        device = %config.agent.device_name,
        endpoint = %config.notification.url(),
        "Starting mailbox agent"
    );

    run(config).await
}

fn init_logging(config: &Config) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::new(&config.agent.log_level)
        });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    Ok(())
}

async fn run(config: Config) -> Result<()> {
    let reader = sensor::create_sensor_reader(&config)?;
    let (trigger, notification_state) = notifier::create_trigger(&config)?;

    // Every restart recalibrates; nothing is carried over between runs.
    let mut control = ControlLoop::new(&config, reader, Box::new(TokioWait), trigger);

    tokio::select! {
        _ = control.run() => {}
        res = tokio::signal::ctrl_c() => {
            res?;
            info!("Received shutdown signal, exiting");
        }
    }

    if let Some(last) = notification_state.latest() {
        info!(
            fired_at = %last.fired_at,
            status = ?last.status,
            error = ?last.error,
            "Last notification"
        );
    }

    Ok(())
}
