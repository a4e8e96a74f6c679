//! devmon - live terminal dashboard of physical devices
//!
//! Startup sequence:
//! - Load `.env`, then configuration (file, environment, flags)
//! - Log in and run a connection test before touching the terminal
//! - Hand the terminal to the scheduler until Ctrl+C or SIGTERM

use anyhow::{Context, Result};
use devmon::config::{program_name, usage_text, Command, MonitorConfig, ENV_ACCEPT_INVALID_CERTS};
use devmon::display::{extract_host, Dashboard, FrameOptions, Screen};
use devmon::{RetryPolicy, Scheduler, SessionClient};
use std::fs::OpenOptions;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();
    let config = match MonitorConfig::load(&args) {
        Ok(Command::Run(config)) => config,
        Ok(Command::Help(text)) => {
            println!("{text}");
            return Ok(());
        }
        Err(e) => {
            eprintln!("Error: {e}\n");
            eprintln!("{}", usage_text(program_name(&args)));
            std::process::exit(1);
        }
    };

    init_logging(&config)?;
    if config.accept_invalid_certs {
        eprintln!(
            "warning: TLS certificate validation is disabled for {} (set {}=false to enforce it)",
            config.base_url, ENV_ACCEPT_INVALID_CERTS
        );
    }
    info!("devmon {} starting against {}", env!("CARGO_PKG_VERSION"), config.base_url);

    let client = Arc::new(SessionClient::new(&config).context("Failed to create API client")?);
    client
        .login(&config.username, &config.password)
        .await
        .context("Failed to authenticate")?;
    client
        .test_connection()
        .await
        .context("Connection test failed")?;

    let options = FrameOptions {
        color: config.color_output,
        show_timestamp: config.show_timestamp,
        poll_interval: config.poll_interval,
        mgmt_host: extract_host(&config.base_url).to_string(),
        stale_after: config.stale_after,
    };
    let dashboard = Dashboard::new(Screen::stdout(), options);
    let retry = RetryPolicy::new(config.max_retries, config.retry_backoff);
    let mut scheduler = Scheduler::new(client, dashboard, config.poll_interval, retry);
    let handle = scheduler.handle();

    // The scheduler is polled first so it is running before a signal can stop it
    let run = scheduler.start();
    tokio::pin!(run);
    let result = tokio::select! {
        biased;
        result = &mut run => result,
        _ = shutdown_signal() => {
            handle.stop();
            run.await
        }
    };
    result.context("Dashboard failed")?;
    info!("devmon exited cleanly");
    Ok(())
}

/// Logs go to `log_file` when configured; stdout belongs to the dashboard.
fn init_logging(config: &MonitorConfig) -> Result<()> {
    let Some(path) = &config.log_file else {
        return Ok(());
    };
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("devmon=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(file))
        .init();
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
