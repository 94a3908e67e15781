use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use authguard::audit::{event_types, AuthEvent, AuthLogger};
use authguard::config::{AuthGuardConfig, LogFormat};
use authguard::ratelimit::{RateLimiter, Sweeper};

/// Answer allow/deny for identifiers read from stdin, one per line.
#[derive(Parser, Debug)]
#[command(name = "authguard", version)]
#[command(about = "Fixed-window rate limiter for authentication endpoints")]
struct Args {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Requests allowed per window (overrides the configured default)
    #[arg(long)]
    max_requests: Option<u32>,

    /// Window length in milliseconds (overrides the configured default)
    #[arg(long)]
    window_ms: Option<u64>,

    /// Log output format
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => AuthGuardConfig::from_file(path)?,
        None => AuthGuardConfig::default(),
    };
    if let Some(max_requests) = args.max_requests {
        config.rate_limiting.default_limit.max_requests = max_requests;
    }
    if let Some(window_ms) = args.window_ms {
        config.rate_limiting.default_limit.window_ms = window_ms;
    }
    if let Some(format) = args.log_format {
        config.logging.format = format;
    }
    config.validate()?;

    init_tracing(&config);

    info!("Starting authguard");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let limiter = Arc::new(RateLimiter::with_default_limit(
        config.rate_limiting.default_limit.into(),
    ));
    let logger = AuthLogger::default();
    info!(
        max_requests = limiter.default_limit().max_requests,
        window_ms = limiter.default_limit().window.as_millis() as u64,
        "Rate limiter initialized"
    );

    let sweeper = Sweeper::new(config.rate_limiting.sweep_interval())?.spawn(Arc::clone(&limiter));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = &mut shutdown => break,
        };
        let Some(line) = line else {
            info!("Input closed");
            break;
        };

        let identifier = line.trim();
        if identifier.is_empty() {
            continue;
        }

        let allowed = limiter.check(identifier);
        if !allowed {
            logger.log_auth_event(
                &AuthEvent::new(event_types::RATE_LIMITED)
                    .with_details(serde_json::json!({ "identifier": identifier })),
            );
        }

        let verdict = if allowed { "allow" } else { "deny" };
        if let Err(e) = stdout
            .write_all(format!("{} {}\n", identifier, verdict).as_bytes())
            .await
        {
            warn!(error = %e, "Failed to write decision");
            break;
        }
    }

    sweeper.shutdown().await;
    info!("authguard stopped");
    Ok(())
}

fn init_tracing(config: &AuthGuardConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    // Logs go to stderr; stdout carries decisions
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(true);

    match config.logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
