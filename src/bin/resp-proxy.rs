use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

use resp_proxy::logging::init_logging;
use resp_proxy::{RespProxy, load_config_with_fallback};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on (overrides the config file)
    ///
    /// Can be overridden with RESP_PROXY_PORT environment variable
    #[arg(short, long, env = "RESP_PROXY_PORT")]
    port: Option<u16>,

    /// Address to bind (overrides the config file)
    ///
    /// Can be overridden with RESP_PROXY_HOST environment variable
    #[arg(long, env = "RESP_PROXY_HOST")]
    host: Option<String>,

    /// Configuration file path
    ///
    /// Can be overridden with RESP_PROXY_CONFIG environment variable
    #[arg(short, long, default_value = "config.toml", env = "RESP_PROXY_CONFIG")]
    config: String,

    /// Number of worker threads (defaults to number of CPU cores)
    ///
    /// Can be overridden with RESP_PROXY_THREADS environment variable
    #[arg(short, long, env = "RESP_PROXY_THREADS")]
    threads: Option<usize>,

    /// Also write logs to this file, without colors
    ///
    /// Can be overridden with RESP_PROXY_LOG_FILE environment variable
    #[arg(long, env = "RESP_PROXY_LOG_FILE")]
    log_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard = init_logging(args.log_file.as_deref());

    let num_cpus = std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(1);
    let worker_threads = args.threads.unwrap_or(num_cpus).max(1);

    // Use different runtime based on thread count
    let rt = if worker_threads == 1 {
        info!("Starting RESP proxy with single-threaded runtime");
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?
    } else {
        info!(
            worker_threads,
            detected_cpus = num_cpus,
            "Starting RESP proxy with multi-threaded runtime"
        );
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(worker_threads)
            .enable_all()
            .build()?
    };

    rt.block_on(run_proxy(args))
}

async fn run_proxy(args: Args) -> Result<()> {
    let (mut config, source) = match load_config_with_fallback(&args.config) {
        Ok(loaded) => loaded,
        Err(e) => {
            error!(path = %args.config, error = %e, "Failed to load configuration");
            return Err(e);
        }
    };
    info!(source = source.description(), "Configuration loaded");

    if let Some(port) = args.port {
        config.proxy.port = port;
    }
    if let Some(host) = args.host {
        config.proxy.host = host;
    }

    for instance in &config.instances {
        info!(instance = %instance.name, host = %instance.host, port = instance.port, "Instance configured");
    }

    let proxy = RespProxy::new(&config)?;

    let listen_addr = config.proxy.listen_addr();
    let listener = TcpListener::bind(&listen_addr)
        .await
        .with_context(|| format!("Failed to bind {listen_addr}"))?;

    tokio::select! {
        result = proxy.serve(listener) => result?,
        () = shutdown_signal() => {
            info!("Shutdown signal received, closing idle connections...");
        }
    }

    proxy.graceful_shutdown().await;
    info!("Graceful shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        _ = terminate => {},
    }
}
