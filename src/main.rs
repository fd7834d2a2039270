mod console;
mod host;
mod http_client;
mod interactive;
mod model;
mod oauth;

use std::time::Duration;

use clap::Parser;
use console::StdinLineReader;
use host::ApplicationLifetime;
use http_client::ProxyConfig;
use interactive::InteractiveService;
use model::arg::Args;
use model::config::Config;
use oauth::OidcClientService;

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging; stdout belongs to the console dialogue
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Load configuration
    let config_path = args
        .config
        .unwrap_or_else(|| Config::default_config_path().to_string());
    let mut config = Config::load(&config_path).unwrap_or_else(|e| {
        tracing::error!("Failed to load config: {}", e);
        std::process::exit(1);
    });
    if args.no_browser {
        config.open_browser = false;
    }
    tracing::info!(
        "Loaded config from {} with {} provider(s)",
        config
            .config_path()
            .map(|p| p.display().to_string())
            .unwrap_or_default(),
        config.providers.len()
    );

    // Build proxy configuration
    let proxy_config = ProxyConfig::from_config(&config);
    if let Some(proxy) = &proxy_config {
        tracing::info!("HTTP proxy configured: {}", proxy.url);
    }

    let shutdown_timeout = Duration::from_secs(config.shutdown_timeout_secs);

    let service = OidcClientService::new(config, proxy_config).unwrap_or_else(|e| {
        tracing::error!("Failed to create authentication service: {}", e);
        std::process::exit(1);
    });

    let input = StdinLineReader::spawn().unwrap_or_else(|e| {
        tracing::error!("Failed to start console reader: {}", e);
        std::process::exit(1);
    });

    let lifetime = ApplicationLifetime::new();
    let interactive =
        InteractiveService::new(lifetime.clone(), service, input, std::io::stdout());
    let mut worker = tokio::spawn(interactive.run());

    // Everything is wired up; let the login loop start prompting
    lifetime.notify_started();

    let stopping = lifetime.stopping_token();
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::error!("Failed to listen for Ctrl-C: {}", e);
            }
            lifetime.stop_application();
        }
        _ = stopping.stopped() => {}
        result = &mut worker => {
            report_worker_exit(result);
            return;
        }
    }

    match tokio::time::timeout(shutdown_timeout, worker).await {
        Ok(result) => report_worker_exit(result),
        Err(_) => tracing::warn!("Login loop did not stop within {:?}", shutdown_timeout),
    }
}

fn report_worker_exit(result: Result<anyhow::Result<()>, tokio::task::JoinError>) {
    match result {
        Ok(Ok(())) => tracing::debug!("Login loop finished"),
        Ok(Err(e)) => {
            tracing::error!("Login loop failed: {}", e);
            std::process::exit(1);
        }
        Err(e) => {
            tracing::error!("Login loop panicked: {}", e);
            std::process::exit(1);
        }
    }
}
