use anyhow::Context;
use clap::Parser;
use mock_web_server::{MockWebServer, ServerConfig};
use std::net::IpAddr;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Standalone mock web server serving scripted responses
#[derive(Parser, Debug)]
#[command(name = "mock-web-server", version)]
struct Args {
    /// Port to listen on (0 = ephemeral)
    #[arg(short, long, env = "MOCK_WEB_SERVER_PORT")]
    port: Option<u16>,
    /// Address to bind
    #[arg(long)]
    host: Option<IpAddr>,
    /// YAML or JSON file with server settings and queued responses
    #[arg(short, long)]
    config: Option<String>,
    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .init();

    let mut config = match args.config {
        Some(ref path) => ServerConfig::from_file(path)?,
        None => ServerConfig::default(),
    };
    if let Some(host) = args.host {
        config.host = host;
    }

    let server = MockWebServer::with_config(config);
    let mut requests = server.request_stream();
    server
        .start(args.port)
        .await
        .context("Failed to start mock web server")?;
    if let Some(url) = server.url() {
        info!("Serving scripted responses at {}", url);
    }

    loop {
        tokio::select! {
            Some(request) = requests.recv() => {
                info!(
                    "{} {} ({} response(s) left)",
                    request.method,
                    request.uri,
                    server.queued_responses()
                );
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    for failure in server.take_listener_failures() {
        info!("Unscripted interaction: {}", failure);
    }
    server.shutdown().await;
    Ok(())
}
