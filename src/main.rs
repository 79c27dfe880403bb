use clap::Parser;
use dotenvy::dotenv;
use onlyoffice_bridge::config::{ConfigStore, defaults};
use onlyoffice_bridge::services::fetcher::HttpDocumentFetcher;
use onlyoffice_bridge::{AppState, create_app};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the JSON configuration file
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Address or hostname to bind. server.host only names the public URLs
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to bind, overriding server.port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "onlyoffice_bridge=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🚀 Starting OnlyOffice bridge...");

    let config = Arc::new(ConfigStore::load(&args.config));

    let missing = config.missing_required_keys();
    if !missing.is_empty() {
        warn!("⚠️  Missing required configuration keys: {}", missing.join(", "));
    }
    if config.jwt_enabled() && config.onlyoffice_secret() == defaults::ONLYOFFICE_SECRET {
        warn!("⚠️  onlyoffice.secret is still the built-in default; set ONLYOFFICE_SECRET");
    }

    info!(
        "🛡️  Document server: {}, JWT: {}, Max Size={}MB",
        config.onlyoffice_server_url(),
        config.signing_secret().is_some(),
        config.max_file_size() / 1024 / 1024
    );

    let fetcher = Arc::new(HttpDocumentFetcher::from_config(&config)?);
    let state = AppState::new(config.clone(), fetcher);
    state.files.ensure_root().await?;

    let app = create_app(state);

    let port = args.port.unwrap_or_else(|| config.server_port());
    let listener = bind_listener(&args.host, port).await?;
    let addr = listener.local_addr()?;

    info!("✅ Server listening on: http://{}", addr);
    info!("📖 Swagger UI documentation: {}/swagger-ui", config.server_url());

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("❌ Server runtime error: {}", e);
        return Err(e.into());
    }

    info!("👋 Server exited cleanly.");
    Ok(())
}

/// Bind `host:port`, resolving hostnames as well as literal addresses.
async fn bind_listener(host: &str, port: u16) -> std::io::Result<TcpListener> {
    TcpListener::bind((host, port)).await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("❌ Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("❌ Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("⌨️  Ctrl+C received, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("💤 SIGTERM received, initiating graceful shutdown...");
        },
    }
}
