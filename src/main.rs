use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use postboard::config::{Cli, Config};
use postboard::routes;
use postboard::service::PostService;
use postboard::state::AppState;
use postboard::store::{SupabaseClient, SupabaseObjectStore, SupabaseRecordStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Pick up SUPABASE_* and PORT from a local .env if there is one
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let config = Config::load(&cli)?;

    let (url, key) = match config.supabase.credentials() {
        Ok(credentials) => credentials,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };

    let client = match SupabaseClient::new(url, key) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("Error connecting to Supabase: {}", e);
            std::process::exit(1);
        }
    };

    let service = PostService::new(
        Arc::new(SupabaseRecordStore::new(client.clone())),
        Arc::new(SupabaseObjectStore::new(
            client,
            config.supabase.bucket.clone(),
        )),
    );

    // Bucket setup failure is not fatal; uploads will report it
    if let Err(e) = service.prepare_storage().await {
        tracing::warn!("Storage bucket setup error: {}", e);
    }

    let app = routes::app(AppState::new(service), config.max_upload_bytes());

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
