use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use collabverse::app::{router, AppState};
use collabverse::config::{AppConfig, StoreConfig};
use collabverse::store::memory::InMemoryStore;
use collabverse::store::DocumentStore;

#[derive(Parser, Debug)]
#[command(name = "collabverse", about = "CollabVerse listings API server")]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

async fn connect_store(config: &StoreConfig) -> anyhow::Result<Arc<dyn DocumentStore>> {
    match config {
        StoreConfig::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on restart");
            Ok(Arc::new(InMemoryStore::new()))
        }
        #[cfg(feature = "mongo")]
        StoreConfig::Mongo { uri, database } => {
            let client = mongodb::Client::with_uri_str(uri)
                .await
                .context("Failed to connect to MongoDB")?;
            tracing::info!("Connected to MongoDB at {}", uri);
            Ok(Arc::new(collabverse::store::mongo::MongoDocumentStore::new(
                &client.database(database),
            )))
        }
        #[cfg(feature = "firebase")]
        StoreConfig::Firebase { url, auth_token } => {
            tracing::info!("Using Firebase Realtime Database at {}", url);
            Ok(Arc::new(
                collabverse::store::firebase::FirebaseDocumentStore::new(url, auth_token.clone()),
            ))
        }
        #[allow(unreachable_patterns)]
        other => anyhow::bail!("Store backend {:?} is not compiled into this build", other),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "collabverse=info,tower_http=info".into()),
        )
        .init();

    tracing::info!("Starting CollabVerse server...");

    let args = Args::parse();
    let config = AppConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    let store = connect_store(&config.store).await?;
    let identity = Arc::new(config.identity_provider());
    tracing::info!("{} API token(s) configured", identity.len());

    if config.demo_mode {
        tracing::info!("Demo mode enabled");
        collabverse::demo_seeder::seed_demo_data(store.as_ref())
            .await
            .context("Failed to seed demo data")?;
    }

    let app = router(AppState::new(store, identity, config.demo_mode));

    tracing::info!("Listening on http://{}", config.listen_addr);
    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
