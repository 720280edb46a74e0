//! signlearn - learning platform API

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use signlearn::{
    config::{Args, StoreBackend},
    db::MongoClient,
    seed::CatalogSeed,
    server,
    store::{MemoryStore, MongoStore, Store},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  signlearn - learning platform API");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("Store: {:?}", args.store);
    info!("MongoDB: {} (db: {})", args.mongodb_uri, args.mongodb_db);
    info!("Enrollment counting: {:?}", args.enrollment_counting);
    info!("Request timeout: {}ms", args.request_timeout_ms);
    info!("======================================");

    let store = open_store(&args).await?;

    if let Some(ref path) = args.seed_file {
        let seed = CatalogSeed::load(path).await?;
        let report = seed.apply(store.as_ref()).await?;
        info!(
            "Seeded {} courses and {} packages from {}",
            report.courses,
            report.packages,
            path.display()
        );
    }

    let state = Arc::new(server::AppState::new(args, store));
    server::run(state).await?;

    Ok(())
}

/// Connect the configured backend. In dev mode an unreachable MongoDB falls
/// back to the in-memory store.
async fn open_store(args: &Args) -> anyhow::Result<Arc<dyn Store>> {
    if args.store == StoreBackend::Memory {
        info!("Using in-memory store");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let connected = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
        Ok(client) => MongoStore::new(&client).await,
        Err(e) => Err(e),
    };

    match connected {
        Ok(store) => {
            info!("MongoDB connected successfully");
            Ok(Arc::new(store))
        }
        Err(e) if args.dev_mode => {
            warn!("MongoDB unavailable (dev mode, using in-memory store): {}", e);
            Ok(Arc::new(MemoryStore::new()))
        }
        Err(e) => {
            error!("MongoDB connection failed: {}", e);
            Err(e.into())
        }
    }
}
