use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use pupmatch_algo::config::{LoggingSettings, Settings, StorageBackend};
use pupmatch_algo::core::Matcher;
use pupmatch_algo::routes::{
    self, handle_json_payload_error, handle_query_payload_error, AppState,
};
use pupmatch_algo::services::{CacheManager, CachingStore, MatchStore, MemoryStore, PostgresStore};

fn init_tracing(logging: &LoggingSettings) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if logging.format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.compact().init();
    }
}

async fn build_store(settings: &Settings) -> std::io::Result<Arc<dyn MatchStore>> {
    let store: Arc<dyn MatchStore> = match settings.storage.backend {
        StorageBackend::Postgres => {
            let postgres = PostgresStore::connect(&settings.database).await.map_err(|e| {
                error!("Failed to connect to PostgreSQL: {}", e);
                std::io::Error::other(format!("PostgreSQL connection error: {}", e))
            })?;
            info!(
                "PostgreSQL store initialized (max: {} connections, replica: {})",
                settings.database.max_connections(),
                settings.database.replica_url.is_some()
            );
            Arc::new(postgres)
        }
        StorageBackend::Memory => {
            warn!("Using the in-memory store; swipes and matches are lost on restart");
            Arc::new(MemoryStore::new(settings.storage.grid_cell_degrees))
        }
    };

    if !settings.cache.enabled {
        return Ok(store);
    }

    let cache_ttl = settings.cache.ttl_secs.unwrap_or(300);
    let l1_cache_size = settings.cache.l1_cache_size.unwrap_or(1000);

    let cache = match CacheManager::new(
        settings.cache.redis_url.as_deref(),
        l1_cache_size,
        cache_ttl,
    )
    .await
    {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to connect to Redis ({}), using the in-process cache only", e);
            CacheManager::in_process(l1_cache_size, cache_ttl)
        }
    };

    info!(
        "Profile cache enabled (L1: {} entries, TTL: {}s, Redis: {})",
        l1_cache_size,
        cache_ttl,
        cache.has_l2()
    );
    Ok(Arc::new(CachingStore::new(store, cache)))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let loaded = Settings::load();
    let logging = loaded
        .as_ref()
        .map(|s| s.logging.clone())
        .unwrap_or_default();
    init_tracing(&logging);

    info!("Starting PupMatch matching service...");

    let settings = loaded.map_err(|e| {
        error!("Failed to load configuration: {}", e);
        std::io::Error::other(format!("Configuration error: {}", e))
    })?;

    info!("Configuration loaded successfully");

    let store = build_store(&settings).await?;
    let options = settings.retrieval_options();
    info!("Matcher initialized with options: {:?}", options);

    let app_state = AppState {
        matcher: Matcher::new(store, options),
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
