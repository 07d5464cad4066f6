use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use roofscope::config::{LoggingSettings, Settings};
use roofscope::routes::{self, AppState, TokenVerifier};
use roofscope::services::{
    CacheManager, CrmService, ExportService, GatewayClient, GatewayTables, ImageResolverChain, ObjectStore,
    PropertyQueries,
};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn init_logging(settings: &LoggingSettings) {
    // LOG_LEVEL / LOG_FORMAT win over the config file
    let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| settings.level.clone());
    let format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| settings.format.clone());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }
}

fn startup_error(context: &str, e: impl std::fmt::Display) -> io::Error {
    error!("{}: {}", context, e);
    io::Error::new(io::ErrorKind::Other, format!("{}: {}", context, e))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // ROOFSCOPE_CONFIG points at a single config file instead of config/
    let settings = match std::env::var("ROOFSCOPE_CONFIG") {
        Ok(path) => Settings::load_from(path),
        Err(_) => Settings::load(),
    };
    init_logging(
        &settings
            .as_ref()
            .map(|s| s.logging.clone())
            .unwrap_or_default(),
    );

    info!("Starting roofscope dashboard service...");

    let settings = settings.map_err(|e| startup_error("Configuration error", e))?;
    info!("Configuration loaded successfully");

    let timeout = Duration::from_secs(settings.gateway.timeout_secs.unwrap_or(30));

    let tables = GatewayTables {
        properties: settings.tables.properties.clone(),
        crm_interactions: settings.tables.crm_interactions.clone(),
        property_images: settings.tables.property_images.clone(),
        access_requests: settings.tables.access_requests.clone(),
    };

    let mut gateway = GatewayClient::new(
        settings.gateway.url.clone(),
        settings.gateway.api_key.clone(),
        tables,
        timeout,
    )
    .map_err(|e| startup_error("Failed to build gateway client", e))?;
    if let Some(page_size) = settings.gateway.page_size {
        gateway = gateway.with_page_size(page_size);
    }
    let gateway = Arc::new(gateway);

    let store = Arc::new(
        ObjectStore::new(settings.gateway.url.clone(), settings.gateway.api_key.clone(), timeout)
            .map_err(|e| startup_error("Failed to build object store client", e))?,
    );

    info!("Gateway clients initialized ({})", settings.gateway.url);

    // Redis is optional: without it (or when it is unreachable) only the L1 cache is used
    let cache_ttl = settings.cache.ttl_secs.unwrap_or(300);
    let l1_cache_size = settings.cache.l1_cache_size.unwrap_or(1000);

    let cache = match &settings.cache.redis_url {
        Some(url) => match CacheManager::new(url, l1_cache_size, cache_ttl).await {
            Ok(c) => {
                info!("Cache manager initialized with Redis (L1: {} entries, TTL: {}s)", l1_cache_size, cache_ttl);
                c
            }
            Err(e) => {
                warn!("Failed to connect to Redis ({}), using in-process cache only", e);
                CacheManager::local(l1_cache_size, cache_ttl)
            }
        },
        None => {
            info!("Cache manager initialized (L1: {} entries, TTL: {}s)", l1_cache_size, cache_ttl);
            CacheManager::local(l1_cache_size, cache_ttl)
        }
    };
    let cache = Arc::new(cache);

    let images = Arc::new(
        ImageResolverChain::standard(
            gateway.clone(),
            store.clone(),
            &settings.storage.image_bucket,
            (settings.storage.placeholder_width, settings.storage.placeholder_height),
        )
        .map_err(|e| startup_error("Failed to build placeholder image", e))?,
    );

    let app_state = AppState {
        gateway: gateway.clone(),
        properties: Arc::new(PropertyQueries::new(gateway.clone(), cache.clone(), settings.map.defaults())),
        crm: Arc::new(CrmService::new(gateway.clone())),
        export: Arc::new(ExportService::new(
            gateway.clone(),
            store.clone(),
            images,
            settings.storage.template_bucket.clone(),
            settings.storage.template_key.clone(),
        )),
        store,
        cache,
        auth: Arc::new(TokenVerifier::new(&settings.auth.jwt_secret, &settings.auth.audience)),
        image_bucket: settings.storage.image_bucket.clone(),
        avatar_bucket: settings.storage.avatar_bucket.clone(),
        csv_excluded_columns: Arc::new(settings.export.csv_excluded_columns.clone()),
    };

    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_app)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
