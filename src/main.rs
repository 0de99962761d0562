use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pricewatch_backend::{
    build_router,
    config::AppConfig,
    jobs::{cache_warmup_job, price_refresh_job},
    services::{
        batch_guard::BatchGuard,
        cache_warmup::CacheWarmup,
        dispatcher::ChannelDispatcher,
        notification_gate::NotificationGate,
        price_refresh::{PriceRefreshEngine, RetryPolicy},
        price_store::SeaOrmPriceStore,
        product_search::{ProductSearchService, SearchCache},
        product_source::MarketplaceClient,
        recommendation::{AzureOpenAiRecommender, DisabledRecommender, RecommendationGenerator},
    },
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pricewatch_backend=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    // Connect to database
    tracing::info!("Connecting to database...");
    let db = Database::connect(&config.database_url).await?;

    // Run migrations
    tracing::info!("Running migrations...");
    migration::Migrator::up(&db, None).await?;

    let source = Arc::new(MarketplaceClient::new(config.marketplace.clone())?);
    let cache = Arc::new(SearchCache::new(config.cache_ttl, config.cache_max_size));
    let store = Arc::new(SeaOrmPriceStore::new(db.clone()));

    let recommender: Arc<dyn RecommendationGenerator> = match config.recommendation.clone() {
        Some(settings) => {
            tracing::info!("Recommendations enabled (deployment: {})", settings.deployment);
            Arc::new(AzureOpenAiRecommender::new(settings))
        }
        None => {
            tracing::info!("Azure OpenAI not configured - recommendations disabled");
            Arc::new(DisabledRecommender)
        }
    };

    let gate = NotificationGate::new(
        store.clone(),
        Arc::new(ChannelDispatcher::from_config(&config.notification)),
        recommender,
        config.notification.channels.clone(),
        config.notification.cooldown,
    );

    let refresh = Arc::new(PriceRefreshEngine::new(
        store,
        source.clone(),
        gate,
        RetryPolicy::new(config.refresh.max_retries, config.refresh.retry_base_delay),
        config.refresh.request_delay,
    ));

    let warmup = Arc::new(CacheWarmup::new(
        source.clone(),
        cache.clone(),
        config.scheduler.warmup_keywords.clone(),
        config.marketplace.min_request_interval,
    ));

    let guard = BatchGuard::new();

    if config.scheduler.enabled {
        cache_warmup_job::start_cache_warmup_job(
            db.clone(),
            guard.clone(),
            warmup.clone(),
            config.scheduler.warmup_interval,
        )
        .await;

        price_refresh_job::start_price_refresh_job(
            db.clone(),
            guard.clone(),
            refresh.clone(),
            config.scheduler.price_refresh_interval,
            config.scheduler.price_refresh_offset,
        )
        .await;
    } else {
        tracing::info!("Scheduler disabled - batch jobs run only on manual trigger");
    }

    let state = AppState {
        db,
        search: ProductSearchService::new(source, cache),
        guard,
        refresh,
        warmup,
        scheduler_enabled: config.scheduler.enabled,
    };

    let app = build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
