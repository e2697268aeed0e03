use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use cineswipe_api::{
    config::Config,
    db::{self, Cache, PgProfileStore, ProfileStore},
    routes::{create_router, AppState},
    services::{
        assembler::SuggestionBatchAssembler,
        candidates::CandidateSource,
        prefetch::PrefetchCache,
        providers::{GeminiSuggester, RadarrClient, TmdbProvider},
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    // Persistence
    let pool = db::create_pool(&config.database_url).await?;
    let pg_store = PgProfileStore::new(pool);
    pg_store.ensure_schema().await?;
    let store: Arc<dyn ProfileStore> = Arc::new(pg_store);

    // Provider cache; the writer handle must outlive the server so pending
    // writes flush on exit
    let redis_client = db::create_redis_client(&config.redis_url)?;
    let (cache, _cache_writer) = Cache::new(redis_client);

    // Providers and the suggestion core
    let metadata = Arc::new(TmdbProvider::new(
        cache,
        config.tmdb_api_key.clone(),
        config.tmdb_api_url.clone(),
    ));
    let suggester = Arc::new(GeminiSuggester::new(
        config.gemini_api_key.clone(),
        config.gemini_api_url.clone(),
        config.gemini_model.clone(),
    ));
    let assembler = Arc::new(SuggestionBatchAssembler::new(
        store.clone(),
        CandidateSource::new(metadata, suggester),
    ));
    let suggestions = Arc::new(PrefetchCache::new(assembler, store.clone()));

    let state = Arc::new(AppState {
        store,
        suggestions,
        radarr: RadarrClient::new(),
    });
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "Server running");
    axum::serve(listener, app).await?;

    Ok(())
}
