use std::sync::Arc;

use axum::{
    http::StatusCode,
    middleware as axum_middleware,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod library;
pub mod movies;
pub mod users;

use crate::db::ProfileStore;
use crate::middleware::request_id::{make_span_with_request_id, request_id_middleware};
use crate::services::prefetch::PrefetchCache;
use crate::services::providers::RadarrClient;

/// Shared application state
pub struct AppState {
    pub store: Arc<dyn ProfileStore>,
    pub suggestions: Arc<PrefetchCache>,
    pub radarr: RadarrClient,
}

/// Creates the application router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/movies", movie_routes())
        .nest("/api/users", user_routes())
        .nest("/api/radarr", library_routes())
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(axum_middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn movie_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/interact", post(movies::interact))
        .route("/suggest", post(movies::suggest))
}

fn user_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/profiles", get(users::list_profiles))
        .route("/create-profile", post(users::create_profile))
        .route("/profile/:profile_name", get(users::get_profile))
        .route("/profile/:profile_name", delete(users::delete_profile))
        .route("/update-last-active", post(users::update_last_active))
        .route("/undo-last-interaction", post(users::undo_last_interaction))
        .route("/reset-profile", post(users::reset_profile))
        .route(
            "/interaction/:profile_name/:movie_id",
            delete(users::remove_interaction),
        )
        .route("/watchlist/:profile_name", get(users::watchlist))
        .route("/taste-profile/:profile_name", get(users::taste_profile))
}

fn library_routes() -> Router<Arc<AppState>> {
    Router::new().route("/add-movie", post(library::add_movie))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
