use std::sync::Arc;

use axum::{extract::State, Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    middleware::request_id::RequestId,
    models::{InteractionType, MovieCandidate},
    routes::AppState,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractRequest {
    pub profile_name: String,
    pub movie_id: i64,
    pub interaction_type: InteractionType,
    /// Frozen copy of the movie at interaction time; interactions without it
    /// stay in history but never influence the taste profile
    #[serde(default)]
    pub movie_details: Option<MovieCandidate>,
}

/// Handler recording a profile's reaction to a movie
pub async fn interact(
    State(state): State<Arc<AppState>>,
    Json(request): Json<InteractRequest>,
) -> AppResult<Json<Value>> {
    state
        .store
        .add_interaction(
            &request.profile_name,
            request.movie_id,
            request.interaction_type,
            request.movie_details,
        )
        .await?;

    Ok(Json(json!({ "message": "Interaction recorded successfully" })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestRequest {
    pub profile_name: String,
}

/// Handler for the next suggestion batch
pub async fn suggest(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<SuggestRequest>,
) -> AppResult<Json<Value>> {
    tracing::info!(
        request_id = %request_id,
        profile = %request.profile_name,
        "Processing suggestion request"
    );

    let movies = state.suggestions.get(&request.profile_name).await?;

    // Empty means every source failed; a short-but-nonempty batch was already
    // padded by the assembler
    if movies.is_empty() {
        return Err(AppError::ExternalApi(
            "No suggestions available from any source".to_string(),
        ));
    }

    tracing::info!(
        request_id = %request_id,
        profile = %request.profile_name,
        served = movies.len(),
        "Suggestion batch served"
    );

    Ok(Json(json!({ "movies": movies })))
}
