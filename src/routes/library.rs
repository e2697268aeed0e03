use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{error::AppResult, routes::AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMovieRequest {
    pub radarr_url: String,
    pub radarr_api_key: String,
    pub tmdb_id: i64,
    pub title: String,
}

/// Handler forwarding a movie to the user's Radarr instance
pub async fn add_movie(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AddMovieRequest>,
) -> AppResult<Json<Value>> {
    let data = state
        .radarr
        .add_movie(
            &request.radarr_url,
            &request.radarr_api_key,
            request.tmdb_id,
            &request.title,
        )
        .await?;

    Ok(Json(json!({
        "message": format!("{} added to Radarr successfully!", request.title),
        "data": data,
    })))
}
