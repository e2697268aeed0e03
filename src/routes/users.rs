use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    routes::AppState,
};
use crate::models::InteractionType;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileNameRequest {
    pub profile_name: String,
}

/// Handler listing every profile, most recently active first
pub async fn list_profiles(State(state): State<Arc<AppState>>) -> AppResult<Json<Value>> {
    let profiles = state.store.list_profiles().await?;
    Ok(Json(json!({ "profiles": profiles })))
}

/// Handler creating a named profile; conflicts when the name is taken
pub async fn create_profile(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ProfileNameRequest>,
) -> AppResult<(StatusCode, Json<Value>)> {
    if request.profile_name.trim().is_empty() {
        return Err(AppError::InvalidInput("Profile name is required".to_string()));
    }

    if state.store.get_profile(&request.profile_name).await?.is_some() {
        return Ok((
            StatusCode::CONFLICT,
            Json(json!({ "error": "Profile with this name already exists" })),
        ));
    }

    let profile = state.store.find_or_create(&request.profile_name).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Profile created successfully", "profile": profile })),
    ))
}

/// Handler fetching a single profile document
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Path(profile_name): Path<String>,
) -> AppResult<Json<Value>> {
    let profile = state
        .store
        .get_profile(&profile_name)
        .await?
        .ok_or_else(|| AppError::NotFound("User profile not found".to_string()))?;

    Ok(Json(json!({ "profile": profile })))
}

/// Handler removing a profile (store-level administrative operation)
pub async fn delete_profile(
    State(state): State<Arc<AppState>>,
    Path(profile_name): Path<String>,
) -> AppResult<Json<Value>> {
    if !state.store.delete_profile(&profile_name).await? {
        return Err(AppError::NotFound("Profile not found".to_string()));
    }
    Ok(Json(json!({ "message": "Profile deleted successfully" })))
}

/// Handler refreshing the profile's last-active timestamp
pub async fn update_last_active(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ProfileNameRequest>,
) -> AppResult<Json<Value>> {
    state.store.touch_last_active(&request.profile_name).await?;
    Ok(Json(json!({ "message": "Last active timestamp updated" })))
}

/// Handler undoing the most recent interaction
pub async fn undo_last_interaction(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ProfileNameRequest>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let outcome = state.store.undo_last_interaction(&request.profile_name).await?;

    if outcome.undone {
        Ok((
            StatusCode::OK,
            Json(json!({
                "message": "Last interaction undone successfully",
                "movieDetails": outcome.movie_details,
            })),
        ))
    } else {
        Ok((
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "No interactions to undo" })),
        ))
    }
}

/// Handler clearing a profile's history, taste profile, and suggestions
pub async fn reset_profile(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ProfileNameRequest>,
) -> AppResult<Json<Value>> {
    state.store.reset_profile(&request.profile_name).await?;
    Ok(Json(json!({ "message": "User profile reset successfully" })))
}

/// Handler removing every interaction recorded for a movie
pub async fn remove_interaction(
    State(state): State<Arc<AppState>>,
    Path((profile_name, movie_id)): Path<(String, i64)>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let removed = state.store.remove_interaction(&profile_name, movie_id).await?;

    if removed > 0 {
        Ok((
            StatusCode::OK,
            Json(json!({
                "message": "Interaction removed successfully",
                "removedCount": removed,
            })),
        ))
    } else {
        Ok((
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "Movie interaction not found for this user." })),
        ))
    }
}

/// Handler listing the watchlisted movies' snapshots
pub async fn watchlist(
    State(state): State<Arc<AppState>>,
    Path(profile_name): Path<String>,
) -> AppResult<Json<Value>> {
    let profile = state
        .store
        .get_profile(&profile_name)
        .await?
        .ok_or_else(|| AppError::NotFound("User profile not found".to_string()))?;

    let movies: Vec<_> = profile
        .interactions
        .iter()
        .filter(|i| i.kind == InteractionType::Watchlist)
        .filter_map(|i| i.movie_details.as_ref())
        .collect();

    Ok(Json(json!({ "watchlist": movies })))
}

/// Handler exposing the taste profile for the infographic view
pub async fn taste_profile(
    State(state): State<Arc<AppState>>,
    Path(profile_name): Path<String>,
) -> AppResult<Json<Value>> {
    let profile = state
        .store
        .get_profile(&profile_name)
        .await?
        .ok_or_else(|| AppError::NotFound("User profile not found".to_string()))?;

    Ok(Json(json!({ "tasteProfile": profile.taste_profile })))
}
