/// Radarr add-to-library client
///
/// Posts a monitored movie to a user-supplied Radarr instance and triggers a
/// search for it. Connection details arrive per-request (the UI stores them
/// client-side), so this client carries only the HTTP client.
use reqwest::Client as HttpClient;
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};

const DEFAULT_QUALITY_PROFILE: u32 = 1;
const DEFAULT_ROOT_FOLDER: &str = "/movies";

#[derive(Clone, Default)]
pub struct RadarrClient {
    http_client: HttpClient,
}

impl RadarrClient {
    pub fn new() -> Self {
        Self {
            http_client: HttpClient::new(),
        }
    }

    /// Adds a movie by TMDB id, monitored and searched immediately
    pub async fn add_movie(
        &self,
        radarr_url: &str,
        api_key: &str,
        tmdb_id: i64,
        title: &str,
    ) -> AppResult<Value> {
        let url = format!("{}/api/v3/movie", radarr_url.trim_end_matches('/'));

        let body = json!({
            "tmdbId": tmdb_id,
            "title": title,
            "qualityProfileId": DEFAULT_QUALITY_PROFILE,
            "rootFolderPath": DEFAULT_ROOT_FOLDER,
            "monitored": true,
            "searchForMovie": true,
        });

        let response = self
            .http_client
            .post(&url)
            .query(&[("apikey", api_key)])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let payload: Value = response.json().await.unwrap_or(Value::Null);

        if !status.is_success() {
            tracing::error!(%status, title = %title, "Radarr rejected add-movie request");
            return Err(AppError::ExternalApi(format!(
                "Failed to add {} to Radarr: status {}",
                title, status
            )));
        }

        tracing::info!(title = %title, tmdb_id, "Movie added to Radarr");
        Ok(payload)
    }
}
