/// TMDB metadata provider
///
/// Resolves titles to full candidate records and enumerates ranked category
/// listings.
///
/// API flow for a title resolution:
/// 1. Search: /search/movie → first hit's movie id
/// 2. Details: /movie/{id} → core record
/// 3. Credits: /movie/{id}/credits → director, writers, top cast
///
/// Resolutions and listing pages are cached in Redis; a cache outage degrades
/// to misses.
use chrono::Datelike;
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{
        Category, MovieCandidate, MovieListing, TmdbCredits, TmdbMovieDetails, COVER_IMAGE_BASE,
    },
    services::providers::MetadataProvider,
};

const TITLE_CACHE_TTL: u64 = 86_400; // 1 day
const LISTING_CACHE_TTL: u64 = 3_600; // 1 hour

/// How many cast members make it onto a candidate record
const TOP_CAST: usize = 5;

#[derive(Clone)]
pub struct TmdbProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    cache: Cache,
}

impl TmdbProvider {
    pub fn new(cache: Cache, api_key: String, api_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url,
            cache,
        }
    }

    /// GET a TMDB endpoint with the api key and extra query params
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> AppResult<T> {
        let url = format!("{}{}", self.api_url, path);

        let mut query: Vec<(&str, &str)> = vec![("api_key", self.api_key.as_str())];
        query.extend_from_slice(params);

        let response = self.http_client.get(&url).query(&query).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "TMDB API returned status {}: {}",
                status, body
            )));
        }

        Ok(response.json().await?)
    }

    /// Movie id of the best search hit for `title`, if any
    async fn search_first_id(&self, title: &str) -> AppResult<Option<i64>> {
        #[derive(Deserialize)]
        struct SearchResponse {
            #[serde(default)]
            results: Vec<MovieListing>,
        }

        let response: SearchResponse = self
            .get_json("/search/movie", &[("query", title)])
            .await?;

        Ok(response.results.first().map(|hit| hit.id))
    }

    /// Assembles a candidate record from details and credits.
    ///
    /// Director is the crew member with job "Director"; writers come from the
    /// Writing department; actors are the top billed cast.
    fn candidate_from(details: TmdbMovieDetails, credits: TmdbCredits) -> MovieCandidate {
        let director = credits
            .crew
            .iter()
            .find(|member| member.job.as_deref() == Some("Director"))
            .map(|member| member.name.clone());

        let writers = credits
            .crew
            .iter()
            .filter(|member| member.department.as_deref() == Some("Writing"))
            .map(|member| member.name.clone())
            .collect();

        let actors = credits
            .cast
            .iter()
            .take(TOP_CAST)
            .map(|member| member.name.clone())
            .collect();

        let release_year = details
            .release_date
            .as_deref()
            .and_then(|d| chrono::NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .map(|d| d.year());

        MovieCandidate {
            id: details.id,
            title: details.title,
            release_year,
            description: details.overview,
            cover_url: details
                .poster_path
                .map(|path| format!("{}{}", COVER_IMAGE_BASE, path)),
            genres: details.genres.into_iter().map(|g| g.name).collect(),
            director,
            writers,
            actors,
            imdb_id: details.imdb_id,
            vote_average: details.vote_average,
        }
    }
}

#[async_trait::async_trait]
impl MetadataProvider for TmdbProvider {
    async fn resolve_by_title(&self, title: &str) -> AppResult<Option<MovieCandidate>> {
        cached!(
            self.cache,
            CacheKey::TitleLookup(title.to_string()),
            TITLE_CACHE_TTL,
            async move {
                let Some(movie_id) = self.search_first_id(title).await? else {
                    tracing::debug!(title = %title, "No TMDB search hit");
                    return Ok(None);
                };

                let details: TmdbMovieDetails =
                    self.get_json(&format!("/movie/{}", movie_id), &[]).await?;

                // Credits are best-effort: a failed credits call still yields
                // a usable candidate with empty crew fields
                let credits = match self
                    .get_json::<TmdbCredits>(&format!("/movie/{}/credits", movie_id), &[])
                    .await
                {
                    Ok(credits) => credits,
                    Err(e) => {
                        tracing::warn!(movie_id, error = %e, "Credits lookup failed");
                        TmdbCredits::default()
                    }
                };

                let candidate = Self::candidate_from(details, credits);
                tracing::debug!(
                    title = %title,
                    movie_id = candidate.id,
                    imdb_id = ?candidate.imdb_id,
                    "Title resolved"
                );
                Ok::<_, AppError>(Some(candidate))
            }
        )
    }

    async fn list_by_category(
        &self,
        category: Category,
        page: u32,
    ) -> AppResult<Vec<MovieListing>> {
        #[derive(Deserialize)]
        struct ListingPage {
            #[serde(default)]
            results: Vec<MovieListing>,
        }

        let page_str = page.to_string();
        cached!(
            self.cache,
            CacheKey::CategoryPage(category, page),
            LISTING_CACHE_TTL,
            async move {
                let response: ListingPage = self
                    .get_json(
                        &format!("/movie/{}", category.as_path()),
                        &[("page", page_str.as_str())],
                    )
                    .await?;
                Ok::<_, AppError>(response.results)
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TmdbCastMember, TmdbCrewMember, TmdbGenre};

    fn details() -> TmdbMovieDetails {
        TmdbMovieDetails {
            id: 550,
            title: "Fight Club".to_string(),
            release_date: Some("1999-10-15".to_string()),
            overview: Some("An insomniac office worker...".to_string()),
            poster_path: Some("/pB8BM7pdSp6B6Ih7QZ4DrQ3PmJK.jpg".to_string()),
            genres: vec![TmdbGenre { name: "Drama".to_string() }],
            imdb_id: Some("tt0137523".to_string()),
            vote_average: Some(8.4),
        }
    }

    fn credits() -> TmdbCredits {
        TmdbCredits {
            cast: (1..=7)
                .map(|i| TmdbCastMember { name: format!("Actor {}", i) })
                .collect(),
            crew: vec![
                TmdbCrewMember {
                    name: "David Fincher".to_string(),
                    job: Some("Director".to_string()),
                    department: Some("Directing".to_string()),
                },
                TmdbCrewMember {
                    name: "Jim Uhls".to_string(),
                    job: Some("Screenplay".to_string()),
                    department: Some("Writing".to_string()),
                },
                TmdbCrewMember {
                    name: "Arnon Milchan".to_string(),
                    job: Some("Producer".to_string()),
                    department: Some("Production".to_string()),
                },
            ],
        }
    }

    #[test]
    fn test_candidate_from_full_record() {
        let candidate = TmdbProvider::candidate_from(details(), credits());

        assert_eq!(candidate.id, 550);
        assert_eq!(candidate.release_year, Some(1999));
        assert_eq!(candidate.director.as_deref(), Some("David Fincher"));
        assert_eq!(candidate.writers, vec!["Jim Uhls".to_string()]);
        assert_eq!(candidate.actors.len(), TOP_CAST);
        assert_eq!(candidate.actors[0], "Actor 1");
        assert_eq!(
            candidate.cover_url.as_deref(),
            Some("https://image.tmdb.org/t/p/w500/pB8BM7pdSp6B6Ih7QZ4DrQ3PmJK.jpg")
        );
        assert_eq!(candidate.genres, vec!["Drama".to_string()]);
    }

    #[test]
    fn test_candidate_from_missing_credits() {
        let candidate = TmdbProvider::candidate_from(details(), TmdbCredits::default());

        assert_eq!(candidate.director, None);
        assert!(candidate.writers.is_empty());
        assert!(candidate.actors.is_empty());
    }

    #[test]
    fn test_candidate_from_sparse_details() {
        let sparse = TmdbMovieDetails {
            id: 1,
            title: "Obscure".to_string(),
            release_date: Some("unknown".to_string()),
            overview: None,
            poster_path: None,
            genres: vec![],
            imdb_id: None,
            vote_average: None,
        };

        let candidate = TmdbProvider::candidate_from(sparse, TmdbCredits::default());
        assert_eq!(candidate.release_year, None);
        assert_eq!(candidate.cover_url, None);
        assert!(candidate.genres.is_empty());
    }

    #[test]
    fn test_details_deserialization() {
        let json = r#"{
            "id": 550,
            "title": "Fight Club",
            "release_date": "1999-10-15",
            "overview": "An insomniac office worker...",
            "poster_path": "/abc.jpg",
            "genres": [{"id": 18, "name": "Drama"}],
            "imdb_id": "tt0137523",
            "vote_average": 8.4
        }"#;

        let details: TmdbMovieDetails = serde_json::from_str(json).unwrap();
        assert_eq!(details.id, 550);
        assert_eq!(details.genres[0].name, "Drama");
    }
}
