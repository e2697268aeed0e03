/// External provider abstractions
///
/// The suggestion core talks to the outside world through these seams: a
/// metadata provider resolving titles to full candidate records and listing
/// ranked categories, and a text suggester generating candidate titles from a
/// taste prompt. Concrete implementations live next to them (TMDB, Gemini);
/// tests substitute mocks.
use crate::{
    error::AppResult,
    models::{Category, MovieCandidate, MovieListing},
};

pub mod gemini;
pub mod radarr;
pub mod tmdb;

pub use gemini::GeminiSuggester;
pub use radarr::RadarrClient;
pub use tmdb::TmdbProvider;

/// Trait for movie metadata providers
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Resolves a title to a full candidate record
    ///
    /// Returns `None` when the provider knows no such title. Absent credit or
    /// crew data degrades to empty fields on the candidate, never to an error.
    async fn resolve_by_title(&self, title: &str) -> AppResult<Option<MovieCandidate>>;

    /// One page of a ranked category listing, raw entries only
    async fn list_by_category(&self, category: Category, page: u32)
        -> AppResult<Vec<MovieListing>>;
}

/// Trait for AI title suggesters
///
/// `generate` returns newline-delimited movie titles. Callers must treat any
/// failure, including unusable output, as a trigger for the popularity
/// fallback rather than a request failure.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait TitleSuggester: Send + Sync {
    async fn generate(&self, prompt: &str) -> AppResult<String>;
}
