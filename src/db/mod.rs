pub mod memory;
pub mod postgres;
pub mod redis;

pub use memory::InMemoryProfileStore;
pub use postgres::{create_pool, PgProfileStore};
pub use redis::create_redis_client;
pub use redis::Cache;
pub use redis::CacheKey;

use crate::error::AppResult;
use crate::models::{InteractionType, MovieCandidate, Profile, SuggestedMovie};

/// Result of an undo request
#[derive(Debug, Clone, PartialEq)]
pub struct UndoOutcome {
    pub undone: bool,
    /// Snapshot of the undone interaction's movie, so it can be re-offered
    pub movie_details: Option<MovieCandidate>,
}

/// Persistence contract for profile documents.
///
/// Implementations keep the taste-profile invariant: after any mutation the
/// stored taste profile equals a full recomputation of the stored history.
/// An undo against an empty (or missing) history is a no-op outcome, not an
/// error; interaction mutations against a missing profile are `NotFound`.
#[async_trait::async_trait]
pub trait ProfileStore: Send + Sync {
    /// Returns the profile for `key`, creating an empty one if absent
    async fn find_or_create(&self, key: &str) -> AppResult<Profile>;

    async fn get_profile(&self, key: &str) -> AppResult<Option<Profile>>;

    /// All profiles, most recently active first
    async fn list_profiles(&self) -> AppResult<Vec<Profile>>;

    /// Appends an interaction and re-derives the taste profile
    async fn add_interaction(
        &self,
        key: &str,
        movie_id: i64,
        kind: InteractionType,
        movie_details: Option<MovieCandidate>,
    ) -> AppResult<()>;

    /// Removes the most recent interaction, if any
    async fn undo_last_interaction(&self, key: &str) -> AppResult<UndoOutcome>;

    /// Removes every interaction for `movie_id`, returning how many
    async fn remove_interaction(&self, key: &str, movie_id: i64) -> AppResult<u64>;

    /// Clears interactions, taste profile, and suggestion history
    async fn reset_profile(&self, key: &str) -> AppResult<()>;

    /// Merges newly served movies into the persisted suggestion history
    async fn append_suggested_movies(
        &self,
        key: &str,
        additions: &[SuggestedMovie],
    ) -> AppResult<()>;

    /// Updates the profile's last-active timestamp to now
    async fn touch_last_active(&self, key: &str) -> AppResult<()>;

    /// Store-level administrative removal. Returns whether a profile existed
    async fn delete_profile(&self, key: &str) -> AppResult<bool>;
}
