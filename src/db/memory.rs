use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;

use crate::db::{ProfileStore, UndoOutcome};
use crate::error::{AppError, AppResult};
use crate::models::{InteractionType, MovieCandidate, Profile, SuggestedMovie};
use crate::services::taste;

/// Profile store backed by a process-local map.
///
/// Backs the test suite; same contract and taste-profile invariant as the
/// Postgres store.
#[derive(Default)]
pub struct InMemoryProfileStore {
    profiles: RwLock<HashMap<String, Profile>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn not_found(key: &str) -> AppError {
        AppError::NotFound(format!("Profile '{}' not found", key))
    }
}

#[async_trait::async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn find_or_create(&self, key: &str) -> AppResult<Profile> {
        let mut profiles = self.profiles.write().await;
        Ok(profiles
            .entry(key.to_string())
            .or_insert_with(|| Profile::new(key))
            .clone())
    }

    async fn get_profile(&self, key: &str) -> AppResult<Option<Profile>> {
        Ok(self.profiles.read().await.get(key).cloned())
    }

    async fn list_profiles(&self) -> AppResult<Vec<Profile>> {
        let mut profiles: Vec<Profile> = self.profiles.read().await.values().cloned().collect();
        profiles.sort_by(|a, b| b.last_active.cmp(&a.last_active));
        Ok(profiles)
    }

    async fn add_interaction(
        &self,
        key: &str,
        movie_id: i64,
        kind: InteractionType,
        movie_details: Option<MovieCandidate>,
    ) -> AppResult<()> {
        let mut profiles = self.profiles.write().await;
        let profile = profiles.get_mut(key).ok_or_else(|| Self::not_found(key))?;
        taste::apply_interaction(profile, movie_id, kind, movie_details);
        Ok(())
    }

    async fn undo_last_interaction(&self, key: &str) -> AppResult<UndoOutcome> {
        let mut profiles = self.profiles.write().await;
        let Some(profile) = profiles.get_mut(key) else {
            return Ok(UndoOutcome { undone: false, movie_details: None });
        };
        match taste::undo_last(profile) {
            Some(removed) => Ok(UndoOutcome {
                undone: true,
                movie_details: removed.movie_details,
            }),
            None => Ok(UndoOutcome { undone: false, movie_details: None }),
        }
    }

    async fn remove_interaction(&self, key: &str, movie_id: i64) -> AppResult<u64> {
        let mut profiles = self.profiles.write().await;
        let profile = profiles.get_mut(key).ok_or_else(|| Self::not_found(key))?;
        Ok(taste::remove_movie(profile, movie_id) as u64)
    }

    async fn reset_profile(&self, key: &str) -> AppResult<()> {
        let mut profiles = self.profiles.write().await;
        if let Some(profile) = profiles.get_mut(key) {
            taste::reset(profile);
        }
        Ok(())
    }

    async fn append_suggested_movies(
        &self,
        key: &str,
        additions: &[SuggestedMovie],
    ) -> AppResult<()> {
        let mut profiles = self.profiles.write().await;
        let profile = profiles.get_mut(key).ok_or_else(|| Self::not_found(key))?;
        profile.merge_suggested(additions);
        Ok(())
    }

    async fn touch_last_active(&self, key: &str) -> AppResult<()> {
        let mut profiles = self.profiles.write().await;
        let profile = profiles.get_mut(key).ok_or_else(|| Self::not_found(key))?;
        profile.last_active = Utc::now();
        Ok(())
    }

    async fn delete_profile(&self, key: &str) -> AppResult<bool> {
        Ok(self.profiles.write().await.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::movie::MovieCandidate;

    fn details(genres: &[&str]) -> MovieCandidate {
        MovieCandidate {
            id: 550,
            title: "Fight Club".to_string(),
            release_year: Some(1999),
            description: None,
            cover_url: None,
            genres: genres.iter().map(|g| g.to_string()).collect(),
            director: None,
            writers: vec![],
            actors: vec![],
            imdb_id: None,
            vote_average: None,
        }
    }

    #[tokio::test]
    async fn test_find_or_create_is_idempotent() {
        let store = InMemoryProfileStore::new();
        let first = store.find_or_create("alice").await.unwrap();
        let second = store.find_or_create("alice").await.unwrap();
        assert_eq!(first.profile_key, "alice");
        assert_eq!(first.profile_key, second.profile_key);
        assert_eq!(store.list_profiles().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_add_interaction_requires_profile() {
        let store = InMemoryProfileStore::new();
        let err = store
            .add_interaction("ghost", 550, InteractionType::Like, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_add_interaction_updates_taste_profile() {
        let store = InMemoryProfileStore::new();
        store.find_or_create("alice").await.unwrap();
        store
            .add_interaction("alice", 550, InteractionType::Like, Some(details(&["Drama"])))
            .await
            .unwrap();

        let profile = store.get_profile("alice").await.unwrap().unwrap();
        assert_eq!(profile.taste_profile.genres["Drama"], 1);
        assert_eq!(profile.taste_profile, taste::recompute(&profile.interactions));
    }

    #[tokio::test]
    async fn test_undo_without_history() {
        let store = InMemoryProfileStore::new();
        store.find_or_create("alice").await.unwrap();
        let outcome = store.undo_last_interaction("alice").await.unwrap();
        assert!(!outcome.undone);
        assert!(outcome.movie_details.is_none());
    }

    #[tokio::test]
    async fn test_undo_returns_snapshot() {
        let store = InMemoryProfileStore::new();
        store.find_or_create("alice").await.unwrap();
        store
            .add_interaction("alice", 550, InteractionType::Like, Some(details(&["Drama"])))
            .await
            .unwrap();

        let outcome = store.undo_last_interaction("alice").await.unwrap();
        assert!(outcome.undone);
        assert_eq!(outcome.movie_details.unwrap().id, 550);

        let profile = store.get_profile("alice").await.unwrap().unwrap();
        assert!(profile.interactions.is_empty());
        assert!(profile.taste_profile.is_empty());
    }

    #[tokio::test]
    async fn test_append_suggested_movies_merges() {
        let store = InMemoryProfileStore::new();
        store.find_or_create("alice").await.unwrap();

        let batch = vec![
            SuggestedMovie { movie_id: 1, movie_title: "One".to_string() },
            SuggestedMovie { movie_id: 2, movie_title: "Two".to_string() },
        ];
        store.append_suggested_movies("alice", &batch).await.unwrap();
        store.append_suggested_movies("alice", &batch).await.unwrap();

        let profile = store.get_profile("alice").await.unwrap().unwrap();
        assert_eq!(profile.suggested_movies.len(), 2);
        assert_eq!(profile.seen_ids(), std::collections::HashSet::from([1, 2]));
    }

    #[tokio::test]
    async fn test_delete_profile() {
        let store = InMemoryProfileStore::new();
        store.find_or_create("alice").await.unwrap();
        assert!(store.delete_profile("alice").await.unwrap());
        assert!(!store.delete_profile("alice").await.unwrap());
        assert!(store.get_profile("alice").await.unwrap().is_none());
    }
}
