use chrono::Utc;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::db::{ProfileStore, UndoOutcome};
use crate::error::{AppError, AppResult};
use crate::models::{InteractionType, MovieCandidate, Profile, SuggestedMovie};
use crate::services::taste;

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Profile store keeping one JSONB document per profile key.
///
/// Mutations are read-modify-write through the taste engine; concurrent
/// writers for the same key are not expected (the request layer serializes
/// per-profile suggestion bookkeeping through the prefetch cache).
#[derive(Clone)]
pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the profiles table if it does not exist yet
    pub async fn ensure_schema(&self) -> AppResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS profiles (
                profile_key TEXT PRIMARY KEY,
                document JSONB NOT NULL,
                last_active TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load(&self, key: &str) -> AppResult<Option<Profile>> {
        let document: Option<serde_json::Value> =
            sqlx::query_scalar("SELECT document FROM profiles WHERE profile_key = $1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        document
            .map(|doc| {
                serde_json::from_value(doc).map_err(|e| {
                    AppError::Internal(format!("Corrupt profile document for '{}': {}", key, e))
                })
            })
            .transpose()
    }

    async fn save(&self, profile: &Profile) -> AppResult<()> {
        let document = serde_json::to_value(profile)
            .map_err(|e| AppError::Internal(format!("Profile serialization error: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO profiles (profile_key, document, last_active)
            VALUES ($1, $2, $3)
            ON CONFLICT (profile_key)
            DO UPDATE SET document = EXCLUDED.document, last_active = EXCLUDED.last_active
            "#,
        )
        .bind(&profile.profile_key)
        .bind(&document)
        .bind(profile.last_active)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Loads the profile, applies `mutate`, and writes the document back
    async fn with_profile<T, F>(&self, key: &str, mutate: F) -> AppResult<T>
    where
        T: Send,
        F: FnOnce(&mut Profile) -> T + Send,
    {
        let mut profile = self
            .load(key)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Profile '{}' not found", key)))?;
        let out = mutate(&mut profile);
        self.save(&profile).await?;
        Ok(out)
    }
}

#[async_trait::async_trait]
impl ProfileStore for PgProfileStore {
    async fn find_or_create(&self, key: &str) -> AppResult<Profile> {
        if let Some(profile) = self.load(key).await? {
            return Ok(profile);
        }
        let profile = Profile::new(key);
        self.save(&profile).await?;
        Ok(profile)
    }

    async fn get_profile(&self, key: &str) -> AppResult<Option<Profile>> {
        self.load(key).await
    }

    async fn list_profiles(&self) -> AppResult<Vec<Profile>> {
        let documents: Vec<serde_json::Value> =
            sqlx::query_scalar("SELECT document FROM profiles ORDER BY last_active DESC")
                .fetch_all(&self.pool)
                .await?;

        documents
            .into_iter()
            .map(|doc| {
                serde_json::from_value(doc)
                    .map_err(|e| AppError::Internal(format!("Corrupt profile document: {}", e)))
            })
            .collect()
    }

    async fn add_interaction(
        &self,
        key: &str,
        movie_id: i64,
        kind: InteractionType,
        movie_details: Option<MovieCandidate>,
    ) -> AppResult<()> {
        self.with_profile(key, |profile| {
            taste::apply_interaction(profile, movie_id, kind, movie_details);
        })
        .await
    }

    async fn undo_last_interaction(&self, key: &str) -> AppResult<UndoOutcome> {
        if self.load(key).await?.is_none() {
            return Ok(UndoOutcome { undone: false, movie_details: None });
        }
        self.with_profile(key, |profile| match taste::undo_last(profile) {
            Some(removed) => UndoOutcome {
                undone: true,
                movie_details: removed.movie_details,
            },
            None => UndoOutcome { undone: false, movie_details: None },
        })
        .await
    }

    async fn remove_interaction(&self, key: &str, movie_id: i64) -> AppResult<u64> {
        self.with_profile(key, |profile| taste::remove_movie(profile, movie_id) as u64)
            .await
    }

    async fn reset_profile(&self, key: &str) -> AppResult<()> {
        if self.load(key).await?.is_none() {
            return Ok(());
        }
        self.with_profile(key, taste::reset).await
    }

    async fn append_suggested_movies(
        &self,
        key: &str,
        additions: &[SuggestedMovie],
    ) -> AppResult<()> {
        self.with_profile(key, |profile| profile.merge_suggested(additions))
            .await
    }

    async fn touch_last_active(&self, key: &str) -> AppResult<()> {
        self.with_profile(key, |profile| {
            profile.last_active = Utc::now();
        })
        .await
    }

    async fn delete_profile(&self, key: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM profiles WHERE profile_key = $1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
