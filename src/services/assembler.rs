//! Suggestion batch assembly: strategy selection, deduplication, quota fill.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::db::ProfileStore;
use crate::error::AppResult;
use crate::models::MovieCandidate;
use crate::services::candidates::CandidateSource;

/// Candidates per suggestion batch
pub const BATCH_SIZE: usize = 40;

/// Interactions required before the AI path takes over from cold start
pub const INTERACTION_THRESHOLD: usize = 5;

/// Source of fully assembled suggestion batches.
///
/// The prefetch cache only needs this one operation; the trait keeps it
/// mockable for the cache's concurrency tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait BatchFetcher: Send + Sync {
    /// Builds one deduplicated batch for the profile
    async fn fetch_batch(&self, profile_key: &str) -> AppResult<Vec<MovieCandidate>>;
}

/// Builds suggestion batches from the AI path with popularity fallback.
///
/// A batch contains exactly `BATCH_SIZE` entries whenever any candidate was
/// found anywhere, padding by cyclic repetition if the sources ran dry; it is
/// empty only when every source produced nothing.
pub struct SuggestionBatchAssembler {
    store: Arc<dyn ProfileStore>,
    source: CandidateSource,
    degraded_batches: AtomicU64,
    empty_batches: AtomicU64,
}

impl SuggestionBatchAssembler {
    pub fn new(store: Arc<dyn ProfileStore>, source: CandidateSource) -> Self {
        Self {
            store,
            source,
            degraded_batches: AtomicU64::new(0),
            empty_batches: AtomicU64::new(0),
        }
    }

    /// Batches that needed padding since startup
    pub fn degraded_batches(&self) -> u64 {
        self.degraded_batches.load(Ordering::Relaxed)
    }

    /// Batches served empty (total provider outage) since startup
    pub fn empty_batches(&self) -> u64 {
        self.empty_batches.load(Ordering::Relaxed)
    }

    /// Pads a non-empty short batch to `BATCH_SIZE` by cycling through the
    /// candidates already accepted
    fn pad_to_quota(batch: &mut Vec<MovieCandidate>) {
        let found = batch.len();
        let mut index = 0;
        while batch.len() < BATCH_SIZE {
            batch.push(batch[index % found].clone());
            index += 1;
        }
    }
}

#[async_trait::async_trait]
impl BatchFetcher for SuggestionBatchAssembler {
    async fn fetch_batch(&self, profile_key: &str) -> AppResult<Vec<MovieCandidate>> {
        let profile = self.store.find_or_create(profile_key).await?;

        // Working SeenSet: persisted history plus everything accepted below
        let mut seen = profile.seen_ids();
        let mut batch: Vec<MovieCandidate> = Vec::with_capacity(BATCH_SIZE);

        if profile.interactions.len() < INTERACTION_THRESHOLD {
            tracing::debug!(
                profile_key,
                interactions = profile.interactions.len(),
                "Cold start, using popularity fallback"
            );
            self.source
                .fill_from_popular(&mut batch, &mut seen, BATCH_SIZE, true)
                .await;
        } else {
            match self.source.ai_candidates(&profile, &mut seen, BATCH_SIZE).await {
                Ok(accepted) => {
                    tracing::debug!(profile_key, accepted = accepted.len(), "AI pass accepted");
                    batch.extend(accepted);
                }
                Err(e) => {
                    tracing::warn!(
                        profile_key,
                        error = %e,
                        "Suggester unavailable, falling back to popularity listings"
                    );
                }
            }
            if batch.len() < BATCH_SIZE {
                self.source
                    .fill_from_popular(&mut batch, &mut seen, BATCH_SIZE, false)
                    .await;
            }
        }

        if batch.is_empty() {
            self.empty_batches.fetch_add(1, Ordering::Relaxed);
            tracing::error!(profile_key, "No candidates found from any source");
            return Ok(batch);
        }

        if batch.len() < BATCH_SIZE {
            self.degraded_batches.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                profile_key,
                found = batch.len(),
                "Short batch, padding to quota"
            );
            Self::pad_to_quota(&mut batch);
        }

        Ok(batch)
    }
}
