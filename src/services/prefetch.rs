//! Per-profile single-flight prefetch cache.
//!
//! Each profile key owns one slot cycling through `Idle` → `Fetching` →
//! `Ready` → `Idle`. Requests joining a `Fetching` slot await the same shared
//! future, so at most one underlying batch fetch runs per key no matter how
//! many callers arrive. Serving a `Ready` batch persists its ids into the
//! profile's suggestion history before the next background fetch starts, so
//! a refill can never re-suggest what was just served.
//!
//! Fetches are driven to completion by a spawned task: an abandoned request
//! still populates the slot for the next caller. A failed fetch clears the
//! slot back to `Idle` so the next request retries instead of hanging.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use tokio::sync::Mutex;

use crate::db::ProfileStore;
use crate::error::{AppError, AppResult};
use crate::models::{MovieCandidate, SuggestedMovie};
use crate::services::assembler::BatchFetcher;

type SharedFetch = Shared<BoxFuture<'static, Result<Vec<MovieCandidate>, Arc<AppError>>>>;

enum SlotState {
    Idle,
    Fetching { id: u64, task: SharedFetch },
    Ready { id: u64, batch: Vec<MovieCandidate> },
}

struct Slot {
    state: SlotState,
}

pub struct PrefetchCache {
    /// Per-key slots; this map's lock is only held to look a slot up, all
    /// real work happens under the slot's own mutex so profiles never
    /// contend with each other
    slots: Mutex<HashMap<String, Arc<Mutex<Slot>>>>,
    /// Distinguishes fetch completions so a stale driver can never clobber a
    /// newer slot state
    next_fetch_id: AtomicU64,
    fetcher: Arc<dyn BatchFetcher>,
    store: Arc<dyn ProfileStore>,
}

impl PrefetchCache {
    pub fn new(fetcher: Arc<dyn BatchFetcher>, store: Arc<dyn ProfileStore>) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            next_fetch_id: AtomicU64::new(0),
            fetcher,
            store,
        }
    }

    /// Returns the next suggestion batch for the profile.
    ///
    /// Joins an in-flight fetch if one is running, consumes a prefetched
    /// batch if one is ready (scheduling the next refill), or fetches
    /// synchronously on a cold miss.
    pub async fn get(&self, key: &str) -> AppResult<Vec<MovieCandidate>> {
        let slot = self.slot(key).await;
        let mut guard = slot.lock().await;

        match std::mem::replace(&mut guard.state, SlotState::Idle) {
            SlotState::Fetching { id, task } => {
                guard.state = SlotState::Fetching {
                    id,
                    task: task.clone(),
                };
                drop(guard);
                tracing::debug!(key, "Joining in-flight fetch");
                task.await.map_err(|e| join_error(&e))
            }
            SlotState::Ready { batch, .. } => {
                drop(guard);
                tracing::debug!(key, served = batch.len(), "Serving prefetched batch");

                // Served ids must be on record before the refill computes its
                // SeenSet
                self.commit_served(key, &batch).await?;
                self.start_background_fetch(key, &slot).await;
                Ok(batch)
            }
            SlotState::Idle => {
                let (id, task) = self.register_fetch(key, &slot, &mut guard);
                drop(guard);
                tracing::debug!(key, "Cold miss, fetching synchronously");

                match task.await {
                    Ok(batch) => {
                        // Another request may have consumed our completed
                        // fetch from Ready already; then it also did the
                        // bookkeeping and scheduled the refill
                        if self.release_own_fetch(&slot, id).await {
                            self.commit_served(key, &batch).await?;
                            self.start_background_fetch(key, &slot).await;
                        }
                        Ok(batch)
                    }
                    Err(e) => {
                        self.release_own_fetch(&slot, id).await;
                        Err(join_error(&e))
                    }
                }
            }
        }
    }

    async fn slot(&self, key: &str) -> Arc<Mutex<Slot>> {
        let mut slots = self.slots.lock().await;
        slots
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Slot { state: SlotState::Idle })))
            .clone()
    }

    /// Puts the slot into `Fetching` with a fresh shared future and spawns
    /// the driver task that completes it.
    ///
    /// The driver parks a successful result in `Ready` and resets a failed
    /// one to `Idle`; either way it backs off if the slot moved on without it.
    fn register_fetch(
        &self,
        key: &str,
        slot: &Arc<Mutex<Slot>>,
        guard: &mut Slot,
    ) -> (u64, SharedFetch) {
        let id = self.next_fetch_id.fetch_add(1, Ordering::Relaxed);

        let fetcher = self.fetcher.clone();
        let fetch_key = key.to_string();
        let task: SharedFetch = async move { fetcher.fetch_batch(&fetch_key).await.map_err(Arc::new) }
            .boxed()
            .shared();

        guard.state = SlotState::Fetching {
            id,
            task: task.clone(),
        };

        let driver_slot = slot.clone();
        let driver_task = task.clone();
        let driver_key = key.to_string();
        tokio::spawn(async move {
            let result = driver_task.await;
            let mut guard = driver_slot.lock().await;

            let still_mine =
                matches!(&guard.state, SlotState::Fetching { id: current, .. } if *current == id);
            if !still_mine {
                return;
            }

            guard.state = match result {
                Ok(batch) => SlotState::Ready { id, batch },
                Err(e) => {
                    tracing::error!(key = %driver_key, error = %e, "Fetch failed, clearing slot");
                    SlotState::Idle
                }
            };
        });

        (id, task)
    }

    /// Clears the slot if it still belongs to fetch `id`. Returns whether it
    /// did, i.e. whether this caller is responsible for the serve
    /// bookkeeping.
    async fn release_own_fetch(&self, slot: &Arc<Mutex<Slot>>, id: u64) -> bool {
        let mut guard = slot.lock().await;
        let owns = match &guard.state {
            SlotState::Fetching { id: current, .. } | SlotState::Ready { id: current, .. } => {
                *current == id
            }
            SlotState::Idle => false,
        };
        if owns {
            guard.state = SlotState::Idle;
        }
        owns
    }

    /// Starts the next fetch in the background if nothing else already did
    async fn start_background_fetch(&self, key: &str, slot: &Arc<Mutex<Slot>>) {
        let mut guard = slot.lock().await;
        if matches!(guard.state, SlotState::Idle) {
            self.register_fetch(key, slot, &mut guard);
            tracing::debug!(key, "Background prefetch scheduled");
        }
    }

    /// Records the served batch in the profile's suggestion history.
    ///
    /// Persistence failures propagate: losing this bookkeeping would corrupt
    /// every later dedup decision.
    async fn commit_served(&self, key: &str, batch: &[MovieCandidate]) -> AppResult<()> {
        if batch.is_empty() {
            return Ok(());
        }

        // Padding may repeat ids within a batch; record each once
        let mut recorded = HashSet::new();
        let additions: Vec<SuggestedMovie> = batch
            .iter()
            .filter(|c| recorded.insert(c.id))
            .map(|c| SuggestedMovie {
                movie_id: c.id,
                movie_title: c.title.clone(),
            })
            .collect();

        self.store.append_suggested_movies(key, &additions).await
    }
}

/// Reconstructs a caller-facing error from a shared fetch error
fn join_error(err: &Arc<AppError>) -> AppError {
    match err.as_ref() {
        AppError::NotFound(msg) => AppError::NotFound(msg.clone()),
        AppError::InvalidInput(msg) => AppError::InvalidInput(msg.clone()),
        AppError::ExternalApi(msg) => AppError::ExternalApi(msg.clone()),
        other => AppError::Internal(other.to_string()),
    }
}
