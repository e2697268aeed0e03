//! Taste-profile scoring engine.
//!
//! The taste profile is always a full recomputation over the interaction
//! history, never an incremental patch. Every mutation below re-derives the
//! four score maps so `profile.taste_profile == recompute(&profile.interactions)`
//! holds after each one.

use chrono::Utc;

use crate::models::{Interaction, InteractionType, MovieCandidate, Profile, TasteProfile};

/// Replaces literal dots so attribute names stay safe as flat document keys
pub fn sanitize_key(key: &str) -> String {
    key.replace('.', "_")
}

/// Recomputes the taste profile from the full interaction history.
///
/// Likes and strong likes score +1; every other interaction type scores -1,
/// watchlist and not_interested included. Interactions without a movie
/// snapshot are skipped. Deterministic in the history.
pub fn recompute(interactions: &[Interaction]) -> TasteProfile {
    let mut profile = TasteProfile::default();

    for interaction in interactions {
        let Some(details) = &interaction.movie_details else {
            continue;
        };
        let score: i64 = if interaction.kind.is_positive() { 1 } else { -1 };

        for genre in &details.genres {
            *profile.genres.entry(sanitize_key(genre)).or_insert(0) += score;
        }
        if let Some(director) = &details.director {
            *profile.directors.entry(sanitize_key(director)).or_insert(0) += score;
        }
        for writer in &details.writers {
            *profile.writers.entry(sanitize_key(writer)).or_insert(0) += score;
        }
        for actor in &details.actors {
            *profile.actors.entry(sanitize_key(actor)).or_insert(0) += score;
        }
    }

    profile
}

/// Appends an interaction and re-derives the taste profile
pub fn apply_interaction(
    profile: &mut Profile,
    movie_id: i64,
    kind: InteractionType,
    movie_details: Option<MovieCandidate>,
) {
    profile.interactions.push(Interaction {
        movie_id,
        kind,
        timestamp: Utc::now(),
        movie_details,
    });
    profile.taste_profile = recompute(&profile.interactions);
}

/// Removes the most recent interaction, if any, and re-derives the profile.
/// Returns the removed interaction so its snapshot can be re-offered.
pub fn undo_last(profile: &mut Profile) -> Option<Interaction> {
    let removed = profile.interactions.pop()?;
    profile.taste_profile = recompute(&profile.interactions);
    Some(removed)
}

/// Removes every interaction recorded for `movie_id` and re-derives the
/// profile. Returns how many were removed.
pub fn remove_movie(profile: &mut Profile, movie_id: i64) -> usize {
    let before = profile.interactions.len();
    profile.interactions.retain(|i| i.movie_id != movie_id);
    let removed = before - profile.interactions.len();
    if removed > 0 {
        profile.taste_profile = recompute(&profile.interactions);
    }
    removed
}

/// Clears interactions, taste profile, and suggestion history
pub fn reset(profile: &mut Profile) {
    profile.interactions.clear();
    profile.taste_profile = TasteProfile::default();
    profile.suggested_movies.clear();
}
