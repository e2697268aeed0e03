use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::MovieCandidate;

/// How a profile reacted to a movie
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionType {
    Like,
    Dislike,
    StrongLike,
    StrongDislike,
    Watchlist,
    NotInterested,
}

impl InteractionType {
    /// Whether this interaction contributes a positive taste score.
    ///
    /// Everything that is not a like counts negative, watchlist and
    /// not_interested included.
    pub fn is_positive(&self) -> bool {
        matches!(self, InteractionType::Like | InteractionType::StrongLike)
    }
}

/// One recorded reaction, with a frozen copy of the movie at interaction time.
///
/// Interactions without a snapshot are kept in history but contribute nothing
/// to the taste profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interaction {
    pub movie_id: i64,
    #[serde(rename = "type")]
    pub kind: InteractionType,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub movie_details: Option<MovieCandidate>,
}

/// Bookkeeping entry for a movie already served in a suggestion batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedMovie {
    pub movie_id: i64,
    pub movie_title: String,
}

/// Accumulated per-attribute scores, always recomputed from the full
/// interaction history
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TasteProfile {
    pub genres: HashMap<String, i64>,
    pub directors: HashMap<String, i64>,
    pub writers: HashMap<String, i64>,
    pub actors: HashMap<String, i64>,
}

impl TasteProfile {
    pub fn is_empty(&self) -> bool {
        self.genres.is_empty()
            && self.directors.is_empty()
            && self.writers.is_empty()
            && self.actors.is_empty()
    }
}

/// The persisted per-profile document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub profile_key: String,
    #[serde(default)]
    pub interactions: Vec<Interaction>,
    #[serde(default)]
    pub taste_profile: TasteProfile,
    #[serde(default)]
    pub suggested_movies: Vec<SuggestedMovie>,
    pub last_active: DateTime<Utc>,
}

impl Profile {
    /// Creates a fresh, empty profile for `key`
    pub fn new(key: &str) -> Self {
        Self {
            profile_key: key.to_string(),
            interactions: Vec::new(),
            taste_profile: TasteProfile::default(),
            suggested_movies: Vec::new(),
            last_active: Utc::now(),
        }
    }

    /// The SeenSet: every movie id this profile interacted with or was
    /// already served. Fresh batches must avoid these ids.
    pub fn seen_ids(&self) -> HashSet<i64> {
        self.interactions
            .iter()
            .map(|i| i.movie_id)
            .chain(self.suggested_movies.iter().map(|s| s.movie_id))
            .collect()
    }

    /// Merges newly served movies into the suggested-movies history,
    /// skipping ids already recorded.
    pub fn merge_suggested(&mut self, additions: &[SuggestedMovie]) {
        let mut known: HashSet<i64> =
            self.suggested_movies.iter().map(|s| s.movie_id).collect();
        for movie in additions {
            if known.insert(movie.movie_id) {
                self.suggested_movies.push(movie.clone());
            }
        }
    }

    /// Titles of interacted movies matching `kind`, in interaction order
    pub fn titles_by_kind(&self, kind: InteractionType) -> Vec<&str> {
        self.interactions
            .iter()
            .filter(|i| i.kind == kind)
            .filter_map(|i| i.movie_details.as_ref().map(|d| d.title.as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(id: i64, title: &str) -> MovieCandidate {
        MovieCandidate {
            id,
            title: title.to_string(),
            release_year: None,
            description: None,
            cover_url: None,
            genres: vec![],
            director: None,
            writers: vec![],
            actors: vec![],
            imdb_id: None,
            vote_average: None,
        }
    }

    fn interaction(movie_id: i64, kind: InteractionType) -> Interaction {
        Interaction {
            movie_id,
            kind,
            timestamp: Utc::now(),
            movie_details: Some(snapshot(movie_id, &format!("Movie {}", movie_id))),
        }
    }

    #[test]
    fn test_seen_ids_unions_interactions_and_suggestions() {
        let mut profile = Profile::new("alice");
        profile.interactions.push(interaction(1, InteractionType::Like));
        profile.interactions.push(interaction(2, InteractionType::Dislike));
        profile.suggested_movies.push(SuggestedMovie {
            movie_id: 2,
            movie_title: "Movie 2".to_string(),
        });
        profile.suggested_movies.push(SuggestedMovie {
            movie_id: 3,
            movie_title: "Movie 3".to_string(),
        });

        let seen = profile.seen_ids();
        assert_eq!(seen, HashSet::from([1, 2, 3]));
    }

    #[test]
    fn test_merge_suggested_skips_known_ids() {
        let mut profile = Profile::new("alice");
        profile.suggested_movies.push(SuggestedMovie {
            movie_id: 1,
            movie_title: "Movie 1".to_string(),
        });

        profile.merge_suggested(&[
            SuggestedMovie { movie_id: 1, movie_title: "Movie 1".to_string() },
            SuggestedMovie { movie_id: 2, movie_title: "Movie 2".to_string() },
            SuggestedMovie { movie_id: 2, movie_title: "Movie 2".to_string() },
        ]);

        let ids: Vec<i64> = profile.suggested_movies.iter().map(|s| s.movie_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_interaction_type_polarity() {
        assert!(InteractionType::Like.is_positive());
        assert!(InteractionType::StrongLike.is_positive());
        assert!(!InteractionType::Dislike.is_positive());
        assert!(!InteractionType::StrongDislike.is_positive());
        assert!(!InteractionType::Watchlist.is_positive());
        assert!(!InteractionType::NotInterested.is_positive());
    }

    #[test]
    fn test_interaction_wire_format() {
        let i = interaction(550, InteractionType::StrongLike);
        let json = serde_json::to_value(&i).unwrap();
        assert_eq!(json["movieId"], 550);
        assert_eq!(json["type"], "strong_like");
        assert!(json["movieDetails"].is_object());
    }

    #[test]
    fn test_profile_document_round_trip() {
        let mut profile = Profile::new("bob");
        profile.interactions.push(interaction(42, InteractionType::Watchlist));
        profile.suggested_movies.push(SuggestedMovie {
            movie_id: 7,
            movie_title: "Seven".to_string(),
        });

        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["profileKey"], "bob");
        assert_eq!(json["suggestedMovies"][0]["movieTitle"], "Seven");

        let back: Profile = serde_json::from_value(json).unwrap();
        assert_eq!(back, profile);
    }

    #[test]
    fn test_titles_by_kind_skips_missing_snapshots() {
        let mut profile = Profile::new("carol");
        profile.interactions.push(interaction(1, InteractionType::Like));
        profile.interactions.push(Interaction {
            movie_id: 2,
            kind: InteractionType::Like,
            timestamp: Utc::now(),
            movie_details: None,
        });
        profile.interactions.push(interaction(3, InteractionType::Dislike));

        assert_eq!(profile.titles_by_kind(InteractionType::Like), vec!["Movie 1"]);
        assert_eq!(profile.titles_by_kind(InteractionType::Dislike), vec!["Movie 3"]);
    }
}
