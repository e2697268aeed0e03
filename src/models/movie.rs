use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// Base URL for TMDB poster images, w500 rendition
pub const COVER_IMAGE_BASE: &str = "https://image.tmdb.org/t/p/w500";

/// A fully resolved movie eligible for inclusion in a suggestion batch.
///
/// Identity is `id`; deduplication compares ids only, never whole records.
/// Field names follow the wire format the clients already speak.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieCandidate {
    pub id: i64,
    pub title: String,
    pub release_year: Option<i32>,
    pub description: Option<String>,
    pub cover_url: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    pub director: Option<String>,
    #[serde(default)]
    pub writers: Vec<String>,
    #[serde(default)]
    pub actors: Vec<String>,
    pub imdb_id: Option<String>,
    pub vote_average: Option<f64>,
}

/// Ranked categories the popularity fallback walks, most relevant first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Popular,
    TopRated,
    Upcoming,
}

impl Category {
    /// Fallback enumeration order
    pub const RANKED: [Category; 3] = [Category::Popular, Category::TopRated, Category::Upcoming];

    /// TMDB list endpoint path segment
    pub fn as_path(&self) -> &'static str {
        match self {
            Category::Popular => "popular",
            Category::TopRated => "top_rated",
            Category::Upcoming => "upcoming",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_path())
    }
}

/// Raw entry from a TMDB category listing page.
///
/// Only carries what the fallback enumerator needs; the full record comes
/// from a follow-up title resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieListing {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
}

impl MovieListing {
    /// Whether this entry was released within the trailing `months` window.
    ///
    /// Missing or unparseable dates count as not recent, so they are never
    /// excluded by the cold-start recency filter.
    pub fn released_within(&self, months: u32, today: NaiveDate) -> bool {
        let Some(date) = self
            .release_date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        else {
            return false;
        };

        match today.checked_sub_months(Months::new(months)) {
            Some(cutoff) => date > cutoff,
            None => false,
        }
    }
}

// ============================================================================
// TMDB API Types
// ============================================================================

/// Movie details from TMDB's /movie/{id} endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbMovieDetails {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub genres: Vec<TmdbGenre>,
    #[serde(default)]
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbGenre {
    pub name: String,
}

/// Credits from TMDB's /movie/{id}/credits endpoint.
///
/// Both lists default to empty: absent credit data must degrade to empty
/// fields on the candidate, never to a deserialization error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TmdbCredits {
    #[serde(default)]
    pub cast: Vec<TmdbCastMember>,
    #[serde(default)]
    pub crew: Vec<TmdbCrewMember>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbCastMember {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbCrewMember {
    pub name: String,
    #[serde(default)]
    pub job: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
}
