//! Candidate production: ranked popularity listings and AI title suggestion.
//!
//! Both paths consult the caller's working SeenSet so already-interacted and
//! already-suggested movies never resurface, and both resolve raw titles to
//! full records through the metadata provider before a candidate is accepted.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;

use crate::error::{AppError, AppResult};
use crate::models::{Category, InteractionType, MovieCandidate, Profile};
use crate::services::providers::{MetadataProvider, TitleSuggester};

/// The AI path requests this many times the quota, to absorb resolution
/// failures and duplicates
pub const AI_TITLE_MULTIPLIER: usize = 3;

/// Page limit per fallback category
const MAX_PAGES_PER_CATEGORY: u32 = 20;

/// Cold-start recency exclusion window
const RECENCY_WINDOW_MONTHS: u32 = 6;

pub struct CandidateSource {
    metadata: Arc<dyn MetadataProvider>,
    suggester: Arc<dyn TitleSuggester>,
}

impl CandidateSource {
    pub fn new(metadata: Arc<dyn MetadataProvider>, suggester: Arc<dyn TitleSuggester>) -> Self {
        Self {
            metadata,
            suggester,
        }
    }

    /// Walks the ranked categories, topping `batch` up to `quota` unique
    /// candidates.
    ///
    /// Listing-page and title-resolution failures are recovered by moving on;
    /// only exhausting the page limit of every category ends short.
    /// With `exclude_recent` set (cold start), entries released in the last
    /// six months are skipped.
    pub async fn fill_from_popular(
        &self,
        batch: &mut Vec<MovieCandidate>,
        seen: &mut HashSet<i64>,
        quota: usize,
        exclude_recent: bool,
    ) {
        let today = Utc::now().date_naive();

        for category in Category::RANKED {
            let mut page = 1;
            while batch.len() < quota && page <= MAX_PAGES_PER_CATEGORY {
                let listings = match self.metadata.list_by_category(category, page).await {
                    Ok(listings) => listings,
                    Err(e) => {
                        tracing::warn!(%category, page, error = %e, "Category listing failed");
                        break;
                    }
                };
                if listings.is_empty() {
                    break;
                }

                for listing in listings {
                    if batch.len() >= quota {
                        break;
                    }
                    if seen.contains(&listing.id) {
                        continue;
                    }
                    if exclude_recent && listing.released_within(RECENCY_WINDOW_MONTHS, today) {
                        continue;
                    }
                    let Some(title) = listing.title else {
                        continue;
                    };

                    // Resolve the full record so every served candidate has a
                    // consistent shape
                    match self.metadata.resolve_by_title(&title).await {
                        Ok(Some(candidate)) => {
                            if seen.insert(candidate.id) {
                                batch.push(candidate);
                            }
                        }
                        Ok(None) => {}
                        Err(e) => {
                            tracing::debug!(title = %title, error = %e, "Resolution failed, skipping");
                        }
                    }
                }

                page += 1;
            }

            if batch.len() >= quota {
                break;
            }
        }

        tracing::debug!(
            collected = batch.len(),
            quota,
            exclude_recent,
            "Popularity fallback pass finished"
        );
    }

    /// AI suggestion pass: prompt, parse, resolve, filter.
    ///
    /// Returns the accepted candidates, possibly fewer than `quota`. Any
    /// suggester failure, including output with no parseable titles, is an
    /// error for the assembler to recover from.
    pub async fn ai_candidates(
        &self,
        profile: &Profile,
        seen: &mut HashSet<i64>,
        quota: usize,
    ) -> AppResult<Vec<MovieCandidate>> {
        let prompt = Self::build_prompt(profile, quota);
        let raw = self.suggester.generate(&prompt).await?;

        let titles = Self::parse_titles(&raw);
        if titles.is_empty() {
            return Err(AppError::ExternalApi(
                "Suggester output contained no usable titles".to_string(),
            ));
        }
        tracing::debug!(titles = titles.len(), "Suggester returned title list");

        let mut accepted = Vec::new();
        for title in titles {
            if accepted.len() >= quota {
                break;
            }
            match self.metadata.resolve_by_title(&title).await {
                Ok(Some(candidate)) => {
                    if seen.insert(candidate.id) {
                        accepted.push(candidate);
                    }
                }
                Ok(None) => {
                    tracing::debug!(title = %title, "Suggested title did not resolve");
                }
                Err(e) => {
                    tracing::debug!(title = %title, error = %e, "Resolution failed, skipping");
                }
            }
        }

        Ok(accepted)
    }

    /// Builds the suggestion prompt: the profile's reactions grouped by
    /// strength, the full exclusion list, and a 3x-quota title request.
    pub fn build_prompt(profile: &Profile, quota: usize) -> String {
        let mut prompt = format!("Suggest {} movies.", quota * AI_TITLE_MULTIPLIER);

        let sections: [(InteractionType, &str); 4] = [
            (InteractionType::StrongLike, "strongly likes"),
            (InteractionType::Like, "likes"),
            (InteractionType::Dislike, "dislikes"),
            (InteractionType::StrongDislike, "strongly dislikes"),
        ];
        for (kind, verb) in sections {
            let titles = profile.titles_by_kind(kind);
            if !titles.is_empty() {
                prompt.push_str(&format!(" The user {} these movies: {}.", verb, titles.join(", ")));
            }
        }

        let mut excluded: Vec<&str> = Vec::new();
        let mut excluded_set: HashSet<&str> = HashSet::new();
        let interacted = profile
            .interactions
            .iter()
            .filter_map(|i| i.movie_details.as_ref().map(|d| d.title.as_str()));
        let suggested = profile.suggested_movies.iter().map(|s| s.movie_title.as_str());
        for title in interacted.chain(suggested) {
            if excluded_set.insert(title) {
                excluded.push(title);
            }
        }
        if !excluded.is_empty() {
            prompt.push_str(&format!(
                " DO NOT suggest any of the following movies: {}.",
                excluded.join(", ")
            ));
        }

        prompt.push_str(" Provide only the movie titles, one per line.");
        prompt
    }

    /// Splits suggester output into titles, tolerating list markers,
    /// numbering, and quoting
    pub fn parse_titles(raw: &str) -> Vec<String> {
        raw.lines()
            .map(Self::clean_title_line)
            .filter(|title| !title.is_empty())
            .collect()
    }

    fn clean_title_line(line: &str) -> String {
        let mut title = line.trim();

        if let Some(rest) = title.strip_prefix(|c: char| c == '-' || c == '*') {
            title = rest.trim_start();
        } else {
            let digits = title.chars().take_while(char::is_ascii_digit).count();
            if digits > 0 {
                let after = &title[digits..];
                if let Some(rest) = after.strip_prefix('.').or_else(|| after.strip_prefix(')')) {
                    title = rest.trim_start();
                }
            }
        }

        title.trim_matches('"').trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MovieListing;
    use crate::services::providers::{MockMetadataProvider, MockTitleSuggester};
    use crate::services::taste;
    use chrono::Months;

    fn candidate(id: i64) -> MovieCandidate {
        MovieCandidate {
            id,
            title: format!("Movie {}", id),
            release_year: Some(2000),
            description: None,
            cover_url: None,
            genres: vec!["Drama".to_string()],
            director: None,
            writers: vec![],
            actors: vec![],
            imdb_id: None,
            vote_average: None,
        }
    }

    /// Resolver that maps "Movie {id}" back to a candidate with that id
    fn resolver_by_title(mock: &mut MockMetadataProvider) {
        mock.expect_resolve_by_title().returning(|title| {
            let id: i64 = title.trim_start_matches("Movie ").parse().unwrap();
            Ok(Some(candidate(id)))
        });
    }

    fn listing(id: i64, release_date: Option<String>) -> MovieListing {
        MovieListing {
            id,
            title: Some(format!("Movie {}", id)),
            release_date,
        }
    }

    fn source(
        metadata: MockMetadataProvider,
        suggester: MockTitleSuggester,
    ) -> CandidateSource {
        CandidateSource::new(Arc::new(metadata), Arc::new(suggester))
    }

    #[tokio::test]
    async fn test_fallback_fills_quota_and_respects_seen() {
        let mut metadata = MockMetadataProvider::new();
        metadata.expect_list_by_category().returning(|category, page| {
            if category == Category::Popular && page == 1 {
                Ok((1..=10).map(|id| listing(id, None)).collect())
            } else {
                Ok(vec![])
            }
        });
        resolver_by_title(&mut metadata);

        let src = source(metadata, MockTitleSuggester::new());
        let mut batch = Vec::new();
        let mut seen = HashSet::from([1, 2]);

        src.fill_from_popular(&mut batch, &mut seen, 5, false).await;

        let ids: Vec<i64> = batch.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![3, 4, 5, 6, 7]);
        assert!(seen.contains(&7));
    }

    #[tokio::test]
    async fn test_fallback_recency_exclusion_is_cold_start_only() {
        let today = Utc::now().date_naive();
        let recent = today
            .checked_sub_months(Months::new(1))
            .unwrap()
            .format("%Y-%m-%d")
            .to_string();
        let old = today
            .checked_sub_months(Months::new(24))
            .unwrap()
            .format("%Y-%m-%d")
            .to_string();

        let make_metadata = |recent: String, old: String| {
            let mut metadata = MockMetadataProvider::new();
            metadata.expect_list_by_category().returning(move |category, page| {
                if category == Category::Popular && page == 1 {
                    Ok(vec![listing(1, Some(recent.clone())), listing(2, Some(old.clone()))])
                } else {
                    Ok(vec![])
                }
            });
            resolver_by_title(&mut metadata);
            metadata
        };

        // Cold start skips the recent release
        let src = source(make_metadata(recent.clone(), old.clone()), MockTitleSuggester::new());
        let mut batch = Vec::new();
        src.fill_from_popular(&mut batch, &mut HashSet::new(), 5, true).await;
        assert_eq!(batch.iter().map(|c| c.id).collect::<Vec<_>>(), vec![2]);

        // General fallback keeps it
        let src = source(make_metadata(recent, old), MockTitleSuggester::new());
        let mut batch = Vec::new();
        src.fill_from_popular(&mut batch, &mut HashSet::new(), 5, false).await;
        assert_eq!(batch.iter().map(|c| c.id).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_fallback_recovers_from_failed_category() {
        let mut metadata = MockMetadataProvider::new();
        metadata.expect_list_by_category().returning(|category, page| {
            match (category, page) {
                (Category::Popular, _) => {
                    Err(AppError::ExternalApi("listing down".to_string()))
                }
                (Category::TopRated, 1) => Ok(vec![listing(11, None), listing(12, None)]),
                _ => Ok(vec![]),
            }
        });
        resolver_by_title(&mut metadata);

        let src = source(metadata, MockTitleSuggester::new());
        let mut batch = Vec::new();
        src.fill_from_popular(&mut batch, &mut HashSet::new(), 2, false).await;

        assert_eq!(batch.iter().map(|c| c.id).collect::<Vec<_>>(), vec![11, 12]);
    }

    #[tokio::test]
    async fn test_ai_candidates_resolve_and_filter() {
        let mut metadata = MockMetadataProvider::new();
        resolver_by_title(&mut metadata);

        let mut suggester = MockTitleSuggester::new();
        suggester
            .expect_generate()
            .returning(|_| Ok("1. Movie 5\n2. Movie 6\n3. Movie 5\n4. Movie 7".to_string()));

        let src = source(metadata, suggester);
        let profile = Profile::new("p");
        let mut seen = HashSet::from([6]);

        let accepted = src.ai_candidates(&profile, &mut seen, 10).await.unwrap();
        let ids: Vec<i64> = accepted.iter().map(|c| c.id).collect();
        // 6 was seen, the repeated 5 deduplicates
        assert_eq!(ids, vec![5, 7]);
    }

    #[tokio::test]
    async fn test_ai_candidates_provider_failure_propagates() {
        let mut suggester = MockTitleSuggester::new();
        suggester
            .expect_generate()
            .returning(|_| Err(AppError::ExternalApi("quota exhausted".to_string())));

        let src = source(MockMetadataProvider::new(), suggester);
        let profile = Profile::new("p");

        let err = src
            .ai_candidates(&profile, &mut HashSet::new(), 10)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ExternalApi(_)));
    }

    #[tokio::test]
    async fn test_ai_candidates_unusable_output_is_an_error() {
        let mut suggester = MockTitleSuggester::new();
        suggester.expect_generate().returning(|_| Ok("\n  \n".to_string()));

        let src = source(MockMetadataProvider::new(), suggester);
        let profile = Profile::new("p");

        let err = src
            .ai_candidates(&profile, &mut HashSet::new(), 10)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ExternalApi(_)));
    }

    #[test]
    fn test_parse_titles_tolerates_markers() {
        let raw = "1. Fight Club\n2) Seven\n- The Game\n* Zodiac\n\"Gone Girl\"\n\n   ";
        assert_eq!(
            CandidateSource::parse_titles(raw),
            vec!["Fight Club", "Seven", "The Game", "Zodiac", "Gone Girl"]
        );
    }

    #[test]
    fn test_build_prompt_sections() {
        let mut profile = Profile::new("p");
        taste::apply_interaction(&mut profile, 1, InteractionType::StrongLike, Some(candidate(1)));
        taste::apply_interaction(&mut profile, 2, InteractionType::Like, Some(candidate(2)));
        taste::apply_interaction(&mut profile, 3, InteractionType::Dislike, Some(candidate(3)));
        profile.suggested_movies.push(crate::models::SuggestedMovie {
            movie_id: 4,
            movie_title: "Movie 4".to_string(),
        });

        let prompt = CandidateSource::build_prompt(&profile, 40);

        assert!(prompt.starts_with("Suggest 120 movies."));
        assert!(prompt.contains("strongly likes these movies: Movie 1"));
        assert!(prompt.contains("likes these movies: Movie 2"));
        assert!(prompt.contains("dislikes these movies: Movie 3"));
        assert!(prompt.contains("DO NOT suggest any of the following movies:"));
        assert!(prompt.contains("Movie 4"));
        assert!(prompt.ends_with("Provide only the movie titles, one per line."));
    }

    #[test]
    fn test_build_prompt_empty_history() {
        let profile = Profile::new("p");
        let prompt = CandidateSource::build_prompt(&profile, 40);

        assert!(prompt.starts_with("Suggest 120 movies."));
        assert!(!prompt.contains("DO NOT"));
    }
}
