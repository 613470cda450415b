// ---------------------------------------------------------------------------
// Query Interpreter — single-pass extraction pipeline
// ---------------------------------------------------------------------------
//
// Validates the raw query, normalizes it, then runs the filter extractors
// in fixed order, letting each one consume the text it matched. Whatever
// survives the pipeline becomes the keyword filter. Cumulative confidence
// below 0.3 discards all extracted filters and falls back to a
// keyword-only interpretation.
// ---------------------------------------------------------------------------

use chrono::Datelike;

use crate::error::EngineError;
use crate::extract::{
	extract_audience, extract_author, extract_category, extract_language, extract_page_count,
	extract_rating, extract_year,
};
use crate::lexicon::{normalize_query, Lexicon};
use crate::types::{FilterSet, Interpretation, PreferenceProfile, SuggestionType};

// ---------------------------------------------------------------------------
// Confidence weights
// ---------------------------------------------------------------------------

const WEIGHT_AUTHOR: f64 = 0.20;
const WEIGHT_CATEGORY: f64 = 0.20;
const WEIGHT_LANGUAGE: f64 = 0.15;
const WEIGHT_AUDIENCE: f64 = 0.10;
const WEIGHT_YEAR: f64 = 0.10;
const WEIGHT_PAGE_COUNT: f64 = 0.05;
const WEIGHT_RATING: f64 = 0.05;
const WEIGHT_KEYWORD: f64 = 0.15;

/// Below this cumulative confidence, extracted filters are considered
/// unreliable and the whole interpretation degrades to keyword-only.
pub const CONFIDENCE_FLOOR: f64 = 0.3;

pub const QUERY_MIN_CHARS: usize = 3;
pub const QUERY_MAX_CHARS: usize = 500;

// ---------------------------------------------------------------------------
// Interpreter
// ---------------------------------------------------------------------------

pub struct Interpreter {
	lexicon: Lexicon,
}

impl Interpreter {
	pub fn new() -> Self {
		Self {
			lexicon: Lexicon::new(),
		}
	}

	/// Interpret a raw query, using the current calendar year as the upper
	/// bound for year extraction.
	pub fn interpret(
		&self,
		query: &str,
		profile: Option<&PreferenceProfile>,
	) -> Result<Interpretation, EngineError> {
		self.interpret_at(query, profile, chrono::Utc::now().year())
	}

	/// Interpret with an explicit current year (deterministic for tests).
	pub fn interpret_at(
		&self,
		query: &str,
		profile: Option<&PreferenceProfile>,
		current_year: i32,
	) -> Result<Interpretation, EngineError> {
		let raw = query.trim();
		if raw.is_empty() {
			return Err(EngineError::QueryEmpty);
		}
		let char_count = raw.chars().count();
		if char_count < QUERY_MIN_CHARS {
			return Err(EngineError::QueryTooShort);
		}
		if char_count > QUERY_MAX_CHARS {
			return Err(EngineError::QueryTooLong);
		}

		let mut remaining = normalize_query(raw);
		let mut filters = FilterSet::default();
		let mut confidence = 0.0;
		let mut matched: Vec<String> = Vec::new();

		if let Some(ex) = extract_author(&self.lexicon, &remaining) {
			filters.author = Some(ex.value);
			confidence += WEIGHT_AUTHOR;
			matched.push("author".to_string());
			remaining = ex.remaining;
		}

		if let Some(ex) = extract_category(&remaining) {
			filters.category = Some(ex.value);
			confidence += WEIGHT_CATEGORY;
			matched.push("category".to_string());
			remaining = ex.remaining;
		}

		if let Some(ex) = extract_language(&self.lexicon, &remaining) {
			filters.language = Some(ex.value);
			confidence += WEIGHT_LANGUAGE;
			matched.push("language".to_string());
			remaining = ex.remaining;
		}

		if let Some(ex) = extract_audience(&self.lexicon, &remaining) {
			filters.audience = Some(ex.value);
			confidence += WEIGHT_AUDIENCE;
			matched.push("audience".to_string());
			remaining = ex.remaining;
		}

		if let Some(ex) = extract_year(&self.lexicon, &remaining, current_year) {
			filters.year = Some(ex.value);
			confidence += WEIGHT_YEAR;
			matched.push("year".to_string());
			remaining = ex.remaining;
		}

		if let Some(ex) = extract_page_count(&self.lexicon, &remaining) {
			filters.page_count = Some(ex.value);
			confidence += WEIGHT_PAGE_COUNT;
			matched.push("page_count".to_string());
			remaining = ex.remaining;
		}

		if let Some(ex) = extract_rating(&self.lexicon, &remaining) {
			filters.rating = Some(ex.value);
			confidence += WEIGHT_RATING;
			matched.push("rating".to_string());
			remaining = ex.remaining;
		}

		// Whatever the pipeline did not consume becomes the keyword filter.
		if !remaining.is_empty() {
			filters.keyword = Some(remaining.clone());
			confidence += WEIGHT_KEYWORD;
			matched.push("keyword".to_string());
		}

		if let Some(profile) = profile {
			confidence = (confidence + preference_bonus(&filters, profile)).min(1.0);
		}

		if confidence < CONFIDENCE_FLOOR {
			// Partial low-confidence filter sets are never surfaced.
			return Ok(fallback_interpretation(raw));
		}

		Ok(Interpretation {
			original_query: raw.to_string(),
			processed_query: remaining,
			filters,
			confidence_score: round3(confidence),
			matched_patterns: matched,
			suggestion_type: SuggestionType::NlpProcessed,
			cached: false,
		})
	}
}

impl Default for Interpreter {
	fn default() -> Self {
		Self::new()
	}
}

/// Keyword-only interpretation used when confidence stays under the floor.
pub fn fallback_interpretation(raw_query: &str) -> Interpretation {
	Interpretation {
		original_query: raw_query.to_string(),
		processed_query: raw_query.to_string(),
		filters: FilterSet {
			keyword: Some(raw_query.to_string()),
			..Default::default()
		},
		confidence_score: CONFIDENCE_FLOOR,
		matched_patterns: vec!["fallback".to_string()],
		suggestion_type: SuggestionType::FallbackSearch,
		cached: false,
	}
}

/// Additive confidence bonus when extracted filters agree with the user's
/// preference profile (category 0.10·w, author 0.15·w, language 0.05·w).
fn preference_bonus(filters: &FilterSet, profile: &PreferenceProfile) -> f64 {
	let mut bonus = 0.0;

	if let Some(ref category) = filters.category {
		let needle = category.to_lowercase();
		if let Some(pref) = profile
			.preferred_categories
			.iter()
			.find(|p| p.item.to_lowercase().contains(&needle))
		{
			bonus += 0.10 * pref.weight;
		}
	}

	if let Some(ref author) = filters.author {
		let needle = author.to_lowercase();
		if let Some(pref) = profile
			.preferred_authors
			.iter()
			.find(|p| p.item.to_lowercase().contains(&needle))
		{
			bonus += 0.15 * pref.weight;
		}
	}

	if let Some(ref language) = filters.language {
		if let Some(pref) = profile
			.preferred_languages
			.iter()
			.find(|p| p.item == *language)
		{
			bonus += 0.05 * pref.weight;
		}
	}

	bonus
}

fn round3(value: f64) -> f64 {
	(value * 1000.0).round() / 1000.0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
