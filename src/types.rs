use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookRecord {
	pub id: String,
	pub title: String,
	#[serde(default)]
	pub authors: String,
	#[serde(default)]
	pub categories: String,
	#[serde(default)]
	pub language: Option<String>,
	#[serde(default)]
	pub description: String,
	#[serde(default)]
	pub thumbnail: String,
	#[serde(default)]
	pub page_count: Option<u32>,
	#[serde(default)]
	pub published_year: Option<i32>,
	#[serde(default)]
	pub rating: Option<f64>,
	#[serde(default)]
	pub rating_count: u32,
}

/// Page-count constraint extracted from a query. Qualitative buckets set
/// min/max, an explicit "<N> sayfa" sets exact.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageCountFilter {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub exact: Option<u32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub min: Option<u32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub max: Option<u32>,
}

impl PageCountFilter {
	pub fn exact(n: u32) -> Self {
		Self {
			exact: Some(n),
			min: None,
			max: None,
		}
	}

	pub fn at_most(max: u32) -> Self {
		Self {
			exact: None,
			min: None,
			max: Some(max),
		}
	}

	pub fn between(min: u32, max: u32) -> Self {
		Self {
			exact: None,
			min: Some(min),
			max: Some(max),
		}
	}

	pub fn at_least(min: u32) -> Self {
		Self {
			exact: None,
			min: Some(min),
			max: None,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingFilter {
	pub min: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
	Children,
	YoungAdult,
	Adult,
}

/// Structured filters extracted from one query. At most one value per
/// filter name; absent filters are omitted from serialized output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSet {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub author: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub category: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub language: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub audience: Option<Audience>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub year: Option<i32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub page_count: Option<PageCountFilter>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub rating: Option<RatingFilter>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub keyword: Option<String>,
}

impl FilterSet {
	pub fn is_empty(&self) -> bool {
		self.author.is_none()
			&& self.category.is_none()
			&& self.language.is_none()
			&& self.audience.is_none()
			&& self.year.is_none()
			&& self.page_count.is_none()
			&& self.rating.is_none()
			&& self.keyword.is_none()
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionType {
	NlpProcessed,
	FallbackSearch,
	CachedNlp,
}

/// Result of interpreting one free-text query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interpretation {
	pub original_query: String,
	pub processed_query: String,
	pub filters: FilterSet,
	pub confidence_score: f64,
	pub matched_patterns: Vec<String>,
	pub suggestion_type: SuggestionType,
	#[serde(default)]
	pub cached: bool,
}

// ---------------------------------------------------------------------------
// Interaction events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
	View,
	Search,
	Favorite,
	Unfavorite,
	ReadStart,
	ReadProgress,
	ReadComplete,
	Rate,
}

impl EventKind {
	/// Fixed engagement weight per event type.
	pub fn weight(self) -> f64 {
		match self {
			Self::View => 1.0,
			Self::Search => 0.5,
			Self::Favorite => 3.0,
			Self::Unfavorite => -1.0,
			Self::ReadStart => 2.0,
			Self::ReadProgress => 1.5,
			Self::ReadComplete => 4.0,
			Self::Rate => 2.5,
		}
	}

	/// High-signal events invalidate the user's recommendation cache.
	pub fn is_high_signal(self) -> bool {
		matches!(self, Self::Favorite | Self::Rate | Self::ReadComplete)
	}
}

/// One append-only interaction record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionEvent {
	pub user_id: u64,
	pub kind: EventKind,
	#[serde(default)]
	pub book: Option<BookRecord>,
	#[serde(default)]
	pub rating: Option<f64>,
	#[serde(default)]
	pub query: Option<String>,
	pub weight: f64,
	pub timestamp: u64,
}

impl InteractionEvent {
	pub fn new(user_id: u64, kind: EventKind, timestamp: u64) -> Self {
		Self {
			user_id,
			kind,
			book: None,
			rating: None,
			query: None,
			weight: kind.weight(),
			timestamp,
		}
	}

	pub fn with_book(mut self, book: BookRecord) -> Self {
		self.book = Some(book);
		self
	}

	pub fn with_rating(mut self, rating: f64) -> Self {
		self.rating = Some(rating);
		self
	}

	pub fn with_query(mut self, query: impl Into<String>) -> Self {
		self.query = Some(query.into());
		self
	}
}

// ---------------------------------------------------------------------------
// Preference profile
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedItem {
	pub item: String,
	pub weight: f64,
	pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LengthBucket {
	Short,
	Medium,
	Long,
}

impl LengthBucket {
	pub fn from_pages(avg_pages: u32) -> Self {
		if avg_pages < 150 {
			Self::Short
		} else if avg_pages < 300 {
			Self::Medium
		} else {
			Self::Long
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingPatterns {
	pub avg_pages: u32,
	pub completed_books: usize,
	pub currently_reading: usize,
	pub avg_rating: f64,
	pub preferred_length: LengthBucket,
}

impl Default for ReadingPatterns {
	fn default() -> Self {
		Self {
			avg_pages: 0,
			completed_books: 0,
			currently_reading: 0,
			avg_rating: 0.0,
			preferred_length: LengthBucket::Short,
		}
	}
}

/// Weighted per-user behavior summary. An all-empty profile means "no
/// personalization available", never an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreferenceProfile {
	pub preferred_categories: Vec<WeightedItem>,
	pub preferred_authors: Vec<WeightedItem>,
	pub preferred_languages: Vec<WeightedItem>,
	pub keyword_preferences: Vec<WeightedItem>,
	#[serde(default)]
	pub reading_patterns: ReadingPatterns,
	#[serde(default)]
	pub computed_at: u64,
}

impl PreferenceProfile {
	pub fn is_empty(&self) -> bool {
		self.preferred_categories.is_empty()
			&& self.preferred_authors.is_empty()
			&& self.preferred_languages.is_empty()
			&& self.keyword_preferences.is_empty()
	}
}

// ---------------------------------------------------------------------------
// Recommendation candidates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTag {
	Collaborative,
	ContentBased,
	CategoryBased,
	Trending,
	Hybrid,
	Fallback,
}

/// Requested recommendation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecKind {
	Collaborative,
	ContentBased,
	CategoryBased,
	Trending,
	Hybrid,
}

impl RecKind {
	pub const ALL: [RecKind; 5] = [
		Self::Collaborative,
		Self::ContentBased,
		Self::CategoryBased,
		Self::Trending,
		Self::Hybrid,
	];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Collaborative => "collaborative",
			Self::ContentBased => "content_based",
			Self::CategoryBased => "category_based",
			Self::Trending => "trending",
			Self::Hybrid => "hybrid",
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
	pub book_id: String,
	pub title: String,
	pub authors: String,
	pub categories: String,
	pub thumbnail: String,
	pub description: String,
	pub confidence_score: f64,
	pub reason_tags: Vec<String>,
	pub recommendation_type: SourceTag,
}

impl Candidate {
	pub fn from_book(
		book: &BookRecord,
		confidence_score: f64,
		recommendation_type: SourceTag,
		reason_tags: Vec<String>,
	) -> Self {
		Self {
			book_id: book.id.clone(),
			title: book.title.clone(),
			authors: book.authors.clone(),
			categories: book.categories.clone(),
			thumbnail: book.thumbnail.clone(),
			description: book.description.clone(),
			confidence_score,
			reason_tags,
			recommendation_type,
		}
	}
}

// ---------------------------------------------------------------------------
// Catalog query
// ---------------------------------------------------------------------------

/// Bounded structured query against the external catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogQuery {
	#[serde(default)]
	pub text: String,
	#[serde(default)]
	pub author: Option<String>,
	#[serde(default)]
	pub category: Option<String>,
	#[serde(default)]
	pub language: Option<String>,
	pub limit: usize,
}

impl CatalogQuery {
	pub fn by_category(category: &str, limit: usize) -> Self {
		Self {
			category: Some(category.to_string()),
			limit,
			..Default::default()
		}
	}

	pub fn by_author(author: &str, limit: usize) -> Self {
		Self {
			author: Some(author.to_string()),
			limit,
			..Default::default()
		}
	}
}

// ---------------------------------------------------------------------------
// Clock helper
// ---------------------------------------------------------------------------

pub fn current_timestamp_ms() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.unwrap_or_default()
		.as_millis() as u64
}
