// ---------------------------------------------------------------------------
// Preference Profiles — aggregation over interaction history
// ---------------------------------------------------------------------------
//
// A profile is a weighted snapshot of one user's behavior: favorite
// interactions score 3, everything else 1, per category and author the
// touched book carries. Weights are normalized to the strongest item in
// each group, so the top preference is always 1.0.
// ---------------------------------------------------------------------------

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use crate::lexicon::normalize_query;
use crate::types::{
	EventKind, InteractionEvent, LengthBucket, PreferenceProfile, ReadingPatterns, WeightedItem,
};

const FAVORITE_SCORE: f64 = 3.0;
const BASE_SCORE: f64 = 1.0;

const MAX_CATEGORIES: usize = 10;
const MAX_AUTHORS: usize = 10;
const MAX_KEYWORDS: usize = 20;
const MIN_KEYWORD_LEN: usize = 3;

/// A profile is recomputed once this many events land inside the window.
pub const RECOMPUTE_EVENT_THRESHOLD: usize = 10;

/// Trailing window inspected by the recompute trigger.
pub const RECOMPUTE_WINDOW_MS: u64 = 24 * 60 * 60 * 1000;

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Tally {
	score: f64,
	count: usize,
}

fn rank(tallies: HashMap<String, Tally>, limit: usize) -> Vec<WeightedItem> {
	let mut items: Vec<(String, Tally)> = tallies.into_iter().collect();
	items.sort_by(|a, b| {
		b.1.score
			.partial_cmp(&a.1.score)
			.unwrap_or(std::cmp::Ordering::Equal)
			.then_with(|| a.0.cmp(&b.0))
	});
	items.truncate(limit);

	let max_score = items.first().map(|(_, t)| t.score).unwrap_or(0.0);
	if max_score <= 0.0 {
		return Vec::new();
	}
	items
		.into_iter()
		.map(|(item, tally)| WeightedItem {
			item,
			weight: tally.score / max_score,
			count: tally.count,
		})
		.collect()
}

/// Languages are a probability distribution: weight = count / total.
fn distribution(tallies: HashMap<String, Tally>) -> Vec<WeightedItem> {
	let total: usize = tallies.values().map(|t| t.count).sum();
	if total == 0 {
		return Vec::new();
	}
	let mut items: Vec<WeightedItem> = tallies
		.into_iter()
		.map(|(item, tally)| WeightedItem {
			item,
			weight: tally.count as f64 / total as f64,
			count: tally.count,
		})
		.collect();
	items.sort_by(|a, b| {
		b.count
			.cmp(&a.count)
			.then_with(|| a.item.cmp(&b.item))
	});
	items
}

fn split_list(field: &str) -> impl Iterator<Item = String> + '_ {
	field
		.split(',')
		.map(str::trim)
		.filter(|s| !s.is_empty())
		.map(str::to_string)
}

/// Build a profile snapshot from a user's full event history.
pub fn compute_profile(events: &[InteractionEvent], now_ms: u64) -> PreferenceProfile {
	let mut categories: HashMap<String, Tally> = HashMap::new();
	let mut authors: HashMap<String, Tally> = HashMap::new();
	let mut languages: HashMap<String, Tally> = HashMap::new();
	let mut keywords: HashMap<String, Tally> = HashMap::new();

	let mut page_total: u64 = 0;
	let mut page_samples: u64 = 0;
	let mut rating_total = 0.0;
	let mut rating_samples = 0usize;
	let mut completed: HashSet<String> = HashSet::new();
	let mut started: HashSet<String> = HashSet::new();

	for event in events {
		if event.kind == EventKind::Search {
			if let Some(ref query) = event.query {
				for token in normalize_query(query).split_whitespace() {
					if token.chars().count() < MIN_KEYWORD_LEN {
						continue;
					}
					let tally = keywords.entry(token.to_string()).or_default();
					tally.score += 1.0;
					tally.count += 1;
				}
			}
		}

		let Some(ref book) = event.book else {
			continue;
		};
		let score = if event.kind == EventKind::Favorite {
			FAVORITE_SCORE
		} else {
			BASE_SCORE
		};

		for category in split_list(&book.categories) {
			let tally = categories.entry(category).or_default();
			tally.score += score;
			tally.count += 1;
		}
		for author in split_list(&book.authors) {
			let tally = authors.entry(author).or_default();
			tally.score += score;
			tally.count += 1;
		}
		if let Some(ref language) = book.language {
			let tally = languages.entry(language.clone()).or_default();
			tally.score += 1.0;
			tally.count += 1;
		}

		if let Some(pages) = book.page_count {
			page_total += u64::from(pages);
			page_samples += 1;
		}
		match event.kind {
			EventKind::ReadStart => {
				started.insert(book.id.clone());
			}
			EventKind::ReadComplete => {
				completed.insert(book.id.clone());
			}
			EventKind::Rate => {
				if let Some(rating) = event.rating {
					rating_total += rating;
					rating_samples += 1;
				}
			}
			_ => {}
		}
	}

	let avg_pages = if page_samples > 0 {
		(page_total / page_samples) as u32
	} else {
		0
	};
	let reading_patterns = ReadingPatterns {
		avg_pages,
		completed_books: completed.len(),
		currently_reading: started.difference(&completed).count(),
		avg_rating: if rating_samples > 0 {
			rating_total / rating_samples as f64
		} else {
			0.0
		},
		preferred_length: LengthBucket::from_pages(avg_pages),
	};

	PreferenceProfile {
		preferred_categories: rank(categories, MAX_CATEGORIES),
		preferred_authors: rank(authors, MAX_AUTHORS),
		preferred_languages: distribution(languages),
		keyword_preferences: rank(keywords, MAX_KEYWORDS),
		reading_patterns,
		computed_at: now_ms,
	}
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Snapshot store. Upserts replace the whole profile; partial merges are
/// never performed.
#[derive(Default)]
pub struct ProfileStore {
	profiles: RwLock<HashMap<u64, PreferenceProfile>>,
}

impl ProfileStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn upsert(&self, user_id: u64, profile: PreferenceProfile) {
		let mut profiles = self.profiles.write().unwrap_or_else(|e| e.into_inner());
		profiles.insert(user_id, profile);
	}

	pub fn get(&self, user_id: u64) -> Option<PreferenceProfile> {
		let profiles = self.profiles.read().unwrap_or_else(|e| e.into_inner());
		profiles.get(&user_id).cloned()
	}
}

/// True once enough recent events have accumulated to justify rebuilding
/// the profile.
pub fn should_recompute(recent_event_count: usize) -> bool {
	recent_event_count >= RECOMPUTE_EVENT_THRESHOLD
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
