// ---------------------------------------------------------------------------
// Recommenders — four independent candidate generators
// ---------------------------------------------------------------------------
//
// Each recommender works alone and fails closed: a source error degrades
// to an empty list with a log line, never an error across the blender
// boundary. Books the user has already touched are never recommended
// back to them.
// ---------------------------------------------------------------------------

use std::collections::{HashMap, HashSet};

use tracing::warn;

use crate::error::EngineError;
use crate::similarity::{find_similar_users, rating_vector};
use crate::sources::{Catalog, EventStore};
use crate::types::{
	BookRecord, Candidate, CatalogQuery, EventKind, PreferenceProfile, RecKind, SourceTag,
};

/// Trending looks at favorites inside this trailing window.
pub const TRENDING_WINDOW_MS: u64 = 30 * 24 * 60 * 60 * 1000;

/// A book needs this many recent favorites to trend.
pub const TRENDING_MIN_FAVORITES: usize = 2;

/// Category-based recommendations use the user's top favorited categories.
pub const TOP_FAVORITE_CATEGORIES: usize = 3;

const CONTENT_CATEGORY_FACTOR: f64 = 0.8;
const CONTENT_AUTHOR_FACTOR: f64 = 0.9;
const CONTENT_PROFILE_ITEMS: usize = 3;
const COLLABORATIVE_DEFAULT_CONFIDENCE: f64 = 0.5;
const MAX_IMPLICIT_RATING: f64 = 5.0;

/// Every book id the user has interacted with, in any way.
pub fn owned_books(
	events: &dyn EventStore,
	user_id: u64,
) -> Result<HashSet<String>, EngineError> {
	Ok(events
		.events_for_user(user_id)?
		.into_iter()
		.filter_map(|e| e.book.map(|b| b.id))
		.collect())
}

/// Swallow a recommender failure, logging which strategy broke.
pub fn fail_closed(result: Result<Vec<Candidate>, EngineError>, kind: RecKind) -> Vec<Candidate> {
	match result {
		Ok(candidates) => candidates,
		Err(error) => {
			warn!(strategy = kind.as_str(), %error, "recommender failed, returning empty");
			Vec::new()
		}
	}
}

fn sort_and_cap(mut candidates: Vec<Candidate>, limit: usize) -> Vec<Candidate> {
	candidates.sort_by(|a, b| {
		b.confidence_score
			.partial_cmp(&a.confidence_score)
			.unwrap_or(std::cmp::Ordering::Equal)
	});
	candidates.truncate(limit);
	candidates
}

// ---------------------------------------------------------------------------
// Collaborative
// ---------------------------------------------------------------------------

/// Favorites of similar users, weighted by how similar those users are.
pub fn collaborative(
	events: &dyn EventStore,
	user_id: u64,
	limit: usize,
) -> Result<Vec<Candidate>, EngineError> {
	let neighbors = find_similar_users(events, user_id)?;
	if neighbors.is_empty() {
		return Ok(Vec::new());
	}
	let owned = owned_books(events, user_id)?;

	// book id -> (record, Σ sim·rating, Σ sim)
	let mut pool: HashMap<String, (BookRecord, f64, f64)> = HashMap::new();
	for neighbor in &neighbors {
		let history = events.events_for_user(neighbor.user_id)?;
		let vector = rating_vector(&history);
		for event in history {
			if event.kind != EventKind::Favorite {
				continue;
			}
			let Some(book) = event.book else { continue };
			if owned.contains(&book.id) {
				continue;
			}
			let rating = vector.get(&book.id).copied().unwrap_or(MAX_IMPLICIT_RATING);
			let entry = pool
				.entry(book.id.clone())
				.or_insert_with(|| (book, 0.0, 0.0));
			entry.1 += neighbor.similarity * rating;
			entry.2 += neighbor.similarity;
		}
	}

	let candidates = pool
		.into_values()
		.map(|(book, weighted, sim_sum)| {
			let confidence = if sim_sum > 0.0 {
				(weighted / sim_sum / MAX_IMPLICIT_RATING).clamp(0.0, 1.0)
			} else {
				COLLABORATIVE_DEFAULT_CONFIDENCE
			};
			Candidate::from_book(
				&book,
				confidence,
				SourceTag::Collaborative,
				vec!["similar_users".to_string(), "highly_rated".to_string()],
			)
		})
		.collect();
	Ok(sort_and_cap(candidates, limit))
}

// ---------------------------------------------------------------------------
// Content-based
// ---------------------------------------------------------------------------

/// Catalog lookups driven by the user's profile: preferred categories at
/// 0.8 of their weight, preferred authors at 0.9.
pub fn content_based(
	catalog: &dyn Catalog,
	profile: &PreferenceProfile,
	owned: &HashSet<String>,
	limit: usize,
) -> Result<Vec<Candidate>, EngineError> {
	if profile.is_empty() {
		return Ok(Vec::new());
	}

	let mut seen: HashSet<String> = HashSet::new();
	let mut candidates: Vec<Candidate> = Vec::new();

	for pref in profile.preferred_categories.iter().take(CONTENT_PROFILE_ITEMS) {
		let hits = catalog.search(&CatalogQuery::by_category(&pref.item, limit))?;
		for book in hits {
			if owned.contains(&book.id) || !seen.insert(book.id.clone()) {
				continue;
			}
			candidates.push(Candidate::from_book(
				&book,
				(pref.weight * CONTENT_CATEGORY_FACTOR).clamp(0.0, 1.0),
				SourceTag::ContentBased,
				vec!["favorite_category".to_string(), pref.item.clone()],
			));
		}
	}

	for pref in profile.preferred_authors.iter().take(CONTENT_PROFILE_ITEMS) {
		let hits = catalog.search(&CatalogQuery::by_author(&pref.item, limit))?;
		for book in hits {
			if owned.contains(&book.id) || !seen.insert(book.id.clone()) {
				continue;
			}
			candidates.push(Candidate::from_book(
				&book,
				(pref.weight * CONTENT_AUTHOR_FACTOR).clamp(0.0, 1.0),
				SourceTag::ContentBased,
				vec!["favorite_author".to_string(), pref.item.clone()],
			));
		}
	}

	Ok(sort_and_cap(candidates, limit))
}

// ---------------------------------------------------------------------------
// Category-based
// ---------------------------------------------------------------------------

/// Catalog lookups in the categories the user favorites most often.
/// Confidence grows with the favorite count, capped at 0.9.
pub fn category_based(
	events: &dyn EventStore,
	catalog: &dyn Catalog,
	user_id: u64,
	limit: usize,
) -> Result<Vec<Candidate>, EngineError> {
	let history = events.events_for_user(user_id)?;
	let owned: HashSet<String> = history
		.iter()
		.filter_map(|e| e.book.as_ref().map(|b| b.id.clone()))
		.collect();

	let mut favorite_counts: HashMap<String, usize> = HashMap::new();
	for event in &history {
		if event.kind != EventKind::Favorite {
			continue;
		}
		let Some(ref book) = event.book else { continue };
		for category in book.categories.split(',').map(str::trim) {
			if !category.is_empty() {
				*favorite_counts.entry(category.to_string()).or_default() += 1;
			}
		}
	}
	if favorite_counts.is_empty() {
		return Ok(Vec::new());
	}

	let mut top: Vec<(String, usize)> = favorite_counts.into_iter().collect();
	top.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
	top.truncate(TOP_FAVORITE_CATEGORIES);

	let mut seen: HashSet<String> = HashSet::new();
	let mut candidates: Vec<Candidate> = Vec::new();
	for (category, count) in top {
		let confidence = (count as f64 * 0.1).min(0.9);
		let hits = catalog.search(&CatalogQuery::by_category(&category, limit))?;
		for book in hits {
			if owned.contains(&book.id) || !seen.insert(book.id.clone()) {
				continue;
			}
			candidates.push(Candidate::from_book(
				&book,
				confidence,
				SourceTag::CategoryBased,
				vec!["category_preference".to_string(), category.clone()],
			));
		}
	}

	Ok(sort_and_cap(candidates, limit))
}

// ---------------------------------------------------------------------------
// Trending
// ---------------------------------------------------------------------------

/// Books favorited by at least [`TRENDING_MIN_FAVORITES`] users inside the
/// trailing window. Confidence grows with the favorite count, capped at 0.8.
pub fn trending(
	events: &dyn EventStore,
	user_id: u64,
	now_ms: u64,
	limit: usize,
) -> Result<Vec<Candidate>, EngineError> {
	let owned = owned_books(events, user_id)?;
	let since = now_ms.saturating_sub(TRENDING_WINDOW_MS);

	let mut favorites: HashMap<String, (BookRecord, usize)> = HashMap::new();
	for event in events.events_since(since)? {
		if event.kind != EventKind::Favorite || event.user_id == user_id {
			continue;
		}
		let Some(book) = event.book else { continue };
		if owned.contains(&book.id) {
			continue;
		}
		favorites.entry(book.id.clone()).or_insert((book, 0)).1 += 1;
	}

	let mut ranked: Vec<(BookRecord, usize)> = favorites
		.into_values()
		.filter(|(_, count)| *count >= TRENDING_MIN_FAVORITES)
		.collect();
	// save count first, average rating breaks ties
	ranked.sort_by(|a, b| {
		b.1.cmp(&a.1).then_with(|| {
			b.0.rating
				.unwrap_or(0.0)
				.partial_cmp(&a.0.rating.unwrap_or(0.0))
				.unwrap_or(std::cmp::Ordering::Equal)
		})
	});
	ranked.truncate(limit);

	Ok(ranked
		.into_iter()
		.map(|(book, count)| {
			Candidate::from_book(
				&book,
				(count as f64 * 0.1).min(0.8),
				SourceTag::Trending,
				vec!["trending".to_string(), "popular".to_string()],
			)
		})
		.collect())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;
	use crate::sources::{MemoryCatalog, MemoryEventStore};
	use crate::types::{InteractionEvent, WeightedItem};

	fn book(id: &str, category: &str, author: &str) -> BookRecord {
		BookRecord {
			id: id.to_string(),
			title: id.to_string(),
			categories: category.to_string(),
			authors: author.to_string(),
			..Default::default()
		}
	}

	fn favorite(user: u64, b: &BookRecord, ts: u64) -> InteractionEvent {
		InteractionEvent::new(user, EventKind::Favorite, ts).with_book(b.clone())
	}

	// -- collaborative --------------------------------------------------------

	#[test]
	fn collaborative_excludes_owned_books() {
		let store = MemoryEventStore::new();
		let b1 = book("b1", "Roman", "A");
		let b2 = book("b2", "Roman", "A");
		let b3 = book("b3", "Roman", "A");
		// users 1 and 2 agree on b1 and b2; user 2 also favorites b3
		store.record(favorite(1, &b1, 1)).unwrap();
		store.record(favorite(1, &b2, 2)).unwrap();
		store.record(favorite(2, &b1, 3)).unwrap();
		store.record(favorite(2, &b2, 4)).unwrap();
		store.record(favorite(2, &b3, 5)).unwrap();

		let recs = collaborative(&store, 1, 10).unwrap();
		assert_eq!(recs.len(), 1);
		assert_eq!(recs[0].book_id, "b3");
		assert_eq!(recs[0].recommendation_type, SourceTag::Collaborative);
		// neighbor's implicit rating for a favorite is 5, so 5/5 = 1.0
		assert!((recs[0].confidence_score - 1.0).abs() < 1e-9);
		assert!(recs[0].reason_tags.contains(&"similar_users".to_string()));
	}

	#[test]
	fn collaborative_empty_without_neighbors() {
		let store = MemoryEventStore::new();
		store.record(favorite(1, &book("b1", "Roman", "A"), 1)).unwrap();
		assert!(collaborative(&store, 1, 10).unwrap().is_empty());
	}

	// -- content-based --------------------------------------------------------

	#[test]
	fn content_based_scales_profile_weights() {
		let catalog = MemoryCatalog::new();
		catalog.upsert(book("b1", "Bilim kurgu", "Frank Herbert"));
		catalog.upsert(book("b2", "Roman", "George Orwell"));

		let profile = PreferenceProfile {
			preferred_categories: vec![WeightedItem {
				item: "Bilim kurgu".to_string(),
				weight: 1.0,
				count: 3,
			}],
			preferred_authors: vec![WeightedItem {
				item: "George Orwell".to_string(),
				weight: 0.5,
				count: 1,
			}],
			..Default::default()
		};
		let recs = content_based(&catalog, &profile, &HashSet::new(), 10).unwrap();
		assert_eq!(recs.len(), 2);
		// category hit: 1.0 * 0.8; author hit: 0.5 * 0.9
		assert_eq!(recs[0].book_id, "b1");
		assert!((recs[0].confidence_score - 0.8).abs() < 1e-9);
		assert!((recs[1].confidence_score - 0.45).abs() < 1e-9);
		assert_eq!(
			recs[1].reason_tags,
			vec!["favorite_author".to_string(), "George Orwell".to_string()]
		);
	}

	#[test]
	fn content_based_empty_profile_yields_nothing() {
		let catalog = MemoryCatalog::new();
		catalog.upsert(book("b1", "Roman", "A"));
		let recs =
			content_based(&catalog, &PreferenceProfile::default(), &HashSet::new(), 10).unwrap();
		assert!(recs.is_empty());
	}

	// -- category-based -------------------------------------------------------

	#[test]
	fn category_confidence_grows_with_count_capped() {
		let store = MemoryEventStore::new();
		let catalog = MemoryCatalog::new();
		catalog.upsert(book("new", "Roman", "X"));
		for i in 0..12 {
			store
				.record(favorite(1, &book(&format!("b{i}"), "Roman", "A"), i))
				.unwrap();
		}

		let recs = category_based(&store, &catalog, 1, 10).unwrap();
		assert_eq!(recs.len(), 1);
		assert_eq!(recs[0].book_id, "new");
		assert!((recs[0].confidence_score - 0.9).abs() < 1e-9);
		assert_eq!(
			recs[0].reason_tags,
			vec!["category_preference".to_string(), "Roman".to_string()]
		);
	}

	#[test]
	fn category_based_requires_favorites() {
		let store = MemoryEventStore::new();
		let catalog = MemoryCatalog::new();
		catalog.upsert(book("b1", "Roman", "A"));
		store
			.record(
				InteractionEvent::new(1, EventKind::View, 1).with_book(book("b2", "Roman", "A")),
			)
			.unwrap();
		assert!(category_based(&store, &catalog, 1, 10).unwrap().is_empty());
	}

	// -- trending -------------------------------------------------------------

	#[test]
	fn trending_needs_two_recent_favorites() {
		let store = MemoryEventStore::new();
		let hot = book("hot", "Roman", "A");
		let cold = book("cold", "Roman", "A");
		let now = TRENDING_WINDOW_MS + 1_000_000;

		store.record(favorite(2, &hot, now - 100)).unwrap();
		store.record(favorite(3, &hot, now - 200)).unwrap();
		store.record(favorite(4, &cold, now - 300)).unwrap();
		// old favorite outside the window
		store.record(favorite(5, &hot, 10)).unwrap();

		let recs = trending(&store, 1, now, 10).unwrap();
		assert_eq!(recs.len(), 1);
		assert_eq!(recs[0].book_id, "hot");
		assert!((recs[0].confidence_score - 0.2).abs() < 1e-9);
		assert_eq!(recs[0].recommendation_type, SourceTag::Trending);
	}

	#[test]
	fn trending_ties_broken_by_rating() {
		let store = MemoryEventStore::new();
		let now = TRENDING_WINDOW_MS + 1_000_000;
		let mut good = book("good", "Roman", "A");
		good.rating = Some(4.8);
		let mut fine = book("fine", "Roman", "A");
		fine.rating = Some(3.2);

		for (user, b) in [(2, &good), (3, &good), (4, &fine), (5, &fine)] {
			store.record(favorite(user, b, now - 10)).unwrap();
		}
		let recs = trending(&store, 1, now, 10).unwrap();
		assert_eq!(recs.len(), 2);
		assert_eq!(recs[0].book_id, "good");
		assert_eq!(recs[1].book_id, "fine");
	}

	#[test]
	fn trending_skips_own_favorites_and_owned() {
		let store = MemoryEventStore::new();
		let b = book("b1", "Roman", "A");
		let now = TRENDING_WINDOW_MS + 1_000_000;
		store.record(favorite(1, &b, now - 50)).unwrap();
		store.record(favorite(2, &b, now - 60)).unwrap();
		store.record(favorite(3, &b, now - 70)).unwrap();

		// user 1 already owns b1
		assert!(trending(&store, 1, now, 10).unwrap().is_empty());
	}

	// -- fail-closed ----------------------------------------------------------

	#[test]
	fn fail_closed_swallows_errors() {
		let out = fail_closed(
			Err(EngineError::Source("catalog unreachable".to_string())),
			RecKind::Collaborative,
		);
		assert!(out.is_empty());
	}
}
