// ---------------------------------------------------------------------------
// User Similarity — rating vectors and neighbor search
// ---------------------------------------------------------------------------
//
// Two users are compared by cosine similarity over the books they have
// both touched. Each book contributes one implicit rating: the explicit
// rating if one exists, 5 for a favorite, 3 for any other interaction.
// ---------------------------------------------------------------------------

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::cosine::cosine_similarity;
use crate::error::EngineError;
use crate::sources::EventStore;
use crate::types::{EventKind, InteractionEvent};

/// Fewer shared books than this and similarity is defined as zero.
pub const MIN_COMMON_ITEMS: usize = 2;

/// Neighbors below this similarity are discarded.
pub const SIMILARITY_THRESHOLD: f64 = 0.3;

/// Neighbor search scans at most this many other users.
pub const CANDIDATE_SAMPLE: usize = 100;

/// Neighbor search keeps at most this many users.
pub const MAX_NEIGHBORS: usize = 10;

const FAVORITE_RATING: f64 = 5.0;
const IMPLICIT_RATING: f64 = 3.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarUser {
	pub user_id: u64,
	pub similarity: f64,
}

/// Collapse a user's event history into book id → implicit rating.
///
/// Explicit ratings win over favorite status; an unfavorite clears the
/// favorite but the book still counts as touched.
pub fn rating_vector(events: &[InteractionEvent]) -> HashMap<String, f64> {
	let mut touched: HashSet<String> = HashSet::new();
	let mut rated: HashMap<String, f64> = HashMap::new();
	let mut favorites: HashSet<String> = HashSet::new();

	for event in events {
		let Some(ref book) = event.book else {
			continue;
		};
		touched.insert(book.id.clone());
		match event.kind {
			EventKind::Rate => {
				if let Some(rating) = event.rating {
					rated.insert(book.id.clone(), rating);
				}
			}
			EventKind::Favorite => {
				favorites.insert(book.id.clone());
			}
			EventKind::Unfavorite => {
				favorites.remove(&book.id);
			}
			_ => {}
		}
	}

	touched
		.into_iter()
		.map(|id| {
			let value = rated.get(&id).copied().unwrap_or(if favorites.contains(&id) {
				FAVORITE_RATING
			} else {
				IMPLICIT_RATING
			});
			(id, value)
		})
		.collect()
}

/// Cosine similarity over the books both users have touched;
/// zero when they share fewer than [`MIN_COMMON_ITEMS`].
pub fn user_similarity(a: &HashMap<String, f64>, b: &HashMap<String, f64>) -> f64 {
	let mut common: Vec<&String> = a.keys().filter(|id| b.contains_key(*id)).collect();
	if common.len() < MIN_COMMON_ITEMS {
		return 0.0;
	}
	common.sort();

	let va: Vec<f64> = common.iter().map(|id| a[*id]).collect();
	let vb: Vec<f64> = common.iter().map(|id| b[*id]).collect();
	cosine_similarity(&va, &vb)
}

/// Find the most similar users to `user_id`, scanning the first
/// [`CANDIDATE_SAMPLE`] other users and keeping the top
/// [`MAX_NEIGHBORS`] above [`SIMILARITY_THRESHOLD`].
pub fn find_similar_users(
	store: &dyn EventStore,
	user_id: u64,
) -> Result<Vec<SimilarUser>, EngineError> {
	let own = rating_vector(&store.events_for_user(user_id)?);
	if own.is_empty() {
		return Ok(Vec::new());
	}

	let mut neighbors: Vec<SimilarUser> = Vec::new();
	for other_id in store
		.user_ids()?
		.into_iter()
		.filter(|id| *id != user_id)
		.take(CANDIDATE_SAMPLE)
	{
		let other = rating_vector(&store.events_for_user(other_id)?);
		let similarity = user_similarity(&own, &other);
		if similarity > SIMILARITY_THRESHOLD {
			neighbors.push(SimilarUser {
				user_id: other_id,
				similarity,
			});
		}
	}

	neighbors.sort_by(|a, b| {
		b.similarity
			.partial_cmp(&a.similarity)
			.unwrap_or(std::cmp::Ordering::Equal)
	});
	neighbors.truncate(MAX_NEIGHBORS);
	Ok(neighbors)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;
	use crate::sources::MemoryEventStore;
	use crate::types::BookRecord;

	fn book(id: &str) -> BookRecord {
		BookRecord {
			id: id.to_string(),
			title: id.to_string(),
			..Default::default()
		}
	}

	fn event(user: u64, kind: EventKind, book_id: &str, ts: u64) -> InteractionEvent {
		InteractionEvent::new(user, kind, ts).with_book(book(book_id))
	}

	#[test]
	fn rating_vector_prefers_explicit_rating() {
		let events = vec![
			event(1, EventKind::Favorite, "b1", 1),
			event(1, EventKind::Rate, "b1", 2).with_rating(2.0),
			event(1, EventKind::Favorite, "b2", 3),
			event(1, EventKind::View, "b3", 4),
		];
		let vector = rating_vector(&events);
		assert_eq!(vector["b1"], 2.0);
		assert_eq!(vector["b2"], 5.0);
		assert_eq!(vector["b3"], 3.0);
	}

	#[test]
	fn unfavorite_downgrades_to_implicit() {
		let events = vec![
			event(1, EventKind::Favorite, "b1", 1),
			event(1, EventKind::Unfavorite, "b1", 2),
		];
		let vector = rating_vector(&events);
		assert_eq!(vector["b1"], 3.0);
	}

	#[test]
	fn similarity_requires_two_common_items() {
		let a: HashMap<String, f64> = [("b1".to_string(), 5.0)].into_iter().collect();
		let b: HashMap<String, f64> =
			[("b1".to_string(), 5.0), ("b2".to_string(), 4.0)].into_iter().collect();
		assert_eq!(user_similarity(&a, &b), 0.0);
	}

	#[test]
	fn identical_overlap_is_fully_similar() {
		let a: HashMap<String, f64> =
			[("b1".to_string(), 5.0), ("b2".to_string(), 3.0)].into_iter().collect();
		assert!((user_similarity(&a, &a) - 1.0).abs() < 1e-9);
	}

	#[test]
	fn neighbor_search_filters_and_sorts() {
		let store = MemoryEventStore::new();
		// user 1 loves b1 and b2
		store.record(event(1, EventKind::Favorite, "b1", 1)).unwrap();
		store.record(event(1, EventKind::Favorite, "b2", 2)).unwrap();
		// user 2 mirrors user 1 exactly
		store.record(event(2, EventKind::Favorite, "b1", 3)).unwrap();
		store.record(event(2, EventKind::Favorite, "b2", 4)).unwrap();
		// user 3 shares only one book
		store.record(event(3, EventKind::Favorite, "b1", 5)).unwrap();
		store.record(event(3, EventKind::Favorite, "b9", 6)).unwrap();

		let neighbors = find_similar_users(&store, 1).unwrap();
		assert_eq!(neighbors.len(), 1);
		assert_eq!(neighbors[0].user_id, 2);
		assert!((neighbors[0].similarity - 1.0).abs() < 1e-9);
	}

	#[test]
	fn neighbor_search_empty_for_unknown_user() {
		let store = MemoryEventStore::new();
		store.record(event(2, EventKind::Favorite, "b1", 1)).unwrap();
		assert!(find_similar_users(&store, 99).unwrap().is_empty());
	}
}
