// ---------------------------------------------------------------------------
// Hybrid Blender — quota merge of recommender outputs
// ---------------------------------------------------------------------------
//
// The hybrid list takes 60% collaborative, 30% content-based and 10%
// trending, each quota rounded up. Duplicates across sources keep their
// first appearance in that order. Everything is re-tagged hybrid,
// sorted by confidence and cut to the requested limit.
// ---------------------------------------------------------------------------

use std::collections::{HashMap, HashSet};

use tracing::warn;

use crate::error::EngineError;
use crate::sources::{Catalog, EventStore};
use crate::types::{Candidate, CatalogQuery, EventKind, SourceTag};

pub const COLLABORATIVE_SHARE: f64 = 0.6;
pub const CONTENT_SHARE: f64 = 0.3;
pub const TRENDING_SHARE: f64 = 0.1;

/// Confidence assigned to every popularity-fallback candidate.
pub const FALLBACK_CONFIDENCE: f64 = 0.5;

fn quota(limit: usize, share: f64) -> usize {
	(limit as f64 * share).ceil() as usize
}

/// Merge the three source lists into one hybrid list of at most `limit`
/// candidates.
pub fn blend_hybrid(
	collaborative: Vec<Candidate>,
	content: Vec<Candidate>,
	trending: Vec<Candidate>,
	limit: usize,
) -> Vec<Candidate> {
	let mut seen: HashSet<String> = HashSet::new();
	let mut merged: Vec<Candidate> = Vec::new();

	let sources = [
		(collaborative, quota(limit, COLLABORATIVE_SHARE)),
		(content, quota(limit, CONTENT_SHARE)),
		(trending, quota(limit, TRENDING_SHARE)),
	];
	for (candidates, quota) in sources {
		for mut candidate in candidates.into_iter().take(quota) {
			if !seen.insert(candidate.book_id.clone()) {
				continue;
			}
			candidate.recommendation_type = SourceTag::Hybrid;
			merged.push(candidate);
		}
	}

	merged.sort_by(|a, b| {
		b.confidence_score
			.partial_cmp(&a.confidence_score)
			.unwrap_or(std::cmp::Ordering::Equal)
	});
	merged.truncate(limit);
	merged
}

/// Popularity fallback for users the recommenders have nothing for:
/// catalog books ranked by favorite count across all users, rating
/// breaking ties and carrying the list while nothing is favorited yet.
pub fn fallback_popular(
	catalog: &dyn Catalog,
	events: &dyn EventStore,
	limit: usize,
) -> Result<Vec<Candidate>, EngineError> {
	let mut books = catalog.search(&CatalogQuery {
		limit: limit.max(1) * 4,
		..CatalogQuery::default()
	})?;
	let favorites = favorite_counts(events);
	books.sort_by(|a, b| {
		let fa = favorites.get(&a.id).copied().unwrap_or(0);
		let fb = favorites.get(&b.id).copied().unwrap_or(0);
		fb.cmp(&fa).then_with(|| {
			let ra = a.rating.unwrap_or(0.0) * f64::from(a.rating_count.min(100)) / 100.0;
			let rb = b.rating.unwrap_or(0.0) * f64::from(b.rating_count.min(100)) / 100.0;
			rb.partial_cmp(&ra).unwrap_or(std::cmp::Ordering::Equal)
		})
	});
	books.truncate(limit);

	Ok(books
		.iter()
		.map(|book| {
			Candidate::from_book(
				book,
				FALLBACK_CONFIDENCE,
				SourceTag::Fallback,
				vec!["popular".to_string(), "fallback".to_string()],
			)
		})
		.collect())
}

/// Net favorites per book across every user; an unfavorite cancels an
/// earlier favorite. An unreachable event store degrades to an empty
/// tally so the rating ranking still produces a list.
fn favorite_counts(events: &dyn EventStore) -> HashMap<String, i64> {
	let all = match events.events_since(0) {
		Ok(all) => all,
		Err(e) => {
			warn!(error = %e, "event store unavailable, ranking fallback by rating");
			return HashMap::new();
		}
	};
	let mut counts: HashMap<String, i64> = HashMap::new();
	for event in &all {
		if let Some(ref book) = event.book {
			match event.kind {
				EventKind::Favorite => *counts.entry(book.id.clone()).or_default() += 1,
				EventKind::Unfavorite => *counts.entry(book.id.clone()).or_default() -= 1,
				_ => {}
			}
		}
	}
	counts
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
