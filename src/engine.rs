// ---------------------------------------------------------------------------
// Discovery Engine — facade over interpretation and recommendation
// ---------------------------------------------------------------------------
//
// Wires the interpreter, the recommenders and the blender to the three
// collaborators (catalog, event store, cache) and owns the caching
// policy: interpretations for seven days above confidence 0.5,
// recommendation lists for one day, invalidated by high-signal events.
// ---------------------------------------------------------------------------

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Datelike;
use tracing::{debug, info, warn};

use crate::blend::{blend_hybrid, fallback_popular};
use crate::cache::{
	nlp_cache_key, rec_cache_key, Cache, NLP_CACHE_MIN_CONFIDENCE, NLP_CACHE_TTL_MS,
	REC_CACHE_TTL_MS,
};
use crate::error::EngineError;
use crate::interpret::Interpreter;
use crate::profile::{compute_profile, should_recompute, ProfileStore, RECOMPUTE_WINDOW_MS};
use crate::recommend::{
	category_based, collaborative, content_based, fail_closed, owned_books, trending,
};
use crate::similarity::{find_similar_users, rating_vector, user_similarity, SimilarUser};
use crate::sources::{Catalog, EventStore};
use crate::types::{
	current_timestamp_ms, Candidate, InteractionEvent, Interpretation, PreferenceProfile, RecKind,
	SuggestionType,
};

pub const DEFAULT_REC_LIMIT: usize = 10;
pub const MAX_REC_LIMIT: usize = 50;

pub struct DiscoveryEngine {
	interpreter: Interpreter,
	catalog: Arc<dyn Catalog>,
	events: Arc<dyn EventStore>,
	cache: Arc<dyn Cache>,
	profiles: ProfileStore,
}

impl DiscoveryEngine {
	pub fn new(
		catalog: Arc<dyn Catalog>,
		events: Arc<dyn EventStore>,
		cache: Arc<dyn Cache>,
	) -> Self {
		Self {
			interpreter: Interpreter::new(),
			catalog,
			events,
			cache,
			profiles: ProfileStore::new(),
		}
	}

	// -- interpretation -------------------------------------------------------

	pub fn interpret(
		&self,
		query: &str,
		user_id: Option<u64>,
	) -> Result<Interpretation, EngineError> {
		self.interpret_at(query, user_id, current_timestamp_ms())
	}

	pub fn interpret_at(
		&self,
		query: &str,
		user_id: Option<u64>,
		now_ms: u64,
	) -> Result<Interpretation, EngineError> {
		let raw = query.trim();
		let key = nlp_cache_key(raw);
		if let Some(cached) = self.cache_get(&key, now_ms) {
			if let Ok(mut interpretation) = serde_json::from_str::<Interpretation>(&cached) {
				debug!(query = raw, "interpretation served from cache");
				interpretation.cached = true;
				interpretation.suggestion_type = SuggestionType::CachedNlp;
				return Ok(interpretation);
			}
			// unreadable entry: drop it and reinterpret
			self.cache_delete(&key);
		}

		let profile = user_id.and_then(|id| self.profiles.get(id));
		let interpretation =
			self.interpreter
				.interpret_at(raw, profile.as_ref(), year_of(now_ms))?;

		if interpretation.confidence_score >= NLP_CACHE_MIN_CONFIDENCE {
			match serde_json::to_string(&interpretation) {
				Ok(body) => self.cache_set(&key, &body, NLP_CACHE_TTL_MS, now_ms),
				Err(e) => warn!(query = raw, error = %e, "interpretation not cached"),
			}
		}
		Ok(interpretation)
	}

	// -- events ---------------------------------------------------------------

	/// Append one event, invalidate caches on high-signal kinds, and
	/// rebuild the profile once enough recent events pile up.
	pub fn record_event(&self, event: InteractionEvent) -> Result<(), EngineError> {
		let user_id = event.user_id;
		let kind = event.kind;
		let now_ms = event.timestamp;
		self.events.record(event)?;

		if kind.is_high_signal() {
			debug!(user_id, kind = ?kind, "high-signal event, invalidating recommendations");
			if let Err(e) = self.cache.invalidate_user(user_id) {
				warn!(user_id, error = %e, "cache invalidation failed");
			}
		}

		let window_start = now_ms.saturating_sub(RECOMPUTE_WINDOW_MS);
		let recent = self.events.events_for_user_since(user_id, window_start)?;
		if should_recompute(recent.len()) {
			let history = self.events.events_for_user(user_id)?;
			let profile = compute_profile(&history, now_ms);
			info!(user_id, events = history.len(), "profile recomputed");
			self.profiles.upsert(user_id, profile);
		}
		Ok(())
	}

	/// Stored profile, or one computed on the spot from event history.
	pub fn profile(&self, user_id: u64) -> Result<PreferenceProfile, EngineError> {
		self.profile_at(user_id, current_timestamp_ms())
	}

	pub fn profile_at(&self, user_id: u64, now_ms: u64) -> Result<PreferenceProfile, EngineError> {
		if let Some(profile) = self.profiles.get(user_id) {
			return Ok(profile);
		}
		let history = self.events.events_for_user(user_id)?;
		let profile = compute_profile(&history, now_ms);
		if !profile.is_empty() {
			self.profiles.upsert(user_id, profile.clone());
		}
		Ok(profile)
	}

	// -- recommendations ------------------------------------------------------

	pub fn recommend(
		&self,
		user_id: u64,
		kind: RecKind,
		limit: usize,
		refresh: bool,
	) -> Result<Vec<Candidate>, EngineError> {
		self.recommend_at(user_id, kind, limit, refresh, current_timestamp_ms())
	}

	pub fn recommend_at(
		&self,
		user_id: u64,
		kind: RecKind,
		limit: usize,
		refresh: bool,
		now_ms: u64,
	) -> Result<Vec<Candidate>, EngineError> {
		if user_id == 0 {
			return Err(EngineError::InvalidUser);
		}
		let limit = if limit == 0 {
			DEFAULT_REC_LIMIT
		} else {
			limit.min(MAX_REC_LIMIT)
		};

		let key = rec_cache_key(user_id, kind.as_str());
		if !refresh {
			if let Some(cached) = self.cache_get(&key, now_ms) {
				if let Ok(candidates) = serde_json::from_str::<Vec<Candidate>>(&cached) {
					debug!(user_id, kind = kind.as_str(), "recommendations served from cache");
					return Ok(candidates);
				}
				self.cache_delete(&key);
			}
		}

		let mut candidates = self.generate(user_id, kind, limit, now_ms)?;
		if candidates.is_empty() {
			info!(user_id, kind = kind.as_str(), "no candidates, using popularity fallback");
			candidates = fallback_popular(self.catalog.as_ref(), self.events.as_ref(), limit)?;
		}

		match serde_json::to_string(&candidates) {
			Ok(body) => self.cache_set(&key, &body, REC_CACHE_TTL_MS, now_ms),
			Err(e) => warn!(user_id, error = %e, "recommendations not cached"),
		}
		Ok(candidates)
	}

	fn generate(
		&self,
		user_id: u64,
		kind: RecKind,
		limit: usize,
		now_ms: u64,
	) -> Result<Vec<Candidate>, EngineError> {
		let events = self.events.as_ref();
		let catalog = self.catalog.as_ref();
		match kind {
			RecKind::Collaborative => Ok(fail_closed(
				collaborative(events, user_id, limit),
				RecKind::Collaborative,
			)),
			RecKind::ContentBased => {
				let profile = self.profile_or_empty(user_id, now_ms);
				let owned = owned_books(events, user_id).unwrap_or_else(|_| HashSet::new());
				Ok(fail_closed(
					content_based(catalog, &profile, &owned, limit),
					RecKind::ContentBased,
				))
			}
			RecKind::CategoryBased => Ok(fail_closed(
				category_based(events, catalog, user_id, limit),
				RecKind::CategoryBased,
			)),
			RecKind::Trending => Ok(fail_closed(
				trending(events, user_id, now_ms, limit),
				RecKind::Trending,
			)),
			RecKind::Hybrid => {
				let profile = self.profile_or_empty(user_id, now_ms);
				let owned = owned_books(events, user_id).unwrap_or_else(|_| HashSet::new());
				let merged = blend_hybrid(
					fail_closed(collaborative(events, user_id, limit), RecKind::Collaborative),
					fail_closed(
						content_based(catalog, &profile, &owned, limit),
						RecKind::ContentBased,
					),
					fail_closed(trending(events, user_id, now_ms, limit), RecKind::Trending),
					limit,
				);
				Ok(merged)
			}
		}
	}

	// -- collaborator degradation ---------------------------------------------

	/// Profile lookup that cannot fail: a collaborator error yields the
	/// empty profile and recommendation continues unpersonalized.
	fn profile_or_empty(&self, user_id: u64, now_ms: u64) -> PreferenceProfile {
		self.profile_at(user_id, now_ms).unwrap_or_else(|e| {
			warn!(user_id, error = %e, "profile unavailable, using empty profile");
			PreferenceProfile::default()
		})
	}

	// Cache failures degrade: a read error counts as a miss, write and
	// delete errors are logged and dropped.
	fn cache_get(&self, key: &str, now_ms: u64) -> Option<String> {
		match self.cache.get_at(key, now_ms) {
			Ok(hit) => hit,
			Err(e) => {
				warn!(key, error = %e, "cache read failed, treating as miss");
				None
			}
		}
	}

	fn cache_set(&self, key: &str, value: &str, ttl_ms: u64, now_ms: u64) {
		if let Err(e) = self.cache.set_at(key, value, ttl_ms, now_ms) {
			warn!(key, error = %e, "cache write failed, entry skipped");
		}
	}

	fn cache_delete(&self, key: &str) {
		if let Err(e) = self.cache.delete(key) {
			warn!(key, error = %e, "cache delete failed");
		}
	}

	// -- similarity -----------------------------------------------------------

	/// Cosine similarity of two users' rating vectors.
	pub fn similarity(&self, user_a: u64, user_b: u64) -> Result<f64, EngineError> {
		if user_a == 0 || user_b == 0 {
			return Err(EngineError::InvalidUser);
		}
		let a = rating_vector(&self.events.events_for_user(user_a)?);
		let b = rating_vector(&self.events.events_for_user(user_b)?);
		Ok(user_similarity(&a, &b))
	}

	pub fn similar_users(&self, user_id: u64) -> Result<Vec<SimilarUser>, EngineError> {
		if user_id == 0 {
			return Err(EngineError::InvalidUser);
		}
		find_similar_users(self.events.as_ref(), user_id)
	}
}

fn year_of(now_ms: u64) -> i32 {
	chrono::DateTime::from_timestamp_millis(now_ms as i64)
		.map(|dt| dt.year())
		.unwrap_or_else(|| chrono::Utc::now().year())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;
	use crate::cache::MemoryCache;
	use crate::sources::{MemoryCatalog, MemoryEventStore};
	use crate::types::{BookRecord, EventKind, SourceTag};

	const NOW: u64 = 1_756_000_000_000; // 2025-08-24

	fn engine() -> (DiscoveryEngine, Arc<MemoryCatalog>, Arc<MemoryCache>) {
		let catalog = Arc::new(MemoryCatalog::new());
		let events = Arc::new(MemoryEventStore::new());
		let cache = Arc::new(MemoryCache::new());
		let engine = DiscoveryEngine::new(catalog.clone(), events.clone(), cache.clone());
		(engine, catalog, cache)
	}

	fn book(id: &str, category: &str, author: &str) -> BookRecord {
		BookRecord {
			id: id.to_string(),
			title: id.to_string(),
			categories: category.to_string(),
			authors: author.to_string(),
			rating: Some(4.0),
			rating_count: 10,
			..Default::default()
		}
	}

	const CONFIDENT_QUERY: &str = "george orwell kitapları polisiye sadece ingilizce";

	#[test]
	fn interpret_caches_confident_results() {
		let (engine, _, _) = engine();
		let first = engine.interpret_at(CONFIDENT_QUERY, None, NOW).unwrap();
		assert!(!first.cached);
		assert!(first.confidence_score >= 0.5);

		let second = engine.interpret_at(CONFIDENT_QUERY, None, NOW + 1).unwrap();
		assert!(second.cached);
		assert_eq!(second.suggestion_type, SuggestionType::CachedNlp);
		assert_eq!(second.filters, first.filters);
	}

	#[test]
	fn interpret_cache_expires_after_ttl() {
		let (engine, _, _) = engine();
		engine.interpret_at(CONFIDENT_QUERY, None, NOW).unwrap();
		let later = engine
			.interpret_at(CONFIDENT_QUERY, None, NOW + NLP_CACHE_TTL_MS)
			.unwrap();
		assert!(!later.cached);
	}

	#[test]
	fn low_confidence_interpretations_not_cached() {
		let (engine, _, _) = engine();
		let first = engine.interpret_at("kelebek zamanı", None, NOW).unwrap();
		assert!(first.confidence_score < 0.5);
		let second = engine.interpret_at("kelebek zamanı", None, NOW + 1).unwrap();
		assert!(!second.cached);
	}

	#[test]
	fn recommend_rejects_user_zero() {
		let (engine, _, _) = engine();
		let err = engine
			.recommend_at(0, RecKind::Hybrid, 10, false, NOW)
			.unwrap_err();
		assert!(matches!(err, EngineError::InvalidUser));
	}

	#[test]
	fn zero_history_user_gets_fallback_list() {
		let (engine, catalog, _) = engine();
		catalog.upsert(book("b1", "Roman", "A"));
		catalog.upsert(book("b2", "Roman", "B"));

		let recs = engine.recommend_at(1, RecKind::Hybrid, 10, false, NOW).unwrap();
		assert!(!recs.is_empty());
		assert!(recs.iter().all(|c| c.recommendation_type == SourceTag::Fallback));
	}

	#[test]
	fn recommend_serves_cached_list_until_refresh() {
		let (engine, catalog, _) = engine();
		catalog.upsert(book("b1", "Roman", "A"));

		let first = engine.recommend_at(1, RecKind::Trending, 10, false, NOW).unwrap();
		// new catalog content is invisible while the cache entry lives
		catalog.upsert(book("b2", "Roman", "B"));
		let cached = engine.recommend_at(1, RecKind::Trending, 10, false, NOW + 1).unwrap();
		assert_eq!(first.len(), cached.len());

		let refreshed = engine.recommend_at(1, RecKind::Trending, 10, true, NOW + 2).unwrap();
		assert_eq!(refreshed.len(), 2);
	}

	#[test]
	fn high_signal_event_invalidates_recommendations() {
		let (engine, catalog, cache) = engine();
		catalog.upsert(book("b1", "Roman", "A"));
		engine.recommend_at(7, RecKind::Hybrid, 10, false, NOW).unwrap();
		assert!(cache
			.get_at(&rec_cache_key(7, "hybrid"), NOW)
			.unwrap()
			.is_some());

		engine
			.record_event(
				InteractionEvent::new(7, EventKind::Favorite, NOW + 1)
					.with_book(book("b1", "Roman", "A")),
			)
			.unwrap();
		assert!(cache
			.get_at(&rec_cache_key(7, "hybrid"), NOW + 2)
			.unwrap()
			.is_none());
	}

	#[test]
	fn view_event_keeps_recommendation_cache() {
		let (engine, catalog, cache) = engine();
		catalog.upsert(book("b1", "Roman", "A"));
		engine.recommend_at(7, RecKind::Hybrid, 10, false, NOW).unwrap();

		engine
			.record_event(
				InteractionEvent::new(7, EventKind::View, NOW + 1)
					.with_book(book("b1", "Roman", "A")),
			)
			.unwrap();
		assert!(cache
			.get_at(&rec_cache_key(7, "hybrid"), NOW + 2)
			.unwrap()
			.is_some());
	}

	#[test]
	fn profile_recomputed_after_burst_of_events() {
		let (engine, _, _) = engine();
		for i in 0..10 {
			engine
				.record_event(
					InteractionEvent::new(3, EventKind::View, NOW + i)
						.with_book(book("b1", "Bilim kurgu", "Frank Herbert")),
				)
				.unwrap();
		}
		let profile = engine.profiles.get(3).expect("profile stored");
		assert_eq!(profile.preferred_categories[0].item, "Bilim kurgu");
	}

	#[test]
	fn similarity_is_symmetric() {
		let (engine, _, _) = engine();
		let b1 = book("b1", "Roman", "A");
		let b2 = book("b2", "Roman", "A");
		for user in [1, 2] {
			engine
				.record_event(
					InteractionEvent::new(user, EventKind::Favorite, NOW).with_book(b1.clone()),
				)
				.unwrap();
			engine
				.record_event(
					InteractionEvent::new(user, EventKind::Favorite, NOW).with_book(b2.clone()),
				)
				.unwrap();
		}
		let ab = engine.similarity(1, 2).unwrap();
		let ba = engine.similarity(2, 1).unwrap();
		assert_eq!(ab, ba);
		assert!((ab - 1.0).abs() < 1e-9);
		assert_eq!(engine.similarity(1, 1).unwrap(), 1.0);
	}

	fn down() -> EngineError {
		EngineError::Source("collaborator down".to_string())
	}

	struct FailingEventStore;

	impl EventStore for FailingEventStore {
		fn record(&self, _: InteractionEvent) -> Result<(), EngineError> {
			Err(down())
		}

		fn events_for_user(&self, _: u64) -> Result<Vec<InteractionEvent>, EngineError> {
			Err(down())
		}

		fn events_for_user_since(
			&self,
			_: u64,
			_: u64,
		) -> Result<Vec<InteractionEvent>, EngineError> {
			Err(down())
		}

		fn events_since(&self, _: u64) -> Result<Vec<InteractionEvent>, EngineError> {
			Err(down())
		}

		fn user_ids(&self) -> Result<Vec<u64>, EngineError> {
			Err(down())
		}
	}

	struct FailingCache;

	impl Cache for FailingCache {
		fn get_at(&self, _: &str, _: u64) -> Result<Option<String>, EngineError> {
			Err(down())
		}

		fn set_at(&self, _: &str, _: &str, _: u64, _: u64) -> Result<(), EngineError> {
			Err(down())
		}

		fn delete(&self, _: &str) -> Result<(), EngineError> {
			Err(down())
		}
	}

	#[test]
	fn failing_event_store_still_reaches_fallback() {
		let catalog = Arc::new(MemoryCatalog::new());
		catalog.upsert(book("b1", "Roman", "A"));
		let engine = DiscoveryEngine::new(
			catalog,
			Arc::new(FailingEventStore),
			Arc::new(MemoryCache::new()),
		);

		for kind in [RecKind::ContentBased, RecKind::Hybrid] {
			let recs = engine.recommend_at(1, kind, 10, true, NOW).unwrap();
			assert!(!recs.is_empty());
			assert!(recs.iter().all(|c| c.recommendation_type == SourceTag::Fallback));
		}
	}

	#[test]
	fn failing_cache_treated_as_miss() {
		let catalog = Arc::new(MemoryCatalog::new());
		catalog.upsert(book("b1", "Roman", "A"));
		let engine = DiscoveryEngine::new(
			catalog,
			Arc::new(MemoryEventStore::new()),
			Arc::new(FailingCache),
		);

		let interpretation = engine.interpret_at(CONFIDENT_QUERY, None, NOW).unwrap();
		assert!(!interpretation.cached);

		let recs = engine.recommend_at(1, RecKind::Hybrid, 10, false, NOW).unwrap();
		assert!(!recs.is_empty());

		// invalidation on a high-signal event must survive a dead cache too
		engine
			.record_event(
				InteractionEvent::new(1, EventKind::Favorite, NOW)
					.with_book(book("b1", "Roman", "A")),
			)
			.unwrap();
	}
}
