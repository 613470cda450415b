// ---------------------------------------------------------------------------
// Cache — TTL key/value collaborator
// ---------------------------------------------------------------------------
//
// Interpretations and recommendation lists are cached under string keys
// with millisecond TTLs. The trait is clock-explicit so expiry is
// deterministic under test; the convenience methods use the wall clock.
// ---------------------------------------------------------------------------

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::EngineError;
use crate::types::{current_timestamp_ms, RecKind};

/// Interpretation cache entries live for seven days.
pub const NLP_CACHE_TTL_MS: u64 = 7 * 24 * 60 * 60 * 1000;

/// Recommendation cache entries live for one day.
pub const REC_CACHE_TTL_MS: u64 = 24 * 60 * 60 * 1000;

/// Interpretations are cached only at or above this confidence.
pub const NLP_CACHE_MIN_CONFIDENCE: f64 = 0.5;

pub fn nlp_cache_key(raw_query: &str) -> String {
	format!("nlp:{raw_query}")
}

pub fn rec_cache_key(user_id: u64, kind: &str) -> String {
	format!("rec:{user_id}:{kind}")
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

pub trait Cache: Send + Sync {
	/// Fetch a live entry; expired entries read as absent.
	fn get_at(&self, key: &str, now_ms: u64) -> Result<Option<String>, EngineError>;

	fn set_at(&self, key: &str, value: &str, ttl_ms: u64, now_ms: u64)
		-> Result<(), EngineError>;

	fn delete(&self, key: &str) -> Result<(), EngineError>;

	fn get(&self, key: &str) -> Result<Option<String>, EngineError> {
		self.get_at(key, current_timestamp_ms())
	}

	fn set(&self, key: &str, value: &str, ttl_ms: u64) -> Result<(), EngineError> {
		self.set_at(key, value, ttl_ms, current_timestamp_ms())
	}

	/// Drop every recommendation entry for one user (all strategies).
	fn invalidate_user(&self, user_id: u64) -> Result<(), EngineError> {
		for kind in RecKind::ALL {
			self.delete(&rec_cache_key(user_id, kind.as_str()))?;
		}
		Ok(())
	}
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryCache {
	entries: RwLock<HashMap<String, CacheEntry>>,
}

struct CacheEntry {
	value: String,
	expires_at: u64,
}

impl MemoryCache {
	pub fn new() -> Self {
		Self::default()
	}

	/// Drop every expired entry. Reads already ignore stale entries, so
	/// this only reclaims memory.
	pub fn purge_expired(&self, now_ms: u64) -> usize {
		let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
		let before = entries.len();
		entries.retain(|_, entry| entry.expires_at > now_ms);
		before - entries.len()
	}

	pub fn len(&self) -> usize {
		self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

impl Cache for MemoryCache {
	fn get_at(&self, key: &str, now_ms: u64) -> Result<Option<String>, EngineError> {
		let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
		Ok(entries
			.get(key)
			.filter(|entry| entry.expires_at > now_ms)
			.map(|entry| entry.value.clone()))
	}

	fn set_at(
		&self,
		key: &str,
		value: &str,
		ttl_ms: u64,
		now_ms: u64,
	) -> Result<(), EngineError> {
		let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
		entries.insert(
			key.to_string(),
			CacheEntry {
				value: value.to_string(),
				expires_at: now_ms.saturating_add(ttl_ms),
			},
		);
		Ok(())
	}

	fn delete(&self, key: &str) -> Result<(), EngineError> {
		let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
		entries.remove(key);
		Ok(())
	}
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn set_then_get_within_ttl() {
		let cache = MemoryCache::new();
		cache.set_at("k", "v", 1_000, 0).unwrap();
		assert_eq!(cache.get_at("k", 999).unwrap().as_deref(), Some("v"));
	}

	#[test]
	fn entry_expires_at_deadline() {
		let cache = MemoryCache::new();
		cache.set_at("k", "v", 1_000, 0).unwrap();
		assert_eq!(cache.get_at("k", 1_000).unwrap(), None);
		assert_eq!(cache.get_at("k", 5_000).unwrap(), None);
	}

	#[test]
	fn overwrite_refreshes_ttl() {
		let cache = MemoryCache::new();
		cache.set_at("k", "old", 1_000, 0).unwrap();
		cache.set_at("k", "new", 1_000, 900).unwrap();
		assert_eq!(cache.get_at("k", 1_500).unwrap().as_deref(), Some("new"));
	}

	#[test]
	fn delete_removes_entry() {
		let cache = MemoryCache::new();
		cache.set_at("k", "v", 1_000, 0).unwrap();
		cache.delete("k").unwrap();
		assert_eq!(cache.get_at("k", 1).unwrap(), None);
	}

	#[test]
	fn purge_drops_only_expired() {
		let cache = MemoryCache::new();
		cache.set_at("a", "1", 100, 0).unwrap();
		cache.set_at("b", "2", 10_000, 0).unwrap();
		assert_eq!(cache.purge_expired(500), 1);
		assert_eq!(cache.len(), 1);
		assert_eq!(cache.get_at("b", 500).unwrap().as_deref(), Some("2"));
	}

	#[test]
	fn invalidate_user_drops_all_strategies() {
		let cache = MemoryCache::new();
		for kind in RecKind::ALL {
			cache
				.set_at(&rec_cache_key(42, kind.as_str()), "[]", 10_000, 0)
				.unwrap();
		}
		cache.set_at(&rec_cache_key(7, "hybrid"), "[]", 10_000, 0).unwrap();
		cache.invalidate_user(42).unwrap();
		assert_eq!(cache.len(), 1);
		assert!(cache.get_at(&rec_cache_key(7, "hybrid"), 1).unwrap().is_some());
	}

	#[test]
	fn cache_keys_are_namespaced() {
		assert_eq!(nlp_cache_key("bilim kurgu"), "nlp:bilim kurgu");
		assert_eq!(rec_cache_key(42, "hybrid"), "rec:42:hybrid");
	}
}
