// ---------------------------------------------------------------------------
// Data Sources — catalog and interaction event collaborators
// ---------------------------------------------------------------------------
//
// The engine never owns book data or interaction history. It talks to a
// catalog (metadata search) and an event store (interaction log) through
// these traits. The in-memory implementations back the stdio server and
// the test suite.
// ---------------------------------------------------------------------------

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::EngineError;
use crate::types::{BookRecord, CatalogQuery, InteractionEvent};

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Book metadata lookup. Implementations may be remote and may fail.
pub trait Catalog: Send + Sync {
	/// Search for books matching the query, up to `query.limit` results.
	fn search(&self, query: &CatalogQuery) -> Result<Vec<BookRecord>, EngineError>;

	/// Fetch a single book by id.
	fn get(&self, book_id: &str) -> Result<Option<BookRecord>, EngineError>;
}

/// Append-only interaction log. Events are never mutated after recording.
pub trait EventStore: Send + Sync {
	fn record(&self, event: InteractionEvent) -> Result<(), EngineError>;

	/// All events for one user, oldest first.
	fn events_for_user(&self, user_id: u64) -> Result<Vec<InteractionEvent>, EngineError>;

	/// Events for one user with `timestamp >= since_ms`, oldest first.
	fn events_for_user_since(
		&self,
		user_id: u64,
		since_ms: u64,
	) -> Result<Vec<InteractionEvent>, EngineError>;

	/// Every event with `timestamp >= since_ms`, across all users.
	fn events_since(&self, since_ms: u64) -> Result<Vec<InteractionEvent>, EngineError>;

	/// Distinct user ids in first-seen order.
	fn user_ids(&self) -> Result<Vec<u64>, EngineError>;
}

// ---------------------------------------------------------------------------
// In-memory catalog
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryCatalog {
	books: RwLock<Vec<BookRecord>>,
}

impl MemoryCatalog {
	pub fn new() -> Self {
		Self::default()
	}

	/// Insert or replace a book, keyed by id.
	pub fn upsert(&self, book: BookRecord) {
		let mut books = self.books.write().unwrap_or_else(|e| e.into_inner());
		match books.iter_mut().find(|b| b.id == book.id) {
			Some(existing) => *existing = book,
			None => books.push(book),
		}
	}

	pub fn len(&self) -> usize {
		self.books.read().unwrap_or_else(|e| e.into_inner()).len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

/// Result cap applied when a query carries no explicit limit.
pub const DEFAULT_SEARCH_LIMIT: usize = 20;

fn matches_text(book: &BookRecord, needle: &str) -> bool {
	book.title.to_lowercase().contains(needle)
		|| book.description.to_lowercase().contains(needle)
		|| book.authors.to_lowercase().contains(needle)
}

impl Catalog for MemoryCatalog {
	fn search(&self, query: &CatalogQuery) -> Result<Vec<BookRecord>, EngineError> {
		let books = self.books.read().unwrap_or_else(|e| e.into_inner());
		let text = query.text.trim().to_lowercase();
		let author = query.author.as_ref().map(|a| a.to_lowercase());
		let category = query.category.as_ref().map(|c| c.to_lowercase());
		let limit = if query.limit == 0 {
			DEFAULT_SEARCH_LIMIT
		} else {
			query.limit
		};

		let mut out = Vec::new();
		for book in books.iter() {
			if !text.is_empty() && !matches_text(book, &text) {
				continue;
			}
			if let Some(ref needle) = author {
				if !book.authors.to_lowercase().contains(needle) {
					continue;
				}
			}
			if let Some(ref needle) = category {
				if !book.categories.to_lowercase().contains(needle) {
					continue;
				}
			}
			if let Some(ref language) = query.language {
				if book.language.as_deref() != Some(language.as_str()) {
					continue;
				}
			}
			out.push(book.clone());
			if out.len() >= limit {
				break;
			}
		}
		Ok(out)
	}

	fn get(&self, book_id: &str) -> Result<Option<BookRecord>, EngineError> {
		let books = self.books.read().unwrap_or_else(|e| e.into_inner());
		Ok(books.iter().find(|b| b.id == book_id).cloned())
	}
}

// ---------------------------------------------------------------------------
// In-memory event store
// ---------------------------------------------------------------------------

#[derive(Default)]
struct EventLog {
	events: Vec<InteractionEvent>,
	user_order: Vec<u64>,
	by_user: HashMap<u64, Vec<usize>>,
}

#[derive(Default)]
pub struct MemoryEventStore {
	log: RwLock<EventLog>,
}

impl MemoryEventStore {
	pub fn new() -> Self {
		Self::default()
	}
}

impl EventStore for MemoryEventStore {
	fn record(&self, event: InteractionEvent) -> Result<(), EngineError> {
		let mut log = self.log.write().unwrap_or_else(|e| e.into_inner());
		let user_id = event.user_id;
		let index = log.events.len();
		log.events.push(event);
		if !log.by_user.contains_key(&user_id) {
			log.user_order.push(user_id);
		}
		log.by_user.entry(user_id).or_default().push(index);
		Ok(())
	}

	fn events_for_user(&self, user_id: u64) -> Result<Vec<InteractionEvent>, EngineError> {
		let log = self.log.read().unwrap_or_else(|e| e.into_inner());
		Ok(log
			.by_user
			.get(&user_id)
			.map(|idx| idx.iter().map(|&i| log.events[i].clone()).collect())
			.unwrap_or_default())
	}

	fn events_for_user_since(
		&self,
		user_id: u64,
		since_ms: u64,
	) -> Result<Vec<InteractionEvent>, EngineError> {
		let log = self.log.read().unwrap_or_else(|e| e.into_inner());
		Ok(log
			.by_user
			.get(&user_id)
			.map(|idx| {
				idx.iter()
					.map(|&i| &log.events[i])
					.filter(|e| e.timestamp >= since_ms)
					.cloned()
					.collect()
			})
			.unwrap_or_default())
	}

	fn events_since(&self, since_ms: u64) -> Result<Vec<InteractionEvent>, EngineError> {
		let log = self.log.read().unwrap_or_else(|e| e.into_inner());
		Ok(log
			.events
			.iter()
			.filter(|e| e.timestamp >= since_ms)
			.cloned()
			.collect())
	}

	fn user_ids(&self) -> Result<Vec<u64>, EngineError> {
		let log = self.log.read().unwrap_or_else(|e| e.into_inner());
		Ok(log.user_order.clone())
	}
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::EventKind;

	fn book(id: &str, title: &str, author: &str, category: &str, language: &str) -> BookRecord {
		BookRecord {
			id: id.to_string(),
			title: title.to_string(),
			authors: author.to_string(),
			categories: category.to_string(),
			language: Some(language.to_string()),
			..Default::default()
		}
	}

	#[test]
	fn catalog_upsert_replaces_by_id() {
		let catalog = MemoryCatalog::new();
		catalog.upsert(book("b1", "1984", "George Orwell", "Roman", "en"));
		catalog.upsert(book("b1", "Nineteen Eighty-Four", "George Orwell", "Roman", "en"));
		assert_eq!(catalog.len(), 1);
		let found = catalog.get("b1").unwrap().unwrap();
		assert_eq!(found.title, "Nineteen Eighty-Four");
	}

	#[test]
	fn catalog_search_filters_combine() {
		let catalog = MemoryCatalog::new();
		catalog.upsert(book("b1", "1984", "George Orwell", "Roman", "en"));
		catalog.upsert(book("b2", "Hayvan Çiftliği", "George Orwell", "Roman", "tr"));
		catalog.upsert(book("b3", "Dune", "Frank Herbert", "Bilim kurgu", "en"));

		let query = CatalogQuery {
			author: Some("orwell".to_string()),
			language: Some("en".to_string()),
			..CatalogQuery::default()
		};
		let hits = catalog.search(&query).unwrap();
		assert_eq!(hits.len(), 1);
		assert_eq!(hits[0].id, "b1");
	}

	#[test]
	fn catalog_search_respects_limit() {
		let catalog = MemoryCatalog::new();
		for i in 0..10 {
			catalog.upsert(book(&format!("b{i}"), "Dune", "Frank Herbert", "Bilim kurgu", "en"));
		}
		let query = CatalogQuery {
			text: "dune".to_string(),
			limit: 3,
			..CatalogQuery::default()
		};
		assert_eq!(catalog.search(&query).unwrap().len(), 3);
	}

	#[test]
	fn event_store_orders_by_user_first_seen() {
		let store = MemoryEventStore::new();
		let b = book("b1", "Dune", "Frank Herbert", "Bilim kurgu", "en");
		store
			.record(InteractionEvent::new(7, EventKind::View, 100).with_book(b.clone()))
			.unwrap();
		store
			.record(InteractionEvent::new(3, EventKind::View, 200).with_book(b.clone()))
			.unwrap();
		store
			.record(InteractionEvent::new(7, EventKind::Favorite, 300).with_book(b))
			.unwrap();

		assert_eq!(store.user_ids().unwrap(), vec![7, 3]);
		assert_eq!(store.events_for_user(7).unwrap().len(), 2);
	}

	#[test]
	fn event_store_since_filters_by_timestamp() {
		let store = MemoryEventStore::new();
		let b = book("b1", "Dune", "Frank Herbert", "Bilim kurgu", "en");
		for ts in [100, 200, 300] {
			store
				.record(InteractionEvent::new(1, EventKind::View, ts).with_book(b.clone()))
				.unwrap();
		}
		assert_eq!(store.events_for_user_since(1, 200).unwrap().len(), 2);
		assert_eq!(store.events_since(301).unwrap().len(), 0);
	}
}
