// ---------------------------------------------------------------------------
// DiscoveryServer — JSON-RPC dispatcher
// ---------------------------------------------------------------------------
//
// Routes incoming JSON-RPC 2.0 requests (NDJSON over stdin) to the
// DiscoveryEngine: a main `run()` loop, a `dispatch()` match and
// free-standing handler functions for each method.
// ---------------------------------------------------------------------------

use std::io::{self, BufRead};
use std::sync::Arc;

use serde::Deserialize;

use crate::cache::MemoryCache;
use crate::engine::DiscoveryEngine;
use crate::error::EngineError;
use crate::protocol::*;
use crate::sources::{MemoryCatalog, MemoryEventStore};
use crate::transport::NdjsonTransport;
use crate::types::{BookRecord, EventKind, InteractionEvent, RecKind};

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

pub struct DiscoveryServer {
	transport: NdjsonTransport,
	engine: DiscoveryEngine,
	catalog: Arc<MemoryCatalog>,
}

impl DiscoveryServer {
	/// Create a server over in-memory collaborators.
	pub fn new(transport: NdjsonTransport) -> Self {
		let catalog = Arc::new(MemoryCatalog::new());
		let events = Arc::new(MemoryEventStore::new());
		let cache = Arc::new(MemoryCache::new());
		let engine = DiscoveryEngine::new(catalog.clone(), events, cache);
		Self {
			transport,
			engine,
			catalog,
		}
	}

	/// Main loop: read JSON-RPC messages from stdin, dispatch to handlers.
	pub fn run(&mut self) -> Result<(), EngineError> {
		let stdin = io::stdin();
		let reader = stdin.lock();

		for line_result in reader.lines() {
			let line = line_result?;
			if line.trim().is_empty() {
				continue;
			}

			let request: JsonRpcRequest = match serde_json::from_str(&line) {
				Ok(r) => r,
				Err(e) => {
					tracing::error!("Failed to parse request: {}", e);
					continue;
				}
			};

			self.dispatch(request);
		}

		Ok(())
	}

	fn dispatch(&mut self, req: JsonRpcRequest) {
		let id = req.id;
		let result = match req.method.as_str() {
			"catalog/add" => handle_catalog_add(&self.catalog, req.params),
			"events/record" => handle_record_event(&self.engine, req.params),
			"query/interpret" => handle_interpret(&self.engine, req.params),
			"recommend/generate" => handle_recommend(&self.engine, req.params),
			"similarity/compute" => handle_similarity(&self.engine, req.params),

			_ => {
				self.transport.write_error(
					id,
					METHOD_NOT_FOUND,
					format!("Unknown method: {}", req.method),
					None,
				);
				return;
			}
		};

		match result {
			Ok(value) => self.transport.write_response(id, value),
			Err(e) => {
				let code = match e {
					EngineError::InvalidParams(_) => INVALID_PARAMS,
					_ => ENGINE_ERROR,
				};
				self.transport
					.write_error(id, code, e.to_string(), Some(e.to_json_rpc_error()));
			}
		}
	}
}

// ---------------------------------------------------------------------------
// Param types
// ---------------------------------------------------------------------------

fn parse_params<T: serde::de::DeserializeOwned>(
	params: serde_json::Value,
) -> Result<T, EngineError> {
	serde_json::from_value(params).map_err(|e| EngineError::InvalidParams(e.to_string()))
}

#[derive(Debug, Deserialize)]
struct CatalogAddParams {
	#[serde(default)]
	book: Option<BookRecord>,
	#[serde(default)]
	books: Vec<BookRecord>,
}

#[derive(Debug, Deserialize)]
struct RecordEventParams {
	user_id: u64,
	kind: EventKind,
	#[serde(default)]
	book: Option<BookRecord>,
	#[serde(default)]
	rating: Option<f64>,
	#[serde(default)]
	query: Option<String>,
	#[serde(default)]
	timestamp: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct InterpretParams {
	query: String,
	#[serde(default)]
	user_id: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RecommendParams {
	user_id: u64,
	#[serde(default)]
	kind: Option<RecKind>,
	#[serde(default)]
	limit: usize,
	#[serde(default)]
	refresh: bool,
}

#[derive(Debug, Deserialize)]
struct SimilarityParams {
	user_a: u64,
	#[serde(default)]
	user_b: Option<u64>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn handle_catalog_add(
	catalog: &MemoryCatalog,
	params: serde_json::Value,
) -> Result<serde_json::Value, EngineError> {
	let p: CatalogAddParams = parse_params(params)?;
	let mut count = 0usize;
	for book in p.book.into_iter().chain(p.books) {
		catalog.upsert(book);
		count += 1;
	}
	Ok(serde_json::json!({ "added": count, "total": catalog.len() }))
}

fn handle_record_event(
	engine: &DiscoveryEngine,
	params: serde_json::Value,
) -> Result<serde_json::Value, EngineError> {
	let p: RecordEventParams = parse_params(params)?;
	let timestamp = p.timestamp.unwrap_or_else(crate::types::current_timestamp_ms);
	let mut event = InteractionEvent::new(p.user_id, p.kind, timestamp);
	if let Some(book) = p.book {
		event = event.with_book(book);
	}
	if let Some(rating) = p.rating {
		event = event.with_rating(rating);
	}
	if let Some(query) = p.query {
		event = event.with_query(query);
	}
	let weight = event.weight;
	engine.record_event(event)?;
	Ok(serde_json::json!({ "recorded": true, "weight": weight }))
}

fn handle_interpret(
	engine: &DiscoveryEngine,
	params: serde_json::Value,
) -> Result<serde_json::Value, EngineError> {
	let p: InterpretParams = parse_params(params)?;
	let interpretation = engine.interpret(&p.query, p.user_id)?;
	serde_json::to_value(&interpretation)
		.map_err(|e| EngineError::Serialization(e.to_string()))
}

fn handle_recommend(
	engine: &DiscoveryEngine,
	params: serde_json::Value,
) -> Result<serde_json::Value, EngineError> {
	let p: RecommendParams = parse_params(params)?;
	let kind = p.kind.unwrap_or(RecKind::Hybrid);
	let recommendations = engine.recommend(p.user_id, kind, p.limit, p.refresh)?;
	let count = recommendations.len();
	Ok(serde_json::json!({
		"recommendations": recommendations,
		"count": count,
		"kind": kind.as_str(),
	}))
}

fn handle_similarity(
	engine: &DiscoveryEngine,
	params: serde_json::Value,
) -> Result<serde_json::Value, EngineError> {
	let p: SimilarityParams = parse_params(params)?;
	match p.user_b {
		Some(user_b) => {
			let similarity = engine.similarity(p.user_a, user_b)?;
			Ok(serde_json::json!({ "similarity": similarity }))
		}
		None => {
			let neighbors = engine.similar_users(p.user_a)?;
			Ok(serde_json::json!({ "neighbors": neighbors }))
		}
	}
}
