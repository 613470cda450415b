use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
	#[error("Empty query: search text cannot be empty")]
	QueryEmpty,
	#[error("Query too short: at least 3 characters required")]
	QueryTooShort,
	#[error("Query too long: at most 500 characters allowed")]
	QueryTooLong,
	#[error("Invalid user id: a positive user id is required")]
	InvalidUser,
	#[error("Invalid params: {0}")]
	InvalidParams(String),
	#[error("Source failure: {0}")]
	Source(String),
	#[error("Serialization error: {0}")]
	Serialization(String),
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
}

impl EngineError {
	pub fn code(&self) -> &str {
		match self {
			Self::QueryEmpty => "QUERY_EMPTY",
			Self::QueryTooShort => "QUERY_TOO_SHORT",
			Self::QueryTooLong => "QUERY_TOO_LONG",
			Self::InvalidUser => "INVALID_USER",
			Self::InvalidParams(_) => "INVALID_PARAMS",
			Self::Source(_) => "SOURCE_FAILURE",
			Self::Serialization(_) => "SERIALIZATION",
			Self::Io(_) => "IO",
		}
	}

	pub fn to_json_rpc_error(&self) -> serde_json::Value {
		serde_json::json!({
			"engineCode": self.code(),
			"message": self.to_string(),
		})
	}
}
