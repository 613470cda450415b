pub mod blend;
pub mod cache;
pub mod config;
pub mod cosine;
pub mod engine;
pub mod error;
pub mod extract;
pub mod interpret;
pub mod lexicon;
pub mod profile;
pub mod protocol;
pub mod recommend;
pub mod server;
pub mod similarity;
pub mod sources;
pub mod text_match;
pub mod transport;
pub mod types;
