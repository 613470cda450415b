use clap::Parser;

#[derive(Parser, Debug)]
#[command(
	name = "bookwise-engine",
	about = "Natural-language book search interpretation and blended recommendations over JSON-RPC 2.0 / NDJSON stdio"
)]
pub struct CliArgs {
	/// Server name reported in logs
	#[arg(long, default_value = "bookwise-engine")]
	pub server_name: String,

	/// Server version
	#[arg(long, default_value = env!("CARGO_PKG_VERSION"))]
	pub server_version: String,

	/// Log level (trace, debug, info, warn, error)
	#[arg(long, default_value = "info", env = "BOOKWISE_ENGINE_LOG_LEVEL")]
	pub log_level: String,
}
