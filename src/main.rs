use clap::Parser;

use bookwise_engine::config::CliArgs;
use bookwise_engine::server::DiscoveryServer;
use bookwise_engine::transport::NdjsonTransport;

fn main() {
	let args = CliArgs::parse();

	tracing_subscriber::fmt()
		.with_writer(std::io::stderr)
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(args.log_level.clone())),
		)
		.init();

	let transport = NdjsonTransport::new();
	let mut server = DiscoveryServer::new(transport);

	tracing::info!(
		name = %args.server_name,
		version = %args.server_version,
		"bookwise-engine ready"
	);

	if let Err(e) = server.run() {
		tracing::error!("Server error: {}", e);
		std::process::exit(1);
	}
}
