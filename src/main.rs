use hashkv::{server, CommandContext, Config, Dispatcher};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG controls verbosity, info by default
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("hashkv starting...");

    let config = Config::load()?;
    info!(
        shards = config.shards,
        backend = config.backend.name(),
        strict_increment_delta = config.strict_increment_delta,
        "configuration loaded"
    );

    let dispatcher = Arc::new(Dispatcher::new(CommandContext::from_config(&config)));
    server::run(&config.bind, dispatcher).await
}
