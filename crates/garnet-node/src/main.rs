//! Garnet node binary
//!
//! An IRC services companion that parks invite-exception bans for group
//! contacts across a pool of capacity-limited ban channels.

use garnet_node::{Node, NodeConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "garnet_node=info,garnet_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("starting garnet node");

    let config = match std::env::args().nth(1) {
        Some(path) => NodeConfig::load(path)?,
        None => NodeConfig::from_env()?,
    };

    Node::new(config).run().await?;
    Ok(())
}
