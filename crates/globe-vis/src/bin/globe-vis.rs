//! Transaction Globe server
//!
//! Streams unconfirmed Bitcoin transactions and serves the globe page.
//!
//! Environment:
//! - `GLOBE_HTTP_ADDR`: listen address (default 127.0.0.1:3000)
//! - `GLOBE_TEXTURE`: globe texture path (default assets/earth-4k.jpg)
//! - `GLOBE_STREAM_URL`: transaction feed (default wss://ws.blockchain.info/inv)
//! - `RUST_LOG`: log filter

use globe_vis::{GlobeApp, VisConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "globe_vis=info,globe_stream=info,globe_scene=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = VisConfig::from_env()?;

    tracing::info!("Transaction Globe");
    tracing::info!("Feed: {}", config.stream.url);
    tracing::info!("Texture: {}", config.texture_path.display());
    tracing::info!("Open http://{} in a browser", config.http_addr);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    GlobeApp::new(config).run(shutdown).await?;

    Ok(())
}
