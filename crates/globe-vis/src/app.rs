//! Application wiring.
//!
//! ```text
//!  StreamClient ──tx──┐
//!  texture loader ────┼──► scene task (Pipeline) ──watch──► VisServer ──ws──► page
//!  connection state ──┘          ▲
//!                          frame interval
//! ```

use crate::assets::{load_texture, Texture};
use crate::config::VisConfig;
use crate::diagnostics::DiagnosticLog;
use crate::error::Result;
use crate::frame::SceneFrame;
use crate::pipeline::{AssetEvent, Directive, Pipeline};
use crate::server::{AppState, VisServer};
use globe_stream::{StreamClient, Transaction};
use std::future::Future;
use std::time::Instant;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;

/// The running globe.
pub struct GlobeApp {
    config: VisConfig,
}

impl GlobeApp {
    pub fn new(config: VisConfig) -> Self {
        Self { config }
    }

    /// Run until `shutdown` resolves.
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<()> {
        let config = self.config;
        let diagnostics = DiagnosticLog::new(config.diagnostics_capacity);

        let (frame_tx, frame_rx) = watch::channel(SceneFrame::initial());
        let (texture_tx, texture_rx) = watch::channel::<Option<Texture>>(None);

        // Render surface
        let listener = tokio::net::TcpListener::bind(config.http_addr).await?;
        let server = VisServer::new(AppState::new(frame_rx, texture_rx, diagnostics.clone()));
        let server_task = tokio::spawn(async move {
            if let Err(e) = server.serve(listener).await {
                tracing::error!("Server stopped: {}", e);
            }
        });

        // Texture, independent of the stream
        let (asset_tx, mut asset_rx) = mpsc::unbounded_channel();
        let texture_path = config.texture_path.clone();
        let loader_task = tokio::spawn(async move {
            let progress_tx = asset_tx.clone();
            let result = load_texture(&texture_path, move |p| {
                let _ = progress_tx.send(AssetEvent::Progress(p));
            })
            .await;

            match result {
                Ok(texture) => {
                    texture_tx.send_replace(Some(texture));
                    let _ = asset_tx.send(AssetEvent::Ready);
                }
                Err(e) => {
                    let _ = asset_tx.send(AssetEvent::Failed(e.to_string()));
                }
            }
        });

        // Stream, independent of the texture
        let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Transaction>();
        let mut client = StreamClient::new(config.stream.clone());
        client.on_event(move |tx| {
            let _ = event_tx.send(tx);
        });
        let mut connection_rx = client.subscribe_state();
        client.connect();

        let mut pipeline = Pipeline::new(config.scene.clone(), diagnostics.clone());
        let mut interval = tokio::time::interval(config.frame_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                Some(tx) = event_rx.recv() => {
                    pipeline.on_transaction(&tx, Instant::now());
                }
                Some(event) = asset_rx.recv() => {
                    if pipeline.on_asset(event) == Directive::StopStream {
                        client.disconnect();
                    }
                }
                changed = connection_rx.changed() => {
                    if changed.is_ok() {
                        let state = *connection_rx.borrow_and_update();
                        pipeline.on_connection(state);
                    }
                }
                _ = interval.tick() => {
                    frame_tx.send_replace(pipeline.tick(Instant::now()));
                }
                _ = &mut shutdown => {
                    tracing::info!("Shutting down");
                    break;
                }
            }
        }

        client.disconnect();
        pipeline.shutdown();
        loader_task.abort();
        server_task.abort();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn offline_config() -> VisConfig {
        let mut config = VisConfig::default();
        config.http_addr = "127.0.0.1:0".parse().unwrap();
        config.texture_path = "/nonexistent/earth.jpg".into();
        config.stream.url = "ws://127.0.0.1:9/inv".into();
        config.stream.base_delay = Duration::from_millis(1);
        config
    }

    #[tokio::test]
    async fn runs_and_shuts_down_without_network() {
        let app = GlobeApp::new(offline_config());
        let result = app
            .run(tokio::time::sleep(Duration::from_millis(200)))
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn bind_failure_is_reported() {
        let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut config = offline_config();
        config.http_addr = taken.local_addr().unwrap();

        let result = GlobeApp::new(config).run(std::future::pending::<()>()).await;
        assert!(matches!(result, Err(crate::Error::Io(_))));
    }
}
