//! Application configuration.

use crate::error::{Error, Result};
use globe_scene::SceneConfig;
use globe_stream::StreamConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Default HTTP listen address for the render surface.
pub const DEFAULT_HTTP_ADDR: &str = "127.0.0.1:3000";

/// Default globe texture location.
pub const DEFAULT_TEXTURE_PATH: &str = "assets/earth-4k.jpg";

/// Scene tick rate.
pub const FRAME_INTERVAL: Duration = Duration::from_micros(16_667);

/// Diagnostic lines kept for `/api/debug`.
pub const DIAGNOSTICS_CAPACITY: usize = 100;

/// Configuration for the globe application.
#[derive(Debug, Clone)]
pub struct VisConfig {
    /// HTTP + WebSocket listen address
    pub http_addr: SocketAddr,

    /// Globe surface texture
    pub texture_path: PathBuf,

    /// Transaction feed
    pub stream: StreamConfig,

    /// Arc geometry and animation
    pub scene: SceneConfig,

    /// Time between scene ticks
    pub frame_interval: Duration,

    /// Diagnostic ring size
    pub diagnostics_capacity: usize,
}

impl Default for VisConfig {
    fn default() -> Self {
        Self {
            http_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            texture_path: PathBuf::from(DEFAULT_TEXTURE_PATH),
            stream: StreamConfig::default(),
            scene: SceneConfig::default(),
            frame_interval: FRAME_INTERVAL,
            diagnostics_capacity: DIAGNOSTICS_CAPACITY,
        }
    }
}

impl VisConfig {
    /// Defaults overridden by `GLOBE_HTTP_ADDR`, `GLOBE_TEXTURE` and
    /// `GLOBE_STREAM_URL`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(addr) = lookup("GLOBE_HTTP_ADDR") {
            config.http_addr = addr
                .parse()
                .map_err(|e| Error::Config(format!("Invalid GLOBE_HTTP_ADDR '{}': {}", addr, e)))?;
        }

        if let Some(path) = lookup("GLOBE_TEXTURE") {
            config.texture_path = PathBuf::from(path);
        }

        if let Some(url) = lookup("GLOBE_STREAM_URL") {
            let url = url.trim().to_string();
            if !(url.starts_with("ws://") || url.starts_with("wss://")) {
                return Err(Error::Config(format!(
                    "GLOBE_STREAM_URL must be a ws:// or wss:// URL, got '{}'",
                    url
                )));
            }
            config.stream.url = url;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_constants() {
        let config = VisConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.http_addr.to_string(), DEFAULT_HTTP_ADDR);
        assert_eq!(config.stream.url, globe_stream::DEFAULT_STREAM_URL);
        assert_eq!(config.stream.max_attempts, 5);
        assert_eq!(config.scene.max_arcs, 50);
        assert_eq!(config.scene.arc_duration, Duration::from_millis(2000));
    }

    #[test]
    fn env_overrides() {
        let config = VisConfig::from_lookup(lookup(&[
            ("GLOBE_HTTP_ADDR", "0.0.0.0:8080"),
            ("GLOBE_TEXTURE", "/tmp/earth.png"),
            ("GLOBE_STREAM_URL", "ws://localhost:9000/inv"),
        ]))
        .unwrap();
        assert_eq!(config.http_addr.port(), 8080);
        assert_eq!(config.texture_path, PathBuf::from("/tmp/earth.png"));
        assert_eq!(config.stream.url, "ws://localhost:9000/inv");
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(matches!(
            VisConfig::from_lookup(lookup(&[("GLOBE_HTTP_ADDR", "nope")])),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            VisConfig::from_lookup(lookup(&[("GLOBE_STREAM_URL", "http://x")])),
            Err(Error::Config(_))
        ));
    }
}
