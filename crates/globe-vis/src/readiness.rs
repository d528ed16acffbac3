//! Asset and stream readiness, combined into one display phase.
//!
//! The globe texture and the transaction stream come up independently.
//! Neither waits on the other; the gate decides what the page shows and
//! whether transactions reach the visualizer.

use globe_stream::ConnectionState;
use serde::Serialize;

/// Progress of the globe texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetState {
    /// Still loading, percent complete
    Pending { progress: u8 },
    /// Loaded and being served
    Ready,
    /// Could not be loaded; terminal
    Failed(String),
}

/// What the render surface should show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum Phase {
    /// Texture still loading
    Loading { progress: u8 },
    /// Texture ready, stream not (yet) connected
    Connecting,
    /// Texture ready and stream connected
    Live,
    /// Texture ready, stream gave up reconnecting
    Offline,
    /// Texture failed; nothing else will happen
    Failed { message: String },
}

/// Combines the two readiness signals.
#[derive(Debug, Clone)]
pub struct ReadinessGate {
    asset: AssetState,
    stream: ConnectionState,
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self {
            asset: AssetState::Pending { progress: 0 },
            stream: ConnectionState::Idle,
        }
    }
}

impl ReadinessGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record texture load progress. Ignored once loading has finished.
    pub fn asset_progress(&mut self, progress: u8) {
        if let AssetState::Pending { .. } = self.asset {
            self.asset = AssetState::Pending {
                progress: progress.min(100),
            };
        }
    }

    pub fn asset_ready(&mut self) {
        if !self.is_failed() {
            self.asset = AssetState::Ready;
        }
    }

    pub fn asset_failed(&mut self, message: impl Into<String>) {
        self.asset = AssetState::Failed(message.into());
    }

    /// Record the stream client's latest state.
    pub fn stream_changed(&mut self, state: ConnectionState) {
        self.stream = state;
    }

    pub fn asset(&self) -> &AssetState {
        &self.asset
    }

    pub fn stream(&self) -> ConnectionState {
        self.stream
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.asset, AssetState::Failed(_))
    }

    /// Transactions are only visualized once the globe can be drawn.
    pub fn accepts_events(&self) -> bool {
        self.asset == AssetState::Ready
    }

    pub fn phase(&self) -> Phase {
        match &self.asset {
            AssetState::Failed(message) => Phase::Failed {
                message: message.clone(),
            },
            AssetState::Pending { progress } => Phase::Loading {
                progress: *progress,
            },
            AssetState::Ready => match self.stream {
                ConnectionState::Connected => Phase::Live,
                ConnectionState::PermanentlyStopped => Phase::Offline,
                _ => Phase::Connecting,
            },
        }
    }
}
