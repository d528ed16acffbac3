//! Scene pipeline: the single owner of the visualizer.
//!
//! Every input (transactions, texture progress, connection changes, frame
//! ticks) funnels through here on one task, so the arc pool never needs a
//! lock.

use crate::diagnostics::DiagnosticLog;
use crate::frame::SceneFrame;
use crate::readiness::{Phase, ReadinessGate};
use globe_scene::{ArcId, SceneConfig, Visualizer};
use globe_stream::{ConnectionState, Transaction};
use std::time::Instant;

/// Texture loader notifications.
#[derive(Debug, Clone)]
pub enum AssetEvent {
    Progress(u8),
    Ready,
    Failed(String),
}

/// What the caller must do after an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    Continue,
    /// The texture failed; tear the stream down
    StopStream,
}

/// Visualizer plus readiness and diagnostics.
pub struct Pipeline {
    visualizer: Visualizer,
    gate: ReadinessGate,
    diagnostics: DiagnosticLog,
    frame: u64,
    dropped_while_loading: u64,
}

impl Pipeline {
    pub fn new(config: SceneConfig, diagnostics: DiagnosticLog) -> Self {
        Self {
            visualizer: Visualizer::new(config),
            gate: ReadinessGate::new(),
            diagnostics,
            frame: 0,
            dropped_while_loading: 0,
        }
    }

    /// Feed a transaction; ignored until the globe can be drawn.
    pub fn on_transaction(&mut self, tx: &Transaction, now: Instant) -> Option<ArcId> {
        if !self.gate.accepts_events() {
            self.dropped_while_loading += 1;
            tracing::debug!("Globe not ready, dropping {}", tx.hash);
            return None;
        }

        let id = self.visualizer.on_event(tx, now);
        if id.is_none() {
            self.diagnostics
                .record(format!("Error creating arc for {}", tx.hash));
        }
        id
    }

    pub fn on_asset(&mut self, event: AssetEvent) -> Directive {
        match event {
            AssetEvent::Progress(p) => {
                self.gate.asset_progress(p);
                Directive::Continue
            }
            AssetEvent::Ready => {
                self.gate.asset_ready();
                self.diagnostics.record("Globe texture loaded");
                Directive::Continue
            }
            AssetEvent::Failed(message) => {
                self.diagnostics
                    .record(format!("Error loading texture: {}", message));
                self.gate.asset_failed("Failed to load Earth texture");
                self.visualizer.clear();
                Directive::StopStream
            }
        }
    }

    pub fn on_connection(&mut self, state: ConnectionState) {
        if state == self.gate.stream() {
            return;
        }
        self.gate.stream_changed(state);

        match state {
            ConnectionState::Connected => self.diagnostics.record("WebSocket connected"),
            ConnectionState::Reconnecting { attempt, delay_ms } => self
                .diagnostics
                .record(format!("Reconnecting in {} ms (attempt {})", delay_ms, attempt)),
            ConnectionState::PermanentlyStopped => self
                .diagnostics
                .record("Max reconnection attempts reached"),
            ConnectionState::Idle | ConnectionState::Connecting => {}
        }
    }

    /// Advance animation and capture a frame.
    pub fn tick(&mut self, now: Instant) -> SceneFrame {
        self.visualizer.tick(now);
        self.frame += 1;
        SceneFrame::capture(self.frame, &self.visualizer, self.gate.phase(), self.gate.stream())
    }

    pub fn phase(&self) -> Phase {
        self.gate.phase()
    }

    pub fn visualizer(&self) -> &Visualizer {
        &self.visualizer
    }

    pub fn dropped_while_loading(&self) -> u64 {
        self.dropped_while_loading
    }

    /// Final teardown.
    pub fn shutdown(&mut self) {
        self.visualizer.clear();
    }
}
