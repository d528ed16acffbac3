//! Scene frames published to the render surface.

use crate::readiness::Phase;
use globe_scene::{ArcId, SceneStats, TubeMesh, Visualizer};
use globe_stream::{ConnectionState, SATOSHIS_PER_BTC};
use serde::Serialize;
use std::sync::Arc;

/// One arc as seen by a renderer.
#[derive(Debug, Clone, Serialize)]
pub struct ArcFrame {
    pub id: ArcId,
    pub hash: String,
    pub value: u64,
    pub value_btc: f64,
    pub opacity: f32,
    /// Sent once per arc, not with every frame
    #[serde(skip)]
    pub mesh: Arc<TubeMesh>,
}

/// The whole scene at one tick.
#[derive(Debug, Clone, Serialize)]
pub struct SceneFrame {
    pub frame: u64,
    #[serde(flatten)]
    pub phase: Phase,
    pub connection: ConnectionState,
    pub arcs: Vec<ArcFrame>,
    pub stats: SceneStats,
}

impl SceneFrame {
    /// Frame shown before the first tick.
    pub fn initial() -> Self {
        Self {
            frame: 0,
            phase: Phase::Loading { progress: 0 },
            connection: ConnectionState::Idle,
            arcs: Vec::new(),
            stats: SceneStats::default(),
        }
    }

    /// Capture the visualizer's current arcs.
    pub fn capture(frame: u64, visualizer: &Visualizer, phase: Phase, connection: ConnectionState) -> Self {
        let arcs = visualizer
            .arcs()
            .map(|arc| ArcFrame {
                id: arc.id,
                hash: arc.hash.clone(),
                value: arc.value,
                value_btc: arc.value as f64 / SATOSHIS_PER_BTC,
                opacity: arc.opacity,
                mesh: arc.mesh.clone(),
            })
            .collect();

        Self {
            frame,
            phase,
            connection,
            arcs,
            stats: visualizer.stats(),
        }
    }

    pub fn arc_ids(&self) -> impl Iterator<Item = ArcId> + '_ {
        self.arcs.iter().map(|a| a.id)
    }
}
