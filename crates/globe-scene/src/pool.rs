//! Bounded FIFO set of live arcs.

use crate::animation;
use crate::arc::TubeMesh;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Arcs kept on screen at once.
pub const MAX_ACTIVE_ARCS: usize = 50;

/// Identifier for an arc, unique for the lifetime of a visualizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ArcId(pub u64);

/// A transaction arc currently on the globe.
#[derive(Debug, Clone)]
pub struct ActiveArc {
    pub id: ArcId,
    /// Hash of the transaction that spawned it
    pub hash: String,
    /// Transaction value in satoshis
    pub value: u64,
    /// Tube geometry, shared with published frames
    pub mesh: Arc<TubeMesh>,
    /// When the arc was inserted
    pub created: Instant,
    /// Current opacity
    pub opacity: f32,
}

impl ActiveArc {
    pub fn new(id: ArcId, hash: String, value: u64, mesh: TubeMesh, created: Instant) -> Self {
        Self {
            id,
            hash,
            value,
            mesh: Arc::new(mesh),
            created,
            opacity: animation::MIN_OPACITY,
        }
    }

    /// Time alive as of `now`.
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.created)
    }
}

/// Arcs in insertion order, capped at `capacity`.
#[derive(Debug)]
pub struct ArcPool {
    arcs: VecDeque<ActiveArc>,
    capacity: usize,
}

impl Default for ArcPool {
    fn default() -> Self {
        Self::new(MAX_ACTIVE_ARCS)
    }
}

impl ArcPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            arcs: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Insert an arc; if that overflows the pool, evict and return the
    /// oldest one.
    pub fn insert(&mut self, arc: ActiveArc) -> Option<ActiveArc> {
        self.arcs.push_back(arc);
        if self.arcs.len() > self.capacity {
            self.arcs.pop_front()
        } else {
            None
        }
    }

    /// Recompute opacities and drop every arc whose lifetime has elapsed.
    ///
    /// Returns the removed arcs, oldest first.
    pub fn tick(&mut self, now: Instant, duration: Duration) -> Vec<ActiveArc> {
        let mut expired = Vec::new();
        let mut live = VecDeque::with_capacity(self.arcs.len());

        for mut arc in self.arcs.drain(..) {
            let age = arc.age(now);
            if animation::expired(age, duration) {
                expired.push(arc);
            } else {
                arc.opacity = animation::opacity(age, duration);
                live.push_back(arc);
            }
        }

        self.arcs = live;
        expired
    }

    /// Remove everything.
    pub fn clear(&mut self) {
        self.arcs.clear();
    }

    pub fn len(&self) -> usize {
        self.arcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arcs.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Arcs from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &ActiveArc> {
        self.arcs.iter()
    }

    /// The next arc to be evicted.
    pub fn oldest(&self) -> Option<&ActiveArc> {
        self.arcs.front()
    }
}
