//! Transaction → arc pipeline.
//!
//! The visualizer owns the arc pool and is the only thing that mutates it.
//! It has no clock of its own: callers pass `now` to both
//! [`Visualizer::on_event`] and the per-frame [`Visualizer::tick`].

use crate::arc::{ArcPath, TubeMesh};
use crate::error::Result;
use crate::pool::{ActiveArc, ArcId, ArcPool, MAX_ACTIVE_ARCS};
use crate::{animation, lat_lng_to_world, EARTH_RADIUS};
use globe_stream::Transaction;
use serde::Serialize;
use std::time::{Duration, Instant};

/// Scene constants.
#[derive(Debug, Clone)]
pub struct SceneConfig {
    /// Globe radius in world units
    pub radius: f32,
    /// Maximum arcs alive at once
    pub max_arcs: usize,
    /// Lifetime of each arc
    pub arc_duration: Duration,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            radius: EARTH_RADIUS,
            max_arcs: MAX_ACTIVE_ARCS,
            arc_duration: animation::ARC_DURATION,
        }
    }
}

/// Running totals.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SceneStats {
    /// Transactions handed to the visualizer
    pub events_received: u64,
    /// Arcs successfully built
    pub arcs_created: u64,
    /// Arcs pushed out by capacity
    pub arcs_evicted: u64,
    /// Arcs that ran their full lifetime
    pub arcs_expired: u64,
    /// Transactions whose geometry could not be built
    pub geometry_failures: u64,
}

/// Outcome of one frame tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub expired: Vec<ArcId>,
    pub active: usize,
}

/// Builds arcs from transactions and animates them.
#[derive(Debug)]
pub struct Visualizer {
    config: SceneConfig,
    pool: ArcPool,
    stats: SceneStats,
    next_id: u64,
}

impl Default for Visualizer {
    fn default() -> Self {
        Self::new(SceneConfig::default())
    }
}

impl Visualizer {
    pub fn new(config: SceneConfig) -> Self {
        let pool = ArcPool::new(config.max_arcs);
        Self {
            config,
            pool,
            stats: SceneStats::default(),
            next_id: 0,
        }
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// Turn a transaction into an arc.
    ///
    /// Geometry failures skip this transaction only; they are counted and
    /// logged, never propagated.
    pub fn on_event(&mut self, tx: &Transaction, now: Instant) -> Option<ArcId> {
        self.stats.events_received += 1;

        let mesh = match self.build_mesh(tx) {
            Ok(mesh) => mesh,
            Err(e) => {
                self.stats.geometry_failures += 1;
                tracing::warn!("Skipping arc for {}: {}", tx.hash, e);
                return None;
            }
        };

        let id = ArcId(self.next_id);
        self.next_id += 1;

        let arc = ActiveArc::new(id, tx.hash.clone(), tx.value, mesh, now);
        if let Some(evicted) = self.pool.insert(arc) {
            self.stats.arcs_evicted += 1;
            tracing::trace!("Evicted arc {:?} ({})", evicted.id, evicted.hash);
        }
        self.stats.arcs_created += 1;

        tracing::debug!(
            "New transaction arc {:?} for {} ({} active)",
            id,
            tx.hash,
            self.pool.len()
        );
        Some(id)
    }

    fn build_mesh(&self, tx: &Transaction) -> Result<TubeMesh> {
        let start = lat_lng_to_world(tx.origin, self.config.radius);
        let end = lat_lng_to_world(tx.destination, self.config.radius);
        let path = ArcPath::between(start, end, self.config.radius)?;
        TubeMesh::for_path(&path)
    }

    /// Advance every arc's animation to `now`, removing finished ones.
    pub fn tick(&mut self, now: Instant) -> TickSummary {
        let expired = self.pool.tick(now, self.config.arc_duration);
        self.stats.arcs_expired += expired.len() as u64;

        TickSummary {
            expired: expired.into_iter().map(|a| a.id).collect(),
            active: self.pool.len(),
        }
    }

    /// Drop all arcs, e.g. on teardown.
    pub fn clear(&mut self) {
        self.pool.clear();
    }

    /// Live arcs, oldest first.
    pub fn arcs(&self) -> impl Iterator<Item = &ActiveArc> {
        self.pool.iter()
    }

    pub fn active_count(&self) -> usize {
        self.pool.len()
    }

    pub fn stats(&self) -> SceneStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use globe_stream::GeoPoint;
    use std::time::SystemTime;

    fn tx(hash: &str, origin: GeoPoint, destination: GeoPoint) -> Transaction {
        Transaction {
            hash: hash.into(),
            value: 2000,
            received_at: SystemTime::now(),
            origin,
            destination,
        }
    }

    fn valid_tx(n: u64) -> Transaction {
        // Spread endpoints so no pair is coincident or antipodal
        let lng = (n % 300) as f64 - 150.0;
        tx(
            &format!("tx{}", n),
            GeoPoint::new(10.0, lng),
            GeoPoint::new(-20.0, lng + 25.0),
        )
    }

    #[test]
    fn event_creates_arc() {
        let mut vis = Visualizer::default();
        let id = vis.on_event(&valid_tx(1), Instant::now());
        assert_eq!(id, Some(ArcId(0)));
        assert_eq!(vis.active_count(), 1);

        let arc = vis.arcs().next().unwrap();
        assert_eq!(arc.hash, "tx1");
        assert_eq!(arc.value, 2000);
        assert!(arc.mesh.vertex_count() > 0);
    }

    #[test]
    fn pool_is_bounded_fifo() {
        let now = Instant::now();
        let mut vis = Visualizer::default();
        for n in 0..120 {
            vis.on_event(&valid_tx(n), now);
            assert!(vis.active_count() <= MAX_ACTIVE_ARCS);
        }

        let first = vis.arcs().next().unwrap().id;
        assert_eq!(first, ArcId(70));

        let stats = vis.stats();
        assert_eq!(stats.arcs_created, 120);
        assert_eq!(stats.arcs_evicted, 70);
    }

    #[test]
    fn degenerate_event_is_skipped() {
        let mut vis = Visualizer::default();
        let now = Instant::now();
        vis.on_event(&valid_tx(1), now);

        let p = GeoPoint::new(5.0, 5.0);
        assert!(vis.on_event(&tx("same", p, p), now).is_none());
        assert!(vis
            .on_event(&tx("opposite", GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 180.0)), now)
            .is_none());

        assert_eq!(vis.active_count(), 1);
        assert_eq!(vis.stats().geometry_failures, 2);
        assert_eq!(vis.stats().events_received, 3);

        // Later events still work
        assert!(vis.on_event(&valid_tx(2), now).is_some());
        assert_eq!(vis.active_count(), 2);
    }

    #[test]
    fn duplicate_hashes_make_independent_arcs() {
        let mut vis = Visualizer::default();
        let now = Instant::now();
        let a = vis.on_event(&valid_tx(7), now);
        let b = vis.on_event(&valid_tx(7), now);
        assert_ne!(a, b);
        assert_eq!(vis.active_count(), 2);
    }

    #[test]
    fn tick_expires_at_duration_not_before() {
        let start = Instant::now();
        let mut vis = Visualizer::default();
        let id = vis.on_event(&valid_tx(1), start).unwrap();

        let summary = vis.tick(start + Duration::from_millis(1999));
        assert!(summary.expired.is_empty());
        assert_eq!(summary.active, 1);

        let summary = vis.tick(start + Duration::from_millis(2000));
        assert_eq!(summary.expired, vec![id]);
        assert_eq!(summary.active, 0);
        assert_eq!(vis.stats().arcs_expired, 1);
    }

    #[test]
    fn clear_empties_scene() {
        let mut vis = Visualizer::default();
        vis.on_event(&valid_tx(1), Instant::now());
        vis.clear();
        assert_eq!(vis.active_count(), 0);
    }
}
