//! Scene model for the transaction globe.
//!
//! Turns transactions into short-lived glowing arcs over a sphere.
//!
//! # Features
//! - Spherical projection: lat/lng onto a sphere of fixed radius
//! - Arc geometry: bulging Bézier path wrapped in a tube mesh
//! - Bounded pool: at most 50 arcs, oldest evicted first
//! - Pulse animation: opacity rises and falls over each arc's lifetime

pub mod animation;
pub mod arc;
pub mod error;
pub mod pool;
pub mod visualizer;

pub use animation::{opacity, ARC_DURATION};
pub use arc::{ArcPath, ArcVertex, TubeMesh};
pub use error::GeometryError;
pub use pool::{ActiveArc, ArcId, ArcPool, MAX_ACTIVE_ARCS};
pub use visualizer::{SceneConfig, SceneStats, TickSummary, Visualizer};

use globe_stream::GeoPoint;
use glam::Vec3;

/// Globe radius in world units.
pub const EARTH_RADIUS: f32 = 100.0;

/// Base arc colour (RGB).
pub const ARC_COLOR: u32 = 0xff6b00;

/// Glow colour blended in at grazing angles (RGB).
pub const GLOW_COLOR: u32 = 0xff9500;

/// Convert a geographic point to world space on a sphere of `radius`.
///
/// Latitude is measured from the equator and longitude from the reference
/// meridian offset by 180°, so (0, 0) lands on +X and the poles on ±Y.
#[inline]
pub fn lat_lng_to_world(point: GeoPoint, radius: f32) -> Vec3 {
    let phi = (90.0 - point.lat).to_radians();
    let theta = (point.lng + 180.0).to_radians();
    let r = radius as f64;

    Vec3::new(
        (-r * phi.sin() * theta.cos()) as f32,
        (r * phi.cos()) as f32,
        (r * phi.sin() * theta.sin()) as f32,
    )
}

/// Format an RGB colour as a CSS hex string.
pub fn css_color(rgb: u32) -> String {
    format!("#{:06x}", rgb & 0x00ff_ffff)
}
