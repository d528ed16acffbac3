//! Error types for globe-scene.

use thiserror::Error;

/// Result type for geometry construction.
pub type Result<T> = std::result::Result<T, GeometryError>;

/// Reasons an arc cannot be built from a pair of points.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    /// Input coordinates contain NaN or infinity
    #[error("non-finite coordinate")]
    NonFinite,

    /// Start and end are the same point
    #[error("arc endpoints coincide")]
    Coincident,

    /// Endpoints are opposite each other, so the bulge direction is undefined
    #[error("arc endpoints are antipodal")]
    Antipodal,

    /// Path has fewer than two samples or a zero-length tangent
    #[error("degenerate path: {0}")]
    Degenerate(&'static str),
}
