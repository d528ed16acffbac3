//! Arc geometry: a bulging Bézier path and the tube mesh around it.

use crate::error::{GeometryError, Result};
use glam::{Quat, Vec3};
use serde::Serialize;

/// Samples taken along the Bézier (segments, so `+1` points).
pub const PATH_SEGMENTS: usize = 50;

/// Tube thickness in world units.
pub const TUBE_RADIUS: f32 = 1.0;

/// Vertices around each tube ring.
pub const TUBE_RADIAL_SEGMENTS: usize = 8;

/// Dense samples per output segment when measuring arc length.
const LENGTH_OVERSAMPLE: usize = 16;

/// Endpoints (or a chord midpoint and the centre) closer than this are
/// treated as the same point.
const MIN_CHORD: f32 = 1e-3;

/// Quadratic Bézier from `start` to `end` lifted away from the sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcPath {
    pub start: Vec3,
    pub control: Vec3,
    pub end: Vec3,
}

impl ArcPath {
    /// Build the path between two surface points of a sphere of `radius`.
    ///
    /// The control point sits above the chord midpoint at height
    /// `min(1, chord / 2r) · r`, so the bulge never exceeds one radius.
    pub fn between(start: Vec3, end: Vec3, radius: f32) -> Result<Self> {
        if !start.is_finite() || !end.is_finite() || !radius.is_finite() {
            return Err(GeometryError::NonFinite);
        }

        let chord = start.distance(end);
        if chord < MIN_CHORD {
            return Err(GeometryError::Coincident);
        }

        let height = (chord / (radius * 2.0)).min(1.0) * radius;
        let midpoint = (start + end) * 0.5;
        if midpoint.length() < MIN_CHORD {
            return Err(GeometryError::Antipodal);
        }
        let direction = midpoint.normalize();

        Ok(Self {
            start,
            control: direction * (radius + height),
            end,
        })
    }

    /// Point at parameter `t` in `[0, 1]`.
    pub fn point_at(&self, t: f32) -> Vec3 {
        let u = 1.0 - t;
        self.start * (u * u) + self.control * (2.0 * u * t) + self.end * (t * t)
    }

    /// `segments + 1` evenly spaced samples from start to end.
    pub fn sample(&self, segments: usize) -> Vec<Vec3> {
        let segments = segments.max(1);
        (0..=segments)
            .map(|i| self.point_at(i as f32 / segments as f32))
            .collect()
    }

    /// `segments + 1` samples spaced evenly by arc length.
    ///
    /// The curve is measured on a dense polyline and each target length is
    /// mapped back to a curve parameter by linear interpolation.
    pub fn sample_by_length(&self, segments: usize) -> Vec<Vec3> {
        let segments = segments.max(1);
        let dense = self.sample(segments * LENGTH_OVERSAMPLE);

        let mut lengths = Vec::with_capacity(dense.len());
        let mut total = 0.0;
        lengths.push(0.0);
        for pair in dense.windows(2) {
            total += pair[0].distance(pair[1]);
            lengths.push(total);
        }

        let last = dense.len() - 1;
        let mut k = 0;
        (0..=segments)
            .map(|i| {
                let target = total * i as f32 / segments as f32;
                while k < last - 1 && lengths[k + 1] < target {
                    k += 1;
                }
                let span = lengths[k + 1] - lengths[k];
                let frac = if span > 0.0 {
                    ((target - lengths[k]) / span).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                self.point_at((k as f32 + frac) / last as f32)
            })
            .collect()
    }

    /// Height of the control point above the sphere.
    pub fn bulge(&self, radius: f32) -> f32 {
        self.control.length() - radius
    }
}

/// Tube vertex: position and outward normal.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Serialize, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ArcVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

/// Indexed triangle mesh of an open tube.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TubeMesh {
    pub vertices: Vec<ArcVertex>,
    pub indices: Vec<u32>,
}

impl TubeMesh {
    /// Sweep a circle of `radius` through `points`, one ring per point.
    ///
    /// Ring orientation follows Catmull-Rom knot tangents, so the spacing
    /// of the rings is whatever spacing `points` has.
    ///
    /// Rings are oriented with parallel-transported frames so the tube does
    /// not twist. Each ring repeats its first vertex to close the seam.
    pub fn along(points: &[Vec3], radius: f32, radial_segments: usize) -> Result<Self> {
        if points.len() < 2 {
            return Err(GeometryError::Degenerate("fewer than two path points"));
        }
        if radial_segments < 3 {
            return Err(GeometryError::Degenerate("fewer than three radial segments"));
        }

        let tangents = spline_tangents(points)?;
        let normals = transport_normals(&tangents);

        let ring = radial_segments + 1;
        let mut vertices = Vec::with_capacity(points.len() * ring);

        for ((point, tangent), normal) in points.iter().zip(&tangents).zip(&normals) {
            let binormal = tangent.cross(*normal);
            for j in 0..=radial_segments {
                let angle = j as f32 / radial_segments as f32 * std::f32::consts::TAU;
                let dir = (-angle.cos() * *normal + angle.sin() * binormal).normalize_or_zero();
                vertices.push(ArcVertex {
                    position: (*point + dir * radius).to_array(),
                    normal: dir.to_array(),
                });
            }
        }

        let tubular_segments = points.len() - 1;
        let mut indices = Vec::with_capacity(tubular_segments * radial_segments * 6);
        for i in 1..=tubular_segments {
            for j in 1..=radial_segments {
                let a = (ring * (i - 1) + (j - 1)) as u32;
                let b = (ring * i + (j - 1)) as u32;
                let c = (ring * i + j) as u32;
                let d = (ring * (i - 1) + j) as u32;
                indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }

        Ok(Self { vertices, indices })
    }

    /// Standard arc tube for a path, rings evenly spaced by arc length.
    pub fn for_path(path: &ArcPath) -> Result<Self> {
        Self::along(
            &path.sample_by_length(PATH_SEGMENTS),
            TUBE_RADIUS,
            TUBE_RADIAL_SEGMENTS,
        )
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Raw vertex bytes for GPU upload.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }
}

/// Tangents of a uniform Catmull-Rom spline at its knots.
///
/// At interior knots this is the central difference of the neighbours;
/// the ends fall back to one-sided differences.
fn spline_tangents(points: &[Vec3]) -> Result<Vec<Vec3>> {
    let last = points.len() - 1;
    (0..=last)
        .map(|i| {
            let prev = points[i.saturating_sub(1)];
            let next = points[(i + 1).min(last)];
            (next - prev)
                .try_normalize()
                .ok_or(GeometryError::Degenerate("zero-length tangent"))
        })
        .collect()
}

/// Parallel-transport an initial normal along the tangents.
fn transport_normals(tangents: &[Vec3]) -> Vec<Vec3> {
    let first = tangents[0];

    // Seed with the axis least aligned to the first tangent
    let abs = first.abs();
    let axis = if abs.x <= abs.y && abs.x <= abs.z {
        Vec3::X
    } else if abs.y <= abs.z {
        Vec3::Y
    } else {
        Vec3::Z
    };
    let mut normal = first.cross(axis).normalize();

    let mut normals = Vec::with_capacity(tangents.len());
    normals.push(normal);
    for pair in tangents.windows(2) {
        normal = (Quat::from_rotation_arc(pair[0], pair[1]) * normal).normalize();
        normals.push(normal);
    }
    normals
}
