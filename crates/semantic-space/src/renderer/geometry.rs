//! CPU-side mesh construction.

use crate::data::types::MeshVertex;
use std::f32::consts::{PI, TAU};

/// Indexed UV sphere centred on the origin.
#[derive(Debug, Clone)]
pub struct SphereGeometry {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

impl SphereGeometry {
    /// Builds a sphere of `radius` with `width_segments` around the equator
    /// and `height_segments` from pole to pole.
    ///
    /// The grid has a seam column and one ring per pole, so there are
    /// `(width + 1) * (height + 1)` vertices; the degenerate triangles that
    /// would touch the poles twice are skipped.
    pub fn new(radius: f32, width_segments: u32, height_segments: u32) -> Self {
        let ws = width_segments.max(3);
        let hs = height_segments.max(2);

        let mut vertices = Vec::with_capacity(((ws + 1) * (hs + 1)) as usize);
        for iy in 0..=hs {
            let v = iy as f32 / hs as f32;
            let (sin_t, cos_t) = (v * PI).sin_cos();
            for ix in 0..=ws {
                let u = ix as f32 / ws as f32;
                let (sin_p, cos_p) = (u * TAU).sin_cos();
                let normal = [-cos_p * sin_t, cos_t, sin_p * sin_t];
                vertices.push(MeshVertex {
                    position: normal.map(|c| c * radius),
                    normal,
                });
            }
        }

        let row = ws + 1;
        let mut indices = Vec::with_capacity((ws * hs * 6) as usize);
        for iy in 0..hs {
            for ix in 0..ws {
                let a = iy * row + ix + 1;
                let b = iy * row + ix;
                let c = (iy + 1) * row + ix;
                let d = (iy + 1) * row + ix + 1;

                if iy != 0 {
                    indices.extend_from_slice(&[a, b, d]);
                }
                if iy != hs - 1 {
                    indices.extend_from_slice(&[b, c, d]);
                }
            }
        }

        Self { vertices, indices }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn counts_match_segments() {
        let g = SphereGeometry::new(0.3, 32, 32);
        assert_eq!(g.vertices.len(), 33 * 33);
        // Two triangles per quad, minus one per quad on each polar ring.
        assert_eq!(g.indices.len(), (32 * 32 * 2 - 2 * 32) * 3);
        assert!(g.indices.iter().all(|&i| (i as usize) < g.vertices.len()));
    }

    #[test]
    fn vertices_lie_on_the_surface() {
        let g = SphereGeometry::new(0.3, 16, 12);
        for v in &g.vertices {
            let p = Vec3::from(v.position);
            let n = Vec3::from(v.normal);
            assert!((p.length() - 0.3).abs() < 1e-5);
            assert!((n.length() - 1.0).abs() < 1e-5);
            assert!(p.normalize().abs_diff_eq(n, 1e-4));
        }
    }

    #[test]
    fn winding_faces_outwards() {
        let g = SphereGeometry::new(1.0, 8, 6);
        for tri in g.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| Vec3::from(g.vertices[i as usize].position));
            let face_normal = (b - a).cross(c - a);
            let centroid = (a + b + c) / 3.0;
            assert!(face_normal.dot(centroid) > 0.0);
        }
    }
}
