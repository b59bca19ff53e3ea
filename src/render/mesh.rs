use bytemuck::{Pod, Zeroable};

use crate::layout::BarMode;

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

const fn v(position: [f32; 3], normal: [f32; 3]) -> MeshVertex {
    MeshVertex { position, normal }
}

/// Unit quad centred on the origin in the z = 0 plane.
pub fn unit_quad() -> Vec<MeshVertex> {
    let n = [0.0, 0.0, 1.0];
    vec![
        v([-0.5, -0.5, 0.0], n),
        v([0.5, -0.5, 0.0], n),
        v([0.5, 0.5, 0.0], n),
        v([-0.5, -0.5, 0.0], n),
        v([0.5, 0.5, 0.0], n),
        v([-0.5, 0.5, 0.0], n),
    ]
}

/// Unit cube centred on the origin, two triangles per face.
pub fn unit_cube() -> Vec<MeshVertex> {
    // (normal, u axis, v axis) per face
    let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
    ];

    let mut vertices = Vec::with_capacity(36);
    for (n, u, w) in faces {
        let corner = |su: f32, sv: f32| {
            v(
                [
                    0.5 * n[0] + su * u[0] + sv * w[0],
                    0.5 * n[1] + su * u[1] + sv * w[1],
                    0.5 * n[2] + su * u[2] + sv * w[2],
                ],
                n,
            )
        };
        vertices.extend([
            corner(-0.5, -0.5),
            corner(0.5, -0.5),
            corner(0.5, 0.5),
            corner(-0.5, -0.5),
            corner(0.5, 0.5),
            corner(-0.5, 0.5),
        ]);
    }
    vertices
}

pub fn mesh_for(mode: BarMode) -> Vec<MeshVertex> {
    match mode {
        BarMode::Flat => unit_quad(),
        BarMode::Cube => unit_cube(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cube_spans_unit_box() {
        let cube = unit_cube();
        assert_eq!(cube.len(), 36);
        for vertex in &cube {
            for c in vertex.position {
                assert!((c.abs() - 0.5).abs() < 1e-6, "corner off the unit box: {:?}", vertex);
            }
        }
    }

    #[test]
    fn test_cube_faces_wind_outwards() {
        for tri in unit_cube().chunks(3) {
            let a = glam::Vec3::from(tri[0].position);
            let b = glam::Vec3::from(tri[1].position);
            let c = glam::Vec3::from(tri[2].position);
            let n = glam::Vec3::from(tri[0].normal);
            assert!((b - a).cross(c - a).dot(n) > 0.0);
        }
    }

    #[test]
    fn test_quad_is_centred() {
        let quad = unit_quad();
        let sum: f32 = quad.iter().map(|v| v.position[0] + v.position[1]).sum();
        assert_eq!(quad.len(), 6);
        assert!(sum.abs() < 1e-6);
    }
}
