//! Marching cubes mesh extraction.

use std::collections::HashMap;

use glam::Vec3;

use crate::core::Result;
use crate::generation::chunk::validate_cube_size;
use crate::generation::grid::DensityGrid;
use crate::meshing::tables::{CASE_TRIANGLES, CORNERS, EDGES};
use crate::meshing::{MeshData, MeshExtractor, check_padded};

/// Below this corner difference an edge vertex sits at the midpoint.
const FLAT_EPSILON: f32 = 1e-6;

/// Marching cubes over the native grid, with normals from the padded grid.
///
/// Cells with a corner below `iso_level` are inside. Vertices are shared
/// between cells that touch the same grid edge.
#[derive(Clone, Copy, Debug)]
pub struct MarchingCubes {
    pub iso_level: f32,
}

impl Default for MarchingCubes {
    fn default() -> Self {
        Self { iso_level: 0.0 }
    }
}

impl MarchingCubes {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A grid edge, identified by its lower grid point and axis (0 = X, 1 = Y, 2 = Z)
type EdgeKey = (usize, usize, usize, usize);

impl MeshExtractor for MarchingCubes {
    fn extract(&self, density: &DensityGrid, padded: &DensityGrid, cube_size: f32) -> Result<MeshData> {
        let size = density.size();
        size.validate()?;
        validate_cube_size(cube_size)?;
        check_padded(density, padded)?;

        let mut mesh = MeshData::default();
        if size.x < 2 || size.y < 2 || size.z < 2 {
            return Ok(mesh);
        }

        let center = Vec3::new(
            (size.x - 1) as f32 * 0.5,
            (size.y - 1) as f32 * 0.5,
            (size.z - 1) as f32 * 0.5,
        );
        let mut edge_vertices: HashMap<EdgeKey, u32> = HashMap::new();

        for z in 0..size.z - 1 {
            for y in 0..size.y - 1 {
                for x in 0..size.x - 1 {
                    let corner = |c: usize| {
                        let [dx, dy, dz] = CORNERS[c];
                        [x + dx, y + dy, z + dz]
                    };

                    let mut case = 0usize;
                    for c in 0..8 {
                        let [cx, cy, cz] = corner(c);
                        if density.get(cx, cy, cz) < self.iso_level {
                            case |= 1 << c;
                        }
                    }

                    for triangle in &CASE_TRIANGLES[case] {
                        for &edge in triangle {
                            let [a, b] = EDGES[edge as usize];
                            let (pa, pb) = (corner(a), corner(b));
                            let axis = (0..3).find(|&i| pa[i] != pb[i]).unwrap_or(0);
                            let low = if pa[axis] < pb[axis] { pa } else { pb };
                            let key = (low[0], low[1], low[2], axis);

                            let index = match edge_vertices.get(&key) {
                                Some(&index) => index,
                                None => {
                                    let index = mesh.vertices.len() as u32;
                                    let (position, normal) =
                                        self.edge_vertex(density, padded, pa, pb, center, cube_size);
                                    mesh.vertices.push(position);
                                    mesh.normals.push(normal);
                                    edge_vertices.insert(key, index);
                                    index
                                }
                            };
                            mesh.triangles.push(index);
                        }
                    }
                }
            }
        }

        log::trace!(
            "Extracted {} vertices, {} triangles from {} grid",
            mesh.vertices.len(),
            mesh.triangle_count(),
            size
        );
        Ok(mesh)
    }
}

impl MarchingCubes {
    fn edge_vertex(
        &self,
        density: &DensityGrid,
        padded: &DensityGrid,
        pa: [usize; 3],
        pb: [usize; 3],
        center: Vec3,
        cube_size: f32,
    ) -> (Vec3, Vec3) {
        let va = density.get(pa[0], pa[1], pa[2]);
        let vb = density.get(pb[0], pb[1], pb[2]);
        let t = if (vb - va).abs() < FLAT_EPSILON {
            0.5
        } else {
            ((self.iso_level - va) / (vb - va)).clamp(0.0, 1.0)
        };

        let ga = to_vec3(pa);
        let gb = to_vec3(pb);
        let position = (ga.lerp(gb, t) - center) * cube_size;

        let normal = gradient(padded, pa)
            .lerp(gradient(padded, pb), t)
            .try_normalize()
            .unwrap_or(Vec3::Y);
        (position, normal)
    }
}

fn to_vec3(p: [usize; 3]) -> Vec3 {
    Vec3::new(p[0] as f32, p[1] as f32, p[2] as f32)
}

/// Density gradient at native point `p`, sampled on the padded grid.
///
/// X and Z always have both neighbours there; Y falls back to one-sided
/// differences at the bottom and top.
fn gradient(padded: &DensityGrid, p: [usize; 3]) -> Vec3 {
    let (x, y, z) = (p[0] + 1, p[1], p[2] + 1);
    let top = padded.size().y - 1;

    let dx = (padded.get(x + 1, y, z) - padded.get(x - 1, y, z)) * 0.5;
    let dz = (padded.get(x, y, z + 1) - padded.get(x, y, z - 1)) * 0.5;
    let dy = if top == 0 {
        0.0
    } else if y == 0 {
        padded.get(x, 1, z) - padded.get(x, 0, z)
    } else if y == top {
        padded.get(x, top, z) - padded.get(x, top - 1, z)
    } else {
        (padded.get(x, y + 1, z) - padded.get(x, y - 1, z)) * 0.5
    };

    Vec3::new(dx, dy, dz)
}
