//! Grid-to-world mapping shared by the noise sampler, falloff field and density builder.
//!
//! Grids are centered on the chunk position: sample `i` of an axis with `n`
//! samples sits at `center + (i - (n - 1) / 2) * cube_size`. A padded grid keeps
//! the same center, so padded index `p` lands on native index `p - 1`.

use glam::{Vec2, Vec3};

/// Offset of sample `index` from the center of an axis with `count` samples.
#[inline]
pub fn axis_offset(index: usize, count: usize, cube_size: f32) -> f32 {
    (index as f32 - (count as f32 - 1.0) * 0.5) * cube_size
}

/// World-space XZ point of grid column `(x, z)`.
#[inline]
pub fn column_world_pos(
    x: usize,
    z: usize,
    width: usize,
    depth: usize,
    cube_size: f32,
    chunk_pos: Vec3,
) -> Vec2 {
    Vec2::new(
        chunk_pos.x + axis_offset(x, width, cube_size),
        chunk_pos.z + axis_offset(z, depth, cube_size),
    )
}

/// World-space position of grid sample `(x, y, z)`.
#[inline]
pub fn sample_world_pos(
    x: usize,
    y: usize,
    z: usize,
    size: crate::generation::grid::GridSize,
    cube_size: f32,
    chunk_pos: Vec3,
) -> Vec3 {
    Vec3::new(
        chunk_pos.x + axis_offset(x, size.x, cube_size),
        chunk_pos.y + axis_offset(y, size.y, cube_size),
        chunk_pos.z + axis_offset(z, size.z, cube_size),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_offset_centered() {
        assert_eq!(axis_offset(0, 5, 1.0), -2.0);
        assert_eq!(axis_offset(2, 5, 1.0), 0.0);
        assert_eq!(axis_offset(4, 5, 1.0), 2.0);
        assert_eq!(axis_offset(0, 4, 2.0), -3.0);
    }

    #[test]
    fn test_padded_grid_aligns_with_native() {
        let pos = Vec3::new(10.0, 0.0, -6.0);
        for x in 0..4 {
            for z in 0..4 {
                let native = column_world_pos(x, z, 4, 4, 0.5, pos);
                let padded = column_world_pos(x + 1, z + 1, 6, 6, 0.5, pos);
                assert_eq!(native, padded);
            }
        }
    }
}
