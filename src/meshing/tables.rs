//! Marching cubes case table.
//!
//! Instead of a hand-typed 256-entry triangle table, each case is derived
//! from the cube faces: on every face, each run of inside corners contributes
//! a segment from the edge where the run starts to the edge where it ends.
//! Chaining those segments yields closed edge loops, which are fanned into
//! triangles. Inside corners sharing only a face diagonal stay separated.

use std::sync::LazyLock;

/// Corner offsets within a cell, as `[x, y, z]`
pub const CORNERS: [[usize; 3]; 8] = [
    [0, 0, 0],
    [1, 0, 0],
    [1, 0, 1],
    [0, 0, 1],
    [0, 1, 0],
    [1, 1, 0],
    [1, 1, 1],
    [0, 1, 1],
];

/// Cell edges as pairs of corner indices
pub const EDGES: [[usize; 2]; 12] = [
    [0, 1],
    [1, 2],
    [2, 3],
    [3, 0],
    [4, 5],
    [5, 6],
    [6, 7],
    [7, 4],
    [0, 4],
    [1, 5],
    [2, 6],
    [3, 7],
];

/// Corners of each face, counter-clockwise seen from outside the cell
const FACES: [[usize; 4]; 6] = [
    [0, 1, 2, 3],
    [4, 7, 6, 5],
    [0, 4, 5, 1],
    [3, 2, 6, 7],
    [0, 3, 7, 4],
    [1, 5, 6, 2],
];

/// `FACE_EDGES[f][k]` joins `FACES[f][k]` and `FACES[f][(k + 1) % 4]`
const FACE_EDGES: [[usize; 4]; 6] = [
    [0, 1, 2, 3],
    [7, 6, 5, 4],
    [8, 4, 9, 0],
    [2, 10, 6, 11],
    [3, 11, 7, 8],
    [9, 5, 10, 1],
];

/// Triangles for every corner case, as triples of edge indices.
///
/// Bit `c` of the case index is set when corner `c` is inside the surface.
pub static CASE_TRIANGLES: LazyLock<Vec<Vec<[u8; 3]>>> =
    LazyLock::new(|| (0..=255u8).map(triangulate_case).collect());

fn triangulate_case(case: u8) -> Vec<[u8; 3]> {
    let inside = |corner: usize| case & (1 << corner) != 0;

    let mut next: [Option<usize>; 12] = [None; 12];
    for (corners, edges) in FACES.iter().zip(FACE_EDGES.iter()) {
        for k in 0..4 {
            if inside(corners[k]) || !inside(corners[(k + 1) % 4]) {
                continue;
            }
            let mut j = (k + 1) % 4;
            while inside(corners[(j + 1) % 4]) {
                j = (j + 1) % 4;
            }
            next[edges[k]] = Some(edges[j]);
        }
    }

    let mut visited = [false; 12];
    let mut triangles = Vec::new();
    for start in 0..12 {
        if visited[start] || next[start].is_none() {
            continue;
        }
        let mut polygon = Vec::with_capacity(12);
        let mut edge = start;
        while !visited[edge] {
            visited[edge] = true;
            polygon.push(edge as u8);
            match next[edge] {
                Some(n) => edge = n,
                None => break,
            }
        }
        for i in 1..polygon.len().saturating_sub(1) {
            triangles.push([polygon[0], polygon[i], polygon[i + 1]]);
        }
    }
    triangles
}
