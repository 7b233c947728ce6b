//! Triangle surface geometry.
//!
//! Vertex normals and vertex areas are the only derived quantities the
//! forward models need. Normals follow the triangle winding: a triangle
//! `(a, b, c)` faces towards `(b - a) × (c - a)`.

use std::str::FromStr;

use seeg_core::Position;
use serde::{Deserialize, Serialize};

use crate::error::MeshError;

/// A triangulated surface.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Surface {
    vertices: Vec<Position>,
    triangles: Vec<[usize; 3]>,
}

impl Surface {
    /// Create a surface, checking that every triangle index is a vertex.
    ///
    /// # Errors
    ///
    /// `TriangleIndexOutOfRange` for the first bad index found.
    pub fn new(vertices: Vec<Position>, triangles: Vec<[usize; 3]>) -> Result<Self, MeshError> {
        let nvertices = vertices.len();
        for (triangle, tri) in triangles.iter().enumerate() {
            if let Some(&index) = tri.iter().find(|&&i| i >= nvertices) {
                return Err(MeshError::TriangleIndexOutOfRange {
                    triangle,
                    index,
                    nvertices,
                });
            }
        }
        Ok(Self { vertices, triangles })
    }

    /// Build a surface from the text of a `vertices.txt` field (3 floats per
    /// row) and a `triangles.txt` field (3 vertex indices per row).
    ///
    /// # Errors
    ///
    /// `MalformedRow` for unparsable rows, plus the errors of [`Surface::new`].
    pub fn from_fields(vertices_txt: &str, triangles_txt: &str) -> Result<Self, MeshError> {
        let vertices = parse_rows::<f64>(vertices_txt, "vertices.txt")?
            .into_iter()
            .map(|[x, y, z]| Position::new(x, y, z))
            .collect();
        let triangles = parse_rows::<usize>(triangles_txt, "triangles.txt")?;
        Self::new(vertices, triangles)
    }

    /// Vertex positions.
    #[must_use]
    pub fn vertices(&self) -> &[Position] {
        &self.vertices
    }

    /// Triangles as vertex index triples.
    #[must_use]
    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    /// Number of vertices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// Check if the surface has no vertices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Cross product of two triangle edges; its length is twice the area.
    fn triangle_cross(&self, [a, b, c]: [usize; 3]) -> Position {
        let (a, b, c) = (self.vertices[a], self.vertices[b], self.vertices[c]);
        (b - a).cross(&(c - a))
    }

    /// Area of each triangle.
    #[must_use]
    pub fn triangle_areas(&self) -> Vec<f64> {
        self.triangles.iter().map(|&t| 0.5 * self.triangle_cross(t).norm()).collect()
    }

    /// Unit normal of each triangle (zero for degenerate triangles).
    #[must_use]
    pub fn triangle_normals(&self) -> Vec<Position> {
        self.triangles
            .iter()
            .map(|&t| self.triangle_cross(t).try_normalize(0.0).unwrap_or_else(Position::zeros))
            .collect()
    }

    /// Unit normal at each vertex: the area-weighted mean of the normals of
    /// the triangles sharing it. Vertices outside every triangle get zero.
    #[must_use]
    pub fn vertex_normals(&self) -> Vec<Position> {
        let mut normals = vec![Position::zeros(); self.vertices.len()];
        for &tri in &self.triangles {
            // Unnormalized cross product already carries the area weight
            let weighted = self.triangle_cross(tri);
            for i in tri {
                normals[i] += weighted;
            }
        }
        normals
            .into_iter()
            .map(|n| n.try_normalize(0.0).unwrap_or_else(Position::zeros))
            .collect()
    }

    /// Area attributed to each vertex: one third of each adjacent triangle.
    #[must_use]
    pub fn vertex_areas(&self) -> Vec<f64> {
        let mut areas = vec![0.0; self.vertices.len()];
        for (&tri, area) in self.triangles.iter().zip(self.triangle_areas()) {
            for i in tri {
                areas[i] += area / 3.0;
            }
        }
        areas
    }
}

/// Parse whitespace-separated rows of exactly three values, skipping blanks.
fn parse_rows<T: FromStr>(text: &str, field: &'static str) -> Result<Vec<[T; 3]>, MeshError> {
    let mut rows = Vec::new();
    for (n, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let malformed = |reason: String| MeshError::MalformedRow {
            field,
            line: n + 1,
            reason,
        };
        let values = line
            .split_whitespace()
            .map(|tok| tok.parse::<T>().map_err(|_| malformed(format!("'{tok}' is not a number"))))
            .collect::<Result<Vec<T>, _>>()?;
        let row: [T; 3] = values
            .try_into()
            .map_err(|v: Vec<T>| malformed(format!("expected 3 values, found {}", v.len())))?;
        rows.push(row);
    }
    Ok(rows)
}
