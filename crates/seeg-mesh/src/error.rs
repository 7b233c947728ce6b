//! Mesh and region-mapping error types.

use seeg_core::LutError;
use thiserror::Error;

/// Errors from surface construction, annotation loading and lookup tables.
#[derive(Error, Debug)]
pub enum MeshError {
    /// A triangle references a vertex that does not exist
    #[error("Triangle {triangle} references vertex {index}, surface has {nvertices} vertices")]
    TriangleIndexOutOfRange {
        /// Triangle number
        triangle: usize,
        /// Offending vertex index
        index: usize,
        /// Number of vertices in the surface
        nvertices: usize,
    },

    /// A row of a vertices/triangles field could not be parsed
    #[error("Malformed {field} row {line}: {reason}")]
    MalformedRow {
        /// Field being parsed (`vertices.txt`, `triangles.txt`)
        field: &'static str,
        /// 1-based line number
        line: usize,
        /// What was wrong
        reason: String,
    },

    /// An annotation labels a vertex with a region it does not name
    #[error("Annotation vertex {vertex} has label {label}, only {nregions} region names exist")]
    LabelOutOfRange {
        /// Vertex number
        vertex: usize,
        /// Label found
        label: usize,
        /// Number of region names
        nregions: usize,
    },

    /// Annotation JSON could not be decoded
    #[error("Invalid annotation: {0}")]
    InvalidAnnotation(#[from] serde_json::Error),

    /// Lookup table construction failed
    #[error(transparent)]
    Lut(#[from] LutError),
}
