//! Error types for the placement and forward-model pipelines.

use std::io;
use std::path::{Path, PathBuf};

use seeg_core::{NumericError, PlacementError};
use seeg_mesh::MeshError;
use thiserror::Error;

/// Pipeline error
#[derive(Error, Debug)]
pub enum ForwardError {
    /// Reading or writing a file failed
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// A required input file does not exist
    #[error("Missing input file: {}", path.display())]
    MissingInput {
        /// Expected path
        path: PathBuf,
    },

    /// A data file has a malformed row
    #[error("{} line {line}: {reason}", path.display())]
    Format {
        /// File being parsed
        path: PathBuf,
        /// 1-based line number
        line: usize,
        /// What was wrong
        reason: String,
    },

    /// A scheme line does not have 8 or 9 fields
    #[error("Unexpected number of items ({found}) on scheme line {line}:\n{text}")]
    SchemeFieldCount {
        /// 1-based line number
        line: usize,
        /// Number of fields found
        found: usize,
        /// The offending line
        text: String,
    },

    /// A scheme line could not be tokenized
    #[error("Scheme line {line}: {source}")]
    SchemeSyntax {
        /// 1-based line number
        line: usize,
        /// Tokenizer failure
        #[source]
        source: csv::Error,
    },

    /// A scheme field is not a valid number
    #[error("Scheme line {line}: {field} '{value}' is not a valid number")]
    SchemeValue {
        /// 1-based line number
        line: usize,
        /// Field name
        field: &'static str,
        /// Text found
        value: String,
    },

    /// A scheme line describes an invalid electrode
    #[error("Scheme line {line}: {source}")]
    InvalidElectrode {
        /// 1-based line number
        line: usize,
        /// Validation failure
        #[source]
        source: PlacementError,
    },

    /// Two inputs disagree in size
    #[error("Shape mismatch in {what}: expected {expected}, found {found}")]
    ShapeMismatch {
        /// Quantity being compared
        what: &'static str,
        /// Expected length
        expected: usize,
        /// Actual length
        found: usize,
    },

    /// A vertex maps to a region beyond the region count
    #[error("Vertex {vertex} maps to region {region}, only {nregions} regions exist")]
    RegionOutOfRange {
        /// Vertex number
        vertex: usize,
        /// Region index found
        region: i64,
        /// Number of regions
        nregions: usize,
    },

    /// The dipole model was asked to run without source orientations
    #[error("Dipole forward model requires source orientations")]
    MissingOrientations,

    /// Configuration file could not be decoded
    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// Contact placement failed
    #[error(transparent)]
    Placement(#[from] PlacementError),

    /// Numeric degeneracy
    #[error(transparent)]
    Numeric(#[from] NumericError),

    /// Surface or region mapping failure
    #[error(transparent)]
    Mesh(#[from] MeshError),
}

impl ForwardError {
    /// Wrap an I/O error with the path it concerns.
    pub fn io(path: impl AsRef<Path>) -> impl FnOnce(io::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        move |source| Self::Io { path, source }
    }
}

/// Result alias for pipeline operations
pub type ForwardResult<T> = Result<T, ForwardError>;
