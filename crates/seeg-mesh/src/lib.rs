//! SEEG Mesh - surfaces and region parcellations
//!
//! Provides the geometry and labelling side of the forward model:
//!
//! - [`surface`]: triangle surfaces with vertex normals and vertex areas
//! - [`annotation`]: per-vertex parcellation labels
//! - [`lut`]: contiguous bidirectional region lookup tables
//! - [`mapping`]: unified cortical + subcortical region numbering
//!
//! # Unified numbering
//!
//! ```text
//!   cortical lh ─┐                    ┌─► 0        unknown
//!   cortical rh ─┼─► Mapping::new ────┼─► 1..      ctx-lh-*, ctx-rh-*
//!   subcort lh  ─┤                    └─► ..       subcortical lh, rh
//!   subcort rh  ─┘
//! ```

#![warn(missing_docs)]

pub mod annotation;
pub mod error;
pub mod lut;
pub mod mapping;
pub mod surface;

pub use annotation::Annotation;
pub use error::MeshError;
pub use lut::RegionLut;
pub use mapping::{Hemisphere, Mapping};
pub use surface::Surface;
