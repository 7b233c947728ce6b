//! SEEG Core - shared types and utilities
//!
//! This crate provides the foundational types, error taxonomy and numeric
//! helpers used by the contact placement and forward-model crates.
//!
//! # Modules
//!
//! - [`types`]: Electrode specifications, spacing patterns, contacts
//! - [`error`]: Placement, lookup-table and numeric errors
//! - [`math`]: Cumulative spacing, percentiles, evenly spaced ranges
//!
//! # Example
//!
//! ```rust
//! use seeg_core::types::{ElectrodeSpec, Position, SpacingPattern};
//!
//! let electrode = ElectrodeSpec::new("A", Position::zeros(), Position::new(10.0, 0.0, 0.0), 3)
//!     .with_spacing(SpacingPattern::parse("5").unwrap());
//!
//! assert!(electrode.validate().is_ok());
//! assert_eq!(electrode.spacing.cumulative(3), vec![0.0, 5.0, 10.0]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod error;
pub mod math;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{LutError, NumericError, PlacementError};
pub use types::{Contact, ElectrodeSpec, Position, SpacingPattern, DEFAULT_SPACING_MM};
