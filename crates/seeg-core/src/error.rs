//! Error types for SEEG reconstruction
//!
//! The variants carry enough context (indices, offending values, names) to
//! report a failure without re-reading the inputs.

use thiserror::Error;

// ============================================================================
// Contact Placement Errors
// ============================================================================

/// Errors raised while validating an electrode or placing its contacts.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlacementError {
    /// Contact count must be strictly positive
    #[error("Invalid contact count {count}: an electrode needs at least one contact")]
    InvalidContactCount {
        /// Requested number of contacts
        count: i64,
    },

    /// Spacing pattern has no distances
    #[error("Spacing pattern is empty")]
    EmptySpacingPattern,

    /// A spacing distance is zero, negative or NaN
    #[error("Spacing distance #{index} is {value}, distances must be positive")]
    NonPositiveSpacing {
        /// Position of the distance within the pattern
        index: usize,
        /// The rejected distance in mm
        value: f64,
    },

    /// A spacing token could not be read as a number
    #[error("Spacing value '{token}' is not a number")]
    InvalidSpacingValue {
        /// The token as written
        token: String,
    },

    /// Target and entry coincide so the electrode has no direction
    #[error("Electrode {electrode} has identical target and entry points")]
    ZeroLengthElectrode {
        /// Electrode name
        electrode: String,
    },
}

// ============================================================================
// Lookup Table Errors
// ============================================================================

/// Errors raised when a region lookup table would not be a contiguous
/// one-to-one index/name association.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LutError {
    /// Indices skip a value
    #[error("Lookup table index gap: expected {expected}, found {found}")]
    IndexGap {
        /// Next index the table expected
        expected: usize,
        /// Index actually supplied
        found: usize,
    },

    /// Two names were given the same index
    #[error("Lookup table index {index} assigned to both '{existing}' and '{name}'")]
    IndexCollision {
        /// Shared index
        index: usize,
        /// Name already holding the index
        existing: String,
        /// Name that tried to take it
        name: String,
    },

    /// One name was given two indices
    #[error("Region '{name}' appears twice in lookup table (indices {existing} and {index})")]
    NameCollision {
        /// Duplicated region name
        name: String,
        /// First index of the name
        existing: usize,
        /// Second index of the name
        index: usize,
    },
}

// ============================================================================
// Numeric Errors
// ============================================================================

/// Numeric degeneracies. None of these are recovered from.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NumericError {
    /// No voxel carries the requested label
    #[error("No voxel carries label {value}")]
    EmptyVoxelSet {
        /// Requested label
        value: i32,
    },

    /// Singular value decomposition did not produce the right singular vectors
    #[error("Singular value decomposition failed")]
    SvdFailed,

    /// Normalization would divide by zero
    #[error("Normalization scale at percentile {percentile} is zero")]
    ZeroScale {
        /// Percentile that was requested
        percentile: f64,
    },

    /// Percentile outside [0, 100]
    #[error("Percentile {percentile} outside [0, 100]")]
    InvalidPercentile {
        /// Requested percentile
        percentile: f64,
    },

    /// An operation received no data
    #[error("Empty input: {what}")]
    EmptyInput {
        /// What was empty
        what: &'static str,
    },
}
