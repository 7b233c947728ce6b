//! Core data types for SEEG electrodes
//!
//! An [`ElectrodeSpec`] describes one implanted electrode by its deepest
//! point (target), the point where it crosses the skull (entry), its contact
//! count and the distances between contacts. Placing it yields [`Contact`]s.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::PlacementError;
use crate::math::cumulative_spacing;

/// A position in millimetres.
pub type Position = Vector3<f64>;

/// Contact spacing used when a scheme line omits its pattern (mm)
pub const DEFAULT_SPACING_MM: f64 = 3.5;

// ============================================================================
// Spacing Pattern
// ============================================================================

/// Distances between neighbouring contacts, repeated cyclically.
///
/// Always non-empty with strictly positive distances.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct SpacingPattern(Vec<f64>);

impl SpacingPattern {
    /// Create a pattern from explicit distances.
    ///
    /// # Errors
    ///
    /// `EmptySpacingPattern` or `NonPositiveSpacing`.
    pub fn new(distances: Vec<f64>) -> Result<Self, PlacementError> {
        if distances.is_empty() {
            return Err(PlacementError::EmptySpacingPattern);
        }
        if let Some((index, &value)) = distances.iter().enumerate().find(|(_, d)| !(**d > 0.0)) {
            return Err(PlacementError::NonPositiveSpacing { index, value });
        }
        Ok(Self(distances))
    }

    /// Parse a whitespace-separated list of distances, e.g. `"2 2 5"`.
    ///
    /// # Errors
    ///
    /// `InvalidSpacingValue` for a token that is not a number, plus the
    /// errors of [`SpacingPattern::new`].
    pub fn parse(text: &str) -> Result<Self, PlacementError> {
        let distances = text
            .split_whitespace()
            .map(|token| {
                token.parse::<f64>().map_err(|_| PlacementError::InvalidSpacingValue {
                    token: token.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(distances)
    }

    /// The distances in mm.
    #[must_use]
    pub fn distances(&self) -> &[f64] {
        &self.0
    }

    /// Distance of each of `ncontacts` contacts from the first one.
    #[must_use]
    pub fn cumulative(&self, ncontacts: usize) -> Vec<f64> {
        cumulative_spacing(&self.0, ncontacts)
    }
}

impl Default for SpacingPattern {
    fn default() -> Self {
        Self(vec![DEFAULT_SPACING_MM])
    }
}

impl TryFrom<Vec<f64>> for SpacingPattern {
    type Error = PlacementError;

    fn try_from(distances: Vec<f64>) -> Result<Self, Self::Error> {
        Self::new(distances)
    }
}

impl From<SpacingPattern> for Vec<f64> {
    fn from(pattern: SpacingPattern) -> Self {
        pattern.0
    }
}

// ============================================================================
// Electrode
// ============================================================================

/// One electrode trajectory with its contact layout.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ElectrodeSpec {
    /// Electrode name, used as the prefix of contact names
    pub name: String,
    /// Deepest point; the first contact sits here
    pub target: Position,
    /// Skull entry point; sets the direction of the electrode
    pub entry: Position,
    /// Number of contacts
    pub ncontacts: usize,
    /// Distances between neighbouring contacts
    pub spacing: SpacingPattern,
}

impl ElectrodeSpec {
    /// Create an electrode with the default 3.5 mm spacing.
    #[must_use]
    pub fn new(name: impl Into<String>, target: Position, entry: Position, ncontacts: usize) -> Self {
        Self {
            name: name.into(),
            target,
            entry,
            ncontacts,
            spacing: SpacingPattern::default(),
        }
    }

    /// Replace the spacing pattern.
    #[must_use]
    pub fn with_spacing(mut self, spacing: SpacingPattern) -> Self {
        self.spacing = spacing;
        self
    }

    /// Unit vector from target towards entry.
    ///
    /// # Errors
    ///
    /// `ZeroLengthElectrode` when target and entry coincide.
    pub fn direction(&self) -> Result<Position, PlacementError> {
        (self.entry - self.target)
            .try_normalize(f64::EPSILON)
            .ok_or_else(|| PlacementError::ZeroLengthElectrode { electrode: self.name.clone() })
    }

    /// Check contact count and direction.
    ///
    /// # Errors
    ///
    /// `InvalidContactCount` or `ZeroLengthElectrode`.
    pub fn validate(&self) -> Result<(), PlacementError> {
        if self.ncontacts == 0 {
            return Err(PlacementError::InvalidContactCount { count: 0 });
        }
        self.direction().map(|_| ())
    }
}

// ============================================================================
// Contact
// ============================================================================

/// A placed electrode contact.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    /// Electrode name followed by the 1-based contact number, e.g. `A3`
    pub name: String,
    /// Contact centre
    pub position: Position,
}

impl Contact {
    /// Create a contact.
    #[must_use]
    pub fn new(name: impl Into<String>, position: Position) -> Self {
        Self {
            name: name.into(),
            position,
        }
    }

    /// Name of the `index`-th (0-based) contact of `electrode`.
    #[must_use]
    pub fn contact_name(electrode: &str, index: usize) -> String {
        format!("{electrode}{}", index + 1)
    }
}
