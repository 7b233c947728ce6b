//! Pipeline configuration
//!
//! Every section has defaults matching the established reconstruction
//! settings, so a config file only needs the values it changes:
//!
//! ```toml
//! [gain]
//! conductivity = 0.33
//! normalize_percentile = 95.0
//! cortical_model = "inverse_square"
//!
//! [placement]
//! default_spacing = [2.0, 2.0, 5.0]
//! ```

use std::path::Path;

use seeg_core::SpacingPattern;
use serde::{Deserialize, Serialize};

use crate::error::{ForwardError, ForwardResult};
use crate::gain::ForwardModel;

/// Gain matrix settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GainConfig {
    /// Tissue conductivity σ used by the dipole model (S/m)
    pub conductivity: f64,
    /// Percentile of |gain| to normalize by; `None` or 0 keeps raw values
    pub normalize_percentile: Option<f64>,
    /// Forward model applied to cortical vertices
    pub cortical_model: ForwardModel,
}

impl Default for GainConfig {
    fn default() -> Self {
        Self {
            conductivity: 1.0,
            normalize_percentile: Some(100.0),
            cortical_model: ForwardModel::Dipole,
        }
    }
}

/// Contact placement settings
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    /// Spacing used for scheme lines without an explicit pattern (mm)
    pub default_spacing: SpacingPattern,
}

/// Periodicity detector settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeriodicityConfig {
    /// Histogram bin width along the electrode axis (mm)
    pub bin_width: f64,
    /// Shortest candidate contact period (mm)
    pub min_period_mm: f64,
    /// Longest candidate contact period (mm)
    pub max_period_mm: f64,
    /// Number of candidate periods evaluated
    pub n_periods: usize,
}

impl Default for PeriodicityConfig {
    fn default() -> Self {
        Self {
            bin_width: 0.1,
            min_period_mm: 2.0,
            max_period_mm: 6.0,
            n_periods: 1000,
        }
    }
}

/// Complete configuration
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconConfig {
    /// Gain matrix settings
    pub gain: GainConfig,
    /// Contact placement settings
    pub placement: PlacementConfig,
    /// Periodicity detector settings
    pub periodicity: PeriodicityConfig,
}

impl ReconConfig {
    /// Parse a TOML document.
    ///
    /// # Errors
    ///
    /// `Config` on malformed TOML or invalid values.
    pub fn from_toml_str(text: &str) -> ForwardResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load a TOML file.
    ///
    /// # Errors
    ///
    /// `MissingInput`, `Io` or `Config`.
    pub fn from_file(path: &Path) -> ForwardResult<Self> {
        if !path.exists() {
            return Err(ForwardError::MissingInput { path: path.to_path_buf() });
        }
        let text = std::fs::read_to_string(path).map_err(ForwardError::io(path))?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ReconConfig::default();
        assert_eq!(config.gain.conductivity, 1.0);
        assert_eq!(config.gain.normalize_percentile, Some(100.0));
        assert_eq!(config.gain.cortical_model, ForwardModel::Dipole);
        assert_eq!(config.placement.default_spacing.distances(), &[3.5]);
        assert_eq!(config.periodicity.n_periods, 1000);
    }

    #[test]
    fn test_partial_toml() {
        let config = ReconConfig::from_toml_str(
            r#"
            [gain]
            conductivity = 0.33
            cortical_model = "inverse_square"

            [placement]
            default_spacing = [2.0, 5.0]
            "#,
        )
        .unwrap();

        assert_eq!(config.gain.conductivity, 0.33);
        assert_eq!(config.gain.cortical_model, ForwardModel::InverseSquare);
        assert_eq!(config.gain.normalize_percentile, Some(100.0));
        assert_eq!(config.placement.default_spacing.distances(), &[2.0, 5.0]);
        assert_eq!(config.periodicity, PeriodicityConfig::default());
    }

    #[test]
    fn test_invalid_spacing_rejected() {
        let result = ReconConfig::from_toml_str("[placement]\ndefault_spacing = [0.0]\n");
        assert!(matches!(result, Err(ForwardError::Config(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = ReconConfig::from_file(Path::new("/nonexistent/seeg.toml"));
        assert!(matches!(result, Err(ForwardError::MissingInput { .. })));
    }
}
