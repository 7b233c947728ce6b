//! SEEG Forward - contact placement and forward models
//!
//! This crate turns implantation plans and imaging into SEEG sensor data:
//! - Contact placement along planned electrode trajectories
//! - Contact detection from segmented CT electrodes
//! - Dipole and inverse-square gain matrices aggregated to brain regions
//! - Dipole source files and BEM head model descriptions
//!
//! # Modules
//!
//! - [`contacts`]: Electrode schemes and contact tables
//! - [`periodic`]: Periodic contact fit on a labelled volume
//! - [`gain`]: Gain matrices and the [`GainMatrixEngine`] pipelines
//! - [`dipoles`]: Dipole source files
//! - [`head_model`]: `.geom` / `.cond` head model files
//! - [`transform`]: Coordinate transforms
//! - [`io`]: Text tables and surface archives
//! - [`config`]: TOML configuration

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod config;
pub mod contacts;
pub mod dipoles;
pub mod error;
pub mod gain;
pub mod head_model;
pub mod io;
pub mod periodic;
pub mod transform;

// Re-export key types
pub use config::{GainConfig, PeriodicityConfig, PlacementConfig, ReconConfig};
pub use error::{ForwardError, ForwardResult};
pub use gain::{ForwardModel, GainMatrixEngine, RegionGainInputs, SurfaceGainInputs};
pub use periodic::{LabelVolume, PeriodicFit, PeriodicityDetector, PeriodicityObserver};
pub use transform::{AffineTransform, CoordinateTransform};
