//! Contact centres from a segmented electrode
//!
//! A CT segmentation labels every voxel of one electrode with the same value.
//! The contacts show up as a periodic density along the electrode axis, so
//! the centres are recovered in four steps:
//!
//! 1. principal axis of the labelled voxels (SVD of the centred coordinates)
//! 2. histogram of the voxel projections onto that axis
//! 3. Fourier sum of the histogram over a range of candidate periods; the
//!    strongest period and its phase give the contact grid
//! 4. grid positions mapped back into 3D along the axis

use std::f64::consts::PI;

use nalgebra::DMatrix;
use rustfft::num_complex::Complex;
use seeg_core::math::{arange, linspace};
use seeg_core::{NumericError, Position};

use crate::config::PeriodicityConfig;
use crate::error::{ForwardError, ForwardResult};
use crate::transform::CoordinateTransform;

// ============================================================================
// Label volume
// ============================================================================

/// A 3D integer label image stored in C order (last index fastest).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelVolume {
    shape: [usize; 3],
    labels: Vec<i32>,
}

impl LabelVolume {
    /// Wrap a flat C-order label buffer.
    ///
    /// # Errors
    ///
    /// `ShapeMismatch` when the buffer length is not the product of `shape`.
    pub fn new(shape: [usize; 3], labels: Vec<i32>) -> ForwardResult<Self> {
        let expected = shape.iter().product();
        if labels.len() != expected {
            return Err(ForwardError::ShapeMismatch {
                what: "label volume",
                expected,
                found: labels.len(),
            });
        }
        Ok(Self { shape, labels })
    }

    /// Volume dimensions.
    #[must_use]
    pub const fn shape(&self) -> [usize; 3] {
        self.shape
    }

    /// Label at a voxel, `None` outside the volume.
    #[must_use]
    pub fn get(&self, [i, j, k]: [usize; 3]) -> Option<i32> {
        let [nx, ny, nz] = self.shape;
        if i >= nx || j >= ny || k >= nz {
            return None;
        }
        self.labels.get((i * ny + j) * nz + k).copied()
    }

    /// Set the label of a voxel; out-of-range voxels are ignored.
    pub fn set(&mut self, [i, j, k]: [usize; 3], value: i32) {
        let [nx, ny, nz] = self.shape;
        if i < nx && j < ny && k < nz {
            self.labels[(i * ny + j) * nz + k] = value;
        }
    }

    /// Indices of every voxel carrying `value`, in C order.
    pub fn voxels_with(&self, value: i32) -> impl Iterator<Item = [usize; 3]> + '_ {
        let [_, ny, nz] = self.shape;
        self.labels
            .iter()
            .enumerate()
            .filter(move |&(_, &l)| l == value)
            .map(move |(flat, _)| [flat / (ny * nz), (flat / nz) % ny, flat % nz])
    }
}

// ============================================================================
// Diagnostics
// ============================================================================

/// Intermediate results of one fit.
#[derive(Debug)]
pub struct PeriodicityDiagnostics<'a> {
    /// Centre of each histogram bin along the axis (mm)
    pub bin_centres: &'a [f64],
    /// Voxel count per bin
    pub counts: &'a [f64],
    /// Candidate periods (mm)
    pub periods: &'a [f64],
    /// |B| for each candidate period
    pub spectrum: &'a [f64],
    /// Fitted grid positions along the axis (mm)
    pub grid: &'a [f64],
    /// Selected period (mm)
    pub period: f64,
    /// Phase of the selected period (rad)
    pub phase: f64,
}

/// Receives the intermediate results of a fit, e.g. for plotting.
pub trait PeriodicityObserver {
    /// Called once per fit, after the grid is known.
    fn observe(&mut self, diagnostics: &PeriodicityDiagnostics<'_>);
}

/// Fitted contact centres of one electrode.
#[derive(Clone, Debug, PartialEq)]
pub struct PeriodicFit {
    /// Contact centres in physical space, ordered along the axis
    pub centres: Vec<Position>,
    /// Contact period (mm)
    pub period: f64,
    /// Phase of the period (rad)
    pub phase: f64,
    /// Unit electrode axis
    pub axis: Position,
    /// Mean of the electrode voxels
    pub mean: Position,
}

// ============================================================================
// Detector
// ============================================================================

/// Periodicity detector
pub struct PeriodicityDetector {
    config: PeriodicityConfig,
    periods: Vec<f64>,
}

impl PeriodicityDetector {
    /// Create a detector.
    #[must_use]
    pub fn new(config: PeriodicityConfig) -> Self {
        let periods = linspace(config.min_period_mm, config.max_period_mm, config.n_periods);
        Self { config, periods }
    }

    /// Detector settings
    #[must_use]
    pub const fn config(&self) -> &PeriodicityConfig {
        &self.config
    }

    /// Fit the contacts of the object labelled `value`.
    ///
    /// # Errors
    ///
    /// `EmptyVoxelSet` when no voxel carries `value`.
    pub fn fit(
        &self,
        volume: &LabelVolume,
        value: i32,
        affine: &dyn CoordinateTransform,
        observer: Option<&mut dyn PeriodicityObserver>,
    ) -> ForwardResult<PeriodicFit> {
        #[allow(clippy::cast_precision_loss)]
        let points: Vec<Position> = volume
            .voxels_with(value)
            .map(|[i, j, k]| affine.transform_coords(&Position::new(i as f64, j as f64, k as f64)))
            .collect();
        if points.is_empty() {
            return Err(NumericError::EmptyVoxelSet { value }.into());
        }

        let fit = self.fit_points(&points, observer)?;
        tracing::info!(
            value,
            voxels = points.len(),
            period = fit.period,
            phase = fit.phase,
            contacts = fit.centres.len(),
            "Fitted electrode periodicity"
        );
        Ok(fit)
    }

    /// Fit a periodic contact grid to a point cloud.
    ///
    /// # Errors
    ///
    /// `EmptyInput` for no points or a degenerate histogram, `SvdFailed`.
    #[allow(clippy::cast_precision_loss)]
    pub fn fit_points(
        &self,
        points: &[Position],
        observer: Option<&mut dyn PeriodicityObserver>,
    ) -> Result<PeriodicFit, NumericError> {
        if points.is_empty() {
            return Err(NumericError::EmptyInput { what: "electrode voxels" });
        }
        if self.periods.is_empty() {
            return Err(NumericError::EmptyInput { what: "candidate periods" });
        }

        let mean = points.iter().fold(Position::zeros(), |acc, p| acc + p) / points.len() as f64;
        let axis = principal_axis(points, &mean)?;
        let xi: Vec<f64> = points.iter().map(|p| (p - mean).dot(&axis)).collect();
        let (xmin, xmax) = xi
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| (lo.min(x), hi.max(x)));

        let bw = self.config.bin_width;
        let (bin_centres, counts) = histogram(&xi, xmin - 0.5, xmax + 0.5, bw);
        if counts.is_empty() {
            return Err(NumericError::EmptyInput { what: "histogram bins" });
        }

        let sums: Vec<Complex<f64>> = self
            .periods
            .iter()
            .map(|&w| fourier_sum(&bin_centres, &counts, 1.0 / w, bw))
            .collect();
        let spectrum: Vec<f64> = sums.iter().map(|b| b.norm()).collect();

        // First maximum wins ties
        let best = spectrum
            .iter()
            .enumerate()
            .fold(0, |best, (i, &m)| if m > spectrum[best] { i } else { best });
        let period = self.periods[best];
        let phase = sums[best].arg();
        tracing::debug!(period, phase, magnitude = spectrum[best], "Selected contact period");

        let offset = -phase / (2.0 * PI / period);
        let mut grid: Vec<f64> = arange(-offset, -xmin, period)
            .into_iter()
            .map(|x| -x)
            .chain(arange(offset, xmax, period).into_iter().skip(1))
            .collect();
        grid.sort_by(f64::total_cmp);

        if let Some(observer) = observer {
            observer.observe(&PeriodicityDiagnostics {
                bin_centres: &bin_centres,
                counts: &counts,
                periods: &self.periods,
                spectrum: &spectrum,
                grid: &grid,
                period,
                phase,
            });
        }

        Ok(PeriodicFit {
            centres: grid.iter().map(|&x| mean + axis * x).collect(),
            period,
            phase,
            axis,
            mean,
        })
    }
}

impl Default for PeriodicityDetector {
    fn default() -> Self {
        Self::new(PeriodicityConfig::default())
    }
}

/// Fit the contact centres of the object labelled `value` with the default
/// period range.
///
/// # Errors
///
/// See [`PeriodicityDetector::fit`].
pub fn periodic_xyz_for_object(
    volume: &LabelVolume,
    value: i32,
    affine: &dyn CoordinateTransform,
    bin_width: f64,
) -> ForwardResult<PeriodicFit> {
    let detector = PeriodicityDetector::new(PeriodicityConfig {
        bin_width,
        ..PeriodicityConfig::default()
    });
    detector.fit(volume, value, affine, None)
}

/// First right singular vector (largest singular value) of the centred points.
fn principal_axis(points: &[Position], mean: &Position) -> Result<Position, NumericError> {
    let centred = DMatrix::from_fn(points.len(), 3, |r, c| points[r][c] - mean[c]);
    let svd = centred.svd(false, true);
    let v_t = svd.v_t.ok_or(NumericError::SvdFailed)?;
    let k = svd.singular_values.imax();
    Ok(Position::new(v_t[(k, 0)], v_t[(k, 1)], v_t[(k, 2)]))
}

/// Histogram over bins of width `bw` from `start` to below `stop`.
///
/// Returns bin centres and counts. The last bin is closed on the right and
/// values beyond the last edge are ignored.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn histogram(values: &[f64], start: f64, stop: f64, bw: f64) -> (Vec<f64>, Vec<f64>) {
    let edges = arange(start, stop, bw);
    if edges.len() < 2 {
        return (Vec::new(), Vec::new());
    }
    let nbins = edges.len() - 1;
    let last = edges[nbins];
    let mut counts = vec![0.0; nbins];

    for &x in values {
        if x < edges[0] || x > last {
            continue;
        }
        let mut bin = (((x - edges[0]) / bw).floor() as usize).min(nbins - 1);
        // Correct floating-point drift against the actual edges
        if bin > 0 && x < edges[bin] {
            bin -= 1;
        } else if bin + 1 < nbins && x >= edges[bin + 1] {
            bin += 1;
        }
        counts[bin] += 1.0;
    }

    let centres = edges[..nbins].iter().map(|e| e + bw / 2.0).collect();
    (centres, counts)
}

/// `Σ exp(−2πi·c·f) · n · bw` over histogram bins.
fn fourier_sum(centres: &[f64], counts: &[f64], freq: f64, bw: f64) -> Complex<f64> {
    centres
        .iter()
        .zip(counts)
        .filter(|&(_, &n)| n > 0.0)
        .map(|(&c, &n)| Complex::from_polar(n * bw, -2.0 * PI * c * freq))
        .sum()
}
