//! SEEG gain matrices
//!
//! A gain matrix maps source activity to sensor potentials, one row per
//! sensor. Two forward models are available:
//!
//! | Model           | Entry (s, v)                                  |
//! |-----------------|-----------------------------------------------|
//! | `Dipole`        | `area_v · (o_v · a) / (‖a‖³ · 4πσ)`           |
//! | `InverseSquare` | `area_v / ‖a‖²`                               |
//!
//! with `a = sensor_s − vertex_v`. Surface gain matrices are aggregated to
//! regions through a 0/1 vertex-to-region matrix.

use std::f64::consts::PI;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use nalgebra::DMatrix;
use seeg_core::math::percentile;
use seeg_core::{NumericError, Position};
use seeg_mesh::Surface;
use serde::{Deserialize, Serialize};

use crate::config::GainConfig;
use crate::error::{ForwardError, ForwardResult};
use crate::io::{self, DirectoryArchive};

// ============================================================================
// Forward models
// ============================================================================

/// Source model used for gain computation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForwardModel {
    /// Oriented current dipoles in an infinite homogeneous medium
    #[default]
    Dipole,
    /// Orientation-free inverse-square falloff
    InverseSquare,
}

impl ForwardModel {
    /// Gain of `sources` at `sensors`.
    ///
    /// # Errors
    ///
    /// `MissingOrientations` for the dipole model without orientations,
    /// `ShapeMismatch` when the source arrays disagree in length.
    pub fn gain(self, sources: &Sources<'_>, sensors: &[Position], conductivity: f64) -> ForwardResult<DMatrix<f64>> {
        match self {
            Self::Dipole => {
                let orientations = sources.orientations.ok_or(ForwardError::MissingOrientations)?;
                gain_matrix_dipole(sources.positions, orientations, sources.areas, sensors, conductivity)
            }
            Self::InverseSquare => gain_matrix_inv_square(sources.positions, sources.areas, sensors),
        }
    }
}

impl fmt::Display for ForwardModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dipole => write!(f, "dipole"),
            Self::InverseSquare => write!(f, "inverse_square"),
        }
    }
}

impl FromStr for ForwardModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "dipole" => Ok(Self::Dipole),
            "inverse_square" | "inv_square" => Ok(Self::InverseSquare),
            other => Err(format!("unknown forward model '{other}' (expected dipole or inverse_square)")),
        }
    }
}

/// Source positions with their weights and optional orientations.
#[derive(Clone, Copy, Debug)]
pub struct Sources<'a> {
    /// Source positions
    pub positions: &'a [Position],
    /// Unit orientation per source, required by the dipole model
    pub orientations: Option<&'a [Position]>,
    /// Area (weight) per source
    pub areas: &'a [f64],
}

fn check_len(what: &'static str, expected: usize, found: usize) -> ForwardResult<()> {
    if expected == found {
        Ok(())
    } else {
        Err(ForwardError::ShapeMismatch { what, expected, found })
    }
}

/// Dipole gain matrix, sensors × vertices.
///
/// # Errors
///
/// `ShapeMismatch` when orientations or areas do not match the vertices.
pub fn gain_matrix_dipole(
    vertices: &[Position],
    orientations: &[Position],
    areas: &[f64],
    sensors: &[Position],
    conductivity: f64,
) -> ForwardResult<DMatrix<f64>> {
    check_len("dipole orientations", vertices.len(), orientations.len())?;
    check_len("vertex areas", vertices.len(), areas.len())?;

    let denom = 4.0 * PI * conductivity;
    Ok(DMatrix::from_fn(sensors.len(), vertices.len(), |s, v| {
        let a = sensors[s] - vertices[v];
        let na = a.norm();
        areas[v] * orientations[v].dot(&a) / (na * na * na * denom)
    }))
}

/// Inverse-square gain matrix, sensors × vertices.
///
/// # Errors
///
/// `ShapeMismatch` when areas do not match the vertices.
pub fn gain_matrix_inv_square(vertices: &[Position], areas: &[f64], sensors: &[Position]) -> ForwardResult<DMatrix<f64>> {
    check_len("vertex areas", vertices.len(), areas.len())?;

    Ok(DMatrix::from_fn(sensors.len(), vertices.len(), |s, v| {
        areas[v] / (sensors[s] - vertices[v]).norm_squared()
    }))
}

/// 0/1 matrix with a one at `(v, region_mapping[v])`; negative entries leave
/// the row empty.
///
/// # Errors
///
/// `ShapeMismatch` for a mapping longer than `nvertices`,
/// `RegionOutOfRange` for an index ≥ `nregions`.
pub fn verts_regions_matrix(nvertices: usize, nregions: usize, region_mapping: &[i64]) -> ForwardResult<DMatrix<f64>> {
    if region_mapping.len() > nvertices {
        return Err(ForwardError::ShapeMismatch {
            what: "region mapping",
            expected: nvertices,
            found: region_mapping.len(),
        });
    }

    let mut matrix = DMatrix::zeros(nvertices, nregions);
    for (vertex, &region) in region_mapping.iter().enumerate() {
        let Ok(col) = usize::try_from(region) else {
            continue;
        };
        if col >= nregions {
            return Err(ForwardError::RegionOutOfRange { vertex, region, nregions });
        }
        matrix[(vertex, col)] = 1.0;
    }
    Ok(matrix)
}

/// Divide by the given percentile of the absolute entries.
///
/// `None` and `Some(0.0)` leave the matrix unchanged.
///
/// # Errors
///
/// `ZeroScale` when the percentile is zero, `InvalidPercentile` outside
/// [0, 100], `EmptyInput` for an empty matrix.
pub fn normalize_gain_matrix(matrix: DMatrix<f64>, percentile_q: Option<f64>) -> Result<DMatrix<f64>, NumericError> {
    let q = match percentile_q {
        Some(q) if q != 0.0 => q,
        _ => return Ok(matrix),
    };
    let magnitudes: Vec<f64> = matrix.iter().map(|v| v.abs()).collect();
    let scale = percentile(&magnitudes, q)?;
    if scale == 0.0 {
        return Err(NumericError::ZeroScale { percentile: q });
    }
    tracing::debug!(percentile = q, scale, "Normalizing gain matrix");
    Ok(matrix / scale)
}

// ============================================================================
// Pipelines
// ============================================================================

/// Input files of the surface pipeline.
#[derive(Clone, Debug)]
pub struct SurfaceGainInputs {
    /// Contact table (label x y z)
    pub sensors: PathBuf,
    /// Unpacked cortical surface archive
    pub cortical_surface: PathBuf,
    /// Unpacked subcortical surface archive
    pub subcortical_surface: PathBuf,
    /// Cortical region mapping, one index per vertex
    pub cortical_region_mapping: PathBuf,
    /// Subcortical region mapping, one index per vertex
    pub subcortical_region_mapping: PathBuf,
}

impl SurfaceGainInputs {
    fn paths(&self) -> [&Path; 5] {
        [
            &self.sensors,
            &self.cortical_surface,
            &self.subcortical_surface,
            &self.cortical_region_mapping,
            &self.subcortical_region_mapping,
        ]
    }
}

/// Input files of the region pipeline.
#[derive(Clone, Debug)]
pub struct RegionGainInputs {
    /// Contact table (label x y z)
    pub sensors: PathBuf,
    /// Region centres table (label x y z)
    pub centres: PathBuf,
    /// Region areas, one per line
    pub areas: PathBuf,
}

/// Gain matrix pipelines
pub struct GainMatrixEngine {
    config: GainConfig,
}

impl GainMatrixEngine {
    /// Create an engine.
    #[must_use]
    pub const fn new(config: GainConfig) -> Self {
        Self { config }
    }

    /// Engine settings
    #[must_use]
    pub const fn config(&self) -> &GainConfig {
        &self.config
    }

    /// Region gain from in-memory surfaces.
    ///
    /// The cortical surface uses `model` with vertex normals as orientations;
    /// the subcortical surface always uses the inverse-square model.
    ///
    /// # Errors
    ///
    /// Shape, region-index and normalization errors.
    pub fn surface_gain(
        &self,
        sensors: &[Position],
        cortical: &Surface,
        subcortical: &Surface,
        cortical_mapping: &[i64],
        subcortical_mapping: &[i64],
        model: ForwardModel,
    ) -> ForwardResult<DMatrix<f64>> {
        check_len("cortical region mapping", cortical.len(), cortical_mapping.len())?;
        check_len("subcortical region mapping", subcortical.len(), subcortical_mapping.len())?;

        let mapping: Vec<i64> = cortical_mapping.iter().chain(subcortical_mapping).copied().collect();
        let nregions = mapping
            .iter()
            .filter_map(|&r| usize::try_from(r).ok())
            .max()
            .map_or(0, |m| m + 1);
        let nverts = mapping.len();
        let vrm = verts_regions_matrix(nverts, nregions, &mapping)?;

        let normals = cortical.vertex_normals();
        let cort_areas = cortical.vertex_areas();
        let cort_gain = model.gain(
            &Sources {
                positions: cortical.vertices(),
                orientations: Some(&normals),
                areas: &cort_areas,
            },
            sensors,
            self.config.conductivity,
        )?;
        let sub_gain = gain_matrix_inv_square(subcortical.vertices(), &subcortical.vertex_areas(), sensors)?;

        let mut total = DMatrix::zeros(sensors.len(), nverts);
        total.columns_mut(0, cortical.len()).copy_from(&cort_gain);
        total.columns_mut(cortical.len(), subcortical.len()).copy_from(&sub_gain);

        tracing::info!(
            sensors = sensors.len(),
            vertices = nverts,
            regions = nregions,
            model = %model,
            "Aggregating surface gain to regions"
        );
        Ok(normalize_gain_matrix(total * vrm, self.config.normalize_percentile)?)
    }

    /// Inverse-square gain of region centres weighted by region area.
    ///
    /// # Errors
    ///
    /// Shape and normalization errors.
    pub fn region_gain(&self, sensors: &[Position], centres: &[Position], areas: &[f64]) -> ForwardResult<DMatrix<f64>> {
        let gain = gain_matrix_inv_square(centres, areas, sensors)?;
        Ok(normalize_gain_matrix(gain, self.config.normalize_percentile)?)
    }

    /// Surface pipeline: read inputs, compute the region gain, write it.
    ///
    /// # Errors
    ///
    /// `MissingInput` before any computation, then read, shape and
    /// normalization errors. Nothing is written on failure.
    pub fn compute_seeg_gain_matrix(
        &self,
        inputs: &SurfaceGainInputs,
        out: &Path,
        model: ForwardModel,
    ) -> ForwardResult<DMatrix<f64>> {
        io::require_inputs(&inputs.paths())?;

        let sensors = io::read_positions(&inputs.sensors)?;
        let cortical = io::load_surface(&DirectoryArchive::open(&inputs.cortical_surface)?)?;
        let subcortical = io::load_surface(&DirectoryArchive::open(&inputs.subcortical_surface)?)?;
        let cortical_mapping = io::read_region_mapping(&inputs.cortical_region_mapping)?;
        let subcortical_mapping = io::read_region_mapping(&inputs.subcortical_region_mapping)?;

        let gain = self.surface_gain(
            &sensors,
            &cortical,
            &subcortical,
            &cortical_mapping,
            &subcortical_mapping,
            model,
        )?;
        io::write_matrix(out, &gain)?;
        Ok(gain)
    }

    /// Surface pipeline with the dipole model for cortex.
    ///
    /// # Errors
    ///
    /// See [`GainMatrixEngine::compute_seeg_gain_matrix`].
    pub fn compute_seeg_dipole_gain_matrix(&self, inputs: &SurfaceGainInputs, out: &Path) -> ForwardResult<DMatrix<f64>> {
        self.compute_seeg_gain_matrix(inputs, out, ForwardModel::Dipole)
    }

    /// Surface pipeline with the inverse-square model for cortex.
    ///
    /// # Errors
    ///
    /// See [`GainMatrixEngine::compute_seeg_gain_matrix`].
    pub fn compute_seeg_inv_square_gain_matrix(
        &self,
        inputs: &SurfaceGainInputs,
        out: &Path,
    ) -> ForwardResult<DMatrix<f64>> {
        self.compute_seeg_gain_matrix(inputs, out, ForwardModel::InverseSquare)
    }

    /// Region pipeline: inverse-square gain of region centres.
    ///
    /// # Errors
    ///
    /// `MissingInput` before any computation, then read, shape and
    /// normalization errors. Nothing is written on failure.
    pub fn compute_seeg_regions_inv_square_gain_matrix(
        &self,
        inputs: &RegionGainInputs,
        out: &Path,
    ) -> ForwardResult<DMatrix<f64>> {
        io::require_inputs(&[&inputs.sensors, &inputs.centres, &inputs.areas])?;

        let sensors = io::read_positions(&inputs.sensors)?;
        let centres = io::read_positions(&inputs.centres)?;
        let areas: Vec<f64> = io::read_first_column(&inputs.areas)?;

        let gain = self.region_gain(&sensors, &centres, &areas)?;
        tracing::info!(sensors = sensors.len(), regions = centres.len(), "Computed region gain");
        io::write_matrix(out, &gain)?;
        Ok(gain)
    }
}

impl Default for GainMatrixEngine {
    fn default() -> Self {
        Self::new(GainConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn raw_config() -> GainConfig {
        GainConfig {
            normalize_percentile: None,
            ..GainConfig::default()
        }
    }

    #[test]
    fn test_dipole_on_axis() {
        let g = gain_matrix_dipole(
            &[Position::zeros()],
            &[Position::z()],
            &[1.0],
            &[Position::new(0.0, 0.0, 1.0)],
            1.0,
        )
        .unwrap();
        assert!((g[(0, 0)] - 1.0 / (4.0 * PI)).abs() < 1e-12);

        // Orthogonal sensor sees nothing
        let g = gain_matrix_dipole(&[Position::zeros()], &[Position::z()], &[1.0], &[Position::x()], 1.0).unwrap();
        assert!(g[(0, 0)].abs() < 1e-15);
    }

    #[test]
    fn test_inv_square() {
        let g = gain_matrix_inv_square(
            &[Position::zeros(), Position::new(1.0, 0.0, 0.0)],
            &[2.0, 1.0],
            &[Position::new(0.0, 0.0, 2.0)],
        )
        .unwrap();
        assert_eq!(g.shape(), (1, 2));
        assert!((g[(0, 0)] - 0.5).abs() < 1e-12);
        assert!((g[(0, 1)] - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_model_dispatch() {
        let positions = [Position::zeros()];
        let sources = Sources {
            positions: &positions,
            orientations: None,
            areas: &[1.0],
        };
        let sensors = [Position::new(0.0, 0.0, 1.0)];

        assert!(matches!(
            ForwardModel::Dipole.gain(&sources, &sensors, 1.0),
            Err(ForwardError::MissingOrientations)
        ));
        let g = ForwardModel::InverseSquare.gain(&sources, &sensors, 1.0).unwrap();
        assert_eq!(g[(0, 0)], 1.0);

        assert!(matches!(
            gain_matrix_inv_square(&positions, &[1.0, 2.0], &sensors),
            Err(ForwardError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_model_parse() {
        assert_eq!("dipole".parse::<ForwardModel>().unwrap(), ForwardModel::Dipole);
        assert_eq!("inverse-square".parse::<ForwardModel>().unwrap(), ForwardModel::InverseSquare);
        assert!("monopole".parse::<ForwardModel>().is_err());
        assert_eq!(ForwardModel::InverseSquare.to_string(), "inverse_square");
    }

    #[test]
    fn test_verts_regions_matrix() {
        let m = verts_regions_matrix(5, 3, &[0, 2, -1, 2]).unwrap();
        assert_eq!(m.shape(), (5, 3));
        for row in m.row_iter() {
            assert!(row.sum() <= 1.0);
        }
        let col_sums: Vec<f64> = m.column_iter().map(|c| c.sum()).collect();
        assert_eq!(col_sums, vec![1.0, 0.0, 2.0]);

        assert!(matches!(
            verts_regions_matrix(2, 3, &[0, 3]),
            Err(ForwardError::RegionOutOfRange { vertex: 1, region: 3, .. })
        ));
        assert!(matches!(
            verts_regions_matrix(1, 3, &[0, 1]),
            Err(ForwardError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_normalize() {
        let m = DMatrix::from_row_slice(2, 2, &[1.0, -4.0, 2.0, 0.5]);

        let n = normalize_gain_matrix(m.clone(), Some(100.0)).unwrap();
        assert!((n.amax() - 1.0).abs() < 1e-12);
        assert_eq!(n[(0, 1)], -1.0);

        let scaled = normalize_gain_matrix(&m * -3.0, Some(100.0)).unwrap();
        assert!((scaled + &n).amax() < 1e-12);

        assert_eq!(normalize_gain_matrix(m.clone(), None).unwrap(), m);
        assert_eq!(normalize_gain_matrix(m.clone(), Some(0.0)).unwrap(), m);

        assert!(matches!(
            normalize_gain_matrix(DMatrix::zeros(2, 2), Some(100.0)),
            Err(NumericError::ZeroScale { .. })
        ));
    }

    fn write_surface(dir: &Path, vertices: &str) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(dir.join("vertices.txt"), vertices).unwrap();
        std::fs::write(dir.join("triangles.txt"), "0 1 2\n").unwrap();
    }

    fn surface_inputs(root: &Path) -> SurfaceGainInputs {
        write_surface(&root.join("cort"), "0 0 0\n1 0 0\n0 1 0\n");
        write_surface(&root.join("subcort"), "0 0 -5\n1 0 -5\n0 1 -5\n");
        std::fs::write(root.join("seeg.xyz"), "A1 0.2 0.2 3\nA2 0.2 0.2 -2\n").unwrap();
        std::fs::write(root.join("rm_cort.txt"), "1\n1\n-1\n").unwrap();
        std::fs::write(root.join("rm_subcort.txt"), "2\n3\n3\n").unwrap();
        SurfaceGainInputs {
            sensors: root.join("seeg.xyz"),
            cortical_surface: root.join("cort"),
            subcortical_surface: root.join("subcort"),
            cortical_region_mapping: root.join("rm_cort.txt"),
            subcortical_region_mapping: root.join("rm_subcort.txt"),
        }
    }

    #[test]
    fn test_surface_pipeline_aggregates_by_region() {
        let dir = tempdir().unwrap();
        let inputs = surface_inputs(dir.path());
        let out = dir.path().join("gain.txt");

        let engine = GainMatrixEngine::new(raw_config());
        let gain = engine.compute_seeg_inv_square_gain_matrix(&inputs, &out).unwrap();
        assert_eq!(gain.shape(), (2, 4));
        assert!(out.exists());

        let sensors = io::read_positions(&inputs.sensors).unwrap();
        let sub = io::load_surface(&DirectoryArchive::open(&inputs.subcortical_surface).unwrap()).unwrap();
        let per_vertex = gain_matrix_inv_square(sub.vertices(), &sub.vertex_areas(), &sensors).unwrap();

        // Region 0 unused, region 3 holds subcortical vertices 1 and 2
        assert_eq!(gain.column(0).amax(), 0.0);
        for s in 0..2 {
            let expected = per_vertex[(s, 1)] + per_vertex[(s, 2)];
            assert!((gain[(s, 3)] - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn test_surface_pipeline_normalized_dipole() {
        let dir = tempdir().unwrap();
        let inputs = surface_inputs(dir.path());
        let out = dir.path().join("gain.txt");

        let gain = GainMatrixEngine::default()
            .compute_seeg_dipole_gain_matrix(&inputs, &out)
            .unwrap();
        assert!((gain.amax() - 1.0).abs() < 1e-12);

        let text = std::fs::read_to_string(&out).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert_eq!(text.lines().next().unwrap().split_whitespace().count(), 4);
    }

    #[test]
    fn test_missing_input_writes_nothing() {
        let dir = tempdir().unwrap();
        let mut inputs = surface_inputs(dir.path());
        inputs.subcortical_region_mapping = dir.path().join("absent.txt");
        let out = dir.path().join("gain.txt");

        let result = GainMatrixEngine::default().compute_seeg_dipole_gain_matrix(&inputs, &out);
        assert!(matches!(result, Err(ForwardError::MissingInput { .. })));
        assert!(!out.exists());
    }

    #[test]
    fn test_region_pipeline() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("seeg.xyz"), "A1 0 0 2\n").unwrap();
        std::fs::write(dir.path().join("centres.txt"), "r0 0 0 0\nr1 0 0 1\n").unwrap();
        std::fs::write(dir.path().join("areas.txt"), "4.0\n3.0\n").unwrap();
        let inputs = RegionGainInputs {
            sensors: dir.path().join("seeg.xyz"),
            centres: dir.path().join("centres.txt"),
            areas: dir.path().join("areas.txt"),
        };
        let out = dir.path().join("gain_regions.txt");

        let raw = GainMatrixEngine::new(raw_config())
            .compute_seeg_regions_inv_square_gain_matrix(&inputs, &out)
            .unwrap();
        assert_eq!(raw, DMatrix::from_row_slice(1, 2, &[1.0, 3.0]));

        let normalized = GainMatrixEngine::default()
            .compute_seeg_regions_inv_square_gain_matrix(&inputs, &out)
            .unwrap();
        assert!((normalized[(0, 1)] - 1.0).abs() < 1e-12);
        assert!((normalized[(0, 0)] - 1.0 / 3.0).abs() < 1e-12);
    }
}
