//! Coordinate transforms between image and physical space.

use std::path::Path;

use nalgebra::{Matrix4, Point3};
use seeg_core::Position;
use serde::{Deserialize, Serialize};

use crate::error::{ForwardError, ForwardResult};

/// Maps a point from one coordinate frame into another.
pub trait CoordinateTransform {
    /// Transform a single point.
    fn transform_coords(&self, point: &Position) -> Position;
}

/// Homogeneous 4×4 affine transform.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AffineTransform {
    matrix: Matrix4<f64>,
}

impl AffineTransform {
    /// Wrap a homogeneous matrix.
    #[must_use]
    pub const fn new(matrix: Matrix4<f64>) -> Self {
        Self { matrix }
    }

    /// Identity transform.
    #[must_use]
    pub fn identity() -> Self {
        Self::new(Matrix4::identity())
    }

    /// Load a whitespace-delimited text file of 4 rows × 4 columns.
    ///
    /// Blank lines and `#` comments are skipped.
    ///
    /// # Errors
    ///
    /// `MissingInput`, `Io`, or `Format` when the file is not 4×4 numbers.
    pub fn from_file(path: &Path) -> ForwardResult<Self> {
        if !path.exists() {
            return Err(ForwardError::MissingInput { path: path.to_path_buf() });
        }
        let text = std::fs::read_to_string(path).map_err(ForwardError::io(path))?;
        let format_err = |line: usize, reason: String| ForwardError::Format {
            path: path.to_path_buf(),
            line,
            reason,
        };

        let mut values = Vec::with_capacity(16);
        let mut rows = 0;
        for (i, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let row = line
                .split_whitespace()
                .map(str::parse::<f64>)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| format_err(i + 1, e.to_string()))?;
            if row.len() != 4 {
                return Err(format_err(i + 1, format!("expected 4 columns, found {}", row.len())));
            }
            rows += 1;
            if rows > 4 {
                return Err(format_err(i + 1, "expected 4 rows".to_string()));
            }
            values.extend(row);
        }
        if rows != 4 {
            return Err(format_err(0, format!("expected 4 rows, found {rows}")));
        }

        Ok(Self::new(Matrix4::from_row_slice(&values)))
    }

    /// The homogeneous matrix.
    #[must_use]
    pub const fn matrix(&self) -> &Matrix4<f64> {
        &self.matrix
    }

    /// Map a voxel index triple to physical space.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn voxel_to_physical(&self, index: [usize; 3]) -> Position {
        self.transform_coords(&Position::new(index[0] as f64, index[1] as f64, index[2] as f64))
    }
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl CoordinateTransform for AffineTransform {
    fn transform_coords(&self, point: &Position) -> Position {
        self.matrix.transform_point(&Point3::from(*point)).coords
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_identity() {
        let p = Position::new(1.0, -2.0, 3.5);
        assert_eq!(AffineTransform::identity().transform_coords(&p), p);
    }

    #[test]
    fn test_scale_and_translate() {
        let m = Matrix4::new(
            2.0, 0.0, 0.0, 10.0, //
            0.0, 2.0, 0.0, 20.0, //
            0.0, 0.0, 2.0, 30.0, //
            0.0, 0.0, 0.0, 1.0,
        );
        let t = AffineTransform::new(m);
        assert_eq!(t.voxel_to_physical([1, 2, 3]), Position::new(12.0, 24.0, 36.0));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# scanner affine").unwrap();
        writeln!(file, "1 0 0 -5").unwrap();
        writeln!(file, "0 1 0 0").unwrap();
        writeln!(file, "0 0 1 5").unwrap();
        writeln!(file, "0 0 0 1").unwrap();

        let t = AffineTransform::from_file(file.path()).unwrap();
        assert_eq!(
            t.transform_coords(&Position::new(1.0, 1.0, 1.0)),
            Position::new(-4.0, 1.0, 6.0)
        );
    }

    #[test]
    fn test_from_file_wrong_shape() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "1 0 0").unwrap();
        let result = AffineTransform::from_file(file.path());
        assert!(matches!(result, Err(ForwardError::Format { line: 1, .. })));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "1 0 0 0").unwrap();
        let result = AffineTransform::from_file(file.path());
        assert!(matches!(result, Err(ForwardError::Format { .. })));
    }
}
