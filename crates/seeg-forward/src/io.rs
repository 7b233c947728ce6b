//! Plain-text table readers and writers, and surface field archives.
//!
//! All tables are whitespace-delimited. Blank lines and lines starting with
//! `#` are skipped when reading.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use nalgebra::DMatrix;
use seeg_core::Position;
use seeg_mesh::Surface;

use crate::error::{ForwardError, ForwardResult};

/// Fail with `MissingInput` for the first path that does not exist.
///
/// # Errors
///
/// `MissingInput`.
pub fn require_inputs<P: AsRef<Path>>(paths: &[P]) -> ForwardResult<()> {
    for path in paths {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ForwardError::MissingInput { path: path.to_path_buf() });
        }
    }
    Ok(())
}

/// Read a whole file, reporting a missing file as `MissingInput`.
///
/// # Errors
///
/// `MissingInput` or `Io`.
pub fn read_text(path: &Path) -> ForwardResult<String> {
    require_inputs(&[path])?;
    std::fs::read_to_string(path).map_err(ForwardError::io(path))
}

/// Write a whole file.
///
/// # Errors
///
/// `Io`.
pub fn write_text(path: &Path, text: &str) -> ForwardResult<()> {
    std::fs::write(path, text).map_err(ForwardError::io(path))
}

/// Non-comment rows as `(1-based line number, fields)`.
fn data_rows(text: &str) -> impl Iterator<Item = (usize, Vec<&str>)> {
    text.lines().enumerate().filter_map(|(i, line)| {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            None
        } else {
            Some((i + 1, line.split_whitespace().collect()))
        }
    })
}

fn parse_field<T: std::str::FromStr>(path: &Path, line: usize, col: usize, field: &str) -> ForwardResult<T> {
    field.parse().map_err(|_| ForwardError::Format {
        path: path.to_path_buf(),
        line,
        reason: format!("column {col}: '{field}' is not a valid number"),
    })
}

fn too_short(path: &Path, line: usize, need: usize, found: usize) -> ForwardError {
    ForwardError::Format {
        path: path.to_path_buf(),
        line,
        reason: format!("expected at least {need} columns, found {found}"),
    }
}

/// Read a labelled position table: column 0 is a label, columns 1–3 are xyz.
///
/// # Errors
///
/// `MissingInput`, `Io` or `Format`.
pub fn read_labeled_positions(path: &Path) -> ForwardResult<(Vec<String>, Vec<Position>)> {
    let text = read_text(path)?;
    let mut labels = Vec::new();
    let mut positions = Vec::new();
    for (line, fields) in data_rows(&text) {
        if fields.len() < 4 {
            return Err(too_short(path, line, 4, fields.len()));
        }
        let mut xyz = [0.0; 3];
        for (k, v) in xyz.iter_mut().enumerate() {
            *v = parse_field(path, line, k + 1, fields[k + 1])?;
        }
        labels.push(fields[0].to_string());
        positions.push(Position::from(xyz));
    }
    tracing::debug!(path = %path.display(), rows = positions.len(), "Read position table");
    Ok((labels, positions))
}

/// Read columns 1–3 of a labelled position table.
///
/// # Errors
///
/// See [`read_labeled_positions`].
pub fn read_positions(path: &Path) -> ForwardResult<Vec<Position>> {
    read_labeled_positions(path).map(|(_, positions)| positions)
}

/// Read column 0 of a table.
///
/// # Errors
///
/// `MissingInput`, `Io` or `Format`.
pub fn read_first_column<T: std::str::FromStr>(path: &Path) -> ForwardResult<Vec<T>> {
    let text = read_text(path)?;
    data_rows(&text)
        .map(|(line, fields)| parse_field(path, line, 0, fields[0]))
        .collect()
}

/// Read a per-vertex region mapping; negative entries mean unmapped.
///
/// Integral floats such as `3.0` are accepted.
///
/// # Errors
///
/// `MissingInput`, `Io` or `Format`.
#[allow(clippy::cast_possible_truncation)]
pub fn read_region_mapping(path: &Path) -> ForwardResult<Vec<i64>> {
    let text = read_text(path)?;
    data_rows(&text)
        .map(|(line, fields)| {
            let field = fields[0];
            field.parse::<i64>().or_else(|_| {
                let value: f64 = parse_field(path, line, 0, field)?;
                if value.fract() == 0.0 {
                    Ok(value as i64)
                } else {
                    Err(ForwardError::Format {
                        path: path.to_path_buf(),
                        line,
                        reason: format!("region index '{field}' is not an integer"),
                    })
                }
            })
        })
        .collect()
}

/// Read an `index name ...` lookup table, e.g. a FreeSurfer colour table.
///
/// Columns after the name are ignored.
///
/// # Errors
///
/// `MissingInput`, `Io` or `Format`.
pub fn read_lut(path: &Path) -> ForwardResult<BTreeMap<usize, String>> {
    let text = read_text(path)?;
    let mut lut = BTreeMap::new();
    for (line, fields) in data_rows(&text) {
        if fields.len() < 2 {
            return Err(too_short(path, line, 2, fields.len()));
        }
        let index = parse_field(path, line, 0, fields[0])?;
        lut.insert(index, fields[1].to_string());
    }
    Ok(lut)
}

/// Format a float as C `%.18e`, with a signed two-digit exponent (`1.5e+00` style).
#[must_use]
pub fn format_sci(value: f64) -> String {
    let s = format!("{value:.18e}");
    match s.split_once('e') {
        Some((mantissa, exp)) => {
            let (sign, digits) = exp.strip_prefix('-').map_or(("+", exp), |d| ("-", d));
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => s.to_lowercase(),
    }
}

/// Write a matrix, one row per line, `%.18e` floats separated by spaces.
///
/// # Errors
///
/// `Io`.
pub fn write_matrix(path: &Path, matrix: &DMatrix<f64>) -> ForwardResult<()> {
    let mut out = String::with_capacity(matrix.len() * 26);
    for row in matrix.row_iter() {
        let line: Vec<String> = row.iter().map(|&v| format_sci(v)).collect();
        out.push_str(&line.join(" "));
        out.push('\n');
    }
    write_text(path, &out)?;
    tracing::info!(
        path = %path.display(),
        rows = matrix.nrows(),
        cols = matrix.ncols(),
        "Wrote matrix"
    );
    Ok(())
}

/// Write a region mapping, one index per line, `-1` for unmapped vertices.
///
/// # Errors
///
/// `Io`.
pub fn write_region_mapping(path: &Path, mapping: &[i64]) -> ForwardResult<()> {
    let mut out = String::with_capacity(mapping.len() * 4);
    for index in mapping {
        let _ = writeln!(out, "{index}");
    }
    write_text(path, &out)
}

/// Write a lookup table as `index name` lines.
///
/// # Errors
///
/// `Io`.
pub fn write_lut<'a>(path: &Path, entries: impl IntoIterator<Item = (usize, &'a str)>) -> ForwardResult<()> {
    let mut out = String::new();
    for (index, name) in entries {
        let _ = writeln!(out, "{index} {name}");
    }
    write_text(path, &out)
}

// ============================================================================
// Field archives
// ============================================================================

/// Named text fields, e.g. the `vertices.txt` and `triangles.txt` members of
/// a surface archive.
pub trait FieldArchive {
    /// Read a field by name.
    ///
    /// # Errors
    ///
    /// `MissingInput` when the field does not exist, `Io` on read failure.
    fn read_field(&self, name: &str) -> ForwardResult<String>;

    /// Where the archive lives, for messages.
    fn location(&self) -> &Path;
}

/// An unpacked archive: each field is a file inside a directory.
#[derive(Clone, Debug)]
pub struct DirectoryArchive {
    root: PathBuf,
}

impl DirectoryArchive {
    /// Open a directory archive.
    ///
    /// # Errors
    ///
    /// `MissingInput` if the directory does not exist.
    pub fn open(root: impl Into<PathBuf>) -> ForwardResult<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(ForwardError::MissingInput { path: root });
        }
        Ok(Self { root })
    }
}

impl FieldArchive for DirectoryArchive {
    fn read_field(&self, name: &str) -> ForwardResult<String> {
        read_text(&self.root.join(name))
    }

    fn location(&self) -> &Path {
        &self.root
    }
}

/// Load a triangle surface from an archive's `vertices.txt` and
/// `triangles.txt` fields.
///
/// # Errors
///
/// Field read failures and surface validation errors.
pub fn load_surface(archive: &dyn FieldArchive) -> ForwardResult<Surface> {
    let vertices = archive.read_field("vertices.txt")?;
    let triangles = archive.read_field("triangles.txt")?;
    let surface = Surface::from_fields(&vertices, &triangles)?;
    tracing::debug!(
        archive = %archive.location().display(),
        vertices = surface.len(),
        triangles = surface.triangles().len(),
        "Loaded surface"
    );
    Ok(surface)
}
