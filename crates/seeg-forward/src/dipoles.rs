//! Dipole source files (`x y z ox oy oz` per row).

use std::fmt::Write as _;
use std::path::Path;

use seeg_core::Position;
use seeg_mesh::Surface;

use crate::error::{ForwardError, ForwardResult};
use crate::io;

/// Where dipole orientations come from.
#[derive(Clone, Copy, Debug)]
pub enum OrientationSource<'a> {
    /// Three orthogonal dipoles (x̂, ŷ, ẑ) per position
    Triplets,
    /// One explicit orientation per position
    Explicit(&'a [Position]),
    /// Vertex normals of the surface formed by the positions and these triangles
    Triangles(&'a [[usize; 3]]),
}

/// A dipole row: position followed by orientation.
pub type Dipole = [f64; 6];

/// Repeat each position three times, oriented along x, y and z.
#[must_use]
pub fn gen_dipole_triplets(positions: &[Position]) -> (Vec<Position>, Vec<Position>) {
    let axes = [Position::x(), Position::y(), Position::z()];
    positions
        .iter()
        .flat_map(|p| axes.iter().map(move |axis| (*p, *axis)))
        .unzip()
}

/// Build dipole rows and optionally write them with 6 decimals.
///
/// # Errors
///
/// `ShapeMismatch` for explicit orientations of the wrong length, surface
/// errors for invalid triangles, `Io` on write failure.
pub fn gen_dipoles(
    positions: &[Position],
    orientation: OrientationSource<'_>,
    out: Option<&Path>,
) -> ForwardResult<Vec<Dipole>> {
    let (positions, orientations) = match orientation {
        OrientationSource::Triplets => gen_dipole_triplets(positions),
        OrientationSource::Explicit(orientations) => {
            if orientations.len() != positions.len() {
                return Err(ForwardError::ShapeMismatch {
                    what: "dipole orientations",
                    expected: positions.len(),
                    found: orientations.len(),
                });
            }
            (positions.to_vec(), orientations.to_vec())
        }
        OrientationSource::Triangles(triangles) => {
            let surface = Surface::new(positions.to_vec(), triangles.to_vec())?;
            (positions.to_vec(), surface.vertex_normals())
        }
    };

    let dipoles: Vec<Dipole> = positions
        .iter()
        .zip(&orientations)
        .map(|(p, o)| [p.x, p.y, p.z, o.x, o.y, o.z])
        .collect();

    if let Some(path) = out {
        let mut text = String::with_capacity(dipoles.len() * 60);
        for row in &dipoles {
            let fields: Vec<String> = row.iter().map(|v| format!("{v:.6}")).collect();
            let _ = writeln!(text, "{}", fields.join(" "));
        }
        io::write_text(path, &text)?;
        tracing::info!(path = %path.display(), dipoles = dipoles.len(), "Wrote dipoles");
    }
    Ok(dipoles)
}
