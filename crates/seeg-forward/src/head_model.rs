//! Three-layer BEM head model description files.
//!
//! Writes the `.geom` (interfaces and domains) and `.cond` (conductivities)
//! files that a boundary element solver reads alongside the skull, inner
//! skull and skin `.tri` surfaces.

use std::path::{Path, PathBuf};

use crate::error::{ForwardError, ForwardResult};
use crate::io;

const HEAD_MODEL_BASE: &str = "head_model";

const CONDUCTIVITIES: &str = "\
# Properties Description 1.0 (Conductivities)

Air         0.0
Scalp       1
Brain       1
Skull       0.03
";

/// Where and how to write a head model.
#[derive(Clone, Debug)]
pub struct HeadModelOptions {
    /// FreeSurfer subjects directory
    pub subjects_dir: PathBuf,
    /// Subject name
    pub subject: String,
    /// Reference the decimated (`surface_low`) surfaces
    pub decimated: bool,
    /// Read surfaces from and write into `<subjects_dir>/<subject>/bem`
    pub fs_bem_folder: bool,
    /// Output directory when `fs_bem_folder` is off
    pub output_dir: PathBuf,
}

/// Files written by [`gen_head_model`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeadModelFiles {
    /// Geometry description
    pub geom: PathBuf,
    /// Conductivity description
    pub cond: PathBuf,
}

/// Surface file suffix for the requested resolution.
#[must_use]
pub const fn surface_suffix(decimated: bool) -> &'static str {
    if decimated {
        "surface_low"
    } else {
        "surface"
    }
}

/// Geometry description referencing `{prefix}_{layer}_{suffix}.tri` surfaces.
#[must_use]
pub fn geom_description(prefix: &str, suffix: &str) -> String {
    format!(
        "# Domain Description 1.1

Interfaces 3

Interface Skull: \"{prefix}_outer_skull_{suffix}.tri\"
Interface Cortex: \"{prefix}_inner_skull_{suffix}.tri\"
Interface Head: \"{prefix}_outer_skin_{suffix}.tri\"

Domains 4

Domain Scalp: Skull -Head
Domain Brain: -Cortex
Domain Air: Head
Domain Skull: Cortex -Skull
"
    )
}

fn has_bem_surfaces(watershed: &Path, suffix: &str) -> ForwardResult<bool> {
    if !watershed.is_dir() {
        return Ok(false);
    }
    let ending = format!("_{suffix}.tri");
    let entries = std::fs::read_dir(watershed).map_err(ForwardError::io(watershed))?;
    for entry in entries {
        let entry = entry.map_err(ForwardError::io(watershed))?;
        if entry.file_name().to_string_lossy().ends_with(&ending) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Write `head_model.geom` and `head_model.cond`.
///
/// # Errors
///
/// `MissingInput` when the BEM folder is requested but `bem/watershed` holds
/// no `*_{suffix}.tri` surface, `Io` on write failure.
pub fn gen_head_model(options: &HeadModelOptions) -> ForwardResult<HeadModelFiles> {
    let suffix = surface_suffix(options.decimated);

    let (prefix, base) = if options.fs_bem_folder {
        let bem = options.subjects_dir.join(&options.subject).join("bem");
        let watershed = bem.join("watershed");
        if !has_bem_surfaces(&watershed, suffix)? {
            return Err(ForwardError::MissingInput {
                path: watershed.join(format!("*_{suffix}.tri")),
            });
        }
        (
            watershed.join(&options.subject).to_string_lossy().into_owned(),
            bem.join(HEAD_MODEL_BASE),
        )
    } else {
        (options.subject.clone(), options.output_dir.join(HEAD_MODEL_BASE))
    };

    let files = HeadModelFiles {
        geom: base.with_extension("geom"),
        cond: base.with_extension("cond"),
    };
    io::write_text(&files.geom, &geom_description(&prefix, suffix))?;
    tracing::info!(path = %files.geom.display(), "Head model geometry written");
    io::write_text(&files.cond, CONDUCTIVITIES)?;
    tracing::info!(path = %files.cond.display(), "Head model conductivities written");

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn options(root: &Path, decimated: bool, fs_bem_folder: bool) -> HeadModelOptions {
        HeadModelOptions {
            subjects_dir: root.join("subjects"),
            subject: "sub01".to_string(),
            decimated,
            fs_bem_folder,
            output_dir: root.to_path_buf(),
        }
    }

    #[test]
    fn test_plain_head_model() {
        let dir = tempdir().unwrap();
        let files = gen_head_model(&options(dir.path(), true, false)).unwrap();
        assert_eq!(files.geom, dir.path().join("head_model.geom"));

        let geom = std::fs::read_to_string(&files.geom).unwrap();
        assert!(geom.contains("\"sub01_outer_skull_surface_low.tri\""));
        assert!(geom.contains("\"sub01_inner_skull_surface_low.tri\""));
        assert!(geom.contains("\"sub01_outer_skin_surface_low.tri\""));
        assert!(geom.contains("Domains 4"));

        let cond = std::fs::read_to_string(&files.cond).unwrap();
        assert!(cond.contains("Skull       0.03"));
    }

    #[test]
    fn test_bem_folder_requires_surfaces() {
        let dir = tempdir().unwrap();
        let opts = options(dir.path(), false, true);
        assert!(matches!(gen_head_model(&opts), Err(ForwardError::MissingInput { .. })));

        let watershed = dir.path().join("subjects/sub01/bem/watershed");
        std::fs::create_dir_all(&watershed).unwrap();
        // Decimated surfaces do not satisfy a full-resolution model
        std::fs::write(watershed.join("sub01_brain_surface_low.tri"), "").unwrap();
        assert!(matches!(gen_head_model(&opts), Err(ForwardError::MissingInput { .. })));

        std::fs::write(watershed.join("sub01_outer_skin_surface.tri"), "").unwrap();
        let files = gen_head_model(&opts).unwrap();
        assert_eq!(files.cond, dir.path().join("subjects/sub01/bem/head_model.cond"));

        let geom = std::fs::read_to_string(&files.geom).unwrap();
        let prefix = watershed.join("sub01").to_string_lossy().into_owned();
        assert!(geom.contains(&format!("\"{prefix}_outer_skull_surface.tri\"")));
    }
}
