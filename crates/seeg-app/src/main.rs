//! SEEG reconstruction command-line tool
//!
//! Runs single pipeline steps: contact placement, region mappings, gain
//! matrices, dipole files and head model descriptions.
//!
//! # Usage
//!
//! ```bash
//! # Place contacts from an implantation scheme
//! seeg contacts --scheme scheme.txt --out seeg.xyz
//!
//! # Region gain matrix from cortical and subcortical surfaces
//! seeg gain --sensors seeg.xyz --cortical-surface cort/ --subcortical-surface subcort/ \
//!     --cortical-mapping rm_cort.txt --subcortical-mapping rm_subcort.txt --out gain.txt
//!
//! # Override defaults from a config file
//! seeg --config seeg.toml region-gain --sensors seeg.xyz --centres centres.txt \
//!     --areas areas.txt --out gain_regions.txt
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use seeg_forward::contacts::gen_seeg_xyz_from_endpoints;
use seeg_forward::dipoles::{gen_dipoles, OrientationSource};
use seeg_forward::head_model::{gen_head_model, HeadModelOptions};
use seeg_forward::{io, AffineTransform, ForwardModel, GainMatrixEngine, ReconConfig, RegionGainInputs, SurfaceGainInputs};
use seeg_mesh::mapping::to_signed_region_mapping;
use seeg_mesh::{Annotation, Mapping};

/// SEEG reconstruction tools
#[derive(Parser, Debug)]
#[command(name = "seeg")]
#[command(author, version, about = "SEEG contact placement and forward modelling", long_about = None)]
struct Cli {
    /// Logging verbosity level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Place contacts along the electrodes of a scheme file
    Contacts {
        /// Electrode scheme (name, target xyz, entry xyz, count, [spacing])
        #[arg(long)]
        scheme: PathBuf,

        /// Output contact table
        #[arg(short, long)]
        out: PathBuf,

        /// 4×4 affine applied to target and entry points
        #[arg(long)]
        transform: Option<PathBuf>,
    },

    /// Region gain matrix from cortical and subcortical surfaces
    Gain {
        /// Contact table
        #[arg(long)]
        sensors: PathBuf,

        /// Unpacked cortical surface archive
        #[arg(long)]
        cortical_surface: PathBuf,

        /// Unpacked subcortical surface archive
        #[arg(long)]
        subcortical_surface: PathBuf,

        /// Cortical region mapping
        #[arg(long)]
        cortical_mapping: PathBuf,

        /// Subcortical region mapping
        #[arg(long)]
        subcortical_mapping: PathBuf,

        /// Output gain matrix
        #[arg(short, long)]
        out: PathBuf,

        /// Cortical forward model: dipole or inverse_square
        #[arg(long)]
        model: Option<ForwardModel>,
    },

    /// Inverse-square gain matrix from region centres
    RegionGain {
        /// Contact table
        #[arg(long)]
        sensors: PathBuf,

        /// Region centres table
        #[arg(long)]
        centres: PathBuf,

        /// Region areas
        #[arg(long)]
        areas: PathBuf,

        /// Output gain matrix
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Unified region mappings and lookup table from four annotations
    RegionMapping {
        /// Left cortical annotation (JSON)
        #[arg(long)]
        cort_lh: PathBuf,

        /// Right cortical annotation (JSON)
        #[arg(long)]
        cort_rh: PathBuf,

        /// Left subcortical annotation (JSON)
        #[arg(long)]
        subcort_lh: PathBuf,

        /// Right subcortical annotation (JSON)
        #[arg(long)]
        subcort_rh: PathBuf,

        /// External lookup table to translate into the unified numbering
        #[arg(long)]
        external_lut: Option<PathBuf>,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
    },

    /// Dipole file from a position table
    Dipoles {
        /// Position table (label x y z)
        #[arg(long)]
        positions: PathBuf,

        /// Orientation table (label ox oy oz), one per position
        #[arg(long, conflicts_with = "triangles")]
        orientations: Option<PathBuf>,

        /// Triangles (3 vertex indices per row); normals become orientations
        #[arg(long)]
        triangles: Option<PathBuf>,

        /// Output dipole file
        #[arg(short, long)]
        out: PathBuf,
    },

    /// BEM head model `.geom` and `.cond` files
    HeadModel {
        /// FreeSurfer subjects directory
        #[arg(long)]
        subjects_dir: PathBuf,

        /// Subject name
        #[arg(long)]
        subject: String,

        /// Reference the decimated surfaces
        #[arg(long)]
        decimated: bool,

        /// Use the subject's FreeSurfer `bem` folder
        #[arg(long)]
        fs_bem_folder: bool,

        /// Output directory when not using the `bem` folder
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("seeg v{}", env!("CARGO_PKG_VERSION"));

    let config = match &cli.config {
        Some(path) => ReconConfig::from_file(path).with_context(|| format!("loading {}", path.display()))?,
        None => ReconConfig::default(),
    };

    match cli.command {
        Commands::Contacts { scheme, out, transform } => {
            let transform = transform.as_deref().map(AffineTransform::from_file).transpose()?;
            let contacts = gen_seeg_xyz_from_endpoints(
                &scheme,
                &out,
                transform.as_ref().map(|t| t as &dyn seeg_forward::CoordinateTransform),
                &config.placement,
            )?;
            info!("Placed {} contacts", contacts.len());
        }
        Commands::Gain {
            sensors,
            cortical_surface,
            subcortical_surface,
            cortical_mapping,
            subcortical_mapping,
            out,
            model,
        } => {
            let inputs = SurfaceGainInputs {
                sensors,
                cortical_surface,
                subcortical_surface,
                cortical_region_mapping: cortical_mapping,
                subcortical_region_mapping: subcortical_mapping,
            };
            let model = model.unwrap_or(config.gain.cortical_model);
            let engine = GainMatrixEngine::new(config.gain);
            let gain = engine.compute_seeg_gain_matrix(&inputs, &out, model)?;
            info!("Gain matrix {}×{} written", gain.nrows(), gain.ncols());
        }
        Commands::RegionGain {
            sensors,
            centres,
            areas,
            out,
        } => {
            let inputs = RegionGainInputs { sensors, centres, areas };
            let gain = GainMatrixEngine::new(config.gain).compute_seeg_regions_inv_square_gain_matrix(&inputs, &out)?;
            info!("Region gain matrix {}×{} written", gain.nrows(), gain.ncols());
        }
        Commands::RegionMapping {
            cort_lh,
            cort_rh,
            subcort_lh,
            subcort_rh,
            external_lut,
            out_dir,
        } => {
            run_region_mapping([&cort_lh, &cort_rh, &subcort_lh, &subcort_rh], external_lut.as_deref(), &out_dir)?;
        }
        Commands::Dipoles {
            positions,
            orientations,
            triangles,
            out,
        } => {
            run_dipoles(&positions, orientations.as_deref(), triangles.as_deref(), &out)?;
        }
        Commands::HeadModel {
            subjects_dir,
            subject,
            decimated,
            fs_bem_folder,
            out_dir,
        } => {
            let files = gen_head_model(&HeadModelOptions {
                subjects_dir,
                subject,
                decimated,
                fs_bem_folder,
                output_dir: out_dir,
            })?;
            info!("Head model written to {}", files.geom.display());
        }
    }

    Ok(())
}

fn load_annotation(path: &Path) -> anyhow::Result<Annotation> {
    let json = io::read_text(path)?;
    Annotation::from_json(&json).with_context(|| format!("reading annotation {}", path.display()))
}

/// Build the unified lookup tables and write both region mappings
fn run_region_mapping(annotations: [&Path; 4], external_lut: Option<&Path>, out_dir: &Path) -> anyhow::Result<()> {
    let [cort_lh, cort_rh, subcort_lh, subcort_rh] = annotations.map(load_annotation);
    let (cort_lh, cort_rh, subcort_lh, subcort_rh) = (cort_lh?, cort_rh?, subcort_lh?, subcort_rh?);

    let mut mapping = Mapping::new(&cort_lh, &cort_rh, &subcort_lh, &subcort_rh)?;
    let cort = to_signed_region_mapping(mapping.generate_region_mapping_for_cort_annot(&cort_lh, &cort_rh));
    let subcort = to_signed_region_mapping(mapping.generate_region_mapping_for_subcort_annot(&subcort_lh, &subcort_rh));

    let unmapped = cort.iter().chain(&subcort).filter(|&&r| r < 0).count();
    if unmapped > 0 {
        warn!("{unmapped} vertices have no region");
    }

    let translation = match external_lut {
        Some(path) => {
            let lut = io::read_lut(path)?;
            let unmatched = mapping.unmatched_external_indices(&lut);
            if !unmatched.is_empty() {
                warn!("{} external lookup table entries have no unified region", unmatched.len());
            }
            Some(mapping.get_index_mapping_for_lut(&lut))
        }
        None => None,
    };

    io::write_region_mapping(&out_dir.join("region_mapping_cort.txt"), &cort)?;
    io::write_region_mapping(&out_dir.join("region_mapping_subcort.txt"), &subcort)?;
    io::write_lut(&out_dir.join("lut.txt"), mapping.lut_entries())?;
    if let Some(translation) = translation {
        let text: String = translation.iter().map(|(src, trg)| format!("{src} {trg}\n")).collect();
        io::write_text(&out_dir.join("lut_index_mapping.txt"), &text)?;
    }

    info!(
        "{} regions, {} cortical and {} subcortical vertices mapped into {}",
        mapping.nregions(),
        cort.len(),
        subcort.len(),
        out_dir.display()
    );
    Ok(())
}

/// Write dipoles with orientations from a table, triangles, or x/y/z triplets
fn run_dipoles(positions: &Path, orientations: Option<&Path>, triangles: Option<&Path>, out: &Path) -> anyhow::Result<()> {
    let positions = io::read_positions(positions)?;

    let orientation_table = orientations.map(io::read_positions).transpose()?;
    let triangle_list = match triangles {
        Some(path) => {
            let text = io::read_text(path)?;
            Some(parse_triangles(&text).with_context(|| format!("reading triangles {}", path.display()))?)
        }
        None => None,
    };

    let source = match (&orientation_table, &triangle_list) {
        (Some(o), _) => OrientationSource::Explicit(o),
        (None, Some(t)) => OrientationSource::Triangles(t),
        (None, None) => OrientationSource::Triplets,
    };
    let dipoles = gen_dipoles(&positions, source, Some(out))?;
    info!("{} dipoles written", dipoles.len());
    Ok(())
}

fn parse_triangles(text: &str) -> anyhow::Result<Vec<[usize; 3]>> {
    text.lines()
        .filter(|l| !l.trim().is_empty())
        .enumerate()
        .map(|(i, line)| {
            let idx: Vec<usize> = line
                .split_whitespace()
                .map(str::parse)
                .collect::<Result<_, _>>()
                .with_context(|| format!("triangle row {}", i + 1))?;
            match idx.as_slice() {
                &[a, b, c] => Ok([a, b, c]),
                _ => anyhow::bail!("triangle row {} has {} indices", i + 1, idx.len()),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_gain() {
        let cli = Cli::try_parse_from([
            "seeg",
            "--log-level",
            "debug",
            "gain",
            "--sensors",
            "seeg.xyz",
            "--cortical-surface",
            "cort",
            "--subcortical-surface",
            "subcort",
            "--cortical-mapping",
            "rm_cort.txt",
            "--subcortical-mapping",
            "rm_subcort.txt",
            "--out",
            "gain.txt",
            "--model",
            "inverse_square",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Gain {
                model: Some(ForwardModel::InverseSquare),
                ..
            }
        ));
    }

    #[test]
    fn test_cli_dipole_sources_conflict() {
        let result = Cli::try_parse_from([
            "seeg",
            "dipoles",
            "--positions",
            "p.txt",
            "--orientations",
            "o.txt",
            "--triangles",
            "t.txt",
            "--out",
            "d.txt",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_triangles() {
        assert_eq!(parse_triangles("0 1 2\n\n2 3 0\n").unwrap(), vec![[0, 1, 2], [2, 3, 0]]);
        assert!(parse_triangles("0 1\n").is_err());
        assert!(parse_triangles("0 1 x\n").is_err());
    }

    #[test]
    fn test_region_mapping_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let write = |name: &str, json: &str| {
            let path = dir.path().join(name);
            std::fs::write(&path, json).unwrap();
            path
        };
        let cort_lh = write("lh.json", r#"{"region_names": ["unknown", "bankssts"], "region_mapping": [0, 1]}"#);
        let cort_rh = write("rh.json", r#"{"region_names": [], "region_mapping": []}"#);
        let sub_lh = write("slh.json", r#"{"region_names": ["Left-Hippocampus"], "region_mapping": [0]}"#);
        let sub_rh = write("srh.json", r#"{"region_names": ["Right-Hippocampus"], "region_mapping": [0]}"#);

        run_region_mapping([&cort_lh, &cort_rh, &sub_lh, &sub_rh], None, dir.path()).unwrap();

        let lut = std::fs::read_to_string(dir.path().join("lut.txt")).unwrap();
        assert_eq!(lut, "0 unknown\n1 ctx-lh-bankssts\n2 Left-Hippocampus\n3 Right-Hippocampus\n");
        let cort = std::fs::read_to_string(dir.path().join("region_mapping_cort.txt")).unwrap();
        assert_eq!(cort, "0\n1\n");
        let subcort = std::fs::read_to_string(dir.path().join("region_mapping_subcort.txt")).unwrap();
        assert_eq!(subcort, "2\n3\n");
    }
}
