use crate::cli::AlignArgs;
use crate::config;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use surfalign::{
    core::io::{traits::PointCloudFile, vrml::VrmlFile},
    core::utils::geometry::angles_from_rotation_matrix,
    engine::{cache::MoleculeCache, progress::ProgressReporter},
    workflows::{self, align::AlignmentReport},
};
use tracing::info;

pub fn run(args: AlignArgs) -> Result<()> {
    info!("Merging configuration from file and CLI arguments...");
    let app = config::build_config(&args)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());
    let mut cache = MoleculeCache::default();

    println!(
        "Aligning template '{}' onto {} molecule(s)...",
        app.template.geometry.display(),
        app.molecules.len()
    );
    let reports = workflows::align::run_batch(
        &mut cache,
        &app.template,
        &app.molecules,
        &app.core_config,
        &reporter,
    )?;

    let count = reports.len();
    for (index, report) in reports.iter().enumerate() {
        print_summary(report);

        if let Some(base) = &app.output {
            let path = generate_output_path(base, index, &report.molecule_name, count);
            info!("Writing aligned template to {:?}", &path);
            VrmlFile::write_to_path(&report.aligned_points, &path).map_err(|e| {
                CliError::Output {
                    path: path.clone(),
                    source: e.into(),
                }
            })?;
            println!("  Aligned template written to: {}", path.display());
        }

        if let Some(base) = &app.report {
            let path = generate_output_path(base, index, &report.molecule_name, count);
            info!("Writing matching report to {:?}", &path);
            let file = File::create(&path).map_err(|e| CliError::Output {
                path: path.clone(),
                source: e.into(),
            })?;
            report
                .write_matching_report(BufWriter::new(file))
                .map_err(|e| CliError::Output {
                    path: path.clone(),
                    source: e.into(),
                })?;
            println!("  Matching report written to: {}", path.display());
        }
    }

    Ok(())
}

fn print_summary(report: &AlignmentReport) {
    let best = &report.outcome.best;
    let angles = angles_from_rotation_matrix(&best.transform.rotation);
    let t = &best.transform.translation;
    println!(
        "✓ {} -> {}: error {:.6}, RMSD {}, candidate {}/{} ({} iterations, stopped on {})",
        report.template_name,
        report.molecule_name,
        best.error,
        report
            .rmsd
            .map(|r| format!("{:.4}", r))
            .unwrap_or_else(|| "n/a".to_string()),
        best.candidate + 1,
        report.outcome.candidates.len(),
        best.iterations,
        best.stop_reason,
    );
    println!(
        "  rotation (rx, ry, rz) = ({:.3}, {:.3}, {:.3}) deg, translation = ({:.4}, {:.4}, {:.4})",
        angles.rx, angles.ry, angles.rz, t.x, t.y, t.z
    );
}

/// With a single molecule the path is used as given; otherwise the 1-based
/// batch position and the molecule name are appended to the file stem.
/// Molecules loaded from files with the same stem still get distinct paths.
fn generate_output_path(base: &Path, index: usize, molecule_name: &str, total: usize) -> PathBuf {
    if total <= 1 {
        return base.to_path_buf();
    }
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let suffix = format!("{}_{}", index + 1, molecule_name);
    let file_name = match base.extension() {
        Some(ext) => format!("{}_{}.{}", stem, suffix, ext.to_string_lossy()),
        None => format!("{}_{}", stem, suffix),
    };
    base.with_file_name(file_name)
}
