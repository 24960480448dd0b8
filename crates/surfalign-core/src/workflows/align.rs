use crate::core::io::report::{MatchRecord, write_matching_report};
use crate::core::models::molecule::Molecule;
use crate::core::models::template::MoleculeTemplate;
use crate::engine::cache::MoleculeCache;
use crate::engine::config::AlignmentConfig;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::state::AlignmentOutcome;
use crate::engine::tasks::icp::ChemicalIcp;
use nalgebra::Point3;
use std::io::Write;
use std::path::PathBuf;
use tracing::{info, instrument};

/// A geometry file and its row-aligned feature table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePaths {
    pub geometry: PathBuf,
    pub features: PathBuf,
}

impl SourcePaths {
    pub fn new(geometry: impl Into<PathBuf>, features: impl Into<PathBuf>) -> Self {
        Self {
            geometry: geometry.into(),
            features: features.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AlignmentReport {
    pub template_name: String,
    pub molecule_name: String,
    pub outcome: AlignmentOutcome,
    /// Template coordinates under the best transform.
    pub aligned_points: Vec<Point3<f64>>,
    /// RMSD over matched pairs of the best candidate.
    pub rmsd: Option<f64>,
}

impl AlignmentReport {
    pub fn match_records(&self) -> Vec<MatchRecord> {
        self.outcome.best.match_records()
    }

    /// Writes the best candidate's per-point matches as CSV.
    pub fn write_matching_report(&self, writer: impl Write) -> Result<(), EngineError> {
        write_matching_report(writer, &self.match_records())?;
        Ok(())
    }
}

#[instrument(
    skip_all,
    name = "alignment_workflow",
    fields(template = %template.name, molecule = %molecule.name)
)]
pub fn run(
    template: &MoleculeTemplate,
    molecule: &Molecule,
    config: &AlignmentConfig,
    reporter: &ProgressReporter,
) -> Result<AlignmentReport, EngineError> {
    let icp = reporter.phase("Preparation", || ChemicalIcp::new(template, molecule, config))?;
    let outcome = reporter.phase("Alignment", || icp.run(reporter))?;

    let aligned_points = outcome.best.aligned_points(template);
    let rmsd = outcome.best.rmsd(template, molecule);
    info!(
        error = outcome.best.error,
        rmsd = rmsd.unwrap_or(f64::NAN),
        "Alignment finished."
    );

    Ok(AlignmentReport {
        template_name: template.name.clone(),
        molecule_name: molecule.name.clone(),
        outcome,
        aligned_points,
        rmsd,
    })
}

/// Aligns one template onto several molecules in order, loading every input
/// through `cache`.
#[instrument(skip_all, name = "batch_alignment_workflow", fields(molecules = molecules.len()))]
pub fn run_batch(
    cache: &mut MoleculeCache,
    template: &SourcePaths,
    molecules: &[SourcePaths],
    config: &AlignmentConfig,
    reporter: &ProgressReporter,
) -> Result<Vec<AlignmentReport>, EngineError> {
    let template = reporter.phase("Loading template", || {
        cache.template(&template.geometry, &template.features)
    })?;

    let mut reports = Vec::with_capacity(molecules.len());
    for source in molecules {
        let molecule = cache.molecule(&source.geometry, &source.features)?;
        reporter.report(Progress::Message(format!(
            "Aligning '{}' onto '{}'",
            template.name, molecule.name
        )));
        reports.push(run(&template, &molecule, config, reporter)?);
    }
    Ok(reports)
}
