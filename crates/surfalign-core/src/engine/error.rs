use super::config::ConfigError;
use super::solver::SolverError;
use crate::core::io::loader::LoadError;
use crate::core::io::report::ReportError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Template '{name}' has {points} points; at least {minimum} are required")]
    TemplateTooSmall {
        name: String,
        points: usize,
        minimum: usize,
    },

    #[error("Molecule '{name}' has no points")]
    EmptyMolecule { name: String },

    #[error("Template feature '{feature}' is not present in molecule '{molecule}'")]
    MissingFeature { feature: String, molecule: String },

    #[error("Size mismatch in {context}: expected {expected}, found {found}")]
    SizeMismatch {
        context: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Rotation estimation failed: {source}")]
    Solver {
        #[from]
        source: SolverError,
    },

    #[error("Failed to load input: {0}")]
    Load(#[from] LoadError),

    #[error("Failed to write report: {0}")]
    Report(#[from] ReportError),

    #[error("Internal logic error: {0}")]
    Internal(String),
}
