use crate::utils::parser;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use surfalign::workflows::align::SourcePaths;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Tony Kan, Ted Yu, William A. Goddard III, Victor Wai Tak Kam",
    version,
    about = "SurfAlign CLI - rigid alignment of chemically annotated surface templates onto molecular surfaces.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads used to evaluate candidate rotations.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Align a template onto one or more molecular surfaces.
    Align(AlignArgs),
    /// Print point and feature counts of a geometry and feature file pair.
    Info(InfoArgs),
}

/// Arguments for the `align` subcommand.
#[derive(Args, Debug)]
pub struct AlignArgs {
    // --- Inputs ---
    /// Template surface points (VRML).
    #[arg(long, required = true, value_name = "PATH")]
    pub template_geometry: PathBuf,

    /// Template feature table (AMAT), optionally carrying `geom_dev` and `<feature>_dev` columns.
    #[arg(long, required = true, value_name = "PATH")]
    pub template_features: PathBuf,

    /// Molecule to align onto, as GEOMETRY:FEATURES. Can be used multiple times.
    #[arg(
        short,
        long = "molecule",
        required = true,
        value_name = "GEOMETRY:FEATURES",
        value_parser = parser::parse_source_pair
    )]
    pub molecules: Vec<SourcePaths>,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    // --- Overrides ---
    /// Override the maximum number of ICP iterations per candidate rotation.
    #[arg(long, value_name = "INT")]
    pub max_iter: Option<usize>,

    /// Override the initial rotation grid step, in degrees.
    #[arg(long, value_name = "DEGREES")]
    pub angle_step: Option<f64>,

    /// Override the weighting method ('none' or 'features_sigmoid').
    #[arg(long, value_name = "METHOD")]
    pub weighting: Option<String>,

    /// Override the weighting parameters as MIDPOINT,SLOPE.
    #[arg(long, value_name = "MIDPOINT,SLOPE", value_delimiter = ',')]
    pub weighting_params: Option<Vec<f64>>,

    /// Override the matching method ('exhaustive' or 'kd_tree').
    #[arg(long, value_name = "METHOD")]
    pub matching: Option<String>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S angle-t=0.1
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,

    // --- Outputs ---
    /// Write the aligned template coordinates (VRML). With several molecules the
    /// molecule name is appended to the file stem.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Write the per-point matching report (CSV). Named like `--output`.
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,
}

/// Arguments for the `info` subcommand.
#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Surface points (VRML).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub geometry: PathBuf,

    /// Feature table (AMAT).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub features: PathBuf,

    /// Interpret the feature table as a template (split deviation columns).
    #[arg(long)]
    pub template: bool,
}
