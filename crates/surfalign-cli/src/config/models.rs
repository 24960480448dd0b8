use std::path::PathBuf;
use surfalign::engine::config as core_config;
use surfalign::workflows::align::SourcePaths;

pub struct AppConfig {
    pub template: SourcePaths,
    pub molecules: Vec<SourcePaths>,
    pub output: Option<PathBuf>,
    pub report: Option<PathBuf>,
    pub core_config: core_config::AlignmentConfig,
}
