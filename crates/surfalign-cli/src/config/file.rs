use crate::error::{CliError, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// Alignment options as written in a TOML file. Every key is optional.
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileConfig {
    pub max_iter: Option<usize>,
    pub error_t: Option<f64>,
    pub angle_t: Option<f64>,
    pub trans_t: Option<f64>,
    pub initial_angles_step: Option<f64>,
    pub initial_angles_list: Option<Vec<[f64; 3]>>,
    pub weighting_method: Option<String>,
    pub weighting_params: Option<Vec<f64>>,
    pub matching_method: Option<String>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_kebab_case_keys() {
        let config = FileConfig::parse(
            r#"
            max-iter = 20
            angle-t = 0.1
            initial-angles-list = [[0.0, 0.0, 0.0], [90.0, 0.0, 45.0]]
            weighting-method = "features_sigmoid"
            weighting-params = [1.0, 3.0]
            matching-method = "kd_tree"
            "#,
        )
        .unwrap();
        assert_eq!(config.max_iter, Some(20));
        assert_eq!(config.angle_t, Some(0.1));
        assert_eq!(
            config.initial_angles_list,
            Some(vec![[0.0, 0.0, 0.0], [90.0, 0.0, 45.0]])
        );
        assert_eq!(config.weighting_params, Some(vec![1.0, 3.0]));
        assert_eq!(config.matching_method.as_deref(), Some("kd_tree"));
        assert_eq!(config.error_t, None);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(FileConfig::parse("max_iterations = 3").is_err());
    }

    #[test]
    fn unreadable_file_is_reported_with_its_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "max-iter = \"many\"").unwrap();
        assert!(matches!(
            FileConfig::from_file(&path),
            Err(CliError::FileParsing { .. })
        ));
    }
}
