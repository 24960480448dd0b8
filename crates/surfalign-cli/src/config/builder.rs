use super::file::FileConfig;
use super::models::AppConfig;
use crate::cli::AlignArgs;
use crate::error::{CliError, Result};
use crate::utils::parser;
use std::str::FromStr;
use surfalign::core::utils::geometry::EulerAngles;
use surfalign::engine::config as core_config;
use surfalign::workflows::align::SourcePaths;

pub fn build_config(args: &AlignArgs) -> Result<AppConfig> {
    let file_config = match &args.config {
        Some(path) => FileConfig::from_file(path)?,
        None => FileConfig::default(),
    };
    let mut file_config = apply_set_values(file_config, &args.set_values)?;

    if let Some(step) = args.angle_step {
        file_config.initial_angles_step = Some(step);
        file_config.initial_angles_list = None;
    }
    if args.max_iter.is_some() {
        file_config.max_iter = args.max_iter;
    }
    if args.weighting.is_some() {
        file_config.weighting_method = args.weighting.clone();
    }
    if args.weighting_params.is_some() {
        file_config.weighting_params = args.weighting_params.clone();
    }
    if args.matching.is_some() {
        file_config.matching_method = args.matching.clone();
    }

    Ok(AppConfig {
        template: SourcePaths::new(&args.template_geometry, &args.template_features),
        molecules: args.molecules.clone(),
        output: args.output.clone(),
        report: args.report.clone(),
        core_config: to_core_config(file_config)?,
    })
}

fn to_core_config(file: FileConfig) -> Result<core_config::AlignmentConfig> {
    let mut builder = core_config::AlignmentConfigBuilder::new();

    if let Some(v) = file.max_iter {
        builder = builder.max_iterations(v);
    }
    if let Some(v) = file.error_t {
        builder = builder.error_threshold(v);
    }
    if let Some(v) = file.angle_t {
        builder = builder.angle_threshold_degrees(v);
    }
    if let Some(v) = file.trans_t {
        builder = builder.translation_threshold(v);
    }
    if let Some(v) = file.initial_angles_step {
        builder = builder.initial_angles_step(v);
    }
    if let Some(list) = file.initial_angles_list {
        builder = builder.initial_angles_list(list.into_iter().map(EulerAngles::from).collect());
    }

    let params = file.weighting_params.unwrap_or_default();
    match file.weighting_method.as_deref() {
        Some(name) => {
            let method =
                core_config::WeightingMethod::parse(name, &params).map_err(config_error)?;
            builder = builder.weighting(method);
        }
        None if !params.is_empty() => {
            return Err(CliError::Config(
                "`weighting-params` given without `weighting-method`".to_string(),
            ));
        }
        None => {}
    }

    if let Some(name) = file.matching_method {
        let method = core_config::MatchingMethod::from_str(&name).map_err(config_error)?;
        builder = builder.matching(method);
    }

    builder.build().map_err(config_error)
}

fn config_error(e: core_config::ConfigError) -> CliError {
    CliError::Config(e.to_string())
}

fn parse_value<T: FromStr>(key: &str, value: &str, kind: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        CliError::Config(format!("Invalid {} value for {}: {}", kind, key, value))
    })
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let Some((key, value)) = kv_pair.split_once('=') else {
            return Err(CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            )));
        };
        let key = key.trim();

        match key {
            "max-iter" => config.max_iter = Some(parse_value(key, value, "integer")?),
            "error-t" => config.error_t = Some(parse_value(key, value, "float")?),
            "angle-t" => config.angle_t = Some(parse_value(key, value, "float")?),
            "trans-t" => config.trans_t = Some(parse_value(key, value, "float")?),
            "initial-angles-step" => {
                config.initial_angles_step = Some(parse_value(key, value, "float")?);
                config.initial_angles_list = None;
            }
            "initial-angles-list" => {
                let angles = parser::parse_angle_list(value).map_err(CliError::Config)?;
                config.initial_angles_list =
                    Some(angles.into_iter().map(|a| [a.rx, a.ry, a.rz]).collect());
                config.initial_angles_step = None;
            }
            "weighting-method" => config.weighting_method = Some(value.trim().to_string()),
            "weighting-params" => {
                config.weighting_params =
                    Some(parser::parse_float_list(value).map_err(CliError::Config)?)
            }
            "matching-method" => config.matching_method = Some(value.trim().to_string()),
            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{}'",
                    key
                )));
            }
        }
    }
    Ok(config)
}
