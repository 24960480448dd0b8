use crate::core::utils::geometry::EulerAngles;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_MAX_ITERATIONS: usize = 50;
pub const DEFAULT_ERROR_THRESHOLD: f64 = 0.0;
pub const DEFAULT_ANGLE_THRESHOLD_DEGREES: f64 = 0.5;
pub const DEFAULT_TRANSLATION_THRESHOLD: f64 = 0.0;
pub const DEFAULT_INITIAL_ANGLES_STEP: f64 = 360.0;
/// Finest accepted grid step; one degree already yields 23 328 000 candidates.
pub const MIN_INITIAL_ANGLES_STEP: f64 = 1.0;
pub const DEFAULT_SIGMOID_MIDPOINT: f64 = 0.0;
pub const DEFAULT_SIGMOID_SLOPE: f64 = 1.0;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Unknown value '{value}' for '{option}' (expected one of: {expected})")]
    UnknownVariant {
        option: &'static str,
        value: String,
        expected: &'static str,
    },
    #[error("Invalid value for '{option}': {reason}")]
    InvalidValue {
        option: &'static str,
        reason: String,
    },
    #[error("Options '{0}' and '{1}' are mutually exclusive")]
    Conflict(&'static str, &'static str),
}

/// How per-pair confidence weights are derived from the chemical feature distance.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum WeightingMethod {
    /// Every template point gets weight `1/N`.
    #[default]
    None,
    /// `sigmoid(slope · (midpoint − feature_distance))`, normalized to sum to one.
    FeaturesSigmoid { midpoint: f64, slope: f64 },
}

impl WeightingMethod {
    /// Resolves a method name and its parameter list.
    ///
    /// `features_sigmoid` takes `[midpoint, slope]`; an empty list selects the
    /// defaults. `none` ignores the parameters.
    pub fn parse(name: &str, params: &[f64]) -> Result<Self, ConfigError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "features_sigmoid" | "features-sigmoid" => match params {
                [] => Ok(Self::FeaturesSigmoid {
                    midpoint: DEFAULT_SIGMOID_MIDPOINT,
                    slope: DEFAULT_SIGMOID_SLOPE,
                }),
                [midpoint, slope] => Ok(Self::FeaturesSigmoid {
                    midpoint: *midpoint,
                    slope: *slope,
                }),
                other => Err(ConfigError::InvalidValue {
                    option: "weighting-params",
                    reason: format!("expected 2 values (midpoint, slope), got {}", other.len()),
                }),
            },
            _ => Err(ConfigError::UnknownVariant {
                option: "weighting-method",
                value: name.to_string(),
                expected: "none, features_sigmoid",
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::FeaturesSigmoid { .. } => "features_sigmoid",
        }
    }
}

impl fmt::Display for WeightingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::FeaturesSigmoid { midpoint, slope } => {
                write!(f, "features_sigmoid(midpoint={}, slope={})", midpoint, slope)
            }
        }
    }
}

/// Strategy used to find each template point's nearest molecule point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchingMethod {
    #[default]
    Exhaustive,
    /// k-d tree pruning; yields the same matches as the exhaustive scan.
    KdTree,
}

impl FromStr for MatchingMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exhaustive" => Ok(Self::Exhaustive),
            "kd_tree" | "kd-tree" | "kdtree" => Ok(Self::KdTree),
            _ => Err(ConfigError::UnknownVariant {
                option: "matching-method",
                value: s.to_string(),
                expected: "exhaustive, kd_tree",
            }),
        }
    }
}

impl fmt::Display for MatchingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhaustive => write!(f, "exhaustive"),
            Self::KdTree => write!(f, "kd_tree"),
        }
    }
}

/// Source of the starting orientations for the multi-start search.
#[derive(Debug, Clone, PartialEq)]
pub enum InitialRotations {
    /// Regular grid over `rx ∈ [0,360)`, `ry ∈ [0,360)`, `rz ∈ [0,180)`.
    Grid { step_degrees: f64 },
    /// Explicit candidates, tried in order.
    List(Vec<EulerAngles>),
}

impl Default for InitialRotations {
    fn default() -> Self {
        Self::Grid {
            step_degrees: DEFAULT_INITIAL_ANGLES_STEP,
        }
    }
}

/// Stopping thresholds. Any single satisfied threshold ends a candidate's loop.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvergenceConfig {
    pub error_threshold: f64,
    pub angle_threshold_degrees: f64,
    pub translation_threshold: f64,
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        Self {
            error_threshold: DEFAULT_ERROR_THRESHOLD,
            angle_threshold_degrees: DEFAULT_ANGLE_THRESHOLD_DEGREES,
            translation_threshold: DEFAULT_TRANSLATION_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentConfig {
    pub max_iterations: usize,
    pub convergence: ConvergenceConfig,
    pub initial_rotations: InitialRotations,
    pub weighting: WeightingMethod,
    pub matching: MatchingMethod,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            convergence: ConvergenceConfig::default(),
            initial_rotations: InitialRotations::default(),
            weighting: WeightingMethod::default(),
            matching: MatchingMethod::default(),
        }
    }
}

#[derive(Default)]
pub struct AlignmentConfigBuilder {
    max_iterations: Option<usize>,
    error_threshold: Option<f64>,
    angle_threshold_degrees: Option<f64>,
    translation_threshold: Option<f64>,
    initial_angles_step: Option<f64>,
    initial_angles_list: Option<Vec<EulerAngles>>,
    weighting: Option<WeightingMethod>,
    matching: Option<MatchingMethod>,
}

impl AlignmentConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = Some(iterations);
        self
    }
    pub fn error_threshold(mut self, threshold: f64) -> Self {
        self.error_threshold = Some(threshold);
        self
    }
    pub fn angle_threshold_degrees(mut self, threshold: f64) -> Self {
        self.angle_threshold_degrees = Some(threshold);
        self
    }
    pub fn translation_threshold(mut self, threshold: f64) -> Self {
        self.translation_threshold = Some(threshold);
        self
    }
    pub fn initial_angles_step(mut self, step_degrees: f64) -> Self {
        self.initial_angles_step = Some(step_degrees);
        self
    }
    pub fn initial_angles_list(mut self, angles: Vec<EulerAngles>) -> Self {
        self.initial_angles_list = Some(angles);
        self
    }
    pub fn weighting(mut self, method: WeightingMethod) -> Self {
        self.weighting = Some(method);
        self
    }
    pub fn matching(mut self, method: MatchingMethod) -> Self {
        self.matching = Some(method);
        self
    }

    pub fn build(self) -> Result<AlignmentConfig, ConfigError> {
        let max_iterations = self.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS);
        if max_iterations == 0 {
            return Err(ConfigError::InvalidValue {
                option: "max-iter",
                reason: "must be at least 1".to_string(),
            });
        }

        let convergence = ConvergenceConfig {
            error_threshold: non_negative(
                "error-t",
                self.error_threshold.unwrap_or(DEFAULT_ERROR_THRESHOLD),
            )?,
            angle_threshold_degrees: non_negative(
                "angle-t",
                self.angle_threshold_degrees
                    .unwrap_or(DEFAULT_ANGLE_THRESHOLD_DEGREES),
            )?,
            translation_threshold: non_negative(
                "trans-t",
                self.translation_threshold
                    .unwrap_or(DEFAULT_TRANSLATION_THRESHOLD),
            )?,
        };

        let initial_rotations = match (self.initial_angles_step, self.initial_angles_list) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::Conflict(
                    "initial-angles-step",
                    "initial-angles-list",
                ));
            }
            (_, Some(list)) => {
                if list.is_empty() {
                    return Err(ConfigError::InvalidValue {
                        option: "initial-angles-list",
                        reason: "must contain at least one rotation".to_string(),
                    });
                }
                if let Some(bad) = list
                    .iter()
                    .find(|a| !(a.rx.is_finite() && a.ry.is_finite() && a.rz.is_finite()))
                {
                    return Err(ConfigError::InvalidValue {
                        option: "initial-angles-list",
                        reason: format!("non-finite angles {:?}", bad),
                    });
                }
                InitialRotations::List(list)
            }
            (step, None) => {
                let step_degrees = step.unwrap_or(DEFAULT_INITIAL_ANGLES_STEP);
                if !(step_degrees.is_finite() && step_degrees >= MIN_INITIAL_ANGLES_STEP) {
                    return Err(ConfigError::InvalidValue {
                        option: "initial-angles-step",
                        reason: format!(
                            "must be at least {} degrees, got {}",
                            MIN_INITIAL_ANGLES_STEP, step_degrees
                        ),
                    });
                }
                InitialRotations::Grid { step_degrees }
            }
        };

        let weighting = self.weighting.unwrap_or_default();
        if let WeightingMethod::FeaturesSigmoid { midpoint, slope } = weighting {
            if !(midpoint.is_finite() && slope.is_finite()) {
                return Err(ConfigError::InvalidValue {
                    option: "weighting-params",
                    reason: format!(
                        "midpoint and slope must be finite, got ({}, {})",
                        midpoint, slope
                    ),
                });
            }
        }

        Ok(AlignmentConfig {
            max_iterations,
            convergence,
            initial_rotations,
            weighting,
            matching: self.matching.unwrap_or_default(),
        })
    }
}

fn non_negative(option: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidValue {
            option,
            reason: format!("must be a finite, non-negative number, got {}", value),
        })
    }
}
