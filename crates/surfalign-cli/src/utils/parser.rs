use surfalign::core::utils::geometry::EulerAngles;
use surfalign::workflows::align::SourcePaths;

/// Parses `GEOMETRY:FEATURES`. The last `:` separates the two paths.
pub fn parse_source_pair(s: &str) -> Result<SourcePaths, String> {
    match s.rsplit_once(':') {
        Some((geometry, features)) if !geometry.is_empty() && !features.is_empty() => {
            Ok(SourcePaths::new(geometry, features))
        }
        _ => Err(format!(
            "Invalid molecule source '{}'. Expected format: GEOMETRY:FEATURES",
            s
        )),
    }
}

/// Parses a comma-separated list of floats, e.g. `1.5,4`.
pub fn parse_float_list(s: &str) -> Result<Vec<f64>, String> {
    s.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<f64>()
                .map_err(|_| format!("Invalid number '{}' in list '{}'", part, s))
        })
        .collect()
}

/// Parses `rx,ry,rz;rx,ry,rz;...` into Euler angle triples (degrees).
pub fn parse_angle_list(s: &str) -> Result<Vec<EulerAngles>, String> {
    s.split(';')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|triple| {
            let values = parse_float_list(triple)?;
            match values.as_slice() {
                [rx, ry, rz] => Ok(EulerAngles::new(*rx, *ry, *rz)),
                _ => Err(format!(
                    "Invalid rotation '{}'. Expected three angles: RX,RY,RZ",
                    triple
                )),
            }
        })
        .collect()
}
