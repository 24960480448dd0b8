use crate::cli::InfoArgs;
use crate::error::Result;
use surfalign::core::io::loader;
use surfalign::core::models::point_cloud::PointCloud;
use tracing::info;

pub fn run(args: InfoArgs) -> Result<()> {
    info!("Loading {:?} with features {:?}", &args.geometry, &args.features);
    if args.template {
        let template = loader::load_template(&args.geometry, &args.features)?;
        print_cloud(&template.name, "template", template.cloud());
        let geom_dev = template.geom_dev();
        let (min, max) = geom_dev
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        println!("  geometric deviation: {:.4} .. {:.4}", min, max);
    } else {
        let molecule = loader::load_molecule(&args.geometry, &args.features)?;
        print_cloud(&molecule.name, "molecule", molecule.cloud());
    }
    Ok(())
}

fn print_cloud(name: &str, kind: &str, cloud: &PointCloud) {
    println!("{} '{}'", kind, name);
    println!("  points:   {}", cloud.len());
    println!("  features: {}", cloud.num_features());
    if !cloud.feature_names().is_empty() {
        println!("  names:    {}", cloud.feature_names().join(", "));
    }
    if let Some(c) = cloud.centroid() {
        println!("  centroid: ({:.4}, {:.4}, {:.4})", c.x, c.y, c.z);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CliError;
    use std::fs;
    use tempfile::tempdir;

    fn write_inputs(dir: &std::path::Path, amat: &str) -> InfoArgs {
        let geometry = dir.join("cloud.wrl");
        let features = dir.join("cloud.amat");
        fs::write(
            &geometry,
            "#VRML V2.0 utf8\nShape { geometry PointSet { coord Coordinate { point [ 0 0 0, 1 1 1 ] } } }\n",
        )
        .unwrap();
        fs::write(&features, amat).unwrap();
        InfoArgs {
            geometry,
            features,
            template: false,
        }
    }

    #[test]
    fn reports_molecule_and_template_inputs() {
        let dir = tempdir().unwrap();
        let mut args = write_inputs(dir.path(), "#: charge geom_dev\n0.1 0.5\n0.2 2.0\n");
        run(InfoArgs {
            geometry: args.geometry.clone(),
            features: args.features.clone(),
            template: false,
        })
        .unwrap();
        args.template = true;
        run(args).unwrap();
    }

    #[test]
    fn row_count_mismatch_is_a_load_error() {
        let dir = tempdir().unwrap();
        let args = write_inputs(dir.path(), "#: charge\n0.1\n");
        assert!(matches!(run(args), Err(CliError::Load(_))));
    }
}
