use super::amat::{AmatError, AmatFile, AmatTable};
use super::traits::PointCloudFile;
use super::vrml::{VrmlError, VrmlFile};
use crate::core::models::molecule::Molecule;
use crate::core::models::point_cloud::{ModelError, PointCloud};
use crate::core::models::template::MoleculeTemplate;
use nalgebra::DMatrix;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Column holding the per-point geometric deviation in a template table.
pub const GEOM_DEV_COLUMN: &str = "geom_dev";
/// Suffix marking a per-feature deviation column (`<feature>_dev`).
pub const FEATURE_DEV_SUFFIX: &str = "_dev";

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read geometry file '{path}': {source}", path = path.display())]
    Geometry {
        path: PathBuf,
        #[source]
        source: VrmlError,
    },
    #[error("Failed to read feature file '{path}': {source}", path = path.display())]
    Features {
        path: PathBuf,
        #[source]
        source: AmatError,
    },
    #[error("Geometry has {points} points but the feature table has {rows} rows")]
    RowCountMismatch { points: usize, rows: usize },
    #[error("Deviation column '{0}' does not refer to a feature column")]
    OrphanDeviationColumn(String),
    #[error("Invalid model data: {0}")]
    Model(#[from] ModelError),
}

fn read_pair(
    geometry: &Path,
    features: &Path,
) -> Result<(Vec<nalgebra::Point3<f64>>, AmatTable), LoadError> {
    let points = VrmlFile::read_from_path(geometry).map_err(|e| LoadError::Geometry {
        path: geometry.to_path_buf(),
        source: e,
    })?;
    let table = AmatFile::read_from_path(features).map_err(|e| LoadError::Features {
        path: features.to_path_buf(),
        source: e,
    })?;
    if table.nrows() != points.len() {
        return Err(LoadError::RowCountMismatch {
            points: points.len(),
            rows: table.nrows(),
        });
    }
    debug!(
        "Read {} points and {} feature columns from {:?} / {:?}",
        points.len(),
        table.ncols(),
        geometry,
        features
    );
    Ok((points, table))
}

fn name_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub fn load_molecule(geometry: &Path, features: &Path) -> Result<Molecule, LoadError> {
    let (points, table) = read_pair(geometry, features)?;
    let cloud = PointCloud::new(points, table.data, table.names)?;
    Ok(Molecule::new(name_from_path(geometry), cloud))
}

pub fn load_template(geometry: &Path, features: &Path) -> Result<MoleculeTemplate, LoadError> {
    let (points, table) = read_pair(geometry, features)?;
    let parts = split_template_table(&table)?;
    let cloud = PointCloud::new(points, parts.features, parts.feature_names)?;
    let template = MoleculeTemplate::new(
        name_from_path(geometry),
        cloud,
        parts.geom_dev,
        parts.feature_dev,
    )?;
    Ok(template)
}

/// A template feature table split into features and deviations.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateColumns {
    pub feature_names: Vec<String>,
    pub features: DMatrix<f64>,
    pub geom_dev: Vec<f64>,
    pub feature_dev: DMatrix<f64>,
}

/// Splits a template table into feature columns and their deviations.
///
/// `geom_dev` and `<feature>_dev` columns are optional and default to `1.0`.
pub fn split_template_table(table: &AmatTable) -> Result<TemplateColumns, LoadError> {
    let rows = table.nrows();
    let mut feature_cols = Vec::new();
    let mut geom_col = None;
    let mut dev_cols: Vec<(usize, &str)> = Vec::new();

    for (idx, name) in table.names.iter().enumerate() {
        if name == GEOM_DEV_COLUMN {
            geom_col = Some(idx);
        } else if let Some(base) = name.strip_suffix(FEATURE_DEV_SUFFIX) {
            dev_cols.push((idx, base));
        } else {
            feature_cols.push(idx);
        }
    }

    let feature_names: Vec<String> = feature_cols
        .iter()
        .map(|&idx| table.names[idx].clone())
        .collect();

    let mut feature_dev = DMatrix::from_element(rows, feature_cols.len(), 1.0);
    for (dev_idx, base) in dev_cols {
        let feature_pos = feature_names
            .iter()
            .position(|n| n == base)
            .ok_or_else(|| LoadError::OrphanDeviationColumn(table.names[dev_idx].clone()))?;
        feature_dev.set_column(feature_pos, &table.data.column(dev_idx));
    }

    let geom_dev = match geom_col {
        Some(idx) => table.data.column(idx).iter().copied().collect(),
        None => vec![1.0; rows],
    };

    Ok(TemplateColumns {
        feature_names,
        features: table.select_columns(&feature_cols),
        geom_dev,
        feature_dev,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const GEOMETRY: &str = "#VRML V2.0 utf8\nShape { geometry PointSet { coord Coordinate { point [ 0 0 0, 1 0 0, 0 1 0 ] } } }\n";

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).expect("Failed to write temporary file for test");
        path
    }

    #[test]
    fn loads_molecule_with_name_from_geometry_file() {
        let dir = tempfile::tempdir().unwrap();
        let geometry = write(&dir, "ligand.wrl", GEOMETRY);
        let features = write(&dir, "ligand.amat", "#: charge\n0.1\n0.2\n0.3\n");

        let molecule = load_molecule(&geometry, &features).unwrap();
        assert_eq!(molecule.name, "ligand");
        assert_eq!(molecule.len(), 3);
        assert_eq!(molecule.cloud().feature_names(), &["charge".to_string()]);
    }

    #[test]
    fn loads_template_with_deviation_columns() {
        let dir = tempfile::tempdir().unwrap();
        let geometry = write(&dir, "site.wrl", GEOMETRY);
        let features = write(
            &dir,
            "site.amat",
            "#: charge geom_dev charge_dev donor\n0.1 0.5 2 1\n0.2 0.5 2 0\n0.3 1.5 4 1\n",
        );

        let template = load_template(&geometry, &features).unwrap();
        assert_eq!(
            template.cloud().feature_names(),
            &["charge".to_string(), "donor".to_string()]
        );
        assert_eq!(template.geom_dev(), &[0.5, 0.5, 1.5]);
        assert_eq!(template.feature_dev()[(2, 0)], 4.0);
        assert_eq!(template.feature_dev()[(2, 1)], 1.0);
        assert_eq!(template.cloud().features()[(1, 1)], 0.0);
    }

    #[test]
    fn row_count_mismatch_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let geometry = write(&dir, "m.wrl", GEOMETRY);
        let features = write(&dir, "m.amat", "#: charge\n0.1\n0.2\n");

        let result = load_molecule(&geometry, &features);
        assert!(matches!(
            result,
            Err(LoadError::RowCountMismatch { points: 3, rows: 2 })
        ));
    }

    #[test]
    fn orphan_deviation_column_is_rejected() {
        let table = AmatTable::new(
            vec!["charge".to_string(), "donor_dev".to_string()],
            DMatrix::from_element(1, 2, 1.0),
        )
        .unwrap();
        let result = split_template_table(&table);
        assert!(matches!(
            result,
            Err(LoadError::OrphanDeviationColumn(name)) if name == "donor_dev"
        ));
    }

    #[test]
    fn missing_files_report_their_path() {
        let dir = tempfile::tempdir().unwrap();
        let features = write(&dir, "m.amat", "#: charge\n0.1\n");
        let result = load_molecule(&dir.path().join("absent.wrl"), &features);
        assert!(matches!(result, Err(LoadError::Geometry { .. })));
    }
}
