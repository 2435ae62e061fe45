//! JSON ensemble export reader.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use silvae_proximity::Ensemble;
use tracing::{info, instrument, warn};

use crate::IoError;

/// On-disk shape of an ensemble export.
#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct EnsembleDocument {
    /// `leaves[member][observation]`, `null` when unrecorded.
    leaves: Vec<Vec<Option<u32>>>,
    /// Importance score keyed by predictor name.
    importance: BTreeMap<String, f64>,
    /// In-sample ensemble predictions.
    #[serde(default)]
    predictions: Option<Vec<f64>>,
}

/// Reads a fitted ensemble's leaf assignments, importances, and predictions.
///
/// Expected JSON format:
///
/// ```json
/// { "leaves": [[0, 0, 1, null], [3, 3, 3, 4]],
///   "importance": { "x1": 12.5, "x2": 0.3 },
///   "predictions": [1.0, 1.1, 2.0, 2.2] }
/// ```
///
/// `predictions` is optional. Importances are aligned to the dataset's
/// predictor order; every predictor needs exactly one score.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::JsonParse`] | Document is not valid JSON of the expected shape |
/// | [`IoError::MissingImportance`] | A dataset predictor has no importance |
/// | [`IoError::UnknownPredictor`] | An importance key names no dataset predictor |
/// | [`IoError::ObservationCountMismatch`] | A member or the predictions miss the expected observation count |
/// | [`IoError::Ensemble`] | Leaves are empty or scores are not finite |
pub struct EnsembleReader {
    path: PathBuf,
    n_observations: Option<usize>,
}

impl EnsembleReader {
    /// Create a new reader for the given JSON file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            n_observations: None,
        }
    }

    /// Require every member and the predictions to cover `n` observations.
    #[must_use]
    pub fn with_observations(mut self, n: usize) -> Self {
        self.n_observations = Some(n);
        self
    }

    /// Read the ensemble, ordering importances like `predictor_names`.
    #[instrument(skip_all, fields(path = %self.path.display()))]
    pub fn read(&self, predictor_names: &[String]) -> Result<Ensemble, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;
        let mut document: EnsembleDocument = serde_json::from_reader(std::io::BufReader::new(file))
            .map_err(|e| IoError::JsonParse {
                path: self.path.clone(),
                source: e,
            })?;

        let mut importances = Vec::with_capacity(predictor_names.len());
        for name in predictor_names {
            let score = document
                .importance
                .remove(name)
                .ok_or_else(|| IoError::MissingImportance {
                    path: self.path.clone(),
                    name: name.clone(),
                })?;
            importances.push(score);
        }
        if let Some(name) = document.importance.keys().next().cloned() {
            return Err(IoError::UnknownPredictor {
                path: self.path.clone(),
                name,
            });
        }

        if let Some(expected) = self.n_observations {
            self.check_coverage(&document, expected)?;
        }

        let n_members = document.leaves.len();
        let mut ensemble = Ensemble::new(document.leaves, importances).map_err(|e| {
            IoError::Ensemble {
                path: self.path.clone(),
                source: e,
            }
        })?;
        match document.predictions {
            Some(predictions) => {
                ensemble = ensemble
                    .with_predictions(predictions)
                    .map_err(|e| IoError::Ensemble {
                        path: self.path.clone(),
                        source: e,
                    })?;
            }
            None => warn!("ensemble export carries no predictions"),
        }

        info!(n_members, "ensemble loaded");
        Ok(ensemble)
    }

    fn check_coverage(&self, document: &EnsembleDocument, expected: usize) -> Result<(), IoError> {
        let members = document
            .leaves
            .iter()
            .enumerate()
            .map(|(m, leaves)| (format!("leaves[{m}]"), leaves.len()));
        let predictions = document
            .predictions
            .as_ref()
            .map(|p| ("predictions".to_string(), p.len()));
        for (section, got) in members.chain(predictions) {
            if got != expected {
                return Err(IoError::ObservationCountMismatch {
                    path: self.path.clone(),
                    section,
                    expected,
                    got,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_json(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn importances_follow_dataset_order() {
        let f = write_json(
            r#"{ "leaves": [[0, 0, 1, null], [3, 3, 3, 4]],
                 "importance": { "x1": 12.5, "x2": 0.3 },
                 "predictions": [1.0, 1.1, 2.0, 2.2] }"#,
        );
        let ens = EnsembleReader::new(f.path()).read(&names(&["x2", "x1"])).unwrap();
        assert_eq!(ens.n_members(), 2);
        assert_eq!(ens.importances(), &[0.3, 12.5]);
        assert_eq!(ens.members()[0].len(), 4);
        assert_eq!(ens.members()[0].leaf(3), None);
        assert_eq!(ens.predictions(), Some(&[1.0, 1.1, 2.0, 2.2][..]));
    }

    #[test]
    fn short_predictions_rejected_with_observation_count() {
        let f = write_json(
            r#"{ "leaves": [[0, 0, 1, 1]], "importance": { "x": 1.0 }, "predictions": [1.0, 2.0] }"#,
        );
        let err = EnsembleReader::new(f.path())
            .with_observations(4)
            .read(&names(&["x"]))
            .unwrap_err();
        assert!(matches!(
            err,
            IoError::ObservationCountMismatch { ref section, expected: 4, got: 2, .. }
                if section == "predictions"
        ));
    }

    #[test]
    fn short_member_rejected_with_observation_count() {
        let f = write_json(r#"{ "leaves": [[0, 0, 1], [0, 1]], "importance": { "x": 1.0 } }"#);
        let err = EnsembleReader::new(f.path())
            .with_observations(3)
            .read(&names(&["x"]))
            .unwrap_err();
        assert!(matches!(
            err,
            IoError::ObservationCountMismatch { ref section, got: 2, .. } if section == "leaves[1]"
        ));
    }

    #[test]
    fn predictions_optional() {
        let f = write_json(r#"{ "leaves": [[0, 1]], "importance": { "x": 1.0 } }"#);
        let ens = EnsembleReader::new(f.path()).read(&names(&["x"])).unwrap();
        assert!(ens.predictions().is_none());
    }

    #[test]
    fn missing_importance_error() {
        let f = write_json(r#"{ "leaves": [[0]], "importance": { "x": 1.0 } }"#);
        let err = EnsembleReader::new(f.path()).read(&names(&["x", "z"])).unwrap_err();
        assert!(matches!(err, IoError::MissingImportance { ref name, .. } if name == "z"));
    }

    #[test]
    fn unknown_predictor_error() {
        let f = write_json(r#"{ "leaves": [[0]], "importance": { "x": 1.0, "w": 2.0 } }"#);
        let err = EnsembleReader::new(f.path()).read(&names(&["x"])).unwrap_err();
        assert!(matches!(err, IoError::UnknownPredictor { ref name, .. } if name == "w"));
    }

    #[test]
    fn empty_leaves_error() {
        let f = write_json(r#"{ "leaves": [], "importance": { "x": 1.0 } }"#);
        let err = EnsembleReader::new(f.path()).read(&names(&["x"])).unwrap_err();
        assert!(matches!(err, IoError::Ensemble { .. }));
    }

    #[test]
    fn negative_leaf_is_parse_error() {
        let f = write_json(r#"{ "leaves": [[0, -1]], "importance": { "x": 1.0 } }"#);
        let err = EnsembleReader::new(f.path()).read(&names(&["x"])).unwrap_err();
        assert!(matches!(err, IoError::JsonParse { .. }));
    }

    #[test]
    fn unknown_field_is_parse_error() {
        let f = write_json(r#"{ "leaves": [[0]], "importance": { "x": 1.0 }, "trees": 5 }"#);
        let err = EnsembleReader::new(f.path()).read(&names(&["x"])).unwrap_err();
        assert!(matches!(err, IoError::JsonParse { .. }));
    }
}
