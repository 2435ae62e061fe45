//! CSV and JSON result writers for distillation outputs.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use silvae_proximity::DissimilarityMatrix;
use silvae_tree::{RankedPredictor, Settings, SurrogateTree, TreeFrame};
use silvae_validate::{Agreement, MantelResult};
use tracing::{debug, info, instrument};

use crate::domain::ExperimentName;
use crate::IoError;

/// Writes distillation results into an output directory.
///
/// Creates the output directory on construction if it does not exist.
/// Output files are named `{experiment}_tree.csv`,
/// `{experiment}_distill.json` and `{experiment}_dissimilarity.csv`.
pub struct ResultWriter {
    output_dir: PathBuf,
    experiment: ExperimentName,
}

impl ResultWriter {
    /// Create a new writer targeting the given directory and experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), experiment = %experiment))]
    pub fn new(output_dir: &Path, experiment: ExperimentName) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            experiment,
        })
    }

    /// Return the path of the artifact with the given suffix.
    pub fn artifact_path(&self, suffix: &str) -> PathBuf {
        self.output_dir.join(self.experiment.file_name(suffix))
    }

    /// Write the node table to `{experiment}_tree.csv`, one row per node.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::CsvWrite`] if the file cannot be created or written.
    #[instrument(skip_all, fields(n_rows = frame.len()))]
    pub fn write_frame(&self, frame: &TreeFrame) -> Result<PathBuf, IoError> {
        let path = self.artifact_path("tree.csv");
        let csv_error = |e| IoError::CsvWrite {
            path: path.clone(),
            source: e,
        };

        let mut wtr = csv::Writer::from_path(&path).map_err(csv_error)?;
        for row in frame {
            wtr.serialize(row).map_err(csv_error)?;
        }
        wtr.flush().map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;

        info!(path = %path.display(), "tree frame written");
        Ok(path)
    }

    /// Write the run summary to `{experiment}_distill.json`.
    ///
    /// `mantel` and `agreement` are written as `null` when not computed.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::Serialize`] | A value cannot be represented as JSON |
    /// | [`IoError::WriteFile`] | The file cannot be written |
    #[instrument(skip_all)]
    pub fn write_distill(
        &self,
        tree: &SurrogateTree,
        n_members: usize,
        mantel: Option<&MantelResult>,
        agreement: Option<&Agreement>,
    ) -> Result<PathBuf, IoError> {
        let path = self.artifact_path("distill.json");

        let artifact = DistillArtifact {
            experiment: self.experiment.as_str(),
            response: tree.response_name(),
            n_observations: tree.n_observations(),
            n_members,
            settings: tree.settings(),
            tree: TreeSummary {
                n_nodes: tree.n_nodes(),
                n_leaves: tree.n_leaves(),
                depth: tree.depth(),
            },
            candidate_predictors: tree.candidate_names(),
            variable_importances: tree.variable_importances(),
            mantel,
            agreement,
        };

        let json = serde_json::to_string_pretty(&artifact).map_err(|e| IoError::Serialize {
            path: path.clone(),
            source: e,
        })?;
        fs::write(&path, &json).map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;

        info!(path = %path.display(), "distill summary written");
        Ok(path)
    }

    /// Write the full symmetric matrix to `{experiment}_dissimilarity.csv`.
    ///
    /// No header; row `i`, column `j` holds the dissimilarity of
    /// observations `i` and `j`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::CsvWrite`] if the file cannot be created or written.
    #[instrument(skip_all, fields(n = matrix.len()))]
    pub fn write_dissimilarity(&self, matrix: &DissimilarityMatrix) -> Result<PathBuf, IoError> {
        let path = self.artifact_path("dissimilarity.csv");
        let csv_error = |e| IoError::CsvWrite {
            path: path.clone(),
            source: e,
        };

        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&path)
            .map_err(csv_error)?;
        for i in 0..matrix.len() {
            wtr.write_record(matrix.row(i).iter().map(f64::to_string))
                .map_err(csv_error)?;
        }
        wtr.flush().map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;

        info!(path = %path.display(), "dissimilarity matrix written");
        Ok(path)
    }
}

// ---------------------------------------------------------------------------
// Serialization artifacts
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct DistillArtifact<'a> {
    experiment: &'a str,
    response: &'a str,
    n_observations: usize,
    n_members: usize,
    settings: &'a Settings,
    tree: TreeSummary,
    candidate_predictors: Vec<&'a str>,
    variable_importances: Vec<RankedPredictor>,
    mantel: Option<&'a MantelResult>,
    agreement: Option<&'a Agreement>,
}

#[derive(Serialize)]
struct TreeSummary {
    n_nodes: usize,
    n_leaves: usize,
    depth: usize,
}
