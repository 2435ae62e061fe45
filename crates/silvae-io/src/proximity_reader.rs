//! Dense proximity matrix CSV reader.

use std::path::{Path, PathBuf};

use silvae_proximity::DissimilarityMatrix;
use tracing::{info, instrument};

use crate::IoError;

/// Reads a precomputed `n × n` proximity matrix from a header-less CSV.
///
/// Row `i`, column `j` holds the share of ensemble members placing
/// observations `i` and `j` in the same leaf. The result is the matching
/// dissimilarity matrix (`1 - proximity`).
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::NonFiniteValue`] | A cell is NaN, Inf, or unparseable |
/// | [`IoError::EmptyDataset`] | The file has no rows |
/// | [`IoError::Proximity`] | Not square, not symmetric, or entries outside [0, 1] |
pub struct ProximityReader {
    path: PathBuf,
}

impl ProximityReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read and validate the matrix.
    #[instrument(skip_all, fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<DissimilarityMatrix, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // Ragged rows are reported as NotSquare by the matrix constructor.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let mut rows = Vec::new();
        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| IoError::CsvParse {
                path: self.path.clone(),
                offset: e.position().map_or(0, |p| p.byte()),
                source: e,
            })?;
            let row = record
                .iter()
                .enumerate()
                .map(|(col, raw)| match raw.parse::<f64>() {
                    Ok(value) if value.is_finite() => Ok(value),
                    _ => Err(IoError::NonFiniteValue {
                        path: self.path.clone(),
                        row_index,
                        column: col.to_string(),
                        raw: raw.to_string(),
                    }),
                })
                .collect::<Result<Vec<f64>, IoError>>()?;
            rows.push(row);
        }

        if rows.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        let matrix = DissimilarityMatrix::from_proximity_rows(&rows).map_err(|e| {
            IoError::Proximity {
                path: self.path.clone(),
                source: e,
            }
        })?;
        info!(n_observations = matrix.len(), "proximity matrix loaded");
        Ok(matrix)
    }
}
