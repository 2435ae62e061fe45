//! CSV training-table reader with full input validation.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use silvae_tree::{Dataset, Predictor};
use tracing::{debug, info, instrument};

use crate::IoError;

/// How one header column is parsed.
enum ColumnRole {
    Response,
    Continuous,
    Categorical,
}

/// Reads a training table from a CSV file.
///
/// Expected CSV format:
/// - Header row required; column names must be unique
/// - One column is the numeric response, chosen by name
/// - Columns listed via [`DatasetReader::with_categorical`] are categorical
///   labels; every other column is a continuous predictor
/// - All rows must have the same number of columns
///
/// Predictors keep header order.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::DuplicateColumn`] | Header names a column twice |
/// | [`IoError::MissingColumn`] | Response or a categorical column is not in the header |
/// | [`IoError::NoPredictorColumns`] | Only the response column is present |
/// | [`IoError::InconsistentRowLength`] | Row has different column count than header |
/// | [`IoError::NonFiniteValue`] | Numeric cell is NaN, Inf, or unparseable |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
/// | [`IoError::Dataset`] | Parsed columns fail dataset validation |
pub struct DatasetReader {
    path: PathBuf,
    response: String,
    categorical: Vec<String>,
}

impl DatasetReader {
    /// Create a reader for `path` whose response column is `response`.
    pub fn new(path: &Path, response: &str) -> Self {
        Self {
            path: path.to_path_buf(),
            response: response.to_string(),
            categorical: Vec::new(),
        }
    }

    /// Treat the named columns as categorical predictors.
    #[must_use]
    pub fn with_categorical<S: AsRef<str>>(mut self, columns: &[S]) -> Self {
        self.categorical = columns.iter().map(|c| c.as_ref().to_string()).collect();
        self
    }

    /// Read and validate the CSV file, returning a [`Dataset`].
    #[instrument(skip(self), fields(path = %self.path.display(), response = %self.response))]
    pub fn read(&self) -> Result<Dataset, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) so that InconsistentRowLength fires instead of a CsvParse error.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let header: Vec<String> = rdr
            .headers()
            .map_err(|e| self.csv_error(e))?
            .iter()
            .map(String::from)
            .collect();
        let roles = self.column_roles(&header)?;
        debug!(n_columns = header.len(), "read CSV header");

        let n_cols = header.len();
        let mut response = Vec::new();
        let mut numeric: Vec<Vec<f64>> = vec![Vec::new(); n_cols];
        let mut labels: Vec<Vec<String>> = vec![Vec::new(); n_cols];

        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| self.csv_error(e))?;
            if record.len() != n_cols {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected: n_cols,
                    got: record.len(),
                });
            }
            for (col, (raw, role)) in record.iter().zip(&roles).enumerate() {
                match role {
                    ColumnRole::Categorical => labels[col].push(raw.to_string()),
                    ColumnRole::Continuous => {
                        numeric[col].push(self.parse_finite(raw, row_index, &header[col])?);
                    }
                    ColumnRole::Response => {
                        response.push(self.parse_finite(raw, row_index, &header[col])?);
                    }
                }
            }
        }

        if response.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        let predictors: Vec<Predictor> = header
            .iter()
            .zip(&roles)
            .enumerate()
            .filter_map(|(col, (name, role))| match role {
                ColumnRole::Response => None,
                ColumnRole::Continuous => Some(Predictor::continuous(
                    name.as_str(),
                    std::mem::take(&mut numeric[col]),
                )),
                ColumnRole::Categorical => Some(Predictor::from_labels(name.as_str(), &labels[col])),
            })
            .collect();

        let n_predictors = predictors.len();
        let dataset = Dataset::new(predictors, self.response.as_str(), response).map_err(|e| {
            IoError::Dataset {
                path: self.path.clone(),
                source: e,
            }
        })?;

        info!(
            n_observations = dataset.n_observations(),
            n_predictors,
            n_categorical = self.categorical.len(),
            "dataset loaded"
        );
        Ok(dataset)
    }

    /// Classify each header column, validating names.
    fn column_roles(&self, header: &[String]) -> Result<Vec<ColumnRole>, IoError> {
        let mut seen = HashSet::new();
        for name in header {
            if !seen.insert(name.as_str()) {
                return Err(IoError::DuplicateColumn {
                    path: self.path.clone(),
                    column: name.clone(),
                });
            }
        }
        for wanted in std::iter::once(&self.response).chain(&self.categorical) {
            if !seen.contains(wanted.as_str()) {
                return Err(IoError::MissingColumn {
                    path: self.path.clone(),
                    column: wanted.clone(),
                });
            }
        }
        if header.len() < 2 {
            return Err(IoError::NoPredictorColumns {
                path: self.path.clone(),
            });
        }

        Ok(header
            .iter()
            .map(|name| {
                if *name == self.response {
                    ColumnRole::Response
                } else if self.categorical.contains(name) {
                    ColumnRole::Categorical
                } else {
                    ColumnRole::Continuous
                }
            })
            .collect())
    }

    fn parse_finite(&self, raw: &str, row_index: usize, column: &str) -> Result<f64, IoError> {
        match raw.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(value),
            _ => Err(IoError::NonFiniteValue {
                path: self.path.clone(),
                row_index,
                column: column.to_string(),
                raw: raw.to_string(),
            }),
        }
    }

    fn csv_error(&self, e: csv::Error) -> IoError {
        IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use silvae_tree::Column;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn read_mixed_columns() {
        let csv = "rooms,soil,price,age\n3,clay,200.5,10\n4,sand,310.0,2\n2,clay,150.0,40\n";
        let f = write_csv(csv);
        let ds = DatasetReader::new(f.path(), "price")
            .with_categorical(&["soil"])
            .read()
            .unwrap();
        assert_eq!(ds.n_observations(), 3);
        assert_eq!(ds.predictor_names(), vec!["rooms", "soil", "age"]);
        assert_eq!(ds.response_name(), "price");
        assert_eq!(ds.response(), &[200.5, 310.0, 150.0]);
        match ds.predictors()[1].column() {
            Column::Categorical { codes, levels } => {
                assert_eq!(codes, &[0, 1, 0]);
                assert_eq!(levels, &["clay", "sand"]);
            }
            Column::Continuous(_) => panic!("soil should be categorical"),
        }
    }

    #[test]
    fn missing_response_error() {
        let f = write_csv("a,b\n1,2\n");
        let err = DatasetReader::new(f.path(), "y").read().unwrap_err();
        assert!(matches!(err, IoError::MissingColumn { ref column, .. } if column == "y"));
    }

    #[test]
    fn missing_categorical_error() {
        let f = write_csv("a,y\n1,2\n");
        let err = DatasetReader::new(f.path(), "y")
            .with_categorical(&["soil"])
            .read()
            .unwrap_err();
        assert!(matches!(err, IoError::MissingColumn { ref column, .. } if column == "soil"));
    }

    #[test]
    fn duplicate_column_error() {
        let f = write_csv("a,a,y\n1,2,3\n");
        let err = DatasetReader::new(f.path(), "y").read().unwrap_err();
        assert!(matches!(err, IoError::DuplicateColumn { .. }));
    }

    #[test]
    fn no_predictor_columns_error() {
        let f = write_csv("y\n1\n2\n");
        let err = DatasetReader::new(f.path(), "y").read().unwrap_err();
        assert!(matches!(err, IoError::NoPredictorColumns { .. }));
    }

    #[test]
    fn empty_dataset_error() {
        let f = write_csv("a,y\n");
        let err = DatasetReader::new(f.path(), "y").read().unwrap_err();
        assert!(matches!(err, IoError::EmptyDataset { .. }));
    }

    #[test]
    fn inconsistent_row_length_error() {
        let f = write_csv("a,b,y\n1,2,3\n4,5\n");
        let err = DatasetReader::new(f.path(), "y").read().unwrap_err();
        assert!(matches!(err, IoError::InconsistentRowLength { row_index: 1, .. }));
    }

    #[test]
    fn non_finite_value_error() {
        let f = write_csv("a,y\nNaN,1\n");
        let err = DatasetReader::new(f.path(), "y").read().unwrap_err();
        assert!(matches!(err, IoError::NonFiniteValue { ref column, .. } if column == "a"));
    }

    #[test]
    fn unparseable_response_error() {
        let f = write_csv("a,y\n1,abc\n");
        let err = DatasetReader::new(f.path(), "y").read().unwrap_err();
        assert!(matches!(err, IoError::NonFiniteValue { ref raw, .. } if raw == "abc"));
    }

    #[test]
    fn missing_file_error() {
        let err = DatasetReader::new(Path::new("/nonexistent/data.csv"), "y")
            .read()
            .unwrap_err();
        assert!(matches!(err, IoError::FileNotFound { .. }));
    }
}
