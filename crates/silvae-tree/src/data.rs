//! Training dataset: typed predictor columns plus one numeric response.

use std::collections::HashSet;

use crate::error::TreeError;

/// Values of one predictor column.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Column {
    /// Numeric predictor; splits are thresholds between sorted values.
    Continuous(Vec<f64>),
    /// Categorical predictor; `codes[obs]` indexes into `levels`.
    Categorical {
        /// Per-observation level code.
        codes: Vec<u32>,
        /// Level names, addressed by code.
        levels: Vec<String>,
    },
}

impl Column {
    /// Return the number of observations in the column.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Column::Continuous(values) => values.len(),
            Column::Categorical { codes, .. } => codes.len(),
        }
    }

    /// Return true if the column holds no observations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return true for categorical columns.
    #[must_use]
    pub fn is_categorical(&self) -> bool {
        matches!(self, Column::Categorical { .. })
    }
}

/// A named predictor column.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Predictor {
    name: String,
    column: Column,
}

impl Predictor {
    /// Create a continuous predictor.
    #[must_use]
    pub fn continuous(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            column: Column::Continuous(values),
        }
    }

    /// Create a categorical predictor from explicit codes and levels.
    #[must_use]
    pub fn categorical(name: impl Into<String>, codes: Vec<u32>, levels: Vec<String>) -> Self {
        Self {
            name: name.into(),
            column: Column::Categorical { codes, levels },
        }
    }

    /// Create a categorical predictor from raw labels.
    ///
    /// Levels are numbered in order of first appearance.
    #[must_use]
    pub fn from_labels<S: AsRef<str>>(name: impl Into<String>, labels: &[S]) -> Self {
        let mut levels: Vec<String> = Vec::new();
        let codes = labels
            .iter()
            .map(|label| {
                let label = label.as_ref();
                let code = match levels.iter().position(|l| l == label) {
                    Some(pos) => pos,
                    None => {
                        levels.push(label.to_string());
                        levels.len() - 1
                    }
                };
                code as u32
            })
            .collect();
        Self::categorical(name, codes, levels)
    }

    /// Return the predictor name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the predictor values.
    #[must_use]
    pub fn column(&self) -> &Column {
        &self.column
    }
}

/// A validated training dataset.
///
/// Every predictor column has one value per observation, every value is
/// finite, and categorical codes address declared levels. Observation `i`
/// is row `i` in every column and `response()[i]`.
#[derive(Debug, Clone)]
pub struct Dataset {
    predictors: Vec<Predictor>,
    response_name: String,
    response: Vec<f64>,
}

impl Dataset {
    /// Create a dataset, validating shape and values.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`TreeError::EmptyDataset`] | `response` is empty |
    /// | [`TreeError::ZeroPredictors`] | `predictors` is empty |
    /// | [`TreeError::DuplicatePredictor`] | two predictors share a name |
    /// | [`TreeError::NonFiniteResponse`] | a response value is NaN or infinite |
    /// | [`TreeError::ColumnLengthMismatch`] | a column length differs from `response` |
    /// | [`TreeError::NonFiniteValue`] | a continuous value is NaN or infinite |
    /// | [`TreeError::CategoryOutOfRange`] | a code has no declared level |
    pub fn new(
        predictors: Vec<Predictor>,
        response_name: impl Into<String>,
        response: Vec<f64>,
    ) -> Result<Self, TreeError> {
        if response.is_empty() {
            return Err(TreeError::EmptyDataset);
        }
        if predictors.is_empty() {
            return Err(TreeError::ZeroPredictors);
        }
        let mut seen = HashSet::new();
        if let Some(dup) = predictors.iter().find(|p| !seen.insert(p.name.as_str())) {
            return Err(TreeError::DuplicatePredictor {
                predictor: dup.name.clone(),
            });
        }
        if let Some(observation) = response.iter().position(|y| !y.is_finite()) {
            return Err(TreeError::NonFiniteResponse { observation });
        }

        let n = response.len();
        for predictor in &predictors {
            if predictor.column.len() != n {
                return Err(TreeError::ColumnLengthMismatch {
                    predictor: predictor.name.clone(),
                    expected: n,
                    got: predictor.column.len(),
                });
            }
            match &predictor.column {
                Column::Continuous(values) => {
                    if let Some(observation) = values.iter().position(|v| !v.is_finite()) {
                        return Err(TreeError::NonFiniteValue {
                            predictor: predictor.name.clone(),
                            observation,
                        });
                    }
                }
                Column::Categorical { codes, levels } => {
                    if let Some((observation, &code)) = codes
                        .iter()
                        .enumerate()
                        .find(|&(_, &c)| c as usize >= levels.len())
                    {
                        return Err(TreeError::CategoryOutOfRange {
                            predictor: predictor.name.clone(),
                            observation,
                            code,
                            n_levels: levels.len(),
                        });
                    }
                }
            }
        }

        Ok(Self {
            predictors,
            response_name: response_name.into(),
            response,
        })
    }

    /// Return the number of observations.
    #[must_use]
    pub fn n_observations(&self) -> usize {
        self.response.len()
    }

    /// Return the number of predictor columns.
    #[must_use]
    pub fn n_predictors(&self) -> usize {
        self.predictors.len()
    }

    /// Return the predictor columns in dataset order.
    #[must_use]
    pub fn predictors(&self) -> &[Predictor] {
        &self.predictors
    }

    /// Return the predictor names in dataset order.
    #[must_use]
    pub fn predictor_names(&self) -> Vec<String> {
        self.predictors.iter().map(|p| p.name.clone()).collect()
    }

    /// Return the response column name.
    #[must_use]
    pub fn response_name(&self) -> &str {
        &self.response_name
    }

    /// Return the response values.
    #[must_use]
    pub fn response(&self) -> &[f64] {
        &self.response
    }
}
