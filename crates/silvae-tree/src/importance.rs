//! Importance-based candidate selection and surrogate importance ranking.

use crate::node::PredictorIndex;

/// Slack on the cumulative-fraction comparison.
const FRACTION_TOLERANCE: f64 = 1e-12;

/// A ranked predictor with name, importance score, and rank.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RankedPredictor {
    /// Predictor name.
    pub name: String,
    /// Normalized importance score (sums to 1.0 across predictors, or all zero).
    pub importance: f64,
    /// 1-based rank (1 = most important).
    pub rank: usize,
}

/// Select candidate split predictors from ensemble importances.
///
/// Predictors are ranked by importance descending (negative scores count
/// as zero, ties keep dataset order) and taken until their running share of
/// the total reaches `imp_total`. The top predictor is always selected.
/// `imp_total >= 1.0` or a zero total selects every predictor. The result
/// is returned in dataset order.
pub(crate) fn select_candidates(importances: &[f64], imp_total: f64) -> Vec<PredictorIndex> {
    let clamped: Vec<f64> = importances.iter().map(|&v| v.max(0.0)).collect();
    let total: f64 = clamped.iter().sum();

    if imp_total >= 1.0 || total <= 0.0 {
        return (0..importances.len()).map(PredictorIndex::new).collect();
    }

    let mut order: Vec<usize> = (0..clamped.len()).collect();
    order.sort_by(|&a, &b| clamped[b].total_cmp(&clamped[a]));

    let mut selected = Vec::new();
    let mut cumulative = 0.0;
    for idx in order {
        if !selected.is_empty() && cumulative / total >= imp_total - FRACTION_TOLERANCE {
            break;
        }
        selected.push(idx);
        cumulative += clamped[idx];
    }

    selected.sort_unstable();
    selected.into_iter().map(PredictorIndex::new).collect()
}

/// Normalize per-predictor totals and rank them.
///
/// Sorts descending by importance and assigns 1-based ranks; ties keep
/// dataset order.
pub(crate) fn rank_importances(totals: &[f64], names: &[String]) -> Vec<RankedPredictor> {
    let sum: f64 = totals.iter().sum();

    let mut ranked: Vec<RankedPredictor> = names
        .iter()
        .zip(totals.iter())
        .map(|(name, &raw)| RankedPredictor {
            name: name.clone(),
            importance: if sum > 0.0 { raw / sum } else { 0.0 },
            rank: 0, // will be set after sorting
        })
        .collect();

    ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));

    for (i, predictor) in ranked.iter_mut().enumerate() {
        predictor.rank = i + 1;
    }

    ranked
}
