//! Node splitting by normalized mean-square error.

use crate::data::{Column, Dataset};
use crate::node::{PredictorIndex, SplitRule};
use crate::settings::Settings;

/// A candidate must beat the incumbent by more than this to replace it.
const TIE_TOLERANCE: f64 = 1e-12;

/// Result of finding the best split for a node.
#[derive(Debug, Clone)]
pub(crate) struct SplitResult {
    /// Routing rule of the split.
    pub(crate) rule: SplitRule,
    /// `(sse_left + sse_right) / sse_parent`; lower is better.
    pub(crate) nmse: f64,
    /// Sum of squared deviations in the left child.
    pub(crate) sse_left: f64,
    /// Sum of squared deviations in the right child.
    pub(crate) sse_right: f64,
    /// Observation indices going to the left child, ascending.
    pub(crate) left_indices: Vec<usize>,
    /// Observation indices going to the right child, ascending.
    pub(crate) right_indices: Vec<usize>,
}

/// Mean and sum of squared deviations of the response over `observations`.
pub(crate) fn node_moments(response: &[f64], observations: &[usize]) -> (f64, f64) {
    let n = observations.len() as f64;
    let mean = observations.iter().map(|&i| response[i]).sum::<f64>() / n;
    let sse = observations
        .iter()
        .map(|&i| {
            let d = response[i] - mean;
            d * d
        })
        .sum();
    (mean, sse)
}

/// Sum of squared deviations from running sums: `Σy² − (Σy)²/n`, floored at 0.
#[inline]
fn sse_from_sums(sum: f64, sum_sq: f64, n: usize) -> f64 {
    (sum_sq - sum * sum / n as f64).max(0.0)
}

/// Pick at most `budget` of `len` positions, evenly spaced and ascending.
///
/// Always keeps the first and last position when `budget >= 2`.
fn evenly_spaced(len: usize, budget: usize) -> Vec<usize> {
    if len <= budget {
        return (0..len).collect();
    }
    if budget == 1 {
        return vec![len / 2];
    }
    let mut picked: Vec<usize> = (0..budget)
        .map(|k| k * (len - 1) / (budget - 1))
        .collect();
    picked.dedup();
    picked
}

/// Best split of one predictor: `(nmse, sse_left, sse_right, rule)`.
type PredictorBest = (f64, f64, f64, SplitRule);

/// Scan midpoints between consecutive distinct values of a continuous predictor.
fn best_threshold(
    predictor: PredictorIndex,
    values: &[f64],
    centered: &[(usize, f64)],
    parent_sse: f64,
    settings: &Settings,
) -> Option<PredictorBest> {
    let n = centered.len();
    let min_size = settings.min_node_size;

    let mut sorted: Vec<(f64, f64)> = centered.iter().map(|&(obs, yc)| (values[obs], yc)).collect();
    sorted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

    let total_sum: f64 = sorted.iter().map(|p| p.1).sum();
    let total_sq: f64 = sorted.iter().map(|p| p.1 * p.1).sum();

    // prefix[k] = sums over the first k sorted observations.
    let mut prefix = Vec::with_capacity(n + 1);
    prefix.push((0.0f64, 0.0f64));
    for &(_, yc) in &sorted {
        let (s, sq) = prefix[prefix.len() - 1];
        prefix.push((s + yc, sq + yc * yc));
    }

    // Feasible boundaries: left = sorted[..n_left], distinct neighbours, both sides large enough.
    let boundaries: Vec<usize> = (1..n)
        .filter(|&n_left| {
            sorted[n_left - 1].0 < sorted[n_left].0
                && n_left >= min_size
                && n - n_left >= min_size
        })
        .collect();

    let mut best: Option<PredictorBest> = None;
    for pick in evenly_spaced(boundaries.len(), settings.t_max) {
        let n_left = boundaries[pick];
        let (ls, lsq) = prefix[n_left];
        let sse_left = sse_from_sums(ls, lsq, n_left);
        let sse_right = sse_from_sums(total_sum - ls, total_sq - lsq, n - n_left);
        let nmse = (sse_left + sse_right) / parent_sse;

        if best.as_ref().is_none_or(|b| nmse < b.0 - TIE_TOLERANCE) {
            let lo = sorted[n_left - 1].0;
            let hi = sorted[n_left].0;
            let mid = lo + (hi - lo) / 2.0;
            let threshold = if mid < hi { mid } else { lo };
            best = Some((
                nmse,
                sse_left,
                sse_right,
                SplitRule::Threshold { predictor, threshold },
            ));
        }
    }
    best
}

/// Scan prefixes of categories ordered by mean response.
fn best_grouping(
    predictor: PredictorIndex,
    codes: &[u32],
    levels: &[String],
    centered: &[(usize, f64)],
    parent_sse: f64,
    settings: &Settings,
) -> Option<PredictorBest> {
    let n = centered.len();
    let min_size = settings.min_node_size;

    // Per-level (count, sum, sum of squares) over the node.
    let mut stats = vec![(0usize, 0.0f64, 0.0f64); levels.len()];
    for &(obs, yc) in centered {
        let s = &mut stats[codes[obs] as usize];
        s.0 += 1;
        s.1 += yc;
        s.2 += yc * yc;
    }

    let mut present: Vec<usize> = (0..levels.len()).filter(|&c| stats[c].0 > 0).collect();
    present.sort_by(|&a, &b| {
        let ma = stats[a].1 / stats[a].0 as f64;
        let mb = stats[b].1 / stats[b].0 as f64;
        ma.total_cmp(&mb).then(a.cmp(&b))
    });

    let total_sum: f64 = present.iter().map(|&c| stats[c].1).sum();
    let total_sq: f64 = present.iter().map(|&c| stats[c].2).sum();

    // Feasible prefixes as (prefix length, n_left, sum, sum_sq).
    let mut prefixes = Vec::new();
    let (mut nl, mut ls, mut lsq) = (0usize, 0.0f64, 0.0f64);
    for (k, &c) in present.iter().enumerate().take(present.len().saturating_sub(1)) {
        nl += stats[c].0;
        ls += stats[c].1;
        lsq += stats[c].2;
        if nl >= min_size && n - nl >= min_size {
            prefixes.push((k + 1, nl, ls, lsq));
        }
    }

    let mut best: Option<PredictorBest> = None;
    for pick in evenly_spaced(prefixes.len(), settings.t_max) {
        let (len, n_left, ls, lsq) = prefixes[pick];
        let sse_left = sse_from_sums(ls, lsq, n_left);
        let sse_right = sse_from_sums(total_sum - ls, total_sq - lsq, n - n_left);
        let nmse = (sse_left + sse_right) / parent_sse;

        if best.as_ref().is_none_or(|b| nmse < b.0 - TIE_TOLERANCE) {
            let left = present[..len].iter().map(|&c| levels[c].clone()).collect();
            best = Some((nmse, sse_left, sse_right, SplitRule::Categories { predictor, left }));
        }
    }
    best
}

/// Find the best acceptable split for a node.
///
/// Evaluates every candidate predictor in dataset order and keeps the split
/// with the lowest NMSE; ties keep the earlier predictor, then the lower
/// threshold. Only splits leaving at least `min_node_size` observations on
/// each side are considered.
///
/// Returns `None` when the node's response is constant, no predictor offers
/// a feasible split, or the best split decreases NMSE by less than
/// `max_dec` (or not at all).
pub(crate) fn find_best_split(
    dataset: &Dataset,
    observations: &[usize],
    parent_sse: f64,
    candidates: &[PredictorIndex],
    settings: &Settings,
) -> Option<SplitResult> {
    let response = dataset.response();
    let n = observations.len();
    if n < 2 || parent_sse <= 0.0 {
        return None;
    }
    let first = response[observations[0]];
    if observations.iter().all(|&i| response[i] == first) {
        return None;
    }

    // Center on the node mean to keep the running sums well conditioned.
    let mean = observations.iter().map(|&i| response[i]).sum::<f64>() / n as f64;
    let centered: Vec<(usize, f64)> = observations.iter().map(|&i| (i, response[i] - mean)).collect();

    let mut best: Option<PredictorBest> = None;
    for &predictor in candidates {
        let found = match dataset.predictors()[predictor.index()].column() {
            Column::Continuous(values) => {
                best_threshold(predictor, values, &centered, parent_sse, settings)
            }
            Column::Categorical { codes, levels } => {
                best_grouping(predictor, codes, levels, &centered, parent_sse, settings)
            }
        };
        if let Some(candidate) = found
            && best.as_ref().is_none_or(|b| candidate.0 < b.0 - TIE_TOLERANCE)
        {
            best = Some(candidate);
        }
    }

    let (nmse, sse_left, sse_right, rule) = best?;
    let decrease = 1.0 - nmse;
    if decrease <= 0.0 || decrease < settings.max_dec {
        return None;
    }

    let column = dataset.predictors()[rule.predictor().index()].column();
    let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = observations
        .iter()
        .partition(|&&obs| rule.goes_left(column, obs));

    Some(SplitResult {
        rule,
        nmse,
        sse_left,
        sse_right,
        left_indices,
        right_indices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Predictor;

    fn all_candidates(dataset: &Dataset) -> Vec<PredictorIndex> {
        (0..dataset.n_predictors()).map(PredictorIndex::new).collect()
    }

    fn split_of(dataset: &Dataset, settings: &Settings) -> Option<SplitResult> {
        let obs: Vec<usize> = (0..dataset.n_observations()).collect();
        let (_, sse) = node_moments(dataset.response(), &obs);
        find_best_split(dataset, &obs, sse, &all_candidates(dataset), settings)
    }

    #[test]
    fn moments_of_simple_node() {
        let (mean, sse) = node_moments(&[1.0, 2.0, 3.0, 100.0], &[0, 1, 2]);
        assert!((mean - 2.0).abs() < 1e-12);
        assert!((sse - 2.0).abs() < 1e-12);
    }

    #[test]
    fn evenly_spaced_keeps_ends() {
        assert_eq!(evenly_spaced(3, 5), vec![0, 1, 2]);
        assert_eq!(evenly_spaced(10, 4), vec![0, 3, 6, 9]);
        assert_eq!(evenly_spaced(10, 1), vec![5]);
        assert!(evenly_spaced(0, 3).is_empty());
    }

    #[test]
    fn two_clusters_split_at_gap_midpoint() {
        let x = vec![1.0, 2.0, 3.0, 10.0, 11.0, 12.0];
        let y = vec![0.0, 0.1, 0.2, 5.0, 5.1, 5.2];
        let ds = Dataset::new(vec![Predictor::continuous("x", x)], "y", y).unwrap();
        let split = split_of(&ds, &Settings::new().with_min_node_size(1)).unwrap();
        match split.rule {
            SplitRule::Threshold { threshold, .. } => assert!((threshold - 6.5).abs() < 1e-12),
            SplitRule::Categories { .. } => panic!("expected threshold split"),
        }
        assert_eq!(split.left_indices, vec![0, 1, 2]);
        assert_eq!(split.right_indices, vec![3, 4, 5]);
        assert!(split.nmse < 0.01);
    }

    #[test]
    fn constant_response_no_split() {
        let ds = Dataset::new(
            vec![Predictor::continuous("x", vec![1.0, 2.0, 3.0, 4.0])],
            "y",
            vec![0.1; 4],
        )
        .unwrap();
        assert!(split_of(&ds, &Settings::new().with_min_node_size(1).with_max_dec(0.0)).is_none());
    }

    #[test]
    fn single_valued_predictor_no_split() {
        let ds = Dataset::new(
            vec![Predictor::continuous("x", vec![2.0; 4])],
            "y",
            vec![1.0, 2.0, 3.0, 4.0],
        )
        .unwrap();
        assert!(split_of(&ds, &Settings::new().with_min_node_size(1)).is_none());
    }

    #[test]
    fn min_node_size_limits_children() {
        // The best unconstrained split isolates the outlier; with min size 2 it cannot.
        let ds = Dataset::new(
            vec![Predictor::continuous("x", vec![1.0, 2.0, 3.0, 4.0, 5.0])],
            "y",
            vec![0.0, 0.0, 0.0, 0.1, 50.0],
        )
        .unwrap();
        let free = split_of(&ds, &Settings::new().with_min_node_size(1)).unwrap();
        assert_eq!(free.right_indices, vec![4]);
        let bounded = split_of(&ds, &Settings::new().with_min_node_size(2)).unwrap();
        assert!(bounded.left_indices.len() >= 2 && bounded.right_indices.len() >= 2);
    }

    #[test]
    fn insufficient_decrease_rejected() {
        // Pure noise around one mean: the best split explains little variance.
        let ds = Dataset::new(
            vec![Predictor::continuous("x", vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])],
            "y",
            vec![1.0, -1.0, 1.0, -1.0, 1.0, -1.0],
        )
        .unwrap();
        let settings = Settings::new().with_min_node_size(3).with_max_dec(0.5);
        assert!(split_of(&ds, &settings).is_none());
    }

    #[test]
    fn tie_prefers_first_predictor() {
        let x = vec![1.0, 2.0, 3.0, 4.0];
        let ds = Dataset::new(
            vec![Predictor::continuous("a", x.clone()), Predictor::continuous("b", x)],
            "y",
            vec![0.0, 0.0, 1.0, 1.0],
        )
        .unwrap();
        let split = split_of(&ds, &Settings::new().with_min_node_size(1)).unwrap();
        assert_eq!(split.rule.predictor().index(), 0);
    }

    #[test]
    fn tie_prefers_lower_threshold() {
        // Symmetric response: splitting after 1 or after 3 removes the same error.
        let ds = Dataset::new(
            vec![Predictor::continuous("x", vec![1.0, 2.0, 3.0, 4.0])],
            "y",
            vec![0.0, 1.0, 1.0, 0.0],
        )
        .unwrap();
        let split = split_of(&ds, &Settings::new().with_min_node_size(1).with_max_dec(0.0)).unwrap();
        match split.rule {
            SplitRule::Threshold { threshold, .. } => assert!((threshold - 1.5).abs() < 1e-12),
            SplitRule::Categories { .. } => panic!("expected threshold split"),
        }
    }

    #[test]
    fn categorical_grouping_by_mean() {
        let g = Predictor::from_labels("g", &["a", "b", "c", "a", "b", "c"]);
        let ds = Dataset::new(vec![g], "y", vec![0.0, 10.0, 0.2, 0.1, 10.2, 0.3]).unwrap();
        let split = split_of(&ds, &Settings::new().with_min_node_size(1)).unwrap();
        match &split.rule {
            SplitRule::Categories { left, .. } => assert_eq!(left, &["a", "c"]),
            SplitRule::Threshold { .. } => panic!("expected category split"),
        }
        assert_eq!(split.left_indices, vec![0, 2, 3, 5]);
        assert_eq!(split.right_indices, vec![1, 4]);
    }

    #[test]
    fn t_max_bounds_search() {
        // With a single candidate threshold the split lands mid-range.
        let x: Vec<f64> = (0..9).map(f64::from).collect();
        let y = vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 9.0, 9.0];
        let ds = Dataset::new(vec![Predictor::continuous("x", x)], "y", y).unwrap();
        let settings = Settings::new().with_min_node_size(1).with_max_dec(0.0);
        let full = split_of(&ds, &settings).unwrap();
        let capped = split_of(&ds, &settings.with_t_max(1)).unwrap();
        match (full.rule, capped.rule) {
            (
                SplitRule::Threshold { threshold: t_full, .. },
                SplitRule::Threshold { threshold: t_capped, .. },
            ) => {
                assert!((t_full - 6.5).abs() < 1e-12);
                assert!((t_capped - 4.5).abs() < 1e-12);
            }
            _ => panic!("expected threshold splits"),
        }
        assert!(capped.nmse > full.nmse);
    }
}
