use super::{Encoded, ImportanceEvaluator, Importances, Target, normalize};
use crate::error::Result;
use crate::view::TrialSource;

/// Importance as absolute Spearman rank correlation with the target.
///
/// Much cheaper than fANOVA but blind to non-monotonic effects and
/// interactions. Scores are normalized to sum to 1.0 and sorted in
/// descending order.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpearmanEvaluator;

impl SpearmanEvaluator {
    /// Creates a new evaluator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ImportanceEvaluator for SpearmanEvaluator {
    fn name(&self) -> &'static str {
        "spearman"
    }

    fn evaluate(&self, study: &dyn TrialSource, target: Option<&Target>) -> Result<Importances> {
        let completed = study.completed_trials();
        let encoded = Encoded::new(&completed, target)?;
        if encoded.names.is_empty() {
            return Ok(Vec::new());
        }
        encoded.require_rows()?;

        let scores = encoded
            .names
            .iter()
            .enumerate()
            .map(|(j, name)| {
                let column: Vec<f64> = encoded.rows.iter().map(|row| row[j]).collect();
                (name.clone(), spearman(&column, &encoded.targets).abs())
            })
            .collect();
        Ok(normalize(scores))
    }
}

/// Ranks starting at 1.0, ties sharing their average rank.
#[allow(clippy::cast_precision_loss, clippy::float_cmp)]
fn ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        let avg = (start + end + 1) as f64 / 2.0;
        for &i in &order[start..end] {
            ranks[i] = avg;
        }
        start = end;
    }
    ranks
}

/// Spearman rank correlation; 0.0 when either side is constant.
#[allow(clippy::cast_precision_loss, clippy::float_cmp)]
fn spearman(x: &[f64], y: &[f64]) -> f64 {
    let rx = ranks(x);
    let ry = ranks(y);
    let n = rx.len() as f64;
    let mx = rx.iter().sum::<f64>() / n;
    let my = ry.iter().sum::<f64>() / n;

    let (mut cov, mut vx, mut vy) = (0.0, 0.0, 0.0);
    for (a, b) in rx.iter().zip(&ry) {
        cov += (a - mx) * (b - my);
        vx += (a - mx).powi(2);
        vy += (b - my).powi(2);
    }
    if vx == 0.0 || vy == 0.0 {
        return 0.0;
    }
    cov / (vx * vy).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::Distribution;
    use crate::param::ParamValue;
    use crate::trial::FrozenTrial;
    use crate::view::StudyView;

    #[test]
    fn ranks_average_ties() {
        assert_eq!(ranks(&[10.0, 20.0, 20.0, 5.0]), vec![2.0, 3.5, 3.5, 1.0]);
    }

    #[test]
    fn monotonic_relation_is_perfect() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [1.0, 8.0, 27.0, 64.0];
        assert!((spearman(&x, &y) - 1.0).abs() < 1e-12);
        let neg: Vec<f64> = y.iter().map(|v| -v).collect();
        assert!((spearman(&x, &neg) + 1.0).abs() < 1e-12);
        assert!(spearman(&x, &[3.0; 4]).abs() < f64::EPSILON);
    }

    #[test]
    fn evaluator_ranks_correlated_parameter_first() {
        let trials: Vec<FrozenTrial> = (0..10u32)
            .map(|i| {
                let x = f64::from(i);
                let y = f64::from((i * 3) % 4);
                FrozenTrial::complete(i.into(), 2.0 * x)
                    .param("x", ParamValue::Float(x), Distribution::float(0.0, 10.0))
                    .param("y", ParamValue::Int((i * 3 % 4).into()), Distribution::int(0, 3))
                    .param("z", ParamValue::Float(y), Distribution::float(0.0, 4.0))
            })
            .collect();
        let view = StudyView::with_name(0, "s", &trials);
        let scores = SpearmanEvaluator::new().evaluate(&view, None).unwrap();
        assert_eq!(scores.len(), 3);
        assert_eq!(scores[0].0, "x");
    }
}
