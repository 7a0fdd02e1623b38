//! fANOVA (functional ANOVA) parameter importance via random forest.
//!
//! fANOVA decomposes the variance of the objective into contributions
//! from individual parameters (**main effects**) and parameter pairs
//! (**interaction effects**).
//!
//! # Algorithm
//!
//! 1. Fit a random regression forest to `(parameters) → objective`
//! 2. For each parameter subset, marginalize the forest over the other
//!    parameters, weighting branches by their training-sample fractions
//! 3. Main effect of `j` is `Var[E[f | x_j]]`; interaction of `(j, k)` is
//!    `Var[E[f | x_j, x_k]]` minus both main effects
//! 4. Normalize so all effects sum to 1.0
//!
//! # Reference
//!
//! Hutter, F., Hoos, H. & Leyton-Brown, K. (2014). "An Efficient
//! Approach for Assessing Hyperparameter Importance." ICML 2014.

/// Result of a full fANOVA decomposition.
///
/// All importance values are fractions of total variance and sum to 1.0
/// across main effects and interactions combined.
#[derive(Debug, Clone)]
pub struct FanovaResult {
    /// Per-parameter importance, sorted by descending importance.
    pub main_effects: Vec<(String, f64)>,
    /// Pairwise interaction importance, sorted by descending importance.
    ///
    /// Only pairs with non-negligible interaction (> 1e-10) are included.
    pub interactions: Vec<((String, String), f64)>,
}

/// Random-forest settings shared by the fANOVA evaluators.
#[derive(Debug, Clone)]
pub struct FanovaConfig {
    /// Number of trees in the random forest (default: 64).
    pub n_trees: usize,
    /// Maximum depth of each tree. `None` for unlimited (default: `None`).
    pub max_depth: Option<usize>,
    /// Minimum samples required to split a node (default: 2).
    pub min_samples_split: usize,
    /// Minimum samples required in a leaf node (default: 1).
    pub min_samples_leaf: usize,
    /// Random seed for reproducibility (default: `Some(42)`).
    pub seed: Option<u64>,
}

impl Default for FanovaConfig {
    fn default() -> Self {
        Self {
            n_trees: 64,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            seed: Some(42),
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        value: f64,
        n_samples: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        n_samples: usize,
    },
}

struct Split {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// A regression tree grown on a bootstrap sample (arena-allocated).
#[derive(Debug, Clone)]
pub(crate) struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    /// Draw a bootstrap sample of the rows and grow a tree on it.
    pub(crate) fn fit(
        data: &[Vec<f64>],
        targets: &[f64],
        config: &FanovaConfig,
        rng: &mut fastrand::Rng,
    ) -> Self {
        let n = data.len();
        let bootstrap: Vec<usize> = (0..n).map(|_| rng.usize(0..n)).collect();
        let mut tree = Self { nodes: Vec::new() };
        tree.grow(data, targets, bootstrap, 0, config, rng);
        tree
    }

    fn push_leaf(&mut self, value: f64, n_samples: usize) -> usize {
        self.nodes.push(Node::Leaf { value, n_samples });
        self.nodes.len() - 1
    }

    #[allow(clippy::cast_precision_loss)]
    fn grow(
        &mut self,
        data: &[Vec<f64>],
        targets: &[f64],
        indices: Vec<usize>,
        depth: usize,
        config: &FanovaConfig,
        rng: &mut fastrand::Rng,
    ) -> usize {
        let n = indices.len();
        let mean = indices.iter().map(|&i| targets[i]).sum::<f64>() / n as f64;

        let may_split =
            n >= config.min_samples_split && config.max_depth.is_none_or(|d| depth < d);
        let split = if may_split {
            best_split(data, targets, &indices, config, rng)
        } else {
            None
        };
        let Some(split) = split else {
            return self.push_leaf(mean, n);
        };

        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| data[i][split.feature] <= split.threshold);
        if left.is_empty() || right.is_empty() {
            return self.push_leaf(mean, n);
        }

        // Children are appended after this slot; it is overwritten below.
        let slot = self.push_leaf(mean, n);
        let left = self.grow(data, targets, left, depth + 1, config, rng);
        let right = self.grow(data, targets, right, depth + 1, config, rng);
        self.nodes[slot] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
            n_samples: n,
        };
        slot
    }

    fn n_samples(&self, idx: usize) -> usize {
        match self.nodes[idx] {
            Node::Leaf { n_samples, .. } | Node::Split { n_samples, .. } => n_samples,
        }
    }

    /// Prediction with every feature outside `subset` marginalized out.
    pub(crate) fn marginal_predict(&self, subset: &[usize], x: &[f64]) -> f64 {
        self.marginal_at(0, subset, x)
    }

    #[allow(clippy::cast_precision_loss)]
    fn marginal_at(&self, idx: usize, subset: &[usize], x: &[f64]) -> f64 {
        match self.nodes[idx] {
            Node::Leaf { value, .. } => value,
            Node::Split {
                feature,
                threshold,
                left,
                right,
                n_samples,
            } => {
                if subset.contains(&feature) {
                    let next = if x[feature] <= threshold { left } else { right };
                    self.marginal_at(next, subset, x)
                } else {
                    let w = self.n_samples(left) as f64 / n_samples as f64;
                    w * self.marginal_at(left, subset, x)
                        + (1.0 - w) * self.marginal_at(right, subset, x)
                }
            }
        }
    }
}

/// Find the variance-reducing split with the largest gain among a random
/// subset of `sqrt(n_features)` candidate features.
///
/// Each candidate is scanned once in sorted order with running sums.
#[allow(clippy::cast_precision_loss, clippy::float_cmp)]
fn best_split(
    data: &[Vec<f64>],
    targets: &[f64],
    indices: &[usize],
    config: &FanovaConfig,
    rng: &mut fastrand::Rng,
) -> Option<Split> {
    let n = indices.len();
    let sum: f64 = indices.iter().map(|&i| targets[i]).sum();
    let sq: f64 = indices.iter().map(|&i| targets[i] * targets[i]).sum();
    let total_sse = sq - sum * sum / n as f64;
    if total_sse <= f64::EPSILON * sq.abs().max(1.0) {
        return None;
    }

    let n_features = data[indices[0]].len();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let max_features = ((n_features as f64).sqrt().ceil() as usize).clamp(1, n_features);

    let mut best: Option<Split> = None;
    let mut order = indices.to_vec();
    for feature in partial_shuffle(n_features, max_features, rng) {
        order.sort_by(|&a, &b| data[a][feature].total_cmp(&data[b][feature]));

        let (mut l_sum, mut l_sq) = (0.0, 0.0);
        for k in 0..n - 1 {
            let y = targets[order[k]];
            l_sum += y;
            l_sq += y * y;

            let here = data[order[k]][feature];
            let next = data[order[k + 1]][feature];
            if here == next {
                continue;
            }
            let l_n = k + 1;
            let r_n = n - l_n;
            if l_n < config.min_samples_leaf || r_n < config.min_samples_leaf {
                continue;
            }

            let r_sum = sum - l_sum;
            let r_sq = sq - l_sq;
            let sse = (l_sq - l_sum * l_sum / l_n as f64) + (r_sq - r_sum * r_sum / r_n as f64);
            let gain = total_sse - sse;
            if gain > best.as_ref().map_or(0.0, |b| b.gain) {
                best = Some(Split {
                    feature,
                    threshold: f64::midpoint(here, next),
                    gain,
                });
            }
        }
    }
    best
}

/// Select `k` random indices from `0..n` using partial Fisher-Yates shuffle.
fn partial_shuffle(n: usize, k: usize, rng: &mut fastrand::Rng) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..n).collect();
    let k = k.min(n);
    for i in 0..k {
        let j = rng.usize(i..n);
        indices.swap(i, j);
    }
    indices.truncate(k);
    indices
}

/// Population variance of a slice.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}

/// Generator for tree `index` of a forest.
///
/// Each tree draws from its own stream, so a seeded forest is the same
/// whatever order (or thread) its trees are fitted in.
pub(crate) fn tree_rng(seed: Option<u64>, index: usize) -> fastrand::Rng {
    seed.map_or_else(fastrand::Rng::new, |s| {
        fastrand::Rng::with_seed(s.wrapping_add(index as u64))
    })
}

/// An ensemble of regression trees fitted to the same data.
#[derive(Debug, Clone)]
pub(crate) struct Forest {
    trees: Vec<RegressionTree>,
}

impl Forest {
    /// Fit `config.n_trees` trees one after another.
    pub(crate) fn fit(data: &[Vec<f64>], targets: &[f64], config: &FanovaConfig) -> Self {
        let trees = (0..config.n_trees)
            .map(|i| RegressionTree::fit(data, targets, config, &mut tree_rng(config.seed, i)))
            .collect();
        Self { trees }
    }

    #[cfg_attr(not(feature = "fast-fanova"), allow(dead_code))]
    pub(crate) fn from_trees(trees: Vec<RegressionTree>) -> Self {
        Self { trees }
    }

    #[allow(clippy::cast_precision_loss)]
    fn marginal_predict(&self, subset: &[usize], x: &[f64]) -> f64 {
        self.trees
            .iter()
            .map(|t| t.marginal_predict(subset, x))
            .sum::<f64>()
            / self.trees.len() as f64
    }

    /// `Var[E[f | x_subset]]` over the training rows.
    pub(crate) fn marginal_variance(&self, data: &[Vec<f64>], subset: &[usize]) -> f64 {
        let preds: Vec<f64> = data
            .iter()
            .map(|x| self.marginal_predict(subset, x))
            .collect();
        variance(&preds)
    }
}

fn sort_descending<K>(entries: &mut [(K, f64)]) {
    entries.sort_by(|a, b| b.1.total_cmp(&a.1));
}

/// Run the full decomposition on pre-encoded numerical data.
///
/// `data` is one row per sample with one column per entry of `feature_names`.
pub(crate) fn compute_fanova(
    data: &[Vec<f64>],
    targets: &[f64],
    feature_names: &[String],
    config: &FanovaConfig,
) -> FanovaResult {
    let n_features = feature_names.len();
    let forest = Forest::fit(data, targets, config);

    let main_var: Vec<f64> = (0..n_features)
        .map(|j| forest.marginal_variance(data, &[j]))
        .collect();

    let mut interactions: Vec<((String, String), f64)> = Vec::new();
    for j in 0..n_features {
        for k in (j + 1)..n_features {
            let joint = forest.marginal_variance(data, &[j, k]);
            let interaction = (joint - main_var[j] - main_var[k]).max(0.0);
            if interaction > 1e-10 {
                interactions.push((
                    (feature_names[j].clone(), feature_names[k].clone()),
                    interaction,
                ));
            }
        }
    }

    let total: f64 =
        main_var.iter().sum::<f64>() + interactions.iter().map(|(_, v)| *v).sum::<f64>();
    let scale = |v: f64| if total > 0.0 { v / total } else { 0.0 };

    let mut main_effects: Vec<(String, f64)> = feature_names
        .iter()
        .zip(&main_var)
        .map(|(name, &v)| (name.clone(), scale(v)))
        .collect();
    for entry in &mut interactions {
        entry.1 = scale(entry.1);
    }
    sort_descending(&mut main_effects);
    sort_descending(&mut interactions);

    FanovaResult {
        main_effects,
        interactions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAMES: [&str; 3] = ["x", "y", "z"];

    /// Decompose `f` over `n` uniform rows in `[0, 10)^dims`.
    fn decompose(
        seed: u64,
        n: usize,
        dims: usize,
        config: &FanovaConfig,
        f: impl Fn(&[f64]) -> f64,
    ) -> FanovaResult {
        let mut rng = fastrand::Rng::with_seed(seed);
        let data: Vec<Vec<f64>> = (0..n)
            .map(|_| (0..dims).map(|_| rng.f64() * 10.0).collect())
            .collect();
        let targets: Vec<f64> = data.iter().map(|row| f(row.as_slice())).collect();
        let names: Vec<String> = NAMES[..dims].iter().map(|&s| s.to_owned()).collect();
        compute_fanova(&data, &targets, &names, config)
    }

    fn effect(result: &FanovaResult, name: &str) -> f64 {
        result
            .main_effects
            .iter()
            .find(|(n, _)| n == name)
            .map_or(0.0, |(_, v)| *v)
    }

    #[test]
    fn identity_in_one_feature() {
        let result = decompose(0, 100, 2, &FanovaConfig::default(), |r| r[0]);
        assert_eq!(result.main_effects[0].0, "x");
        assert!(effect(&result, "x") > 0.8, "{result:?}");
    }

    #[test]
    fn product_has_interaction() {
        let config = FanovaConfig {
            n_trees: 128,
            ..FanovaConfig::default()
        };
        let result = decompose(42, 200, 2, &config, |r| r[0] * r[1]);
        let ((a, b), share) = &result.interactions[0];
        assert_eq!((a.as_str(), b.as_str()), ("x", "y"));
        assert!(*share > 0.05, "{result:?}");
    }

    #[test]
    fn unused_feature_scores_low() {
        let result = decompose(7, 150, 3, &FanovaConfig::default(), |r| {
            3.0 * r[0] + 0.1 * r[1]
        });
        assert_eq!(result.main_effects[0].0, "x");
        assert!(effect(&result, "z") < 0.1, "{result:?}");
    }

    #[test]
    fn shares_add_up() {
        let result = decompose(3, 100, 2, &FanovaConfig::default(), |r| r[0] + r[1]);
        let total: f64 = result
            .main_effects
            .iter()
            .map(|(_, v)| v)
            .chain(result.interactions.iter().map(|(_, v)| v))
            .sum();
        assert!((total - 1.0).abs() < 1e-10, "got {total}");
    }

    #[test]
    fn flat_objective_has_no_effects() {
        let result = decompose(5, 30, 2, &FanovaConfig::default(), |_| 1.0);
        assert!(result.main_effects.iter().all(|(_, v)| v.abs() < f64::EPSILON));
        assert!(result.interactions.is_empty());
    }

    #[test]
    fn depth_limit_is_respected() {
        let config = FanovaConfig {
            max_depth: Some(1),
            n_trees: 4,
            ..FanovaConfig::default()
        };
        let data = vec![vec![0.0], vec![1.0], vec![2.0], vec![3.0]];
        let targets = vec![0.0, 1.0, 2.0, 3.0];
        let forest = Forest::fit(&data, &targets, &config);
        // A stump has at most one split and two leaves.
        assert!(forest.trees.iter().all(|t| t.nodes.len() <= 3));
    }

    #[test]
    fn population_variance() {
        assert!((variance(&[1.0, 2.0, 3.0, 4.0, 5.0]) - 2.0).abs() < 1e-10);
        assert!(variance(&[5.0, 5.0, 5.0]).abs() < 1e-10);
        assert!(variance(&[]).abs() < 1e-10);
    }

    #[test]
    fn seeded_forests_are_reproducible() {
        let mut rng = fastrand::Rng::with_seed(11);
        let data: Vec<Vec<f64>> = (0..60).map(|_| vec![rng.f64(), rng.f64()]).collect();
        let targets: Vec<f64> = data.iter().map(|r| r[0] - r[1]).collect();
        let a = Forest::fit(&data, &targets, &FanovaConfig::default());
        let b = Forest::fit(&data, &targets, &FanovaConfig::default());
        let (va, vb) = (a.marginal_variance(&data, &[0]), b.marginal_variance(&data, &[0]));
        assert!((va - vb).abs() < 1e-12);
    }
}
