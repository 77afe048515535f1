//! CART decision trees shared by every ensemble learner.
//!
//! Trees are grown over a list of row indices into a borrowed feature matrix.
//! Bootstrap samples are expressed by repeating indices, so no data is copied.
//! Leaves hold one `f64` each: the positive-class fraction for classification
//! trees, the mean target for regression trees. Leaf values can be rewritten
//! after growth, which gradient boosting uses for its Newton step.

use ndarray::{ArrayView1, ArrayView2};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

const MIN_IMPURITY_DECREASE: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Criterion {
    Gini,
    Entropy,
    SquaredError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Splitter {
    /// Exhaustive search over midpoints between distinct values.
    Best,
    /// One uniformly drawn threshold per candidate feature.
    Random,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features examined per split; `None` examines all.
    pub max_features: Option<usize>,
    pub criterion: Criterion,
    pub splitter: Splitter,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: 8,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            criterion: Criterion::Gini,
            splitter: Splitter::Best,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf(usize),
}

/// Running sums sufficient for every supported criterion.
#[derive(Debug, Clone, Copy, Default)]
struct Stats {
    n: f64,
    sum: f64,
    sum_sq: f64,
}

impl Stats {
    fn push(&mut self, y: f64) {
        self.n += 1.0;
        self.sum += y;
        self.sum_sq += y * y;
    }

    fn minus(&self, other: &Stats) -> Stats {
        Stats {
            n: self.n - other.n,
            sum: self.sum - other.sum,
            sum_sq: self.sum_sq - other.sum_sq,
        }
    }

    fn mean(&self) -> f64 {
        if self.n > 0.0 {
            self.sum / self.n
        } else {
            0.0
        }
    }

    fn impurity(&self, criterion: Criterion) -> f64 {
        if self.n <= 0.0 {
            return 0.0;
        }
        let p = self.mean();
        match criterion {
            Criterion::Gini => 1.0 - p * p - (1.0 - p) * (1.0 - p),
            Criterion::Entropy => {
                let h = |q: f64| if q > 0.0 { -q * q.log2() } else { 0.0 };
                h(p) + h(1.0 - p)
            }
            Criterion::SquaredError => (self.sum_sq / self.n - p * p).max(0.0),
        }
    }

    /// Impurity scaled by node size, comparable across children.
    fn weighted(&self, criterion: Criterion) -> f64 {
        self.n * self.impurity(criterion)
    }
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
    leaf_values: Vec<f64>,
    n_features: usize,
}

impl DecisionTree {
    /// Grow a tree on `rows` of `x` against `targets` (indexed like `x`).
    pub fn grow<R: Rng + ?Sized>(
        params: &TreeParams,
        x: ArrayView2<f32>,
        targets: &[f64],
        rows: &[usize],
        rng: &mut R,
    ) -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            leaf_values: Vec::new(),
            n_features: x.ncols(),
        };
        let mut builder = Builder {
            params,
            x: x.view(),
            targets,
            features: (0..x.ncols()).collect(),
        };
        builder.build(&mut tree, rows.to_vec(), 0, rng);
        tree
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_leaves(&self) -> usize {
        self.leaf_values.len()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match nodes[idx] {
                Node::Leaf(_) => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, left).max(walk(nodes, right)),
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }

    /// Index of the leaf a row falls into.
    pub fn leaf_index(&self, row: ArrayView1<f32>) -> usize {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                Node::Leaf(leaf) => return leaf,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if f64::from(row[feature]) <= threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }

    pub fn predict_row(&self, row: ArrayView1<f32>) -> f64 {
        self.leaf_values[self.leaf_index(row)]
    }

    pub fn set_leaf_value(&mut self, leaf: usize, value: f64) {
        self.leaf_values[leaf] = value;
    }
}

struct Builder<'a> {
    params: &'a TreeParams,
    x: ArrayView2<'a, f32>,
    targets: &'a [f64],
    features: Vec<usize>,
}

impl Builder<'_> {
    fn stats(&self, rows: &[usize]) -> Stats {
        let mut stats = Stats::default();
        for &r in rows {
            stats.push(self.targets[r]);
        }
        stats
    }

    fn leaf(&self, tree: &mut DecisionTree, stats: &Stats) -> usize {
        tree.leaf_values.push(stats.mean());
        tree.nodes.push(Node::Leaf(tree.leaf_values.len() - 1));
        tree.nodes.len() - 1
    }

    fn build<R: Rng + ?Sized>(
        &mut self,
        tree: &mut DecisionTree,
        rows: Vec<usize>,
        depth: usize,
        rng: &mut R,
    ) -> usize {
        let stats = self.stats(&rows);
        let min_leaf = self.params.min_samples_leaf.max(1);

        if depth >= self.params.max_depth
            || rows.len() < self.params.min_samples_split
            || rows.len() < 2 * min_leaf
            || stats.impurity(self.params.criterion) <= MIN_IMPURITY_DECREASE
        {
            return self.leaf(tree, &stats);
        }

        let Some(split) = self.find_split(&rows, &stats, rng) else {
            return self.leaf(tree, &stats);
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .into_iter()
            .partition(|&r| f64::from(self.x[[r, split.feature]]) <= split.threshold);

        let idx = tree.nodes.len();
        tree.nodes.push(Node::Leaf(usize::MAX));
        let left = self.build(tree, left_rows, depth + 1, rng);
        let right = self.build(tree, right_rows, depth + 1, rng);
        tree.nodes[idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        idx
    }

    fn find_split<R: Rng + ?Sized>(
        &mut self,
        rows: &[usize],
        parent: &Stats,
        rng: &mut R,
    ) -> Option<SplitCandidate> {
        let n_features = self.features.len();
        let max_features = self.params.max_features.unwrap_or(n_features).clamp(1, n_features);
        self.features.shuffle(rng);

        let criterion = self.params.criterion;
        let parent_score = parent.weighted(criterion);
        let mut best: Option<SplitCandidate> = None;

        for i in 0..max_features {
            let feature = self.features[i];
            let candidate = match self.params.splitter {
                Splitter::Best => self.best_threshold(rows, feature),
                Splitter::Random => self.random_threshold(rows, feature, rng),
            };
            let Some(candidate) = candidate else {
                continue;
            };
            if parent_score - candidate.score <= MIN_IMPURITY_DECREASE {
                continue;
            }
            if best.as_ref().map_or(true, |b| candidate.score < b.score) {
                best = Some(candidate);
            }
        }

        best
    }

    fn best_threshold(&self, rows: &[usize], feature: usize) -> Option<SplitCandidate> {
        let criterion = self.params.criterion;
        let min_leaf = self.params.min_samples_leaf.max(1);

        let mut sorted: Vec<(f32, f64)> = rows
            .iter()
            .map(|&r| (self.x[[r, feature]], self.targets[r]))
            .collect();
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut total = Stats::default();
        for &(_, y) in &sorted {
            total.push(y);
        }

        let mut left = Stats::default();
        let mut best: Option<SplitCandidate> = None;
        for i in 0..sorted.len() - 1 {
            left.push(sorted[i].1);
            let (lo, hi) = (sorted[i].0, sorted[i + 1].0);
            if lo == hi {
                continue;
            }
            let n_left = i + 1;
            if n_left < min_leaf || sorted.len() - n_left < min_leaf {
                continue;
            }
            let right = total.minus(&left);
            let score = left.weighted(criterion) + right.weighted(criterion);
            if best.as_ref().map_or(true, |b| score < b.score) {
                best = Some(SplitCandidate {
                    feature,
                    threshold: (f64::from(lo) + f64::from(hi)) / 2.0,
                    score,
                });
            }
        }
        best
    }

    fn random_threshold<R: Rng + ?Sized>(
        &self,
        rows: &[usize],
        feature: usize,
        rng: &mut R,
    ) -> Option<SplitCandidate> {
        let criterion = self.params.criterion;
        let min_leaf = self.params.min_samples_leaf.max(1);

        let (lo, hi) = rows.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &r| {
            let v = f64::from(self.x[[r, feature]]);
            (lo.min(v), hi.max(v))
        });
        if !(hi > lo) {
            return None;
        }
        let threshold = rng.gen_range(lo..hi);

        let mut left = Stats::default();
        let mut right = Stats::default();
        for &r in rows {
            if f64::from(self.x[[r, feature]]) <= threshold {
                left.push(self.targets[r]);
            } else {
                right.push(self.targets[r]);
            }
        }
        if (left.n as usize) < min_leaf || (right.n as usize) < min_leaf {
            return None;
        }

        Some(SplitCandidate {
            feature,
            threshold,
            score: left.weighted(criterion) + right.weighted(criterion),
        })
    }
}
