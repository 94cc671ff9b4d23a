//! Regression trees grown on boosting gradients.
//!
//! Splits maximise the reduction of squared error of the gradients; leaf
//! values are supplied by the caller so the loss decides the step size.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Splits must beat this gain to be kept.
const MIN_GAIN: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// Features drawn at random per split; all features when `None`
    pub max_features: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Binary regression tree stored as a node arena, root at index 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

struct Split {
    feature: usize,
    threshold: f64,
    gain: f64,
}

struct Grower<'a, R: Rng> {
    columns: &'a [Vec<f64>],
    gradients: &'a [f64],
    params: &'a TreeParams,
    rng: &'a mut R,
    leaf_value: &'a mut dyn FnMut(&[usize]) -> f64,
    nodes: Vec<Node>,
}

impl RegressionTree {
    /// Grow a tree on `gradients` over the rows listed in `indices`.
    ///
    /// `columns` is feature-major. `leaf_value` receives the row indices
    /// that ended in a leaf and returns that leaf's output.
    pub fn fit<R: Rng>(
        columns: &[Vec<f64>],
        gradients: &[f64],
        indices: Vec<usize>,
        params: &TreeParams,
        rng: &mut R,
        mut leaf_value: impl FnMut(&[usize]) -> f64,
    ) -> Self {
        let mut grower = Grower {
            columns,
            gradients,
            params,
            rng,
            leaf_value: &mut leaf_value,
            nodes: Vec::new(),
        };
        grower.grow(indices, 0);
        Self {
            nodes: grower.nodes,
        }
    }

    /// Tree output for one feature row.
    pub fn predict(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                Node::Leaf { value } => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[feature] <= threshold { left } else { right };
                }
            }
        }
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, left).max(walk(nodes, right)),
            }
        }
        walk(&self.nodes, 0)
    }
}

impl<R: Rng> Grower<'_, R> {
    fn grow(&mut self, indices: Vec<usize>, depth: usize) -> usize {
        let idx = self.nodes.len();
        // Placeholder until children are known.
        self.nodes.push(Node::Leaf { value: 0.0 });

        let split = if depth < self.params.max_depth
            && indices.len() >= 2 * self.params.min_samples_leaf.max(1)
        {
            self.best_split(&indices)
        } else {
            None
        };

        match split {
            Some(split) => {
                let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = indices
                    .into_iter()
                    .partition(|&i| self.columns[split.feature][i] <= split.threshold);
                let left = self.grow(left_rows, depth + 1);
                let right = self.grow(right_rows, depth + 1);
                self.nodes[idx] = Node::Split {
                    feature: split.feature,
                    threshold: split.threshold,
                    left,
                    right,
                };
            }
            None => {
                let value = (self.leaf_value)(&indices);
                self.nodes[idx] = Node::Leaf { value };
            }
        }
        idx
    }

    fn candidate_features(&mut self) -> Vec<usize> {
        let n = self.columns.len();
        match self.params.max_features {
            Some(k) if k > 0 && k < n => {
                rand::seq::index::sample(&mut *self.rng, n, k).into_vec()
            }
            _ => (0..n).collect(),
        }
    }

    fn best_split(&mut self, indices: &[usize]) -> Option<Split> {
        let min_leaf = self.params.min_samples_leaf.max(1);
        let n = indices.len();
        let total: f64 = indices.iter().map(|&i| self.gradients[i]).sum();
        let parent_score = total * total / n as f64;

        let mut best: Option<Split> = None;
        let mut order = indices.to_vec();
        for feature in self.candidate_features() {
            let column = &self.columns[feature];
            order.sort_by(|&a, &b| column[a].total_cmp(&column[b]));

            let mut left_sum = 0.0;
            for k in 0..n - 1 {
                left_sum += self.gradients[order[k]];
                let n_left = k + 1;
                let n_right = n - n_left;
                if n_left < min_leaf || n_right < min_leaf {
                    continue;
                }
                let (lo, hi) = (column[order[k]], column[order[k + 1]]);
                if lo >= hi {
                    continue;
                }
                let right_sum = total - left_sum;
                let gain = left_sum * left_sum / n_left as f64
                    + right_sum * right_sum / n_right as f64
                    - parent_score;
                if gain > MIN_GAIN && best.as_ref().map_or(true, |b| gain > b.gain) {
                    let mut threshold = lo + (hi - lo) / 2.0;
                    if threshold >= hi {
                        threshold = lo;
                    }
                    best = Some(Split {
                        feature,
                        threshold,
                        gain,
                    });
                }
            }
        }
        best
    }
}
