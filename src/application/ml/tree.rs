//! Second-order regression trees used as boosting rounds.
//!
//! Trees are grown greedily on gradient/hessian statistics with an L2 penalty
//! on leaf weights and a minimum loss reduction (`gamma`) gating every split.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    /// Rows with `x[feature] < threshold` go left
    Split {
        feature: usize,
        threshold: f64,
        gain: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

/// Flat-array tree; node 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<TreeNode>,
}

impl RegressionTree {
    pub fn predict(&self, x: &[f64]) -> f64 {
        let mut idx = 0usize;
        loop {
            match self.nodes.get(idx) {
                Some(TreeNode::Leaf { value }) => return *value,
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                }) => {
                    let value = x.get(*feature).copied().unwrap_or(f64::NAN);
                    idx = if value < *threshold { *left } else { *right };
                }
                None => return 0.0,
            }
        }
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, TreeNode::Leaf { .. }))
            .count()
    }

    /// Structural checks for trees read back from storage.
    /// Children must point forward so traversal always terminates.
    pub fn validate(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    if *feature >= n_features {
                        return Err(format!(
                            "node {} splits on feature {} but model has {}",
                            idx, feature, n_features
                        ));
                    }
                    if threshold.is_nan() {
                        return Err(format!("node {} has NaN threshold", idx));
                    }
                    for child in [left, right] {
                        if *child <= idx || *child >= self.nodes.len() {
                            return Err(format!("node {} has invalid child {}", idx, child));
                        }
                    }
                }
                TreeNode::Leaf { value } => {
                    if !value.is_finite() {
                        return Err(format!("leaf {} has non-finite value", idx));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Growth controls for one tree.
#[derive(Debug, Clone, Copy)]
pub struct GrowthParams {
    pub max_depth: usize,
    pub min_child_weight: f64,
    pub reg_lambda: f64,
    pub gamma: f64,
    pub learning_rate: f64,
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// Grows a single tree over the given rows and feature subset.
pub struct TreeBuilder<'a> {
    x: &'a [Vec<f64>],
    grad: &'a [f64],
    hess: &'a [f64],
    features: &'a [usize],
    params: GrowthParams,
    nodes: Vec<TreeNode>,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(
        x: &'a [Vec<f64>],
        grad: &'a [f64],
        hess: &'a [f64],
        features: &'a [usize],
        params: GrowthParams,
    ) -> Self {
        Self {
            x,
            grad,
            hess,
            features,
            params,
            nodes: Vec::new(),
        }
    }

    pub fn build(mut self, rows: &[usize]) -> RegressionTree {
        self.grow(rows, 0);
        RegressionTree { nodes: self.nodes }
    }

    fn grow(&mut self, rows: &[usize], depth: usize) -> usize {
        let g: f64 = rows.iter().map(|&r| self.grad[r]).sum();
        let h: f64 = rows.iter().map(|&r| self.hess[r]).sum();

        let idx = self.nodes.len();
        self.nodes.push(TreeNode::Leaf { value: 0.0 });

        if depth < self.params.max_depth {
            if let Some(split) = self.best_split(rows, g, h) {
                let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
                    .iter()
                    .partition(|&&r| self.x[r][split.feature] < split.threshold);
                let left = self.grow(&left_rows, depth + 1);
                let right = self.grow(&right_rows, depth + 1);
                self.nodes[idx] = TreeNode::Split {
                    feature: split.feature,
                    threshold: split.threshold,
                    gain: split.gain,
                    left,
                    right,
                };
                return idx;
            }
        }

        let weight = -g / (h + self.params.reg_lambda);
        self.nodes[idx] = TreeNode::Leaf {
            value: weight * self.params.learning_rate,
        };
        idx
    }

    fn score(&self, g: f64, h: f64) -> f64 {
        g * g / (h + self.params.reg_lambda)
    }

    fn best_split(&self, rows: &[usize], g: f64, h: f64) -> Option<SplitCandidate> {
        if rows.len() < 2 {
            return None;
        }
        let parent = self.score(g, h);
        let mut best: Option<SplitCandidate> = None;

        for &feature in self.features {
            let mut column: Vec<(f64, f64, f64)> = rows
                .iter()
                .map(|&r| (self.x[r][feature], self.grad[r], self.hess[r]))
                .collect();
            column.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut gl = 0.0;
            let mut hl = 0.0;
            for j in 0..column.len() - 1 {
                gl += column[j].1;
                hl += column[j].2;
                let (lo, hi) = (column[j].0, column[j + 1].0);
                if lo >= hi {
                    continue;
                }
                let (gr, hr) = (g - gl, h - hl);
                if hl < self.params.min_child_weight || hr < self.params.min_child_weight {
                    continue;
                }

                let gain =
                    0.5 * (self.score(gl, hl) + self.score(gr, hr) - parent) - self.params.gamma;
                if gain > best.as_ref().map_or(0.0, |b| b.gain) {
                    let mid = lo + (hi - lo) / 2.0;
                    let threshold = if mid > lo { mid } else { hi };
                    best = Some(SplitCandidate {
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
