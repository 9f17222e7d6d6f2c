//! Gradient-boosted binary classifier with logistic loss.
//!
//! Each round fits a [`RegressionTree`] to the gradient and hessian of the
//! log-loss, on a random row subsample and column subsample. When an
//! evaluation set is supplied, its log-loss is tracked every round and the
//! ensemble is cut back to the best round once it stops improving.

use super::tree::{GrowthParams, RegressionTree, TreeBuilder, TreeNode};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

const PROB_EPS: f64 = 1e-15;
const MIN_HESSIAN: f64 = 1e-16;

#[derive(Error, Debug, PartialEq)]
pub enum BoosterError {
    #[error("Invalid booster parameter: {0}")]
    InvalidParams(String),

    #[error("Training set is empty")]
    EmptyTrainingSet,

    #[error("Expected {expected} features, got {found}")]
    ShapeMismatch { expected: usize, found: usize },

    #[error("Labels must be 0 or 1, got {0}")]
    InvalidLabel(f64),

    #[error("Feature matrix and label vector differ in length: {rows} rows, {labels} labels")]
    LengthMismatch { rows: usize, labels: usize },
}

/// Booster hyperparameters. Defaults favour many small, regularised steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoosterParams {
    /// Maximum number of boosting rounds
    pub n_estimators: usize,
    /// Shrinkage applied to every leaf weight
    pub learning_rate: f64,
    pub max_depth: usize,
    /// Fraction of rows sampled per round
    pub subsample: f64,
    /// Fraction of features sampled per tree
    pub colsample_bytree: f64,
    /// Minimum loss reduction required to split a node
    pub gamma: f64,
    /// L2 penalty on leaf weights
    pub reg_lambda: f64,
    /// Minimum hessian sum in each child
    pub min_child_weight: f64,
    /// Initial probability before any tree
    pub base_score: f64,
    /// Stop after this many rounds without eval improvement
    pub early_stopping_rounds: Option<usize>,
    pub seed: u64,
}

impl Default for BoosterParams {
    fn default() -> Self {
        Self {
            n_estimators: 1000,
            learning_rate: 0.01,
            max_depth: 5,
            subsample: 0.8,
            colsample_bytree: 0.8,
            gamma: 1.0,
            reg_lambda: 1.0,
            min_child_weight: 1.0,
            base_score: 0.5,
            early_stopping_rounds: Some(50),
            seed: 42,
        }
    }
}

impl BoosterParams {
    pub fn validate(&self) -> Result<(), BoosterError> {
        let fail = |msg: String| Err(BoosterError::InvalidParams(msg));
        if self.n_estimators == 0 {
            return fail("n_estimators must be > 0".to_string());
        }
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return fail(format!("learning_rate must be in (0, 1], got {}", self.learning_rate));
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return fail(format!("subsample must be in (0, 1], got {}", self.subsample));
        }
        if !(self.colsample_bytree > 0.0 && self.colsample_bytree <= 1.0) {
            return fail(format!(
                "colsample_bytree must be in (0, 1], got {}",
                self.colsample_bytree
            ));
        }
        if !(self.base_score > 0.0 && self.base_score < 1.0) {
            return fail(format!("base_score must be in (0, 1), got {}", self.base_score));
        }
        if self.gamma < 0.0 || self.reg_lambda < 0.0 || self.min_child_weight < 0.0 {
            return fail("gamma, reg_lambda and min_child_weight must be >= 0".to_string());
        }
        if self.early_stopping_rounds == Some(0) {
            return fail("early_stopping_rounds must be > 0 when set".to_string());
        }
        Ok(())
    }

    fn growth(&self) -> GrowthParams {
        GrowthParams {
            max_depth: self.max_depth,
            min_child_weight: self.min_child_weight,
            reg_lambda: self.reg_lambda,
            gamma: self.gamma,
            learning_rate: self.learning_rate,
        }
    }
}

/// Held-out rows monitored during fitting.
#[derive(Debug, Clone, Copy)]
pub struct EvalSet<'a> {
    pub x: &'a [Vec<f64>],
    pub y: &'a [f64],
}

/// What happened during a fit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitSummary {
    pub rounds_run: usize,
    pub eval_logloss: Vec<f64>,
    pub best_iteration: Option<usize>,
    pub best_score: Option<f64>,
    pub stopped_early: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostedClassifier {
    n_features: usize,
    base_margin: f64,
    trees: Vec<RegressionTree>,
    best_iteration: Option<usize>,
}

impl GradientBoostedClassifier {
    pub fn fit(
        params: &BoosterParams,
        x: &[Vec<f64>],
        y: &[f64],
        eval: Option<EvalSet<'_>>,
    ) -> Result<(Self, FitSummary), BoosterError> {
        params.validate()?;
        if x.is_empty() {
            return Err(BoosterError::EmptyTrainingSet);
        }
        let n_features = x[0].len();
        if n_features == 0 {
            return Err(BoosterError::InvalidParams(
                "feature matrix has no columns".to_string(),
            ));
        }
        check_matrix(x, y, n_features)?;
        if let Some(eval) = eval {
            check_matrix(eval.x, eval.y, n_features)?;
        }

        let base_margin = logit(params.base_score);
        let mut rng = StdRng::seed_from_u64(params.seed);
        let mut margins = vec![base_margin; x.len()];
        let mut eval_margins = eval.map(|e| vec![base_margin; e.x.len()]);
        let mut grad = vec![0.0; x.len()];
        let mut hess = vec![0.0; x.len()];

        let n_cols = ((params.colsample_bytree * n_features as f64).floor() as usize)
            .clamp(1, n_features);

        let mut trees = Vec::with_capacity(params.n_estimators);
        let mut summary = FitSummary {
            rounds_run: 0,
            eval_logloss: Vec::new(),
            best_iteration: None,
            best_score: None,
            stopped_early: false,
        };

        for round in 0..params.n_estimators {
            for i in 0..x.len() {
                let p = sigmoid(margins[i]);
                grad[i] = p - y[i];
                hess[i] = (p * (1.0 - p)).max(MIN_HESSIAN);
            }

            let mut rows: Vec<usize> = (0..x.len())
                .filter(|_| rng.random::<f64>() < params.subsample)
                .collect();
            if rows.is_empty() {
                rows = (0..x.len()).collect();
            }
            let mut cols = rand::seq::index::sample(&mut rng, n_features, n_cols).into_vec();
            cols.sort_unstable();

            let tree = TreeBuilder::new(x, &grad, &hess, &cols, params.growth()).build(&rows);
            for (m, row) in margins.iter_mut().zip(x) {
                *m += tree.predict(row);
            }
            trees.push(tree);
            summary.rounds_run = round + 1;

            if let (Some(eval), Some(eval_margins)) = (eval, eval_margins.as_mut()) {
                let tree = &trees[round];
                for (m, row) in eval_margins.iter_mut().zip(eval.x) {
                    *m += tree.predict(row);
                }
                let probs: Vec<f64> = eval_margins.iter().map(|&m| sigmoid(m)).collect();
                let loss = log_loss(eval.y, &probs);
                summary.eval_logloss.push(loss);

                if summary.best_score.is_none_or(|best| loss < best) {
                    summary.best_score = Some(loss);
                    summary.best_iteration = Some(round);
                }

                if let (Some(patience), Some(best)) =
                    (params.early_stopping_rounds, summary.best_iteration)
                {
                    if round - best >= patience {
                        debug!(
                            "Early stopping at round {}: best eval logloss {:.6} at round {}",
                            round,
                            summary.best_score.unwrap_or(f64::NAN),
                            best
                        );
                        summary.stopped_early = true;
                        break;
                    }
                }
            }
        }

        if params.early_stopping_rounds.is_some() {
            if let Some(best) = summary.best_iteration {
                trees.truncate(best + 1);
            }
        }

        info!(
            "Booster fitted: {} trees kept of {} rounds ({} features, {} rows)",
            trees.len(),
            summary.rounds_run,
            n_features,
            x.len()
        );

        Ok((
            Self {
                n_features,
                base_margin,
                trees,
                best_iteration: summary.best_iteration,
            },
            summary,
        ))
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn best_iteration(&self) -> Option<usize> {
        self.best_iteration
    }

    pub fn predict_margin(&self, x: &[f64]) -> Result<f64, BoosterError> {
        if x.len() != self.n_features {
            return Err(BoosterError::ShapeMismatch {
                expected: self.n_features,
                found: x.len(),
            });
        }
        Ok(self.base_margin + self.trees.iter().map(|t| t.predict(x)).sum::<f64>())
    }

    /// `[P(class 0), P(class 1)]`
    pub fn predict_proba(&self, x: &[f64]) -> Result<[f64; 2], BoosterError> {
        let p = sigmoid(self.predict_margin(x)?);
        Ok([1.0 - p, p])
    }

    pub fn predict_class(&self, x: &[f64]) -> Result<usize, BoosterError> {
        let [_, p_up] = self.predict_proba(x)?;
        Ok(usize::from(p_up > 0.5))
    }

    /// Total split gain per feature, normalised to sum to 1.
    pub fn feature_importance(&self) -> Vec<f64> {
        let mut gains = vec![0.0; self.n_features];
        for tree in &self.trees {
            for node in tree.nodes() {
                if let TreeNode::Split { feature, gain, .. } = node {
                    if let Some(slot) = gains.get_mut(*feature) {
                        *slot += gain;
                    }
                }
            }
        }
        let total: f64 = gains.iter().sum();
        if total > 0.0 {
            for g in gains.iter_mut() {
                *g /= total;
            }
        }
        gains
    }

    /// Structural checks for a classifier read back from storage.
    pub fn validate(&self) -> Result<(), String> {
        if self.n_features == 0 {
            return Err("classifier declares zero features".to_string());
        }
        if !self.base_margin.is_finite() {
            return Err("classifier base margin is not finite".to_string());
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features)
                .map_err(|e| format!("tree {}: {}", i, e))?;
        }
        Ok(())
    }
}

fn check_matrix(x: &[Vec<f64>], y: &[f64], n_features: usize) -> Result<(), BoosterError> {
    if x.len() != y.len() {
        return Err(BoosterError::LengthMismatch {
            rows: x.len(),
            labels: y.len(),
        });
    }
    if let Some(row) = x.iter().find(|r| r.len() != n_features) {
        return Err(BoosterError::ShapeMismatch {
            expected: n_features,
            found: row.len(),
        });
    }
    if let Some(&label) = y.iter().find(|&&l| l != 0.0 && l != 1.0) {
        return Err(BoosterError::InvalidLabel(label));
    }
    Ok(())
}

pub fn sigmoid(margin: f64) -> f64 {
    1.0 / (1.0 + (-margin).exp())
}

fn logit(p: f64) -> f64 {
    (p / (1.0 - p)).ln()
}

/// Mean binary cross-entropy with probabilities clamped away from 0 and 1.
pub fn log_loss(y: &[f64], p: &[f64]) -> f64 {
    if y.is_empty() {
        return 0.0;
    }
    let total: f64 = y
        .iter()
        .zip(p)
        .map(|(&t, &p)| {
            let p = p.clamp(PROB_EPS, 1.0 - PROB_EPS);
            -(t * p.ln() + (1.0 - t) * (1.0 - p).ln())
        })
        .sum();
    total / y.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Label is 1 when feature 0 exceeds 0.5; feature 1 is noise.
    fn threshold_data(n: usize) -> (Vec<Vec<f64>>, Vec<f64>) {
        let x: Vec<Vec<f64>> = (0..n)
            .map(|i| {
                let a = (i as f64 * 0.618_033_988_7) % 1.0;
                let b = (i as f64 * 0.414_213_562_3) % 1.0;
                vec![a, b]
            })
            .collect();
        let y = x.iter().map(|r| if r[0] > 0.5 { 1.0 } else { 0.0 }).collect();
        (x, y)
    }

    fn fast_params() -> BoosterParams {
        BoosterParams {
            n_estimators: 200,
            learning_rate: 0.3,
            max_depth: 3,
            gamma: 0.0,
            colsample_bytree: 1.0,
            ..BoosterParams::default()
        }
    }

    #[test]
    fn test_learns_threshold_rule() {
        let (x, y) = threshold_data(200);
        let (model, _) = GradientBoostedClassifier::fit(&fast_params(), &x, &y, None).unwrap();

        assert_eq!(model.predict_class(&[0.9, 0.1]).unwrap(), 1);
        assert_eq!(model.predict_class(&[0.1, 0.9]).unwrap(), 0);

        let importance = model.feature_importance();
        assert!(importance[0] > importance[1]);
        assert!((importance.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let (x, y) = threshold_data(50);
        let (model, _) = GradientBoostedClassifier::fit(&fast_params(), &x, &y, None).unwrap();
        let [down, up] = model.predict_proba(&[0.7, 0.2]).unwrap();
        assert!((down + up - 1.0).abs() < 1e-12);
        assert!((0.0..=1.0).contains(&up));
    }

    #[test]
    fn test_early_stopping_truncates_to_best_round() {
        let (x, y) = threshold_data(120);
        // Eval labels inverted: eval loss worsens as training fits, so round 0 stays best
        let eval_y: Vec<f64> = y.iter().map(|v| 1.0 - v).collect();
        let params = BoosterParams {
            early_stopping_rounds: Some(5),
            ..fast_params()
        };
        let (model, summary) = GradientBoostedClassifier::fit(
            &params,
            &x,
            &y,
            Some(EvalSet { x: &x, y: &eval_y }),
        )
        .unwrap();

        assert!(summary.stopped_early);
        assert_eq!(summary.best_iteration, Some(0));
        assert_eq!(summary.rounds_run, 6);
        assert_eq!(model.n_trees(), 1);
        assert_eq!(summary.eval_logloss.len(), 6);
    }

    #[test]
    fn test_fit_is_deterministic_for_seed() {
        let (x, y) = threshold_data(100);
        let params = BoosterParams {
            subsample: 0.7,
            colsample_bytree: 0.5,
            ..fast_params()
        };
        let (a, _) = GradientBoostedClassifier::fit(&params, &x, &y, None).unwrap();
        let (b, _) = GradientBoostedClassifier::fit(&params, &x, &y, None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_input_validation() {
        let (x, y) = threshold_data(10);
        let params = fast_params();

        assert_eq!(
            GradientBoostedClassifier::fit(&params, &[], &[], None).unwrap_err(),
            BoosterError::EmptyTrainingSet
        );
        assert!(matches!(
            GradientBoostedClassifier::fit(&params, &x, &y[..5], None),
            Err(BoosterError::LengthMismatch { .. })
        ));
        let mut bad = y.clone();
        bad[0] = 2.0;
        assert_eq!(
            GradientBoostedClassifier::fit(&params, &x, &bad, None).unwrap_err(),
            BoosterError::InvalidLabel(2.0)
        );

        let (model, _) = GradientBoostedClassifier::fit(&params, &x, &y, None).unwrap();
        assert_eq!(
            model.predict_proba(&[1.0]).unwrap_err(),
            BoosterError::ShapeMismatch {
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn test_param_validation() {
        let mut params = BoosterParams::default();
        assert!(params.validate().is_ok());
        params.subsample = 0.0;
        assert!(params.validate().is_err());
        params = BoosterParams {
            base_score: 1.0,
            ..BoosterParams::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_log_loss() {
        assert!((log_loss(&[1.0, 0.0], &[0.5, 0.5]) - std::f64::consts::LN_2).abs() < 1e-12);
        assert!(log_loss(&[1.0], &[1.0]) < 1e-12);
        assert!(log_loss(&[1.0], &[0.0]).is_finite());
    }
}
