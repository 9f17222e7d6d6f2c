//! Booster hyperparameter overrides from environment variables.
//!
//! Every `BOOSTER_*` key is optional and falls back to [`BoosterParams::default`].
//! `BOOSTER_EARLY_STOPPING_ROUNDS=0` disables early stopping.

use super::{Lookup, parse_or};
use crate::application::ml::BoosterParams;
use anyhow::{Context, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingEnvConfig {
    pub booster: BoosterParams,
}

impl Default for TrainingEnvConfig {
    fn default() -> Self {
        Self {
            booster: BoosterParams::default(),
        }
    }
}

impl TrainingEnvConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(&|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self> {
        let d = BoosterParams::default();
        let early_stopping =
            parse_or(lookup, "BOOSTER_EARLY_STOPPING_ROUNDS", d.early_stopping_rounds.unwrap_or(0))?;

        let booster = BoosterParams {
            n_estimators: parse_or(lookup, "BOOSTER_N_ESTIMATORS", d.n_estimators)?,
            learning_rate: parse_or(lookup, "BOOSTER_LEARNING_RATE", d.learning_rate)?,
            max_depth: parse_or(lookup, "BOOSTER_MAX_DEPTH", d.max_depth)?,
            subsample: parse_or(lookup, "BOOSTER_SUBSAMPLE", d.subsample)?,
            colsample_bytree: parse_or(lookup, "BOOSTER_COLSAMPLE_BYTREE", d.colsample_bytree)?,
            gamma: parse_or(lookup, "BOOSTER_GAMMA", d.gamma)?,
            reg_lambda: parse_or(lookup, "BOOSTER_REG_LAMBDA", d.reg_lambda)?,
            min_child_weight: parse_or(lookup, "BOOSTER_MIN_CHILD_WEIGHT", d.min_child_weight)?,
            base_score: d.base_score,
            early_stopping_rounds: (early_stopping > 0).then_some(early_stopping),
            seed: parse_or(lookup, "BOOSTER_SEED", d.seed)?,
        };
        booster
            .validate()
            .context("Invalid BOOSTER_* configuration")?;

        Ok(Self { booster })
    }
}
