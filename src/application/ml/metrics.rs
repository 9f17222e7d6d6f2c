//! Evaluation metrics for the direction classifier.

use crate::domain::ml::Direction;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Confusion counts with Up as the positive class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_up: usize,
    pub false_up: usize,
    pub true_down: usize,
    pub false_down: usize,
}

impl ConfusionMatrix {
    pub fn from_labels(actual: &[Direction], predicted: &[Direction]) -> Self {
        let mut matrix = Self::default();
        for (a, p) in actual.iter().zip(predicted) {
            match (a, p) {
                (Direction::Up, Direction::Up) => matrix.true_up += 1,
                (Direction::Down, Direction::Up) => matrix.false_up += 1,
                (Direction::Down, Direction::Down) => matrix.true_down += 1,
                (Direction::Up, Direction::Down) => matrix.false_down += 1,
            }
        }
        matrix
    }

    pub fn total(&self) -> usize {
        self.true_up + self.false_up + self.true_down + self.false_down
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.true_up + self.true_down, self.total())
    }

    fn class_metrics(&self, class: Direction) -> ClassMetrics {
        let (tp, fp, fn_) = match class {
            Direction::Up => (self.true_up, self.false_up, self.false_down),
            Direction::Down => (self.true_down, self.false_down, self.false_up),
        };
        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        ClassMetrics {
            class,
            precision,
            recall,
            f1,
            support: tp + fn_,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub class: Direction,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AveragedMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// Per-class precision/recall/f1 with macro and support-weighted averages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub confusion: ConfusionMatrix,
    pub classes: [ClassMetrics; 2],
    pub accuracy: f64,
    pub macro_avg: AveragedMetrics,
    pub weighted_avg: AveragedMetrics,
}

impl ClassificationReport {
    pub fn new(actual: &[Direction], predicted: &[Direction]) -> Self {
        let confusion = ConfusionMatrix::from_labels(actual, predicted);
        let classes = [
            confusion.class_metrics(Direction::Down),
            confusion.class_metrics(Direction::Up),
        ];

        let macro_avg = AveragedMetrics {
            precision: classes.iter().map(|c| c.precision).sum::<f64>() / 2.0,
            recall: classes.iter().map(|c| c.recall).sum::<f64>() / 2.0,
            f1: classes.iter().map(|c| c.f1).sum::<f64>() / 2.0,
        };

        let total = confusion.total();
        let weighted = |f: fn(&ClassMetrics) -> f64| {
            if total == 0 {
                0.0
            } else {
                classes.iter().map(|c| f(c) * c.support as f64).sum::<f64>() / total as f64
            }
        };
        let weighted_avg = AveragedMetrics {
            precision: weighted(|c| c.precision),
            recall: weighted(|c| c.recall),
            f1: weighted(|c| c.f1),
        };

        Self {
            confusion,
            classes,
            accuracy: confusion.accuracy(),
            macro_avg,
            weighted_avg,
        }
    }

    pub fn class(&self, class: Direction) -> &ClassMetrics {
        &self.classes[class.class()]
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.confusion.total();
        writeln!(
            f,
            "{:>14} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        for c in &self.classes {
            writeln!(
                f,
                "{:>14} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                c.class.as_str(),
                c.precision,
                c.recall,
                c.f1,
                c.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>14} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, total
        )?;
        for (name, avg) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            writeln!(
                f,
                "{:>14} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name, avg.precision, avg.recall, avg.f1, total
            )?;
        }
        Ok(())
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}
