use crate::domain::ml::feature_registry::{FeatureName, FeatureSchema};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Forward-looking direction over the label horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "DOWN")]
    Down,
    #[serde(rename = "UP")]
    Up,
}

impl Direction {
    /// Binary class index: Down = 0, Up = 1
    pub fn class(&self) -> usize {
        match self {
            Direction::Down => 0,
            Direction::Up => 1,
        }
    }

    pub fn from_class(class: usize) -> Self {
        if class == 1 {
            Direction::Up
        } else {
            Direction::Down
        }
    }

    pub fn as_target(&self) -> f64 {
        self.class() as f64
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Down => "DOWN",
            Direction::Up => "UP",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One labeled time point. `index` is the bar position in the source series.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetRow {
    pub date: NaiveDate,
    pub index: usize,
    pub features: Vec<f64>,
    pub label: Direction,
}

/// Chronologically ordered, fully defined rows plus the schema that produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    schema: FeatureSchema,
    rows: Vec<DatasetRow>,
}

impl Dataset {
    pub fn new(schema: FeatureSchema, rows: Vec<DatasetRow>) -> Self {
        Self { schema, rows }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn rows(&self) -> &[DatasetRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn features(&self) -> Vec<Vec<f64>> {
        self.rows.iter().map(|r| r.features.clone()).collect()
    }

    pub fn targets(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.label.as_target()).collect()
    }

    pub fn labels(&self) -> Vec<Direction> {
        self.rows.iter().map(|r| r.label).collect()
    }

    /// First and last date covered, if any.
    pub fn date_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        match (self.rows.first(), self.rows.last()) {
            (Some(first), Some(last)) => Some((first.date, last.date)),
            _ => None,
        }
    }

    /// Share of rows labeled Up
    pub fn up_ratio(&self) -> f64 {
        if self.rows.is_empty() {
            return 0.0;
        }
        let ups = self
            .rows
            .iter()
            .filter(|r| r.label == Direction::Up)
            .count();
        ups as f64 / self.rows.len() as f64
    }

    /// Splits by position: leading `floor(len * train_fraction)` rows train, the rest test.
    /// Order is preserved on both sides.
    pub fn chronological_split(&self, train_fraction: f64) -> (Dataset, Dataset) {
        let fraction = train_fraction.clamp(0.0, 1.0);
        let split = (self.rows.len() as f64 * fraction).floor() as usize;
        let (train, test) = self.rows.split_at(split);
        (
            Dataset::new(self.schema.clone(), train.to_vec()),
            Dataset::new(self.schema.clone(), test.to_vec()),
        )
    }

    /// Writes `date,<features...>,Target` rows for offline inspection.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }
        let mut wtr = csv::Writer::from_path(path)
            .with_context(|| format!("Failed to open dataset export {:?}", path))?;

        let mut header = vec!["date".to_string()];
        header.extend(self.schema.names().iter().map(|n| n.to_string()));
        header.push("Target".to_string());
        wtr.write_record(&header)?;

        for row in &self.rows {
            let mut record = vec![row.date.to_string()];
            record.extend(row.features.iter().map(|v| v.to_string()));
            record.push(row.label.class().to_string());
            wtr.write_record(&record)?;
        }
        wtr.flush().context("Failed to flush dataset export")?;
        Ok(())
    }

    /// Value of `feature` in `row`, looked up through the schema.
    pub fn value(&self, row: &DatasetRow, feature: FeatureName) -> Option<f64> {
        self.schema
            .position(feature)
            .and_then(|i| row.features.get(i).copied())
    }
}
