use crate::domain::errors::SchemaError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Named model inputs. The serialized names are part of the artifact format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureName {
    #[serde(rename = "Close")]
    Close,
    #[serde(rename = "SMA_50")]
    Sma50,
    #[serde(rename = "SMA_200")]
    Sma200,
    #[serde(rename = "RSI")]
    Rsi,
    #[serde(rename = "MACD")]
    Macd,
    #[serde(rename = "MACD_Signal")]
    MacdSignal,
    #[serde(rename = "BB_High")]
    BbHigh,
    #[serde(rename = "BB_Low")]
    BbLow,
}

impl FeatureName {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureName::Close => "Close",
            FeatureName::Sma50 => "SMA_50",
            FeatureName::Sma200 => "SMA_200",
            FeatureName::Rsi => "RSI",
            FeatureName::Macd => "MACD",
            FeatureName::MacdSignal => "MACD_Signal",
            FeatureName::BbHigh => "BB_High",
            FeatureName::BbLow => "BB_Low",
        }
    }
}

impl fmt::Display for FeatureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered feature list for schema version 1.
/// Any change here is a breaking change for persisted models: bump the version.
pub const STANDARD_FEATURES: [FeatureName; 8] = [
    FeatureName::Close,
    FeatureName::Sma50,
    FeatureName::Sma200,
    FeatureName::Rsi,
    FeatureName::Macd,
    FeatureName::MacdSignal,
    FeatureName::BbHigh,
    FeatureName::BbLow,
];

pub const STANDARD_SCHEMA_VERSION: u32 = 1;

/// Anything that can answer "what is feature X at bar i".
pub trait FeatureSource {
    /// `None` while the feature is warming up or the index is out of range.
    fn feature_value(&self, feature: FeatureName, index: usize) -> Option<f64>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("feature {0} is undefined")]
pub struct UndefinedFeature(pub FeatureName);

/// Versioned, ordered list of model inputs.
///
/// The schema is built once for training, stored inside the model artifact and
/// used as-is at serving time. Feature vectors can only be produced through
/// [`FeatureSchema::extract`], so column order cannot drift between the two paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    version: u32,
    features: Vec<FeatureName>,
}

impl FeatureSchema {
    pub fn new(version: u32, features: Vec<FeatureName>) -> Result<Self, SchemaError> {
        let schema = Self { version, features };
        schema.validate()?;
        Ok(schema)
    }

    pub fn standard() -> Self {
        Self {
            version: STANDARD_SCHEMA_VERSION,
            features: STANDARD_FEATURES.to_vec(),
        }
    }

    /// Re-checks invariants; used after deserialization.
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.features.is_empty() {
            return Err(SchemaError::Empty);
        }
        for (i, feature) in self.features.iter().enumerate() {
            if self.features[..i].contains(feature) {
                return Err(SchemaError::DuplicateFeature { feature: *feature });
            }
        }
        Ok(())
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn features(&self) -> &[FeatureName] {
        &self.features
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.features.iter().map(FeatureName::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn position(&self, feature: FeatureName) -> Option<usize> {
        self.features.iter().position(|f| *f == feature)
    }

    /// Builds the feature vector at `index`, in schema order.
    pub fn extract<S: FeatureSource + ?Sized>(
        &self,
        source: &S,
        index: usize,
    ) -> Result<FeatureVector, UndefinedFeature> {
        let mut entries = Vec::with_capacity(self.features.len());
        for &feature in &self.features {
            match source.feature_value(feature, index) {
                Some(value) if value.is_finite() => entries.push((feature, value)),
                _ => return Err(UndefinedFeature(feature)),
            }
        }
        Ok(FeatureVector {
            schema_version: self.version,
            entries,
        })
    }
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::standard()
    }
}

/// Feature values for one time point, tagged with their names.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureVector {
    schema_version: u32,
    entries: Vec<(FeatureName, f64)>,
}

impl FeatureVector {
    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    pub fn names(&self) -> Vec<FeatureName> {
        self.entries.iter().map(|(name, _)| *name).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.entries.iter().map(|(_, value)| *value).collect()
    }

    pub fn get(&self, feature: FeatureName) -> Option<f64> {
        self.entries
            .iter()
            .find(|(name, _)| *name == feature)
            .map(|(_, value)| *value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
