//! Work units and their feature vectors.
//!
//! The governor never sees the raw content of a unit of work (a user query,
//! an install phase step). The work-source reduces it to a [`FeatureVector`]
//! of named magnitudes and tags it with the domain whose weights apply.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Named feature magnitudes (e.g. `word_count`, `question_count`).
///
/// Backed by a `BTreeMap` so iteration order, and therefore the weighted sum,
/// is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FeatureVector(BTreeMap<String, f64>);

impl FeatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.0.insert(name.into(), value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Build a vector from loosely typed JSON.
    ///
    /// Non-numeric entries are ignored and negative magnitudes are clamped to
    /// zero. Both cases log a warning; neither fails.
    pub fn from_json(value: &serde_json::Value) -> Self {
        let mut features = BTreeMap::new();

        match value.as_object() {
            Some(map) => {
                let mut ignored = Vec::new();
                for (name, raw) in map {
                    match raw.as_f64() {
                        Some(magnitude) => {
                            features.insert(name.clone(), magnitude);
                        }
                        None => ignored.push(name.as_str()),
                    }
                }
                if !ignored.is_empty() {
                    warn!(ignored = ?ignored, "ignoring non-numeric feature entries");
                }
            }
            None if value.is_null() => {}
            None => warn!(kind = %json_kind(value), "feature vector is not an object, treating as empty"),
        }

        Self(features).sanitized()
    }

    /// Clamp negatives to zero and drop non-finite magnitudes.
    pub fn sanitized(self) -> Self {
        let mut clamped = Vec::new();
        let mut dropped = Vec::new();

        let features = self
            .0
            .into_iter()
            .filter_map(|(name, magnitude)| {
                if !magnitude.is_finite() {
                    dropped.push(name);
                    None
                } else if magnitude < 0.0 {
                    clamped.push(name.clone());
                    Some((name, 0.0))
                } else {
                    Some((name, magnitude))
                }
            })
            .collect();

        if !clamped.is_empty() {
            warn!(features = ?clamped, "clamping negative feature magnitudes to 0");
        }
        if !dropped.is_empty() {
            warn!(features = ?dropped, "dropping non-finite feature magnitudes");
        }

        Self(features)
    }

    /// True when every magnitude is finite and non-negative.
    pub fn is_clean(&self) -> bool {
        self.0.values().all(|v| v.is_finite() && *v >= 0.0)
    }
}

impl<'de> Deserialize<'de> for FeatureVector {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(Self::from_json(&value))
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for FeatureVector {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// A unit of work submitted for admission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkUnit {
    /// Feature magnitudes produced by the work-source.
    #[serde(default)]
    pub features: FeatureVector,

    /// Domain / persona whose weight profile scores this unit.
    #[serde(default = "default_domain", alias = "domain_id")]
    pub domain: String,

    /// Optional normalized flow factors reported alongside the unit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow: Option<BTreeMap<String, f64>>,
}

fn default_domain() -> String {
    super::profile::DEFAULT_PROFILE_NAME.to_string()
}

impl WorkUnit {
    pub fn new(domain: impl Into<String>, features: FeatureVector) -> Self {
        Self {
            features,
            domain: domain.into(),
            flow: None,
        }
    }

    /// Attach flow factors to be folded into the session's flow tracker.
    pub fn with_flow(mut self, factors: BTreeMap<String, f64>) -> Self {
        self.flow = Some(factors);
        self
    }
}
