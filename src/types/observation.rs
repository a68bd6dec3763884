//! Entities emitted downstream: observations and asset commands.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::Value;

/// Ordered property map of one observation.
///
/// Iteration order follows the requirement schema's field order; lookups are
/// linear, which is fine at the handful-of-fields scale of SHDR schemas.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Properties(Vec<(String, Value)>);

impl Properties {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Insert or replace a property, keeping first-insertion order.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.0.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.iter().find(|(existing, _)| existing == name).map(|(_, value)| value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One typed observation for a data item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    /// Id of the data item this observes.
    pub data_item_id: String,
    /// Frame timestamp (parsed from the line or assigned at ingest).
    pub timestamp: DateTime<Utc>,
    /// Optional duration in seconds from the timestamp's `@` suffix.
    pub duration: Option<f64>,
    /// Whether the upstream reported `UNAVAILABLE`.
    pub unavailable: bool,
    /// Converted properties in schema field order.
    pub properties: Properties,
}

impl Observation {
    /// The `VALUE` property, if present.
    pub fn value(&self) -> Option<&Value> {
        self.properties.get("VALUE")
    }
}

/// Asset lifecycle command decoded from an `@…@` token sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum AssetCommand {
    /// `@ASSET@|id|type|body` — a new or updated asset definition. The body
    /// is the raw XML handed to the asset-parser collaborator.
    Definition {
        asset_id: String,
        asset_type: String,
        body: String,
    },
    /// `@REMOVE_ALL_ASSETS@[|type]`
    RemoveAll { asset_type: Option<String> },
    /// `@REMOVE_ASSET@|id`
    Remove { asset_id: String },
}

/// One item delivered to the downstream sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Entity {
    Observation(Observation),
    Asset {
        timestamp: DateTime<Utc>,
        command: AssetCommand,
    },
}

impl Entity {
    /// The contained observation, if this entity is one.
    pub fn as_observation(&self) -> Option<&Observation> {
        match self {
            Entity::Observation(observation) => Some(observation),
            Entity::Asset { .. } => None,
        }
    }
}
