//! Structured facts extracted from a clause, with schema versioning.
//!
//! Facts are stored as `{"schema_version": N, "facts": {...}}`. Payloads
//! written before the version tag existed are a bare JSON object and are
//! treated as schema 0; the upcaster registry lifts them on read.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{LineageError, LineageResult};

/// Current schema version for extracted facts.
pub const CURRENT_FACTS_SCHEMA: u16 = 1;

/// A single fact value. Open-ended, but restricted to JSON-shaped data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FactValue {
    Null,
    Bool(bool),
    Integer(i64),
    Number(f64),
    Text(String),
    List(Vec<FactValue>),
    Map(BTreeMap<String, FactValue>),
}

impl FactValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }
}

/// Facts extracted from one clause (amounts, durations, parties, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedFacts {
    pub schema_version: u16,
    pub facts: BTreeMap<String, FactValue>,
}

impl ExtractedFacts {
    pub fn new(facts: BTreeMap<String, FactValue>) -> Self {
        Self {
            schema_version: CURRENT_FACTS_SCHEMA,
            facts,
        }
    }

    pub fn get(&self, key: &str) -> Option<&FactValue> {
        self.facts.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    /// Serialize to the versioned wire form.
    pub fn to_json_string(&self) -> LineageResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a stored payload, upcasting legacy shapes with the default registry.
    pub fn from_json_str(raw: &str) -> LineageResult<Self> {
        let value: Value = serde_json::from_str(raw)?;
        FactsUpcasterRegistry::with_defaults().decode(value)
    }
}

/// A facts payload before it is decoded into typed values.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFacts {
    pub schema_version: u16,
    /// For schema ≥ 1 this is the `facts` object itself.
    pub payload: Value,
}

impl RawFacts {
    /// Split a JSON payload into its version tag and body.
    pub fn from_value(value: Value) -> LineageResult<Self> {
        let Value::Object(mut map) = value else {
            return Err(LineageError::InvalidInput(
                "extracted facts must be a JSON object".to_string(),
            ));
        };

        let tagged = map.len() == 2
            && map.get("schema_version").is_some_and(Value::is_u64)
            && map.get("facts").is_some_and(Value::is_object);
        if !tagged {
            return Ok(Self {
                schema_version: 0,
                payload: Value::Object(map),
            });
        }

        let version = map
            .get("schema_version")
            .and_then(Value::as_u64)
            .and_then(|v| u16::try_from(v).ok())
            .ok_or_else(|| {
                LineageError::InvalidInput("facts schema_version out of range".to_string())
            })?;
        let payload = map.remove("facts").unwrap_or(Value::Null);
        Ok(Self {
            schema_version: version,
            payload,
        })
    }
}

/// Lifts a facts payload from an older schema version.
pub trait FactsUpcaster: Send + Sync {
    fn can_upcast(&self, schema_version: u16) -> bool;
    fn upcast(&self, raw: RawFacts) -> LineageResult<RawFacts>;
}

/// Registry of upcasters, applied in registration order on read.
pub struct FactsUpcasterRegistry {
    upcasters: Vec<Box<dyn FactsUpcaster>>,
}

impl FactsUpcasterRegistry {
    pub fn new() -> Self {
        Self {
            upcasters: Vec::new(),
        }
    }

    /// Registry with the bare-object (schema 0) upcaster.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(BareObjectUpcaster));
        registry
    }

    pub fn register(&mut self, upcaster: Box<dyn FactsUpcaster>) {
        self.upcasters.push(upcaster);
    }

    pub fn upcast(&self, mut raw: RawFacts) -> LineageResult<RawFacts> {
        if raw.schema_version >= CURRENT_FACTS_SCHEMA {
            return Ok(raw);
        }
        for upcaster in &self.upcasters {
            if upcaster.can_upcast(raw.schema_version) {
                raw = upcaster.upcast(raw)?;
            }
        }
        Ok(raw)
    }

    /// Upcast and decode a JSON payload into typed facts.
    pub fn decode(&self, value: Value) -> LineageResult<ExtractedFacts> {
        let raw = self.upcast(RawFacts::from_value(value)?)?;
        if raw.schema_version > CURRENT_FACTS_SCHEMA {
            return Err(LineageError::InvalidInput(format!(
                "facts schema_version {} is newer than supported {}",
                raw.schema_version, CURRENT_FACTS_SCHEMA
            )));
        }
        if raw.schema_version < CURRENT_FACTS_SCHEMA {
            return Err(LineageError::InvalidInput(format!(
                "no upcaster for facts schema_version {}",
                raw.schema_version
            )));
        }
        let facts: BTreeMap<String, FactValue> = serde_json::from_value(raw.payload)?;
        Ok(ExtractedFacts {
            schema_version: raw.schema_version,
            facts,
        })
    }
}

impl Default for FactsUpcasterRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Schema 0 → 1: the bare object becomes the `facts` map unchanged.
struct BareObjectUpcaster;

impl FactsUpcaster for BareObjectUpcaster {
    fn can_upcast(&self, schema_version: u16) -> bool {
        schema_version == 0
    }

    fn upcast(&self, raw: RawFacts) -> LineageResult<RawFacts> {
        Ok(RawFacts {
            schema_version: 1,
            payload: raw.payload,
        })
    }
}
