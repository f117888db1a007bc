//! Query/body/header parameter overrides.
//!
//! Tenant and provider configuration can add, replace or suppress the
//! parameters the engine sends. In the core's JSON a `null` value removes a
//! key and any other value sets it.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// What to do with one parameter key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ParamOverride {
    /// Leave whatever the engine computed.
    #[default]
    Keep,
    /// Drop the key entirely.
    Remove,
    /// Send this value.
    Set(String),
}

impl ParamOverride {
    pub fn set(value: impl Into<String>) -> Self {
        ParamOverride::Set(value.into())
    }
}

impl<'de> Deserialize<'de> for ParamOverride {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Null => ParamOverride::Remove,
            Value::String(s) => ParamOverride::Set(s),
            other => ParamOverride::Set(other.to_string()),
        })
    }
}

/// Overrides keyed by parameter name; ordered for stable URLs.
pub type ParamOverrides = BTreeMap<String, ParamOverride>;

/// Parameters as they go on the wire; ordered for stable URLs.
pub type Params = BTreeMap<String, String>;

/// Apply overrides on top of computed parameters.
pub fn apply_overrides(params: &mut Params, overrides: &ParamOverrides) {
    for (key, value) in overrides {
        match value {
            ParamOverride::Keep => {}
            ParamOverride::Remove => {
                params.remove(key);
            }
            ParamOverride::Set(value) => {
                params.insert(key.clone(), value.clone());
            }
        }
    }
}
