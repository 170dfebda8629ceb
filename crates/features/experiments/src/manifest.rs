//! The `config.json` shipped with every experiment package.

use crate::error::ExperimentsError;
use regex::Regex;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::LazyLock;

/// File name of the manifest inside a package folder.
pub const MANIFEST_FILE: &str = "config.json";

static TAG_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]*$").ok());

/// Whether `tag` is safe to use as a folder name and a URL segment.
#[must_use]
pub fn is_valid_tag(tag: &str) -> bool {
    TAG_PATTERN.as_ref().is_some_and(|pattern| pattern.is_match(tag))
}

/// A variable an experiment reports for bonus or rejection decisions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariableSpec {
    pub name: String,
    pub description: Option<String>,
    pub datatype: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentManifest {
    pub tag: String,
    pub name: String,
    /// Engine the experiment runs on, e.g. `jspsych`.
    #[serde(default = "default_engine")]
    pub template: String,
    /// Assets to load, in order. `.js` and `.css` entries are embedded.
    #[serde(default)]
    pub run: Vec<String>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default = "default_publish", deserialize_with = "loose_bool")]
    pub publish: bool,
    /// Expected duration in minutes.
    #[serde(default, deserialize_with = "loose_minutes")]
    pub time: Option<u32>,
    #[serde(default)]
    pub cognitive_atlas_task_id: Option<String>,
    #[serde(default)]
    pub performance_variable: Option<VariableSpec>,
    #[serde(default)]
    pub rejection_variable: Option<VariableSpec>,
}

impl ExperimentManifest {
    /// Parses a manifest that is either a single object or a one-element list.
    ///
    /// # Errors
    /// [`ExperimentsError::Serde`] for malformed JSON and [`ExperimentsError::Manifest`]
    /// for an empty list or an unusable tag.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ExperimentsError> {
        let value: Value = serde_json::from_slice(bytes)?;
        let value = match value {
            Value::Array(mut entries) => {
                if entries.is_empty() {
                    return Err(ExperimentsError::Manifest {
                        message: "manifest list is empty".into(),
                        context: None,
                    });
                }
                entries.swap_remove(0)
            },
            other => other,
        };
        let manifest: Self = serde_json::from_value(value)?;
        if !is_valid_tag(&manifest.tag) {
            return Err(ExperimentsError::Manifest {
                message: format!("invalid tag '{}'", manifest.tag).into(),
                context: None,
            });
        }
        Ok(manifest)
    }
}

fn default_engine() -> String {
    "jspsych".to_owned()
}

const fn default_publish() -> bool {
    true
}

/// Accepts `true`, `"True"`, `"yes"`, `1` and their negatives.
fn loose_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Bool(b) => Ok(b),
        Value::Number(n) => Ok(n.as_f64().is_some_and(|n| n.abs() > f64::EPSILON)),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(true),
            "false" | "no" | "0" | "" => Ok(false),
            other => Err(de::Error::custom(format!("expected a boolean, got '{other}'"))),
        },
        Value::Null => Ok(false),
        other => Err(de::Error::custom(format!("expected a boolean, got {other}"))),
    }
}

/// Accepts a number or a numeric string. Blank and null mean unknown.
fn loose_minutes<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("invalid duration {n}"))),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => {
            s.trim().parse().map(Some).map_err(|_| de::Error::custom(format!("invalid duration '{s}'")))
        },
        other => Err(de::Error::custom(format!("invalid duration {other}"))),
    }
}
