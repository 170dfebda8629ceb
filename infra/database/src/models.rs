//! Entity records held by the store.
//!
//! Each record lives in its table under an integer key, e.g. `battery:3`. Relationships are
//! plain integer references. Referential clean-up is done by the table events defined in
//! `schema.surql`, never by the records themselves.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use surrealdb::types::SurrealValue;

/// Integer key of a record. `0` means "not yet inserted".
pub type Id = i64;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, SurrealValue)]
#[serde(default)]
pub struct User {
    pub id: Id,
    pub username: String,
    pub is_superuser: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, SurrealValue)]
#[serde(default)]
pub struct CognitiveAtlasTask {
    pub id: Id,
    pub name: String,
    pub cog_atlas_id: String,
}

/// A measured variable an experiment reports, e.g. `credit_var`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, SurrealValue)]
#[serde(default)]
pub struct ExperimentVariable {
    pub id: Id,
    pub name: String,
    pub description: Option<String>,
    pub datatype: Option<String>,
}

/// An installed experiment package. `tag` is unique across the table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, SurrealValue)]
#[serde(default)]
pub struct ExperimentTemplate {
    pub id: Id,
    pub tag: String,
    pub name: String,
    pub cognitive_atlas_task: Option<Id>,
    pub reference: Option<String>,
    pub publish: bool,
    /// Engine name, e.g. `jspsych`.
    pub template: String,
    /// Estimated duration in minutes.
    pub time: Option<i64>,
    pub performance_variable: Option<Id>,
    pub rejection_variable: Option<Id>,
    pub add_date: i64,
    pub modify_date: i64,
}

/// Maps a variable outcome to a bonus or rejection amount.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, SurrealValue)]
#[serde(default)]
pub struct CreditCondition {
    pub id: Id,
    pub variable: Id,
    pub operator: Option<String>,
    pub value: Option<String>,
    pub amount: Option<String>,
}

/// A template configured for use inside batteries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, SurrealValue)]
#[serde(default)]
pub struct Experiment {
    pub id: Id,
    pub template: Id,
    pub include_bonus: bool,
    pub include_catch: bool,
    pub credit_conditions: Vec<Id>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, SurrealValue)]
#[serde(default)]
pub struct Battery {
    pub id: Id,
    pub name: String,
    pub description: Option<String>,
    pub owner: Id,
    pub contributors: Vec<Id>,
    pub experiments: Vec<Id>,
    pub active: bool,
    pub maximum_time: Option<i64>,
    pub number_of_experiments: Option<i64>,
    pub bonus_active: bool,
    pub blacklist_active: bool,
    pub add_date: i64,
    pub modify_date: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, SurrealValue)]
#[serde(default)]
pub struct Hit {
    pub id: Id,
    pub battery: Id,
    pub title: String,
    pub description: String,
    pub status: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, SurrealValue)]
#[serde(default)]
pub struct Assignment {
    pub id: Id,
    pub hit: Id,
    pub worker_id: String,
    pub status: String,
}

/// Raw participant output for one experiment of one assignment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentResult {
    pub id: Id,
    pub assignment: Id,
    pub experiment: Id,
    pub worker_id: String,
    pub data: Value,
    pub completed: bool,
    pub finish_time: Option<i64>,
}

/// Stored shape of an [`ExperimentResult`]: the payload is kept as JSON text.
#[derive(Debug, Clone, SurrealValue)]
pub(crate) struct StoredResult {
    pub id: Id,
    pub assignment: Id,
    pub experiment: Id,
    pub worker_id: String,
    pub data: String,
    pub completed: bool,
    pub finish_time: Option<i64>,
}

impl From<&ExperimentResult> for StoredResult {
    fn from(result: &ExperimentResult) -> Self {
        Self {
            id: result.id,
            assignment: result.assignment,
            experiment: result.experiment,
            worker_id: result.worker_id.clone(),
            data: result.data.to_string(),
            completed: result.completed,
            finish_time: result.finish_time,
        }
    }
}

impl TryFrom<StoredResult> for ExperimentResult {
    type Error = serde_json::Error;

    fn try_from(stored: StoredResult) -> Result<Self, Self::Error> {
        Ok(Self {
            id: stored.id,
            assignment: stored.assignment,
            experiment: stored.experiment,
            worker_id: stored.worker_id,
            data: serde_json::from_str(&stored.data)?,
            completed: stored.completed,
            finish_time: stored.finish_time,
        })
    }
}

impl Battery {
    /// Whether `user` owns or contributes to this battery.
    #[must_use]
    pub fn is_member(&self, user: Id) -> bool {
        self.owner == user || self.contributors.contains(&user)
    }
}
