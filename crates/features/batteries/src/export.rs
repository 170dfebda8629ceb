//! Flattening stored results into a tab-separated table.

use expdj_kernel::database::models::{Battery, ExperimentResult, ExperimentTemplate, Id};
use expdj_kernel::database::{Database, DatabaseError};
use fxhash::{FxHashMap, FxHashSet};
use indexmap::{IndexMap, IndexSet};
use serde_json::{Map, Value};
use std::borrow::Cow;

/// Metadata columns that lead every export, in order.
pub const FIXED_COLUMNS: [&str; 8] = [
    "worker_id",
    "assignment_id",
    "hit_id",
    "result_id",
    "battery_name",
    "experiment_tag",
    "experiment_name",
    "completed",
];

/// MIME type of exported files.
pub const TSV_CONTENT_TYPE: &str = "text/tab-separated-values; charset=utf-8";

const TRIALDATA: &str = "trialdata";
const EXPERIMENT_TAG: &str = "experiment_tag";

type Row = IndexMap<String, String>;

/// Where results came from: the HIT of each assignment and the template of each experiment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lineage {
    pub hits: FxHashMap<Id, Id>,
    pub templates: FxHashMap<Id, ExperimentTemplate>,
}

impl Lineage {
    /// Loads the HITs and templates `results` refer to.
    ///
    /// # Errors
    /// Record store failures.
    pub async fn load(database: &Database, results: &[ExperimentResult]) -> Result<Self, DatabaseError> {
        let assignments: Vec<Id> =
            results.iter().map(|r| r.assignment).collect::<FxHashSet<_>>().into_iter().collect();
        let experiments: Vec<Id> =
            results.iter().map(|r| r.experiment).collect::<FxHashSet<_>>().into_iter().collect();

        let hits = database.assignments_in(&assignments).await?.into_iter().map(|a| (a.id, a.hit)).collect();
        let experiments = database.experiments_in(&experiments).await?;
        let template_ids: Vec<Id> = experiments.iter().map(|e| e.template).collect();
        let by_id: FxHashMap<Id, ExperimentTemplate> =
            database.templates_in(&template_ids).await?.into_iter().map(|t| (t.id, t)).collect();
        let templates = experiments
            .iter()
            .filter_map(|e| by_id.get(&e.template).map(|t| (e.id, t.clone())))
            .collect();
        Ok(Self { hits, templates })
    }
}

/// Rows of results with the union of their columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultTable {
    columns: IndexSet<String>,
    rows: Vec<Row>,
}

impl ResultTable {
    /// Builds one row per trial.
    ///
    /// An array in `data` yields a row per element, an object yields one row, and
    /// anything else yields a metadata-only row. Trial keys keep their first-seen order.
    /// A trial key that repeats a metadata column does not overwrite it.
    #[must_use]
    pub fn flatten(battery: &Battery, results: &[ExperimentResult], lineage: &Lineage) -> Self {
        let mut table = Self {
            columns: FIXED_COLUMNS.iter().map(|c| (*c).to_owned()).collect(),
            rows: Vec::new(),
        };

        for result in results {
            let meta = metadata(battery, result, lineage);
            match &result.data {
                Value::Array(trials) => {
                    for trial in trials {
                        table.push(meta.clone(), trial.as_object());
                    }
                },
                Value::Object(trial) => table.push(meta, Some(trial)),
                _ => table.push(meta, None),
            }
        }
        table
    }

    fn push(&mut self, mut row: Row, trial: Option<&Map<String, Value>>) {
        for (key, value) in trial.into_iter().flat_map(flatten_trial) {
            if FIXED_COLUMNS.contains(&key.as_str()) {
                continue;
            }
            self.columns.insert(key.clone());
            if let Some(cell) = cell(value) {
                row.insert(key, cell.into_owned());
            }
        }
        self.rows.push(row);
    }

    /// Keeps only rows of the given experiment tags. Every column stays.
    pub fn retain_tags(&mut self, tags: &[&str]) {
        self.rows.retain(|row| row.get(EXPERIMENT_TAG).is_some_and(|tag| tags.contains(&tag.as_str())));
    }

    #[must_use]
    pub fn columns(&self) -> Vec<&str> {
        self.columns.iter().map(String::as_str).collect()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell of `row` under `column`; `None` when blank.
    #[must_use]
    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        self.rows.get(row)?.get(column).map(String::as_str)
    }

    /// Header row then data rows, tab-delimited, `\r\n`-terminated.
    ///
    /// Fields holding a tab, quote or line break are quoted with inner quotes doubled.
    /// Blank cells are written as empty fields.
    #[must_use]
    pub fn to_tsv(&self) -> String {
        let mut out = String::new();
        write_record(&mut out, self.columns.iter().map(String::as_str));
        for row in &self.rows {
            write_record(
                &mut out,
                self.columns.iter().map(|column| row.get(column).map_or("", String::as_str)),
            );
        }
        out
    }
}

fn metadata(battery: &Battery, result: &ExperimentResult, lineage: &Lineage) -> Row {
    let template = lineage.templates.get(&result.experiment);
    let hit = lineage.hits.get(&result.assignment);

    let mut row = Row::new();
    row.insert("worker_id".to_owned(), result.worker_id.clone());
    row.insert("assignment_id".to_owned(), result.assignment.to_string());
    if let Some(hit) = hit {
        row.insert("hit_id".to_owned(), hit.to_string());
    }
    row.insert("result_id".to_owned(), result.id.to_string());
    row.insert("battery_name".to_owned(), battery.name.clone());
    if let Some(template) = template {
        row.insert("experiment_tag".to_owned(), template.tag.clone());
        row.insert("experiment_name".to_owned(), template.name.clone());
    }
    row.insert("completed".to_owned(), result.completed.to_string());
    row
}

/// Trial entries with a nested `trialdata` object merged in place of the key.
fn flatten_trial(trial: &Map<String, Value>) -> Vec<(String, &Value)> {
    let mut entries = Vec::with_capacity(trial.len());
    for (key, value) in trial {
        match (key.as_str(), value) {
            (TRIALDATA, Value::Object(nested)) => {
                entries.extend(nested.iter().map(|(k, v)| (k.clone(), v)));
            },
            _ => entries.push((key.clone(), value)),
        }
    }
    entries
}

fn cell(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(Cow::Borrowed(s.as_str())),
        Value::Bool(b) => Some(Cow::Owned(b.to_string())),
        Value::Number(n) => Some(Cow::Owned(n.to_string())),
        Value::Array(_) | Value::Object(_) => Some(Cow::Owned(value.to_string())),
    }
}

fn write_record<'a>(out: &mut String, fields: impl Iterator<Item = &'a str>) {
    for (i, field) in fields.enumerate() {
        if i > 0 {
            out.push('\t');
        }
        if field.contains(['\t', '"', '\n', '\r']) {
            out.push('"');
            out.push_str(&field.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(field);
        }
    }
    out.push_str("\r\n");
}
