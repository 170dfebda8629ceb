use crate::error::{DatabaseError, DatabaseErrorExt};
use crate::models::{
    Assignment, Battery, CognitiveAtlasTask, CreditCondition, Experiment, ExperimentResult,
    ExperimentTemplate, ExperimentVariable, Hit, Id, StoredResult, User,
};
use crate::{Database, Record, table, transaction};
use fxhash::FxHashSet;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// Rows to load into the store, grouped by table. This is the shape of the JSON seed file.
///
/// Rows carrying `id = 0` get the next free ids of their table.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Fixture {
    pub users: Vec<User>,
    pub tasks: Vec<CognitiveAtlasTask>,
    pub variables: Vec<ExperimentVariable>,
    pub templates: Vec<ExperimentTemplate>,
    pub conditions: Vec<CreditCondition>,
    pub experiments: Vec<Experiment>,
    pub batteries: Vec<Battery>,
    pub hits: Vec<Hit>,
    pub assignments: Vec<Assignment>,
    pub results: Vec<ExperimentResult>,
}

impl Fixture {
    /// # Errors
    /// * [`DatabaseError::Seed`] if the file cannot be read.
    /// * [`DatabaseError::Serde`] if it is not a valid fixture document.
    pub fn load(path: &Path) -> Result<Self, DatabaseError> {
        let raw = std::fs::read(path).context(path.display().to_string())?;
        let fixture: Self = serde_json::from_slice(&raw).context(format!("Parsing {}", path.display()))?;
        debug!(path = %path.display(), "Seed fixture parsed");
        Ok(fixture)
    }

    fn check(&self) -> Result<(), DatabaseError> {
        let mut tags = FxHashSet::default();
        if let Some(dup) = self.templates.iter().find(|t| !tags.insert(t.tag.as_str())) {
            return Err(DatabaseError::Constraint {
                message: format!("template tag '{}' appears twice", dup.tag).into(),
                context: Some("Seed".into()),
            });
        }
        let mut names = FxHashSet::default();
        if let Some(dup) = self.users.iter().find(|u| !names.insert(u.username.as_str())) {
            return Err(DatabaseError::Constraint {
                message: format!("username '{}' appears twice", dup.username).into(),
                context: Some("Seed".into()),
            });
        }
        Ok(())
    }
}

impl Database {
    /// Loads `fixture` in one transaction.
    ///
    /// # Errors
    /// [`DatabaseError::Constraint`] for repeated tags or usernames, and engine errors for
    /// ids that are negative or already taken.
    pub async fn load_fixture(&self, fixture: Fixture) -> Result<(), DatabaseError> {
        self.apply_fixture(fixture, None).await
    }

    /// Loads the fixture at `path` unless this store was seeded before.
    pub(crate) async fn seed_once(&self, path: &Path) -> Result<(), DatabaseError> {
        let seeded = self
            .query("SELECT VALUE path FROM meta:seed")
            .await
            .context("Checking seed marker")?
            .take::<Vec<String>>(0)?;
        if let Some(previous) = seeded.first() {
            info!(seed = %previous, "Store already seeded");
            return Ok(());
        }
        let fixture = Fixture::load(path)?;
        self.apply_fixture(fixture, Some(path.display().to_string())).await
    }

    async fn apply_fixture(&self, mut fixture: Fixture, marker: Option<String>) -> Result<(), DatabaseError> {
        fixture.check()?;

        let mut statements = Vec::new();
        macro_rules! number {
            ($($field:ident => $table:expr),+ $(,)?) => {
                $(
                    if let Some(counter) = self.number($table, &mut fixture.$field).await? {
                        statements.push(format!("INSERT INTO {} ${}", $table, stringify!($field)));
                        statements.push(counter);
                    }
                )+
            };
        }
        number!(
            users => table::USER,
            tasks => table::TASK,
            variables => table::VARIABLE,
            templates => table::TEMPLATE,
            conditions => table::CONDITION,
            experiments => table::EXPERIMENT,
            batteries => table::BATTERY,
            hits => table::HIT,
            assignments => table::ASSIGNMENT,
            results => table::RESULT,
        );
        if marker.is_some() {
            statements.push("UPSERT meta:seed SET path = $marker".to_owned());
        }
        if statements.is_empty() {
            return Ok(());
        }

        let results: Vec<StoredResult> = fixture.results.iter().map(StoredResult::from).collect();
        let counts = (fixture.templates.len(), fixture.batteries.len(), results.len());
        self.query(transaction(&statements))
            .bind(("users", fixture.users))
            .bind(("tasks", fixture.tasks))
            .bind(("variables", fixture.variables))
            .bind(("templates", fixture.templates))
            .bind(("conditions", fixture.conditions))
            .bind(("experiments", fixture.experiments))
            .bind(("batteries", fixture.batteries))
            .bind(("hits", fixture.hits))
            .bind(("assignments", fixture.assignments))
            .bind(("results", results))
            .bind(("marker", marker))
            .await
            .context("Loading fixture")?
            .check()
            .map_err(surrealdb::Error::from)
            .context("Loading fixture")?;

        info!(templates = counts.0, batteries = counts.1, results = counts.2, "Fixture loaded");
        Ok(())
    }

    /// Gives rows without an id the next free ids of `table` and returns the statement that
    /// moves its counter past every loaded id. `None` when there are no rows.
    async fn number<T: Record>(&self, table: &str, rows: &mut [T]) -> Result<Option<String>, DatabaseError> {
        if rows.is_empty() {
            return Ok(None);
        }
        if let Some(bad) = rows.iter().find(|row| row.id() < 0) {
            return Err(DatabaseError::Validation {
                message: format!("{table} id {} is negative", bad.id()).into(),
                context: Some("Seed".into()),
            });
        }
        let current: Id = self
            .query(format!("SELECT VALUE seq FROM counter:{table}"))
            .await
            .context(format!("Reading {table} counter"))?
            .take::<Vec<Id>>(0)?
            .into_iter()
            .next()
            .unwrap_or_default();

        let mut last = rows.iter().map(Record::id).fold(current, Id::max);
        for row in rows.iter_mut().filter(|row| row.id() == 0) {
            last += 1;
            row.set_id(last);
        }
        Ok(Some(format!("UPSERT counter:{table} SET seq = {last}")))
    }
}
