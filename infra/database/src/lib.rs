//! # Record Store
//!
//! [SurrealDB](https://surrealdb.com) tables for experiment templates, batteries and their
//! results, reached through the `any` engine: `mem://` for tests and throwaway runs,
//! `rocksdb://` (feature `storage-rocksdb`) for a persistent store.
//!
//! ## Reads and writes
//! Reads are plain `SELECT`s. Every write is one SurrealQL script wrapped in
//! `BEGIN TRANSACTION` / `COMMIT TRANSACTION`, so a failing request leaves no partial
//! writes. Deletions cascade through the table events of `schema.surql`.
//!
//! ## Example
//!
//! ```rust
//! use expdj_database::{Database, DatabaseError, models::User};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), DatabaseError> {
//!     let db = Database::builder().url("mem://").session("expdj", "core").init().await?;
//!     let id = db.insert_user(User { username: "ada".into(), ..User::default() }).await?;
//!     assert!(db.user(id).await?.is_some());
//!     Ok(())
//! }
//! ```

mod batteries;
mod error;
mod experiments;
pub mod models;
mod results;
mod schema;
mod seed;
mod templates;
mod users;

pub use error::{DatabaseError, DatabaseErrorExt};
pub use seed::Fixture;
pub use templates::NewTemplate;
pub use experiments::NewCondition;

use models::Id;
use std::ops::Deref;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use surrealdb::Surreal;
use surrealdb::engine::any::{Any, connect};
use surrealdb::opt::auth::Root;
use surrealdb::types::SurrealValue;
use tracing::{info, instrument, warn};

/// Table names.
pub(crate) mod table {
    pub(crate) const USER: &str = "user";
    pub(crate) const TASK: &str = "cognitive_atlas_task";
    pub(crate) const VARIABLE: &str = "experiment_variable";
    pub(crate) const TEMPLATE: &str = "experiment_template";
    pub(crate) const CONDITION: &str = "credit_condition";
    pub(crate) const EXPERIMENT: &str = "experiment";
    pub(crate) const BATTERY: &str = "battery";
    pub(crate) const HIT: &str = "hit";
    pub(crate) const ASSIGNMENT: &str = "assignment";
    pub(crate) const RESULT: &str = "experiment_result";
}

/// Projection that reports the integer key as `id`.
pub(crate) const ROW: &str = "*, record::id(id) AS id";

/// Current time as unix seconds.
#[must_use]
pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// A row keyed by its integer record id.
pub trait Record {
    fn id(&self) -> Id;
    fn set_id(&mut self, id: Id);
}

macro_rules! impl_record {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Record for $ty {
                #[inline]
                fn id(&self) -> Id {
                    self.id
                }

                #[inline]
                fn set_id(&mut self, id: Id) {
                    self.id = id;
                }
            }
        )+
    };
}

impl_record!(
    models::User,
    models::CognitiveAtlasTask,
    models::ExperimentVariable,
    models::ExperimentTemplate,
    models::CreditCondition,
    models::Experiment,
    models::Battery,
    models::Hit,
    models::Assignment,
    models::ExperimentResult,
);

/// Record key `table:id`. Ids below 1 were never issued and have no key.
pub(crate) fn key(table: &str, id: Id) -> Option<String> {
    (id > 0).then(|| format!("{table}:{id}"))
}

/// Wraps `statements` in a single transaction.
pub(crate) fn transaction<S: AsRef<str>>(statements: &[S]) -> String {
    let mut script = String::from("BEGIN TRANSACTION;\n");
    for statement in statements {
        script.push_str(statement.as_ref().trim_end_matches(';'));
        script.push_str(";\n");
    }
    script.push_str("COMMIT TRANSACTION;");
    script
}

/// Inner state of the [`Database`] wrapper.
#[derive(Debug)]
pub struct DatabaseInner {
    instance: Surreal<Any>,
    ns: String,
    db: String,
}

impl Drop for DatabaseInner {
    fn drop(&mut self) {
        info!(ns = %self.ns, db = %self.db, "SurrealDB session handle dropped");
    }
}

/// `SurrealDB` client wrapper with the record store's queries. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

impl Database {
    /// Creates a new [`DatabaseBuilder`].
    pub fn builder() -> DatabaseBuilder {
        DatabaseBuilder::new()
    }

    /// A fresh, empty in-memory store.
    ///
    /// # Errors
    /// See [`DatabaseBuilder::init`].
    pub async fn ephemeral() -> Result<Self, DatabaseError> {
        Self::builder().url("mem://").session("expdj", "ephemeral").init().await
    }

    /// Allocates the next integer key of `table`.
    pub(crate) async fn next_id(&self, table: &str) -> Result<Id, DatabaseError> {
        self.query(format!("UPSERT ONLY counter:{table} SET seq += 1 RETURN VALUE seq"))
            .await
            .context(format!("Allocating {table} id"))?
            .take::<Option<Id>>(0)?
            .ok_or_else(|| DatabaseError::Internal {
                message: "id counter returned nothing".into(),
                context: Some(table.to_owned().into()),
            })
    }

    /// Rows of `table` with the given keys, in the order of `ids`. Unknown ids are skipped.
    pub(crate) async fn select_keys<T>(&self, table: &str, ids: &[Id]) -> Result<Vec<T>, DatabaseError>
    where
        T: SurrealValue + Record,
    {
        let targets: Vec<String> = ids.iter().filter_map(|id| key(table, *id)).collect();
        if targets.is_empty() {
            return Ok(Vec::new());
        }
        let mut rows = self
            .query(format!("SELECT {ROW} FROM {}", targets.join(", ")))
            .await
            .context(format!("Selecting {table} rows"))?
            .take::<Vec<T>>(0)?;

        let mut ordered = Vec::with_capacity(rows.len());
        for id in ids {
            if let Some(pos) = rows.iter().position(|row| row.id() == *id) {
                ordered.push(rows.swap_remove(pos));
            }
        }
        Ok(ordered)
    }

    /// The row of `table` under `id`.
    pub(crate) async fn select_key<T>(&self, table: &str, id: Id) -> Result<Option<T>, DatabaseError>
    where
        T: SurrealValue + Record,
    {
        Ok(self.select_keys(table, &[id]).await?.into_iter().next())
    }

    /// Every row of `table`, ascending by key.
    pub(crate) async fn select_all<T: SurrealValue>(&self, table: &str) -> Result<Vec<T>, DatabaseError> {
        Ok(self
            .query(format!("SELECT {ROW} FROM {table} ORDER BY id"))
            .await
            .context(format!("Listing {table}"))?
            .take::<Vec<T>>(0)?)
    }

    /// Deletes the row of `table` under `id` and lets the table events cascade.
    pub(crate) async fn delete_key(&self, table: &str, id: Id) -> Result<(), DatabaseError> {
        let Some(key) = key(table, id) else {
            return Ok(());
        };
        self.query(transaction(&[format!("DELETE {key}")]))
            .await
            .context(format!("Deleting {key}"))?
            .check()
            .map_err(surrealdb::Error::from)?;
        Ok(())
    }
}

impl Deref for Database {
    type Target = Surreal<Any>;

    fn deref(&self) -> &Self::Target {
        &self.inner.instance
    }
}

/// A fluent builder for configuring and establishing a `SurrealDB` connection.
///
/// The connection URL, namespace and database name must be provided upfront.
#[must_use = "builders do nothing unless you call .init()"]
#[derive(Debug, Default)]
pub struct DatabaseBuilder {
    url: Option<String>,
    ns: Option<String>,
    db: Option<String>,
    auth: Option<(String, String)>,
    seed: Option<PathBuf>,
}

impl DatabaseBuilder {
    /// Creates a new [`DatabaseBuilder`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the connection URL.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the namespace and database name.
    pub fn session(mut self, namespace: impl Into<String>, database: impl Into<String>) -> Self {
        self.ns = Some(namespace.into());
        self.db = Some(database.into());
        self
    }

    /// Add root credentials to the connection.
    pub fn auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = Some((username.into(), password.into()));
        self
    }

    /// JSON [`Fixture`] loaded into a store that has never been seeded.
    pub fn seed(mut self, path: Option<impl Into<PathBuf>>) -> Self {
        self.seed = path.map(Into::into);
        self
    }

    /// Consumes the builder and establishes the connection.
    ///
    /// # Process
    /// 1. **Validation**: URL, namespace and database name must be set.
    /// 2. **Resilience**: up to 3 health checks, retried with exponential backoff from 500ms.
    /// 3. **Authentication**: signs in as a Root user when credentials were given.
    /// 4. **Schema**: defines tables, unique indexes and the cascade events.
    /// 5. **Seed**: loads the fixture once per store.
    ///
    /// # Errors
    /// * [`DatabaseError::Validation`] if required parameters are missing.
    /// * [`DatabaseError::Connection`] if the engine fails to start or remains unhealthy.
    /// * [`DatabaseError::Auth`] if the provided credentials are rejected.
    /// * [`DatabaseError::Surreal`] if session activation or the schema fails.
    /// * [`DatabaseError::Seed`], [`DatabaseError::Serde`] or [`DatabaseError::Constraint`]
    ///   for a bad fixture.
    #[instrument(skip(self), fields(url = self.url, ns = self.ns, db = self.db, seed = ?self.seed))]
    pub async fn init(self) -> Result<Database, DatabaseError> {
        let url = self.url.ok_or(DatabaseError::Validation {
            message: "URL is required".into(),
            context: None,
        })?;
        let ns = self.ns.ok_or(DatabaseError::Validation {
            message: "Namespace is required".into(),
            context: None,
        })?;
        let db = self.db.ok_or(DatabaseError::Validation {
            message: "Database is required".into(),
            context: None,
        })?;

        let instance = connect(&url).await.map_err(|e| DatabaseError::Connection {
            message: e.to_string().into(),
            context: Some("Initializing engine".into()),
        })?;

        let mut delay = Duration::from_millis(500);
        for attempt in 1..=3 {
            if instance.health().await.is_ok() {
                break;
            }
            if attempt == 3 {
                return Err(DatabaseError::Connection {
                    message: "Unhealthy after retries".into(),
                    context: Some(url.into()),
                });
            }
            warn!(attempt, ?delay, "Database not ready, retrying...");
            tokio::time::sleep(delay).await;
            delay *= 2;
        }

        if let Some((username, password)) = self.auth {
            instance.signin(Root { username, password }).await.map_err(|e| DatabaseError::Auth {
                message: e.to_string().into(),
                context: Some(url.into()),
            })?;
        }

        instance.use_ns(&ns).use_db(&db).await.context("Activating session")?;

        let version =
            instance.version().await.map_or_else(|_| "unknown".to_owned(), |v| v.to_string());
        info!(namespace = %ns, database = %db, %version, "SurrealDB connection established");

        schema::apply(&instance).await?;

        let database = Database { inner: Arc::new(DatabaseInner { instance, ns, db }) };
        if let Some(path) = self.seed {
            database.seed_once(&path).await?;
        }
        Ok(database)
    }
}
