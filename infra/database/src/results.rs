use crate::error::{DatabaseError, DatabaseErrorExt};
use crate::models::{Assignment, ExperimentResult, Hit, Id, StoredResult};
use crate::{Database, ROW, table, transaction};

impl Database {
    pub async fn hits_for_battery(&self, battery: Id) -> Result<Vec<Hit>, DatabaseError> {
        Ok(self
            .query(format!("SELECT {ROW} FROM hit WHERE battery = $battery ORDER BY id"))
            .bind(("battery", battery))
            .await
            .context("Listing HITs")?
            .take::<Vec<Hit>>(0)?)
    }

    pub async fn assignments_in(&self, ids: &[Id]) -> Result<Vec<Assignment>, DatabaseError> {
        self.select_keys(table::ASSIGNMENT, ids).await
    }

    /// Results reached through assignment, then HIT, then battery. Ascending by id.
    pub async fn results_for_battery(&self, battery: Id) -> Result<Vec<ExperimentResult>, DatabaseError> {
        let stored = self
            .query(format!(
                "{{
                    LET $hits = SELECT VALUE record::id(id) FROM hit WHERE battery = $battery;
                    LET $assignments = SELECT VALUE record::id(id) FROM assignment WHERE hit IN $hits;
                    RETURN SELECT {ROW} FROM experiment_result WHERE assignment IN $assignments ORDER BY id;
                }}"
            ))
            .bind(("battery", battery))
            .await
            .context("Listing battery results")?
            .take::<Vec<StoredResult>>(0)?;
        decode(stored)
    }

    /// Whether any result of `battery` is stored.
    pub async fn has_results(&self, battery: Id) -> Result<bool, DatabaseError> {
        Ok(!self.results_for_battery(battery).await?.is_empty())
    }

    pub async fn insert_hit(&self, mut hit: Hit) -> Result<Id, DatabaseError> {
        hit.id = self.next_id(table::HIT).await?;
        let id = hit.id;
        self.query(transaction(&["INSERT INTO hit $hit"]))
            .bind(("hit", hit))
            .await
            .context("Inserting HIT")?
            .check()
            .map_err(surrealdb::Error::from)?;
        Ok(id)
    }

    pub async fn insert_assignment(&self, mut assignment: Assignment) -> Result<Id, DatabaseError> {
        assignment.id = self.next_id(table::ASSIGNMENT).await?;
        let id = assignment.id;
        self.query(transaction(&["INSERT INTO assignment $assignment"]))
            .bind(("assignment", assignment))
            .await
            .context("Inserting assignment")?
            .check()
            .map_err(surrealdb::Error::from)?;
        Ok(id)
    }

    pub async fn insert_result(&self, mut result: ExperimentResult) -> Result<Id, DatabaseError> {
        result.id = self.next_id(table::RESULT).await?;
        let id = result.id;
        self.query(transaction(&["INSERT INTO experiment_result $result"]))
            .bind(("result", StoredResult::from(&result)))
            .await
            .context("Inserting result")?
            .check()
            .map_err(surrealdb::Error::from)?;
        Ok(id)
    }
}

fn decode(stored: Vec<StoredResult>) -> Result<Vec<ExperimentResult>, DatabaseError> {
    stored
        .into_iter()
        .map(|row| {
            let id = row.id;
            ExperimentResult::try_from(row).context(format!("Decoding result {id}"))
        })
        .collect()
}
