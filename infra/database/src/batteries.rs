use crate::error::{DatabaseError, DatabaseErrorExt};
use crate::models::{Battery, Id};
use crate::{Database, ROW, key, now, table, transaction};
use tracing::info;

impl Database {
    pub async fn battery(&self, id: Id) -> Result<Option<Battery>, DatabaseError> {
        self.select_key(table::BATTERY, id).await
    }

    /// Every battery, ascending by id.
    pub async fn batteries(&self) -> Result<Vec<Battery>, DatabaseError> {
        self.select_all(table::BATTERY).await
    }

    pub async fn batteries_with_experiment(&self, experiment: Id) -> Result<Vec<Battery>, DatabaseError> {
        Ok(self
            .query(format!("SELECT {ROW} FROM battery WHERE experiments CONTAINS $experiment ORDER BY id"))
            .bind(("experiment", experiment))
            .await
            .context("Listing batteries of an experiment")?
            .take::<Vec<Battery>>(0)?)
    }

    /// Stores a new battery under a fresh id, stamping its dates when unset.
    pub async fn insert_battery(&self, mut battery: Battery) -> Result<Id, DatabaseError> {
        battery.id = self.next_id(table::BATTERY).await?;
        let stamp = now();
        if battery.add_date == 0 {
            battery.add_date = stamp;
        }
        if battery.modify_date == 0 {
            battery.modify_date = stamp;
        }
        let id = battery.id;
        self.query(transaction(&["INSERT INTO battery $battery"]))
            .bind(("battery", battery))
            .await
            .context("Inserting battery")?
            .check()
            .map_err(surrealdb::Error::from)?;
        info!(battery = id, "Battery created");
        Ok(id)
    }

    /// Writes the editable fields of `battery` and bumps its modify date.
    ///
    /// # Errors
    /// [`DatabaseError::NotFound`] when the battery is gone.
    pub async fn update_battery(&self, battery: &Battery) -> Result<(), DatabaseError> {
        let missing =
            || DatabaseError::NotFound { message: format!("battery {}", battery.id).into(), context: None };
        let Some(record) = key(table::BATTERY, battery.id) else {
            return Err(missing());
        };
        let updated = self
            .query(transaction(&[format!(
                "UPDATE {record} SET name = $name, description = $description, contributors = $contributors, \
                 active = $active, maximum_time = $maximum_time, number_of_experiments = $number_of_experiments, \
                 bonus_active = $bonus_active, blacklist_active = $blacklist_active, modify_date = $modify_date \
                 RETURN VALUE record::id(id)"
            )]))
            .bind(("name", battery.name.clone()))
            .bind(("description", battery.description.clone()))
            .bind(("contributors", battery.contributors.clone()))
            .bind(("active", battery.active))
            .bind(("maximum_time", battery.maximum_time))
            .bind(("number_of_experiments", battery.number_of_experiments))
            .bind(("bonus_active", battery.bonus_active))
            .bind(("blacklist_active", battery.blacklist_active))
            .bind(("modify_date", now()))
            .await
            .context("Updating battery")?
            .take::<Vec<Id>>(0)?;
        if updated.is_empty() {
            return Err(missing());
        }
        Ok(())
    }

    /// Deletes a battery with its HITs, their assignments, and their results.
    /// Returns the deleted battery.
    pub async fn delete_battery(&self, id: Id) -> Result<Option<Battery>, DatabaseError> {
        let Some(battery) = self.battery(id).await? else {
            return Ok(None);
        };
        self.delete_key(table::BATTERY, id).await?;
        info!(battery = id, name = %battery.name, "Battery deleted");
        Ok(Some(battery))
    }
}
