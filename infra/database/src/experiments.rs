use crate::error::{DatabaseError, DatabaseErrorExt};
use crate::models::{CreditCondition, Experiment, Id};
use crate::{Database, key, now, table, transaction};
use tracing::debug;

/// Credit condition fields submitted for one variable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewCondition {
    pub variable: Id,
    pub value: Option<String>,
    pub operator: Option<String>,
    pub amount: Option<String>,
}

impl Database {
    pub async fn experiment(&self, id: Id) -> Result<Option<Experiment>, DatabaseError> {
        self.select_key(table::EXPERIMENT, id).await
    }

    pub async fn experiments_in(&self, ids: &[Id]) -> Result<Vec<Experiment>, DatabaseError> {
        self.select_keys(table::EXPERIMENT, ids).await
    }

    pub async fn condition(&self, id: Id) -> Result<Option<CreditCondition>, DatabaseError> {
        self.select_key(table::CONDITION, id).await
    }

    pub async fn conditions_in(&self, ids: &[Id]) -> Result<Vec<CreditCondition>, DatabaseError> {
        self.select_keys(table::CONDITION, ids).await
    }

    /// Condition matching all four fields of `wanted`.
    pub async fn find_condition(&self, wanted: &NewCondition) -> Result<Option<Id>, DatabaseError> {
        let found = self
            .query(
                "SELECT VALUE record::id(id) FROM credit_condition WHERE variable = $variable \
                 AND `value` = $outcome AND operator = $operator AND amount = $amount ORDER BY id LIMIT 1",
            )
            .bind(("variable", wanted.variable))
            .bind(("outcome", wanted.value.clone()))
            .bind(("operator", wanted.operator.clone()))
            .bind(("amount", wanted.amount.clone()))
            .await
            .context("Looking up credit condition")?
            .take::<Vec<Id>>(0)?;
        Ok(found.into_iter().next())
    }

    /// First experiment built on `template` with exactly these switches.
    pub async fn find_experiment(
        &self,
        template: Id,
        include_bonus: bool,
        include_catch: bool,
    ) -> Result<Option<Id>, DatabaseError> {
        let found = self
            .query(
                "SELECT VALUE record::id(id) FROM experiment WHERE template = $template \
                 AND include_bonus = $include_bonus AND include_catch = $include_catch ORDER BY id LIMIT 1",
            )
            .bind(("template", template))
            .bind(("include_bonus", include_bonus))
            .bind(("include_catch", include_catch))
            .await
            .context("Looking up experiment")?
            .take::<Vec<Id>>(0)?;
        Ok(found.into_iter().next())
    }

    pub async fn set_credit_switches(
        &self,
        experiment: Id,
        include_bonus: bool,
        include_catch: bool,
    ) -> Result<(), DatabaseError> {
        let Some(record) = key(table::EXPERIMENT, experiment) else {
            return Ok(());
        };
        self.query(transaction(&[format!(
            "UPDATE {record} SET include_bonus = $include_bonus, include_catch = $include_catch"
        )]))
        .bind(("include_bonus", include_bonus))
        .bind(("include_catch", include_catch))
        .await
        .context("Updating credit switches")?
        .check()
        .map_err(surrealdb::Error::from)?;
        Ok(())
    }

    /// Puts the experiment built on `template` with these switches into `battery`, in
    /// place of any experiment of the same template, and returns its id.
    ///
    /// Conditions and the experiment are reused when identical ones exist and created
    /// otherwise. The experiment's condition list is replaced by `conditions`.
    pub async fn place_experiment(
        &self,
        battery: Id,
        template: Id,
        conditions: &[NewCondition],
        include_bonus: bool,
        include_catch: bool,
    ) -> Result<Id, DatabaseError> {
        let Some(battery_key) = key(table::BATTERY, battery) else {
            return Err(DatabaseError::NotFound { message: format!("battery {battery}").into(), context: None });
        };

        let mut statements = Vec::new();
        let mut created = Vec::new();
        let mut condition_ids = Vec::with_capacity(conditions.len());
        for wanted in conditions {
            let id = match self.find_condition(wanted).await? {
                Some(id) => id,
                None => {
                    let id = self.next_id(table::CONDITION).await?;
                    created.push(CreditCondition {
                        id,
                        variable: wanted.variable,
                        operator: wanted.operator.clone(),
                        value: wanted.value.clone(),
                        amount: wanted.amount.clone(),
                    });
                    id
                },
            };
            condition_ids.push(id);
        }
        if !created.is_empty() {
            statements.push("INSERT INTO credit_condition $conditions".to_owned());
        }

        let (experiment, fresh) = match self.find_experiment(template, include_bonus, include_catch).await? {
            Some(id) => {
                statements.push(format!("UPDATE experiment:{id} SET credit_conditions = $credit_conditions"));
                (id, None)
            },
            None => {
                let id = self.next_id(table::EXPERIMENT).await?;
                statements.push("INSERT INTO experiment $experiment".to_owned());
                let fresh = Experiment {
                    id,
                    template,
                    include_bonus,
                    include_catch,
                    credit_conditions: condition_ids.clone(),
                };
                (id, Some(fresh))
            },
        };

        statements.push(format!(
            "LET $same_template = SELECT VALUE record::id(id) FROM experiment WHERE template = {template}"
        ));
        statements.push(format!(
            "UPDATE {battery_key} SET experiments = array::append(array::complement(experiments, $same_template), \
             {experiment}), modify_date = $modify_date"
        ));

        self.query(transaction(&statements))
            .bind(("conditions", created))
            .bind(("credit_conditions", condition_ids))
            .bind(("experiment", fresh))
            .bind(("modify_date", now()))
            .await
            .context(format!("Placing experiment in battery {battery}"))?
            .check()
            .map_err(surrealdb::Error::from)?;
        debug!(battery, experiment, template, "Experiment placed");
        Ok(experiment)
    }

    /// Drops `experiment` from `battery` and deletes it once no battery references it.
    /// Returns whether the experiment record was deleted.
    pub async fn detach_experiment(&self, battery: Id, experiment: Id) -> Result<bool, DatabaseError> {
        let (Some(battery_key), Some(experiment_key)) =
            (key(table::BATTERY, battery), key(table::EXPERIMENT, experiment))
        else {
            return Ok(false);
        };
        let deleted = self
            .query(transaction(&[format!(
                "{{
                    UPDATE {battery_key} SET experiments -= {experiment};
                    LET $orphaned = array::len(SELECT VALUE id FROM battery WHERE experiments CONTAINS {experiment}) = 0;
                    IF $orphaned {{ DELETE {experiment_key} }};
                    RETURN $orphaned;
                }}"
            )]))
            .await
            .context(format!("Detaching experiment {experiment}"))?
            .take::<Option<bool>>(0)?
            .unwrap_or_default();
        if deleted {
            debug!(experiment, "Orphaned experiment deleted");
        }
        Ok(deleted)
    }

    /// Detaches `condition` from `experiment` and deletes it when no experiment uses it.
    /// Returns whether the condition was deleted.
    pub async fn detach_condition(&self, experiment: Id, condition: Id) -> Result<bool, DatabaseError> {
        let (Some(experiment_key), Some(condition_key)) =
            (key(table::EXPERIMENT, experiment), key(table::CONDITION, condition))
        else {
            return Ok(false);
        };
        let deleted = self
            .query(transaction(&[format!(
                "{{
                    UPDATE {experiment_key} SET credit_conditions -= {condition};
                    LET $orphaned = array::len(SELECT VALUE id FROM experiment WHERE credit_conditions CONTAINS {condition}) = 0;
                    IF $orphaned {{ DELETE {condition_key} }};
                    RETURN $orphaned;
                }}"
            )]))
            .await
            .context(format!("Detaching condition {condition}"))?
            .take::<Option<bool>>(0)?
            .unwrap_or_default();
        Ok(deleted)
    }
}
