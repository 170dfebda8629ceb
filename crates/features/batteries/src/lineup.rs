//! Placing experiments into batteries and configuring their credit conditions.

use crate::credits::update_credits;
use crate::error::BatteriesError;
use crate::forms::credit_variable_ids;
use expdj_kernel::database::models::{Battery, ExperimentTemplate, ExperimentVariable, Id};
use expdj_kernel::database::{Database, DatabaseError, NewCondition};
use expdj_kernel::forms::FormData;
use fxhash::{FxHashMap, FxHashSet};
use serde_json::{Map, Value};
use tracing::{debug, info};

/// Templates not yet placed in `battery`, plus a tag-keyed lookup of those templates with
/// their performance and rejection variables expanded.
///
/// # Errors
/// Record store failures.
pub async fn addable_templates(
    database: &Database,
    battery: &Battery,
) -> Result<(Vec<ExperimentTemplate>, Map<String, Value>), DatabaseError> {
    let placed: FxHashSet<Id> =
        database.experiments_in(&battery.experiments).await?.into_iter().map(|e| e.template).collect();
    let templates: Vec<ExperimentTemplate> =
        database.templates().await?.into_iter().filter(|t| !placed.contains(&t.id)).collect();

    let variable_ids: Vec<Id> = templates
        .iter()
        .flat_map(|t| [t.performance_variable, t.rejection_variable])
        .flatten()
        .collect();
    let variables: FxHashMap<Id, ExperimentVariable> =
        database.variables_in(&variable_ids).await?.into_iter().map(|v| (v.id, v)).collect();

    let by_tag = expand_variables(&templates, &variables);
    Ok((templates, by_tag))
}

fn expand_variables(templates: &[ExperimentTemplate], variables: &FxHashMap<Id, ExperimentVariable>) -> Map<String, Value> {
    let mut by_tag = Map::new();
    for template in templates {
        let mut entry = serde_json::to_value(template).unwrap_or_default();
        if let Value::Object(fields) = &mut entry {
            for (key, variable) in [
                ("performance_variable", template.performance_variable),
                ("rejection_variable", template.rejection_variable),
            ] {
                if let Some(variable) = variable.and_then(|id| variables.get(&id)) {
                    fields.insert(key.to_owned(), serde_json::to_value(variable).unwrap_or_default());
                }
            }
        }
        by_tag.insert(template.tag.clone(), entry);
    }
    by_tag
}

/// Creates (or reuses) the experiment described by a save form and puts it in the battery,
/// replacing any experiment built on the same template.
///
/// The form names the template in `experiment`. Each variable id found in the other keys
/// gets a credit condition from `val<id>`, `oper<id>` and `amt<id>`; naming the template's
/// performance or rejection variable switches bonus or rejection on. Nothing is written
/// until the whole form has been checked.
///
/// # Errors
/// [`BatteriesError::MissingField`] or [`BatteriesError::InvalidField`] for a missing or
/// malformed `experiment`, [`BatteriesError::UnknownRecord`] for an unknown battery,
/// template or variable.
pub async fn save_experiment(database: &Database, battery: Id, form: &FormData) -> Result<Id, BatteriesError> {
    if database.battery(battery).await?.is_none() {
        return Err(BatteriesError::unknown(format!("battery {battery}")));
    }
    let raw = form.get("experiment").ok_or_else(|| BatteriesError::MissingField {
        message: "experiment".into(),
        context: None,
    })?;
    let template_id: Id = raw.trim().parse().map_err(|_| BatteriesError::InvalidField {
        message: format!("experiment '{raw}' is not an id").into(),
        context: None,
    })?;
    let template = database
        .template(template_id)
        .await?
        .ok_or_else(|| BatteriesError::unknown(format!("experiment template {template_id}")))?;

    let wanted = credit_variable_ids(form.keys());
    let known: FxHashSet<Id> = database.variables_in(&wanted).await?.into_iter().map(|v| v.id).collect();

    let mut include_bonus = false;
    let mut include_catch = false;
    let mut conditions = Vec::with_capacity(wanted.len());
    for variable in wanted {
        if template.performance_variable == Some(variable) {
            include_bonus = true;
        }
        if template.rejection_variable == Some(variable) {
            include_catch = true;
        }
        if !known.contains(&variable) {
            return Err(BatteriesError::unknown(format!("experiment variable {variable}")));
        }
        let field = |prefix: &str| form.get(&format!("{prefix}{variable}")).map(ToOwned::to_owned);
        conditions.push(NewCondition { variable, value: field("val"), operator: field("oper"), amount: field("amt") });
    }

    let experiment =
        database.place_experiment(battery, template_id, &conditions, include_bonus, include_catch).await?;
    info!(battery, experiment, tag = %template.tag, include_bonus, include_catch, "Experiment saved to battery");
    Ok(experiment)
}

/// Drops `experiment` from `battery` and deletes it once no battery references it.
/// Returns whether the experiment record was deleted.
///
/// # Errors
/// Record store failures.
pub async fn remove_experiment(database: &Database, battery: Id, experiment: Id) -> Result<bool, DatabaseError> {
    database.detach_experiment(battery, experiment).await
}

/// Detaches `condition` from `experiment`, deletes it when no experiment uses it, and
/// re-evaluates the experiment's credit switches. Returns whether the condition was deleted.
///
/// # Errors
/// Record store failures.
pub async fn remove_condition(database: &Database, experiment: Id, condition: Id) -> Result<bool, DatabaseError> {
    let orphaned = database.detach_condition(experiment, condition).await?;
    if update_credits(database, experiment).await? {
        debug!(experiment, condition, "Switches follow the removed condition");
    }
    Ok(orphaned)
}
