//! Keeps bonus and rejection switches consistent with an experiment's credit conditions.

use expdj_kernel::database::models::{CreditCondition, Experiment, ExperimentTemplate, Id};
use expdj_kernel::database::{Database, DatabaseError};
use tracing::debug;

/// Switches `experiment` keeps: `include_bonus` goes off when none of `conditions` targets
/// the template's performance variable, and `include_catch` likewise for the rejection
/// variable. A switch is never turned on.
#[must_use]
pub fn credit_switches(
    experiment: &Experiment,
    template: &ExperimentTemplate,
    conditions: &[CreditCondition],
) -> (bool, bool) {
    let targets = |variable: Option<Id>| {
        variable.is_some_and(|variable| {
            conditions
                .iter()
                .filter(|condition| experiment.credit_conditions.contains(&condition.id))
                .any(|condition| condition.variable == variable)
        })
    };
    (
        experiment.include_bonus && targets(template.performance_variable),
        experiment.include_catch && targets(template.rejection_variable),
    )
}

/// Re-evaluates the stored switches of `experiment`. Returns whether anything changed.
///
/// # Errors
/// Record store failures.
pub async fn update_credits(database: &Database, experiment: Id) -> Result<bool, DatabaseError> {
    let Some(current) = database.experiment(experiment).await? else {
        return Ok(false);
    };
    let Some(template) = database.template(current.template).await? else {
        return Ok(false);
    };
    let conditions = database.conditions_in(&current.credit_conditions).await?;

    let (include_bonus, include_catch) = credit_switches(&current, &template, &conditions);
    if (include_bonus, include_catch) == (current.include_bonus, current.include_catch) {
        return Ok(false);
    }
    database.set_credit_switches(experiment, include_bonus, include_catch).await?;
    debug!(experiment, include_bonus, include_catch, "Credit switches updated");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template() -> ExperimentTemplate {
        ExperimentTemplate {
            tag: "stroop".into(),
            performance_variable: Some(1),
            rejection_variable: Some(2),
            ..Default::default()
        }
    }

    fn setup(conditions_on: &[Id]) -> (Experiment, Vec<CreditCondition>) {
        let conditions: Vec<CreditCondition> = conditions_on
            .iter()
            .zip(10..)
            .map(|(variable, id)| CreditCondition { id, variable: *variable, ..Default::default() })
            .collect();
        let experiment = Experiment {
            id: 1,
            template: 1,
            include_bonus: true,
            include_catch: true,
            credit_conditions: conditions.iter().map(|c| c.id).collect(),
        };
        (experiment, conditions)
    }

    #[test]
    fn switches_survive_while_conditions_exist() {
        let (experiment, conditions) = setup(&[1, 2]);
        assert_eq!(credit_switches(&experiment, &template(), &conditions), (true, true));
    }

    #[test]
    fn missing_condition_turns_its_switch_off() {
        let (experiment, conditions) = setup(&[2]);
        assert_eq!(credit_switches(&experiment, &template(), &conditions), (false, true));
    }

    #[test]
    fn switches_are_never_turned_on() {
        let (mut experiment, conditions) = setup(&[1, 2]);
        experiment.include_bonus = false;
        assert_eq!(credit_switches(&experiment, &template(), &conditions), (false, true));
    }

    #[test]
    fn detached_conditions_do_not_count() {
        let (mut experiment, conditions) = setup(&[1, 2]);
        experiment.credit_conditions.retain(|id| *id != conditions[0].id);
        assert_eq!(credit_switches(&experiment, &template(), &conditions), (false, true));
    }

    #[tokio::test]
    async fn unknown_experiment_is_ignored() {
        let database = Database::ephemeral().await.unwrap();
        assert!(!update_credits(&database, 42).await.unwrap());
    }
}
