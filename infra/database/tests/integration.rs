use expdj_database::models::{
    Assignment, Battery, CognitiveAtlasTask, Experiment, ExperimentResult, ExperimentTemplate,
    ExperimentVariable, Hit, Id, User,
};
use expdj_database::{Database, DatabaseError, Fixture, NewCondition, NewTemplate};
use serde_json::json;
use std::io::Write;

fn template(tag: &str) -> NewTemplate {
    NewTemplate {
        template: ExperimentTemplate {
            tag: tag.to_owned(),
            name: tag.to_uppercase(),
            template: "jspsych".to_owned(),
            ..ExperimentTemplate::default()
        },
        ..NewTemplate::default()
    }
}

struct Populated {
    db: Database,
    template: Id,
    experiment: Id,
    battery: Id,
}

/// One battery holding one `stroop` experiment with a single result.
async fn populated() -> Populated {
    let db = Database::ephemeral().await.unwrap();
    let owner = db.insert_user(User { username: "owner".into(), ..User::default() }).await.unwrap();
    let template = db.insert_template(self::template("stroop")).await.unwrap();
    let battery = db.insert_battery(Battery { name: "b".into(), owner, ..Battery::default() }).await.unwrap();
    let experiment = db.place_experiment(battery, template, &[], false, false).await.unwrap();
    let hit = db.insert_hit(Hit { battery, ..Hit::default() }).await.unwrap();
    let assignment = db.insert_assignment(Assignment { hit, ..Assignment::default() }).await.unwrap();
    db.insert_result(ExperimentResult {
        assignment,
        experiment,
        data: json!([{"rt": 1}]),
        ..ExperimentResult::default()
    })
    .await
    .unwrap();
    Populated { db, template, experiment, battery }
}

#[tokio::test]
async fn connect_in_memory_and_health_check() {
    let db = Database::builder()
        .url("mem://")
        .session("test_ns", "test_db")
        .init()
        .await
        .expect("connect to mem://");

    db.health().await.expect("health check");
    assert!(db.templates().await.unwrap().is_empty());
}

#[tokio::test]
async fn missing_parameters_fail_validation() {
    let err = Database::builder().init().await.unwrap_err();
    assert!(matches!(err, DatabaseError::Validation { .. }));
}

#[tokio::test]
async fn inserted_template_is_stamped_and_found_by_tag() {
    let db = Database::ephemeral().await.unwrap();
    let id = db.insert_template(template("stroop")).await.unwrap();

    let stored = db.template(id).await.unwrap().unwrap();
    assert_eq!(stored.tag, "stroop");
    assert!(stored.add_date > 0);
    assert_eq!(db.template_by_tag("stroop").await.unwrap().map(|t| t.id), Some(id));
    assert!(db.template(-1).await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_template_tag_is_a_constraint_error() {
    let db = Database::ephemeral().await.unwrap();
    db.insert_template(template("stroop")).await.unwrap();
    let err = db.insert_template(template("stroop")).await.unwrap_err();

    assert!(matches!(err, DatabaseError::Constraint { .. }));
    assert_eq!(err.status_code(), 409);
    assert_eq!(db.templates().await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_inserts_of_one_tag_commit_once() {
    let db = Database::ephemeral().await.unwrap();
    let (a, b) = tokio::join!(db.insert_template(template("stroop")), db.insert_template(template("stroop")));

    assert_eq!(u8::from(a.is_ok()) + u8::from(b.is_ok()), 1);
    assert_eq!(db.templates().await.unwrap().len(), 1);
}

#[tokio::test]
async fn templates_share_tasks_and_get_their_own_variables() {
    let db = Database::ephemeral().await.unwrap();
    let with_task = |tag: &str| NewTemplate {
        task: Some(CognitiveAtlasTask { name: "Stroop".into(), cog_atlas_id: "tsk_1".into(), ..Default::default() }),
        performance_variable: Some(ExperimentVariable { name: "credit_var".into(), ..Default::default() }),
        ..template(tag)
    };

    let first = db.insert_template(with_task("stroop")).await.unwrap();
    let second = db.insert_template(with_task("stroop2")).await.unwrap();

    let first = db.template(first).await.unwrap().unwrap();
    let second = db.template(second).await.unwrap().unwrap();
    assert!(first.cognitive_atlas_task.is_some());
    assert_eq!(first.cognitive_atlas_task, second.cognitive_atlas_task);
    assert_ne!(first.performance_variable, second.performance_variable);
    let variable = db.variable(first.performance_variable.unwrap()).await.unwrap().unwrap();
    assert_eq!(variable.name, "credit_var");
}

#[tokio::test]
async fn results_are_reached_through_assignments_and_hits() {
    let p = populated().await;
    let results = p.db.results_for_battery(p.battery).await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].data, json!([{"rt": 1}]));
    assert_eq!(p.db.hits_for_battery(p.battery).await.unwrap().len(), 1);
    assert!(p.db.results_for_battery(p.battery + 1).await.unwrap().is_empty());
}

#[tokio::test]
async fn deleting_template_cascades_to_experiments_and_results() {
    let p = populated().await;
    p.db.delete_template(p.template).await.unwrap().unwrap();

    assert!(p.db.experiment(p.experiment).await.unwrap().is_none());
    assert!(p.db.battery(p.battery).await.unwrap().unwrap().experiments.is_empty());
    assert!(p.db.results_for_battery(p.battery).await.unwrap().is_empty());
    assert_eq!(p.db.hits_for_battery(p.battery).await.unwrap().len(), 1);
}

#[tokio::test]
async fn deleting_battery_cascades_to_hits_assignments_results() {
    let p = populated().await;
    p.db.delete_battery(p.battery).await.unwrap().unwrap();

    assert!(p.db.hits_for_battery(p.battery).await.unwrap().is_empty());
    assert!(p.db.results_for_battery(p.battery).await.unwrap().is_empty());
    assert!(p.db.experiment(p.experiment).await.unwrap().is_some());
    assert!(p.db.delete_battery(p.battery).await.unwrap().is_none());
}

#[tokio::test]
async fn last_template_of_a_task_takes_the_task_along() {
    let db = Database::ephemeral().await.unwrap();
    let with_task = |tag: &str| NewTemplate {
        task: Some(CognitiveAtlasTask { name: "t".into(), cog_atlas_id: "tsk_9".into(), ..Default::default() }),
        ..template(tag)
    };
    let a = db.insert_template(with_task("a")).await.unwrap();
    let b = db.insert_template(with_task("b")).await.unwrap();
    let task = db.template(a).await.unwrap().unwrap().cognitive_atlas_task.unwrap();

    db.delete_template(a).await.unwrap();
    assert!(db.task(task).await.unwrap().is_some());

    db.delete_template(b).await.unwrap();
    assert!(db.task(task).await.unwrap().is_none());
    assert!(db.delete_template(b).await.unwrap().is_none());
}

#[tokio::test]
async fn placing_reuses_identical_conditions_and_replaces_same_template() {
    let p = populated().await;
    let condition = NewCondition {
        variable: 1,
        value: Some("1".into()),
        operator: Some("EQUALS".into()),
        amount: Some("0.5".into()),
    };

    let bonus = p.db.place_experiment(p.battery, p.template, &[condition.clone()], true, false).await.unwrap();
    let again = p.db.place_experiment(p.battery, p.template, &[condition.clone()], true, false).await.unwrap();

    assert_eq!(bonus, again);
    assert_ne!(bonus, p.experiment);
    assert_eq!(p.db.battery(p.battery).await.unwrap().unwrap().experiments, vec![bonus]);
    let placed = p.db.experiment(bonus).await.unwrap().unwrap();
    assert_eq!(placed.credit_conditions.len(), 1);
    assert_eq!(p.db.find_condition(&condition).await.unwrap(), Some(placed.credit_conditions[0]));
}

#[tokio::test]
async fn experiment_shared_by_two_batteries_survives_one_detach() {
    let p = populated().await;
    let other = p.db.insert_battery(Battery { name: "other".into(), ..Battery::default() }).await.unwrap();
    p.db.place_experiment(other, p.template, &[], false, false).await.unwrap();

    assert!(!p.db.detach_experiment(p.battery, p.experiment).await.unwrap());
    assert!(p.db.experiment(p.experiment).await.unwrap().is_some());
    assert!(p.db.detach_experiment(other, p.experiment).await.unwrap());
    assert!(p.db.experiment(p.experiment).await.unwrap().is_none());
}

#[tokio::test]
async fn detached_condition_is_deleted_once_unused() {
    let p = populated().await;
    let condition = NewCondition { variable: 3, ..NewCondition::default() };
    let experiment = p.db.place_experiment(p.battery, p.template, &[condition], false, true).await.unwrap();
    let id = p.db.experiment(experiment).await.unwrap().unwrap().credit_conditions[0];

    assert!(p.db.detach_condition(experiment, id).await.unwrap());
    assert!(p.db.condition(id).await.unwrap().is_none());
    assert!(p.db.experiment(experiment).await.unwrap().unwrap().credit_conditions.is_empty());
}

#[tokio::test]
async fn battery_update_keeps_lineup_and_owner() {
    let p = populated().await;
    let mut battery = p.db.battery(p.battery).await.unwrap().unwrap();
    battery.name = "renamed".into();
    battery.maximum_time = Some(30);
    p.db.update_battery(&battery).await.unwrap();

    let stored = p.db.battery(p.battery).await.unwrap().unwrap();
    assert_eq!(stored.name, "renamed");
    assert_eq!(stored.maximum_time, Some(30));
    assert_eq!(stored.experiments, vec![p.experiment]);
    assert_eq!(stored.owner, battery.owner);

    let ghost = Battery { id: 999, ..Battery::default() };
    assert!(matches!(p.db.update_battery(&ghost).await, Err(DatabaseError::NotFound { .. })));
}

#[tokio::test]
async fn duplicate_username_is_a_constraint_error() {
    let db = Database::ephemeral().await.unwrap();
    let id = db.insert_user(User { username: "ada".into(), ..User::default() }).await.unwrap();
    let err = db.insert_user(User { username: "ada".into(), ..User::default() }).await.unwrap_err();

    assert!(matches!(err, DatabaseError::Constraint { .. }));
    assert_eq!(db.users().await.unwrap().iter().map(|u| u.id).collect::<Vec<_>>(), vec![id]);
}

#[tokio::test]
async fn fixture_rows_keep_their_ids_and_counters_move_past_them() {
    let db = Database::ephemeral().await.unwrap();
    db.load_fixture(Fixture {
        experiments: vec![Experiment { id: 7, template: 1, ..Experiment::default() }],
        users: vec![User { username: "gen".into(), ..User::default() }],
        ..Fixture::default()
    })
    .await
    .unwrap();

    assert_eq!(db.users().await.unwrap()[0].id, 1);
    assert!(db.experiment(7).await.unwrap().is_some());
    assert_eq!(db.find_experiment(1, true, false).await.unwrap(), None);
    let battery = db.insert_battery(Battery::default()).await.unwrap();
    let placed = db.place_experiment(battery, 1, &[], true, false).await.unwrap();
    assert_eq!(placed, 8);
}

#[tokio::test]
async fn seed_file_is_loaded_once() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "users": [{{"id": 1, "username": "admin", "is_superuser": true}}],
            "templates": [{{"id": 4, "tag": "stroop", "name": "Stroop", "template": "jspsych"}}]
        }}"#
    )
    .unwrap();

    let db = Database::builder().url("mem://").session("expdj", "seed").seed(Some(file.path())).init().await.unwrap();

    assert!(db.user(1).await.unwrap().unwrap().is_superuser);
    assert_eq!(db.template_by_tag("stroop").await.unwrap().map(|t| t.id), Some(4));
    assert_eq!(db.insert_template(template("ant")).await.unwrap(), 5);
}

#[tokio::test]
async fn seed_with_duplicate_usernames_is_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"users": [{{"username": "a"}}, {{"username": "a"}}]}}"#).unwrap();

    let err = Database::builder()
        .url("mem://")
        .session("expdj", "seed")
        .seed(Some(file.path()))
        .init()
        .await
        .unwrap_err();
    assert!(matches!(err, DatabaseError::Constraint { .. }));
}

#[tokio::test]
async fn missing_seed_file_reports_seed_error() {
    let err = Database::builder()
        .url("mem://")
        .session("expdj", "seed")
        .seed(Some("/nonexistent/seed.json"))
        .init()
        .await
        .unwrap_err();
    assert!(matches!(err, DatabaseError::Seed { .. }));
}
