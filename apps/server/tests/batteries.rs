mod common;

use axum::http::StatusCode;
use common::{ADMIN, CONTRIBUTOR, OWNER, STRANGER, TestApp, spawn};
use expdj::kernel::database::Fixture;
use expdj::kernel::database::models::{
    Assignment, Battery, CreditCondition, Experiment, ExperimentResult, ExperimentTemplate, ExperimentVariable, Hit,
    Id,
};
use serde_json::json;

const PERFORMANCE: Id = 1;
const REJECTION: Id = 2;
const STROOP: Id = 1;
const FLANKER: Id = 2;
const PILOT: Id = 1;
const CONDITION: Id = 1;
const EXPERIMENT: Id = 1;

/// Two templates sharing a performance and a rejection variable, and one battery
/// owned by `OWNER` with `CONTRIBUTOR` on board.
fn catalog(fixture: &mut Fixture) {
    for (id, name) in [(PERFORMANCE, "credit_var"), (REJECTION, "catch_var")] {
        fixture.variables.push(ExperimentVariable { id, name: name.into(), ..Default::default() });
    }
    for (id, tag) in [(STROOP, "stroop"), (FLANKER, "flanker")] {
        fixture.templates.push(ExperimentTemplate {
            id,
            tag: tag.into(),
            name: format!("{tag} task"),
            performance_variable: Some(PERFORMANCE),
            rejection_variable: Some(REJECTION),
            ..Default::default()
        });
    }
    fixture.batteries.push(Battery {
        id: PILOT,
        name: "Pilot".into(),
        owner: OWNER,
        contributors: vec![CONTRIBUTOR],
        ..Battery::default()
    });
}

/// `catalog` plus a stroop experiment with a bonus condition placed in the battery.
fn placed(fixture: &mut Fixture) {
    catalog(fixture);
    fixture.conditions.push(CreditCondition {
        id: CONDITION,
        variable: PERFORMANCE,
        operator: Some("EQUALS".into()),
        value: Some("1".into()),
        amount: Some("0.5".into()),
    });
    fixture.experiments.push(Experiment {
        id: EXPERIMENT,
        template: STROOP,
        include_bonus: true,
        include_catch: false,
        credit_conditions: vec![CONDITION],
    });
    for battery in &mut fixture.batteries {
        battery.experiments.push(EXPERIMENT);
    }
}

/// `placed` plus one HIT with one assignment holding one result.
fn with_results(fixture: &mut Fixture) {
    placed(fixture);
    fixture.hits.push(Hit { id: 1, battery: PILOT, title: "Pilot HIT".into(), ..Default::default() });
    fixture.assignments.push(Assignment { id: 1, hit: 1, worker_id: "W1".into(), ..Default::default() });
    fixture.results.push(ExperimentResult {
        id: 1,
        assignment: 1,
        experiment: EXPERIMENT,
        worker_id: "W1".into(),
        ..Default::default()
    });
}

async fn battery(app: &TestApp) -> Battery {
    app.db().battery(PILOT).await.unwrap().unwrap()
}

#[tokio::test]
async fn lists_all_and_by_owner() {
    let app = spawn(catalog).await;

    let all = app.get("/batteries", STRANGER).await.json();
    assert_eq!(all["template"], "all_batteries.html");
    assert_eq!(all["context"]["batteries"].as_array().unwrap().len(), 1);

    let owned = app.get(&format!("/users/{OWNER}/batteries"), STRANGER).await.json();
    assert_eq!(owned["context"]["batteries"][0]["name"], "Pilot");
    let none = app.get(&format!("/users/{STRANGER}/batteries"), STRANGER).await.json();
    assert!(none["context"]["batteries"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn view_reports_permissions_and_results() {
    let app = spawn(with_results).await;

    assert_eq!(app.get("/batteries/9", OWNER).await.status, StatusCode::NOT_FOUND);

    let as_contributor = app.get(&format!("/batteries/{PILOT}"), CONTRIBUTOR).await.json();
    assert_eq!(as_contributor["template"], "battery_details.html");
    assert_eq!(as_contributor["context"]["edit_permission"], true);
    assert_eq!(as_contributor["context"]["has_results"], true);
    assert_eq!(as_contributor["context"]["hits"][0]["title"], "Pilot HIT");

    let as_stranger = app.get(&format!("/batteries/{PILOT}"), STRANGER).await.json();
    assert_eq!(as_stranger["context"]["delete_permission"], false);
}

#[tokio::test]
async fn add_redirects_to_the_list() {
    let app = spawn(catalog).await;
    let reply = app.get("/batteries/add", OWNER).await;
    assert_eq!(reply.status, StatusCode::SEE_OTHER);
    assert_eq!(reply.location(), "/batteries");
}

#[tokio::test]
async fn new_battery_is_owned_by_its_creator() {
    let app = spawn(catalog).await;

    let form = app.get("/batteries/new", STRANGER).await.json();
    assert_eq!(form["template"], "edit_battery.html");
    assert_eq!(form["context"]["header_text"], "Add new battery");
    assert_eq!(form["context"]["is_owner"], true);

    let invalid = app.post("/batteries/new", STRANGER, "name=&contributors=99").await;
    assert_eq!(invalid.status, StatusCode::OK);
    let errors = &invalid.json()["context"]["form"]["errors"];
    assert!(errors["name"].is_array());
    assert!(errors["contributors"].is_array());

    let created = app.post("/batteries/new", STRANGER, "name=Second&maximum_time=30&contributors=1").await;
    assert_eq!(created.status, StatusCode::SEE_OTHER);
    assert_eq!(created.location(), "/batteries/2");
    let battery = app.db().battery(2).await.unwrap().unwrap();
    assert_eq!(battery.owner, STRANGER);
    assert_eq!(battery.contributors, vec![OWNER]);
    assert_eq!(battery.maximum_time, Some(30));
}

#[tokio::test]
async fn edit_checks_permission_and_owner_only_contributors() {
    let app = spawn(catalog).await;
    let path = format!("/batteries/{PILOT}/edit");

    assert_eq!(app.get("/batteries/9/edit", OWNER).await.status, StatusCode::NOT_FOUND);
    assert_eq!(app.get(&path, STRANGER).await.status, StatusCode::FORBIDDEN);
    assert_eq!(app.post(&path, STRANGER, "name=Hijacked").await.status, StatusCode::FORBIDDEN);

    let form = app.get(&path, CONTRIBUTOR).await.json();
    assert_eq!(form["context"]["header_text"], "Pilot");
    assert_eq!(form["context"]["is_owner"], false);

    let by_contributor = app.post(&path, CONTRIBUTOR, "name=Renamed&active=on&contributors=3").await;
    assert_eq!(by_contributor.status, StatusCode::SEE_OTHER);
    assert_eq!(by_contributor.location(), format!("/batteries/{PILOT}"));
    let saved = battery(&app).await;
    assert_eq!(saved.name, "Renamed");
    assert!(saved.active);
    assert_eq!(saved.contributors, vec![CONTRIBUTOR]);

    app.post(&path, OWNER, "name=Renamed&contributors=2&contributors=3").await;
    assert_eq!(battery(&app).await.contributors, vec![CONTRIBUTOR, STRANGER]);

    let invalid = app.post(&path, OWNER, "name=&number_of_experiments=zero").await;
    assert_eq!(invalid.status, StatusCode::OK);
    assert!(invalid.json()["context"]["form"]["errors"]["number_of_experiments"].is_array());
}

#[tokio::test]
async fn delete_cascades_for_owner_or_superuser_only() {
    let app = spawn(with_results).await;
    let path = format!("/batteries/{PILOT}/delete");

    for user in [STRANGER, CONTRIBUTOR] {
        let reply = app.post(&path, user, "").await;
        assert_eq!(reply.status, StatusCode::SEE_OTHER);
        assert_eq!(reply.location(), "/batteries");
        assert!(app.db().battery(PILOT).await.unwrap().is_some());
    }
    assert!(app.db().has_results(PILOT).await.unwrap());

    app.post(&path, ADMIN, "").await;
    assert!(app.db().battery(PILOT).await.unwrap().is_none());
    assert!(app.db().hits_for_battery(PILOT).await.unwrap().is_empty());
    assert!(app.db().assignments_in(&[1]).await.unwrap().is_empty());
    assert!(!app.db().has_results(PILOT).await.unwrap());
}

#[tokio::test]
async fn add_experiment_lists_unplaced_templates() {
    let app = spawn(placed).await;

    let page = app.get(&format!("/batteries/{PILOT}/experiments/add"), OWNER).await.json();
    assert_eq!(page["template"], "add_experiment.html");
    assert_eq!(page["context"]["bid"], PILOT);
    let tags: Vec<&str> =
        page["context"]["newexperiments"].as_array().unwrap().iter().map(|t| t["tag"].as_str().unwrap()).collect();
    assert_eq!(tags, vec!["flanker"]);
    assert_eq!(page["context"]["newexperimentsjson"]["flanker"]["rejection_variable"]["name"], "catch_var");

    assert_eq!(app.get("/batteries/9/experiments/add", OWNER).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn save_experiment_builds_conditions() {
    let app = spawn(catalog).await;
    let path = format!("/batteries/{PILOT}/experiments/save");

    let form = format!("experiment={FLANKER}&val{PERFORMANCE}=1&oper{PERFORMANCE}=EQUALS&amt{PERFORMANCE}=0.25&val{REJECTION}=0");
    let reply = app.post(&path, CONTRIBUTOR, &form).await;
    assert_eq!(reply.status, StatusCode::SEE_OTHER);
    assert_eq!(reply.location(), format!("/batteries/{PILOT}"));

    let placed = battery(&app).await.experiments;
    assert_eq!(placed.len(), 1);
    let experiment = app.db().experiment(placed[0]).await.unwrap().unwrap();
    assert_eq!(experiment.template, FLANKER);
    assert!(experiment.include_bonus && experiment.include_catch);

    let conditions = app.db().conditions_in(&experiment.credit_conditions).await.unwrap();
    assert_eq!(conditions[0].variable, PERFORMANCE);
    assert_eq!(conditions[0].amount.as_deref(), Some("0.25"));
    assert_eq!(conditions[1].variable, REJECTION);
    assert_eq!(conditions[1].operator, None);
}

#[tokio::test]
async fn save_experiment_rejects_bad_input() {
    let app = spawn(catalog).await;
    let path = format!("/batteries/{PILOT}/experiments/save");

    assert_eq!(app.post(&path, OWNER, "val1=1").await.status, StatusCode::BAD_REQUEST);
    assert_eq!(app.post(&path, OWNER, "experiment=abc").await.status, StatusCode::BAD_REQUEST);
    assert_eq!(app.post(&path, OWNER, "experiment=77").await.status, StatusCode::NOT_FOUND);
    assert_eq!(app.post(&path, OWNER, "experiment=1&val42=1").await.status, StatusCode::NOT_FOUND);
    assert_eq!(app.post(&path, STRANGER, "experiment=1").await.status, StatusCode::FORBIDDEN);
    assert_eq!(app.post("/batteries/9/experiments/save", OWNER, "experiment=1").await.status, StatusCode::NOT_FOUND);

    assert!(app.db().condition(1).await.unwrap().is_none());
    assert!(battery(&app).await.experiments.is_empty());
}

#[tokio::test]
async fn battery_experiment_page_uses_battery_permissions() {
    let app = spawn(placed).await;

    let page = app.get(&format!("/batteries/{PILOT}/experiments/1"), CONTRIBUTOR).await.json();
    assert_eq!(page["template"], "experiment_details.html");
    assert_eq!(page["context"]["edit_permission"], true);
    assert_eq!(page["context"]["template"]["tag"], "stroop");

    let as_stranger = app.get(&format!("/batteries/{PILOT}/experiments/1"), STRANGER).await.json();
    assert_eq!(as_stranger["context"]["edit_permission"], false);
    assert_eq!(app.get(&format!("/batteries/{PILOT}/experiments/9"), OWNER).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn editing_switches_never_enables_credit_without_conditions() {
    let app = spawn(placed).await;
    let path = format!("/batteries/{PILOT}/experiments/1/edit");

    let form = app.get(&path, OWNER).await.json();
    assert_eq!(form["template"], "edit_experiment.html");
    assert_eq!(form["context"]["form"]["data"]["include_bonus"], true);

    assert_eq!(app.post(&path, STRANGER, "include_bonus=on").await.status, StatusCode::FORBIDDEN);

    let reply = app.post(&path, OWNER, "include_bonus=on&include_catch=on").await;
    assert_eq!(reply.status, StatusCode::SEE_OTHER);
    assert_eq!(reply.location(), format!("/batteries/{PILOT}"));
    let experiment = app.db().experiment(EXPERIMENT).await.unwrap().unwrap();
    assert!(experiment.include_bonus);
    assert!(!experiment.include_catch);
}

#[tokio::test]
async fn remove_experiment_is_silent_without_permission() {
    let app = spawn(placed).await;
    let path = format!("/batteries/{PILOT}/experiments/1/remove");

    let denied = app.post(&path, STRANGER, "").await;
    assert_eq!(denied.status, StatusCode::SEE_OTHER);
    assert_eq!(battery(&app).await.experiments, vec![EXPERIMENT]);

    let removed = app.post(&path, CONTRIBUTOR, "").await;
    assert_eq!(removed.location(), format!("/batteries/{PILOT}"));
    assert!(battery(&app).await.experiments.is_empty());
    assert!(app.db().experiment(EXPERIMENT).await.unwrap().is_none());
}

#[tokio::test]
async fn remove_condition_updates_credits_and_renders_the_form() {
    let app = spawn(placed).await;

    assert_eq!(
        app.post(&format!("/batteries/{PILOT}/experiments/1/conditions/9/remove"), OWNER, "").await.status,
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        app.post(&format!("/batteries/{PILOT}/experiments/1/conditions/1/remove"), STRANGER, "").await.status,
        StatusCode::FORBIDDEN
    );

    let reply = app.post(&format!("/batteries/{PILOT}/experiments/1/conditions/1/remove"), OWNER, "").await;
    assert_eq!(reply.status, StatusCode::OK);
    let page = reply.json();
    assert_eq!(page["template"], "edit_experiment.html");
    assert_eq!(page["context"]["experiment"]["include_bonus"], false);
    assert_eq!(page["context"]["conditions"], json!([]));
    assert!(app.db().condition(CONDITION).await.unwrap().is_none());
}
