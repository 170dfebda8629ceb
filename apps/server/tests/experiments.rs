mod common;

use axum::http::{Method, StatusCode};
use common::{ADMIN, OWNER, spawn};
use expdj::kernel::database::models::Id;

async fn install(app: &common::TestApp, form: &str) -> common::Reply {
    app.post("/experiments/save", ADMIN, form).await
}

async fn template_id(app: &common::TestApp, tag: &str) -> Id {
    app.db().template_by_tag(tag).await.unwrap().map(|t| t.id).unwrap()
}

#[tokio::test]
async fn anonymous_and_bad_tokens_are_rejected() {
    let app = spawn(|_| {}).await;

    let reply = app.send(Method::GET, "/experiments", None, "").await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.json()["status"], 401);

    let request = axum::http::Request::builder()
        .uri("/experiments")
        .header("authorization", "Bearer not-a-token")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = tower::ServiceExt::oneshot(expdj_server::app(app.state.clone()), request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_is_public() {
    let app = spawn(|_| {}).await;
    let reply = app.send(Method::GET, "/health", None, "").await;
    assert_eq!(reply.status, StatusCode::OK);
}

#[tokio::test]
async fn non_form_bodies_are_unsupported_media() {
    let app = spawn(|_| {}).await;

    let reply = app.send_typed(Method::POST, "/experiments/save", Some(ADMIN), "application/json", r#"{"stroop":"on"}"#).await;
    assert_eq!(reply.status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(reply.json()["status"], 415);
    assert!(app.db().template_by_tag("stroop").await.unwrap().is_none());
}

#[tokio::test]
async fn unknown_template_is_404() {
    let app = spawn(|_| {}).await;
    assert_eq!(app.get("/experiments/99", OWNER).await.status, StatusCode::NOT_FOUND);
    assert_eq!(app.get("/experiments/99/edit", OWNER).await.status, StatusCode::NOT_FOUND);
    assert_eq!(app.post("/experiments/99/delete", ADMIN, "").await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn add_page_lists_only_uninstalled_packages() {
    let app = spawn(|_| {}).await;
    install(&app, "stroop=on").await;

    let page = app.get("/experiments/add", OWNER).await.json();
    assert_eq!(page["template"], "add_experiment_template.html");
    let new: Vec<&str> =
        page["context"]["newexperiments"].as_array().unwrap().iter().map(|m| m["tag"].as_str().unwrap()).collect();
    assert_eq!(new, vec!["flanker"]);
    assert_eq!(page["context"]["experiments"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn save_installs_selected_packages_and_reports() {
    let app = spawn(|_| {}).await;

    let reply = install(&app, "stroop=on&not_in_library=on&csrfmiddlewaretoken=x").await;
    assert_eq!(reply.status, StatusCode::OK);
    let page = reply.json();
    assert_eq!(page["template"], "all_experiments.html");
    assert_eq!(page["context"]["message"], "Experiments installed successfully.");
    assert_eq!(page["context"]["delete_permission"], true);

    let id = template_id(&app, "stroop").await;
    assert!(app.media_root().join("experiments/stroop/experiment.js").is_file());
    let template = app.db().template(id).await.unwrap().unwrap();
    assert!(template.performance_variable.is_some());
    assert!(template.cognitive_atlas_task.is_some());

    let asset = app.get("/static/experiments/stroop/experiment.js", OWNER).await;
    assert_eq!(asset.status, StatusCode::OK);
    assert_eq!(asset.text(), "var stroop_experiment = [];");

    let again = install(&app, "stroop=on").await.json();
    assert_eq!(again["context"]["message"], "The experiments stroop did not install successfully.");
}

#[tokio::test]
async fn template_pages_expose_superuser_permissions() {
    let app = spawn(|_| {}).await;
    install(&app, "stroop=on").await;
    let id = template_id(&app, "stroop").await;

    let as_owner = app.get(&format!("/experiments/{id}"), OWNER).await.json();
    assert_eq!(as_owner["template"], "experiment_template_details.html");
    assert_eq!(as_owner["context"]["edit_permission"], false);
    assert_eq!(as_owner["context"]["battery"], serde_json::Value::Null);

    let as_admin = app.get(&format!("/experiments/{id}"), ADMIN).await.json();
    assert_eq!(as_admin["context"]["delete_permission"], true);
}

#[tokio::test]
async fn preview_embeds_installed_assets() {
    let app = spawn(|_| {}).await;
    install(&app, "stroop=on").await;
    let id = template_id(&app, "stroop").await;

    let page = app.get(&format!("/experiments/{id}/preview"), OWNER).await.json();
    let html = page["context"]["preview_html"].as_str().unwrap();
    assert!(html.contains(r#"<script src="/static/experiments/stroop/experiment.js"></script>"#));
    assert!(html.contains(r#"href="/static/experiments/stroop/style.css""#));
    assert!(html.contains("stroop_experiment"));
    let files: Vec<&str> =
        page["context"]["files"].as_array().unwrap().iter().map(|f| f.as_str().unwrap()).collect();
    assert!(files.contains(&"experiment.js"));
    assert!(files.contains(&"style.css"));

    std::fs::remove_dir_all(app.media_root().join("experiments/stroop")).unwrap();
    assert_eq!(app.get(&format!("/experiments/{id}/preview"), OWNER).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn editing_requires_superuser_and_valid_fields() {
    let app = spawn(|_| {}).await;
    install(&app, "stroop=on").await;
    let id = template_id(&app, "stroop").await;
    let path = format!("/experiments/{id}/edit");

    let bound = app.get(&path, OWNER).await.json();
    assert_eq!(bound["context"]["form"]["data"]["name"], "stroop task");

    assert_eq!(app.post(&path, OWNER, "name=Renamed").await.status, StatusCode::FORBIDDEN);

    let invalid = app.post(&path, ADMIN, "name=&time=-3").await;
    assert_eq!(invalid.status, StatusCode::OK);
    let errors = &invalid.json()["context"]["form"]["errors"];
    assert!(errors["name"].is_array());
    assert!(errors["time"].is_array());

    let saved = app.post(&path, ADMIN, "name=Renamed&publish=on&time=12").await;
    assert_eq!(saved.status, StatusCode::SEE_OTHER);
    assert_eq!(saved.location(), format!("/experiments/{id}"));
    let template = app.db().template(id).await.unwrap().unwrap();
    assert_eq!(template.name, "Renamed");
    assert_eq!(template.time, Some(12));
}

#[tokio::test]
async fn edit_without_id_redirects_to_add() {
    let app = spawn(|_| {}).await;
    let reply = app.get("/experiments/edit", OWNER).await;
    assert_eq!(reply.status, StatusCode::SEE_OTHER);
    assert_eq!(reply.location(), "/experiments/add");
}

#[tokio::test]
async fn delete_is_a_silent_noop_without_superuser() {
    let app = spawn(|_| {}).await;
    install(&app, "stroop=on").await;
    let id = template_id(&app, "stroop").await;

    let denied = app.post(&format!("/experiments/{id}/delete"), OWNER, "").await;
    assert_eq!(denied.status, StatusCode::SEE_OTHER);
    assert_eq!(denied.location(), "/experiments");
    assert!(app.db().template(id).await.unwrap().is_some());

    let deleted = app.post(&format!("/experiments/{id}/delete"), ADMIN, "").await;
    assert_eq!(deleted.status, StatusCode::SEE_OTHER);
    assert!(app.db().template(id).await.unwrap().is_none());
    assert!(app.db().task_by_atlas_id("tsk_stroop").await.unwrap().is_none());
    assert!(!app.media_root().join("experiments/stroop").exists());
}

#[tokio::test]
async fn update_reinstalls_for_superusers_only() {
    let app = spawn(|_| {}).await;
    install(&app, "stroop=on&flanker=on").await;
    let before = template_id(&app, "stroop").await;

    assert_eq!(app.post("/experiments/update", OWNER, "").await.status, StatusCode::FORBIDDEN);
    assert_eq!(app.post(&format!("/experiments/{before}/update"), OWNER, "").await.status, StatusCode::FORBIDDEN);

    let page = app.post(&format!("/experiments/{before}/update"), ADMIN, "").await.json();
    assert_eq!(page["context"]["message"], "Experiments updated successfully.");
    assert_ne!(template_id(&app, "stroop").await, before);

    let all = app.post("/experiments/update", ADMIN, "").await.json();
    assert_eq!(all["context"]["experiments"].as_array().unwrap().len(), 2);
}
