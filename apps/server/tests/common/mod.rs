#![allow(dead_code, unreachable_pub)]

use axum::Router;
use axum::body::{Body, Bytes, to_bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use expdj::domain::config::ApiConfig;
use expdj::kernel::database::models::{Id, User};
use expdj::kernel::database::{Database, Fixture};
use expdj::kernel::server::ApiState;
use expdj::kernel::storage::Storage;
use serde_json::Value;
use std::path::Path;
use tempfile::TempDir;
use tower::ServiceExt;

pub const OWNER: Id = 1;
pub const CONTRIBUTOR: Id = 2;
pub const STRANGER: Id = 3;
pub const ADMIN: Id = 4;

pub struct TestApp {
    pub state: ApiState,
    router: Router,
    _media: TempDir,
    _library: TempDir,
}

pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Reply {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.body.to_vec()).unwrap()
    }

    pub fn location(&self) -> &str {
        self.headers[header::LOCATION].to_str().unwrap()
    }

    pub fn header(&self, name: header::HeaderName) -> &str {
        self.headers[name].to_str().unwrap()
    }
}

/// Writes an installable package into a library directory.
pub fn write_package(root: &Path, tag: &str) {
    let dir = root.join(tag);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("config.json"),
        format!(
            r#"[{{"tag":"{tag}","name":"{tag} task","run":["experiment.js","style.css"],
                 "cognitive_atlas_task_id":"tsk_{tag}",
                 "performance_variable":{{"name":"credit_var","datatype":"boolean"}},
                 "rejection_variable":{{"name":"catch_var","datatype":"boolean"}}}}]"#
        ),
    )
    .unwrap();
    std::fs::write(dir.join("experiment.js"), format!("var {tag}_experiment = [];")).unwrap();
    std::fs::write(dir.join("style.css"), "body {}").unwrap();
}

/// Four users (owner, contributor, stranger, superuser), a library holding
/// `stroop` and `flanker`, and whatever `seed` adds to the fixture.
pub async fn spawn(seed: impl FnOnce(&mut Fixture)) -> TestApp {
    let media = tempfile::tempdir().unwrap();
    let library = tempfile::tempdir().unwrap();
    write_package(library.path(), "stroop");
    write_package(library.path(), "flanker");

    let mut config = ApiConfig::default();
    config.library.path = library.path().to_path_buf();

    let mut fixture = Fixture::default();
    for (id, username, is_superuser) in
        [(OWNER, "owner", false), (CONTRIBUTOR, "contributor", false), (STRANGER, "stranger", false), (ADMIN, "admin", true)]
    {
        fixture.users.push(User { id, username: username.to_owned(), is_superuser });
    }
    seed(&mut fixture);
    let database = Database::ephemeral().await.unwrap();
    database.load_fixture(fixture).await.unwrap();

    let storage = Storage::builder().root(media.path()).connect().await.unwrap();
    let slices = expdj::init(&config, &storage).unwrap();
    let state = ApiState::builder()
        .config(config)
        .db(database)
        .storage(storage)
        .register_slices(slices)
        .build()
        .unwrap();

    TestApp { router: expdj_server::app(state.clone()), state, _media: media, _library: library }
}

impl TestApp {
    pub fn token(&self, user: Id) -> String {
        self.state.identity.issue(user).unwrap()
    }

    pub async fn send(&self, method: Method, path: &str, user: Option<Id>, form: &str) -> Reply {
        self.send_typed(method, path, user, "application/x-www-form-urlencoded", form).await
    }

    pub async fn send_typed(
        &self,
        method: Method,
        path: &str,
        user: Option<Id>,
        content_type: &str,
        body: &str,
    ) -> Reply {
        let mut request = Request::builder().method(method).uri(path);
        if let Some(user) = user {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", self.token(user)));
        }
        let request = request
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body.to_owned()))
            .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        Reply { status, headers, body }
    }

    pub async fn get(&self, path: &str, user: Id) -> Reply {
        self.send(Method::GET, path, Some(user), "").await
    }

    pub async fn post(&self, path: &str, user: Id, form: &str) -> Reply {
        self.send(Method::POST, path, Some(user), form).await
    }

    pub fn db(&self) -> &Database {
        &self.state.database
    }

    pub fn media_root(&self) -> &Path {
        self.state.storage.root()
    }
}
