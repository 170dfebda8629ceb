#![cfg(feature = "server")]

use axum::body::to_bytes;
use axum::http::{StatusCode, header};
use expdj_kernel::database::Database;
use expdj_kernel::domain::config::ApiConfig;
use expdj_kernel::domain::registry::{FeatureSlice, InitializedSlice};
use expdj_kernel::render::Page;
use expdj_kernel::server::ApiState;
use expdj_kernel::storage::Storage;
use std::any::Any;

#[derive(Debug)]
struct Marker(&'static str);

impl FeatureSlice for Marker {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

async fn storage(dir: &tempfile::TempDir) -> Storage {
    Storage::builder().root(dir.path()).connect().await.unwrap()
}

#[tokio::test]
async fn builder_requires_database_and_storage() {
    let result = ApiState::builder().config(ApiConfig::default()).build();
    assert!(result.is_err());
}

#[tokio::test]
async fn registered_slices_are_retrievable() {
    let dir = tempfile::tempdir().unwrap();
    let state = ApiState::builder()
        .config(ApiConfig::default())
        .db(Database::ephemeral().await.unwrap())
        .storage(storage(&dir).await)
        .register_slice(InitializedSlice::new(Marker("marker")))
        .build()
        .unwrap();

    assert_eq!(state.get_slice::<Marker>().map(|p| p.0), Some("marker"));
    assert_eq!(state.slice_names().count(), 1);
}

#[tokio::test]
async fn render_uses_document_content_type() {
    let dir = tempfile::tempdir().unwrap();
    let state = ApiState::builder()
        .config(ApiConfig::default())
        .db(Database::ephemeral().await.unwrap())
        .storage(storage(&dir).await)
        .build()
        .unwrap();

    let response = state.render(&Page::new("all_batteries.html").with("batteries", Vec::<u64>::new())).unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["template"], "all_batteries.html");
}
