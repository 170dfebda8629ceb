use expdj_storage::*;
use tempfile::TempDir;

async fn storage(temp: &TempDir) -> Storage {
    Storage::builder().root(temp.path()).connect().await.unwrap()
}

#[tokio::test]
async fn test_path_traversal_blocked() {
    let temp = TempDir::new().unwrap();
    let storage = storage(&temp).await;

    assert!(storage.resolve("../etc/passwd").is_err());
    assert!(storage.resolve("foo/../../bar").is_err());
    assert!(storage.resolve("/etc/passwd").is_err());
}

#[tokio::test]
async fn test_write_read_roundtrip() {
    let temp = TempDir::new().unwrap();
    let storage = storage(&temp).await;

    storage.write("foo/bar.js", b"hello world").await.unwrap();
    assert!(storage.exists("foo/bar.js").unwrap());
    assert_eq!(storage.read("foo/bar.js").await.unwrap(), b"hello world");
}

#[tokio::test]
async fn test_overwrite_replaces_content() {
    let temp = TempDir::new().unwrap();
    let storage = storage(&temp).await;

    storage.write("a.txt", b"first").await.unwrap();
    storage.write("a.txt", b"second").await.unwrap();
    assert_eq!(storage.read("a.txt").await.unwrap(), b"second");
    assert_eq!(storage.list(".").await.unwrap(), vec!["a.txt".to_owned()]);
}

#[tokio::test]
async fn test_namespace_isolation() {
    let temp = TempDir::new().unwrap();
    let storage = storage(&temp).await;

    let ns_a = storage.namespace("experiments").unwrap();
    let ns_b = storage.namespace("uploads").unwrap();

    ns_a.write("stroop/style.css", b"a").await.unwrap();
    ns_b.write("stroop/style.css", b"b").await.unwrap();

    assert_ne!(ns_a.resolve("stroop/style.css").unwrap(), ns_b.resolve("stroop/style.css").unwrap());
    assert_eq!(ns_a.read("stroop/style.css").await.unwrap(), b"a");
    assert_eq!(ns_b.read("stroop/style.css").await.unwrap(), b"b");
}

#[tokio::test]
async fn test_invalid_namespace_rejected() {
    let temp = TempDir::new().unwrap();
    let storage = storage(&temp).await;

    assert!(storage.namespace("").is_err());
    assert!(storage.namespace("../up").is_err());
}

#[tokio::test]
async fn test_list_and_remove_dir() {
    let temp = TempDir::new().unwrap();
    let ns = storage(&temp).await.namespace("experiments").unwrap();

    ns.write("stroop/config.json", b"{}").await.unwrap();
    ns.write("stroop/js/experiment.js", b"").await.unwrap();

    assert_eq!(
        ns.list("stroop").await.unwrap(),
        vec!["config.json".to_owned(), "js/experiment.js".to_owned()]
    );

    ns.remove_dir("stroop").await.unwrap();
    assert!(!ns.exists("stroop").unwrap());

    let err = ns.remove_dir("stroop").await.unwrap_err();
    assert!(matches!(err, StorageError::DirectoryNotFound { .. }));
    assert_eq!(err.status_code(), 404);
}

#[tokio::test]
async fn test_list_missing_dir() {
    let temp = TempDir::new().unwrap();
    let storage = storage(&temp).await;

    let err = storage.list("nothing").await.unwrap_err();
    assert!(matches!(err, StorageError::DirectoryNotFound { .. }));
}

#[tokio::test]
async fn test_delete_and_exists() {
    let temp = TempDir::new().unwrap();
    let storage = storage(&temp).await;

    storage.write("tmp/file.txt", b"x").await.unwrap();
    storage.delete("tmp/file.txt").await.unwrap();
    assert!(!storage.exists("tmp/file.txt").unwrap());
    assert!(matches!(
        storage.delete("tmp/file.txt").await,
        Err(StorageError::FileNotFound { .. })
    ));
}

#[tokio::test]
async fn test_connect_without_create_requires_root() {
    let temp = TempDir::new().unwrap();
    let missing = temp.path().join("absent");

    let err = Storage::builder().root(&missing).create(false).connect().await.unwrap_err();
    assert!(matches!(err, StorageError::DirectoryNotFound { .. }));
}

#[tokio::test]
async fn test_read_missing_returns_file_not_found() {
    let temp = TempDir::new().unwrap();
    let storage = storage(&temp).await;

    let err = storage.read("missing.bin").await.expect_err("expected error");
    assert!(matches!(err, StorageError::FileNotFound { .. }));
}
