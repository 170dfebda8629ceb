use expdj_experiments::{Experiments, ExperimentLibrary, LocalLibrary, init, init_with_library};
use expdj_kernel::database::Database;
use expdj_kernel::domain::config::ApiConfig;
use expdj_kernel::storage::Storage;
use std::path::Path;
use std::sync::Arc;

fn write_package(root: &Path, tag: &str) {
    let dir = root.join(tag);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("config.json"),
        format!(
            r#"[{{"tag":"{tag}","name":"{tag} task","run":["experiment.js","style.css"],
                 "cognitive_atlas_task_id":"tsk_{tag}",
                 "performance_variable":{{"name":"credit_var","datatype":"boolean"}}}}]"#
        ),
    )
    .unwrap();
    std::fs::write(dir.join("experiment.js"), "var experiment = [];").unwrap();
    std::fs::write(dir.join("style.css"), "body {}").unwrap();
}

async fn slice(library_root: &Path, media: &Path) -> Experiments {
    let storage = Storage::builder().root(media).connect().await.unwrap();
    let slice = init_with_library(Arc::new(LocalLibrary::new(library_root)), &storage).unwrap();
    slice.downcast_ref::<Experiments>().unwrap().clone()
}

#[tokio::test]
async fn init_creates_slice() {
    let media = tempfile::tempdir().unwrap();
    let storage = Storage::builder().root(media.path()).connect().await.unwrap();
    let slice = init(&ApiConfig::default(), &storage).unwrap();
    assert_eq!(slice.id, std::any::TypeId::of::<Experiments>());
}

#[tokio::test]
async fn install_copies_assets_and_records_templates() {
    let library = tempfile::tempdir().unwrap();
    let media = tempfile::tempdir().unwrap();
    write_package(library.path(), "stroop");
    write_package(library.path(), "ant");
    let experiments = slice(library.path(), media.path()).await;
    let database = Database::ephemeral().await.unwrap();

    let failed = experiments
        .install(&database, &["stroop".to_owned(), "missing".to_owned(), "ant".to_owned()])
        .await;

    assert_eq!(failed, vec!["missing"]);
    assert!(experiments.assets.is_installed("stroop").unwrap());
    assert!(experiments.assets.is_installed("ant").unwrap());
    assert_eq!(database.templates().await.unwrap().len(), 2);
    let stroop = database.template_by_tag("stroop").await.unwrap().unwrap();
    assert_eq!(stroop.name, "stroop task");
    assert!(stroop.performance_variable.is_some());
    assert!(stroop.add_date > 0);
    let task = database.task(stroop.cognitive_atlas_task.unwrap()).await.unwrap().unwrap();
    assert_eq!(task.cog_atlas_id, "tsk_stroop");
}

#[tokio::test]
async fn reinstalling_an_installed_tag_fails_without_touching_the_store() {
    let library = tempfile::tempdir().unwrap();
    let media = tempfile::tempdir().unwrap();
    write_package(library.path(), "stroop");
    let experiments = slice(library.path(), media.path()).await;
    let database = Database::ephemeral().await.unwrap();

    assert!(experiments.install(&database, &["stroop".to_owned()]).await.is_empty());
    assert_eq!(experiments.install(&database, &["stroop".to_owned()]).await, vec!["stroop"]);
    assert_eq!(database.templates().await.unwrap().len(), 1);
    assert!(experiments.assets.is_installed("stroop").unwrap());
}

#[tokio::test]
async fn uninstall_removes_folder_template_and_lonely_task() {
    let library = tempfile::tempdir().unwrap();
    let media = tempfile::tempdir().unwrap();
    write_package(library.path(), "stroop");
    let experiments = slice(library.path(), media.path()).await;
    let database = Database::ephemeral().await.unwrap();
    experiments.install(&database, &["stroop".to_owned()]).await;
    let stroop = database.template_by_tag("stroop").await.unwrap().unwrap();
    let id = stroop.id;

    let tag = experiments.uninstall(&database, id).await.unwrap();

    assert_eq!(tag.as_deref(), Some("stroop"));
    assert!(!experiments.assets.is_installed("stroop").unwrap());
    assert!(database.templates().await.unwrap().is_empty());
    assert!(database.task(stroop.cognitive_atlas_task.unwrap()).await.unwrap().is_none());
    assert_eq!(experiments.uninstall(&database, id).await.unwrap(), None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn racing_installs_of_one_package_keep_the_winners_assets() {
    let library = tempfile::tempdir().unwrap();
    let media = tempfile::tempdir().unwrap();
    write_package(library.path(), "stroop");
    let experiments = slice(library.path(), media.path()).await;
    let database = Database::ephemeral().await.unwrap();
    let tags = ["stroop".to_owned()];

    let (first, second) = tokio::join!(experiments.install(&database, &tags), experiments.install(&database, &tags));

    assert_eq!(first.len() + second.len(), 1);
    assert_eq!(database.templates().await.unwrap().len(), 1);
    assert!(experiments.assets.is_installed("stroop").unwrap());
    let files = experiments.assets.files("stroop").await.unwrap();
    assert!(files.iter().any(|f| f == "experiment.js"));
    assert!(files.iter().any(|f| f == "style.css"));
}

#[tokio::test]
async fn packages_sharing_a_task_id_share_the_task() {
    let library = tempfile::tempdir().unwrap();
    let media = tempfile::tempdir().unwrap();
    write_package(library.path(), "stroop");
    let experiments = slice(library.path(), media.path()).await;
    let database = Database::ephemeral().await.unwrap();
    experiments.install(&database, &["stroop".to_owned()]).await;

    let manifest = experiments.assets.manifest("stroop").await.unwrap();
    let mut twin = expdj_experiments::library::new_template(&manifest);
    twin.template.tag = "stroop-twin".into();
    let twin = database.insert_template(twin).await.unwrap();

    let stroop = database.template_by_tag("stroop").await.unwrap().unwrap();
    let twin = database.template(twin).await.unwrap().unwrap();
    assert_eq!(stroop.cognitive_atlas_task, twin.cognitive_atlas_task);
    assert_ne!(stroop.performance_variable, twin.performance_variable);
}

#[tokio::test]
async fn selection_reads_the_library_root() {
    let library = tempfile::tempdir().unwrap();
    write_package(library.path(), "flanker");
    let selection = LocalLibrary::new(library.path()).selection().await.unwrap();
    assert_eq!(selection.len(), 1);
    assert_eq!(selection[0].run, vec!["experiment.js", "style.css"]);
}
