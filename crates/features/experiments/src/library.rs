//! Installable experiment packages and how they become templates.

use crate::assets::ExperimentAssets;
use crate::error::{ExperimentsError, ExperimentsErrorExt};
use crate::manifest::{ExperimentManifest, MANIFEST_FILE, VariableSpec, is_valid_tag};
use async_trait::async_trait;
use expdj_kernel::database::models::{CognitiveAtlasTask, ExperimentTemplate, ExperimentVariable, Id};
use expdj_kernel::database::{Database, NewTemplate};
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// A package ready to install: its manifest and every file, relative to the package root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentPackage {
    pub manifest: ExperimentManifest,
    pub files: Vec<(String, Vec<u8>)>,
}

/// Source of installable experiments.
#[async_trait]
pub trait ExperimentLibrary: Debug + Send + Sync {
    /// Every experiment the library can install, sorted by tag.
    async fn selection(&self) -> Result<Vec<ExperimentManifest>, ExperimentsError>;

    /// Loads the package for `tag`.
    async fn package(&self, tag: &str) -> Result<ExperimentPackage, ExperimentsError>;

    /// Installs each tag and returns the ones that failed. Failures are logged, never raised.
    async fn install(
        &self,
        tags: &[String],
        database: &Database,
        assets: &ExperimentAssets,
    ) -> Vec<String> {
        let mut failed = Vec::new();
        for tag in tags {
            let outcome = match self.package(tag).await {
                Ok(package) => install_package(&package, database, assets).await,
                Err(err) => Err(err),
            };
            match outcome {
                Ok(id) => info!(tag = %tag, template = id, "Experiment installed"),
                Err(err) => {
                    warn!(tag = %tag, error = %err, "Experiment installation failed");
                    failed.push(tag.clone());
                },
            }
        }
        failed
    }
}

/// Records the template, then copies the package files into asset storage.
///
/// Recording first claims the tag, so a concurrent install of the same package fails
/// before it writes any file. When copying fails the template is deleted again and the
/// folder removed; both belong to this call.
///
/// # Errors
/// Duplicate tags, storage failures and record store errors.
pub async fn install_package(
    package: &ExperimentPackage,
    database: &Database,
    assets: &ExperimentAssets,
) -> Result<Id, ExperimentsError> {
    let manifest = &package.manifest;
    let tag = manifest.tag.as_str();
    let id = database.insert_template(new_template(manifest)).await?;

    for (rel, bytes) in &package.files {
        if let Err(err) = assets.install_file(tag, rel, bytes).await {
            if let Err(rollback) = database.delete_template(id).await {
                warn!(tag, template = id, error = %rollback, "Could not delete the template of a failed install");
            }
            if let Err(cleanup) = assets.remove(tag).await {
                warn!(tag, error = %cleanup, "Could not remove assets of a failed install");
            }
            return Err(err).context(format!("Copying {tag}/{rel}"));
        }
    }
    Ok(id)
}

/// Template row for `manifest` with the task and variables it declares.
///
/// A blank cognitive atlas id means no task.
#[must_use]
pub fn new_template(manifest: &ExperimentManifest) -> NewTemplate {
    let task = manifest
        .cognitive_atlas_task_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| CognitiveAtlasTask { id: 0, name: manifest.name.clone(), cog_atlas_id: id.to_owned() });

    NewTemplate {
        template: ExperimentTemplate {
            tag: manifest.tag.clone(),
            name: manifest.name.clone(),
            reference: manifest.reference.clone(),
            publish: manifest.publish,
            template: manifest.template.clone(),
            time: manifest.time.map(i64::from),
            ..ExperimentTemplate::default()
        },
        task,
        performance_variable: manifest.performance_variable.as_ref().map(variable),
        rejection_variable: manifest.rejection_variable.as_ref().map(variable),
    }
}

fn variable(spec: &VariableSpec) -> ExperimentVariable {
    ExperimentVariable {
        id: 0,
        name: spec.name.clone(),
        description: spec.description.clone(),
        datatype: spec.datatype.clone(),
    }
}

/// Packages laid out as `<root>/<tag>/config.json` plus their assets.
#[derive(Debug, Clone)]
pub struct LocalLibrary {
    root: PathBuf,
}

impl LocalLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn read_manifest(dir: &Path) -> Result<ExperimentManifest, ExperimentsError> {
        let path = dir.join(MANIFEST_FILE);
        let bytes = fs::read(&path).await.context(format!("Reading {}", path.display()))?;
        ExperimentManifest::from_slice(&bytes).context(path.display().to_string())
    }
}

#[async_trait]
impl ExperimentLibrary for LocalLibrary {
    async fn selection(&self) -> Result<Vec<ExperimentManifest>, ExperimentsError> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %self.root.display(), "Experiment library not found");
                return Ok(Vec::new());
            },
            Err(err) => {
                return Err(ExperimentsError::Io {
                    source: err,
                    context: Some(format!("Listing {}", self.root.display()).into()),
                });
            },
        };

        let mut selection = Vec::new();
        while let Some(entry) = entries.next_entry().await.context("Listing library")? {
            let dir = entry.path();
            if !dir.join(MANIFEST_FILE).is_file() {
                continue;
            }
            match Self::read_manifest(&dir).await {
                Ok(manifest) => selection.push(manifest),
                Err(err) => warn!(path = %dir.display(), error = %err, "Skipping unreadable package"),
            }
        }
        selection.sort_by(|a, b| a.tag.cmp(&b.tag));
        debug!(count = selection.len(), "Experiment library scanned");
        Ok(selection)
    }

    async fn package(&self, tag: &str) -> Result<ExperimentPackage, ExperimentsError> {
        if !is_valid_tag(tag) {
            return Err(ExperimentsError::UnknownExperiment { message: tag.to_owned().into(), context: None });
        }
        let dir = self.root.join(tag);
        if !dir.join(MANIFEST_FILE).is_file() {
            return Err(ExperimentsError::UnknownExperiment { message: tag.to_owned().into(), context: None });
        }

        let manifest = Self::read_manifest(&dir).await?;
        if manifest.tag != tag {
            return Err(ExperimentsError::Manifest {
                message: format!("folder '{tag}' declares tag '{}'", manifest.tag).into(),
                context: None,
            });
        }

        let files = tokio::task::spawn_blocking(move || read_tree(&dir))
            .await
            .map_err(|err| ExperimentsError::Internal {
                message: err.to_string().into(),
                context: Some("Reading package files".into()),
            })??;
        Ok(ExperimentPackage { manifest, files })
    }
}

/// Every regular file below `dir` except dot-files and dot-folders, sorted by path.
fn read_tree(dir: &Path) -> Result<Vec<(String, Vec<u8>)>, ExperimentsError> {
    let mut files = Vec::new();
    let walker = WalkDir::new(dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !entry.file_name().to_string_lossy().starts_with('.'));

    for entry in walker {
        let entry = entry.map_err(|err| ExperimentsError::Io {
            source: std::io::Error::other(err),
            context: Some(format!("Walking {}", dir.display()).into()),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(dir) else {
            continue;
        };
        let rel: Vec<&str> = rel.iter().filter_map(|part| part.to_str()).collect();
        let bytes = std::fs::read(entry.path()).context(entry.path().display().to_string())?;
        files.push((rel.join("/"), bytes));
    }
    Ok(files)
}
