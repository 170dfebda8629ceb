//! Installed experiment folders, kept in the `experiments` storage namespace.

use crate::error::ExperimentsError;
use crate::manifest::{ExperimentManifest, MANIFEST_FILE};
use expdj_kernel::domain::constants::EXPERIMENTS_NAMESPACE;
use expdj_kernel::storage::{NamespacedStorage, Storage, StorageError};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct ExperimentAssets {
    storage: NamespacedStorage,
}

impl ExperimentAssets {
    /// # Errors
    /// Only if the namespace name is rejected by the storage sandbox.
    pub fn new(storage: &Storage) -> Result<Self, StorageError> {
        Ok(Self { storage: storage.namespace(EXPERIMENTS_NAMESPACE)? })
    }

    /// Writes one package file to `<tag>/<rel>`.
    ///
    /// # Errors
    /// Traversal attempts and disk failures.
    pub async fn install_file(&self, tag: &str, rel: &str, bytes: &[u8]) -> Result<(), StorageError> {
        self.storage.write(Path::new(tag).join(rel), bytes).await?;
        debug!(tag, file = rel, size = bytes.len(), "Asset installed");
        Ok(())
    }

    /// Removes the whole `<tag>` folder. A folder that is already gone only logs a warning.
    ///
    /// # Errors
    /// Traversal attempts and disk failures.
    pub async fn remove(&self, tag: &str) -> Result<(), StorageError> {
        match self.storage.remove_dir(tag).await {
            Ok(()) => Ok(()),
            Err(StorageError::DirectoryNotFound { message, .. }) => {
                warn!(tag, path = %message, "Experiment folder already absent");
                Ok(())
            },
            Err(err) => Err(err),
        }
    }

    /// Reads the installed `config.json` of `tag`.
    ///
    /// # Errors
    /// [`ExperimentsError::Storage`] with a not-found source when the folder or manifest is
    /// missing, parse errors otherwise.
    pub async fn manifest(&self, tag: &str) -> Result<ExperimentManifest, ExperimentsError> {
        let bytes = self.storage.read(Path::new(tag).join(MANIFEST_FILE)).await?;
        ExperimentManifest::from_slice(&bytes)
    }

    /// Physical folder of `tag`. It may not exist.
    ///
    /// # Errors
    /// Traversal attempts.
    pub fn folder(&self, tag: &str) -> Result<PathBuf, StorageError> {
        self.storage.resolve(tag)
    }

    /// Files of an installed experiment, relative to its folder.
    ///
    /// # Errors
    /// [`StorageError::DirectoryNotFound`] when `tag` is not installed.
    pub async fn files(&self, tag: &str) -> Result<Vec<String>, StorageError> {
        self.storage.list(tag).await
    }

    /// # Errors
    /// Traversal attempts.
    pub fn is_installed(&self, tag: &str) -> Result<bool, StorageError> {
        self.storage.exists(Path::new(tag).join(MANIFEST_FILE))
    }
}
