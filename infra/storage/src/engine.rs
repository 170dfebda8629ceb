//! Core storage engine: sandboxed, atomic file I/O rooted at one directory.

use crate::builder::StorageBuilder;
use crate::error::{StorageError, StorageErrorExt};
use crate::maintenance;
use crate::namespace::{NamespaceName, NamespacedStorage};
use crate::security;
use std::io::ErrorKind;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Marker embedded in temp file names; [`maintenance`] purges files carrying it.
pub(crate) const TMP_MARKER: &str = ".expdjtmp.";

#[derive(Debug)]
pub struct StorageInner {
    /// Canonical physical root. Every resolved path starts with it.
    pub(crate) root: PathBuf,
    pub(crate) tmp_counter: AtomicU64,
}

/// A cheaply cloneable handle to the storage sandbox.
///
/// All paths are relative to the root. Absolute paths, `..` escapes, and symlinks
/// pointing outside the root are rejected with [`StorageError::PathTraversalAttempt`].
#[derive(Debug, Clone)]
pub struct Storage {
    pub(crate) inner: Arc<StorageInner>,
}

impl Deref for Storage {
    type Target = StorageInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl Storage {
    #[must_use = "The storage engine is not initialized until you call .connect()"]
    pub fn builder() -> StorageBuilder {
        StorageBuilder::new()
    }

    /// Canonical root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    /// Returns a view scoped to `<root>/<name>/`.
    ///
    /// # Errors
    /// Returns [`StorageError::PathTraversalAttempt`] if the name is empty or
    /// contains anything but ASCII alphanumerics, `_` and `-`.
    pub fn namespace<N>(&self, name: N) -> Result<NamespacedStorage, StorageError>
    where
        N: TryInto<NamespaceName, Error = StorageError>,
    {
        let ns = name.try_into()?;
        Ok(NamespacedStorage::new(self.clone(), ns.0))
    }

    /// Resolves `path` to a physical path inside the sandbox.
    ///
    /// # Errors
    /// Returns [`StorageError::PathTraversalAttempt`] if the path tries to escape the sandbox.
    pub fn resolve(&self, path: impl AsRef<Path>) -> Result<PathBuf, StorageError> {
        security::resolve_path(&self.root, path)
    }

    pub(crate) fn resolve_internal(
        &self,
        namespace: Option<&str>,
        path: impl AsRef<Path>,
    ) -> Result<PathBuf, StorageError> {
        security::resolve_scoped(&self.root, namespace, path)
    }

    /// # Errors
    /// Returns [`StorageError::FileNotFound`] if the path does not exist.
    pub async fn read(&self, path: impl AsRef<Path>) -> Result<Vec<u8>, StorageError> {
        self.read_internal(None, path).await
    }

    pub(crate) async fn read_internal(
        &self,
        namespace: Option<&str>,
        path: impl AsRef<Path>,
    ) -> Result<Vec<u8>, StorageError> {
        let resolved = self.resolve_internal(namespace, path)?;

        match fs::read(&resolved).await {
            Ok(data) => Ok(data),
            Err(err) if err.kind() == ErrorKind::NotFound => Err(StorageError::FileNotFound {
                message: resolved.display().to_string().into(),
                context: None,
            }),
            Err(err) => Err(StorageError::Io {
                source: err,
                context: Some(format!("Read failed: {}", resolved.display()).into()),
            }),
        }
    }

    /// Writes `data` atomically, creating parent directories as needed.
    ///
    /// The bytes go to a unique temp file next to the target, are synced, and then
    /// renamed over it. A crash never leaves a half-written target behind.
    ///
    /// # Errors
    /// Returns [`StorageError::PathTraversalAttempt`] if the path escapes the sandbox,
    /// or [`StorageError::Io`] on disk failures.
    pub async fn write(&self, path: impl AsRef<Path>, data: &[u8]) -> Result<(), StorageError> {
        self.write_internal(None, path, data).await
    }

    pub(crate) async fn write_internal(
        &self,
        namespace: Option<&str>,
        path: impl AsRef<Path>,
        data: &[u8],
    ) -> Result<(), StorageError> {
        let resolved = self.resolve_internal(namespace, path)?;

        if let Some(parent) = resolved.parent() {
            fs::create_dir_all(parent)
                .await
                .context(format!("Failed to create parents of {}", resolved.display()))?;
        }

        let temp = unique_tmp_path(&resolved, &self.tmp_counter);

        {
            let mut file = fs::OpenOptions::new()
                .create_new(true)
                .write(true)
                .open(&temp)
                .await
                .context(format!("Temp creation failed: {}", temp.display()))?;
            file.write_all(data).await.context("Write failed")?;
            file.sync_all().await.context("Hardware sync failed")?;
        }

        if let Err(err) = fs::rename(&temp, &resolved).await {
            if err.kind() != ErrorKind::AlreadyExists {
                let _ = fs::remove_file(&temp).await;
                return Err(StorageError::Io {
                    source: err,
                    context: Some(
                        format!("Atomic swap failed: {} -> {}", temp.display(), resolved.display())
                            .into(),
                    ),
                });
            }
            fs::remove_file(&resolved)
                .await
                .context(format!("Failed to replace existing file: {}", resolved.display()))?;
            fs::rename(&temp, &resolved)
                .await
                .context(format!("Atomic swap failed: {}", resolved.display()))?;
        }

        if let Some(parent) = resolved.parent() {
            Self::sync_dir(parent).await;
        }

        debug!(path = %resolved.display(), bytes = data.len(), "File saved atomically");
        Ok(())
    }

    /// # Errors
    /// Returns [`StorageError::FileNotFound`] if the file does not exist.
    pub async fn delete(&self, path: impl AsRef<Path>) -> Result<(), StorageError> {
        self.delete_internal(None, path).await
    }

    pub(crate) async fn delete_internal(
        &self,
        namespace: Option<&str>,
        path: impl AsRef<Path>,
    ) -> Result<(), StorageError> {
        let resolved = self.resolve_internal(namespace, path)?;
        match fs::remove_file(&resolved).await {
            Ok(()) => {
                debug!(path = %resolved.display(), "File deleted");
                Ok(())
            },
            Err(err) if err.kind() == ErrorKind::NotFound => Err(StorageError::FileNotFound {
                message: resolved.display().to_string().into(),
                context: None,
            }),
            Err(err) => Err(StorageError::Io {
                source: err,
                context: Some(format!("Failed to delete: {}", resolved.display()).into()),
            }),
        }
    }

    /// Recursively removes a directory.
    ///
    /// # Errors
    /// Returns [`StorageError::DirectoryNotFound`] if it does not exist.
    pub async fn remove_dir(&self, path: impl AsRef<Path>) -> Result<(), StorageError> {
        self.remove_dir_internal(None, path).await
    }

    pub(crate) async fn remove_dir_internal(
        &self,
        namespace: Option<&str>,
        path: impl AsRef<Path>,
    ) -> Result<(), StorageError> {
        let resolved = self.resolve_internal(namespace, path)?;
        if resolved == self.root {
            return Err(StorageError::PathTraversalAttempt {
                message: resolved.display().to_string().into(),
                context: Some("Refusing to remove the storage root".into()),
            });
        }
        match fs::remove_dir_all(&resolved).await {
            Ok(()) => {
                debug!(path = %resolved.display(), "Directory removed");
                Ok(())
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(StorageError::DirectoryNotFound {
                    message: resolved.display().to_string().into(),
                    context: None,
                })
            },
            Err(err) => Err(StorageError::Io {
                source: err,
                context: Some(format!("Failed to remove: {}", resolved.display()).into()),
            }),
        }
    }

    /// Files below `dir`, as sorted `/`-separated paths relative to it.
    ///
    /// # Errors
    /// Returns [`StorageError::DirectoryNotFound`] if `dir` is not a directory.
    pub async fn list(&self, dir: impl AsRef<Path>) -> Result<Vec<String>, StorageError> {
        self.list_internal(None, dir).await
    }

    pub(crate) async fn list_internal(
        &self,
        namespace: Option<&str>,
        dir: impl AsRef<Path>,
    ) -> Result<Vec<String>, StorageError> {
        let resolved = self.resolve_internal(namespace, dir)?;
        if !resolved.is_dir() {
            return Err(StorageError::DirectoryNotFound {
                message: resolved.display().to_string().into(),
                context: None,
            });
        }
        tokio::task::spawn_blocking(move || maintenance::list_files(&resolved))
            .await
            .map_err(|err| StorageError::Io {
                source: std::io::Error::other(err),
                context: Some("Listing task failed".into()),
            })
    }

    /// Whether a file or directory exists at `path`.
    ///
    /// # Errors
    /// Only path resolution errors are reported. A missing entry is `Ok(false)`.
    pub fn exists(&self, path: impl AsRef<Path>) -> Result<bool, StorageError> {
        let resolved = self.resolve_internal(None, path)?;
        Ok(resolved.exists())
    }

    pub async fn purge_tmp(&self) {
        maintenance::purge_tmp(&self.root).await;
    }

    async fn sync_dir(path: &Path) {
        match fs::File::open(path).await {
            Ok(dir) => {
                if let Err(err) = dir.sync_all().await {
                    warn!(path = %path.display(), error = %err, "Directory sync failed");
                }
            },
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Directory open failed");
            },
        }
    }
}

fn unique_tmp_path(target: &Path, counter: &AtomicU64) -> PathBuf {
    let counter = counter.fetch_add(1, Ordering::Relaxed);
    let file_name = target.file_name().and_then(|s| s.to_str()).unwrap_or("asset");
    target.with_file_name(format!("{file_name}{TMP_MARKER}{counter}"))
}
