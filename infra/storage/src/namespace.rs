use crate::engine::Storage;
use crate::error::StorageError;
use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A validated namespace directory name: ASCII alphanumerics, `_` and `-`, lowercased.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamespaceName(pub String);

impl TryFrom<String> for NamespaceName {
    type Error = StorageError;

    fn try_from(value: String) -> Result<Self, StorageError> {
        Self::try_from(value.as_str())
    }
}

impl TryFrom<&str> for NamespaceName {
    type Error = StorageError;

    fn try_from(value: &str) -> Result<Self, StorageError> {
        let name = value.to_lowercase();

        if name.is_empty() {
            return Err(StorageError::PathTraversalAttempt {
                message: "EMPTY".into(),
                context: Some("Namespace cannot be empty".into()),
            });
        }

        if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            return Err(StorageError::PathTraversalAttempt {
                message: name.into(),
                context: Some("Namespace contains illegal characters".into()),
            });
        }

        Ok(Self(name))
    }
}

impl AsRef<str> for NamespaceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NamespaceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A view of [`Storage`] where every path is relative to `<root>/<namespace>/`.
///
/// Shares the parent's sandbox. Cloning only bumps reference counts.
#[derive(Debug, Clone)]
pub struct NamespacedStorage {
    storage: Storage,
    namespace: Arc<Cow<'static, str>>,
}

impl NamespacedStorage {
    pub(crate) fn new(storage: Storage, namespace: impl Into<Cow<'static, str>>) -> Self {
        Self { storage, namespace: Arc::new(namespace.into()) }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.namespace
    }

    /// Physical path of `path` inside this namespace.
    ///
    /// # Errors
    /// Returns [`StorageError::PathTraversalAttempt`] if the path leaves the namespace.
    pub fn resolve(&self, path: impl AsRef<Path>) -> Result<PathBuf, StorageError> {
        self.storage.resolve_internal(Some(&self.namespace), path)
    }

    /// # Errors
    /// See [`Storage::read`].
    pub async fn read(&self, path: impl AsRef<Path>) -> Result<Vec<u8>, StorageError> {
        self.storage.read_internal(Some(&self.namespace), path).await
    }

    /// # Errors
    /// See [`Storage::write`].
    pub async fn write(&self, path: impl AsRef<Path>, data: &[u8]) -> Result<(), StorageError> {
        self.storage.write_internal(Some(&self.namespace), path, data).await
    }

    /// # Errors
    /// See [`Storage::delete`].
    pub async fn delete(&self, path: impl AsRef<Path>) -> Result<(), StorageError> {
        self.storage.delete_internal(Some(&self.namespace), path).await
    }

    /// # Errors
    /// See [`Storage::remove_dir`].
    pub async fn remove_dir(&self, path: impl AsRef<Path>) -> Result<(), StorageError> {
        self.storage.remove_dir_internal(Some(&self.namespace), path).await
    }

    /// # Errors
    /// See [`Storage::list`].
    pub async fn list(&self, dir: impl AsRef<Path>) -> Result<Vec<String>, StorageError> {
        self.storage.list_internal(Some(&self.namespace), dir).await
    }

    /// # Errors
    /// Only path resolution errors are reported.
    pub fn exists(&self, path: impl AsRef<Path>) -> Result<bool, StorageError> {
        Ok(self.resolve(path)?.exists())
    }
}
