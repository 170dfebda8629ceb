//! Sandboxed storage for installed experiment assets.
//!
//! # Core Features
//!
//! - **Sandbox Security**: every path is resolved against a canonical root and rejected if it escapes.
//! - **Atomic Writes**: unique temp file, `fsync`, then `rename`.
//! - **Namespaces**: scoped views such as `experiments/` sharing one sandbox.
//! - **Self-Healing**: stale temp files are purged when the storage connects.
//!
//! # Examples
//!
//! ```rust
//! use expdj_storage::{Storage, StorageError};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), StorageError> {
//!     # let tmp = tempfile::tempdir().unwrap();
//!     # let root = tmp.path().join("media");
//!     let storage = Storage::builder().root(&root).create(true).connect().await?;
//!     let experiments = storage.namespace("experiments")?;
//!
//!     experiments.write("stroop/config.json", b"{}").await?;
//!     assert_eq!(experiments.list("stroop").await?, vec!["config.json".to_owned()]);
//!
//!     experiments.remove_dir("stroop").await?;
//!     assert!(!experiments.exists("stroop")?);
//!     Ok(())
//! }
//! ```

mod builder;
mod engine;
mod error;
mod maintenance;
mod namespace;
mod security;

pub use builder::StorageBuilder;
pub use engine::Storage;
pub use error::{StorageError, StorageErrorExt};
pub use namespace::{NamespaceName, NamespacedStorage};
