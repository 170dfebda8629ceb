//! Experiment templates feature slice.
//!
//! Installs experiment packages from an [`ExperimentLibrary`] into asset storage and the
//! record store, previews installed experiments, and manages template metadata.

pub mod assets;
pub mod catalog;
mod error;
pub mod forms;
#[cfg(feature = "server")]
mod handlers;
pub mod library;
pub mod manifest;
pub mod preview;
#[cfg(feature = "server")]
pub mod router;

pub use assets::ExperimentAssets;
pub use error::{ExperimentsError, ExperimentsErrorExt};
pub use library::{ExperimentLibrary, ExperimentPackage, LocalLibrary};
pub use manifest::ExperimentManifest;

use expdj_kernel::database::models::Id;
use expdj_kernel::database::Database;
use expdj_kernel::domain::config::ApiConfig;
use expdj_kernel::domain::registry::InitializedSlice;
use expdj_kernel::storage::Storage;
use std::sync::Arc;
use tracing::info;

/// Experiment templates feature state.
#[expdj_derive::expdj_slice]
pub struct Experiments {
    pub library: Arc<dyn ExperimentLibrary>,
    pub assets: ExperimentAssets,
}

impl ExperimentsInner {
    /// Installs `tags` and returns those that failed.
    pub async fn install(&self, database: &Database, tags: &[String]) -> Vec<String> {
        self.library.install(tags, database, &self.assets).await
    }

    /// Removes the asset folder and then the template with its cascades.
    /// Returns the tag, or `None` if the template was already gone.
    ///
    /// # Errors
    /// Storage failures other than a missing folder.
    pub async fn uninstall(&self, database: &Database, id: Id) -> Result<Option<String>, ExperimentsError> {
        let Some(template) = database.template(id).await? else {
            return Ok(None);
        };
        self.assets.remove(&template.tag).await?;
        database.delete_template(id).await?;
        Ok(Some(template.tag))
    }
}

/// Initializes the slice with a [`LocalLibrary`] rooted at `library.path`.
///
/// # Errors
/// Returns an error if the experiments storage namespace cannot be opened.
pub fn init(config: &ApiConfig, storage: &Storage) -> Result<InitializedSlice, ExperimentsError> {
    init_with_library(Arc::new(LocalLibrary::new(&config.library.path)), storage)
}

/// Initializes the slice with a custom library.
///
/// # Errors
/// Returns an error if the experiments storage namespace cannot be opened.
pub fn init_with_library(
    library: Arc<dyn ExperimentLibrary>,
    storage: &Storage,
) -> Result<InitializedSlice, ExperimentsError> {
    let assets = ExperimentAssets::new(storage)?;
    info!(library = ?library, "Experiments slice initialized");
    Ok(Experiments::new(ExperimentsInner { library, assets }).into())
}
