//! Facade crate for expdj features and shared modules.
//! Re-exports domain/kernel primitives and aggregates feature initialization.
//! Keep this crate thin: it should compose other crates, not implement business logic.
//!
//! ## Usage
//! - Add `expdj` with the `server` feature for HTTP handlers and routers.
//! - Call `expdj::init` to build the feature slices, then register them on the state.

pub use expdj_domain as domain;
use expdj_domain::config::ApiConfig;
use expdj_domain::registry::InitializedSlice;
pub use expdj_kernel as kernel;
use expdj_storage::Storage;

#[cfg(feature = "server")]
pub mod server {
    pub mod router {
        pub use expdj_batteries::router::router as batteries_router;
        pub use expdj_experiments::router::router as experiments_router;
        pub use expdj_kernel::server::router::system_router;
    }
}

/// Feature registry for runtime introspection.
pub mod features {
    pub use expdj_batteries as batteries;
    pub use expdj_experiments as experiments;

    /// Build-time enabled features (by Cargo feature).
    pub const ENABLED: &[&str] = &[
        "experiments",
        "batteries",
        #[cfg(feature = "server")]
        "server",
    ];

    #[must_use]
    pub fn is_enabled(name: &str) -> bool {
        ENABLED.contains(&name)
    }
}

/// Initializes every feature slice.
///
/// # Errors
/// Returns an error if the experiment asset namespace cannot be opened.
pub fn init(
    config: &ApiConfig,
    storage: &Storage,
) -> Result<Vec<InitializedSlice>, features::experiments::ExperimentsError> {
    let mut slices = Vec::new();

    // Experiment templates
    slices.push(features::experiments::init(config, storage)?);

    // Batteries
    slices.push(features::batteries::init());

    Ok(slices)
}
