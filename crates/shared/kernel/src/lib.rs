//! Kernel utilities shared across slices.
//!
//! Pure pieces (config loading, access predicates, page contexts, form data) are always
//! available. The `server` feature adds the axum state, extractors, error mapping and the
//! system router.
//!
//! ## Config loading
//! ```rust,ignore
//! use expdj_kernel::config::load_config;
//! use expdj_kernel::domain::config::ApiConfig;
//!
//! let cfg: ApiConfig = load_config(Some("server"))?;
//! ```

pub mod config;
pub mod forms;
pub mod prelude;
pub mod render;
pub mod security;
#[cfg(feature = "server")]
pub mod server;

pub use expdj_database as database;
pub use expdj_domain as domain;
pub use expdj_storage as storage;
