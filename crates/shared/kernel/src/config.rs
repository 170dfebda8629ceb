use config::{Config, Environment, File};
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tracing::info;

/// Environment variables with this prefix override file values.
pub const ENV_PREFIX: &str = "EXPDJ";
/// Separates nesting levels in override names: `EXPDJ__SERVER__PORT`.
pub const ENV_SEPARATOR: &str = "__";

#[expdj_derive::expdj_error]
pub enum ConfigError {
    #[error("Config error{}: {source}", format_context(.context))]
    Config { source: config::ConfigError, context: Option<Cow<'static, str>> },
}

/// Loads `T` from a required file (default `server`, any format the `config` crate
/// recognises by extension) with `EXPDJ__*` environment overrides on top.
///
/// # Errors
/// Fails when the file is missing or the merged values do not deserialize into `T`.
///
/// # Example
/// ```rust
/// use expdj_kernel::config::load_config;
///
/// #[derive(Default, serde::Deserialize)]
/// struct AppConfig {
///     port: u16,
/// }
///
/// let cfg: AppConfig = load_config(Some("config/local")).unwrap_or_default();
/// ```
pub fn load_config<T>(path: Option<impl AsRef<Path>>) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    let path = path.map_or_else(|| PathBuf::from("server"), |p| p.as_ref().to_path_buf());
    info!(path = %path.display(), "Loading configuration");

    Config::builder()
        .add_source(File::from(path.as_path()).required(true))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator(ENV_SEPARATOR)
                .separator(ENV_SEPARATOR)
                .convert_case(config::Case::Snake),
        )
        .build()
        .context(format!("Reading {}", path.display()))?
        .try_deserialize::<T>()
        .context("Deserializing configuration")
}
