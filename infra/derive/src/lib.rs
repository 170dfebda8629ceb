#![allow(unreachable_pub)]
#![allow(clippy::needless_pass_by_value)]

//! # Macros
//!
//! Procedural macros shared by every crate of the workspace: error enums with
//! HTTP status mapping, feature slice handles, `OpenAPI`-aware handlers and models,
//! and the runtime entry point.

mod macros;

use proc_macro::TokenStream;
use syn::{DeriveInput, ItemFn, ItemStruct, parse_macro_input};

/// Bootstraps a Tokio runtime profile around an `async fn main`.
///
/// Accepted profiles: `high_performance`, `memory_efficient`, `default`.
///
/// ```rust,ignore
/// #[expdj_runtime::main(high_performance)]
/// async fn main() -> anyhow::Result<()> {
///     Ok(())
/// }
/// ```
#[proc_macro_attribute]
pub fn main(args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);
    macros::runtime::expand_main(args.into(), input).into()
}

/// Declares an API data model.
///
/// Adds `Debug`, `Serialize` and `Deserialize` when missing, derives `utoipa::ToSchema`
/// under the `server` feature, and applies `rename_all = "camelCase"` plus
/// `deny_unknown_fields` unless overridden.
///
/// ```rust,ignore
/// #[api_model(rename_all = "snake_case", deny_unknown_fields = false)]
/// pub struct BatterySummary {
///     pub id: u64,
///     pub name: String,
/// }
/// ```
#[proc_macro_attribute]
pub fn api_model(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemStruct);
    macros::api::expand_api_model(attr.into(), input).into()
}

/// Registers an axum handler with `utoipa::path` when the `server` feature is enabled.
///
/// ```rust,ignore
/// #[api_handler(get, path = "/batteries", tag = BATTERIES_TAG)]
/// pub async fn batteries_view(State(state): State<ApiState>) -> ApiResult<Response> {
///     // ...
/// }
/// ```
#[proc_macro_attribute]
pub fn api_handler(args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);
    macros::api::expand_api_handler(args.into(), input).into()
}

/// Turns an enum into a context-aware error type.
///
/// # Generated Items
///
/// * `#[derive(Debug, thiserror::Error)]` when not already derived.
/// * `<ErrorName>Ext` trait with `.context(...)` for `Result<T, ErrorName>` and for
///   `Result<T, SourceError>` of every variant holding a `source` field.
/// * `From<SourceError>` for variants with a source field.
/// * `From<&'static str>` and `From<String>` when an `Internal` variant is present.
/// * `status_code(&self) -> u16` when at least one variant carries `#[http(status = N)]`.
///   Variants without the attribute map to `500`.
///
/// # Requirements
///
/// Variants must use named fields. Variants with a source must also hold
/// `context: Option<Cow<'static, str>>`.
///
/// # Example
///
/// ```rust,ignore
/// #[expdj_error]
/// pub enum LookupError {
///     #[http(status = 404)]
///     #[error("Not found{}: {message}", format_context(.context))]
///     NotFound { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
///
///     #[error("IO error{}: {source}", format_context(.context))]
///     Io { source: std::io::Error, context: Option<Cow<'static, str>> },
/// }
/// ```
#[proc_macro_attribute]
pub fn expdj_error(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    macros::error::expand_derive(input).into()
}

/// Defines a feature slice handle.
///
/// The annotated struct becomes `<Name>Inner`; `<Name>` is an `Arc` wrapper that
/// derefs to it, implements `FeatureSlice`, and converts into `InitializedSlice`.
///
/// ```rust,ignore
/// #[expdj_derive::expdj_slice]
/// pub struct Batteries {
///     pub export_prefix: String,
/// }
///
/// let slice = Batteries::new(BatteriesInner { export_prefix: "expfactory".to_owned() });
/// ```
#[proc_macro_attribute]
pub fn expdj_slice(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(item as ItemStruct);
    macros::slice::expand_slice(input).into()
}
