use axum::Router;
use expdj::domain::constants::{EXPERIMENTS_NAMESPACE, EXPERIMENTS_STATIC_PREFIX};
use expdj::kernel::prelude::ApiState;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_scalar::{Scalar, Servable};

#[derive(OpenApi)]
#[openapi(info(title = "expdj", description = "Experiment battery service"))]
struct ApiDoc;

/// Composes every slice router, the API reference at `/api`, and the installed
/// experiment assets under `/static/experiments`.
pub fn app(state: ApiState) -> Router {
    let api = ApiDoc::openapi();
    let assets = ServeDir::new(state.storage.root().join(EXPERIMENTS_NAMESPACE));

    // Separate the OpenAPI routes and the API documentation object
    let (openapi_routes, api_doc) = OpenApiRouter::with_openapi(api)
        .merge(expdj::server::router::system_router())
        .merge(expdj::server::router::experiments_router())
        .merge(expdj::server::router::batteries_router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
        .split_for_parts();

    let scalar_routes = Scalar::with_url("/api", api_doc);

    Router::new()
        .merge(openapi_routes)
        .merge(scalar_routes)
        .nest_service(EXPERIMENTS_STATIC_PREFIX, assets)
}
