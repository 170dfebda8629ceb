use crate::handlers;
use expdj_kernel::server::ApiState;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

/// Experiment template routes.
pub fn router() -> OpenApiRouter<ApiState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::experiments_view))
        .routes(routes!(handlers::add_experiment_template))
        .routes(routes!(handlers::save_experiment_template))
        .routes(routes!(handlers::edit_experiment_template_redirect))
        .routes(routes!(handlers::update_experiment_templates))
        .routes(routes!(handlers::view_experiment_template))
        .routes(routes!(handlers::preview_experiment))
        .routes(routes!(handlers::edit_experiment_template, handlers::submit_experiment_template))
        .routes(routes!(handlers::delete_experiment_template))
        .routes(routes!(handlers::update_experiment_template))
}
