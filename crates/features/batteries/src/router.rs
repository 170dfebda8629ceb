use crate::handlers::{batteries, experiments, export};
use expdj_kernel::server::ApiState;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

/// Battery, battery experiment and export routes.
pub fn router() -> OpenApiRouter<ApiState> {
    OpenApiRouter::new()
        .routes(routes!(batteries::batteries_view))
        .routes(routes!(batteries::user_batteries_view))
        .routes(routes!(batteries::add_battery))
        .routes(routes!(batteries::new_battery, batteries::create_battery))
        .routes(routes!(batteries::view_battery))
        .routes(routes!(batteries::edit_battery, batteries::submit_battery))
        .routes(routes!(batteries::delete_battery))
        .routes(routes!(experiments::add_experiment))
        .routes(routes!(experiments::save_experiment))
        .routes(routes!(experiments::view_battery_experiment))
        .routes(routes!(experiments::edit_experiment, experiments::submit_experiment))
        .routes(routes!(experiments::remove_experiment))
        .routes(routes!(experiments::remove_condition))
        .routes(routes!(export::export_battery))
        .routes(routes!(export::export_experiment))
}
