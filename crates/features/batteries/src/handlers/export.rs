use crate::Batteries;
use crate::export::{Lineage, ResultTable, TSV_CONTENT_TYPE};
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use expdj_derive::api_handler;
use expdj_kernel::domain::constants::EXPORT_TAG;
use expdj_kernel::prelude::*;
use tracing::info;

fn attachment(file_name: &str, body: String) -> Response {
    (
        [
            (header::CONTENT_TYPE, TSV_CONTENT_TYPE.to_owned()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{file_name}\"")),
        ],
        body,
    )
        .into_response()
}

#[api_handler(
    get,
    path = "/batteries/{bid}/export",
    params(("bid" = i64, Path, description = "Battery id")),
    responses(
        (status = OK, description = "Tab-separated results of every experiment in the battery", content_type = "text/tab-separated-values"),
        (status = NOT_FOUND, description = "No such battery"),
    ),
    tag = EXPORT_TAG,
)]
pub(crate) async fn export_battery(
    State(state): State<ApiState>,
    Authenticated(_user): Authenticated,
    Path(bid): Path<Id>,
) -> ApiResult<Response> {
    let slice = state.try_get_slice::<Batteries>()?;
    let battery = get_battery(&state.database, bid).await?;
    let results = state.database.results_for_battery(bid).await?;
    let lineage = Lineage::load(&state.database, &results).await?;
    let table = ResultTable::flatten(&battery, &results, &lineage);

    info!(battery = bid, rows = table.len(), "Battery results exported");
    Ok(attachment(&slice.battery_file_name(bid), table.to_tsv()))
}

#[api_handler(
    get,
    path = "/experiments/deployed/{eid}/export",
    params(("eid" = i64, Path, description = "Experiment id")),
    responses(
        (status = OK, description = "Tab-separated results of one experiment", content_type = "text/tab-separated-values"),
        (status = NOT_FOUND, description = "No such experiment, or no battery contains it"),
    ),
    tag = EXPORT_TAG,
)]
pub(crate) async fn export_experiment(
    State(state): State<ApiState>,
    Authenticated(_user): Authenticated,
    Path(eid): Path<Id>,
) -> ApiResult<Response> {
    let slice = state.try_get_slice::<Batteries>()?;
    let experiment = get_experiment(&state.database, eid).await?;
    let template = get_template(&state.database, experiment.template).await?;
    let battery = state
        .database
        .batteries_with_experiment(eid)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found(format!("battery containing experiment {eid}")))?;

    let results = state.database.results_for_battery(battery.id).await?;
    let lineage = Lineage::load(&state.database, &results).await?;
    let mut table = ResultTable::flatten(&battery, &results, &lineage);
    table.retain_tags(&[template.tag.as_str()]);
    let tag = template.tag;

    info!(experiment = eid, tag = %tag, rows = table.len(), "Experiment results exported");
    Ok(attachment(&slice.experiment_file_name(&tag), table.to_tsv()))
}
