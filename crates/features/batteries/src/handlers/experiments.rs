use crate::credits::update_credits;
use crate::forms::ExperimentForm;
use crate::lineup;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use expdj_derive::api_handler;
use expdj_kernel::domain::constants::BATTERIES_TAG;
use expdj_kernel::prelude::*;
use tracing::{info, warn};

fn forbidden(bid: Id) -> ApiError {
    ApiError::forbidden(format!("battery {bid} is not editable by this user"))
}

async fn load_pair(state: &ApiState, bid: Id, eid: Id) -> ApiResult<(Battery, Experiment)> {
    Ok((get_battery(&state.database, bid).await?, get_experiment(&state.database, eid).await?))
}

/// Context of `edit_experiment.html`: the form, the records, and the conditions with their variables.
async fn edit_experiment_page(database: &Database, battery: &Battery, experiment: &Experiment) -> ApiResult<Page> {
    let template = database.template(experiment.template).await?;
    let conditions = database.conditions_in(&experiment.credit_conditions).await?;
    let variable_ids: Vec<Id> = conditions.iter().map(|c| c.variable).collect();
    let variables: Vec<ExperimentVariable> = database.variables_in(&variable_ids).await?;

    Ok(Page::new(templates::EDIT_EXPERIMENT)
        .with("form", FormView::bound(&ExperimentForm::from(experiment)))
        .with("battery", battery)
        .with("experiment", experiment)
        .with("template", template)
        .with("conditions", conditions)
        .with("variables", variables))
}

#[api_handler(
    get,
    path = "/batteries/{bid}/experiments/{eid}",
    params(
        ("bid" = i64, Path, description = "Battery id"),
        ("eid" = i64, Path, description = "Experiment id"),
    ),
    responses(
        (status = OK, description = "Experiment as configured in the battery"),
        (status = NOT_FOUND, description = "No such battery or experiment"),
    ),
    tag = BATTERIES_TAG,
)]
pub(crate) async fn view_battery_experiment(
    State(state): State<ApiState>,
    Authenticated(user): Authenticated,
    Path((bid, eid)): Path<(Id, Id)>,
) -> ApiResult<Response> {
    let (battery, experiment) = load_pair(&state, bid, eid).await?;
    let template = state.database.template(experiment.template).await?;
    let conditions: Vec<CreditCondition> = state.database.conditions_in(&experiment.credit_conditions).await?;
    let access = Access::for_battery(&user, &battery);

    state.render(
        &Page::new(templates::EXPERIMENT_DETAILS)
            .with("experiment", experiment)
            .with("template", template)
            .with("conditions", conditions)
            .with("battery", battery)
            .with("edit_permission", access.can_edit())
            .with("delete_permission", access.can_delete()),
    )
}

#[api_handler(
    get,
    path = "/batteries/{bid}/experiments/add",
    params(("bid" = i64, Path, description = "Battery id")),
    responses(
        (status = OK, description = "Templates not yet placed in the battery"),
        (status = NOT_FOUND, description = "No such battery"),
    ),
    tag = BATTERIES_TAG,
)]
pub(crate) async fn add_experiment(
    State(state): State<ApiState>,
    Authenticated(_user): Authenticated,
    Path(bid): Path<Id>,
) -> ApiResult<Response> {
    let battery = get_battery(&state.database, bid).await?;
    let (newexperiments, newexperimentsjson) = lineup::addable_templates(&state.database, &battery).await?;

    state.render(
        &Page::new(templates::ADD_EXPERIMENT)
            .with("newexperiments", newexperiments)
            .with("newexperimentsjson", newexperimentsjson)
            .with("bid", bid),
    )
}

#[api_handler(
    post,
    path = "/batteries/{bid}/experiments/save",
    params(("bid" = i64, Path, description = "Battery id")),
    responses(
        (status = SEE_OTHER, description = "Saved; redirects to the battery"),
        (status = BAD_REQUEST, description = "Missing or malformed template id"),
        (status = FORBIDDEN, description = "Battery not editable by this user"),
        (status = NOT_FOUND, description = "No such battery, template or variable"),
    ),
    tag = BATTERIES_TAG,
)]
pub(crate) async fn save_experiment(
    State(state): State<ApiState>,
    Authenticated(user): Authenticated,
    Path(bid): Path<Id>,
    form: FormData,
) -> ApiResult<Response> {
    let battery = get_battery(&state.database, bid).await?;
    if !can_edit_battery(&user, &battery) {
        return Err(forbidden(bid));
    }

    lineup::save_experiment(&state.database, bid, &form).await?;
    Ok(Redirect::to(&format!("/batteries/{bid}")).into_response())
}

#[api_handler(
    get,
    path = "/batteries/{bid}/experiments/{eid}/edit",
    params(
        ("bid" = i64, Path, description = "Battery id"),
        ("eid" = i64, Path, description = "Experiment id"),
    ),
    responses(
        (status = OK, description = "Experiment form bound to the stored switches"),
        (status = NOT_FOUND, description = "No such battery or experiment"),
    ),
    tag = BATTERIES_TAG,
)]
pub(crate) async fn edit_experiment(
    State(state): State<ApiState>,
    Authenticated(_user): Authenticated,
    Path((bid, eid)): Path<(Id, Id)>,
) -> ApiResult<Response> {
    let (battery, experiment) = load_pair(&state, bid, eid).await?;
    state.render(&edit_experiment_page(&state.database, &battery, &experiment).await?)
}

#[api_handler(
    post,
    path = "/batteries/{bid}/experiments/{eid}/edit",
    params(
        ("bid" = i64, Path, description = "Battery id"),
        ("eid" = i64, Path, description = "Experiment id"),
    ),
    responses(
        (status = SEE_OTHER, description = "Saved; redirects to the battery"),
        (status = FORBIDDEN, description = "Battery not editable by this user"),
        (status = NOT_FOUND, description = "No such battery or experiment"),
    ),
    tag = BATTERIES_TAG,
)]
pub(crate) async fn submit_experiment(
    State(state): State<ApiState>,
    Authenticated(user): Authenticated,
    Path((bid, eid)): Path<(Id, Id)>,
    form: FormData,
) -> ApiResult<Response> {
    let (battery, mut experiment) = load_pair(&state, bid, eid).await?;
    if !can_edit_battery(&user, &battery) {
        return Err(forbidden(bid));
    }

    ExperimentForm::parse(&form).apply(&mut experiment);
    state.database.set_credit_switches(eid, experiment.include_bonus, experiment.include_catch).await?;
    update_credits(&state.database, eid).await?;
    info!(battery = bid, experiment = eid, "Battery experiment updated");
    Ok(Redirect::to(&format!("/batteries/{bid}")).into_response())
}

#[api_handler(
    post,
    path = "/batteries/{bid}/experiments/{eid}/remove",
    params(
        ("bid" = i64, Path, description = "Battery id"),
        ("eid" = i64, Path, description = "Experiment id"),
    ),
    responses(
        (status = SEE_OTHER, description = "Redirects to the battery"),
        (status = NOT_FOUND, description = "No such battery or experiment"),
    ),
    tag = BATTERIES_TAG,
)]
pub(crate) async fn remove_experiment(
    State(state): State<ApiState>,
    Authenticated(user): Authenticated,
    Path((bid, eid)): Path<(Id, Id)>,
) -> ApiResult<Response> {
    let (battery, _) = load_pair(&state, bid, eid).await?;

    if can_edit_battery(&user, &battery) {
        let deleted = lineup::remove_experiment(&state.database, bid, eid).await?;
        info!(battery = bid, experiment = eid, deleted, "Experiment removed from battery");
    } else {
        warn!(battery = bid, experiment = eid, user = ?user.id(), "Experiment removal denied");
    }
    Ok(Redirect::to(&format!("/batteries/{bid}")).into_response())
}

#[api_handler(
    post,
    path = "/batteries/{bid}/experiments/{eid}/conditions/{cid}/remove",
    params(
        ("bid" = i64, Path, description = "Battery id"),
        ("eid" = i64, Path, description = "Experiment id"),
        ("cid" = i64, Path, description = "Credit condition id"),
    ),
    responses(
        (status = OK, description = "Experiment form after the condition was removed"),
        (status = FORBIDDEN, description = "Battery not editable by this user"),
        (status = NOT_FOUND, description = "No such battery, experiment or condition"),
    ),
    tag = BATTERIES_TAG,
)]
pub(crate) async fn remove_condition(
    State(state): State<ApiState>,
    Authenticated(user): Authenticated,
    Path((bid, eid, cid)): Path<(Id, Id, Id)>,
) -> ApiResult<Response> {
    let (battery, _) = load_pair(&state, bid, eid).await?;
    if state.database.condition(cid).await?.is_none() {
        return Err(ApiError::not_found(format!("credit condition {cid}")));
    }
    if !can_edit_battery(&user, &battery) {
        return Err(forbidden(bid));
    }

    let deleted = lineup::remove_condition(&state.database, eid, cid).await?;
    info!(experiment = eid, condition = cid, deleted, "Credit condition removed");
    let experiment = get_experiment(&state.database, eid).await?;
    state.render(&edit_experiment_page(&state.database, &battery, &experiment).await?)
}
