use crate::forms::BatteryForm;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use expdj_derive::api_handler;
use expdj_kernel::domain::constants::BATTERIES_TAG;
use expdj_kernel::prelude::*;
use tracing::{info, warn};

const NEW_BATTERY_HEADER: &str = "Add new battery";

fn edit_page(form: FormView, header_text: &str, is_owner: bool, users: Vec<User>) -> Page {
    Page::new(templates::EDIT_BATTERY)
        .with("form", form)
        .with("header_text", header_text)
        .with("is_owner", is_owner)
        .with("users", users)
}

#[api_handler(
    get,
    path = "/batteries",
    responses((status = OK, description = "All batteries")),
    tag = BATTERIES_TAG,
)]
pub(crate) async fn batteries_view(
    State(state): State<ApiState>,
    Authenticated(_user): Authenticated,
) -> ApiResult<Response> {
    let batteries = state.database.batteries().await?;
    state.render(&Page::new(templates::ALL_BATTERIES).with("batteries", batteries))
}

#[api_handler(
    get,
    path = "/users/{uid}/batteries",
    params(("uid" = i64, Path, description = "Owner user id")),
    responses((status = OK, description = "Batteries owned by the user")),
    tag = BATTERIES_TAG,
)]
pub(crate) async fn user_batteries_view(
    State(state): State<ApiState>,
    Authenticated(_user): Authenticated,
    Path(uid): Path<Id>,
) -> ApiResult<Response> {
    let batteries: Vec<Battery> =
        state.database.batteries().await?.into_iter().filter(|b| b.owner == uid).collect();
    state.render(&Page::new(templates::ALL_BATTERIES).with("batteries", batteries))
}

#[api_handler(
    get,
    path = "/batteries/{bid}",
    params(("bid" = i64, Path, description = "Battery id")),
    responses(
        (status = OK, description = "Battery with its HITs and experiments"),
        (status = NOT_FOUND, description = "No such battery"),
    ),
    tag = BATTERIES_TAG,
)]
pub(crate) async fn view_battery(
    State(state): State<ApiState>,
    Authenticated(user): Authenticated,
    Path(bid): Path<Id>,
) -> ApiResult<Response> {
    let battery = get_battery(&state.database, bid).await?;
    let hits = state.database.hits_for_battery(bid).await?;
    let experiments = state.database.experiments_in(&battery.experiments).await?;
    let has_results = state.database.has_results(bid).await?;
    let access = Access::for_battery(&user, &battery);

    state.render(
        &Page::new(templates::BATTERY_DETAILS)
            .with("battery", battery)
            .with("hits", hits)
            .with("experiments", experiments)
            .with("edit_permission", access.can_edit())
            .with("delete_permission", access.can_delete())
            .with("has_results", has_results),
    )
}

#[api_handler(
    get,
    path = "/batteries/add",
    responses((status = SEE_OTHER, description = "Redirects to the battery list")),
    tag = BATTERIES_TAG,
)]
pub(crate) async fn add_battery(Authenticated(_user): Authenticated) -> Redirect {
    Redirect::to("/batteries")
}

#[api_handler(
    get,
    path = "/batteries/new",
    responses((status = OK, description = "Empty battery form")),
    tag = BATTERIES_TAG,
)]
pub(crate) async fn new_battery(
    State(state): State<ApiState>,
    Authenticated(_user): Authenticated,
) -> ApiResult<Response> {
    let users = state.database.users().await?;
    state.render(&edit_page(FormView::bound(&BatteryForm::default()), NEW_BATTERY_HEADER, true, users))
}

#[api_handler(
    post,
    path = "/batteries/new",
    responses(
        (status = SEE_OTHER, description = "Created; redirects to the battery"),
        (status = OK, description = "Form re-rendered with validation errors"),
    ),
    tag = BATTERIES_TAG,
)]
pub(crate) async fn create_battery(
    State(state): State<ApiState>,
    Authenticated(user): Authenticated,
    form: FormData,
) -> ApiResult<Response> {
    let owner = user.id().ok_or_else(|| ApiError::unauthorized("login required"))?;

    let users = state.database.users().await?;

    match BatteryForm::parse(&form, &users) {
        Ok(values) => {
            let mut battery = Battery { owner, ..Battery::default() };
            values.apply(&mut battery, true);
            let bid = state.database.insert_battery(battery).await?;
            info!(battery = bid, owner, "Battery created");
            Ok(Redirect::to(&format!("/batteries/{bid}")).into_response())
        },
        Err(errors) => {
            state.render(&edit_page(FormView::invalid(&form, errors), NEW_BATTERY_HEADER, true, users))
        },
    }
}

#[api_handler(
    get,
    path = "/batteries/{bid}/edit",
    params(("bid" = i64, Path, description = "Battery id")),
    responses(
        (status = OK, description = "Battery form bound to the stored values"),
        (status = FORBIDDEN, description = "Not the owner, a contributor or a superuser"),
        (status = NOT_FOUND, description = "No such battery"),
    ),
    tag = BATTERIES_TAG,
)]
pub(crate) async fn edit_battery(
    State(state): State<ApiState>,
    Authenticated(user): Authenticated,
    Path(bid): Path<Id>,
) -> ApiResult<Response> {
    let battery = get_battery(&state.database, bid).await?;
    if !can_edit_battery(&user, &battery) {
        return Err(ApiError::forbidden(format!("battery {bid} is not editable by this user")));
    }

    let is_owner = user.id() == Some(battery.owner);
    let users = state.database.users().await?;
    state.render(&edit_page(FormView::bound(&BatteryForm::from(&battery)), &battery.name, is_owner, users))
}

#[api_handler(
    post,
    path = "/batteries/{bid}/edit",
    params(("bid" = i64, Path, description = "Battery id")),
    responses(
        (status = SEE_OTHER, description = "Saved; redirects to the battery"),
        (status = OK, description = "Form re-rendered with validation errors"),
        (status = FORBIDDEN, description = "Not the owner, a contributor or a superuser"),
        (status = NOT_FOUND, description = "No such battery"),
    ),
    tag = BATTERIES_TAG,
)]
pub(crate) async fn submit_battery(
    State(state): State<ApiState>,
    Authenticated(user): Authenticated,
    Path(bid): Path<Id>,
    form: FormData,
) -> ApiResult<Response> {
    let battery = get_battery(&state.database, bid).await?;
    if !can_edit_battery(&user, &battery) {
        return Err(ApiError::forbidden(format!("battery {bid} is not editable by this user")));
    }
    let is_owner = user.id() == Some(battery.owner);

    let users = state.database.users().await?;

    match BatteryForm::parse(&form, &users) {
        Ok(values) => {
            let mut record = battery;
            let added = values.apply(&mut record, is_owner);
            state.database.update_battery(&record).await?;
            for contributor in added {
                info!(battery = bid, contributor, "Contributor added to battery");
            }
            info!(battery = bid, "Battery updated");
            Ok(Redirect::to(&format!("/batteries/{bid}")).into_response())
        },
        Err(errors) => {
            state.render(&edit_page(FormView::invalid(&form, errors), &battery.name, is_owner, users))
        },
    }
}

#[api_handler(
    post,
    path = "/batteries/{bid}/delete",
    params(("bid" = i64, Path, description = "Battery id")),
    responses(
        (status = SEE_OTHER, description = "Redirects to the battery list"),
        (status = NOT_FOUND, description = "No such battery"),
    ),
    tag = BATTERIES_TAG,
)]
pub(crate) async fn delete_battery(
    State(state): State<ApiState>,
    Authenticated(user): Authenticated,
    Path(bid): Path<Id>,
) -> ApiResult<Response> {
    let battery = get_battery(&state.database, bid).await?;

    if owner_or_super(&user, &battery) {
        state.database.delete_battery(bid).await?;
        info!(battery = bid, "Battery deleted");
    } else {
        warn!(battery = bid, user = ?user.id(), "Battery deletion denied");
    }
    Ok(Redirect::to("/batteries").into_response())
}
