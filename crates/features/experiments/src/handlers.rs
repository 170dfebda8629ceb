use crate::catalog::{self, install_message, update_message};
use crate::error::ExperimentsError;
use crate::forms::TemplateForm;
use crate::preview::{embed_experiment, url_prefix};
use crate::Experiments;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use expdj_derive::api_handler;
use expdj_kernel::database::models::ExperimentTemplate;
use expdj_kernel::domain::constants::EXPERIMENTS_TAG;
use expdj_kernel::prelude::*;
use expdj_kernel::storage::StorageError;
use serde_json::Value;
use tracing::{info, warn};


fn experiments_page(experiments: Vec<ExperimentTemplate>, user: &CurrentUser) -> Page {
    Page::new(templates::ALL_EXPERIMENTS)
        .with("experiments", experiments)
        .with("delete_permission", can_edit_experiments(user))
}

#[api_handler(
    get,
    path = "/experiments",
    responses((status = OK, description = "All installed experiment templates")),
    tag = EXPERIMENTS_TAG,
)]
pub(crate) async fn experiments_view(
    State(state): State<ApiState>,
    Authenticated(user): Authenticated,
) -> ApiResult<Response> {
    let experiments = state.database.templates().await?;
    state.render(&experiments_page(experiments, &user))
}

#[api_handler(
    get,
    path = "/experiments/{eid}",
    params(("eid" = i64, Path, description = "Experiment template id")),
    responses(
        (status = OK, description = "Experiment template details"),
        (status = NOT_FOUND, description = "No such template"),
    ),
    tag = EXPERIMENTS_TAG,
)]
pub(crate) async fn view_experiment_template(
    State(state): State<ApiState>,
    Authenticated(user): Authenticated,
    Path(eid): Path<Id>,
) -> ApiResult<Response> {
    let experiment = get_template(&state.database, eid).await?;
    let access = Access::for_templates(&user);

    state.render(
        &Page::new(templates::EXPERIMENT_TEMPLATE_DETAILS)
            .with("experiment", experiment)
            .with("edit_permission", access.can_edit())
            .with("delete_permission", access.can_delete())
            .with("battery", Value::Null),
    )
}

#[api_handler(
    get,
    path = "/experiments/{eid}/preview",
    params(("eid" = i64, Path, description = "Experiment template id")),
    responses(
        (status = OK, description = "Runnable preview of the installed experiment"),
        (status = NOT_FOUND, description = "No such template, or its files are not installed"),
    ),
    tag = EXPERIMENTS_TAG,
)]
pub(crate) async fn preview_experiment(
    State(state): State<ApiState>,
    Authenticated(_user): Authenticated,
    Path(eid): Path<Id>,
) -> ApiResult<Response> {
    let experiment = get_template(&state.database, eid).await?;
    let slice = state.try_get_slice::<Experiments>()?;

    let manifest = match slice.assets.manifest(&experiment.tag).await {
        Ok(manifest) => manifest,
        Err(ExperimentsError::Storage {
            source: StorageError::FileNotFound { .. } | StorageError::DirectoryNotFound { .. },
            ..
        }) => {
            return Err(ApiError::not_found(format!("installed files of '{}'", experiment.tag)));
        },
        Err(err) => return Err(err.into()),
    };
    let preview_html = embed_experiment(&manifest, &url_prefix(&experiment.tag));
    let files = slice.assets.files(&experiment.tag).await?;

    state.render(
        &Page::new(templates::EXPERIMENT_PREVIEW)
            .with("preview_html", preview_html)
            .with("files", files)
            .with("experiment", experiment),
    )
}

#[api_handler(
    get,
    path = "/experiments/add",
    responses((status = OK, description = "Library experiments that are not installed yet")),
    tag = EXPERIMENTS_TAG,
)]
pub(crate) async fn add_experiment_template(
    State(state): State<ApiState>,
    Authenticated(_user): Authenticated,
) -> ApiResult<Response> {
    let slice = state.try_get_slice::<Experiments>()?;
    let selection = slice.library.selection().await?;
    let experiments = state.database.templates().await?;
    let newexperiments = catalog::available(selection, &experiments);

    state.render(
        &Page::new(templates::ADD_EXPERIMENT_TEMPLATE)
            .with("newexperiments", newexperiments)
            .with("experiments", experiments),
    )
}

#[api_handler(
    post,
    path = "/experiments/save",
    responses((status = OK, description = "Installation outcome with the updated template list")),
    tag = EXPERIMENTS_TAG,
)]
pub(crate) async fn save_experiment_template(
    State(state): State<ApiState>,
    Authenticated(user): Authenticated,
    form: FormData,
) -> ApiResult<Response> {
    let slice = state.try_get_slice::<Experiments>()?;
    let selection = slice.library.selection().await?;
    let tags = catalog::selected_tags(&selection, form.keys());

    let failed = slice.install(&state.database, &tags).await;
    info!(requested = tags.len(), failed = failed.len(), "Experiment install finished");

    let experiments = state.database.templates().await?;
    state.render(&experiments_page(experiments, &user).with("message", install_message(&failed)))
}

#[api_handler(
    get,
    path = "/experiments/edit",
    responses((status = SEE_OTHER, description = "Redirects to the install page")),
    tag = EXPERIMENTS_TAG,
)]
pub(crate) async fn edit_experiment_template_redirect(Authenticated(_user): Authenticated) -> Redirect {
    Redirect::to("/experiments/add")
}

#[api_handler(
    get,
    path = "/experiments/{eid}/edit",
    params(("eid" = i64, Path, description = "Experiment template id")),
    responses(
        (status = OK, description = "Template form bound to the stored values"),
        (status = NOT_FOUND, description = "No such template"),
    ),
    tag = EXPERIMENTS_TAG,
)]
pub(crate) async fn edit_experiment_template(
    State(state): State<ApiState>,
    Authenticated(_user): Authenticated,
    Path(eid): Path<Id>,
) -> ApiResult<Response> {
    let experiment = get_template(&state.database, eid).await?;
    let form = FormView::bound(&TemplateForm::from(&experiment));

    state.render(
        &Page::new(templates::EDIT_EXPERIMENT_TEMPLATE)
            .with("form", form)
            .with("experiment", experiment),
    )
}

#[api_handler(
    post,
    path = "/experiments/{eid}/edit",
    params(("eid" = i64, Path, description = "Experiment template id")),
    responses(
        (status = SEE_OTHER, description = "Saved; redirects to the template"),
        (status = OK, description = "Form re-rendered with validation errors"),
        (status = FORBIDDEN, description = "Only superusers edit templates"),
        (status = NOT_FOUND, description = "No such template"),
    ),
    tag = EXPERIMENTS_TAG,
)]
pub(crate) async fn submit_experiment_template(
    State(state): State<ApiState>,
    Authenticated(user): Authenticated,
    Path(eid): Path<Id>,
    form: FormData,
) -> ApiResult<Response> {
    let experiment = get_template(&state.database, eid).await?;
    if !can_edit_experiments(&user) {
        return Err(ApiError::forbidden("only superusers may edit experiment templates"));
    }

    match TemplateForm::parse(&form) {
        Ok(values) => {
            let mut template = experiment;
            values.apply(&mut template);
            state.database.update_template(&template).await?;
            info!(template = eid, "Experiment template updated");
            Ok(Redirect::to(&format!("/experiments/{eid}")).into_response())
        },
        Err(errors) => state.render(
            &Page::new(templates::EDIT_EXPERIMENT_TEMPLATE)
                .with("form", FormView::invalid(&form, errors))
                .with("experiment", experiment),
        ),
    }
}

#[api_handler(
    post,
    path = "/experiments/{eid}/delete",
    params(("eid" = i64, Path, description = "Experiment template id")),
    responses(
        (status = SEE_OTHER, description = "Redirects to the template list"),
        (status = NOT_FOUND, description = "No such template"),
    ),
    tag = EXPERIMENTS_TAG,
)]
pub(crate) async fn delete_experiment_template(
    State(state): State<ApiState>,
    Authenticated(user): Authenticated,
    Path(eid): Path<Id>,
) -> ApiResult<Response> {
    let experiment = get_template(&state.database, eid).await?;

    if can_edit_experiments(&user) {
        let slice = state.try_get_slice::<Experiments>()?;
        slice.uninstall(&state.database, eid).await?;
    } else {
        warn!(template = eid, tag = %experiment.tag, user = ?user.id(), "Template deletion denied");
    }
    Ok(Redirect::to("/experiments").into_response())
}

#[api_handler(
    post,
    path = "/experiments/update",
    responses(
        (status = OK, description = "Reinstall outcome with the template list"),
        (status = FORBIDDEN, description = "Only superusers update templates"),
    ),
    tag = EXPERIMENTS_TAG,
)]
pub(crate) async fn update_experiment_templates(
    State(state): State<ApiState>,
    Authenticated(user): Authenticated,
) -> ApiResult<Response> {
    reinstall(&state, &user, None).await
}

#[api_handler(
    post,
    path = "/experiments/{eid}/update",
    params(("eid" = i64, Path, description = "Experiment template id")),
    responses(
        (status = OK, description = "Reinstall outcome with the template list"),
        (status = FORBIDDEN, description = "Only superusers update templates"),
        (status = NOT_FOUND, description = "No such template"),
    ),
    tag = EXPERIMENTS_TAG,
)]
pub(crate) async fn update_experiment_template(
    State(state): State<ApiState>,
    Authenticated(user): Authenticated,
    Path(eid): Path<Id>,
) -> ApiResult<Response> {
    reinstall(&state, &user, Some(eid)).await
}

/// Deletes the chosen templates, all of them when `eid` is `None`, and installs their tags again.
async fn reinstall(state: &ApiState, user: &CurrentUser, eid: Option<Id>) -> ApiResult<Response> {
    if !can_edit_experiments(user) {
        return Err(ApiError::forbidden("only superusers may update experiment templates"));
    }
    let ids = match eid {
        Some(eid) => vec![get_template(&state.database, eid).await?.id],
        None => state.database.templates().await?.into_iter().map(|t| t.id).collect(),
    };

    let slice = state.try_get_slice::<Experiments>()?;
    let mut tags = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(tag) = slice.uninstall(&state.database, id).await? {
            tags.push(tag);
        }
    }
    let failed = slice.install(&state.database, &tags).await;
    info!(updated = tags.len(), failed = failed.len(), "Experiment templates reinstalled");

    let experiments = state.database.templates().await?;
    state.render(&experiments_page(experiments, user).with("message", update_message(&failed)))
}
