//! Template bookkeeping shared by the install, update and delete handlers.

use crate::manifest::ExperimentManifest;
use expdj_kernel::database::models::ExperimentTemplate;
use fxhash::FxHashSet;

/// Library entries whose tag is not among `installed`.
#[must_use]
pub fn available(selection: Vec<ExperimentManifest>, installed: &[ExperimentTemplate]) -> Vec<ExperimentManifest> {
    let tags: FxHashSet<&str> = installed.iter().map(|t| t.tag.as_str()).collect();
    selection.into_iter().filter(|m| !tags.contains(m.tag.as_str())).collect()
}

/// Library tags named by the submitted form keys, in library order.
#[must_use]
pub fn selected_tags<'a>(
    selection: &[ExperimentManifest],
    keys: impl IntoIterator<Item = &'a str>,
) -> Vec<String> {
    let keys: FxHashSet<&str> = keys.into_iter().collect();
    selection.iter().filter(|m| keys.contains(m.tag.as_str())).map(|m| m.tag.clone()).collect()
}

#[must_use]
pub fn install_message(failed: &[String]) -> String {
    if failed.is_empty() {
        "Experiments installed successfully.".to_owned()
    } else {
        format!("The experiments {} did not install successfully.", failed.join(","))
    }
}

#[must_use]
pub fn update_message(failed: &[String]) -> String {
    if failed.is_empty() {
        "Experiments updated successfully.".to_owned()
    } else {
        format!("The experiments {} did not update successfully.", failed.join(","))
    }
}
