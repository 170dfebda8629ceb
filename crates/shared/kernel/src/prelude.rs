//! Glob import for slice crates: `use expdj_kernel::prelude::*;`

pub use crate::database::models::{
    Battery, CreditCondition, Experiment, ExperimentTemplate, ExperimentVariable, Id, User,
};
pub use crate::database::Database;
pub use crate::domain::access::Access;
pub use crate::domain::constants::templates;
pub use crate::forms::{FormData, FormErrors, FormView};
pub use crate::render::Page;
pub use crate::security::{
    AccessPolicy, CurrentUser, can_edit_battery, can_edit_experiments, owner_or_contrib,
    owner_or_super,
};

#[cfg(feature = "server")]
pub use crate::security::identity::Authenticated;
#[cfg(feature = "server")]
pub use crate::server::lookup::{get_battery, get_experiment, get_template};
#[cfg(feature = "server")]
pub use crate::server::{ApiError, ApiResult, ApiState};
