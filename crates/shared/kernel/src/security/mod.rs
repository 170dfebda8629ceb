pub mod access;
#[cfg(feature = "server")]
pub mod identity;

pub use access::{
    AccessPolicy, CurrentUser, can_edit_battery, can_edit_experiments, owner_or_contrib,
    owner_or_super,
};
