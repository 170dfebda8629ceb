//! Authorization predicates: pure functions of the current user and a target record.

use crate::database::models::{Battery, Id, User};
use crate::domain::access::Access;

/// The requesting user. `None` means anonymous.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurrentUser(pub Option<User>);

impl CurrentUser {
    #[must_use]
    pub const fn anonymous() -> Self {
        Self(None)
    }

    #[must_use]
    pub const fn is_anonymous(&self) -> bool {
        self.0.is_none()
    }

    #[must_use]
    pub fn is_superuser(&self) -> bool {
        self.0.as_ref().is_some_and(|user| user.is_superuser)
    }

    #[must_use]
    pub fn id(&self) -> Option<Id> {
        self.0.as_ref().map(|user| user.id)
    }

    #[must_use]
    pub fn user(&self) -> Option<&User> {
        self.0.as_ref()
    }
}

impl From<User> for CurrentUser {
    fn from(user: User) -> Self {
        Self(Some(user))
    }
}

/// Owner, contributor, or superuser. Never anonymous.
#[must_use]
pub fn owner_or_contrib(user: &CurrentUser, battery: &Battery) -> bool {
    match user.user() {
        Some(u) => u.is_superuser || battery.is_member(u.id),
        None => false,
    }
}

/// Owner or superuser. Never anonymous.
#[must_use]
pub fn owner_or_super(user: &CurrentUser, battery: &Battery) -> bool {
    match user.user() {
        Some(u) => u.is_superuser || battery.owner == u.id,
        None => false,
    }
}

/// Experiment templates are managed by superusers only.
#[must_use]
pub fn can_edit_experiments(user: &CurrentUser) -> bool {
    user.is_superuser()
}

#[must_use]
pub fn can_edit_battery(user: &CurrentUser, battery: &Battery) -> bool {
    owner_or_contrib(user, battery)
}

/// Builds the [`Access`] flags that pages expose as edit/delete permissions.
pub trait AccessPolicy: Sized {
    fn for_templates(user: &CurrentUser) -> Self;
    fn for_battery(user: &CurrentUser, battery: &Battery) -> Self;
}

impl AccessPolicy for Access {
    fn for_templates(user: &CurrentUser) -> Self {
        Self::from_flag(can_edit_experiments(user))
    }

    fn for_battery(user: &CurrentUser, battery: &Battery) -> Self {
        Self::from_flag(can_edit_battery(user, battery))
    }
}
