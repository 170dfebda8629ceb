use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Permissions a user holds on a page's subject, exposed to rendered contexts.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Access: u8 {
        const EDIT = 1 << 0;
        const DELETE = 1 << 1;

        const ALL = Self::EDIT.bits() | Self::DELETE.bits();
    }
}

impl Access {
    #[must_use]
    pub const fn from_flag(granted: bool) -> Self {
        if granted { Self::ALL } else { Self::empty() }
    }

    #[must_use]
    pub const fn can_edit(self) -> bool {
        self.contains(Self::EDIT)
    }

    #[must_use]
    pub const fn can_delete(self) -> bool {
        self.contains(Self::DELETE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_grants_both_permissions() {
        let granted = Access::from_flag(true);
        assert!(granted.can_edit() && granted.can_delete());

        let denied = Access::from_flag(false);
        assert!(!denied.can_edit() && !denied.can_delete());
    }
}
