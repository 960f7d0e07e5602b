//! Access-control gate
//!
//! A single set of predicates decides whether a principal may act on a
//! template, page, section or customization. Callers resolve the ownership
//! fact first (sections and customizations inherit the owner of their page)
//! and then ask [`authorize`].
//!
//! Pages and everything hanging off them are existence-sensitive: a caller
//! who may not see one gets [`Denial::NotFound`], never [`Denial::Forbidden`].
//! Role violations on resources whose existence is not sensitive (template
//! management, page creation, user administration) get `Forbidden`.

use thiserror::Error;
use uuid::Uuid;

use crate::identity::{Principal, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
    Publish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Template,
    Page,
    Section,
    Customization,
}

impl ResourceKind {
    fn existence_sensitive(self) -> bool {
        !matches!(self, ResourceKind::Template)
    }
}

/// Who owns a resource and whether anyone may read it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ownership {
    /// `None` for system-seeded resources.
    pub owner_id: Option<Uuid>,
    pub is_public: bool,
}

impl Ownership {
    pub fn owned_by(owner_id: Uuid) -> Self {
        Self {
            owner_id: Some(owner_id),
            is_public: false,
        }
    }

    pub fn public(owner_id: Option<Uuid>) -> Self {
        Self {
            owner_id,
            is_public: true,
        }
    }

    fn is_owner(&self, principal: &Principal) -> bool {
        self.owner_id == Some(principal.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Denial {
    #[error("authentication required")]
    Unauthenticated,
    #[error("insufficient privileges")]
    Forbidden,
    #[error("resource not found")]
    NotFound,
}

/// Decide whether `principal` may perform `action` on a resource of `kind`.
///
/// `ownership` is `None` only for [`Action::Create`] of top-level resources
/// (templates, pages); child resources pass the parent page's ownership.
pub fn authorize(
    principal: Option<&Principal>,
    kind: ResourceKind,
    action: Action,
    ownership: Option<&Ownership>,
) -> Result<(), Denial> {
    if action == Action::Read && ownership.is_some_and(|o| o.is_public) {
        return Ok(());
    }

    let Some(principal) = principal else {
        return Err(Denial::Unauthenticated);
    };

    let hidden = if kind.existence_sensitive() {
        Denial::NotFound
    } else {
        Denial::Forbidden
    };
    let is_owner = ownership.is_some_and(|o| o.is_owner(principal));

    match (kind, action) {
        (_, Action::Read) => {
            if is_owner || principal.is_super_admin() {
                Ok(())
            } else {
                Err(Denial::NotFound)
            }
        }

        (ResourceKind::Template, _) => {
            if principal.is_super_admin() {
                Ok(())
            } else {
                Err(Denial::Forbidden)
            }
        }

        (ResourceKind::Page, Action::Create) => {
            if principal.is_admin_or_above() {
                Ok(())
            } else {
                Err(Denial::Forbidden)
            }
        }

        (ResourceKind::Page, Action::Delete) => {
            if is_owner || principal.is_super_admin() {
                Ok(())
            } else {
                Err(hidden)
            }
        }

        (_, Action::Create | Action::Update | Action::Delete | Action::Publish) => {
            if is_owner { Ok(()) } else { Err(hidden) }
        }
    }
}

/// A requested change to another user's account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserChange {
    Role(Role),
    Active(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum UserChangeDenial {
    #[error("users cannot modify their own role or status")]
    SelfModification,
    #[error("the SUPER_ADMIN role cannot be assigned")]
    SuperAdminAssignment,
    #[error("only SUPER_ADMIN may manage users")]
    Forbidden,
}

/// Role-escalation guard for user administration.
///
/// Self-modification and SUPER_ADMIN assignment are refused whatever the
/// caller's role; otherwise only SUPER_ADMIN may change accounts.
pub fn authorize_user_change(
    caller: &Principal,
    target_id: Uuid,
    change: UserChange,
) -> Result<(), UserChangeDenial> {
    if caller.id == target_id {
        return Err(UserChangeDenial::SelfModification);
    }
    if change == UserChange::Role(Role::SuperAdmin) {
        return Err(UserChangeDenial::SuperAdminAssignment);
    }
    if !caller.is_super_admin() {
        return Err(UserChangeDenial::Forbidden);
    }
    Ok(())
}
