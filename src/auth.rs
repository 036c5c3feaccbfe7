use crate::error::{BiblioError, BiblioResult};
use serde::Serialize;

/// What a caller is allowed to do beyond acting on their own rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Member,
    Admin,
}

/// The identity every service operation receives explicitly.
///
/// There is no ambient "current user"; hosts resolve their session into
/// a `Principal` and thread it through each call. Construction is
/// decoupled from storage so any authentication layer can produce one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: i64,
    pub role: Role,
}

impl Principal {
    pub fn member(user_id: i64) -> Self {
        Self {
            user_id,
            role: Role::Member,
        }
    }

    pub fn admin(user_id: i64) -> Self {
        Self {
            user_id,
            role: Role::Admin,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Maps a missing session to [`BiblioError::AuthenticationRequired`].
    ///
    /// Hosts call this before invoking a protected operation with an
    /// optional caller.
    pub fn require(principal: Option<&Principal>) -> BiblioResult<&Principal> {
        principal.ok_or(BiblioError::AuthenticationRequired)
    }
}

/// Pure policy check for catalog-management operations. No IO.
pub fn require_catalog_management(principal: &Principal) -> BiblioResult<()> {
    if principal.is_admin() {
        Ok(())
    } else {
        tracing::warn!(user_id = principal.user_id, "catalog management denied");
        Err(BiblioError::Forbidden("catalog management".to_string()))
    }
}

/// Requires the principal to own the row it is acting on.
pub fn require_owner(principal: &Principal, owner_id: i64, what: &str) -> BiblioResult<()> {
    if principal.user_id == owner_id {
        Ok(())
    } else {
        tracing::warn!(user_id = principal.user_id, owner_id, what, "ownership denied");
        Err(BiblioError::Forbidden(format!("not the owner of this {what}")))
    }
}

/// Like [`require_owner`], but admins may override (review moderation).
pub fn require_owner_or_admin(principal: &Principal, owner_id: i64, what: &str) -> BiblioResult<()> {
    if principal.is_admin() {
        return Ok(());
    }
    require_owner(principal, owner_id, what)
}
