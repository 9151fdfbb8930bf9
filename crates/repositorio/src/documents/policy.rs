//! Role-based visibility and mutation rules.
//!
//! Every listing, detail and search path goes through these predicates. The caller's
//! role is always passed in explicitly; nothing here looks identities up.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::domain::{Document, DocumentType, UserId};

/// Role of the party making a request, lowest precedence first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallerRole {
    Anonymous,
    User,
    /// Read-only elevated access.
    Authority,
    Admin,
}

impl CallerRole {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Anonymous => "anonymous",
            Self::User => "user",
            Self::Authority => "authority",
            Self::Admin => "admin",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "anonymous" | "" => Some(Self::Anonymous),
            "user" => Some(Self::User),
            "authority" => Some(Self::Authority),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    const fn sees_restricted(self) -> bool {
        matches!(self, Self::Authority | Self::Admin)
    }
}

impl fmt::Display for CallerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Role stored for a signed-in user by the role directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleGrant {
    User,
    Authority,
    Admin,
}

impl From<RoleGrant> for CallerRole {
    fn from(grant: RoleGrant) -> Self {
        match grant {
            RoleGrant::User => CallerRole::User,
            RoleGrant::Authority => CallerRole::Authority,
            RoleGrant::Admin => CallerRole::Admin,
        }
    }
}

/// Who is asking, as supplied by the identity collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub role: CallerRole,
    pub user_id: Option<UserId>,
}

impl Caller {
    pub fn anonymous() -> Self {
        Self {
            role: CallerRole::Anonymous,
            user_id: None,
        }
    }

    pub fn signed_in(user_id: UserId, grant: RoleGrant) -> Self {
        Self {
            role: grant.into(),
            user_id: Some(user_id),
        }
    }

    pub fn is_self(&self, user: &UserId) -> bool {
        self.user_id.as_ref() == Some(user)
    }
}

/// Write operations gated by the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    Create,
    Update,
    Delete,
    ChangeRole,
}

impl MutationKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::ChangeRole => "change the role of",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthorizationError {
    #[error("{role} callers may not {} {target}", .operation.label())]
    UnauthorizedMutation {
        operation: MutationKind,
        target: String,
        role: CallerRole,
    },
    #[error("admin {user} may not revoke their own admin grant")]
    SelfDemotion { user: UserId },
}

/// Whether `role` may see `document` on any read path.
///
/// Anonymous callers see nothing. Signed-in users see everything except the approval
/// resolutions and progress/final reports of extension projects; the master project
/// record stays public to them.
pub fn is_visible(document: &Document, role: CallerRole) -> bool {
    match role {
        CallerRole::Anonymous => false,
        CallerRole::Authority | CallerRole::Admin => true,
        CallerRole::User => match document.document_type() {
            DocumentType::Proyecto => document.is_master_project(),
            _ => true,
        },
    }
}

/// Only admins write. Authorship or directorship of the document grants nothing.
pub fn can_mutate(_document: &Document, role: CallerRole) -> bool {
    role == CallerRole::Admin
}

pub fn authorize_mutation(
    caller: &Caller,
    operation: MutationKind,
    target: &str,
) -> Result<(), AuthorizationError> {
    if caller.role == CallerRole::Admin {
        Ok(())
    } else {
        Err(AuthorizationError::UnauthorizedMutation {
            operation,
            target: target.to_string(),
            role: caller.role,
        })
    }
}

/// Role changes are admin-only, and an admin may never lower their own grant.
pub fn authorize_role_change(
    caller: &Caller,
    target: &UserId,
    grant: RoleGrant,
) -> Result<(), AuthorizationError> {
    authorize_mutation(caller, MutationKind::ChangeRole, &target.0)?;
    if caller.is_self(target) && grant != RoleGrant::Admin {
        return Err(AuthorizationError::SelfDemotion {
            user: target.clone(),
        });
    }
    Ok(())
}

/// Filtering extension listings by sub-type would otherwise reveal restricted records.
pub fn can_filter_extension_subtype(role: CallerRole) -> bool {
    role.sees_restricted()
}

pub fn can_view_statistics(role: CallerRole) -> bool {
    role.sees_restricted()
}
