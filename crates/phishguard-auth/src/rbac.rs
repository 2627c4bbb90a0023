//! Role-based access control.
//!
//! Roles from the verified token and roles assigned in the application
//! database are merged and expanded into permission strings through a
//! static table. `Owner` and `Admin` expand to the wildcard permission,
//! which satisfies every check.
//!
//! Everything here is pure: no provider types, no I/O.

use std::collections::BTreeSet;

use crate::error::AuthError;
use crate::token::AuthContext;

/// Permission granting everything.
pub const WILDCARD: &str = "*";

/// Static role to permission table. Role names match case-insensitively.
const ROLE_PERMISSIONS: &[(&str, &[&str])] = &[
    ("Owner", &[WILDCARD]),
    ("Admin", &[WILDCARD]),
    (
        "Analyst",
        &[
            "detections.read",
            "detections.write",
            "emails.read",
            "emails.scan",
            "reports.read",
            "reports.write",
        ],
    ),
    ("Viewer", &["detections.read", "emails.read", "reports.read"]),
    ("Billing", &["billing.read", "billing.write"]),
];

/// Returns the permissions `role` grants, if it is a known role.
#[must_use]
pub fn role_permissions(role: &str) -> Option<&'static [&'static str]> {
    ROLE_PERMISSIONS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(role.trim()))
        .map(|(_, permissions)| *permissions)
}

/// Set of permission strings derived from roles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet(BTreeSet<String>);

impl PermissionSet {
    /// Returns `true` if the set holds the wildcard.
    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        self.0.contains(WILDCARD)
    }

    /// Returns `true` if `permission` is held explicitly.
    #[must_use]
    pub fn contains(&self, permission: &str) -> bool {
        self.0.contains(permission)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Merged roles and their permissions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedAccess {
    /// Claim roles followed by database roles, without case-insensitive
    /// duplicates. Unknown roles are kept but grant nothing.
    pub roles: Vec<String>,
    pub permissions: PermissionSet,
}

impl ResolvedAccess {
    #[must_use]
    pub fn can(&self, required: &str) -> bool {
        can(&self.permissions, required)
    }

    #[must_use]
    pub fn can_any(&self, required: &[&str]) -> bool {
        can_any(&self.permissions, required)
    }
}

/// Merges token roles with database roles and expands them.
#[must_use]
pub fn expand_roles<A, B>(claim_roles: &[A], db_roles: &[B]) -> ResolvedAccess
where
    A: AsRef<str>,
    B: AsRef<str>,
{
    let mut roles: Vec<String> = Vec::new();
    let mut permissions = BTreeSet::new();

    let all = claim_roles
        .iter()
        .map(|r| AsRef::<str>::as_ref(r))
        .chain(db_roles.iter().map(|r| AsRef::<str>::as_ref(r)));
    for role in all {
        let role = role.trim();
        if role.is_empty() || roles.iter().any(|r| r.eq_ignore_ascii_case(role)) {
            continue;
        }
        roles.push(role.to_string());
        if let Some(granted) = role_permissions(role) {
            permissions.extend(granted.iter().map(|p| (*p).to_string()));
        }
    }

    ResolvedAccess {
        roles,
        permissions: PermissionSet(permissions),
    }
}

/// Returns `true` if `permissions` satisfies `required`.
#[must_use]
pub fn can(permissions: &PermissionSet, required: &str) -> bool {
    permissions.is_unrestricted() || permissions.contains(required)
}

/// Returns `true` if `permissions` satisfies at least one of `required`.
/// An empty requirement list is never satisfied.
#[must_use]
pub fn can_any(permissions: &PermissionSet, required: &[&str]) -> bool {
    if required.is_empty() {
        return false;
    }
    permissions.is_unrestricted() || required.iter().any(|p| permissions.contains(p))
}

/// Resolves the caller's access and requires `required`.
///
/// # Errors
///
/// Returns `AuthError::Forbidden` if the permission is missing.
pub fn require_permission<B: AsRef<str>>(
    ctx: &AuthContext,
    db_roles: &[B],
    required: &str,
) -> Result<ResolvedAccess, AuthError> {
    let access = expand_roles(ctx.roles.as_slice(), db_roles);
    if access.can(required) {
        return Ok(access);
    }
    tracing::debug!(subject = %ctx.subject, required = %required, "Permission denied");
    Err(AuthError::forbidden(format!("missing permission {}", required)))
}

/// Resolves the caller's access and requires one of `required`.
///
/// # Errors
///
/// Returns `AuthError::Forbidden` if none of the permissions is held.
pub fn require_any_permission<B: AsRef<str>>(
    ctx: &AuthContext,
    db_roles: &[B],
    required: &[&str],
) -> Result<ResolvedAccess, AuthError> {
    let access = expand_roles(ctx.roles.as_slice(), db_roles);
    if access.can_any(required) {
        return Ok(access);
    }
    tracing::debug!(subject = %ctx.subject, required = ?required, "Permission denied");
    Err(AuthError::forbidden(format!(
        "missing any of permissions {}",
        required.join(", ")
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    const NONE: &[&str] = &[];

    fn context(roles: &[&str]) -> AuthContext {
        AuthContext {
            subject: "sub-1".to_string(),
            username: Some("alice".to_string()),
            org_id: Some("acme".to_string()),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            token_use: "id".to_string(),
            expires_at: 0,
            claims: Arc::new(HashMap::new()),
        }
    }

    #[test]
    fn test_admin_is_unrestricted() {
        let access = expand_roles(&["Admin"], NONE);
        assert!(access.permissions.is_unrestricted());
        assert!(access.can("detections.read"));
        assert!(access.can("anything.at.all"));
        assert!(access.can_any(&["billing.write"]));
    }

    #[test]
    fn test_owner_is_unrestricted() {
        assert!(expand_roles(NONE, &["owner"]).permissions.is_unrestricted());
    }

    #[test]
    fn test_analyst_permissions() {
        let access = expand_roles(&["Analyst"], NONE);
        assert!(access.can("detections.write"));
        assert!(!access.can("billing.read"));
        assert!(access.can_any(&["billing.read", "reports.read"]));
        assert!(!access.can_any(&[]));
    }

    #[test]
    fn test_merge_dedups_case_insensitively() {
        let access = expand_roles(&["viewer", "Custom"], &["Viewer", "Billing", " "]);
        assert_eq!(access.roles, vec!["viewer", "Custom", "Billing"]);
        assert!(access.can("reports.read"));
        assert!(access.can("billing.write"));
        assert!(!access.can("detections.write"));
    }

    #[test]
    fn test_unknown_roles_grant_nothing() {
        let access = expand_roles(&["Intern"], NONE);
        assert_eq!(access.roles, vec!["Intern"]);
        assert!(access.permissions.is_empty());
        assert!(!access.can("detections.read"));
    }

    #[test]
    fn test_explicit_permission_sets() {
        let permissions: PermissionSet = ["reports.read"].into_iter().collect();
        assert!(can(&permissions, "reports.read"));
        assert!(!can(&permissions, "reports.write"));

        let wildcard: PermissionSet = [WILDCARD].into_iter().collect();
        assert!(can(&wildcard, "reports.write"));
        assert!(!can_any(&wildcard, &[]));
    }

    #[test]
    fn test_require_permission() {
        let ctx = context(&["Viewer"]);
        assert!(require_permission(&ctx, NONE, "reports.read").is_ok());

        let err = require_permission(&ctx, NONE, "reports.write").unwrap_err();
        assert!(matches!(err, AuthError::Forbidden { .. }));

        // Database roles extend the token's roles.
        assert!(require_permission(&ctx, &["Analyst"], "reports.write").is_ok());
    }

    #[test]
    fn test_require_any_permission() {
        let ctx = context(&["Billing"]);
        assert!(require_any_permission(&ctx, NONE, &["reports.read", "billing.read"]).is_ok());
        assert!(require_any_permission(&ctx, NONE, &["reports.read"]).is_err());
    }
}
