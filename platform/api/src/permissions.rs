//! Role based access control over application paths.
//!
//! Every role maps to a static list of allowed path patterns and a default
//! redirect used to land the user on their primary view after signing in.
//! App admins bypass the tables entirely, and auth pages are reachable
//! before any role is known.

use std::fmt;

/// A role as seen by permission checks. `AppAdmin` is a profile level
/// override and never appears as an organization membership role, see
/// [`crate::database::MembershipRole`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    AppAdmin,
    Admin,
    Staff,
    Member,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::AppAdmin, Role::Admin, Role::Staff, Role::Member];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AppAdmin => "app-admin",
            Self::Admin => "admin",
            Self::Staff => "staff",
            Self::Member => "member",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single allowed-path rule. `Prefix` is the `P/*` form: it matches `P`
/// itself and anything below it, but respects the segment boundary, so
/// `Prefix("/billing")` matches `/billing/reports` and not `/billingx`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathPattern {
    Exact(&'static str),
    Prefix(&'static str),
}

impl PathPattern {
    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Exact(allowed) => path == *allowed,
            Self::Prefix(base) => match path.strip_prefix(base) {
                Some(rest) => rest.is_empty() || rest.starts_with('/'),
                None => false,
            },
        }
    }
}

use PathPattern::{Exact, Prefix};

/// Paths reachable before a role is known.
const AUTH_PATH_PREFIX: &str = "/auth/";

const APP_ADMIN_PATHS: &[PathPattern] = &[
    Exact("/dashboard"),
    Exact("/admin"),
    Exact("/organizations"),
    Exact("/users"),
    Exact("/analytics"),
    Exact("/settings"),
    Exact("/help"),
    Exact("/planning"),
    Exact("/planning/marketing"),
    Exact("/planning/social-media"),
    Exact("/planning/events"),
    Exact("/members"),
    Exact("/staff"),
    Prefix("/billing"),
    Prefix("/coaching"),
    Prefix("/member"),
    Prefix("/debug"),
];

const ADMIN_PATHS: &[PathPattern] = &[
    Exact("/dashboard"),
    Exact("/planning"),
    Exact("/planning/marketing"),
    Exact("/planning/social-media"),
    Exact("/planning/social-media/content"),
    Exact("/planning/social-media/statistics"),
    Exact("/planning/social-media/settings"),
    Exact("/planning/events"),
    Exact("/planning/retention"),
    Prefix("/members"),
    Prefix("/staff"),
    Exact("/billing/dashboard"),
    Exact("/billing/setup"),
    Exact("/billing/invoices"),
    Exact("/billing/memberships"),
    Exact("/billing/products"),
    Exact("/billing/coupons"),
    Exact("/billing/reports"),
    Exact("/coaching-schedule"),
    Exact("/programming-setup"),
    Exact("/analytics"),
    Exact("/coach/programming"),
    Exact("/coach/results"),
    Exact("/coach/attendance"),
    Exact("/member/dashboard"),
    Exact("/member/workouts"),
    Exact("/member/schedule"),
    Exact("/member/account"),
    Exact("/settings"),
    Exact("/help"),
];

const STAFF_PATHS: &[PathPattern] = &[
    Exact("/coach/programming"),
    Exact("/coach/results"),
    Exact("/coach/attendance"),
    Exact("/coaching-schedule"),
    Exact("/programming-setup"),
    Exact("/member/dashboard"),
    Exact("/member/workouts"),
    Exact("/member/schedule"),
    Exact("/member/account"),
    Prefix("/members"),
    Exact("/settings"),
    Exact("/help"),
];

const MEMBER_PATHS: &[PathPattern] = &[
    Exact("/member/dashboard"),
    Exact("/member/workouts"),
    Exact("/member/schedule"),
    Exact("/member/account"),
    Exact("/settings"),
    Exact("/help"),
];

/// The allowed-path table for a role. Exhaustive over the closed role set.
pub fn allowed_paths(role: Role) -> &'static [PathPattern] {
    match role {
        Role::AppAdmin => APP_ADMIN_PATHS,
        Role::Admin => ADMIN_PATHS,
        Role::Staff => STAFF_PATHS,
        Role::Member => MEMBER_PATHS,
    }
}

/// Where a freshly authenticated user of this role lands.
pub fn default_redirect(role: Role) -> &'static str {
    match role {
        Role::AppAdmin => "/admin",
        Role::Admin => "/dashboard",
        Role::Staff => "/coach/programming",
        Role::Member => "/member/dashboard",
    }
}

/// Whether `role` may access `path`. First matching pattern wins; no match
/// denies. App admins are granted unconditionally.
pub fn has_permission(role: Role, path: &str) -> bool {
    if role == Role::AppAdmin {
        return true;
    }

    allowed_paths(role).iter().any(|pattern| pattern.matches(path))
}

/// Like [`has_permission`], but auth pages are always reachable since they
/// must be usable before a role is even known.
pub fn is_path_accessible(role: Role, path: &str) -> bool {
    if path.starts_with(AUTH_PATH_PREFIX) {
        return true;
    }

    has_permission(role, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_admin_is_granted_everything() {
        for path in ["/admin", "/billing/reports", "/member/account", "/nonsense", "/"] {
            assert!(has_permission(Role::AppAdmin, path), "app-admin denied {path}");
        }
    }

    #[test]
    fn prefix_patterns_respect_segment_boundaries() {
        assert!(has_permission(Role::Admin, "/billing/reports"));
        assert!(has_permission(Role::Admin, "/staff"));
        assert!(has_permission(Role::Admin, "/staff/schedule"));
        assert!(!has_permission(Role::Admin, "/billingx"));
        assert!(!has_permission(Role::Staff, "/membersx"));
    }

    #[test]
    fn exact_patterns_do_not_match_children() {
        assert!(has_permission(Role::Member, "/member/dashboard"));
        assert!(!has_permission(Role::Member, "/member/dashboard/secret"));
    }

    #[test]
    fn lower_roles_cannot_reach_admin_views() {
        assert!(!has_permission(Role::Member, "/admin"));
        assert!(!has_permission(Role::Staff, "/admin"));
        assert!(!has_permission(Role::Admin, "/admin"));
        assert!(!has_permission(Role::Member, "/members"));
        assert!(!has_permission(Role::Member, "/billing/dashboard"));
    }

    #[test]
    fn checks_are_deterministic() {
        for role in Role::ALL {
            for path in ["/dashboard", "/billing/reports", "/auth/login", "/x"] {
                assert_eq!(has_permission(role, path), has_permission(role, path));
                assert_eq!(is_path_accessible(role, path), is_path_accessible(role, path));
            }
        }
    }

    #[test]
    fn auth_pages_are_always_accessible() {
        for role in Role::ALL {
            assert!(is_path_accessible(role, "/auth/login"));
            assert!(is_path_accessible(role, "/auth/confirm"));
        }
        // But only via the auth prefix bypass.
        assert!(!has_permission(Role::Member, "/auth/login"));
    }

    #[test]
    fn every_role_has_a_redirect_it_may_access() {
        for role in Role::ALL {
            assert!(
                has_permission(role, default_redirect(role)),
                "{role} cannot reach its own redirect"
            );
        }
    }

    #[test]
    fn role_names_round_trip_serde() {
        for role in Role::ALL {
            let json = serde_json::to_string(&role).unwrap();
            assert_eq!(json, format!("\"{}\"", role.as_str()));
            let parsed: Role = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, role);
        }
    }
}
