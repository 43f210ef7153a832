//! Resolving an authenticated identity to its profile, memberships and
//! effective role.

use uuid::Uuid;

use crate::database::{Profile, UserOrganization};
use crate::permissions::Role;
use crate::store::{MembershipStore, ProfileStore, Result};

/// The outcome of resolving an authenticated identity.
#[derive(Debug, Clone)]
pub enum Resolution {
    /// The identity authenticated but has no profile row yet. Callers route
    /// to the profile completion flow; this is a state, not an error.
    ProfileIncomplete,
    Resolved(Identity),
}

/// A fully resolved identity: the profile plus its organization memberships.
/// App admins carry an empty membership list by convention since their
/// access is organization agnostic.
#[derive(Debug, Clone)]
pub struct Identity {
    pub profile: Profile,
    pub memberships: Vec<UserOrganization>,
}

impl Identity {
    pub fn is_app_admin(&self) -> bool {
        self.profile.is_app_admin
    }

    /// The role permission checks run under. App admins override everything;
    /// otherwise the selected organization context decides, falling back to
    /// the first membership, and to `member` for an identity that has not
    /// joined any organization yet.
    pub fn effective_role(&self, active_organization: Option<Uuid>) -> Role {
        if self.profile.is_app_admin {
            return Role::AppAdmin;
        }

        let membership = active_organization
            .and_then(|id| self.memberships.iter().find(|m| m.organization_id == id))
            .or_else(|| self.memberships.first());

        membership.map(|m| m.role.into()).unwrap_or(Role::Member)
    }

    /// Whether this identity administers the given organization, either as
    /// an app admin or through an admin membership.
    pub fn is_admin_of(&self, organization_id: Uuid) -> bool {
        self.profile.is_app_admin
            || self
                .memberships
                .iter()
                .any(|m| m.organization_id == organization_id && m.is_admin)
    }
}

pub async fn resolve(
    profiles: &dyn ProfileStore,
    memberships: &dyn MembershipStore,
    user_id: Uuid,
) -> Result<Resolution> {
    let Some(profile) = profiles.profile_by_id(user_id).await? else {
        return Ok(Resolution::ProfileIncomplete);
    };

    let memberships = if profile.is_app_admin {
        // Organization agnostic; stray membership rows are ignored.
        Vec::new()
    } else {
        memberships.memberships_for_user(user_id).await?
    };

    Ok(Resolution::Resolved(Identity {
        profile,
        memberships,
    }))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::database::MembershipRole;
    use crate::store::{MockMembershipStore, MockProfileStore};

    fn profile(id: Uuid, is_app_admin: bool) -> Profile {
        Profile {
            id,
            email: "test@elev8.fit".into(),
            first_name: "Test".into(),
            last_name: "User".into(),
            is_app_admin,
            is_active: true,
            password_hash: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn membership(organization_id: Uuid, role: MembershipRole) -> UserOrganization {
        UserOrganization {
            organization_id,
            name: "Iron Temple".into(),
            code: "IRON42".into(),
            role,
            is_admin: role == MembershipRole::Admin,
        }
    }

    #[tokio::test]
    async fn missing_profile_resolves_to_incomplete() {
        let user_id = Uuid::new_v4();

        let mut profiles = MockProfileStore::new();
        profiles
            .expect_profile_by_id()
            .returning(|_| Ok(None));
        let mut memberships = MockMembershipStore::new();
        memberships.expect_memberships_for_user().never();

        let resolution = resolve(&profiles, &memberships, user_id).await.unwrap();
        assert!(matches!(resolution, Resolution::ProfileIncomplete));
    }

    #[tokio::test]
    async fn app_admin_reports_no_memberships() {
        let user_id = Uuid::new_v4();

        let mut profiles = MockProfileStore::new();
        profiles
            .expect_profile_by_id()
            .returning(move |id| Ok(Some(profile(id, true))));
        // Even if stray rows exist, the resolver must not ask for them.
        let mut memberships = MockMembershipStore::new();
        memberships.expect_memberships_for_user().never();

        let resolution = resolve(&profiles, &memberships, user_id).await.unwrap();
        let Resolution::Resolved(identity) = resolution else {
            panic!("expected a resolved identity");
        };

        assert!(identity.memberships.is_empty());
        assert_eq!(identity.effective_role(None), Role::AppAdmin);
        assert!(identity.is_admin_of(Uuid::new_v4()));
    }

    #[tokio::test]
    async fn memberships_are_loaded_for_regular_users() {
        let user_id = Uuid::new_v4();
        let org = Uuid::new_v4();

        let mut profiles = MockProfileStore::new();
        profiles
            .expect_profile_by_id()
            .returning(move |id| Ok(Some(profile(id, false))));
        let mut memberships = MockMembershipStore::new();
        memberships
            .expect_memberships_for_user()
            .returning(move |_| Ok(vec![membership(org, MembershipRole::Admin)]));

        let resolution = resolve(&profiles, &memberships, user_id).await.unwrap();
        let Resolution::Resolved(identity) = resolution else {
            panic!("expected a resolved identity");
        };

        assert_eq!(identity.memberships.len(), 1);
        assert!(identity.is_admin_of(org));
        assert!(!identity.is_admin_of(Uuid::new_v4()));
    }

    #[test]
    fn effective_role_falls_back_to_member() {
        let identity = Identity {
            profile: profile(Uuid::new_v4(), false),
            memberships: Vec::new(),
        };

        assert_eq!(identity.effective_role(None), Role::Member);
    }

    #[test]
    fn effective_role_uses_first_membership_by_default() {
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let identity = Identity {
            profile: profile(Uuid::new_v4(), false),
            memberships: vec![
                membership(first, MembershipRole::Staff),
                membership(second, MembershipRole::Member),
            ],
        };

        assert_eq!(identity.effective_role(None), Role::Staff);
    }

    #[test]
    fn effective_role_honors_the_selected_organization() {
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let identity = Identity {
            profile: profile(Uuid::new_v4(), false),
            memberships: vec![
                membership(first, MembershipRole::Staff),
                membership(second, MembershipRole::Admin),
            ],
        };

        assert_eq!(identity.effective_role(Some(second)), Role::Admin);
        // An unknown selection falls back to the first membership.
        assert_eq!(identity.effective_role(Some(Uuid::new_v4())), Role::Staff);
    }
}
