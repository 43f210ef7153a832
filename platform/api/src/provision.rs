//! Organization provisioning: creating an organization with its founding
//! admin, and joining one by code.

use std::sync::Arc;

use uuid::Uuid;

use crate::database::{MembershipRole, Organization, OrganizationMembership};
use crate::store::{MembershipStore, OrganizationStore, ProfileStore, Result, StoreError};

/// How many join code candidates are tried before the create call gives up.
/// A collision means a fresh code is generated, never a reused insert.
const CODE_ATTEMPTS: usize = 5;

pub struct Provisioner {
    profiles: Arc<dyn ProfileStore>,
    organizations: Arc<dyn OrganizationStore>,
    memberships: Arc<dyn MembershipStore>,
}

impl Provisioner {
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        organizations: Arc<dyn OrganizationStore>,
        memberships: Arc<dyn MembershipStore>,
    ) -> Self {
        Self {
            profiles,
            organizations,
            memberships,
        }
    }

    /// Creates an organization and binds `admin_user_id` to it as its one
    /// founding admin. Both effects land in the same store transaction.
    pub async fn create_organization_with_admin(
        &self,
        name: &str,
        admin_user_id: Uuid,
    ) -> Result<Organization> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::Validation {
                field: "name",
                message: "organization name cannot be empty",
            });
        }

        self.profiles
            .profile_by_id(admin_user_id)
            .await?
            .ok_or(StoreError::NotFound("admin profile"))?;

        for _ in 0..CODE_ATTEMPTS {
            let code = Organization::generate_code();

            match self
                .organizations
                .create_organization_with_admin(name, &code, admin_user_id)
                .await
            {
                Err(StoreError::Conflict(_)) => {
                    tracing::debug!(code = %code, "organization code collision, retrying");
                    continue;
                }
                Err(err) => return Err(err),
                Ok(organization) => {
                    tracing::info!(
                        organization = %organization.id,
                        code = %organization.code,
                        admin = %admin_user_id,
                        "organization created"
                    );
                    return Ok(organization);
                }
            }
        }

        Err(StoreError::Conflict("organization code"))
    }

    /// Joins the active organization matching `code` (case-insensitively) as
    /// a `member`, subject to the one-membership-per-pair invariant.
    pub async fn join_by_code(&self, user_id: Uuid, code: &str) -> Result<OrganizationMembership> {
        let code = code.trim().to_uppercase();

        let organization = self
            .organizations
            .organization_by_code(&code)
            .await?
            .ok_or(StoreError::NotFound("organization"))?;

        let membership = self
            .memberships
            .insert_membership(user_id, organization.id, MembershipRole::Member)
            .await?;

        tracing::info!(
            organization = %organization.id,
            user = %user_id,
            "user joined organization by code"
        );

        Ok(membership)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use mockall::predicate;

    use super::*;
    use crate::database::Profile;
    use crate::store::{MockMembershipStore, MockOrganizationStore, MockProfileStore};

    fn profile(id: Uuid) -> Profile {
        Profile {
            id,
            email: "owner@elev8.fit".into(),
            first_name: "Org".into(),
            last_name: "Owner".into(),
            is_app_admin: false,
            is_active: true,
            password_hash: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn organization(name: &str, code: &str, created_by: Uuid) -> Organization {
        Organization {
            id: Uuid::new_v4(),
            name: name.into(),
            code: code.into(),
            description: None,
            created_by: Some(created_by),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn membership(user_id: Uuid, organization_id: Uuid) -> OrganizationMembership {
        OrganizationMembership {
            id: Uuid::new_v4(),
            user_id,
            organization_id,
            role: MembershipRole::Member,
            joined_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn provisioner(
        profiles: MockProfileStore,
        organizations: MockOrganizationStore,
        memberships: MockMembershipStore,
    ) -> Provisioner {
        Provisioner::new(Arc::new(profiles), Arc::new(organizations), Arc::new(memberships))
    }

    #[tokio::test]
    async fn create_rejects_blank_names() {
        let mut profiles = MockProfileStore::new();
        profiles.expect_profile_by_id().never();
        let mut organizations = MockOrganizationStore::new();
        organizations.expect_create_organization_with_admin().never();

        let provisioner = provisioner(profiles, organizations, MockMembershipStore::new());

        for name in ["", "   ", "\t\n"] {
            let err = provisioner
                .create_organization_with_admin(name, Uuid::new_v4())
                .await
                .unwrap_err();
            assert!(matches!(err, StoreError::Validation { field: "name", .. }));
        }
    }

    #[tokio::test]
    async fn create_requires_an_existing_admin_profile() {
        let mut profiles = MockProfileStore::new();
        profiles.expect_profile_by_id().returning(|_| Ok(None));
        let mut organizations = MockOrganizationStore::new();
        organizations.expect_create_organization_with_admin().never();

        let provisioner = provisioner(profiles, organizations, MockMembershipStore::new());

        let err = provisioner
            .create_organization_with_admin("Iron Temple", Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound("admin profile")));
    }

    #[tokio::test]
    async fn create_retries_with_a_fresh_code_on_collision() {
        let admin = Uuid::new_v4();

        let mut profiles = MockProfileStore::new();
        profiles
            .expect_profile_by_id()
            .with(predicate::eq(admin))
            .returning(move |id| Ok(Some(profile(id))));

        let mut organizations = MockOrganizationStore::new();
        let mut seen = Vec::new();
        organizations
            .expect_create_organization_with_admin()
            .times(2)
            .returning(move |name, code, created_by| {
                seen.push(code.to_string());
                if seen.len() == 1 {
                    // First candidate collides with an existing code.
                    Err(StoreError::Conflict("organization code"))
                } else {
                    assert_ne!(seen[0], seen[1], "collision must retry with a fresh code");
                    Ok(organization(name, code, created_by))
                }
            });

        let provisioner = provisioner(profiles, organizations, MockMembershipStore::new());

        let organization = provisioner
            .create_organization_with_admin("Iron Temple", admin)
            .await
            .unwrap();
        assert_eq!(organization.name, "Iron Temple");
    }

    #[tokio::test]
    async fn create_gives_up_after_bounded_attempts() {
        let admin = Uuid::new_v4();

        let mut profiles = MockProfileStore::new();
        profiles
            .expect_profile_by_id()
            .returning(move |id| Ok(Some(profile(id))));

        let mut organizations = MockOrganizationStore::new();
        organizations
            .expect_create_organization_with_admin()
            .times(CODE_ATTEMPTS)
            .returning(|_, _, _| Err(StoreError::Conflict("organization code")));

        let provisioner = provisioner(profiles, organizations, MockMembershipStore::new());

        let err = provisioner
            .create_organization_with_admin("Iron Temple", admin)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict("organization code")));
    }

    #[tokio::test]
    async fn join_normalizes_the_code_and_inserts_a_member_row() {
        let user = Uuid::new_v4();
        let org = organization("Iron Temple", "IRON42", Uuid::new_v4());
        let org_id = org.id;

        let mut organizations = MockOrganizationStore::new();
        organizations
            .expect_organization_by_code()
            .with(predicate::eq("IRON42"))
            .returning(move |_| Ok(Some(org.clone())));

        let mut memberships = MockMembershipStore::new();
        memberships
            .expect_insert_membership()
            .with(
                predicate::eq(user),
                predicate::eq(org_id),
                predicate::eq(MembershipRole::Member),
            )
            .returning(|user_id, organization_id, _| Ok(membership(user_id, organization_id)));

        let provisioner = provisioner(MockProfileStore::new(), organizations, memberships);

        let membership = provisioner.join_by_code(user, "  iron42 ").await.unwrap();
        assert_eq!(membership.organization_id, org_id);
        assert_eq!(membership.role, MembershipRole::Member);
    }

    #[tokio::test]
    async fn join_fails_when_no_active_organization_matches() {
        let mut organizations = MockOrganizationStore::new();
        // Inactive organizations are filtered by the store lookup itself.
        organizations
            .expect_organization_by_code()
            .returning(|_| Ok(None));
        let mut memberships = MockMembershipStore::new();
        memberships.expect_insert_membership().never();

        let provisioner = provisioner(MockProfileStore::new(), organizations, memberships);

        let err = provisioner
            .join_by_code(Uuid::new_v4(), "GONE99")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound("organization")));
    }

    #[tokio::test]
    async fn join_surfaces_duplicate_membership_conflicts() {
        let org = organization("Iron Temple", "IRON42", Uuid::new_v4());

        let mut organizations = MockOrganizationStore::new();
        organizations
            .expect_organization_by_code()
            .returning(move |_| Ok(Some(org.clone())));
        let mut memberships = MockMembershipStore::new();
        memberships
            .expect_insert_membership()
            .returning(|_, _, _| Err(StoreError::Conflict("membership")));

        let provisioner = provisioner(MockProfileStore::new(), organizations, memberships);

        let err = provisioner
            .join_by_code(Uuid::new_v4(), "IRON42")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict("membership")));
    }
}
