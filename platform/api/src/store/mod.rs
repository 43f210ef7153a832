//! The contracts this service requires from the backing store, plus their
//! Postgres implementation. Services depend on the traits so the invariants
//! can be tested without a live database.

use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use crate::database::{
    MembershipRole, NewProfile, Organization, OrganizationMember, OrganizationMembership, Profile,
    UserOrganization,
};

mod postgres;

pub use postgres::PgStore;

pub type Result<T, E = StoreError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested row does not exist (or is not active).
    #[error("{0} not found")]
    NotFound(&'static str),
    /// A uniqueness invariant would be violated.
    #[error("{0} already exists")]
    Conflict(&'static str),
    /// The input was rejected before reaching the database.
    #[error("invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: &'static str,
    },
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn profile_by_id(&self, id: Uuid) -> Result<Option<Profile>>;

    async fn profile_by_email(&self, email: &str) -> Result<Option<Profile>>;

    /// Fails with `Conflict` if a profile already exists for the email.
    async fn insert_profile(&self, profile: NewProfile) -> Result<Profile>;

    async fn update_profile_names(
        &self,
        id: Uuid,
        first_name: &str,
        last_name: &str,
    ) -> Result<Profile>;

    async fn list_active_profiles(&self) -> Result<Vec<Profile>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrganizationStore: Send + Sync {
    async fn organization_by_id(&self, id: Uuid) -> Result<Option<Organization>>;

    /// Case-insensitive code lookup against active organizations only.
    async fn organization_by_code(&self, code: &str) -> Result<Option<Organization>>;

    /// Creates the organization row and its founding `admin` membership in
    /// one transaction: readers observe both effects or neither. Fails with
    /// `Conflict` if the join code is already taken.
    async fn create_organization_with_admin(
        &self,
        name: &str,
        code: &str,
        admin_user_id: Uuid,
    ) -> Result<Organization>;

    async fn list_active_organizations(&self) -> Result<Vec<Organization>>;

    async fn deactivate_organization(&self, id: Uuid) -> Result<()>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MembershipStore: Send + Sync {
    async fn find_membership(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> Result<Option<OrganizationMembership>>;

    /// Fails with `Conflict` if a membership already exists for the pair.
    /// Concurrent inserts race on the database unique constraint, never on
    /// client-side locking.
    async fn insert_membership(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
        role: MembershipRole,
    ) -> Result<OrganizationMembership>;

    /// Idempotent: deleting a membership that does not exist is not an
    /// error.
    async fn delete_membership(&self, user_id: Uuid, organization_id: Uuid) -> Result<()>;

    async fn memberships_for_user(&self, user_id: Uuid) -> Result<Vec<UserOrganization>>;

    async fn memberships_for_organization(
        &self,
        organization_id: Uuid,
    ) -> Result<Vec<OrganizationMember>>;

    /// Member counts for a batch of organizations in a single query.
    /// Organizations without members are absent from the map.
    async fn member_counts(&self, organization_ids: &[Uuid]) -> Result<HashMap<Uuid, i64>>;
}
