use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{MembershipStore, OrganizationStore, ProfileStore, Result, StoreError};
use crate::database::{
    MembershipRole, NewProfile, Organization, OrganizationMember, OrganizationMembership, Profile,
    Session, UserOrganization,
};

/// The sqlx backed implementation of every store contract, plus the session
/// queries used by the auth layer.
pub struct PgStore {
    db: Arc<sqlx::PgPool>,
}

impl PgStore {
    pub fn new(db: Arc<sqlx::PgPool>) -> Self {
        Self { db }
    }

    pub async fn create_session(&self, user_id: Uuid, expires_at: DateTime<Utc>) -> Result<Session> {
        let session = sqlx::query_as::<_, Session>(
            "INSERT INTO sessions (id, user_id, expires_at) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(expires_at)
        .fetch_one(&*self.db)
        .await?;

        Ok(session)
    }

    pub async fn session_by_id(&self, id: Uuid) -> Result<Option<Session>> {
        let session = sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE id = $1")
            .bind(id)
            .fetch_optional(&*self.db)
            .await?;

        Ok(session)
    }

    pub async fn delete_session(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id)
            .execute(&*self.db)
            .await?;

        Ok(())
    }
}

/// Maps a unique constraint violation onto the conflicting resource,
/// anything else stays a database error.
fn map_unique_violation(err: sqlx::Error, what: &'static str) -> StoreError {
    match &err {
        // PostgreSQL error code 23505 is unique_violation
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
            StoreError::Conflict(what)
        }
        _ => StoreError::Database(err),
    }
}

#[async_trait]
impl ProfileStore for PgStore {
    async fn profile_by_id(&self, id: Uuid) -> Result<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(&*self.db)
            .await?;

        Ok(profile)
    }

    async fn profile_by_email(&self, email: &str) -> Result<Option<Profile>> {
        let profile =
            sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE LOWER(email) = LOWER($1)")
                .bind(email)
                .fetch_optional(&*self.db)
                .await?;

        Ok(profile)
    }

    async fn insert_profile(&self, profile: NewProfile) -> Result<Profile> {
        sqlx::query_as::<_, Profile>(
            r#"
            INSERT INTO profiles (
                id,
                email,
                first_name,
                last_name,
                is_app_admin,
                password_hash
            ) VALUES (
                $1, $2, $3, $4, $5, $6
            ) RETURNING *"#,
        )
        .bind(profile.id)
        .bind(profile.email)
        .bind(profile.first_name)
        .bind(profile.last_name)
        .bind(profile.is_app_admin)
        .bind(profile.password_hash)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| map_unique_violation(err, "profile"))
    }

    async fn update_profile_names(
        &self,
        id: Uuid,
        first_name: &str,
        last_name: &str,
    ) -> Result<Profile> {
        sqlx::query_as::<_, Profile>(
            "UPDATE profiles SET first_name = $2, last_name = $3, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(first_name)
        .bind(last_name)
        .fetch_optional(&*self.db)
        .await?
        .ok_or(StoreError::NotFound("profile"))
    }

    async fn list_active_profiles(&self) -> Result<Vec<Profile>> {
        let profiles = sqlx::query_as::<_, Profile>(
            "SELECT * FROM profiles WHERE is_active ORDER BY first_name, last_name",
        )
        .fetch_all(&*self.db)
        .await?;

        Ok(profiles)
    }
}

#[async_trait]
impl OrganizationStore for PgStore {
    async fn organization_by_id(&self, id: Uuid) -> Result<Option<Organization>> {
        let organization =
            sqlx::query_as::<_, Organization>("SELECT * FROM organizations WHERE id = $1")
                .bind(id)
                .fetch_optional(&*self.db)
                .await?;

        Ok(organization)
    }

    async fn organization_by_code(&self, code: &str) -> Result<Option<Organization>> {
        let organization = sqlx::query_as::<_, Organization>(
            "SELECT * FROM organizations WHERE UPPER(code) = UPPER($1) AND is_active",
        )
        .bind(code)
        .fetch_optional(&*self.db)
        .await?;

        Ok(organization)
    }

    async fn create_organization_with_admin(
        &self,
        name: &str,
        code: &str,
        admin_user_id: Uuid,
    ) -> Result<Organization> {
        let mut tx = self.db.begin().await?;

        let organization = sqlx::query_as::<_, Organization>(
            r#"
            INSERT INTO organizations (
                id,
                name,
                code,
                created_by
            ) VALUES (
                $1, $2, $3, $4
            ) RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(code)
        .bind(admin_user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|err| map_unique_violation(err, "organization code"))?;

        sqlx::query(
            "INSERT INTO organization_memberships (id, user_id, organization_id, role) VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::new_v4())
        .bind(admin_user_id)
        .bind(organization.id)
        .bind(MembershipRole::Admin)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(organization)
    }

    async fn list_active_organizations(&self) -> Result<Vec<Organization>> {
        let organizations = sqlx::query_as::<_, Organization>(
            "SELECT * FROM organizations WHERE is_active ORDER BY name",
        )
        .fetch_all(&*self.db)
        .await?;

        Ok(organizations)
    }

    async fn deactivate_organization(&self, id: Uuid) -> Result<()> {
        let result =
            sqlx::query("UPDATE organizations SET is_active = FALSE, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .execute(&*self.db)
                .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("organization"));
        }

        Ok(())
    }
}

#[async_trait]
impl MembershipStore for PgStore {
    async fn find_membership(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> Result<Option<OrganizationMembership>> {
        let membership = sqlx::query_as::<_, OrganizationMembership>(
            "SELECT * FROM organization_memberships WHERE user_id = $1 AND organization_id = $2",
        )
        .bind(user_id)
        .bind(organization_id)
        .fetch_optional(&*self.db)
        .await?;

        Ok(membership)
    }

    async fn insert_membership(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
        role: MembershipRole,
    ) -> Result<OrganizationMembership> {
        // Racing inserts are settled by the (user_id, organization_id)
        // unique constraint below; the lookup reports the common case first.
        if self.find_membership(user_id, organization_id).await?.is_some() {
            return Err(StoreError::Conflict("membership"));
        }

        sqlx::query_as::<_, OrganizationMembership>(
            r#"
            INSERT INTO organization_memberships (
                id,
                user_id,
                organization_id,
                role
            ) VALUES (
                $1, $2, $3, $4
            ) RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(organization_id)
        .bind(role)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| map_unique_violation(err, "membership"))
    }

    async fn delete_membership(&self, user_id: Uuid, organization_id: Uuid) -> Result<()> {
        sqlx::query(
            "DELETE FROM organization_memberships WHERE user_id = $1 AND organization_id = $2",
        )
        .bind(user_id)
        .bind(organization_id)
        .execute(&*self.db)
        .await?;

        Ok(())
    }

    async fn memberships_for_user(&self, user_id: Uuid) -> Result<Vec<UserOrganization>> {
        let memberships = sqlx::query_as::<_, UserOrganization>(
            r#"
            SELECT
                o.id AS organization_id,
                o.name,
                o.code,
                m.role,
                (m.role = 'admin') AS is_admin
            FROM organization_memberships m
            JOIN organizations o ON o.id = m.organization_id
            WHERE m.user_id = $1 AND o.is_active
            ORDER BY m.joined_at"#,
        )
        .bind(user_id)
        .fetch_all(&*self.db)
        .await?;

        Ok(memberships)
    }

    async fn memberships_for_organization(
        &self,
        organization_id: Uuid,
    ) -> Result<Vec<OrganizationMember>> {
        let members = sqlx::query_as::<_, OrganizationMember>(
            r#"
            SELECT
                p.id AS user_id,
                p.email,
                p.first_name,
                p.last_name,
                m.role
            FROM organization_memberships m
            JOIN profiles p ON p.id = m.user_id
            WHERE m.organization_id = $1
            ORDER BY m.joined_at"#,
        )
        .bind(organization_id)
        .fetch_all(&*self.db)
        .await?;

        Ok(members)
    }

    async fn member_counts(&self, organization_ids: &[Uuid]) -> Result<HashMap<Uuid, i64>> {
        let counts = sqlx::query_as::<_, (Uuid, i64)>(
            r#"
            SELECT organization_id, COUNT(*)
            FROM organization_memberships
            WHERE organization_id = ANY($1)
            GROUP BY organization_id"#,
        )
        .bind(organization_ids)
        .fetch_all(&*self.db)
        .await?;

        Ok(counts.into_iter().collect())
    }
}
