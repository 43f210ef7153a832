use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::permissions::Role;

/// A role an organization membership can carry. Deliberately excludes
/// `app-admin`, which is a profile flag and can never be granted per
/// organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipRole {
    Admin,
    Staff,
    Member,
}

impl MembershipRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Staff => "staff",
            Self::Member => "member",
        }
    }

}

impl fmt::Display for MembershipRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown membership role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for MembershipRole {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "staff" => Ok(Self::Staff),
            "member" => Ok(Self::Member),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

impl From<MembershipRole> for Role {
    fn from(role: MembershipRole) -> Self {
        match role {
            MembershipRole::Admin => Role::Admin,
            MembershipRole::Staff => Role::Staff,
            MembershipRole::Member => Role::Member,
        }
    }
}

// The role column is plain TEXT, so the sqlx impls delegate to the string
// codecs and fail decoding on anything outside the closed set.

impl sqlx::Type<sqlx::Postgres> for MembershipRole {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <&str as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <&str as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

impl sqlx::Decode<'_, sqlx::Postgres> for MembershipRole {
    fn decode(
        value: sqlx::postgres::PgValueRef<'_>,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync + 'static>> {
        let value = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(value.parse()?)
    }
}

impl sqlx::Encode<'_, sqlx::Postgres> for MembershipRole {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as sqlx::Encode<sqlx::Postgres>>::encode(self.as_str(), buf)
    }
}

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
/// Binds one profile to one organization with exactly one role. At most one
/// row exists per (user, organization) pair; removing a member deletes the
/// row outright.
pub struct OrganizationMembership {
    /// The unique identifier for the membership.
    pub id: Uuid,
    /// Foreign key to the profiles table.
    pub user_id: Uuid,
    /// Foreign key to the organizations table.
    pub organization_id: Uuid,
    /// The role this membership grants within the organization.
    pub role: MembershipRole,
    /// The time the user joined the organization.
    pub joined_at: DateTime<Utc>,
    /// The time the membership was last updated.
    pub updated_at: DateTime<Utc>,
}

/// One row of a user's organization listing: the membership joined with the
/// organization it points at.
#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct UserOrganization {
    pub organization_id: Uuid,
    pub name: String,
    pub code: String,
    pub role: MembershipRole,
    pub is_admin: bool,
}

/// One row of an organization's member listing: the profile joined with its
/// role.
#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct OrganizationMember {
    pub user_id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: MembershipRole,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_roles_parse_from_storage_form() {
        assert_eq!("admin".parse::<MembershipRole>().unwrap(), MembershipRole::Admin);
        assert_eq!("staff".parse::<MembershipRole>().unwrap(), MembershipRole::Staff);
        assert_eq!("member".parse::<MembershipRole>().unwrap(), MembershipRole::Member);
    }

    #[test]
    fn app_admin_is_not_a_membership_role() {
        assert!("app-admin".parse::<MembershipRole>().is_err());
        assert!(serde_json::from_str::<MembershipRole>("\"app-admin\"").is_err());
    }

    #[test]
    fn membership_roles_widen_to_permission_roles() {
        assert_eq!(Role::from(MembershipRole::Admin), Role::Admin);
        assert_eq!(Role::from(MembershipRole::Staff), Role::Staff);
        assert_eq!(Role::from(MembershipRole::Member), Role::Member);
    }
}
