use chrono::{DateTime, Utc};
use rand::Rng;
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
/// A tenant. Deactivated by an app admin rather than deleted.
pub struct Organization {
    /// The unique identifier for the organization.
    pub id: Uuid,
    /// The display name of the organization.
    pub name: String,
    /// The unique human readable join code.
    pub code: String,
    /// The description of the organization.
    pub description: Option<String>,
    /// The profile that created the organization.
    pub created_by: Option<Uuid>,
    /// Whether the organization is active. Join codes only resolve against
    /// active organizations.
    pub is_active: bool,
    /// The time the organization was created.
    pub created_at: DateTime<Utc>,
    /// The time the organization was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Organization {
    /// Generates a candidate join code. Uniqueness is enforced by the store;
    /// callers retry with a fresh candidate on collision. The alphabet skips
    /// characters that read ambiguously (I/O/0/1).
    pub fn generate_code() -> String {
        const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
        const CODE_LEN: usize = 6;

        let mut rng = rand::thread_rng();
        (0..CODE_LEN)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect()
    }
}

/// An organization together with its member count, as listed for app admins.
#[derive(Debug, Clone, serde::Serialize)]
pub struct OrganizationSummary {
    #[serde(flatten)]
    pub organization: Organization,
    pub member_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_codes_are_uppercase_and_unambiguous() {
        for _ in 0..100 {
            let code = Organization::generate_code();
            assert_eq!(code.len(), 6);
            assert!(code
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
            assert!(!code.contains(['I', 'O', '0', '1']));
        }
    }
}
