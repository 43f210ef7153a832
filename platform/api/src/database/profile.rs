use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
/// An identity record. Created on signup and soft deactivated rather than
/// deleted. The id doubles as the authenticated identity key.
pub struct Profile {
    /// The unique identifier for the profile.
    pub id: Uuid,
    /// The email of the user.
    pub email: String,
    /// The first name of the user.
    pub first_name: String,
    /// The last name of the user.
    pub last_name: String,
    /// Global override flag. App admins pass every permission check and hold
    /// no organization memberships.
    pub is_app_admin: bool,
    /// Whether the profile is active. Profiles are deactivated, never
    /// hard-deleted.
    pub is_active: bool,
    /// The hashed password of the user. (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// The time the profile was created.
    pub created_at: DateTime<Utc>,
    /// The time the profile was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Uses argon2 to verify the password hash against the provided password.
    pub fn verify_password(&self, password: &str) -> bool {
        let hash = match PasswordHash::new(&self.password_hash) {
            Ok(hash) => hash,
            Err(err) => {
                tracing::error!("failed to parse password hash: {}", err);
                return false;
            }
        };

        Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .is_ok()
    }

    /// Generates a new password hash using argon2.
    pub fn hash_password(password: &str) -> String {
        let salt = SaltString::generate(&mut OsRng);

        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .expect("failed to hash password");

        hash.to_string()
    }

    /// Validates an email.
    pub fn validate_email(email: &str) -> Result<(), &'static str> {
        if email.len() < 5 {
            return Err("Email must be at least 5 characters long");
        }

        if email.len() > 100 {
            return Err("Email must be at most 100 characters long");
        }

        if !email_address::EmailAddress::is_valid(email) {
            return Err("Email is not a valid email address");
        }

        Ok(())
    }

    /// Validates a password.
    pub fn validate_password(password: &str) -> Result<(), &'static str> {
        if password.len() < 8 {
            return Err("Password must be at least 8 characters long");
        }

        if password.len() > 100 {
            return Err("Password must be at most 100 characters long");
        }

        if !password.chars().any(|c| c.is_ascii_lowercase()) {
            return Err("Password must contain at least one lowercase character");
        }

        if !password.chars().any(|c| c.is_ascii_uppercase()) {
            return Err("Password must contain at least one uppercase character");
        }

        if !password.chars().any(|c| c.is_ascii_digit()) {
            return Err("Password must contain at least one digit");
        }

        Ok(())
    }
}

/// The fields needed to create a profile row.
#[derive(Debug, Clone)]
pub struct NewProfile {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_app_admin: bool,
    pub password_hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_round_trip() {
        let hash = Profile::hash_password("Sup3rSecret");
        let profile = Profile {
            id: Uuid::new_v4(),
            email: "test@elev8.fit".into(),
            first_name: "Test".into(),
            last_name: "User".into(),
            is_app_admin: false,
            is_active: true,
            password_hash: hash,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert!(profile.verify_password("Sup3rSecret"));
        assert!(!profile.verify_password("Sup3rSecret2"));
    }

    #[test]
    fn email_validation() {
        assert!(Profile::validate_email("coach@elev8.fit").is_ok());
        assert!(Profile::validate_email("nope").is_err());
        assert!(Profile::validate_email("missing-at.example.com").is_err());
    }

    #[test]
    fn password_validation() {
        assert!(Profile::validate_password("Sup3rSecret").is_ok());
        assert!(Profile::validate_password("short1A").is_err());
        assert!(Profile::validate_password("alllowercase1").is_err());
        assert!(Profile::validate_password("ALLUPPERCASE1").is_err());
        assert!(Profile::validate_password("NoDigitsHere").is_err());
    }
}
