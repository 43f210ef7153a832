use chrono::{DateTime, TimeZone, Utc};
use hmac::{Hmac, Mac};
use jwt::{Claims, Header, RegisteredClaims, SignWithKey, Token, VerifyWithKey};
use sha2::Sha256;
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::database::Session;

/// The claims carried by a session token. The session id doubles as the
/// token id so revoking the session invalidates the token.
pub struct JwtState {
    pub user_id: Uuid,
    pub session_id: Uuid,
    pub expiration: Option<DateTime<Utc>>,
    pub issued_at: DateTime<Utc>,
}

impl JwtState {
    pub fn serialize(&self, config: &JwtConfig) -> Option<String> {
        let key = Hmac::<Sha256>::new_from_slice(config.secret.as_bytes()).ok()?;
        let claims = Claims::new(RegisteredClaims {
            issued_at: Some(self.issued_at.timestamp() as u64),
            expiration: self.expiration.map(|x| x.timestamp() as u64),
            issuer: Some(config.issuer.clone()),
            json_web_token_id: Some(self.session_id.to_string()),
            subject: Some(self.user_id.to_string()),
            not_before: None,
            audience: None,
        });

        claims.sign_with_key(&key).ok()
    }

    pub fn verify(config: &JwtConfig, token: &str) -> Option<Self> {
        let key = Hmac::<Sha256>::new_from_slice(config.secret.as_bytes()).ok()?;
        let token: Token<Header, Claims, _> = token.verify_with_key(&key).ok()?;

        let claims = token.claims();

        if claims.registered.issuer.clone()? != config.issuer {
            return None;
        }

        let iat = Utc
            .timestamp_opt(claims.registered.issued_at? as i64, 0)
            .single()?;
        if iat > Utc::now() {
            return None;
        }

        let exp = claims
            .registered
            .expiration
            .and_then(|x| Utc.timestamp_opt(x as i64, 0).single());
        if let Some(exp) = exp {
            if exp < Utc::now() {
                return None;
            }
        }

        let user_id = claims.registered.subject.clone()?.parse::<Uuid>().ok()?;
        let session_id = claims
            .registered
            .json_web_token_id
            .clone()?
            .parse::<Uuid>()
            .ok()?;

        Some(JwtState {
            user_id,
            session_id,
            expiration: exp,
            issued_at: iat,
        })
    }
}

impl From<Session> for JwtState {
    fn from(session: Session) -> Self {
        JwtState {
            user_id: session.user_id,
            session_id: session.id,
            expiration: Some(session.expires_at),
            issued_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn config() -> JwtConfig {
        JwtConfig {
            issuer: "elev8-test".into(),
            secret: "not-a-real-secret".into(),
        }
    }

    fn state() -> JwtState {
        JwtState {
            user_id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            expiration: Some(Utc::now() + Duration::hours(1)),
            issued_at: Utc::now(),
        }
    }

    #[test]
    fn tokens_round_trip() {
        let config = config();
        let state = state();

        let token = state.serialize(&config).unwrap();
        let verified = JwtState::verify(&config, &token).unwrap();

        assert_eq!(verified.user_id, state.user_id);
        assert_eq!(verified.session_id, state.session_id);
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let config = config();
        let state = JwtState {
            expiration: Some(Utc::now() - Duration::hours(1)),
            ..state()
        };

        let token = state.serialize(&config).unwrap();
        assert!(JwtState::verify(&config, &token).is_none());
    }

    #[test]
    fn wrong_secret_and_issuer_are_rejected() {
        let config = config();
        let token = state().serialize(&config).unwrap();

        let other_secret = JwtConfig {
            secret: "different".into(),
            ..config.clone()
        };
        assert!(JwtState::verify(&other_secret, &token).is_none());

        let other_issuer = JwtConfig {
            issuer: "someone-else".into(),
            ..config
        };
        assert!(JwtState::verify(&other_issuer, &token).is_none());
    }
}
