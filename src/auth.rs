use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AuthConfig;
use crate::models::Coach;

pub const SESSION_COOKIE: &str = "auth_token";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("failed to sign session token: {0}")]
    Signing(jsonwebtoken::errors::Error),

    #[error("invalid session token")]
    InvalidToken,

    #[error("session lifetime of {0} hours is out of range")]
    Lifetime(i64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub id: i32,
    pub team_id: Option<i32>,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signs and verifies coach session tokens.
pub struct SessionService {
    expiry_hours: i64,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl SessionService {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            expiry_hours: config.token_expiry_hours,
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
        }
    }

    pub fn issue(&self, coach: &Coach) -> Result<String, AuthError> {
        let now = Utc::now();
        let expires = Duration::try_hours(self.expiry_hours)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or(AuthError::Lifetime(self.expiry_hours))?;
        let claims = Claims {
            id: coach.id,
            team_id: coach.team_id,
            email: coach.email.clone(),
            iat: now.timestamp(),
            exp: expires.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(AuthError::Signing)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|_| AuthError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(secret: &str) -> AuthConfig {
        AuthConfig {
            secret: secret.to_string(),
            token_expiry_hours: 24,
        }
    }

    fn coach() -> Coach {
        Coach {
            id: 7,
            email: "coach@example.com".to_string(),
            team_id: Some(1),
        }
    }

    #[test]
    fn issued_token_verifies() {
        let sessions = SessionService::new(&config("test_secret_key_for_testing_only"));
        let token = sessions.issue(&coach()).unwrap();

        let claims = sessions.verify(&token).unwrap();
        assert_eq!(claims.id, 7);
        assert_eq!(claims.team_id, Some(1));
        assert_eq!(claims.email, "coach@example.com");
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn token_from_another_secret_is_rejected() {
        let issuer = SessionService::new(&config("first_secret"));
        let verifier = SessionService::new(&config("second_secret"));
        let token = issuer.issue(&coach()).unwrap();

        assert!(matches!(verifier.verify(&token), Err(AuthError::InvalidToken)));
        assert!(matches!(verifier.verify("not-a-token"), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let sessions = SessionService::new(&AuthConfig {
            secret: "short_lived".to_string(),
            token_expiry_hours: -2,
        });
        let token = sessions.issue(&coach()).unwrap();
        assert!(matches!(sessions.verify(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn out_of_range_lifetime_is_an_error() {
        let sessions = SessionService::new(&AuthConfig {
            secret: "forever".to_string(),
            token_expiry_hours: i64::MAX / 10,
        });
        assert!(matches!(sessions.issue(&coach()), Err(AuthError::Lifetime(_))));
    }
}
