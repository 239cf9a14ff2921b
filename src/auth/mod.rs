use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::SecurityConfig;
use crate::i18n::Language;

/// What a token may be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
    PasswordReset,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User uuid
    pub sub: Uuid,
    pub kind: TokenKind,
    /// Session language picked with `POST /language`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<Language>,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AuthError {
    #[error("JWT secret not configured")]
    InvalidSecret,

    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Invalid JWT token: {0}")]
    InvalidToken(String),

    #[error("Token cannot be used for {0:?}")]
    WrongTokenKind(TokenKind),
}

/// Access and refresh token issued together
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    /// Seconds until the access token expires
    pub expires_in: i64,
}

/// Signing keys and lifetimes for every token kind
#[derive(Clone)]
pub struct JwtKeys {
    secret: Vec<u8>,
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
    reset_ttl: Duration,
}

impl JwtKeys {
    pub fn from_config(security: &SecurityConfig) -> Result<Self, AuthError> {
        if security.jwt_secret.is_empty() {
            return Err(AuthError::InvalidSecret);
        }
        let secret = security.jwt_secret.as_bytes();
        Ok(Self {
            secret: secret.to_vec(),
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            access_ttl: Duration::hours(security.jwt_expiry_hours as i64),
            refresh_ttl: Duration::hours(security.refresh_token_expiry_hours as i64),
            reset_ttl: Duration::minutes(security.reset_token_expiry_minutes as i64),
        })
    }

    pub fn ttl(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
            TokenKind::PasswordReset => self.reset_ttl,
        }
    }

    fn claims(&self, user_uuid: Uuid, kind: TokenKind, lang: Option<Language>) -> Claims {
        let now = Utc::now();
        Claims {
            sub: user_uuid,
            kind,
            lang,
            exp: (now + self.ttl(kind)).timestamp(),
            iat: now.timestamp(),
        }
    }

    /// Sign with the shared secret. Reset tokens signed here are rejected by
    /// [`JwtKeys::validate_reset`]; use [`JwtKeys::generate_reset`] for those.
    pub fn generate(&self, user_uuid: Uuid, kind: TokenKind, lang: Option<Language>) -> Result<String, AuthError> {
        encode(&Header::default(), &self.claims(user_uuid, kind, lang), &self.encoding)
            .map_err(|e| AuthError::TokenGeneration(e.to_string()))
    }

    /// Fresh access and refresh token for one session
    pub fn issue_pair(&self, user_uuid: Uuid, lang: Option<Language>) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            token: self.generate(user_uuid, TokenKind::Access, lang)?,
            refresh_token: self.generate(user_uuid, TokenKind::Refresh, lang)?,
            token_type: "Bearer",
            expires_in: self.access_ttl.num_seconds(),
        })
    }

    /// Decode and check signature, expiry and kind
    pub fn validate(&self, token: &str, kind: TokenKind) -> Result<Claims, AuthError> {
        let claims = decode::<Claims>(token, &self.decoding, &Validation::default())
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?
            .claims;

        if claims.kind != kind {
            return Err(AuthError::WrongTokenKind(kind));
        }
        Ok(claims)
    }

    // Reset tokens are signed with the secret plus the current password hash,
    // so a token stops verifying once the password changes.
    fn reset_secret(&self, password_hash: &str) -> Vec<u8> {
        let mut secret = self.secret.clone();
        secret.push(b':');
        secret.extend_from_slice(password_hash.as_bytes());
        secret
    }

    pub fn generate_reset(&self, user_uuid: Uuid, password_hash: &str) -> Result<String, AuthError> {
        let key = EncodingKey::from_secret(&self.reset_secret(password_hash));
        encode(&Header::default(), &self.claims(user_uuid, TokenKind::PasswordReset, None), &key)
            .map_err(|e| AuthError::TokenGeneration(e.to_string()))
    }

    /// User a reset token claims to belong to. Expiry and kind are checked,
    /// the signature is not; follow up with [`JwtKeys::validate_reset`].
    pub fn reset_subject(&self, token: &str) -> Result<Uuid, AuthError> {
        let mut validation = Validation::default();
        validation.insecure_disable_signature_validation();
        let claims = decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?
            .claims;

        if claims.kind != TokenKind::PasswordReset {
            return Err(AuthError::WrongTokenKind(TokenKind::PasswordReset));
        }
        Ok(claims.sub)
    }

    /// Verify a reset token against the password hash it was issued for
    pub fn validate_reset(&self, token: &str, password_hash: &str) -> Result<Claims, AuthError> {
        let key = DecodingKey::from_secret(&self.reset_secret(password_hash));
        let claims = decode::<Claims>(token, &key, &Validation::default())
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?
            .claims;

        if claims.kind != TokenKind::PasswordReset {
            return Err(AuthError::WrongTokenKind(TokenKind::PasswordReset));
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn keys() -> JwtKeys {
        JwtKeys::from_config(&AppConfig::local().security).unwrap()
    }

    #[test]
    fn test_access_token_round_trip() {
        let keys = keys();
        let user = Uuid::new_v4();
        let token = keys.generate(user, TokenKind::Access, None).unwrap();
        let claims = keys.validate(&token, TokenKind::Access).unwrap();
        assert_eq!(claims.sub, user);
        assert_eq!(claims.lang, None);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_token_kind_is_enforced() {
        let keys = keys();
        let token = keys.generate(Uuid::new_v4(), TokenKind::Refresh, None).unwrap();
        assert_eq!(
            keys.validate(&token, TokenKind::Access).unwrap_err(),
            AuthError::WrongTokenKind(TokenKind::Access)
        );
    }

    #[test]
    fn test_pair_carries_session_language() {
        let keys = keys();
        let user = Uuid::new_v4();
        let pair = keys.issue_pair(user, Some(Language::Id)).unwrap();
        assert_eq!(pair.token_type, "Bearer");
        assert_eq!(pair.expires_in, keys.ttl(TokenKind::Access).num_seconds());

        let access = keys.validate(&pair.token, TokenKind::Access).unwrap();
        let refresh = keys.validate(&pair.refresh_token, TokenKind::Refresh).unwrap();
        assert_eq!(access.lang, Some(Language::Id));
        assert_eq!(refresh.sub, user);
        assert!(refresh.exp > access.exp);
    }

    #[test]
    fn test_reset_token_is_bound_to_password_hash() {
        let keys = keys();
        let user = Uuid::new_v4();
        let token = keys.generate_reset(user, "$2b$04$first-hash").unwrap();

        assert_eq!(keys.reset_subject(&token).unwrap(), user);
        assert_eq!(keys.validate_reset(&token, "$2b$04$first-hash").unwrap().sub, user);
        assert!(matches!(
            keys.validate_reset(&token, "$2b$04$second-hash"),
            Err(AuthError::InvalidToken(_))
        ));
        assert!(keys.validate(&token, TokenKind::PasswordReset).is_err());
    }

    #[test]
    fn test_reset_subject_rejects_other_kinds() {
        let keys = keys();
        let token = keys.generate(Uuid::new_v4(), TokenKind::Access, None).unwrap();
        assert_eq!(
            keys.reset_subject(&token).unwrap_err(),
            AuthError::WrongTokenKind(TokenKind::PasswordReset)
        );
        assert!(keys.reset_subject("not-a-token").is_err());
    }

    #[test]
    fn test_foreign_signature_is_rejected() {
        let mut other = AppConfig::local().security;
        other.jwt_secret = "another-secret".to_string();
        let token = JwtKeys::from_config(&other)
            .unwrap()
            .generate(Uuid::new_v4(), TokenKind::Access, None)
            .unwrap();
        assert!(matches!(
            keys().validate(&token, TokenKind::Access),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_empty_secret_is_rejected() {
        let mut security = AppConfig::local().security;
        security.jwt_secret.clear();
        assert!(matches!(JwtKeys::from_config(&security), Err(AuthError::InvalidSecret)));
    }
}
