//! Bearer token issuance, verification and refresh.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::error::{FieldErrors, ServiceError, NON_FIELD_ERRORS};
use crate::request::UserId;
use crate::user::UserRecord;

/// Token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Account id
    pub user_id: UserId,
    /// Username at issue time
    pub username: String,
    /// Email at issue time
    pub email: String,
    /// Expiry, seconds since the epoch
    pub exp: i64,
    /// When the first token of this refresh chain was issued
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orig_iat: Option<i64>,
    /// Unique token id, so a refresh never reproduces the same token
    pub jti: String,
}

/// Token failures; the messages go back to the client verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// `exp` is in the past
    #[error("Signature has expired.")]
    Expired,
    /// Bad signature, bad encoding or missing claims
    #[error("Error decoding signature.")]
    Invalid,
    /// The refresh chain is older than the refresh window
    #[error("Refresh has expired.")]
    RefreshExpired,
    /// The token predates refresh support
    #[error("orig_iat field is required.")]
    MissingOrigIat,
    /// Signing failed
    #[error("token encoding failed: {0}")]
    Encoding(String),
}

impl From<TokenError> for ServiceError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Encoding(message) => ServiceError::Internal(message),
            other => ServiceError::Invalid(FieldErrors::single(NON_FIELD_ERRORS, other.to_string())),
        }
    }
}

/// HS256 token service.
///
/// # Examples
///
/// ```
/// use account_policy::TokenService;
/// use chrono::Duration;
///
/// let tokens = TokenService::new(b"signing-key", Duration::minutes(5), Duration::days(7));
/// # let user = account_policy::UserRecord {
/// #     id: 1, username: "john".into(), email: "".into(), first_name: "".into(),
/// #     last_name: "".into(), password_hash: "".into(), is_active: true,
/// #     is_staff: false,
/// # };
/// let token = tokens.issue(&user).unwrap();
/// let claims = tokens.decode(&token).unwrap();
/// assert_eq!(claims.user_id, 1);
/// ```
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    expiration: Duration,
    refresh_window: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("expiration", &self.expiration)
            .field("refresh_window", &self.refresh_window)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    /// Creates a service signing with `secret`.
    pub fn new(secret: &[u8], expiration: Duration, refresh_window: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            expiration,
            refresh_window,
        }
    }

    /// Issues a fresh token for `user`.
    pub fn issue(&self, user: &UserRecord) -> Result<String, TokenError> {
        self.issue_at(user, Utc::now())
    }

    pub(crate) fn issue_at(&self, user: &UserRecord, now: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = Claims {
            user_id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            exp: (now + self.expiration).timestamp(),
            orig_iat: Some(now.timestamp()),
            jti: Uuid::new_v4().to_string(),
        };
        self.sign(&claims)
    }

    fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Verifies the signature and expiry and returns the claims.
    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }

    /// Issues a new token with a fresh expiry, keeping `orig_iat`.
    ///
    /// The old token must still be valid, and the chain must be younger
    /// than the refresh window.
    pub fn refresh(&self, token: &str) -> Result<(Claims, String), TokenError> {
        self.refresh_at(token, Utc::now())
    }

    pub(crate) fn refresh_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<(Claims, String), TokenError> {
        let claims = self.decode(token)?;
        let orig_iat = claims.orig_iat.ok_or(TokenError::MissingOrigIat)?;
        if orig_iat + self.refresh_window.num_seconds() < now.timestamp() {
            return Err(TokenError::RefreshExpired);
        }

        let refreshed = Claims {
            exp: (now + self.expiration).timestamp(),
            jti: Uuid::new_v4().to_string(),
            ..claims
        };
        let token = self.sign(&refreshed)?;
        Ok((refreshed, token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> UserRecord {
        UserRecord {
            id: 7,
            username: "john".to_string(),
            email: "lennon@thebeatles.com".to_string(),
            first_name: "John".to_string(),
            last_name: "Lennon".to_string(),
            password_hash: String::new(),
            is_active: true,
            is_staff: false,
        }
    }

    fn service() -> TokenService {
        TokenService::new(b"test-secret", Duration::minutes(5), Duration::days(7))
    }

    #[test]
    fn issued_token_decodes() {
        let tokens = service();
        let token = tokens.issue(&user()).unwrap();
        let claims = tokens.decode(&token).unwrap();

        assert_eq!(claims.user_id, 7);
        assert_eq!(claims.username, "john");
        assert!(claims.orig_iat.is_some());
    }

    #[test]
    fn expired_token_is_rejected() {
        let tokens = service();
        let token = tokens
            .issue_at(&user(), Utc::now() - Duration::hours(1))
            .unwrap();
        assert_eq!(tokens.decode(&token).unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let other = TokenService::new(b"other-secret", Duration::minutes(5), Duration::days(7));
        let token = other.issue(&user()).unwrap();
        assert_eq!(service().decode(&token).unwrap_err(), TokenError::Invalid);
        assert_eq!(service().decode("not.a.token").unwrap_err(), TokenError::Invalid);
    }

    #[test]
    fn refresh_keeps_orig_iat_and_changes_token() {
        let tokens = service();
        let token = tokens.issue(&user()).unwrap();
        let original = tokens.decode(&token).unwrap();

        let (claims, refreshed) = tokens.refresh(&token).unwrap();
        assert_ne!(refreshed, token);
        assert_eq!(claims.orig_iat, original.orig_iat);
        assert_eq!(tokens.decode(&refreshed).unwrap().user_id, 7);
    }

    #[test]
    fn refresh_window_is_enforced() {
        let tokens = TokenService::new(b"test-secret", Duration::hours(1), Duration::seconds(60));
        let token = tokens
            .issue_at(&user(), Utc::now() - Duration::seconds(120))
            .unwrap();

        assert_eq!(tokens.refresh(&token).unwrap_err(), TokenError::RefreshExpired);
    }

    #[test]
    fn refresh_requires_orig_iat() {
        let tokens = service();
        let claims = Claims {
            user_id: 7,
            username: "john".to_string(),
            email: String::new(),
            exp: (Utc::now() + Duration::minutes(5)).timestamp(),
            orig_iat: None,
            jti: "legacy".to_string(),
        };
        let token = tokens.sign(&claims).unwrap();

        assert_eq!(tokens.refresh(&token).unwrap_err(), TokenError::MissingOrigIat);
    }
}
