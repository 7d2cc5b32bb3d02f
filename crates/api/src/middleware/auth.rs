//! Bearer token authentication.
//!
//! The identity provider issues HS256 JWTs. `sub` carries the user id and
//! `email` the account's address. Nothing else in the token is trusted.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use larder_core::{Email, UserId};

use crate::config::JwtConfig;
use crate::error::{AppError, set_sentry_user};
use crate::models::CurrentUser;
use crate::state::AppState;

/// Signing secret used by in-process tests.
#[cfg(test)]
pub(crate) const TEST_JWT_SECRET: &str = "k3Jd9-vQx2Lr7Tz1Wm5Bn8Yc4Hs6Fp0Ga";

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: Uuid,
    #[serde(default)]
    email: Option<String>,
    exp: u64,
    aud: String,
}

/// Verifies bearer tokens against the shared secret and audience.
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    #[must_use]
    pub fn new(config: &JwtConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[config.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "sub", "aud"]);

        Self {
            key: DecodingKey::from_secret(config.secret.expose_secret().as_bytes()),
            validation,
        }
    }

    /// # Errors
    ///
    /// Returns `AppError::Unauthorized` for a bad signature, wrong audience,
    /// expired token or malformed claims.
    pub fn verify(&self, token: &str) -> Result<CurrentUser, AppError> {
        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "Bearer token rejected");
            AppError::Unauthorized("invalid or expired token".to_string())
        })?;

        // An unparseable email claim is dropped rather than rejecting the caller.
        let email = data
            .claims
            .email
            .as_deref()
            .and_then(|raw| Email::parse(raw).ok());

        Ok(CurrentUser {
            id: UserId::from(data.claims.sub),
            email,
        })
    }
}

/// Extractor that requires a valid bearer token.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(RequireUser(user): RequireUser) -> impl IntoResponse {
///     user.id.to_string()
/// }
/// ```
pub struct RequireUser(pub CurrentUser);

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_string()))?;

        let user = state.tokens().verify(token)?;
        tracing::Span::current().record("user_id", tracing::field::display(user.id));
        set_sentry_user(&user.id);

        Ok(Self(user))
    }
}

/// Mint a token the way the identity provider would.
#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) fn test_token(user: &CurrentUser) -> String {
    use jsonwebtoken::{EncodingKey, Header, encode};

    let claims = Claims {
        sub: user.id.as_uuid(),
        email: user.email.as_ref().map(ToString::to_string),
        exp: u64::try_from((chrono::Utc::now() + chrono::Duration::hours(1)).timestamp()).unwrap(),
        aud: "authenticated".to_string(),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use jsonwebtoken::{EncodingKey, Header, encode};

    use super::*;
    use crate::config::AppConfig;

    fn verifier() -> TokenVerifier {
        TokenVerifier::new(&AppConfig::for_tests().jwt)
    }

    fn sign(claims: &Claims, secret: &str) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn claims(aud: &str, exp_offset: i64) -> Claims {
        Claims {
            sub: Uuid::new_v4(),
            email: Some("Alice@Example.com".to_string()),
            exp: u64::try_from(chrono::Utc::now().timestamp() + exp_offset).unwrap(),
            aud: aud.to_string(),
        }
    }

    #[test]
    fn test_valid_token() {
        let claims = claims("authenticated", 3600);
        let user = verifier()
            .verify(&sign(&claims, TEST_JWT_SECRET))
            .unwrap();
        assert_eq!(user.id.as_uuid(), claims.sub);
        assert_eq!(user.email.unwrap().as_str(), "alice@example.com");
    }

    #[test]
    fn test_rejects_wrong_secret_audience_and_expiry() {
        let v = verifier();
        let other_secret = sign(
            &claims("authenticated", 3600),
            "a-completely-different-secret-value",
        );
        assert!(matches!(v.verify(&other_secret), Err(AppError::Unauthorized(_))));

        let wrong_aud = sign(&claims("anon", 3600), TEST_JWT_SECRET);
        assert!(v.verify(&wrong_aud).is_err());

        let expired = sign(&claims("authenticated", -3600), TEST_JWT_SECRET);
        assert!(v.verify(&expired).is_err());
    }

    #[test]
    fn test_bad_email_claim_is_dropped() {
        let mut claims = claims("authenticated", 3600);
        claims.email = Some("not-an-email".to_string());
        let user = verifier()
            .verify(&sign(&claims, TEST_JWT_SECRET))
            .unwrap();
        assert!(user.email.is_none());
    }
}
