use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AtlasError;
use crate::router::AtlasState;

/// Claims carried by the bearer token issued by the account service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i64,
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
}

/// Verify an HS256 token and return its claims. Expiry is enforced.
pub fn verify_token(token: &str, key: &DecodingKey) -> Result<Claims, AtlasError> {
    let validation = Validation::new(Algorithm::HS256);
    let data = decode::<Claims>(token, key, &validation)?;
    Ok(data.claims)
}

/// Extractor guarding every route except the health check.
/// Requires `Authorization: Bearer <jwt>` signed with the configured secret.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    pub fn user_id(&self) -> i64 {
        self.0.user_id
    }
}

impl FromRequestParts<AtlasState> for AuthUser {
    type Rejection = AtlasError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AtlasState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AtlasError::Unauthorized)?;
        let claims = verify_token(bearer.token(), &state.decoding_key).inspect_err(|e| {
            debug!(error = %e, "rejected bearer token");
        })?;
        Ok(Self(claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};

    fn token(secret: &str, exp: i64) -> String {
        let claims = Claims {
            user_id: 42,
            exp,
            iat: None,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn valid_token_yields_claims() {
        let exp = chrono::Utc::now().timestamp() + 600;
        let claims = verify_token(&token("k", exp), &DecodingKey::from_secret(b"k")).unwrap();
        assert_eq!(claims.user_id, 42);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let exp = chrono::Utc::now().timestamp() + 600;
        let err = verify_token(&token("k", exp), &DecodingKey::from_secret(b"other")).unwrap_err();
        assert!(matches!(err, AtlasError::Jwt(_)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let exp = chrono::Utc::now().timestamp() - 3600;
        assert!(verify_token(&token("k", exp), &DecodingKey::from_secret(b"k")).is_err());
    }
}
