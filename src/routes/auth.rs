//! Staff authentication: bearer tokens issued by the hosted auth provider.

use crate::routes::error::ApiError;
use crate::routes::AppState;
use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use futures::future::{ready, Ready};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,

    #[error("invalid token: {0}")]
    InvalidToken(String),
}

/// Claims read from a provider token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    pub exp: usize,
}

/// HS256 verification against the provider's signing secret
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &str, audience: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[audience]);

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }

    /// Verify an `Authorization` header value
    pub fn verify_header(&self, value: Option<&str>) -> Result<Claims, AuthError> {
        let token = value
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingToken)?;
        self.verify(token)
    }
}

/// An authenticated staff member; add as a handler argument to require auth
#[derive(Debug, Clone)]
pub struct StaffUser {
    pub id: String,
    pub email: Option<String>,
}

impl FromRequest for StaffUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let Some(state) = req.app_data::<web::Data<AppState>>() else {
            return ready(Err(ApiError::Internal("application state missing".to_string())));
        };

        let header = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());

        ready(match state.auth.verify_header(header) {
            Ok(claims) => Ok(StaffUser {
                id: claims.sub,
                email: claims.email,
            }),
            Err(e) => {
                tracing::debug!("Rejected request to {}: {}", req.path(), e);
                Err(ApiError::Unauthorized(e.to_string()))
            }
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    #[derive(Serialize)]
    struct TestClaims<'a> {
        sub: &'a str,
        aud: &'a str,
        exp: usize,
    }

    pub(crate) fn token(secret: &str, audience: &str, expires_in_secs: i64) -> String {
        let exp = (chrono::Utc::now().timestamp() + expires_in_secs) as usize;
        encode(
            &Header::new(Algorithm::HS256),
            &TestClaims {
                sub: "staff-1",
                aud: audience,
                exp,
            },
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_valid_token() {
        let verifier = TokenVerifier::new("secret", "authenticated");
        let header = format!("Bearer {}", token("secret", "authenticated", 3600));
        let claims = verifier.verify_header(Some(&header)).unwrap();
        assert_eq!(claims.sub, "staff-1");
    }

    #[test]
    fn test_rejections() {
        let verifier = TokenVerifier::new("secret", "authenticated");

        assert!(matches!(verifier.verify_header(None), Err(AuthError::MissingToken)));
        assert!(matches!(
            verifier.verify_header(Some("Basic abc")),
            Err(AuthError::MissingToken)
        ));
        assert!(verifier.verify(&token("other-secret", "authenticated", 3600)).is_err());
        assert!(verifier.verify(&token("secret", "anon", 3600)).is_err());
        assert!(verifier.verify(&token("secret", "authenticated", -3600)).is_err());
    }
}
