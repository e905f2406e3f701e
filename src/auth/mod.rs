use axum::http::{header, HeaderMap};
use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SecurityConfig;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub exp: i64,
    pub iat: i64,
}

/// Caller resolved from a verified token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub subject: String,
    pub email: Option<String>,
    pub role: Option<String>,
}

impl Identity {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            email: None,
            role: None,
        }
    }
}

impl From<Claims> for Identity {
    fn from(claims: Claims) -> Self {
        Self {
            subject: claims.sub,
            email: claims.email,
            role: claims.role,
        }
    }
}

/// Why a credential was refused. Logged, never sent to the client.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("no token in cookie or Authorization header")]
    MissingToken,

    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("token expired")]
    Expired,

    #[error("token signature mismatch")]
    InvalidSignature,

    #[error("token generation failed: {0}")]
    Signing(String),
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => AuthError::Expired,
            ErrorKind::InvalidSignature => AuthError::InvalidSignature,
            _ => AuthError::Malformed(err.to_string()),
        }
    }
}

/// Verifies HS256 tokens carried in a cookie or a bearer header
#[derive(Clone)]
pub struct AuthGate {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    cookie_name: String,
    expiry: Duration,
}

impl AuthGate {
    pub fn new(security: &SecurityConfig) -> Self {
        let secret = security.jwt_secret.as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            cookie_name: security.auth_cookie.clone(),
            expiry: Duration::hours(security.jwt_expiry_hours as i64),
        }
    }

    /// Resolve the caller of a request from its headers
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Identity, AuthError> {
        let token = self.extract_token(headers).ok_or(AuthError::MissingToken)?;
        self.verify(&token)
    }

    pub fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        if data.claims.sub.trim().is_empty() {
            return Err(AuthError::Malformed("empty subject".to_string()));
        }
        Ok(Identity::from(data.claims))
    }

    /// Sign a token for `identity` using the configured expiry window
    pub fn issue(&self, identity: &Identity) -> Result<String, AuthError> {
        self.issue_with_expiry(identity, self.expiry)
    }

    pub fn issue_with_expiry(
        &self,
        identity: &Identity,
        expires_in: Duration,
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: identity.subject.clone(),
            email: identity.email.clone(),
            role: identity.role.clone(),
            exp: (now + expires_in).timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    /// Cookie first, then `Authorization: Bearer`
    fn extract_token(&self, headers: &HeaderMap) -> Option<String> {
        self.token_from_cookies(headers)
            .or_else(|| token_from_authorization(headers))
    }

    fn token_from_cookies(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| name.trim() == self.cookie_name)
            .map(|(_, value)| value.trim().trim_matches('"').to_string())
            .filter(|token| !token.is_empty())
    }
}

fn token_from_authorization(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use axum::http::HeaderValue;

    fn gate(secret: &str) -> AuthGate {
        let mut config = AppConfig::development();
        config.security.jwt_secret = secret.to_string();
        AuthGate::new(&config.security)
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        headers
    }

    #[test]
    fn issued_token_round_trips_through_bearer_header() {
        let gate = gate("s3cret");
        let identity = Identity {
            subject: "user-42".into(),
            email: Some("agent@x.com".into()),
            role: None,
        };
        let token = gate.issue(&identity).unwrap();

        assert_eq!(gate.authenticate(&bearer(&token)).unwrap(), identity);
    }

    #[test]
    fn cookie_token_is_accepted() {
        let gate = gate("s3cret");
        let token = gate.issue(&Identity::new("user-1")).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("theme=dark; token={}", token)).unwrap(),
        );

        assert_eq!(gate.authenticate(&headers).unwrap().subject, "user-1");
    }

    #[test]
    fn cookie_wins_over_authorization_header() {
        let gate = gate("s3cret");
        let cookie_token = gate.issue(&Identity::new("from-cookie")).unwrap();
        let header_token = gate.issue(&Identity::new("from-header")).unwrap();

        let mut headers = bearer(&header_token);
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("token={}", cookie_token)).unwrap(),
        );

        assert_eq!(gate.authenticate(&headers).unwrap().subject, "from-cookie");
    }

    #[test]
    fn missing_token_is_reported() {
        assert_eq!(
            gate("s3cret").authenticate(&HeaderMap::new()),
            Err(AuthError::MissingToken)
        );

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(
            gate("s3cret").authenticate(&headers),
            Err(AuthError::MissingToken)
        );
    }

    #[test]
    fn expired_token_is_rejected() {
        let gate = gate("s3cret");
        let token = gate
            .issue_with_expiry(&Identity::new("user-1"), Duration::hours(-2))
            .unwrap();
        assert_eq!(gate.verify(&token), Err(AuthError::Expired));
    }

    #[test]
    fn token_from_another_secret_is_rejected() {
        let token = gate("other").issue(&Identity::new("user-1")).unwrap();
        assert_eq!(gate("s3cret").verify(&token), Err(AuthError::InvalidSignature));
    }

    #[test]
    fn garbage_token_is_malformed() {
        assert!(matches!(
            gate("s3cret").verify("not.a.jwt"),
            Err(AuthError::Malformed(_))
        ));
    }
}
