//! Bearer-token resolution against the identity provider

use crate::config::IdentityConfig;
use crate::error::{AppError, AppErrorKind, AuthError};
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;
use uuid::Uuid;

/// Resolves caller bearer tokens to user ids.
///
/// Constructed once at startup with the identity provider's base URL and
/// service key; every protected endpoint goes through `resolve_user`.
pub struct IdentityVerifier {
    http: reqwest::Client,
    base_url: String,
    service_key: String,
}

#[derive(Debug, Deserialize)]
struct IdentityUser {
    id: Uuid,
}

impl IdentityVerifier {
    pub fn new(config: &IdentityConfig) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout))
            .build()
            .map_err(|e| {
                AppError::new(AppErrorKind::Infrastructure(
                    crate::error::InfrastructureError::Configuration {
                        message: format!("failed to initialize identity HTTP client: {}", e),
                    },
                ))
            })?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            service_key: config.service_key.clone(),
        })
    }

    /// Verify a bearer token and return the user id it belongs to.
    pub async fn resolve_user(&self, bearer_token: &str) -> Result<Uuid, AppError> {
        if bearer_token.trim().is_empty() {
            return Err(AppError::new(AppErrorKind::Auth(AuthError::MissingToken)));
        }

        let url = format!("{}/auth/v1/user", self.base_url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(bearer_token)
            .header("apikey", &self.service_key)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "identity provider request failed");
                AppError::new(AppErrorKind::Auth(AuthError::InvalidToken {
                    reason: "identity provider unreachable".to_string(),
                }))
            })?;

        if !response.status().is_success() {
            return Err(AppError::new(AppErrorKind::Auth(AuthError::InvalidToken {
                reason: "token rejected".to_string(),
            })));
        }

        let user: IdentityUser = response.json().await.map_err(|_| {
            AppError::new(AppErrorKind::Auth(AuthError::InvalidToken {
                reason: "unexpected identity response".to_string(),
            }))
        })?;

        Ok(user.id)
    }
}

/// Extract the bearer token from an Authorization header value.
pub fn bearer_token(headers: &axum::http::HeaderMap) -> Result<&str, AppError> {
    let value = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::new(AppErrorKind::Auth(AuthError::MissingToken)))?;

    value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::new(AppErrorKind::Auth(AuthError::MissingToken)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderMap, HeaderValue};

    #[test]
    fn bearer_token_extracted() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc.def.ghi"),
        );

        assert_eq!(bearer_token(&headers).expect("token"), "abc.def.ghi");
    }

    #[test]
    fn missing_header_is_auth_error() {
        let headers = HeaderMap::new();
        let err = bearer_token(&headers).expect_err("should fail");
        assert_eq!(err.status_code(), 401);
    }

    #[test]
    fn non_bearer_scheme_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Basic dXNlcjpwYXNz"),
        );

        assert!(bearer_token(&headers).is_err());
    }
}
