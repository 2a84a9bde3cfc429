//! Who is calling: end users via the auth gateway header, and the identity
//! and ad services via the admin token.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use barakholka_shared::constants::USER_ID_HEADER;
use barakholka_shared::{User, UserId};
use subtle::ConstantTimeEq;

use crate::api::AppState;
use crate::config::ServerConfig;
use crate::error::ServerError;

/// The authenticated user, resolved from the `X-User-Id` header that the
/// upstream auth gateway sets. Unknown ids are rejected.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    pub fn id(&self) -> UserId {
        self.0.id
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let id: UserId = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(ServerError::Unauthorized)?
            .parse()
            .map_err(|_| ServerError::Unauthorized)?;

        let user = state
            .with_db(move |db| db.get_user(id))
            .await
            .map_err(|e| match e {
                ServerError::NotFound(_) => ServerError::Forbidden("Unknown user".into()),
                other => other,
            })?;

        Ok(CurrentUser(user))
    }
}

/// Statistics endpoints are for staff accounts only.
pub fn require_staff(user: &CurrentUser) -> Result<(), ServerError> {
    if user.0.is_staff {
        Ok(())
    } else {
        Err(ServerError::Forbidden("Staff only".into()))
    }
}

/// Check the bearer token of a directory sync call.
pub fn verify_admin_token(headers: &HeaderMap, config: &ServerConfig) -> Result<(), ServerError> {
    let Some(ref expected) = config.admin_token else {
        return Err(ServerError::Forbidden(
            "Directory API is disabled (no ADMIN_TOKEN configured)".into(),
        ));
    };

    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or(auth);

    // Constant-time comparison to prevent timing attacks on the token.
    let token_bytes = token.as_bytes();
    let expected_bytes = expected.as_bytes();
    if token_bytes.len() != expected_bytes.len()
        || token_bytes.ct_eq(expected_bytes).unwrap_u8() != 1
    {
        return Err(ServerError::Forbidden("Invalid admin token".into()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn config_with_token(token: Option<&str>) -> ServerConfig {
        ServerConfig {
            admin_token: token.map(str::to_string),
            ..ServerConfig::default()
        }
    }

    #[test]
    fn test_admin_token_accepted() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer hunter2"));
        assert!(verify_admin_token(&headers, &config_with_token(Some("hunter2"))).is_ok());
    }

    #[test]
    fn test_admin_token_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer hunter3"));
        assert!(verify_admin_token(&headers, &config_with_token(Some("hunter2"))).is_err());
        let config = config_with_token(Some("hunter2"));
        assert!(verify_admin_token(&HeaderMap::new(), &config).is_err());
    }

    #[test]
    fn test_directory_api_disabled_without_token() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer anything"));
        assert!(matches!(
            verify_admin_token(&headers, &config_with_token(None)),
            Err(ServerError::Forbidden(_))
        ));
    }
}
