use std::sync::Arc;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::db::User;
use crate::routes::{ApiError, AppState};

/// The user resolved from an `Authorization: Apikey <key>` header.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();

        let api_key = parse_api_key(header)
            .ok_or_else(|| ApiError::bad_request("the Authorization key is malformed"))?;

        let user = state
            .db
            .get_user_by_api_key(api_key)
            .await?
            .ok_or_else(|| ApiError::unauthorized("we were unable to find this user"))?;

        Ok(AuthUser(user))
    }
}

/// Extracts the key from `Apikey <key>`; anything else is malformed.
pub fn parse_api_key(header: &str) -> Option<&str> {
    let mut parts = header.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Apikey"), Some(key), None) if !key.is_empty() => Some(key),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_header() {
        assert_eq!(parse_api_key("Apikey abc123"), Some("abc123"));
    }

    #[test]
    fn test_wrong_scheme() {
        assert_eq!(parse_api_key("Bearer abc123"), None);
    }

    #[test]
    fn test_missing_key() {
        assert_eq!(parse_api_key("Apikey"), None);
        assert_eq!(parse_api_key("Apikey "), None);
    }

    #[test]
    fn test_extra_parts() {
        assert_eq!(parse_api_key("Apikey abc 123"), None);
    }

    #[test]
    fn test_empty_header() {
        assert_eq!(parse_api_key(""), None);
    }

    #[test]
    fn test_scheme_is_case_sensitive() {
        assert_eq!(parse_api_key("apikey abc123"), None);
    }
}
