use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::Bearer;

use crate::error::ApiError;
use crate::settings::Settings;

/// Accepts the token from a bearer header or, failing that, the `token` query parameter.
pub fn verify_token(
    settings: &Settings,
    auth: Option<Authorization<Bearer>>,
    query_token: Option<&str>,
) -> Result<(), ApiError> {
    let provided_token = auth
        .map(|a| a.token().to_string())
        .or_else(|| query_token.map(|s| s.to_string()));
    match provided_token {
        Some(token) if token == settings.auth_token => Ok(()),
        _ => Err(ApiError::Unauthorized(
            "Invalid authentication token".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::BackendKind;

    fn settings() -> Settings {
        Settings {
            database_url: "sqlite::memory:".to_string(),
            database_max_connections: 1,
            storage_backend: BackendKind::Sql,
            mongo_url: None,
            mongo_database: "fitness_center".to_string(),
            debug: false,
            auth_token: "secret".to_string(),
            enable_swagger: true,
            port: 8080,
        }
    }

    #[test]
    fn test_verify_token_header() {
        let auth = Authorization::bearer("secret").unwrap();
        assert!(verify_token(&settings(), Some(auth), None).is_ok());

        let wrong = Authorization::bearer("guess").unwrap();
        assert!(verify_token(&settings(), Some(wrong), Some("secret")).is_err());
    }

    #[test]
    fn test_verify_token_query() {
        assert!(verify_token(&settings(), None, Some("secret")).is_ok());
        assert!(verify_token(&settings(), None, Some("bad")).is_err());
        assert!(verify_token(&settings(), None, None).is_err());
    }
}
