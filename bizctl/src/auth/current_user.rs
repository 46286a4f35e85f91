use crate::{
    AppState,
    api::models::users::CurrentUser,
    auth::session,
    config::Config,
    errors::{Error, Result},
    types::Operation,
};
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use tracing::{debug, instrument, trace};

/// Extract user from the JWT session cookie if present and valid
/// Returns:
/// - None: No usable session cookie present
/// - Some(Ok(user)): Valid JWT found and verified
/// - Some(Err(error)): Cookie header present but unreadable
#[instrument(skip_all)]
fn try_session_cookie_auth(parts: &Parts, config: &Config) -> Option<Result<CurrentUser>> {
    let cookie_header = parts.headers.get(header::COOKIE)?;

    let cookie_str = match cookie_header.to_str() {
        Ok(s) => s,
        Err(e) => {
            return Some(Err(Error::BadRequest {
                message: format!("Invalid cookie header: {e}"),
            }));
        }
    };
    let cookie_name = &config.auth.session.cookie_name;

    for cookie in cookie_str.split(';') {
        if let Some((name, value)) = cookie.trim().split_once('=')
            && name == cookie_name
            && !value.is_empty()
        {
            // Expired tokens are expected here, keep looking rather than fail
            match session::verify_session_token(value, config) {
                Ok(user) => return Some(Ok(user)),
                Err(e) => trace!("Ignoring unusable session cookie: {e}"),
            }
        }
    }
    None
}

/// Extract user from an `Authorization: Bearer <jwt>` header
/// Returns:
/// - None: No Authorization header or not a Bearer token
/// - Some(Ok(user)): Valid JWT found and verified
/// - Some(Err(error)): Bearer token present but invalid
#[instrument(skip_all)]
fn try_bearer_auth(parts: &Parts, config: &Config) -> Option<Result<CurrentUser>> {
    let auth_header = parts.headers.get(header::AUTHORIZATION)?;

    let auth_str = match auth_header.to_str() {
        Ok(s) => s,
        Err(e) => {
            return Some(Err(Error::BadRequest {
                message: format!("Invalid authorization header: {e}"),
            }));
        }
    };

    let token = auth_str.strip_prefix("Bearer ")?;
    Some(session::verify_session_token(token.trim(), config))
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    #[instrument(skip_all)]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        // The bearer token is more specific, so it is tried first. A valid cookie still
        // authenticates a request carrying a broken bearer token.
        let mut auth_errors = Vec::new();

        match try_bearer_auth(parts, &state.config) {
            Some(Ok(user)) => {
                debug!("Found bearer authenticated user: {}", user.id);
                return Ok(user);
            }
            Some(Err(e)) => auth_errors.push(("bearer", e)),
            None => trace!("No bearer token present"),
        }

        match try_session_cookie_auth(parts, &state.config) {
            Some(Ok(user)) => {
                debug!("Found session cookie authenticated user: {}", user.id);
                return Ok(user);
            }
            Some(Err(e)) => auth_errors.push(("session cookie", e)),
            None => trace!("No session cookie present"),
        }

        trace!("All authentication attempts failed ({}): {:?}", auth_errors.len(), auth_errors);
        Err(Error::Unauthenticated { message: None })
    }
}

/// Reject anyone but a superuser.
pub fn require_superuser(user: &CurrentUser, action: Operation, resource: &str) -> Result<()> {
    if user.is_superuser {
        Ok(())
    } else {
        Err(Error::InsufficientPermissions {
            action,
            resource: resource.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_state, create_test_token};
    use axum::http::{Request, StatusCode};
    use uuid::Uuid;

    fn parts_with(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("http://localhost/test");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    fn user(is_superuser: bool) -> CurrentUser {
        CurrentUser {
            id: Uuid::new_v4(),
            email: "someone@example.com".to_string(),
            is_superuser,
        }
    }

    #[tokio::test]
    async fn test_bearer_token() {
        let state = create_test_state();
        let user = user(false);
        let token = create_test_token(&user, &state.config);

        let mut parts = parts_with(&[("authorization", &format!("Bearer {token}"))]);
        let extracted = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(extracted.id, user.id);
    }

    #[tokio::test]
    async fn test_session_cookie_among_others() {
        let state = create_test_state();
        let user = user(true);
        let token = create_test_token(&user, &state.config);
        let cookie = format!("theme=dark; {}={token}; other=1", state.config.auth.session.cookie_name);

        let mut parts = parts_with(&[("cookie", &cookie)]);
        let extracted = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(extracted.id, user.id);
        assert!(extracted.is_superuser);
    }

    #[tokio::test]
    async fn test_valid_cookie_wins_over_broken_bearer() {
        let state = create_test_state();
        let user = user(false);
        let token = create_test_token(&user, &state.config);
        let cookie = format!("{}={token}", state.config.auth.session.cookie_name);

        let mut parts = parts_with(&[("authorization", "Bearer garbage"), ("cookie", &cookie)]);
        let extracted = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(extracted.id, user.id);
    }

    #[tokio::test]
    async fn test_missing_credentials_returns_unauthorized() {
        let state = create_test_state();
        let mut parts = parts_with(&[]);

        let error = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap_err();
        assert_eq!(error.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_non_bearer_authorization_is_ignored() {
        let state = create_test_state();
        let mut parts = parts_with(&[("authorization", "Basic dXNlcjpwYXNz")]);

        let error = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap_err();
        assert_eq!(error.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_require_superuser() {
        assert!(require_superuser(&user(true), Operation::Read, "users").is_ok());

        let error = require_superuser(&user(false), Operation::Delete, "users").unwrap_err();
        assert_eq!(error.status_code(), StatusCode::FORBIDDEN);
    }
}
