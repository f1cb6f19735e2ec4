//! Caller identity extraction.
//!
//! Authentication happens upstream. The identity layer forwards the user id
//! and role as request headers; this module only parses them and checks
//! roles per endpoint.

use crate::error::ApiError;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use marketplace_core::{Caller, Role};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Authenticated caller taken from the identity headers.
#[derive(Debug, Clone)]
pub struct CallerIdentity(pub Caller);

impl CallerIdentity {
    /// Fail unless the caller holds one of `roles`.
    pub fn require(&self, roles: &[Role]) -> Result<&Caller, ApiError> {
        if roles.contains(&self.0.role) {
            Ok(&self.0)
        } else {
            Err(ApiError::Forbidden(self.0.role.to_string()))
        }
    }

    pub fn student(&self) -> Result<&Caller, ApiError> {
        self.require(&[Role::Student])
    }

    pub fn reviewer(&self) -> Result<&Caller, ApiError> {
        self.require(&[Role::Ngo, Role::Admin])
    }

    pub fn admin(&self) -> Result<&Caller, ApiError> {
        self.require(&[Role::Admin])
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Result<&'a str, ApiError> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::Unauthenticated(name.to_string()))
}

#[async_trait]
impl<S> FromRequestParts<S> for CallerIdentity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = header(parts, USER_ID_HEADER)?;
        let role = header(parts, USER_ROLE_HEADER)?
            .parse::<Role>()
            .map_err(ApiError::Unauthenticated)?;
        Ok(CallerIdentity(Caller::new(id, role)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use tokio_test::{assert_err, assert_ok};

    async fn extract(builder: axum::http::request::Builder) -> Result<CallerIdentity, ApiError> {
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        CallerIdentity::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_extracts_caller() {
        let identity = extract(
            Request::builder()
                .header(USER_ID_HEADER, "student-1")
                .header(USER_ROLE_HEADER, "Student"),
        )
        .await
        .unwrap();

        assert_eq!(identity.0, Caller::new("student-1", Role::Student));
        assert_ok!(identity.student());
        assert_err!(identity.reviewer());
    }

    #[tokio::test]
    async fn test_missing_headers() {
        let result = extract(Request::builder().header(USER_ROLE_HEADER, "ngo")).await;
        assert!(matches!(result, Err(ApiError::Unauthenticated(_))));

        let result = extract(Request::builder().header(USER_ID_HEADER, "ngo-1")).await;
        assert!(matches!(result, Err(ApiError::Unauthenticated(_))));
    }

    #[tokio::test]
    async fn test_unknown_role() {
        let result = extract(
            Request::builder()
                .header(USER_ID_HEADER, "x")
                .header(USER_ROLE_HEADER, "superuser"),
        )
        .await;
        assert!(matches!(result, Err(ApiError::Unauthenticated(_))));
    }

    #[test]
    fn test_admin_passes_reviewer_check() {
        let identity = CallerIdentity(Caller::new("root", Role::Admin));
        assert_ok!(identity.reviewer());
        assert_ok!(identity.admin());
        assert_err!(identity.student());
    }
}
