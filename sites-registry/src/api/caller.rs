//! Caller identity extraction
//!
//! Authentication happens in the upstream gateway, which forwards the
//! resolved identity as headers. A request without them is rejected with
//! 401 before any handler runs.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use sites_common::{Caller, Role};

use crate::error::ApiError;

pub const USER_HEADER: &str = "x-sites-user";
pub const ROLE_HEADER: &str = "x-sites-role";
pub const STATION_HEADER: &str = "x-sites-station";

/// Authenticated caller, extracted from gateway headers
#[derive(Debug, Clone)]
pub struct AuthCaller(pub Caller);

fn header<'a>(parts: &'a Parts, name: &str) -> Result<Option<&'a str>, ApiError> {
    match parts.headers.get(name) {
        None => Ok(None),
        Some(value) => value
            .to_str()
            .map(|v| Some(v.trim()).filter(|v| !v.is_empty()))
            .map_err(|_| ApiError::Unauthorized(format!("header {} is not valid text", name))),
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthCaller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let username = header(parts, USER_HEADER)?
            .ok_or_else(|| ApiError::Unauthorized(format!("missing {} header", USER_HEADER)))?;
        let role: Role = header(parts, ROLE_HEADER)?
            .ok_or_else(|| ApiError::Unauthorized(format!("missing {} header", ROLE_HEADER)))?
            .parse()
            .map_err(ApiError::Unauthorized)?;
        let station = header(parts, STATION_HEADER)?.map(str::to_ascii_uppercase);

        Ok(AuthCaller(Caller::new(username, role, station)))
    }
}
