//! Principal extraction from gateway-forwarded headers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use mcr_engine::{Principal, Role};
use mcr_storage::ReportType;

use super::error::ApiError;

pub(crate) const ROLE_HEADER: &str = "x-mcr-role";
pub(crate) const STATES_HEADER: &str = "x-mcr-states";
pub(crate) const REPORT_TYPES_HEADER: &str = "x-mcr-report-types";
pub(crate) const FULL_NAME_HEADER: &str = "x-mcr-full-name";

/// The authenticated caller of a report route.
pub(crate) struct Caller(pub(crate) Principal);

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        principal_from_headers(&parts.headers).map(Caller)
    }
}

pub(crate) fn principal_from_headers(headers: &HeaderMap) -> Result<Principal, ApiError> {
    let claims = header(headers, ROLE_HEADER)
        .ok_or(ApiError::Unauthenticated("missing role claim"))?;
    let role = Role::from_claims(claims)
        .ok_or(ApiError::Unauthenticated("no recognised role claim"))?;

    let full_name = header(headers, FULL_NAME_HEADER).unwrap_or_default();
    let states = list(header(headers, STATES_HEADER));
    let report_types = list(header(headers, REPORT_TYPES_HEADER))
        .filter_map(|t| match t.parse::<ReportType>() {
            Ok(report_type) => Some(report_type),
            Err(e) => {
                tracing::debug!(error = %e, "ignoring report type claim");
                None
            }
        });

    Ok(Principal::new(role, full_name)
        .with_states(states)
        .with_report_types(report_types))
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Comma-separated claim values, blanks dropped.
fn list(value: Option<&str>) -> impl Iterator<Item = &str> {
    value
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn state_user_claims_are_parsed() {
        let principal = principal_from_headers(&headers(&[
            (ROLE_HEADER, "other-app-admin, mdctmcr-state-user"),
            (STATES_HEADER, "AB, CD"),
            (REPORT_TYPES_HEADER, "MCPAR,BOGUS"),
            (FULL_NAME_HEADER, "Thelonious States"),
        ]))
        .unwrap();
        assert_eq!(principal.role, Role::StateUser);
        assert_eq!(principal.states, vec!["AB", "CD"]);
        assert_eq!(principal.report_types, vec![ReportType::Mcpar]);
        assert_eq!(principal.full_name, "Thelonious States");
    }

    #[test]
    fn missing_or_unknown_role_is_rejected() {
        assert!(matches!(
            principal_from_headers(&headers(&[(STATES_HEADER, "AB")])),
            Err(ApiError::Unauthenticated(_))
        ));
        assert!(matches!(
            principal_from_headers(&headers(&[(ROLE_HEADER, "someone-else")])),
            Err(ApiError::Unauthenticated(_))
        ));
    }
}
