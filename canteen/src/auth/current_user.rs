use crate::{
    AppState,
    api::models::users::{CurrentUser, Role},
    config::ProxyHeaderAuthConfig,
    errors::{Error, Result},
    types::abbrev_uuid,
};
use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, request::Parts},
};
use tracing::{instrument, trace};
use uuid::Uuid;

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn unauthenticated(message: impl Into<String>) -> Error {
    Error::Unauthenticated {
        message: Some(message.into()),
    }
}

/// Build the principal from the headers set by the upstream auth gateway.
#[instrument(skip_all)]
pub fn user_from_headers(headers: &HeaderMap, config: &ProxyHeaderAuthConfig) -> Result<CurrentUser> {
    let Some(raw_id) = header_value(headers, &config.user_id_header) else {
        trace!("No user id header present");
        return Err(Error::Unauthenticated { message: None });
    };
    let id = Uuid::parse_str(raw_id).map_err(|_| unauthenticated("Invalid user id header"))?;

    let role: Role = header_value(headers, &config.role_header)
        .ok_or_else(|| unauthenticated("Missing role header"))?
        .parse()
        .map_err(unauthenticated)?;

    let school_id = header_value(headers, &config.school_id_header)
        .map(Uuid::parse_str)
        .transpose()
        .map_err(|_| unauthenticated("Invalid school id header"))?;

    trace!(user_id = %abbrev_uuid(&id), %role, "Authenticated from proxy headers");
    Ok(CurrentUser { id, role, school_id })
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        user_from_headers(&parts.headers, &state.config.auth.proxy_header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, StatusCode};

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_full_principal() {
        let user_id = Uuid::new_v4();
        let school_id = Uuid::new_v4();
        let map = headers(&[
            ("x-canteen-user-id", &user_id.to_string()),
            ("x-canteen-user-role", "school_admin"),
            ("x-canteen-school-id", &school_id.to_string()),
        ]);

        let user = user_from_headers(&map, &ProxyHeaderAuthConfig::default()).unwrap();
        assert_eq!(user.id, user_id);
        assert_eq!(user.role, Role::SchoolAdmin);
        assert_eq!(user.school_id, Some(school_id));
    }

    #[test]
    fn test_school_header_is_optional() {
        let map = headers(&[
            ("x-canteen-user-id", &Uuid::new_v4().to_string()),
            ("x-canteen-user-role", "parent"),
        ]);
        let user = user_from_headers(&map, &ProxyHeaderAuthConfig::default()).unwrap();
        assert_eq!(user.school_id, None);
    }

    #[test]
    fn test_missing_or_bad_headers_are_unauthorized() {
        let config = ProxyHeaderAuthConfig::default();
        let cases = [
            headers(&[]),
            headers(&[("x-canteen-user-id", "not-a-uuid"), ("x-canteen-user-role", "parent")]),
            headers(&[("x-canteen-user-id", &Uuid::new_v4().to_string())]),
            headers(&[("x-canteen-user-id", &Uuid::new_v4().to_string()), ("x-canteen-user-role", "chef")]),
        ];
        for map in cases {
            let err = user_from_headers(&map, &config).unwrap_err();
            assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn test_custom_header_names() {
        let config = ProxyHeaderAuthConfig {
            user_id_header: "x-forwarded-user".to_string(),
            role_header: "x-forwarded-role".to_string(),
            school_id_header: "x-forwarded-school".to_string(),
        };
        let map = headers(&[
            ("x-forwarded-user", &Uuid::new_v4().to_string()),
            ("x-forwarded-role", "super_admin"),
        ]);
        assert_eq!(user_from_headers(&map, &config).unwrap().role, Role::SuperAdmin);
    }
}
