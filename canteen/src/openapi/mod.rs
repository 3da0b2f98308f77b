//! OpenAPI documentation for the `/api/v1` surface, served at `/docs`.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
};

use crate::api;

/// Documents the identity headers forwarded by the auth gateway.
struct GatewayHeadersAddon;

impl Modify for GatewayHeadersAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.security_schemes.insert(
            "GatewayUser".to_string(),
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                "x-canteen-user-id",
                "Account UUID set by the auth gateway, together with `x-canteen-user-role` and optionally `x-canteen-school-id`. \
                 Header names are configurable under `auth.proxy_header`.",
            ))),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::registry::import_registry_file,
        api::handlers::registry::list_registry,
        api::handlers::children::enroll,
        api::handlers::children::list_my_children,
    ),
    components(schemas(
        crate::registry::ImportSummary,
        api::models::registry::RegistryRowResponse,
        api::models::children::EnrollChildRequest,
        api::models::children::ChildResponse,
        crate::db::models::children::ChildStatus,
        api::models::users::Role,
    )),
    modifiers(&GatewayHeadersAddon),
    security(("GatewayUser" = [])),
    tags(
        (name = "registry", description = "School student registry import and listing"),
        (name = "children", description = "Self-service child enrollment"),
    ),
    info(
        title = "Canteen API",
        description = "Student registry reconciliation for school canteens",
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_all_routes() {
        let doc = ApiDoc::openapi();
        let paths: Vec<_> = doc.paths.paths.keys().cloned().collect();
        assert!(paths.contains(&"/registry/import".to_string()));
        assert!(paths.contains(&"/registry".to_string()));
        assert!(paths.contains(&"/children".to_string()));
        assert!(doc.components.unwrap().security_schemes.contains_key("GatewayUser"));
    }
}
