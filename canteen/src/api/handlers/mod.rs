//! HTTP request handlers for all API endpoints.
//!
//! Each handler is responsible for:
//! - Request validation and deserialization
//! - Authorization through the [`crate::auth::permissions::RequiresPermission`] extractor
//! - Calling into [`crate::registry`] and the [`crate::db::Store`]
//! - Response serialization
//!
//! # Handler Modules
//!
//! - [`registry`]: Registry upload and listing for school staff
//! - [`children`]: Self-service child enrollment for parents
//!
//! Handlers return [`crate::errors::Error`] which converts to the matching HTTP status code.

pub mod children;
pub mod registry;

use crate::{
    AppState,
    api::models::users::CurrentUser,
    auth::permissions::forbidden,
    errors::{Error, Result},
    types::{Operation, Resource, SchoolId},
};

/// The school the caller belongs to: the one forwarded by the gateway, else the school
/// they administer.
pub(crate) async fn own_school(state: &AppState, user: &CurrentUser) -> Result<Option<SchoolId>> {
    if let Some(id) = user.school_id {
        return Ok(Some(id));
    }
    Ok(state.store.get_school_by_admin(user.id).await?.map(|school| school.id))
}

/// Resolve the school a school-scoped request targets.
///
/// Callers allowed the unrestricted operation may target any school; everyone else may only
/// target their own.
pub(crate) async fn target_school(
    state: &AppState,
    user: &CurrentUser,
    requested: Option<SchoolId>,
    resource: Resource,
    unrestricted: bool,
    own_operation: Operation,
) -> Result<SchoolId> {
    let own = own_school(state, user).await?;

    if unrestricted {
        return requested.or(own).ok_or_else(|| Error::BadRequest {
            message: "school_id is required".to_string(),
        });
    }

    match (requested, own) {
        (Some(requested), Some(own)) if requested != own => Err(forbidden(resource, own_operation)),
        (_, Some(own)) => Ok(own),
        (Some(_), None) => Err(forbidden(resource, own_operation)),
        (None, None) => Err(Error::BadRequest {
            message: "school_id is required".to_string(),
        }),
    }
}
