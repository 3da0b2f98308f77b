use crate::api::models::children::{ChildResponse, EnrollChildRequest};
use crate::auth::permissions::{RequiresPermission, operation, resource};
use crate::errors::{Error, Result};
use crate::registry::enroll_child;
use crate::types::abbrev_uuid;
use crate::AppState;
use axum::{Json, extract::State, http::StatusCode};

#[utoipa::path(
    post,
    path = "/children",
    tag = "children",
    summary = "Enroll a child",
    description = "Match the declared child against the school's registry and link the registry student to the calling parent.

Matching tries the exact normalized identity first, then student code and birth date, using class and then name to choose between several candidates. A registry student can only be linked once.",
    request_body = EnrollChildRequest,
    responses(
        (status = 201, description = "Child enrolled", body = ChildResponse),
        (status = 400, description = "Missing field or unreadable birth date"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Only parents can enroll children"),
        (status = 404, description = "Unknown school, no registry imported, or no matching student"),
        (status = 409, description = "Student already linked to a parent"),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip_all, fields(user_id = %abbrev_uuid(&current_user.id)))]
pub async fn enroll(
    State(state): State<AppState>,
    current_user: RequiresPermission<resource::Children, operation::CreateOwn>,
    Json(request): Json<EnrollChildRequest>,
) -> Result<(StatusCode, Json<ChildResponse>)> {
    let Some(school_id) = request.school_id else {
        return Err(Error::BadRequest {
            message: "missing required field: school_id".to_string(),
        });
    };

    if state.store.get_school(school_id).await?.is_none() {
        return Err(Error::NotFound {
            resource: "School".to_string(),
            id: school_id.to_string(),
        });
    }

    let child = enroll_child(
        state.store.as_ref(),
        school_id,
        current_user.id,
        &request.declared(),
        state.config.registry.candidate_limit,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(child.into())))
}

#[utoipa::path(
    get,
    path = "/children",
    tag = "children",
    summary = "List my children",
    description = "Children enrolled by the calling parent.",
    responses(
        (status = 200, description = "Enrolled children", body = [ChildResponse]),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Only parents have children"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_my_children(
    State(state): State<AppState>,
    current_user: RequiresPermission<resource::Children, operation::ReadOwn>,
) -> Result<Json<Vec<ChildResponse>>> {
    let children = state.store.list_children_for_parent(current_user.id).await?;
    Ok(Json(children.into_iter().map(ChildResponse::from).collect()))
}
