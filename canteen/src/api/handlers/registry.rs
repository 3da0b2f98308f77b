use crate::api::handlers::target_school;
use crate::api::models::registry::{ListRegistryQuery, RegistryRowResponse};
use crate::auth::permissions::{RequiresPermission, can_create_all_resources, can_read_all_resources, operation, resource};
use crate::db::models::registry_rows::RegistryFilter;
use crate::errors::{Error, Result};
use crate::registry::{ImportSummary, RegistryUpload, import_registry};
use crate::types::{Operation, Resource, SchoolId, abbrev_uuid};
use crate::AppState;
use axum::{
    Json,
    extract::{Multipart, Query, State, multipart::MultipartError},
    http::StatusCode,
};
use bytes::BytesMut;

fn multipart_error(e: MultipartError, what: &str) -> Error {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        Error::PayloadTooLarge { message: e.body_text() }
    } else {
        Error::BadRequest {
            message: format!("Failed to {what}: {e}"),
        }
    }
}

#[utoipa::path(
    post,
    path = "/registry/import",
    tag = "registry",
    summary = "Import school registry",
    description = "Replace a school's student registry with the content of an uploaded PDF, CSV/TSV or Excel file.

Multipart fields: `file` (required) and `school_id` (required for platform administrators, otherwise defaults to the caller's school).

The previous registry stays in place unless the file yields at least one valid student.",
    request_body(content_type = "multipart/form-data", description = "Registry file and optional target school"),
    responses(
        (status = 200, description = "Registry replaced", body = ImportSummary),
        (status = 400, description = "Missing school, unsupported file type or no usable rows"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not allowed to import for this school"),
        (status = 404, description = "School not found"),
        (status = 413, description = "File too large"),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip_all, fields(user_id = %abbrev_uuid(&current_user.id)))]
pub async fn import_registry_file(
    State(state): State<AppState>,
    current_user: RequiresPermission<resource::Registry, operation::CreateOwn>,
    mut multipart: Multipart,
) -> Result<Json<ImportSummary>> {
    let max_upload_size = state.config.registry.max_upload_size;

    let mut requested_school: Option<SchoolId> = None;
    let mut file: Option<(String, Option<String>, BytesMut)> = None;

    while let Some(mut field) = multipart.next_field().await.map_err(|e| multipart_error(e, "parse multipart data"))? {
        let field_name = field.name().unwrap_or("").to_string();
        match field_name.as_str() {
            "school_id" => {
                let text = field.text().await.map_err(|e| multipart_error(e, "read school_id"))?;
                let text = text.trim();
                if !text.is_empty() {
                    requested_school = Some(SchoolId::parse_str(text).map_err(|_| Error::BadRequest {
                        message: format!("Invalid school_id: {text}"),
                    })?);
                }
            }
            "file" => {
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .filter(|name| !name.trim().is_empty())
                    .unwrap_or_else(|| "upload".to_string());
                let content_type = field.content_type().map(str::to_string);
                let mut content = BytesMut::new();

                while let Some(chunk) = field.chunk().await.map_err(|e| multipart_error(e, "read file chunk"))? {
                    if (content.len() + chunk.len()) as u64 > max_upload_size {
                        tracing::warn!(file_name = %file_name, max_upload_size, "Registry upload exceeds size limit");
                        return Err(Error::PayloadTooLarge {
                            message: format!(
                                "File size exceeds maximum allowed size of {} bytes ({} MB)",
                                max_upload_size,
                                max_upload_size / (1024 * 1024)
                            ),
                        });
                    }
                    content.extend_from_slice(&chunk);
                }

                tracing::debug!(file_name = %file_name, size = content.len(), "Received registry upload");
                file = Some((file_name, content_type, content));
            }
            other => {
                tracing::debug!(field = other, "Ignoring unknown multipart field");
            }
        }
    }

    let Some((file_name, content_type, content)) = file else {
        return Err(Error::BadRequest {
            message: "Missing `file` field".to_string(),
        });
    };

    let school_id = target_school(
        &state,
        &current_user,
        requested_school,
        Resource::Registry,
        can_create_all_resources(&current_user, Resource::Registry),
        Operation::CreateOwn,
    )
    .await?;

    let upload = RegistryUpload {
        school_id,
        file_name,
        content_type,
        content: content.freeze(),
        imported_by: current_user.id,
    };
    let summary = import_registry(state.store.as_ref(), upload).await?;

    Ok(Json(summary))
}

#[utoipa::path(
    get,
    path = "/registry",
    tag = "registry",
    summary = "List registry rows",
    description = "List the imported registry rows of a school in import order. Platform administrators may omit `school_id` to list every school.",
    params(ListRegistryQuery),
    responses(
        (status = 200, description = "Registry rows", body = [RegistryRowResponse]),
        (status = 400, description = "Missing school"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not allowed to read this school's registry"),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip_all, fields(user_id = %abbrev_uuid(&current_user.id)))]
pub async fn list_registry(
    State(state): State<AppState>,
    Query(query): Query<ListRegistryQuery>,
    current_user: RequiresPermission<resource::Registry, operation::ReadOwn>,
) -> Result<Json<Vec<RegistryRowResponse>>> {
    let (skip, limit) = query.pagination.params();
    let mut filter = RegistryFilter::new(skip, limit);

    if can_read_all_resources(&current_user, Resource::Registry) {
        if let Some(school_id) = query.school_id {
            filter = filter.for_school(school_id);
        }
    } else {
        let school_id = target_school(
            &state,
            &current_user,
            query.school_id,
            Resource::Registry,
            false,
            Operation::ReadOwn,
        )
        .await?;
        filter = filter.for_school(school_id);
    }

    let rows = state.store.list_registry(&filter).await?;
    Ok(Json(rows.into_iter().map(RegistryRowResponse::from).collect()))
}
