//! API models for the student registry.

use super::pagination::Pagination;
use crate::db::models::registry_rows::RegistryRowDBResponse;
use crate::types::{ImportId, RegistryRowId, SchoolId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// One student of a school's registry
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegistryRowResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: RegistryRowId,
    #[schema(value_type = String, format = "uuid")]
    pub school_id: SchoolId,
    #[schema(value_type = String, format = "uuid")]
    pub import_id: ImportId,
    pub first_name: String,
    pub last_name: String,
    pub student_code: String,
    pub birth_date: String,
    pub class_name: String,
    pub norm_first_name: String,
    pub norm_last_name: String,
    pub norm_student_code: String,
    /// Canonical `YYYY-MM-DD`
    pub norm_birth_date: String,
    pub norm_class_name: String,
    pub source_file_name: String,
    #[schema(value_type = String, format = "uuid")]
    pub imported_by: UserId,
    pub imported_at: DateTime<Utc>,
}

impl From<RegistryRowDBResponse> for RegistryRowResponse {
    fn from(row: RegistryRowDBResponse) -> Self {
        Self {
            id: row.id,
            school_id: row.school_id,
            import_id: row.import_id,
            first_name: row.first_name,
            last_name: row.last_name,
            student_code: row.student_code,
            birth_date: row.birth_date,
            class_name: row.class_name,
            norm_first_name: row.norm_first_name,
            norm_last_name: row.norm_last_name,
            norm_student_code: row.norm_student_code,
            norm_birth_date: row.norm_birth_date,
            norm_class_name: row.norm_class_name,
            source_file_name: row.source_file_name,
            imported_by: row.imported_by,
            imported_at: row.imported_at,
        }
    }
}

/// Query parameters for listing registry rows
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ListRegistryQuery {
    /// Restrict to one school. Required for school staff unless their account carries a school.
    #[param(value_type = Option<String>, format = "uuid")]
    #[schema(value_type = Option<String>, format = "uuid")]
    pub school_id: Option<SchoolId>,

    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,
}
