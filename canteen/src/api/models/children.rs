//! API models for child enrollment.

use crate::db::models::children::{ChildDBResponse, ChildStatus};
use crate::registry::DeclaredChild;
use crate::types::{ChildId, SchoolId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A parent's declaration of a child to enroll.
///
/// Every field is required; missing ones are reported as a validation error by the handler.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct EnrollChildRequest {
    #[schema(value_type = Option<String>, format = "uuid")]
    pub school_id: Option<SchoolId>,
    pub first_name: String,
    pub last_name: String,
    /// `YYYY-MM-DD`, `DD/MM/YYYY` and other common formats
    pub birth_date: String,
    pub class_name: String,
    pub student_code: String,
}

impl EnrollChildRequest {
    pub fn declared(&self) -> DeclaredChild {
        DeclaredChild {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            birth_date: self.birth_date.clone(),
            class_name: self.class_name.clone(),
            student_code: self.student_code.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChildResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: ChildId,
    #[schema(value_type = String, format = "uuid")]
    pub school_id: SchoolId,
    #[schema(value_type = String, format = "uuid")]
    pub parent_id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: NaiveDate,
    pub class_name: String,
    pub student_code: String,
    pub status: ChildStatus,
    pub created_at: DateTime<Utc>,
}

impl From<ChildDBResponse> for ChildResponse {
    fn from(child: ChildDBResponse) -> Self {
        Self {
            id: child.id,
            school_id: child.school_id,
            parent_id: child.parent_id,
            first_name: child.first_name,
            last_name: child.last_name,
            birth_date: child.birth_date,
            class_name: child.class_name,
            student_code: child.student_code,
            status: child.status,
            created_at: child.created_at,
        }
    }
}
