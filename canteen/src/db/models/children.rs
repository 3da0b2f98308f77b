//! Database models for enrolled children.

use crate::types::{ChildId, SchoolId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Unique constraint binding a student code to a single child within a school
pub const STUDENT_CODE_UNIQUE_CONSTRAINT: &str = "children_school_student_code_unique";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "child_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ChildStatus {
    Pending,
    Approved,
    Rejected,
}

/// Database request for creating an enrolled child
#[derive(Debug, Clone)]
pub struct ChildCreateDBRequest {
    pub school_id: SchoolId,
    pub parent_id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: NaiveDate,
    pub class_name: String,
    pub student_code: String,
    pub status: ChildStatus,
}

/// Database response for an enrolled child
#[derive(Debug, Clone, FromRow)]
pub struct ChildDBResponse {
    pub id: ChildId,
    pub school_id: SchoolId,
    pub parent_id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: NaiveDate,
    pub class_name: String,
    pub student_code: String,
    pub status: ChildStatus,
    pub created_at: DateTime<Utc>,
}
