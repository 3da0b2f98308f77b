//! Database models for schools.

use crate::types::{SchoolId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Database response for a school
#[derive(Debug, Clone, FromRow)]
pub struct SchoolDBResponse {
    pub id: SchoolId,
    pub name: String,
    pub admin_id: Option<UserId>,
    pub student_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Database request for creating a school.
///
/// Schools are normally created by the school management screens; this is used to seed the
/// in-memory store and tests.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchoolCreateDBRequest {
    pub id: SchoolId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_id: Option<UserId>,
}
