//! Database models for registry rows.

use crate::types::{ImportId, RegistryRowId, SchoolId, UserId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// The normalized five-field identity of a student.
///
/// Two registry rows of one school never share an identity, and the exact matching tier
/// compares a parent's declaration against it field by field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegistryIdentity {
    pub first_name: String,
    pub last_name: String,
    pub student_code: String,
    pub birth_date: String,
    pub class_name: String,
}

/// Database request for inserting one registry row as part of an import batch
#[derive(Debug, Clone)]
pub struct RegistryRowCreateDBRequest {
    pub school_id: SchoolId,
    pub import_id: ImportId,
    pub position: i32,
    pub first_name: String,
    pub last_name: String,
    pub student_code: String,
    pub birth_date: String,
    pub class_name: String,
    pub identity: RegistryIdentity,
    pub source_file_name: String,
    pub imported_by: UserId,
}

/// Database response for a registry row
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct RegistryRowDBResponse {
    pub id: RegistryRowId,
    pub school_id: SchoolId,
    pub import_id: ImportId,
    pub position: i32,
    pub first_name: String,
    pub last_name: String,
    pub student_code: String,
    pub birth_date: String,
    pub class_name: String,
    pub norm_first_name: String,
    pub norm_last_name: String,
    pub norm_student_code: String,
    pub norm_birth_date: String,
    pub norm_class_name: String,
    pub source_file_name: String,
    pub imported_by: UserId,
    pub imported_at: DateTime<Utc>,
}

impl RegistryRowDBResponse {
    pub fn identity(&self) -> RegistryIdentity {
        RegistryIdentity {
            first_name: self.norm_first_name.clone(),
            last_name: self.norm_last_name.clone(),
            student_code: self.norm_student_code.clone(),
            birth_date: self.norm_birth_date.clone(),
            class_name: self.norm_class_name.clone(),
        }
    }
}

/// Filter for listing registry rows
#[derive(Debug, Clone)]
pub struct RegistryFilter {
    pub school_id: Option<SchoolId>,
    pub skip: i64,
    pub limit: i64,
}

impl RegistryFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            school_id: None,
            skip,
            limit,
        }
    }

    pub fn for_school(mut self, school_id: SchoolId) -> Self {
        self.school_id = Some(school_id);
        self
    }
}
