//! Matching a parent's declared child against the school registry.
//!
//! Tiers, in order:
//! 1. exact equality of the normalized identity
//! 2. same student code and birth date, disambiguated first by class then by name
//!
//! A matched registry row can be claimed by one child only.

use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;
use utoipa::ToSchema;

use super::normalize::{normalize_class, normalize_code, normalize_date, normalize_loose_token, normalize_name};
use crate::db::{
    Store,
    errors::DbError,
    models::{
        children::{ChildCreateDBRequest, ChildDBResponse, ChildStatus, STUDENT_CODE_UNIQUE_CONSTRAINT},
        registry_rows::{RegistryIdentity, RegistryRowDBResponse},
    },
};
use crate::types::{SchoolId, UserId, abbrev_uuid};

#[derive(Debug, Error)]
pub enum EnrollmentError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid birth date: {0}")]
    InvalidBirthDate(String),

    #[error("no registry imported for this school")]
    NoRegistry,

    #[error("child identity does not match school records")]
    NoMatch,

    #[error("student already linked to a parent")]
    AlreadyLinked,

    #[error("registry row has an unreadable birth date: {0}")]
    CorruptRegistryRow(String),

    #[error(transparent)]
    Database(#[from] DbError),
}

/// Child identity as typed by a parent.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct DeclaredChild {
    pub first_name: String,
    pub last_name: String,
    pub birth_date: String,
    pub class_name: String,
    pub student_code: String,
}

impl DeclaredChild {
    /// Normalized identity of the declaration.
    pub fn identity(&self) -> Result<RegistryIdentity, EnrollmentError> {
        let fields = [
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("birth_date", &self.birth_date),
            ("class_name", &self.class_name),
            ("student_code", &self.student_code),
        ];
        if let Some((name, _)) = fields.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(EnrollmentError::MissingField(*name));
        }

        let birth_date =
            normalize_date(&self.birth_date).ok_or_else(|| EnrollmentError::InvalidBirthDate(self.birth_date.clone()))?;
        let student_code = normalize_code(&self.student_code);
        if student_code.is_empty() {
            return Err(EnrollmentError::MissingField("student_code"));
        }

        Ok(RegistryIdentity {
            first_name: normalize_name(&self.first_name),
            last_name: normalize_name(&self.last_name),
            student_code,
            birth_date,
            class_name: normalize_class(&self.class_name),
        })
    }
}

/// Which tier produced a match, for logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    Exact,
    CodeAndBirthDate,
    ClassLoose,
    NameLoose,
}

/// Pick one registry row among candidates sharing student code and birth date.
///
/// Class is tried first. The name filter then runs over the class-filtered set when that
/// set is non-empty, else over every candidate.
pub fn disambiguate<'a>(
    candidates: &'a [RegistryRowDBResponse],
    declared: &DeclaredChild,
) -> Option<(&'a RegistryRowDBResponse, MatchTier)> {
    match candidates {
        [] => return None,
        [only] => return Some((only, MatchTier::CodeAndBirthDate)),
        _ => {}
    }

    let class_token = normalize_loose_token(&declared.class_name);
    let by_class: Vec<_> = candidates
        .iter()
        .filter(|row| normalize_loose_token(&row.class_name) == class_token)
        .collect();
    if let [only] = by_class.as_slice() {
        return Some((*only, MatchTier::ClassLoose));
    }

    let first_token = normalize_loose_token(&declared.first_name);
    let last_token = normalize_loose_token(&declared.last_name);
    let pool: Vec<_> = if by_class.is_empty() {
        candidates.iter().collect()
    } else {
        by_class
    };
    let by_name: Vec<_> = pool
        .into_iter()
        .filter(|row| {
            normalize_loose_token(&row.first_name) == first_token && normalize_loose_token(&row.last_name) == last_token
        })
        .collect();

    match by_name.as_slice() {
        [only] => Some((*only, MatchTier::NameLoose)),
        _ => None,
    }
}

/// Find the registry row a declaration refers to.
#[instrument(skip(store, declared), fields(school_id = %abbrev_uuid(&school_id)), err)]
pub async fn find_registry_match(
    store: &dyn Store,
    school_id: SchoolId,
    declared: &DeclaredChild,
    candidate_limit: i64,
) -> Result<RegistryRowDBResponse, EnrollmentError> {
    let identity = declared.identity()?;

    if store.count_registry(school_id).await? == 0 {
        return Err(EnrollmentError::NoRegistry);
    }

    if let Some(row) = store.find_registry_exact(school_id, &identity).await? {
        tracing::debug!(tier = ?MatchTier::Exact, "Registry match found");
        return Ok(row);
    }

    let candidates = store
        .find_registry_by_code_and_birth_date(school_id, &identity.student_code, &identity.birth_date, candidate_limit)
        .await?;

    match disambiguate(&candidates, declared) {
        Some((row, tier)) => {
            tracing::debug!(tier = ?tier, candidates = candidates.len(), "Registry match found");
            Ok(row.clone())
        }
        None => {
            tracing::debug!(candidates = candidates.len(), "No registry match");
            Err(EnrollmentError::NoMatch)
        }
    }
}

/// Match a declaration and bind the registry student to the parent.
///
/// The child copies the registry row's values and is approved immediately.
#[instrument(skip(store, declared), fields(school_id = %abbrev_uuid(&school_id), parent_id = %abbrev_uuid(&parent_id)), err)]
pub async fn enroll_child(
    store: &dyn Store,
    school_id: SchoolId,
    parent_id: UserId,
    declared: &DeclaredChild,
    candidate_limit: i64,
) -> Result<ChildDBResponse, EnrollmentError> {
    let row = find_registry_match(store, school_id, declared, candidate_limit).await?;

    if store.find_child_by_student_code(school_id, &row.norm_student_code).await?.is_some() {
        return Err(EnrollmentError::AlreadyLinked);
    }

    let birth_date = NaiveDate::parse_from_str(&row.norm_birth_date, "%Y-%m-%d")
        .map_err(|_| EnrollmentError::CorruptRegistryRow(row.norm_birth_date.clone()))?;

    let request = ChildCreateDBRequest {
        school_id,
        parent_id,
        first_name: row.first_name,
        last_name: row.last_name,
        birth_date,
        class_name: row.class_name,
        student_code: row.norm_student_code,
        status: ChildStatus::Approved,
    };

    match store.create_child(&request).await {
        Ok(child) => {
            tracing::info!(child_id = %abbrev_uuid(&child.id), "Child enrolled");
            Ok(child)
        }
        Err(e) if e.is_unique_violation_of(STUDENT_CODE_UNIQUE_CONSTRAINT) => Err(EnrollmentError::AlreadyLinked),
        Err(e) => Err(e.into()),
    }
}
