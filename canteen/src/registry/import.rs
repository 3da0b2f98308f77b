//! Replacing a school's registry from an uploaded file.

use bytes::Bytes;
use serde::Serialize;
use std::collections::HashSet;
use thiserror::Error;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{
    extract::{ExtractError, FormatKind},
    interpret::{ParsedCandidateRow, interpret_rows},
    normalize::{normalize_class, normalize_code, normalize_date, normalize_name},
};
use crate::db::{
    Store,
    errors::DbError,
    models::registry_rows::{RegistryIdentity, RegistryRowCreateDBRequest},
};
use crate::types::{ImportId, SchoolId, UserId, abbrev_uuid};

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("unsupported file type for {file_name}")]
    UnsupportedFormat { file_name: String },

    #[error("school {0} not found")]
    SchoolNotFound(SchoolId),

    #[error("failed to read registry file")]
    Extraction(#[from] ExtractError),

    #[error("no valid student rows found ({invalid_count} invalid)")]
    NoValidData { invalid_count: usize },

    #[error("no valid student rows after normalization ({invalid_count} invalid, {duplicate_count} duplicates)")]
    NoValidRowsAfterNormalization { invalid_count: usize, duplicate_count: usize },

    #[error("registry parsing task failed: {0}")]
    Task(String),

    #[error(transparent)]
    Database(#[from] DbError),
}

/// An uploaded registry file together with its target school.
#[derive(Debug, Clone)]
pub struct RegistryUpload {
    pub school_id: SchoolId,
    pub file_name: String,
    pub content_type: Option<String>,
    pub content: Bytes,
    pub imported_by: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ImportSummary {
    #[schema(value_type = String, format = "uuid")]
    pub import_id: ImportId,
    pub imported_count: u64,
    pub invalid_count: usize,
    pub duplicate_count: usize,
    pub file_name: String,
}

/// A registry candidate with its normalized identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRow {
    pub raw: ParsedCandidateRow,
    pub identity: RegistryIdentity,
}

/// Output of [`normalize_candidates`]: the rows to store plus what was dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedRegistry {
    pub rows: Vec<NormalizedRow>,
    pub invalid_count: usize,
    pub duplicate_count: usize,
}

/// Normalized identity of a candidate, or `None` when a field is empty after normalization
/// or the birth date does not parse.
pub fn normalize_candidate(candidate: &ParsedCandidateRow) -> Option<RegistryIdentity> {
    let identity = RegistryIdentity {
        first_name: normalize_name(&candidate.first_name),
        last_name: normalize_name(&candidate.last_name),
        student_code: normalize_code(&candidate.student_code),
        birth_date: normalize_date(&candidate.birth_date)?,
        class_name: normalize_class(&candidate.class_name),
    };

    let complete = [
        &identity.first_name,
        &identity.last_name,
        &identity.student_code,
        &identity.class_name,
    ]
    .iter()
    .all(|value| !value.is_empty());

    complete.then_some(identity)
}

/// Normalize candidates and drop duplicates by normalized identity, keeping the first.
///
/// `invalid_count` starts from `already_invalid`, the rows rejected before normalization.
pub fn normalize_candidates(candidates: Vec<ParsedCandidateRow>, already_invalid: usize) -> NormalizedRegistry {
    let mut registry = NormalizedRegistry {
        invalid_count: already_invalid,
        ..Default::default()
    };
    let mut seen = HashSet::new();
    let mut survivors = 0;

    for candidate in candidates {
        let Some(identity) = normalize_candidate(&candidate) else {
            registry.invalid_count += 1;
            continue;
        };
        survivors += 1;
        if seen.insert(identity.clone()) {
            registry.rows.push(NormalizedRow { raw: candidate, identity });
        }
    }

    registry.duplicate_count = survivors - registry.rows.len();
    registry
}

/// Extract, interpret and normalize an upload. CPU bound.
pub fn parse_upload(kind: FormatKind, content: &[u8]) -> Result<NormalizedRegistry, ImportError> {
    let extraction = kind.extract(content)?;
    let interpretation = interpret_rows(&extraction.rows);
    let invalid_count = extraction.invalid_lines.len() + interpretation.invalid_rows.len();

    tracing::debug!(
        format = ?kind,
        rows = extraction.rows.len(),
        students = interpretation.students.len(),
        invalid_count,
        "Interpreted registry upload"
    );

    if interpretation.students.is_empty() {
        return Err(ImportError::NoValidData { invalid_count });
    }

    let registry = normalize_candidates(interpretation.students, invalid_count);
    if registry.rows.is_empty() {
        return Err(ImportError::NoValidRowsAfterNormalization {
            invalid_count: registry.invalid_count,
            duplicate_count: registry.duplicate_count,
        });
    }

    Ok(registry)
}

/// Replace the school's registry with the content of `upload`.
///
/// Nothing is written unless the whole file parses into at least one valid row.
#[instrument(skip(store, upload), fields(school_id = %abbrev_uuid(&upload.school_id), file_name = %upload.file_name), err)]
pub async fn import_registry(store: &dyn Store, upload: RegistryUpload) -> Result<ImportSummary, ImportError> {
    let kind = FormatKind::classify(&upload.file_name, upload.content_type.as_deref()).ok_or_else(|| {
        ImportError::UnsupportedFormat {
            file_name: upload.file_name.clone(),
        }
    })?;

    if store.get_school(upload.school_id).await?.is_none() {
        return Err(ImportError::SchoolNotFound(upload.school_id));
    }

    let content = upload.content.clone();
    let registry = tokio::task::spawn_blocking(move || parse_upload(kind, &content))
        .await
        .map_err(|e| ImportError::Task(e.to_string()))??;

    let import_id = Uuid::new_v4();
    let NormalizedRegistry {
        rows,
        invalid_count,
        duplicate_count,
    } = registry;
    let requests: Vec<_> = rows
        .into_iter()
        .enumerate()
        .map(|(position, row)| RegistryRowCreateDBRequest {
            school_id: upload.school_id,
            import_id,
            position: position as i32,
            first_name: row.raw.first_name,
            last_name: row.raw.last_name,
            student_code: row.raw.student_code,
            birth_date: row.raw.birth_date,
            class_name: row.raw.class_name,
            identity: row.identity,
            source_file_name: upload.file_name.clone(),
            imported_by: upload.imported_by,
        })
        .collect();

    let imported_count = store.replace_registry(upload.school_id, requests).await?;

    if let Err(e) = store.update_student_count(upload.school_id, imported_count as i64).await {
        tracing::warn!(error = %e, "Failed to update cached student count");
    }

    tracing::info!(
        import_id = %abbrev_uuid(&import_id),
        imported_count,
        invalid_count,
        duplicate_count,
        "Registry imported"
    );

    Ok(ImportSummary {
        import_id,
        imported_count,
        invalid_count,
        duplicate_count,
        file_name: upload.file_name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{InMemoryStore, models::registry_rows::RegistryFilter, models::schools::SchoolCreateDBRequest};

    const SAMPLE_CSV: &str = "prenom,nom,code,date,classe\nAwa,Traore,AB-12,01/03/2015,CM2\n";

    fn candidate(first: &str, last: &str, code: &str, date: &str, class: &str) -> ParsedCandidateRow {
        ParsedCandidateRow {
            first_name: first.to_string(),
            last_name: last.to_string(),
            student_code: code.to_string(),
            birth_date: date.to_string(),
            class_name: class.to_string(),
        }
    }

    async fn store_with_school() -> (InMemoryStore, SchoolId) {
        let id = Uuid::new_v4();
        let store = InMemoryStore::with_schools([SchoolCreateDBRequest {
            id,
            name: "Ecole Plateau".to_string(),
            admin_id: None,
        }])
        .await;
        (store, id)
    }

    fn upload(school_id: SchoolId, file_name: &str, content: &str) -> RegistryUpload {
        RegistryUpload {
            school_id,
            file_name: file_name.to_string(),
            content_type: None,
            content: Bytes::from(content.to_string()),
            imported_by: Uuid::new_v4(),
        }
    }

    #[test]
    fn test_normalize_candidate() {
        let identity = normalize_candidate(&candidate("Awa", "Traoré", "ab-12", "01/03/2015", "cm2")).unwrap();
        assert_eq!(identity.first_name, "awa");
        assert_eq!(identity.last_name, "traore");
        assert_eq!(identity.student_code, "AB12");
        assert_eq!(identity.birth_date, "2015-03-01");
        assert_eq!(identity.class_name, "CM2");
    }

    #[test]
    fn test_normalize_candidate_rejects_bad_date_and_empty_code() {
        assert!(normalize_candidate(&candidate("Awa", "Traore", "AB12", "someday", "CM2")).is_none());
        assert!(normalize_candidate(&candidate("Awa", "Traore", " - ", "2015-03-01", "CM2")).is_none());
    }

    #[test]
    fn test_duplicates_after_normalization_collapse() {
        let candidates = vec![
            candidate("Awa", "Traore", "AB-12", "01/03/2015", "CM2"),
            candidate("AWA", "Traoré", "ab 12", "2015-03-01", "cm2"),
            candidate("Moussa", "Diallo", "M1", "2013-09-09", "CM1"),
            candidate("Bad", "Date", "X1", "never", "CM1"),
        ];
        let registry = normalize_candidates(candidates, 2);
        assert_eq!(registry.rows.len(), 2);
        assert_eq!(registry.duplicate_count, 1);
        assert_eq!(registry.invalid_count, 3);
        // First occurrence wins
        assert_eq!(registry.rows[0].raw.last_name, "Traore");
    }

    #[test]
    fn test_parse_upload_without_students() {
        let err = parse_upload(FormatKind::DelimitedText, b"prenom,nom,code,date,classe\nAwa,,,,\n").unwrap_err();
        assert!(matches!(err, ImportError::NoValidData { invalid_count: 1 }));
    }

    #[test]
    fn test_parse_upload_with_only_bad_dates() {
        let err = parse_upload(FormatKind::DelimitedText, b"Awa;Traore;AB12;someday;CM2\n").unwrap_err();
        assert!(matches!(
            err,
            ImportError::NoValidRowsAfterNormalization {
                invalid_count: 1,
                duplicate_count: 0
            }
        ));
    }

    #[tokio::test]
    async fn test_import_csv_stores_normalized_rows() {
        let (store, school_id) = store_with_school().await;
        let summary = import_registry(&store, upload(school_id, "eleves.csv", SAMPLE_CSV)).await.unwrap();

        assert_eq!(summary.imported_count, 1);
        assert_eq!(summary.invalid_count, 0);
        assert_eq!(summary.duplicate_count, 0);
        assert_eq!(summary.file_name, "eleves.csv");

        let rows = store
            .list_registry(&RegistryFilter::new(0, 10).for_school(school_id))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].norm_student_code, "AB12");
        assert_eq!(rows[0].norm_birth_date, "2015-03-01");
        assert_eq!(rows[0].norm_class_name, "CM2");
        assert_eq!(rows[0].student_code, "AB-12");
        assert_eq!(rows[0].import_id, summary.import_id);

        let school = store.get_school(school_id).await.unwrap().unwrap();
        assert_eq!(school.student_count, 1);
    }

    #[tokio::test]
    async fn test_importing_twice_replaces_registry() {
        let (store, school_id) = store_with_school().await;
        let csv = "Jean;Dupont;1234;2010-01-01;CM2\nAwa;Traore;AB-12;01/03/2015;CM2\nJean;Dupont;1234;01/01/2010;cm2\n";

        let first = import_registry(&store, upload(school_id, "a.csv", csv)).await.unwrap();
        let second = import_registry(&store, upload(school_id, "a.csv", csv)).await.unwrap();

        assert_eq!(first.imported_count, 2);
        assert_eq!(first.duplicate_count, 1);
        assert_eq!(second.imported_count, first.imported_count);
        assert_eq!(store.count_registry(school_id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_failed_import_keeps_previous_registry() {
        let (store, school_id) = store_with_school().await;
        import_registry(&store, upload(school_id, "a.csv", SAMPLE_CSV)).await.unwrap();

        let err = import_registry(&store, upload(school_id, "b.csv", "nothing useful here\n"))
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::NoValidData { .. }));
        assert_eq!(store.count_registry(school_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unsupported_format_is_rejected() {
        let (store, school_id) = store_with_school().await;
        let err = import_registry(&store, upload(school_id, "photo.png", SAMPLE_CSV)).await.unwrap_err();
        assert!(matches!(err, ImportError::UnsupportedFormat { .. }));
    }

    #[tokio::test]
    async fn test_unknown_school_is_rejected() {
        let (store, _) = store_with_school().await;
        let err = import_registry(&store, upload(Uuid::new_v4(), "a.csv", SAMPLE_CSV)).await.unwrap_err();
        assert!(matches!(err, ImportError::SchoolNotFound(_)));
    }
}
