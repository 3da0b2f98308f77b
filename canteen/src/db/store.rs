//! Storage seam used by the registry importer and the enrollment matcher.
//!
//! [`PgStore`] runs the repositories in [`crate::db::handlers`] against a Postgres pool.
//! [`crate::db::memory::InMemoryStore`] keeps everything in process and backs development
//! mode and tests.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use crate::db::{
    errors::Result,
    handlers::{Children, RegistryRows, Schools},
    models::{
        children::{ChildCreateDBRequest, ChildDBResponse},
        registry_rows::{RegistryFilter, RegistryIdentity, RegistryRowCreateDBRequest, RegistryRowDBResponse},
        schools::SchoolDBResponse,
    },
};
use crate::types::{SchoolId, UserId, abbrev_uuid};

#[async_trait]
pub trait Store: Send + Sync {
    async fn get_school(&self, id: SchoolId) -> Result<Option<SchoolDBResponse>>;

    async fn get_school_by_admin(&self, admin_id: UserId) -> Result<Option<SchoolDBResponse>>;

    async fn update_student_count(&self, id: SchoolId, count: i64) -> Result<()>;

    /// Atomically replace every registry row of `school_id` with `rows`.
    ///
    /// Concurrent readers observe either the previous registry or the new one, never a mix.
    /// Returns the number of rows stored.
    async fn replace_registry(&self, school_id: SchoolId, rows: Vec<RegistryRowCreateDBRequest>) -> Result<u64>;

    async fn list_registry(&self, filter: &RegistryFilter) -> Result<Vec<RegistryRowDBResponse>>;

    async fn count_registry(&self, school_id: SchoolId) -> Result<i64>;

    async fn find_registry_exact(
        &self,
        school_id: SchoolId,
        identity: &RegistryIdentity,
    ) -> Result<Option<RegistryRowDBResponse>>;

    async fn find_registry_by_code_and_birth_date(
        &self,
        school_id: SchoolId,
        student_code: &str,
        birth_date: &str,
        limit: i64,
    ) -> Result<Vec<RegistryRowDBResponse>>;

    async fn find_child_by_student_code(&self, school_id: SchoolId, student_code: &str) -> Result<Option<ChildDBResponse>>;

    /// Insert a child, failing with a unique violation of
    /// [`STUDENT_CODE_UNIQUE_CONSTRAINT`](crate::db::models::children::STUDENT_CODE_UNIQUE_CONSTRAINT)
    /// if the student code is already claimed in the school.
    async fn create_child(&self, request: &ChildCreateDBRequest) -> Result<ChildDBResponse>;

    async fn list_children_for_parent(&self, parent_id: UserId) -> Result<Vec<ChildDBResponse>>;
}

/// [`Store`] backed by a Postgres pool
#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn get_school(&self, id: SchoolId) -> Result<Option<SchoolDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Schools::new(&mut conn).get_by_id(id).await
    }

    async fn get_school_by_admin(&self, admin_id: UserId) -> Result<Option<SchoolDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Schools::new(&mut conn).get_by_admin(admin_id).await
    }

    async fn update_student_count(&self, id: SchoolId, count: i64) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        Schools::new(&mut conn).update_student_count(id, count).await?;
        Ok(())
    }

    #[instrument(skip(self, rows), fields(school_id = %abbrev_uuid(&school_id), count = rows.len()), err)]
    async fn replace_registry(&self, school_id: SchoolId, rows: Vec<RegistryRowCreateDBRequest>) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let inserted = {
            let mut repo = RegistryRows::new(&mut tx);
            let deleted = repo.delete_for_school(school_id).await?;
            tracing::debug!(deleted, "Cleared previous registry");
            repo.insert_batch(&rows).await?
        };
        tx.commit().await?;

        Ok(inserted)
    }

    async fn list_registry(&self, filter: &RegistryFilter) -> Result<Vec<RegistryRowDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        RegistryRows::new(&mut conn).list(filter).await
    }

    async fn count_registry(&self, school_id: SchoolId) -> Result<i64> {
        let mut conn = self.pool.acquire().await?;
        RegistryRows::new(&mut conn).count_for_school(school_id).await
    }

    async fn find_registry_exact(
        &self,
        school_id: SchoolId,
        identity: &RegistryIdentity,
    ) -> Result<Option<RegistryRowDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        RegistryRows::new(&mut conn).find_by_identity(school_id, identity).await
    }

    async fn find_registry_by_code_and_birth_date(
        &self,
        school_id: SchoolId,
        student_code: &str,
        birth_date: &str,
        limit: i64,
    ) -> Result<Vec<RegistryRowDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        RegistryRows::new(&mut conn)
            .find_by_code_and_birth_date(school_id, student_code, birth_date, limit)
            .await
    }

    async fn find_child_by_student_code(&self, school_id: SchoolId, student_code: &str) -> Result<Option<ChildDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Children::new(&mut conn).find_by_student_code(school_id, student_code).await
    }

    async fn create_child(&self, request: &ChildCreateDBRequest) -> Result<ChildDBResponse> {
        let mut conn = self.pool.acquire().await?;
        Children::new(&mut conn).create(request).await
    }

    async fn list_children_for_parent(&self, parent_id: UserId) -> Result<Vec<ChildDBResponse>> {
        let mut conn = self.pool.acquire().await?;
        Children::new(&mut conn).list_for_parent(parent_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::errors::DbError;
    use crate::registry::{DeclaredChild, EnrollmentError, RegistryUpload, enroll_child, import_registry};
    use crate::test_utils::{create_test_pg_school, sample_registry_csv, test_registry_row};
    use bytes::Bytes;
    use uuid::Uuid;

    #[sqlx::test]
    #[test_log::test]
    async fn test_replace_registry_swaps_rows(pool: PgPool) {
        let store = PgStore::new(pool.clone());
        let school_id = create_test_pg_school(&pool, None).await;

        store
            .replace_registry(school_id, vec![test_registry_row(school_id, 0, "A1"), test_registry_row(school_id, 1, "A2")])
            .await
            .unwrap();
        assert_eq!(store.count_registry(school_id).await.unwrap(), 2);

        assert_eq!(store.replace_registry(school_id, vec![test_registry_row(school_id, 0, "B1")]).await.unwrap(), 1);
        let rows = store.list_registry(&RegistryFilter::new(0, 10).for_school(school_id)).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].norm_student_code, "B1");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_failed_replace_keeps_previous_registry(pool: PgPool) {
        let store = PgStore::new(pool.clone());
        let school_id = create_test_pg_school(&pool, None).await;
        store.replace_registry(school_id, vec![test_registry_row(school_id, 0, "A1")]).await.unwrap();

        // The duplicate sits in the second INSERT statement, after the delete and the first chunk
        let mut rows: Vec<_> = (0..1200).map(|i| test_registry_row(school_id, i, &format!("B{i}"))).collect();
        rows.push(test_registry_row(school_id, 1200, "B1100"));
        let err = store.replace_registry(school_id, rows).await.unwrap_err();
        assert!(err.is_unique_violation_of("registry_rows_identity_unique"));

        let rows = store.list_registry(&RegistryFilter::new(0, 10).for_school(school_id)).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].norm_student_code, "A1");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_replace_registry_for_unknown_school(pool: PgPool) {
        let store = PgStore::new(pool);
        let school_id = Uuid::new_v4();
        let err = store
            .replace_registry(school_id, vec![test_registry_row(school_id, 0, "A1")])
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_import_then_enroll(pool: PgPool) {
        let store = PgStore::new(pool.clone());
        let school_id = create_test_pg_school(&pool, None).await;

        let summary = import_registry(
            &store,
            RegistryUpload {
                school_id,
                file_name: "eleves.csv".to_string(),
                content_type: Some("text/csv".to_string()),
                content: Bytes::from_static(sample_registry_csv().as_bytes()),
                imported_by: Uuid::new_v4(),
            },
        )
        .await
        .unwrap();
        assert_eq!(summary.imported_count, 3);
        assert_eq!(store.get_school(school_id).await.unwrap().unwrap().student_count, 3);

        let declared = DeclaredChild {
            first_name: "awa".to_string(),
            last_name: "TRAORE".to_string(),
            birth_date: "2015-03-01".to_string(),
            class_name: "cm2".to_string(),
            student_code: "ab 12".to_string(),
        };
        let parent_id = Uuid::new_v4();
        let child = enroll_child(&store, school_id, parent_id, &declared, 20).await.unwrap();
        assert_eq!(child.student_code, "AB12");
        assert_eq!(child.last_name, "Traoré");

        let listed = store.list_children_for_parent(parent_id).await.unwrap();
        assert_eq!(listed.len(), 1);

        let err = enroll_child(&store, school_id, Uuid::new_v4(), &declared, 20).await.unwrap_err();
        assert!(matches!(err, EnrollmentError::AlreadyLinked));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_concurrent_enrollment_links_once(pool: PgPool) {
        let store = PgStore::new(pool.clone());
        let school_id = create_test_pg_school(&pool, None).await;
        store.replace_registry(school_id, vec![test_registry_row(school_id, 0, "AB12")]).await.unwrap();

        let declared = DeclaredChild {
            first_name: "Awa".to_string(),
            last_name: "Traore".to_string(),
            birth_date: "01/03/2015".to_string(),
            class_name: "CM2".to_string(),
            student_code: "AB12".to_string(),
        };
        let (first, second) = tokio::join!(
            enroll_child(&store, school_id, Uuid::new_v4(), &declared, 20),
            enroll_child(&store, school_id, Uuid::new_v4(), &declared, 20),
        );

        let results = [first, second];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(
            results
                .iter()
                .any(|r| matches!(r, Err(EnrollmentError::AlreadyLinked)))
        );
    }
}
