//! Database repository for enrolled children.

use crate::db::{
    errors::Result,
    models::children::{ChildCreateDBRequest, ChildDBResponse},
};
use crate::types::{SchoolId, UserId, abbrev_uuid};
use sqlx::PgConnection;
use tracing::instrument;

const CHILD_COLUMNS: &str = "id, school_id, parent_id, first_name, last_name, birth_date, class_name, student_code, status, created_at";

pub struct Children<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Children<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Insert a child. A second child with the same student code in the same school fails
    /// with a unique violation on `children_school_student_code_unique`.
    #[instrument(skip(self, request), fields(school_id = %abbrev_uuid(&request.school_id)), err)]
    pub async fn create(&mut self, request: &ChildCreateDBRequest) -> Result<ChildDBResponse> {
        let query = format!(
            "INSERT INTO children (school_id, parent_id, first_name, last_name, birth_date, class_name, student_code, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {CHILD_COLUMNS}"
        );
        let child = sqlx::query_as::<_, ChildDBResponse>(&query)
            .bind(request.school_id)
            .bind(request.parent_id)
            .bind(&request.first_name)
            .bind(&request.last_name)
            .bind(request.birth_date)
            .bind(&request.class_name)
            .bind(&request.student_code)
            .bind(request.status)
            .fetch_one(&mut *self.db)
            .await?;

        Ok(child)
    }

    #[instrument(skip(self), fields(school_id = %abbrev_uuid(&school_id)), err)]
    pub async fn find_by_student_code(&mut self, school_id: SchoolId, student_code: &str) -> Result<Option<ChildDBResponse>> {
        let query = format!("SELECT {CHILD_COLUMNS} FROM children WHERE school_id = $1 AND student_code = $2");
        let child = sqlx::query_as::<_, ChildDBResponse>(&query)
            .bind(school_id)
            .bind(student_code)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(child)
    }

    #[instrument(skip(self), fields(parent_id = %abbrev_uuid(&parent_id)), err)]
    pub async fn list_for_parent(&mut self, parent_id: UserId) -> Result<Vec<ChildDBResponse>> {
        let query = format!("SELECT {CHILD_COLUMNS} FROM children WHERE parent_id = $1 ORDER BY created_at");
        let children = sqlx::query_as::<_, ChildDBResponse>(&query)
            .bind(parent_id)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::children::{ChildStatus, STUDENT_CODE_UNIQUE_CONSTRAINT};
    use crate::test_utils::create_test_pg_school;
    use chrono::NaiveDate;
    use sqlx::PgPool;
    use uuid::Uuid;

    fn child(school_id: SchoolId, parent_id: UserId, code: &str) -> ChildCreateDBRequest {
        ChildCreateDBRequest {
            school_id,
            parent_id,
            first_name: "Awa".to_string(),
            last_name: "Traoré".to_string(),
            birth_date: NaiveDate::from_ymd_opt(2015, 3, 1).unwrap(),
            class_name: "CM2".to_string(),
            student_code: code.to_string(),
            status: ChildStatus::Approved,
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_and_find_by_student_code(pool: PgPool) {
        let school_id = create_test_pg_school(&pool, None).await;
        let parent_id = Uuid::new_v4();

        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Children::new(&mut conn);
        let created = repo.create(&child(school_id, parent_id, "AB12")).await.unwrap();
        assert_eq!(created.status, ChildStatus::Approved);
        assert_eq!(created.birth_date, NaiveDate::from_ymd_opt(2015, 3, 1).unwrap());

        let found = repo.find_by_student_code(school_id, "AB12").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.parent_id, parent_id);
        assert!(repo.find_by_student_code(school_id, "ZZ99").await.unwrap().is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_student_code_is_unique_per_school(pool: PgPool) {
        let school_id = create_test_pg_school(&pool, None).await;
        let other_school = create_test_pg_school(&pool, None).await;

        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Children::new(&mut conn);
        repo.create(&child(school_id, Uuid::new_v4(), "AB12")).await.unwrap();

        let err = repo.create(&child(school_id, Uuid::new_v4(), "AB12")).await.unwrap_err();
        assert!(err.is_unique_violation_of(STUDENT_CODE_UNIQUE_CONSTRAINT));

        repo.create(&child(other_school, Uuid::new_v4(), "AB12")).await.unwrap();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_for_parent(pool: PgPool) {
        let school_id = create_test_pg_school(&pool, None).await;
        let parent_id = Uuid::new_v4();

        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Children::new(&mut conn);
        repo.create(&child(school_id, parent_id, "AB12")).await.unwrap();
        repo.create(&child(school_id, parent_id, "CD34")).await.unwrap();
        repo.create(&child(school_id, Uuid::new_v4(), "EF56")).await.unwrap();

        let children = repo.list_for_parent(parent_id).await.unwrap();
        let mut codes: Vec<_> = children.iter().map(|c| c.student_code.as_str()).collect();
        codes.sort();
        assert_eq!(codes, vec!["AB12", "CD34"]);
    }
}
