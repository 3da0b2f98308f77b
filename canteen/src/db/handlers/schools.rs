//! Database repository for schools.

use crate::db::{errors::Result, models::schools::SchoolDBResponse};
use crate::types::{SchoolId, UserId, abbrev_uuid};
use sqlx::PgConnection;
use tracing::instrument;

pub struct Schools<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Schools<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self), fields(school_id = %abbrev_uuid(&id)), err)]
    pub async fn get_by_id(&mut self, id: SchoolId) -> Result<Option<SchoolDBResponse>> {
        let school = sqlx::query_as::<_, SchoolDBResponse>(
            "SELECT id, name, admin_id, student_count, created_at FROM schools WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(school)
    }

    /// The school administered by the given account, if any
    #[instrument(skip(self), fields(admin_id = %abbrev_uuid(&admin_id)), err)]
    pub async fn get_by_admin(&mut self, admin_id: UserId) -> Result<Option<SchoolDBResponse>> {
        let school = sqlx::query_as::<_, SchoolDBResponse>(
            "SELECT id, name, admin_id, student_count, created_at FROM schools WHERE admin_id = $1 ORDER BY created_at LIMIT 1",
        )
        .bind(admin_id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(school)
    }

    #[instrument(skip(self), fields(school_id = %abbrev_uuid(&id)), err)]
    pub async fn update_student_count(&mut self, id: SchoolId, count: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE schools SET student_count = $2 WHERE id = $1")
            .bind(id)
            .bind(count)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_pg_school;
    use sqlx::PgPool;
    use uuid::Uuid;

    #[sqlx::test]
    #[test_log::test]
    async fn test_get_by_id_and_admin(pool: PgPool) {
        let admin_id = Uuid::new_v4();
        let school_id = create_test_pg_school(&pool, Some(admin_id)).await;

        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Schools::new(&mut conn);

        let school = repo.get_by_id(school_id).await.unwrap().unwrap();
        assert_eq!(school.admin_id, Some(admin_id));
        assert_eq!(school.student_count, 0);

        let by_admin = repo.get_by_admin(admin_id).await.unwrap().unwrap();
        assert_eq!(by_admin.id, school_id);

        assert!(repo.get_by_id(Uuid::new_v4()).await.unwrap().is_none());
        assert!(repo.get_by_admin(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_student_count(pool: PgPool) {
        let school_id = create_test_pg_school(&pool, None).await;

        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Schools::new(&mut conn);
        assert!(repo.update_student_count(school_id, 42).await.unwrap());
        assert_eq!(repo.get_by_id(school_id).await.unwrap().unwrap().student_count, 42);

        assert!(!repo.update_student_count(Uuid::new_v4(), 1).await.unwrap());
    }
}
