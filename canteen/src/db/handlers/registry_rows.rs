//! Database repository for registry rows.

use crate::db::{
    errors::Result,
    models::registry_rows::{RegistryFilter, RegistryIdentity, RegistryRowCreateDBRequest, RegistryRowDBResponse},
};
use crate::types::{SchoolId, abbrev_uuid};
use sqlx::{PgConnection, Postgres, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

/// Rows per INSERT statement. Each row binds 16 parameters and Postgres caps a statement at 65535.
const INSERT_CHUNK_SIZE: usize = 1000;

const REGISTRY_COLUMNS: &str = "id, school_id, import_id, position, first_name, last_name, student_code, birth_date, class_name, \
     norm_first_name, norm_last_name, norm_student_code, norm_birth_date, norm_class_name, \
     source_file_name, imported_by, imported_at";

pub struct RegistryRows<'c> {
    db: &'c mut PgConnection,
}

impl<'c> RegistryRows<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self), fields(school_id = %abbrev_uuid(&school_id)), err)]
    pub async fn delete_for_school(&mut self, school_id: SchoolId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM registry_rows WHERE school_id = $1")
            .bind(school_id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected())
    }

    /// Insert a batch of rows. Callers run this inside a transaction together with
    /// [`Self::delete_for_school`] so readers never observe a half-written registry.
    #[instrument(skip(self, rows), fields(count = rows.len()), err)]
    pub async fn insert_batch(&mut self, rows: &[RegistryRowCreateDBRequest]) -> Result<u64> {
        let mut inserted = 0;
        for chunk in rows.chunks(INSERT_CHUNK_SIZE) {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO registry_rows (id, school_id, import_id, position, first_name, last_name, student_code, \
                 birth_date, class_name, norm_first_name, norm_last_name, norm_student_code, norm_birth_date, \
                 norm_class_name, source_file_name, imported_by) ",
            );
            builder.push_values(chunk, |mut b, row| {
                b.push_bind(Uuid::new_v4())
                    .push_bind(row.school_id)
                    .push_bind(row.import_id)
                    .push_bind(row.position)
                    .push_bind(&row.first_name)
                    .push_bind(&row.last_name)
                    .push_bind(&row.student_code)
                    .push_bind(&row.birth_date)
                    .push_bind(&row.class_name)
                    .push_bind(&row.identity.first_name)
                    .push_bind(&row.identity.last_name)
                    .push_bind(&row.identity.student_code)
                    .push_bind(&row.identity.birth_date)
                    .push_bind(&row.identity.class_name)
                    .push_bind(&row.source_file_name)
                    .push_bind(row.imported_by);
            });
            let result = builder.build().execute(&mut *self.db).await?;
            inserted += result.rows_affected();
        }

        Ok(inserted)
    }

    #[instrument(skip(self), err)]
    pub async fn list(&mut self, filter: &RegistryFilter) -> Result<Vec<RegistryRowDBResponse>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!("SELECT {REGISTRY_COLUMNS} FROM registry_rows"));
        if let Some(school_id) = filter.school_id {
            builder.push(" WHERE school_id = ").push_bind(school_id);
        }
        builder
            .push(" ORDER BY school_id, position LIMIT ")
            .push_bind(filter.limit)
            .push(" OFFSET ")
            .push_bind(filter.skip);

        let rows = builder.build_query_as::<RegistryRowDBResponse>().fetch_all(&mut *self.db).await?;

        Ok(rows)
    }

    #[instrument(skip(self), fields(school_id = %abbrev_uuid(&school_id)), err)]
    pub async fn count_for_school(&mut self, school_id: SchoolId) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM registry_rows WHERE school_id = $1")
            .bind(school_id)
            .fetch_one(&mut *self.db)
            .await?;

        Ok(count)
    }

    /// The row whose normalized identity equals `identity` exactly
    #[instrument(skip(self, identity), fields(school_id = %abbrev_uuid(&school_id)), err)]
    pub async fn find_by_identity(
        &mut self,
        school_id: SchoolId,
        identity: &RegistryIdentity,
    ) -> Result<Option<RegistryRowDBResponse>> {
        let query = format!(
            "SELECT {REGISTRY_COLUMNS} FROM registry_rows
             WHERE school_id = $1
               AND norm_first_name = $2
               AND norm_last_name = $3
               AND norm_student_code = $4
               AND norm_birth_date = $5
               AND norm_class_name = $6
             LIMIT 1"
        );
        let row = sqlx::query_as::<_, RegistryRowDBResponse>(&query)
            .bind(school_id)
            .bind(&identity.first_name)
            .bind(&identity.last_name)
            .bind(&identity.student_code)
            .bind(&identity.birth_date)
            .bind(&identity.class_name)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(row)
    }

    /// Up to `limit` rows sharing the normalized student code and birth date
    #[instrument(skip(self, student_code, birth_date), fields(school_id = %abbrev_uuid(&school_id)), err)]
    pub async fn find_by_code_and_birth_date(
        &mut self,
        school_id: SchoolId,
        student_code: &str,
        birth_date: &str,
        limit: i64,
    ) -> Result<Vec<RegistryRowDBResponse>> {
        let query = format!(
            "SELECT {REGISTRY_COLUMNS} FROM registry_rows
             WHERE school_id = $1 AND norm_student_code = $2 AND norm_birth_date = $3
             ORDER BY position
             LIMIT $4"
        );
        let rows = sqlx::query_as::<_, RegistryRowDBResponse>(&query)
            .bind(school_id)
            .bind(student_code)
            .bind(birth_date)
            .bind(limit)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(rows)
    }
}
