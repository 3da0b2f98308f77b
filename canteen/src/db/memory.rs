//! In-process [`Store`] for development mode and tests.
//!
//! All state sits behind one [`RwLock`]. A registry replace is a single swap under the write
//! lock and child creation checks the student code and inserts under the same lock, which
//! gives the same guarantees as the Postgres transaction and unique constraint.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::{
    errors::{DbError, Result},
    models::{
        children::{ChildCreateDBRequest, ChildDBResponse, STUDENT_CODE_UNIQUE_CONSTRAINT},
        registry_rows::{RegistryFilter, RegistryIdentity, RegistryRowCreateDBRequest, RegistryRowDBResponse},
        schools::{SchoolCreateDBRequest, SchoolDBResponse},
    },
    store::Store,
};
use crate::types::{SchoolId, UserId};

#[derive(Debug, Default)]
struct State {
    schools: HashMap<SchoolId, SchoolDBResponse>,
    /// Registry rows per school, in import order
    registry: HashMap<SchoolId, Vec<RegistryRowDBResponse>>,
    children: Vec<ChildDBResponse>,
}

impl State {
    fn require_school(&self, school_id: SchoolId, table: &str) -> Result<()> {
        if self.schools.contains_key(&school_id) {
            Ok(())
        } else {
            Err(DbError::ForeignKeyViolation {
                constraint: Some(format!("{table}_school_id_fkey")),
                table: Some(table.to_string()),
                message: format!("school {school_id} does not exist"),
            })
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with the given schools
    pub async fn with_schools(schools: impl IntoIterator<Item = SchoolCreateDBRequest>) -> Self {
        let store = Self::new();
        for school in schools {
            store.insert_school(school).await;
        }
        store
    }

    pub async fn insert_school(&self, request: SchoolCreateDBRequest) -> SchoolDBResponse {
        let school = SchoolDBResponse {
            id: request.id,
            name: request.name,
            admin_id: request.admin_id,
            student_count: 0,
            created_at: Utc::now(),
        };
        self.state.write().await.schools.insert(school.id, school.clone());
        school
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn get_school(&self, id: SchoolId) -> Result<Option<SchoolDBResponse>> {
        Ok(self.state.read().await.schools.get(&id).cloned())
    }

    async fn get_school_by_admin(&self, admin_id: UserId) -> Result<Option<SchoolDBResponse>> {
        let state = self.state.read().await;
        Ok(state
            .schools
            .values()
            .filter(|s| s.admin_id == Some(admin_id))
            .min_by_key(|s| s.created_at)
            .cloned())
    }

    async fn update_student_count(&self, id: SchoolId, count: i64) -> Result<()> {
        if let Some(school) = self.state.write().await.schools.get_mut(&id) {
            school.student_count = count;
        }
        Ok(())
    }

    async fn replace_registry(&self, school_id: SchoolId, rows: Vec<RegistryRowCreateDBRequest>) -> Result<u64> {
        let now = Utc::now();
        let mut seen = HashSet::new();
        let mut stored = Vec::with_capacity(rows.len());
        for row in rows {
            if !seen.insert(row.identity.clone()) {
                return Err(DbError::UniqueViolation {
                    constraint: Some("registry_rows_identity_unique".to_string()),
                    table: Some("registry_rows".to_string()),
                    message: "duplicate registry identity".to_string(),
                });
            }
            stored.push(RegistryRowDBResponse {
                id: Uuid::new_v4(),
                school_id: row.school_id,
                import_id: row.import_id,
                position: row.position,
                first_name: row.first_name,
                last_name: row.last_name,
                student_code: row.student_code,
                birth_date: row.birth_date,
                class_name: row.class_name,
                norm_first_name: row.identity.first_name,
                norm_last_name: row.identity.last_name,
                norm_student_code: row.identity.student_code,
                norm_birth_date: row.identity.birth_date,
                norm_class_name: row.identity.class_name,
                source_file_name: row.source_file_name,
                imported_by: row.imported_by,
                imported_at: now,
            });
        }

        let mut state = self.state.write().await;
        state.require_school(school_id, "registry_rows")?;
        let count = stored.len() as u64;
        state.registry.insert(school_id, stored);
        Ok(count)
    }

    async fn list_registry(&self, filter: &RegistryFilter) -> Result<Vec<RegistryRowDBResponse>> {
        let state = self.state.read().await;
        let mut school_ids: Vec<_> = match filter.school_id {
            Some(id) => vec![id],
            None => state.registry.keys().copied().collect(),
        };
        school_ids.sort();

        let skip = filter.skip.max(0) as usize;
        let limit = filter.limit.max(0) as usize;
        Ok(school_ids
            .iter()
            .filter_map(|id| state.registry.get(id))
            .flatten()
            .skip(skip)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count_registry(&self, school_id: SchoolId) -> Result<i64> {
        let state = self.state.read().await;
        Ok(state.registry.get(&school_id).map_or(0, |rows| rows.len() as i64))
    }

    async fn find_registry_exact(
        &self,
        school_id: SchoolId,
        identity: &RegistryIdentity,
    ) -> Result<Option<RegistryRowDBResponse>> {
        let state = self.state.read().await;
        Ok(state
            .registry
            .get(&school_id)
            .and_then(|rows| rows.iter().find(|row| &row.identity() == identity))
            .cloned())
    }

    async fn find_registry_by_code_and_birth_date(
        &self,
        school_id: SchoolId,
        student_code: &str,
        birth_date: &str,
        limit: i64,
    ) -> Result<Vec<RegistryRowDBResponse>> {
        let state = self.state.read().await;
        Ok(state
            .registry
            .get(&school_id)
            .into_iter()
            .flatten()
            .filter(|row| row.norm_student_code == student_code && row.norm_birth_date == birth_date)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn find_child_by_student_code(&self, school_id: SchoolId, student_code: &str) -> Result<Option<ChildDBResponse>> {
        let state = self.state.read().await;
        Ok(state
            .children
            .iter()
            .find(|c| c.school_id == school_id && c.student_code == student_code)
            .cloned())
    }

    async fn create_child(&self, request: &ChildCreateDBRequest) -> Result<ChildDBResponse> {
        let mut state = self.state.write().await;
        state.require_school(request.school_id, "children")?;
        if state
            .children
            .iter()
            .any(|c| c.school_id == request.school_id && c.student_code == request.student_code)
        {
            return Err(DbError::UniqueViolation {
                constraint: Some(STUDENT_CODE_UNIQUE_CONSTRAINT.to_string()),
                table: Some("children".to_string()),
                message: format!("student code {} already linked", request.student_code),
            });
        }

        let child = ChildDBResponse {
            id: Uuid::new_v4(),
            school_id: request.school_id,
            parent_id: request.parent_id,
            first_name: request.first_name.clone(),
            last_name: request.last_name.clone(),
            birth_date: request.birth_date,
            class_name: request.class_name.clone(),
            student_code: request.student_code.clone(),
            status: request.status,
            created_at: Utc::now(),
        };
        state.children.push(child.clone());
        Ok(child)
    }

    async fn list_children_for_parent(&self, parent_id: UserId) -> Result<Vec<ChildDBResponse>> {
        let state = self.state.read().await;
        Ok(state.children.iter().filter(|c| c.parent_id == parent_id).cloned().collect())
    }
}
