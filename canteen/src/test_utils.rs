//! Test utilities for HTTP-level tests against the in-memory store.

use std::sync::Arc;

use axum_test::TestServer;
use uuid::Uuid;

use crate::api::models::users::{CurrentUser, Role};
use crate::config::{Config, DatabaseConfig, ProxyHeaderAuthConfig};
use crate::db::{
    InMemoryStore, Store,
    models::{
        registry_rows::{RegistryIdentity, RegistryRowCreateDBRequest},
        schools::SchoolCreateDBRequest,
    },
};
use crate::types::{SchoolId, UserId};

pub fn create_test_config() -> Config {
    Config {
        database: DatabaseConfig::Memory { schools: Vec::new() },
        ..Default::default()
    }
}

/// Test server over a fresh in-memory store with one school administered by `admin`.
pub async fn create_test_app() -> (TestServer, Arc<InMemoryStore>, TestSchool) {
    create_test_app_with_config(create_test_config()).await
}

pub async fn create_test_app_with_config(config: Config) -> (TestServer, Arc<InMemoryStore>, TestSchool) {
    let store = Arc::new(InMemoryStore::new());
    let school = create_test_school(&store).await;

    let app = crate::Application::new_with_store(config, store.clone() as Arc<dyn Store>).expect("Failed to create application");
    (app.into_test_server(), store, school)
}

/// A school together with an administrator account
pub struct TestSchool {
    pub id: SchoolId,
    pub admin: CurrentUser,
}

pub async fn create_test_school(store: &InMemoryStore) -> TestSchool {
    let admin_id = Uuid::new_v4();
    let school = store
        .insert_school(SchoolCreateDBRequest {
            id: Uuid::new_v4(),
            name: format!("test_school_{}", Uuid::new_v4().simple()),
            admin_id: Some(admin_id),
        })
        .await;

    TestSchool {
        id: school.id,
        admin: CurrentUser {
            id: admin_id,
            role: Role::SchoolAdmin,
            school_id: None,
        },
    }
}

pub fn test_user(role: Role, school_id: Option<SchoolId>) -> CurrentUser {
    CurrentUser {
        id: Uuid::new_v4(),
        role,
        school_id,
    }
}

/// Gateway identity headers for the given user, using the default header names
pub fn add_auth_headers(user: &CurrentUser) -> Vec<(String, String)> {
    let config = ProxyHeaderAuthConfig::default();
    let mut headers = vec![
        (config.user_id_header, user.id.to_string()),
        (config.role_header, user.role.to_string()),
    ];
    if let Some(school_id) = user.school_id {
        headers.push((config.school_id_header, school_id.to_string()));
    }
    headers
}

/// A small CSV registry with a header row
pub fn sample_registry_csv() -> &'static str {
    "prenom,nom,matricule,date de naissance,classe\n\
     Awa,Traoré,AB-12,01/03/2015,CM2\n\
     Moussa,Diallo,M-7,2013-09-09,CM1\n\
     Fatou,Kone,F-3,12/11/2014,CE2\n"
}

/// Insert a school row directly, for repository tests against Postgres
pub async fn create_test_pg_school(pool: &sqlx::PgPool, admin_id: Option<UserId>) -> SchoolId {
    sqlx::query_scalar("INSERT INTO schools (name, admin_id) VALUES ($1, $2) RETURNING id")
        .bind(format!("test_school_{}", Uuid::new_v4().simple()))
        .bind(admin_id)
        .fetch_one(pool)
        .await
        .expect("Failed to insert test school")
}

/// A registry row for `school_id` whose normalized identity is derived from `code`
pub fn test_registry_row(school_id: SchoolId, position: i32, code: &str) -> RegistryRowCreateDBRequest {
    RegistryRowCreateDBRequest {
        school_id,
        import_id: Uuid::nil(),
        position,
        first_name: "Awa".to_string(),
        last_name: "Traoré".to_string(),
        student_code: code.to_string(),
        birth_date: "01/03/2015".to_string(),
        class_name: "CM2".to_string(),
        identity: RegistryIdentity {
            first_name: "awa".to_string(),
            last_name: "traore".to_string(),
            student_code: code.to_string(),
            birth_date: "2015-03-01".to_string(),
            class_name: "CM2".to_string(),
        },
        source_file_name: "list.csv".to_string(),
        imported_by: Uuid::nil(),
    }
}
