use std::sync::Arc;

use async_trait::async_trait;
use schemabridge_core::{AppError, AppResult};
use schemabridge_domain::DatabaseConnection;
use tokio::sync::Mutex;

use crate::{AdminUserRecord, DatabaseRecord, ExistingDatabase, MetabaseMetadataStore, PasswordHasher};

use super::{BootstrapInput, BootstrapService, default_settings};

#[derive(Default)]
struct FakeMetadataStore {
    existing: Vec<ExistingDatabase>,
    users: Mutex<Vec<AdminUserRecord>>,
    memberships: Mutex<Vec<(String, Vec<String>)>>,
    replaced: Mutex<Vec<Vec<DatabaseRecord>>>,
    updated: Mutex<Vec<(i64, DatabaseRecord)>>,
    settings: Mutex<Vec<(String, String)>>,
    setup_token_deleted: Mutex<bool>,
}

#[async_trait]
impl MetabaseMetadataStore for FakeMetadataStore {
    async fn upsert_user(&self, user: &AdminUserRecord) -> AppResult<()> {
        self.users.lock().await.push(user.clone());
        Ok(())
    }

    async fn add_group_memberships(&self, email: &str, group_names: &[String]) -> AppResult<()> {
        self.memberships
            .lock()
            .await
            .push((email.to_owned(), group_names.to_vec()));
        Ok(())
    }

    async fn list_databases(&self) -> AppResult<Vec<ExistingDatabase>> {
        Ok(self.existing.clone())
    }

    async fn replace_databases(&self, databases: &[DatabaseRecord]) -> AppResult<()> {
        self.replaced.lock().await.push(databases.to_vec());
        Ok(())
    }

    async fn update_database(&self, id: i64, database: &DatabaseRecord) -> AppResult<()> {
        self.updated.lock().await.push((id, database.clone()));
        Ok(())
    }

    async fn upsert_settings(&self, settings: &[(String, String)]) -> AppResult<()> {
        self.settings.lock().await.extend_from_slice(settings);
        Ok(())
    }

    async fn delete_setup_token(&self) -> AppResult<()> {
        *self.setup_token_deleted.lock().await = true;
        Ok(())
    }
}

struct ReversingHasher;

impl PasswordHasher for ReversingHasher {
    fn hash_password(&self, salted_password: &str) -> AppResult<String> {
        Ok(salted_password.chars().rev().collect())
    }
}

fn warehouse() -> DatabaseConnection {
    DatabaseConnection::Postgres {
        host: "db.internal".to_owned(),
        port: 5432,
        database: "dwh".to_owned(),
        user: "reader".to_owned(),
        password: "secret".to_owned(),
        sslmode: None,
    }
}

fn input(databases: Vec<(String, DatabaseConnection)>) -> BootstrapInput {
    BootstrapInput {
        admin_email: "admin@example.com".to_owned(),
        admin_first_name: "Admin".to_owned(),
        admin_last_name: "User".to_owned(),
        admin_password: "hunter2".to_owned(),
        databases,
        settings: default_settings("admin@example.com", "Europe/Berlin"),
    }
}

#[tokio::test]
async fn setup_seeds_admin_with_salted_hash_and_memberships() {
    let store = Arc::new(FakeMetadataStore::default());
    let service = BootstrapService::new(store.clone(), Arc::new(ReversingHasher));

    let result = service.setup(&input(Vec::new())).await;
    assert!(result.is_ok());

    let users = store.users.lock().await;
    assert_eq!(users.len(), 1);
    let admin = &users[0];
    assert!(admin.is_superuser);
    let salted: String = admin.password_hash.chars().rev().collect();
    assert_eq!(salted, format!("{}hunter2", admin.password_salt));

    assert_eq!(
        *store.memberships.lock().await,
        vec![(
            "admin@example.com".to_owned(),
            vec!["Administrators".to_owned(), "All Users".to_owned()]
        )]
    );
    assert!(*store.setup_token_deleted.lock().await);
    assert!(
        store
            .settings
            .lock()
            .await
            .contains(&("report-timezone".to_owned(), "Europe/Berlin".to_owned()))
    );
}

#[tokio::test]
async fn changed_connection_count_replaces_all_rows() {
    let store = Arc::new(FakeMetadataStore::default());
    let service = BootstrapService::new(store.clone(), Arc::new(ReversingHasher));

    let result = service
        .setup(&input(vec![("dwh".to_owned(), warehouse())]))
        .await;
    assert!(result.is_ok());

    let replaced = store.replaced.lock().await;
    assert_eq!(replaced.len(), 1);
    assert_eq!(replaced[0][0].name, "dwh");
    assert_eq!(replaced[0][0].engine, "postgres");
    assert!(store.updated.lock().await.is_empty());
}

#[tokio::test]
async fn same_connection_count_updates_rows_in_id_order() {
    let store = Arc::new(FakeMetadataStore {
        existing: vec![
            ExistingDatabase {
                id: 3,
                name: "old-dwh".to_owned(),
            },
            ExistingDatabase {
                id: 8,
                name: "old-mart".to_owned(),
            },
        ],
        ..FakeMetadataStore::default()
    });
    let service = BootstrapService::new(store.clone(), Arc::new(ReversingHasher));

    let result = service
        .setup(&input(vec![
            ("dwh".to_owned(), warehouse()),
            ("mart".to_owned(), warehouse()),
        ]))
        .await;
    assert!(result.is_ok());

    let updated = store.updated.lock().await;
    let ids: Vec<(i64, &str)> = updated
        .iter()
        .map(|(id, record)| (*id, record.name.as_str()))
        .collect();
    assert_eq!(ids, vec![(3, "dwh"), (8, "mart")]);
    assert!(store.replaced.lock().await.is_empty());
}

#[tokio::test]
async fn empty_password_is_rejected() {
    let store = Arc::new(FakeMetadataStore::default());
    let service = BootstrapService::new(store.clone(), Arc::new(ReversingHasher));
    let mut input = input(Vec::new());
    input.admin_password.clear();

    let result = service.setup(&input).await;
    assert!(matches!(result, Err(AppError::Validation(_))));
    assert!(store.users.lock().await.is_empty());
}
