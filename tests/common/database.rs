//! Test database setup and management
#![allow(dead_code)]

use once_cell::sync::Lazy;
use sea_orm::{DatabaseConnection, DbErr, EntityTrait};
use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Once;
use tempfile::TempDir;

static INIT_SYNC: Once = Once::new();
static DB_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Holds the file behind the global pool for the life of the test binary.
static GLOBAL_DB_DIR: Lazy<TempDir> =
    Lazy::new(|| TempDir::new().expect("Failed to create test database directory"));

fn database_url() -> String {
    env::var("TEST_DATABASE_URL").unwrap_or_else(|_| "sqlite::memory:".to_string())
}

/// URL of the pool shared by route tests.
///
/// Each `#[actix_rt::test]` runs on its own runtime, so the shared pool must
/// be able to open fresh connections after the first runtime is gone. An
/// in-memory database would vanish with its only connection.
fn global_database_url() -> String {
    env::var("TEST_DATABASE_URL").unwrap_or_else(|_| {
        format!(
            "sqlite://{}?mode=rwc",
            GLOBAL_DB_DIR.path().join("ticketdesk.db").display()
        )
    })
}

/// Initialize synchronous global state (SALT, ARGON2, SESSIONS)
fn init_sync_globals() {
    INIT_SYNC.call_once(|| {
        if env::var("SALT").is_err() {
            env::set_var("SALT", "testsaltfortestingonly1234567890AB");
        }
        ticketdesk::session::init();
    });
}

/// Connects the global pool used by the web handlers.
pub async fn init_global_db() {
    init_sync_globals();

    if !DB_INITIALIZED.swap(true, Ordering::SeqCst) {
        ticketdesk::db::init_db(global_database_url())
            .await
            .expect("Failed to initialize global test database");
    }
}

/// Fresh connection with the schema in place.
///
/// With the default in-memory SQLite URL every call returns its own empty
/// database.
pub async fn setup_test_database() -> Result<DatabaseConnection, DbErr> {
    init_sync_globals();

    let db = ticketdesk::db::connect(&database_url()).await?;
    ticketdesk::db::create_schema(&db).await?;
    cleanup_test_data(&db).await?;
    Ok(db)
}

/// Removes every row, children before parents.
pub async fn cleanup_test_data(db: &DatabaseConnection) -> Result<(), DbErr> {
    use ticketdesk::orm::*;

    comments::Entity::delete_many().exec(db).await?;
    tickets::Entity::delete_many().exec(db).await?;
    group_members::Entity::delete_many().exec(db).await?;
    groups::Entity::delete_many().exec(db).await?;
    lookups::Entity::delete_many().exec(db).await?;
    sessions::Entity::delete_many().exec(db).await?;
    users::Entity::delete_many().exec(db).await?;
    Ok(())
}
