//! Global database pool and schema bootstrap.

use crate::orm::{comments, group_members, groups, lookups, sessions, tickets, users};
use once_cell::sync::OnceCell;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, EntityTrait, Schema,
};

static DB_POOL: OnceCell<DatabaseConnection> = OnceCell::new();

/// Opens a connection pool for the given URL.
///
/// In-memory SQLite databases only live as long as their connection, so the
/// pool is pinned to a single connection for them.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(database_url.to_owned());
    if database_url.starts_with("sqlite::memory:") {
        opt.max_connections(1).min_connections(1);
    }
    Database::connect(opt).await
}

/// Connects the global pool and creates any missing tables.
/// Calling this more than once keeps the first pool.
pub async fn init_db(database_url: String) -> Result<(), DbErr> {
    if DB_POOL.get().is_some() {
        log::warn!("init_db called twice; keeping the existing pool");
        return Ok(());
    }

    let db = connect(&database_url).await?;
    create_schema(&db).await?;

    if DB_POOL.set(db).is_err() {
        log::warn!("database pool was initialized concurrently");
    }

    log::info!("Database pool ready");
    Ok(())
}

/// Returns the global pool.
///
/// Panics if `init_db` has not completed; every binary calls it before
/// starting the server.
pub fn get_db_pool() -> &'static DatabaseConnection {
    DB_POOL
        .get()
        .expect("Database pool accessed before init_db().")
}

async fn create_table<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<(), DbErr>
where
    E: EntityTrait,
{
    let backend = db.get_database_backend();
    let mut stmt = schema.create_table_from_entity(entity);
    stmt.if_not_exists();
    db.execute(backend.build(&stmt)).await?;
    Ok(())
}

/// Creates every table from its entity definition.
/// Order follows foreign keys: users first, dependents after.
pub async fn create_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let schema = Schema::new(db.get_database_backend());

    create_table(db, &schema, users::Entity).await?;
    create_table(db, &schema, sessions::Entity).await?;
    create_table(db, &schema, lookups::Entity).await?;
    create_table(db, &schema, groups::Entity).await?;
    create_table(db, &schema, group_members::Entity).await?;
    create_table(db, &schema, tickets::Entity).await?;
    create_table(db, &schema, comments::Entity).await?;

    Ok(())
}
