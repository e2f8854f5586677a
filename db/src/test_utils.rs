//! Fixtures for tests that need a real schema.

use migration::Migrator;
use sea_orm::{Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;

use crate::store::SqlRunStore;

/// Fresh in-memory SQLite with every migration applied. Each call gets its
/// own database.
pub async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite should open");
    Migrator::up(&db, None)
        .await
        .expect("migrations should apply to an empty database");
    db
}

pub async fn setup_test_store() -> SqlRunStore {
    SqlRunStore::new(setup_test_db().await)
}
