use log::*;
use sqlx::{migrate, migrate::MigrateDatabase, Sqlite};

use fulfillment_engine::SqliteDatabase;

pub async fn prepare_test_db() -> SqliteDatabase {
    let _ = env_logger::try_init();
    let url = random_db_path();
    if let Err(e) = Sqlite::drop_database(&url).await {
        warn!("Error dropping database {url}: {e:?}");
    }
    Sqlite::create_database(&url).await.expect("Error creating database");
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database");
    migrate!("./src/sqlite/migrations").run(db.pool()).await.expect("Error running DB migrations");
    info!("🚀️ Test database ready at {url}");
    db
}

pub fn random_db_path() -> String {
    let dir = std::env::temp_dir();
    format!("sqlite://{}/sfg_test_store_{}.db", dir.display(), rand::random::<u64>())
}
