use spirit11_persistence_sqlite::{connect_options, create_schema};
use sqlx::sqlite::SqlitePoolOptions;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let db_path = std::env::var("SPIRIT11_DB").expect("SPIRIT11_DB env var not set");
    let path = std::path::Path::new(&db_path);
    if let Some(parent) = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty() && !p.exists())
    {
        std::fs::create_dir_all(parent).expect("Failed to create parent directory for DB");
        println!("Created parent directory for DB at {}", parent.display());
    }

    if path.exists() {
        std::fs::remove_file(path).expect("Failed to remove existing DB");
        println!("Removed existing DB at {}", db_path);
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(connect_options(&db_path, true))
        .await
        .expect("Failed to create DB");
    create_schema(&pool).await.expect("Failed to create schema");
    pool.close().await;

    println!("Created new DB at {}", db_path);
}
