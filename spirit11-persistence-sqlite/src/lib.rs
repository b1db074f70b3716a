use std::time::Duration;

use log::{error, info};
use sqlx::{
    Pool, Sqlite,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use spirit11_core::{INITIAL_BUDGET, Valuation};
use spirit11_server_domain::{PlayerId, ServiceError, ServiceResult, catalog::PlayerProfile};

pub mod players;
pub mod roster;
pub mod users;

pub use players::SqlitePlayerRepository;
pub use roster::SqliteRosterRepository;
pub use users::SqliteUserRepository;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    is_admin BOOLEAN NOT NULL DEFAULT 0,
    university TEXT,
    budget INTEGER NOT NULL,
    team_points REAL NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS players (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    university TEXT NOT NULL,
    category TEXT NOT NULL,
    total_runs INTEGER NOT NULL DEFAULT 0,
    balls_faced INTEGER NOT NULL DEFAULT 0,
    innings_played INTEGER NOT NULL DEFAULT 0,
    wickets INTEGER NOT NULL DEFAULT 0,
    overs_bowled REAL NOT NULL DEFAULT 0 CHECK (overs_bowled >= 0),
    runs_conceded INTEGER NOT NULL DEFAULT 0,
    player_points REAL NOT NULL DEFAULT 0,
    player_value INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS user_teams (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    player_id INTEGER NOT NULL REFERENCES players(id),
    UNIQUE (user_id, player_id)
);

CREATE INDEX IF NOT EXISTS user_teams_player_id ON user_teams (player_id);
"#;

pub fn connect_options(db_path: &str, create_if_missing: bool) -> SqliteConnectOptions {
    SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(create_if_missing)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5))
}

/// Lazily connecting pool for the database at `SPIRIT11_DB`.
pub fn create_db_pool() -> Pool<Sqlite> {
    let db_path = std::env::var("SPIRIT11_DB").expect("SPIRIT11_DB env var not set");

    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_lazy_with(connect_options(&db_path, false))
}

pub async fn create_schema(pool: &Pool<Sqlite>) -> ServiceResult<()> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| ServiceError::Internal(e.to_string()))?;
    Ok(())
}

/// Replaces the whole catalog with `players` in one transaction. Every roster
/// is emptied first and all users return to the initial budget with zero
/// team points; on failure nothing changes.
pub async fn replace_catalog(
    pool: &Pool<Sqlite>,
    players: &[(PlayerProfile, Valuation)],
) -> ServiceResult<Vec<PlayerId>> {
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| ServiceError::Internal(e.to_string()))?;
    sqlx::query("DELETE FROM user_teams")
        .execute(&mut *tx)
        .await
        .map_err(|e| ServiceError::Internal(e.to_string()))?;
    sqlx::query("UPDATE users SET budget = ?, team_points = 0")
        .bind(INITIAL_BUDGET)
        .execute(&mut *tx)
        .await
        .map_err(|e| ServiceError::Internal(e.to_string()))?;
    sqlx::query("DELETE FROM players")
        .execute(&mut *tx)
        .await
        .map_err(|e| ServiceError::Internal(e.to_string()))?;

    let mut ids = Vec::with_capacity(players.len());
    for (profile, valuation) in players {
        ids.push(SqlitePlayerRepository::insert_player(&mut tx, profile, *valuation).await?);
    }

    tx.commit().await.map_err(|e| {
        error!("Failed to commit catalog replacement: {}", e);
        ServiceError::Internal(e.to_string())
    })?;
    info!("Replaced catalog with {} players", ids.len());
    Ok(ids)
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

fn is_foreign_key_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .is_some_and(|db| db.is_foreign_key_violation())
}
