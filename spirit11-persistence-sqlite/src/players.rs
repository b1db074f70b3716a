use log::{debug, error};
use sqlx::{Pool, Row, Sqlite, SqliteConnection, sqlite::SqliteRow};
use spirit11_core::{Category, Money, PlayerStats, UnknownCategory, Valuation};
use spirit11_server_domain::{
    PlayerId, ServiceError, ServiceResult, UserId,
    catalog::{Eviction, Player, PlayerFilter, PlayerProfile, PlayerRepository},
};

const PLAYER_FIELDS: [&str; 11] = [
    "name",
    "university",
    "category",
    "total_runs",
    "balls_faced",
    "innings_played",
    "wickets",
    "overs_bowled",
    "runs_conceded",
    "player_points",
    "player_value",
];

pub struct SqlitePlayerRepository {
    pool: Pool<Sqlite>,
}

impl SqlitePlayerRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    fn player_from_row(row: &SqliteRow) -> sqlx::Result<Player> {
        let category: String = row.try_get("category")?;
        let category: Category = category
            .parse()
            .map_err(|e: UnknownCategory| sqlx::Error::Decode(Box::new(e)))?;
        Ok(Player {
            id: row.try_get("id")?,
            profile: PlayerProfile {
                name: row.try_get("name")?,
                university: row.try_get("university")?,
                category,
                stats: PlayerStats {
                    total_runs: row.try_get("total_runs")?,
                    balls_faced: row.try_get("balls_faced")?,
                    innings_played: row.try_get("innings_played")?,
                    wickets: row.try_get("wickets")?,
                    overs_bowled: row.try_get("overs_bowled")?,
                    runs_conceded: row.try_get("runs_conceded")?,
                },
            },
            valuation: Valuation {
                points: row.try_get("player_points")?,
                value: row.try_get("player_value")?,
            },
        })
    }

    pub(crate) async fn insert_player(
        conn: &mut SqliteConnection,
        profile: &PlayerProfile,
        valuation: Valuation,
    ) -> ServiceResult<PlayerId> {
        let sql = format!(
            "INSERT INTO players ({}) VALUES ({})",
            PLAYER_FIELDS.join(", "),
            PLAYER_FIELDS.map(|_| "?").join(", ")
        );
        let stats = &profile.stats;
        let result = sqlx::query(&sql)
            .bind(&profile.name)
            .bind(&profile.university)
            .bind(profile.category.as_str())
            .bind(stats.total_runs)
            .bind(stats.balls_faced)
            .bind(stats.innings_played)
            .bind(stats.wickets)
            .bind(stats.overs_bowled)
            .bind(stats.runs_conceded)
            .bind(valuation.points)
            .bind(valuation.value)
            .execute(conn)
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        Ok(result.last_insert_rowid())
    }
}

#[async_trait::async_trait]
impl PlayerRepository for SqlitePlayerRepository {
    async fn get_player(&self, id: PlayerId) -> ServiceResult<Option<Player>> {
        let row = sqlx::query("SELECT * FROM players WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        row.map(|row| Self::player_from_row(&row))
            .transpose()
            .map_err(|e| ServiceError::Internal(e.to_string()))
    }

    async fn get_players(&self, filter: PlayerFilter) -> ServiceResult<Vec<Player>> {
        let mut query = sqlx::query(match filter.category {
            Some(_) => "SELECT * FROM players WHERE category = ? ORDER BY id",
            None => "SELECT * FROM players ORDER BY id",
        });
        if let Some(category) = filter.category {
            query = query.bind(category.as_str());
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        rows.iter()
            .map(|row| {
                Self::player_from_row(row).map_err(|e| ServiceError::Internal(e.to_string()))
            })
            .collect()
    }

    async fn create_player(
        &self,
        profile: &PlayerProfile,
        valuation: Valuation,
    ) -> ServiceResult<PlayerId> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        Self::insert_player(&mut conn, profile, valuation).await
    }

    async fn create_players(
        &self,
        players: &[(PlayerProfile, Valuation)],
    ) -> ServiceResult<Vec<PlayerId>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        let mut ids = Vec::with_capacity(players.len());
        for (profile, valuation) in players {
            ids.push(Self::insert_player(&mut tx, profile, *valuation).await?);
        }
        tx.commit()
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        Ok(ids)
    }

    async fn update_player(
        &self,
        id: PlayerId,
        profile: &PlayerProfile,
        valuation: Valuation,
    ) -> ServiceResult<()> {
        let sql = format!(
            "UPDATE players SET {} WHERE id = ?",
            PLAYER_FIELDS.map(|field| format!("{} = ?", field)).join(", ")
        );
        let stats = &profile.stats;
        let result = sqlx::query(&sql)
            .bind(&profile.name)
            .bind(&profile.university)
            .bind(profile.category.as_str())
            .bind(stats.total_runs)
            .bind(stats.balls_faced)
            .bind(stats.innings_played)
            .bind(stats.wickets)
            .bind(stats.overs_bowled)
            .bind(stats.runs_conceded)
            .bind(valuation.points)
            .bind(valuation.value)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        if result.rows_affected() == 0 {
            return ServiceError::not_found("Player not found");
        }
        Ok(())
    }

    async fn delete_player(&self, id: PlayerId) -> ServiceResult<Eviction> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))?;

        let refund =
            sqlx::query_scalar::<_, Money>("SELECT player_value FROM players WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| ServiceError::Internal(e.to_string()))?;
        let Some(refund) = refund else {
            return ServiceError::not_found("Player not found");
        };

        let holders = sqlx::query_scalar::<_, UserId>(
            "SELECT user_id FROM user_teams WHERE player_id = ? ORDER BY user_id",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| ServiceError::Internal(e.to_string()))?;

        sqlx::query(
            "UPDATE users SET budget = budget + ?, team_points = 0 WHERE id IN (SELECT user_id FROM user_teams WHERE player_id = ?)",
        )
        .bind(refund)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| ServiceError::Internal(e.to_string()))?;

        sqlx::query("DELETE FROM user_teams WHERE player_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))?;

        sqlx::query("DELETE FROM players WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))?;

        tx.commit().await.map_err(|e| {
            error!("Failed to commit deletion of player {}: {}", id, e);
            ServiceError::Internal(e.to_string())
        })?;
        debug!(
            "Deleted player {} and {} roster entries",
            id,
            holders.len()
        );
        Ok(Eviction { holders, refund })
    }
}
