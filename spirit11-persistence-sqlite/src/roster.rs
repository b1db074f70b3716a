use log::{debug, error};
use sqlx::{Pool, Sqlite};
use spirit11_server_domain::{
    PlayerId, ServiceError, ServiceResult, UserId,
    roster::{RosterChange, RosterCommit, RosterRepository},
};

use crate::{is_foreign_key_violation, is_unique_violation};

pub struct SqliteRosterRepository {
    pool: Pool<Sqlite>,
}

impl SqliteRosterRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl RosterRepository for SqliteRosterRepository {
    async fn get_roster(&self, user_id: UserId) -> ServiceResult<Vec<PlayerId>> {
        sqlx::query_scalar::<_, PlayerId>(
            "SELECT player_id FROM user_teams WHERE user_id = ? ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ServiceError::Internal(e.to_string()))
    }

    async fn get_holders(&self, player_id: PlayerId) -> ServiceResult<Vec<UserId>> {
        sqlx::query_scalar::<_, UserId>(
            "SELECT user_id FROM user_teams WHERE player_id = ? ORDER BY user_id",
        )
        .bind(player_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ServiceError::Internal(e.to_string()))
    }

    async fn commit(&self, commit: &RosterCommit) -> ServiceResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))?;

        match commit.change {
            RosterChange::Insert(player_id) => {
                let result = sqlx::query("INSERT INTO user_teams (user_id, player_id) VALUES (?, ?)")
                    .bind(commit.user_id)
                    .bind(player_id)
                    .execute(&mut *tx)
                    .await;
                match result {
                    Ok(_) => {}
                    Err(e) if is_unique_violation(&e) => {
                        return ServiceError::not_possible("Player already in team");
                    }
                    Err(e) if is_foreign_key_violation(&e) => {
                        return ServiceError::not_found("Player or user not found");
                    }
                    Err(e) => return Err(ServiceError::Internal(e.to_string())),
                }
            }
            RosterChange::Delete(player_id) => {
                let result = sqlx::query("DELETE FROM user_teams WHERE user_id = ? AND player_id = ?")
                    .bind(commit.user_id)
                    .bind(player_id)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| ServiceError::Internal(e.to_string()))?;
                if result.rows_affected() == 0 {
                    return ServiceError::not_possible("Player not in team");
                }
            }
            RosterChange::Recalculate => {}
        }

        let result = sqlx::query(
            "UPDATE users SET budget = budget + ?, team_points = ? WHERE id = ?",
        )
        .bind(commit.budget_delta)
        .bind(commit.team_points)
        .bind(commit.user_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| ServiceError::Internal(e.to_string()))?;
        if result.rows_affected() == 0 {
            return ServiceError::not_found("User not found");
        }

        tx.commit().await.map_err(|e| {
            error!("Failed to commit roster change for user {}: {}", commit.user_id, e);
            ServiceError::Internal(e.to_string())
        })?;
        debug!(
            "Committed {:?} for user {} with budget delta {}",
            commit.change, commit.user_id, commit.budget_delta
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use spirit11_core::{Category, INITIAL_BUDGET, PlayerStats, SQUAD_SIZE, Valuation, valuate};
    use spirit11_server_domain::{
        account::{NewUser, UserRepository},
        catalog::{PlayerCatalogService, PlayerCatalogServiceImpl, PlayerProfile, PlayerRepository},
        roster::{ArcRosterLedger, RosterError, RosterLedger, RosterLedgerImpl},
    };

    use crate::{
        SqlitePlayerRepository, SqliteUserRepository, replace_catalog, test_util::memory_pool,
    };

    use super::*;

    struct Fixture {
        pool: Pool<Sqlite>,
        users: SqliteUserRepository,
        players: SqlitePlayerRepository,
        roster: SqliteRosterRepository,
        ledger: ArcRosterLedger,
    }

    async fn fixture() -> Fixture {
        let pool = memory_pool().await;
        let ledger: ArcRosterLedger = Arc::new(Box::new(RosterLedgerImpl::new(
            Arc::new(Box::new(SqliteUserRepository::new(pool.clone()))),
            Arc::new(Box::new(SqlitePlayerRepository::new(pool.clone()))),
            Arc::new(Box::new(SqliteRosterRepository::new(pool.clone()))),
        )));
        Fixture {
            users: SqliteUserRepository::new(pool.clone()),
            players: SqlitePlayerRepository::new(pool.clone()),
            roster: SqliteRosterRepository::new(pool.clone()),
            ledger,
            pool,
        }
    }

    async fn add_user(fixture: &Fixture, username: &str) -> UserId {
        fixture
            .users
            .create_user(&NewUser {
                username: username.to_string(),
                password_hash: String::new(),
                is_admin: false,
                university: None,
            })
            .await
            .unwrap()
    }

    async fn add_batter(fixture: &Fixture, name: &str) -> PlayerId {
        let profile = PlayerProfile {
            name: name.to_string(),
            university: "University of Moratuwa".to_string(),
            category: Category::Batsman,
            stats: PlayerStats {
                total_runs: 450,
                balls_faced: 300,
                innings_played: 12,
                ..Default::default()
            },
        };
        fixture
            .players
            .create_player(&profile, valuate(&profile.stats))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_commit_is_atomic() {
        let fixture = fixture().await;
        let user_id = add_user(&fixture, "spiritx_2025").await;
        let player_id = add_batter(&fixture, "Batter").await;

        let insert = RosterCommit {
            user_id,
            change: RosterChange::Insert(player_id),
            budget_delta: -650_000,
            team_points: 0.0,
        };
        fixture.roster.commit(&insert).await.unwrap();
        assert!(matches!(
            fixture.roster.commit(&insert).await,
            Err(ServiceError::NotPossible(_))
        ));
        assert!(
            fixture
                .roster
                .commit(&RosterCommit {
                    change: RosterChange::Insert(player_id + 1),
                    ..insert.clone()
                })
                .await
                .is_err()
        );
        assert!(matches!(
            fixture
                .roster
                .commit(&RosterCommit {
                    user_id: user_id + 1,
                    ..insert.clone()
                })
                .await,
            Err(ServiceError::NotFound(_))
        ));

        let user = fixture.users.get_user(user_id).await.unwrap().unwrap();
        assert_eq!(user.budget, INITIAL_BUDGET - 650_000);
        assert_eq!(
            fixture.roster.get_roster(user_id).await.unwrap(),
            vec![player_id]
        );

        assert!(matches!(
            fixture
                .roster
                .commit(&RosterCommit {
                    change: RosterChange::Delete(player_id + 1),
                    budget_delta: 650_000,
                    ..insert.clone()
                })
                .await,
            Err(ServiceError::NotPossible(_))
        ));
        let user = fixture.users.get_user(user_id).await.unwrap().unwrap();
        assert_eq!(user.budget, INITIAL_BUDGET - 650_000);
    }

    #[tokio::test]
    async fn test_ledger_over_sqlite() {
        let fixture = fixture().await;
        let user_id = add_user(&fixture, "spiritx_2025").await;
        let mut ids = Vec::new();
        for i in 0..SQUAD_SIZE {
            ids.push(add_batter(&fixture, &format!("Batter {}", i)).await);
        }
        for &id in &ids {
            fixture.ledger.add_player(user_id, id).await.unwrap();
        }
        let status = fixture.ledger.get_status(user_id).await.unwrap();
        assert!(status.is_complete);
        assert_eq!(status.team_points, 660.0);
        assert_eq!(status.budget, INITIAL_BUDGET - 11 * 650_000);
        assert!(matches!(
            fixture.ledger.add_player(user_id, ids[0]).await,
            Err(RosterError::AlreadyInRoster)
        ));

        let team = fixture.ledger.get_team(user_id).await.unwrap();
        assert_eq!(team.players.iter().map(|p| p.id).collect::<Vec<_>>(), ids);

        fixture.ledger.remove_player(user_id, ids[5]).await.unwrap();
        let user = fixture.users.get_user(user_id).await.unwrap().unwrap();
        assert_eq!(user.team_points, 0.0);
        assert_eq!(user.budget, INITIAL_BUDGET - 10 * 650_000);
    }

    #[tokio::test]
    async fn test_catalog_delete_cascades_with_refund() {
        let fixture = fixture().await;
        let catalog = PlayerCatalogServiceImpl::new(
            Arc::new(Box::new(SqlitePlayerRepository::new(fixture.pool.clone()))),
            fixture.ledger.clone(),
        );
        let first = add_user(&fixture, "first_user").await;
        let second = add_user(&fixture, "second_user").await;
        let player_id = add_batter(&fixture, "Batter").await;
        fixture.ledger.add_player(first, player_id).await.unwrap();
        fixture.ledger.add_player(second, player_id).await.unwrap();

        catalog.remove_player(player_id).await.unwrap();

        for user_id in [first, second] {
            let user = fixture.users.get_user(user_id).await.unwrap().unwrap();
            assert_eq!(user.budget, INITIAL_BUDGET);
            assert!(fixture.roster.get_roster(user_id).await.unwrap().is_empty());
        }
        assert!(fixture.players.get_player(player_id).await.unwrap().is_none());
        assert!(
            fixture
                .roster
                .get_holders(player_id)
                .await
                .unwrap()
                .is_empty()
        );
    }

    fn bowler(name: &str, overs_bowled: f64) -> (PlayerProfile, Valuation) {
        let profile = PlayerProfile {
            name: name.to_string(),
            university: "University of Ruhuna".to_string(),
            category: Category::Bowler,
            stats: PlayerStats {
                wickets: 10,
                overs_bowled,
                runs_conceded: 150,
                ..Default::default()
            },
        };
        let valuation = valuate(&profile.stats);
        (profile, valuation)
    }

    #[tokio::test]
    async fn test_replace_catalog() {
        let fixture = fixture().await;
        let user_id = add_user(&fixture, "spiritx_2025").await;
        let player_id = add_batter(&fixture, "Batter").await;
        fixture.ledger.add_player(user_id, player_id).await.unwrap();

        let ids = replace_catalog(&fixture.pool, &[bowler("Bowler", 20.0)])
            .await
            .unwrap();

        let user = fixture.users.get_user(user_id).await.unwrap().unwrap();
        assert_eq!(user.budget, INITIAL_BUDGET);
        assert!(fixture.roster.get_roster(user_id).await.unwrap().is_empty());
        let players = fixture.players.get_players(Default::default()).await.unwrap();
        assert_eq!(players.iter().map(|p| p.id).collect::<Vec<_>>(), ids);
        assert_eq!(players[0].profile.name, "Bowler");
    }

    #[tokio::test]
    async fn test_replace_catalog_failure_keeps_old_state() {
        let fixture = fixture().await;
        let user_id = add_user(&fixture, "spiritx_2025").await;
        let player_id = add_batter(&fixture, "Batter").await;
        fixture.ledger.add_player(user_id, player_id).await.unwrap();

        // the second record violates the overs_bowled check constraint
        let result = replace_catalog(
            &fixture.pool,
            &[bowler("Bowler", 20.0), bowler("Broken", -1.0)],
        )
        .await;
        assert!(matches!(result, Err(ServiceError::Internal(_))));

        let user = fixture.users.get_user(user_id).await.unwrap().unwrap();
        assert_eq!(user.budget, INITIAL_BUDGET - 650_000);
        assert_eq!(
            fixture.roster.get_roster(user_id).await.unwrap(),
            vec![player_id]
        );
        let players = fixture.players.get_players(Default::default()).await.unwrap();
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].id, player_id);
    }
}
