use std::sync::Arc;

use dashmap::DashMap;
use log::{debug, info};
use spirit11_core::{INITIAL_BUDGET, Money, SQUAD_SIZE, round_to_cents};
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    PlayerId, ServiceError, ServiceResult, UserId,
    account::ArcUserRepository,
    catalog::{ArcPlayerRepository, Eviction, Player},
};

#[derive(Debug, Clone, Error)]
pub enum RosterError {
    #[error("Player already in team")]
    AlreadyInRoster,
    #[error("Team already has {} players", SQUAD_SIZE)]
    RosterFull,
    #[error("Player not found")]
    PlayerNotFound,
    #[error("User not found")]
    UserNotFound,
    #[error("Insufficient budget: player costs {required}, available budget is {available}")]
    InsufficientBudget { required: Money, available: Money },
    #[error("Player not in team")]
    NotInRoster,
    #[error(transparent)]
    Store(#[from] ServiceError),
}

impl From<RosterError> for ServiceError {
    fn from(err: RosterError) -> Self {
        match err {
            RosterError::PlayerNotFound | RosterError::UserNotFound => {
                ServiceError::NotFound(err.to_string())
            }
            RosterError::Store(inner) => inner,
            _ => ServiceError::NotPossible(err.to_string()),
        }
    }
}

pub type RosterResult<T> = Result<T, RosterError>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RosterChange {
    Insert(PlayerId),
    Delete(PlayerId),
    /// Only rewrites the team points.
    Recalculate,
}

/// One atomic mutation of a user's roster state.
#[derive(Clone, Debug, PartialEq)]
pub struct RosterCommit {
    pub user_id: UserId,
    pub change: RosterChange,
    pub budget_delta: Money,
    pub team_points: f64,
}

pub type ArcRosterRepository = Arc<Box<dyn RosterRepository + Send + Sync + 'static>>;

#[async_trait::async_trait]
pub trait RosterRepository {
    /// Held player ids in insertion order.
    async fn get_roster(&self, user_id: UserId) -> ServiceResult<Vec<PlayerId>>;
    /// Users holding the player, ordered by id.
    async fn get_holders(&self, player_id: PlayerId) -> ServiceResult<Vec<UserId>>;
    /// Applies the entry change, adds `budget_delta` to the budget and stores
    /// `team_points`, all or nothing. Inserting a held or unknown player and
    /// deleting an entry that does not exist fail without any change.
    async fn commit(&self, commit: &RosterCommit) -> ServiceResult<()>;
}

/// Serializes roster mutations per user. Entries are never pruned, so the map
/// holds at most one mutex per user that has ever changed a roster.
#[derive(Default)]
pub struct UserLocks {
    locks: DashMap<UserId, Arc<Mutex<()>>>,
}

impl UserLocks {
    pub async fn lock(&self, user_id: UserId) -> OwnedMutexGuard<()> {
        let lock = self.locks.entry(user_id).or_default().clone();
        lock.lock_owned().await
    }

    /// Acquires in ascending id order so overlapping callers cannot deadlock.
    pub async fn lock_many(&self, mut user_ids: Vec<UserId>) -> Vec<OwnedMutexGuard<()>> {
        user_ids.sort_unstable();
        user_ids.dedup();
        let mut guards = Vec::with_capacity(user_ids.len());
        for user_id in user_ids {
            guards.push(self.lock(user_id).await);
        }
        guards
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RosterStatus {
    pub count: usize,
    pub is_complete: bool,
    pub budget: Money,
    pub team_points: f64,
}

impl RosterStatus {
    pub fn summary(&self) -> String {
        format!("{}/{} players selected", self.count, SQUAD_SIZE)
    }
}

#[derive(Clone, Debug)]
pub struct Team {
    pub players: Vec<Player>,
    pub status: RosterStatus,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlayerSpending {
    pub id: PlayerId,
    pub name: String,
    pub value: Money,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BudgetBreakdown {
    pub available_budget: Money,
    pub total_spent: Money,
    pub initial_budget: Money,
    pub player_spending: Vec<PlayerSpending>,
}

/// Sum of points for a complete squad, 0 otherwise.
pub fn team_points(players: &[Player]) -> f64 {
    if players.len() != SQUAD_SIZE {
        return 0.0;
    }
    round_to_cents(players.iter().map(Player::points).sum())
}

pub type ArcRosterLedger = Arc<Box<dyn RosterLedger + Send + Sync + 'static>>;

#[async_trait::async_trait]
pub trait RosterLedger {
    async fn add_player(&self, user_id: UserId, player_id: PlayerId) -> RosterResult<RosterStatus>;
    async fn remove_player(
        &self,
        user_id: UserId,
        player_id: PlayerId,
    ) -> RosterResult<RosterStatus>;
    async fn get_status(&self, user_id: UserId) -> ServiceResult<RosterStatus>;
    async fn get_team(&self, user_id: UserId) -> ServiceResult<Team>;
    async fn budget_breakdown(&self, user_id: UserId) -> ServiceResult<BudgetBreakdown>;
    /// Deletes the player from the catalog, removing it from every roster
    /// with a refund of its current value.
    async fn evict_player(&self, player_id: PlayerId) -> ServiceResult<Eviction>;
    /// Recomputes team points of every holder after the player's stats changed.
    async fn refresh_holders(&self, player_id: PlayerId) -> ServiceResult<()>;
}

pub struct RosterLedgerImpl {
    user_repository: ArcUserRepository,
    player_repository: ArcPlayerRepository,
    roster_repository: ArcRosterRepository,
    locks: UserLocks,
}

impl RosterLedgerImpl {
    pub fn new(
        user_repository: ArcUserRepository,
        player_repository: ArcPlayerRepository,
        roster_repository: ArcRosterRepository,
    ) -> Self {
        Self {
            user_repository,
            player_repository,
            roster_repository,
            locks: UserLocks::default(),
        }
    }

    async fn load_players(&self, roster: &[PlayerId]) -> ServiceResult<Vec<Player>> {
        let mut players = Vec::with_capacity(roster.len());
        for &player_id in roster {
            match self.player_repository.get_player(player_id).await? {
                Some(player) => players.push(player),
                None => {
                    return ServiceError::internal(format!(
                        "Roster references missing player {}",
                        player_id
                    ));
                }
            }
        }
        Ok(players)
    }

    async fn read_status(&self, user_id: UserId, count: usize) -> ServiceResult<RosterStatus> {
        let Some(user) = self.user_repository.get_user(user_id).await? else {
            return ServiceError::not_found("User not found");
        };
        let is_complete = count == SQUAD_SIZE;
        Ok(RosterStatus {
            count,
            is_complete,
            budget: user.budget,
            team_points: if is_complete { user.team_points } else { 0.0 },
        })
    }
}

#[async_trait::async_trait]
impl RosterLedger for RosterLedgerImpl {
    async fn add_player(&self, user_id: UserId, player_id: PlayerId) -> RosterResult<RosterStatus> {
        let _guard = self.locks.lock(user_id).await;

        let roster = self.roster_repository.get_roster(user_id).await?;
        if roster.contains(&player_id) {
            return Err(RosterError::AlreadyInRoster);
        }
        if roster.len() >= SQUAD_SIZE {
            return Err(RosterError::RosterFull);
        }
        let player = self
            .player_repository
            .get_player(player_id)
            .await?
            .ok_or(RosterError::PlayerNotFound)?;
        let user = self
            .user_repository
            .get_user(user_id)
            .await?
            .ok_or(RosterError::UserNotFound)?;
        if player.value() > user.budget {
            return Err(RosterError::InsufficientBudget {
                required: player.value(),
                available: user.budget,
            });
        }

        let mut players = self.load_players(&roster).await?;
        let value = player.value();
        players.push(player);

        self.roster_repository
            .commit(&RosterCommit {
                user_id,
                change: RosterChange::Insert(player_id),
                budget_delta: -value,
                team_points: team_points(&players),
            })
            .await?;
        info!(
            "User {} added player {} for {}, remaining budget {}",
            user_id,
            player_id,
            value,
            user.budget - value
        );

        Ok(self.read_status(user_id, players.len()).await?)
    }

    async fn remove_player(
        &self,
        user_id: UserId,
        player_id: PlayerId,
    ) -> RosterResult<RosterStatus> {
        let _guard = self.locks.lock(user_id).await;

        let roster = self.roster_repository.get_roster(user_id).await?;
        if !roster.contains(&player_id) {
            return Err(RosterError::NotInRoster);
        }
        let players = self.load_players(&roster).await?;
        let (removed, kept): (Vec<_>, Vec<_>) =
            players.into_iter().partition(|p| p.id == player_id);
        // refund at the current catalog value, not the purchase price
        let refund: Money = removed.iter().map(Player::value).sum();

        self.roster_repository
            .commit(&RosterCommit {
                user_id,
                change: RosterChange::Delete(player_id),
                budget_delta: refund,
                team_points: team_points(&kept),
            })
            .await?;
        info!(
            "User {} removed player {}, refunded {}",
            user_id, player_id, refund
        );

        Ok(self.read_status(user_id, kept.len()).await?)
    }

    async fn get_status(&self, user_id: UserId) -> ServiceResult<RosterStatus> {
        let roster = self.roster_repository.get_roster(user_id).await?;
        self.read_status(user_id, roster.len()).await
    }

    async fn get_team(&self, user_id: UserId) -> ServiceResult<Team> {
        let roster = self.roster_repository.get_roster(user_id).await?;
        let players = self.load_players(&roster).await?;
        let status = self.read_status(user_id, players.len()).await?;
        Ok(Team { players, status })
    }

    async fn budget_breakdown(&self, user_id: UserId) -> ServiceResult<BudgetBreakdown> {
        let team = self.get_team(user_id).await?;
        let player_spending: Vec<PlayerSpending> = team
            .players
            .into_iter()
            .map(|p| PlayerSpending {
                id: p.id,
                value: p.value(),
                name: p.profile.name,
            })
            .collect();
        Ok(BudgetBreakdown {
            available_budget: team.status.budget,
            total_spent: player_spending.iter().map(|p| p.value).sum(),
            initial_budget: INITIAL_BUDGET,
            player_spending,
        })
    }

    async fn evict_player(&self, player_id: PlayerId) -> ServiceResult<Eviction> {
        let holders = self.roster_repository.get_holders(player_id).await?;
        let _guards = self.locks.lock_many(holders).await;
        self.player_repository.delete_player(player_id).await
    }

    async fn refresh_holders(&self, player_id: PlayerId) -> ServiceResult<()> {
        let holders = self.roster_repository.get_holders(player_id).await?;
        for user_id in holders {
            let _guard = self.locks.lock(user_id).await;
            let roster = self.roster_repository.get_roster(user_id).await?;
            if !roster.contains(&player_id) {
                continue;
            }
            let players = self.load_players(&roster).await?;
            let points = team_points(&players);
            self.roster_repository
                .commit(&RosterCommit {
                    user_id,
                    change: RosterChange::Recalculate,
                    budget_delta: 0,
                    team_points: points,
                })
                .await?;
            debug!("Recomputed team points of user {}: {}", user_id, points);
        }
        Ok(())
    }
}
