use std::{sync::Arc, time::Duration};

use log::info;
use spirit11_core::{Category, Money, PlayerStats, Valuation, valuate};
use validator::{Validate, ValidationError};

use crate::{
    PlayerId, ServiceError, ServiceResult, UserId,
    roster::ArcRosterLedger,
    util::{validate, validation_error},
};

#[derive(Clone, Debug, PartialEq, Validate)]
pub struct PlayerProfile {
    #[validate(length(min = 1, max = 100, message = "name must be 1 to 100 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 100, message = "university must be 1 to 100 characters"))]
    pub university: String,
    pub category: Category,
    #[validate(custom(function = "validate_stats"))]
    pub stats: PlayerStats,
}

fn validate_stats(stats: &PlayerStats) -> Result<(), ValidationError> {
    if stats.is_valid() {
        Ok(())
    } else {
        Err(validation_error(
            "stats",
            "overs_bowled must be a number between 0 and 10000",
        ))
    }
}

/// A catalog entry. `valuation` is always derived from `profile.stats` of the
/// same snapshot; repositories store both and return them together.
#[derive(Clone, Debug, PartialEq)]
pub struct Player {
    pub id: PlayerId,
    pub profile: PlayerProfile,
    pub valuation: Valuation,
}

impl Player {
    pub fn new(id: PlayerId, profile: PlayerProfile) -> Self {
        let valuation = valuate(&profile.stats);
        Self {
            id,
            profile,
            valuation,
        }
    }

    pub fn points(&self) -> f64 {
        self.valuation.points
    }

    pub fn value(&self) -> Money {
        self.valuation.value
    }

    pub fn name(&self) -> &str {
        &self.profile.name
    }
}

#[derive(Clone, Debug, Default)]
pub struct PlayerFilter {
    pub category: Option<Category>,
}

pub type ArcPlayerRepository = Arc<Box<dyn PlayerRepository + Send + Sync + 'static>>;

#[async_trait::async_trait]
pub trait PlayerRepository {
    async fn get_player(&self, id: PlayerId) -> ServiceResult<Option<Player>>;
    /// Players matching the filter, ordered by id.
    async fn get_players(&self, filter: PlayerFilter) -> ServiceResult<Vec<Player>>;
    async fn create_player(
        &self,
        profile: &PlayerProfile,
        valuation: Valuation,
    ) -> ServiceResult<PlayerId>;
    /// Inserts all players or none.
    async fn create_players(
        &self,
        players: &[(PlayerProfile, Valuation)],
    ) -> ServiceResult<Vec<PlayerId>>;
    /// Replaces profile and valuation together. `NotFound` if absent.
    async fn update_player(
        &self,
        id: PlayerId,
        profile: &PlayerProfile,
        valuation: Valuation,
    ) -> ServiceResult<()>;
    /// Deletes the player and, in the same transaction, every roster entry
    /// holding it: each holder is credited the stored value and its team
    /// points reset to 0.
    async fn delete_player(&self, id: PlayerId) -> ServiceResult<Eviction>;
}

/// Outcome of deleting a catalog entry.
#[derive(Clone, Debug, PartialEq)]
pub struct Eviction {
    /// Users that held the player, ordered by id.
    pub holders: Vec<UserId>,
    /// Credited to each holder; read inside the deleting transaction.
    pub refund: Money,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TopRunScorer {
    pub id: PlayerId,
    pub name: String,
    pub university: String,
    pub total_runs: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TopWicketTaker {
    pub id: PlayerId,
    pub name: String,
    pub university: String,
    pub wickets: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TournamentSummary {
    pub overall_runs: u64,
    pub overall_wickets: u64,
    pub highest_run_scorer: Option<TopRunScorer>,
    pub highest_wicket_taker: Option<TopWicketTaker>,
}

impl TournamentSummary {
    /// Ties go to the player with the lowest id.
    pub fn from_players(players: &[Player]) -> Self {
        let mut highest_run_scorer: Option<&Player> = None;
        let mut highest_wicket_taker: Option<&Player> = None;
        for player in players {
            let stats = &player.profile.stats;
            if highest_run_scorer.is_none_or(|p| stats.total_runs > p.profile.stats.total_runs) {
                highest_run_scorer = Some(player);
            }
            if highest_wicket_taker.is_none_or(|p| stats.wickets > p.profile.stats.wickets) {
                highest_wicket_taker = Some(player);
            }
        }

        Self {
            overall_runs: players
                .iter()
                .map(|p| p.profile.stats.total_runs as u64)
                .sum(),
            overall_wickets: players.iter().map(|p| p.profile.stats.wickets as u64).sum(),
            highest_run_scorer: highest_run_scorer.map(|p| TopRunScorer {
                id: p.id,
                name: p.profile.name.clone(),
                university: p.profile.university.clone(),
                total_runs: p.profile.stats.total_runs,
            }),
            highest_wicket_taker: highest_wicket_taker.map(|p| TopWicketTaker {
                id: p.id,
                name: p.profile.name.clone(),
                university: p.profile.university.clone(),
                wickets: p.profile.stats.wickets,
            }),
        }
    }
}

pub type ArcPlayerCatalogService = Arc<Box<dyn PlayerCatalogService + Send + Sync + 'static>>;

#[async_trait::async_trait]
pub trait PlayerCatalogService {
    async fn add_player(&self, profile: PlayerProfile) -> ServiceResult<Player>;
    async fn update_player(&self, id: PlayerId, profile: PlayerProfile) -> ServiceResult<Player>;
    async fn remove_player(&self, id: PlayerId) -> ServiceResult<()>;
    async fn get_player(&self, id: PlayerId) -> ServiceResult<Player>;
    async fn list_players(&self) -> ServiceResult<Vec<Player>>;
    async fn list_by_category(&self, category: Category) -> ServiceResult<Vec<Player>>;
    /// Returns the whole catalog after the import.
    async fn bulk_add(&self, profiles: Vec<PlayerProfile>) -> ServiceResult<Vec<Player>>;
    async fn tournament_summary(&self) -> ServiceResult<TournamentSummary>;
}

const PLAYER_CACHE_CAPACITY: u64 = 1000;

/// Bounds staleness from writers outside this process, such as `load_players`.
const PLAYER_CACHE_TTL: Duration = Duration::from_secs(30);

pub struct PlayerCatalogServiceImpl {
    player_repository: ArcPlayerRepository,
    roster_ledger: ArcRosterLedger,
    player_cache: Arc<moka::sync::Cache<PlayerId, Player>>,
}

impl PlayerCatalogServiceImpl {
    pub fn new(player_repository: ArcPlayerRepository, roster_ledger: ArcRosterLedger) -> Self {
        Self {
            player_repository,
            roster_ledger,
            player_cache: Arc::new(
                moka::sync::Cache::builder()
                    .max_capacity(PLAYER_CACHE_CAPACITY)
                    .time_to_live(PLAYER_CACHE_TTL)
                    .build(),
            ),
        }
    }
}

#[async_trait::async_trait]
impl PlayerCatalogService for PlayerCatalogServiceImpl {
    async fn add_player(&self, profile: PlayerProfile) -> ServiceResult<Player> {
        validate(&profile, "player")?;
        let valuation = valuate(&profile.stats);
        let id = self
            .player_repository
            .create_player(&profile, valuation)
            .await?;
        info!(
            "Created player {} ({}) with points {} and value {}",
            id, profile.name, valuation.points, valuation.value
        );
        Ok(Player {
            id,
            profile,
            valuation,
        })
    }

    async fn update_player(&self, id: PlayerId, profile: PlayerProfile) -> ServiceResult<Player> {
        validate(&profile, "player")?;
        let valuation = valuate(&profile.stats);
        self.player_repository
            .update_player(id, &profile, valuation)
            .await?;
        let player = Player {
            id,
            profile,
            valuation,
        };
        self.player_cache.insert(id, player.clone());
        info!(
            "Updated player {} ({}) to points {} and value {}",
            id,
            player.name(),
            valuation.points,
            valuation.value
        );

        self.roster_ledger.refresh_holders(id).await?;

        Ok(player)
    }

    async fn remove_player(&self, id: PlayerId) -> ServiceResult<()> {
        let eviction = self.roster_ledger.evict_player(id).await;
        self.player_cache.invalidate(&id);
        let eviction = eviction?;
        info!(
            "Deleted player {}, refunded {} to {} users",
            id,
            eviction.refund,
            eviction.holders.len()
        );
        Ok(())
    }

    async fn get_player(&self, id: PlayerId) -> ServiceResult<Player> {
        if let Some(player) = self.player_cache.get(&id) {
            return Ok(player);
        }
        match self.player_repository.get_player(id).await? {
            // a concurrent update has already stored the newer snapshot
            Some(player) => Ok(self
                .player_cache
                .entry(id)
                .or_insert(player)
                .into_value()),
            None => ServiceError::not_found("Player not found"),
        }
    }

    async fn list_players(&self) -> ServiceResult<Vec<Player>> {
        self.player_repository
            .get_players(PlayerFilter::default())
            .await
    }

    async fn list_by_category(&self, category: Category) -> ServiceResult<Vec<Player>> {
        self.player_repository
            .get_players(PlayerFilter {
                category: Some(category),
            })
            .await
    }

    async fn bulk_add(&self, profiles: Vec<PlayerProfile>) -> ServiceResult<Vec<Player>> {
        for (index, profile) in profiles.iter().enumerate() {
            validate(profile, &format!("player at index {}", index))?;
        }
        let players: Vec<(PlayerProfile, Valuation)> = profiles
            .into_iter()
            .map(|profile| {
                let valuation = valuate(&profile.stats);
                (profile, valuation)
            })
            .collect();
        if !players.is_empty() {
            let ids = self.player_repository.create_players(&players).await?;
            info!("Bulk imported {} players", ids.len());
        }
        self.list_players().await
    }

    async fn tournament_summary(&self) -> ServiceResult<TournamentSummary> {
        let players = self.list_players().await?;
        Ok(TournamentSummary::from_players(&players))
    }
}
