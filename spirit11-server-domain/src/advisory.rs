use std::sync::Arc;

use spirit11_core::{INITIAL_BUDGET, Money, SQUAD_SIZE};

use crate::{
    ServiceResult,
    catalog::{ArcPlayerRepository, Player, PlayerFilter},
};

#[derive(Clone, Debug)]
pub struct TeamSuggestion {
    /// Ordered by points, highest first.
    pub players: Vec<Player>,
    pub total_value: Money,
    pub exceeds_budget: bool,
}

impl TeamSuggestion {
    /// Picks the top players by points. Ties keep catalog order. The budget is
    /// only reported, never enforced.
    pub fn from_catalog(mut players: Vec<Player>) -> Self {
        players.sort_by(|a, b| b.points().total_cmp(&a.points()));
        players.truncate(SQUAD_SIZE);
        let total_value = players.iter().map(Player::value).sum();
        Self {
            players,
            total_value,
            exceeds_budget: total_value > INITIAL_BUDGET,
        }
    }
}

pub type ArcAdvisoryService = Arc<Box<dyn AdvisoryService + Send + Sync + 'static>>;

#[async_trait::async_trait]
pub trait AdvisoryService {
    async fn suggest_best_team(&self) -> ServiceResult<TeamSuggestion>;
}

pub struct AdvisoryServiceImpl {
    player_repository: ArcPlayerRepository,
}

impl AdvisoryServiceImpl {
    pub fn new(player_repository: ArcPlayerRepository) -> Self {
        Self { player_repository }
    }
}

#[async_trait::async_trait]
impl AdvisoryService for AdvisoryServiceImpl {
    async fn suggest_best_team(&self) -> ServiceResult<TeamSuggestion> {
        let players = self
            .player_repository
            .get_players(PlayerFilter::default())
            .await?;
        Ok(TeamSuggestion::from_catalog(players))
    }
}

#[cfg(test)]
mod tests {
    use spirit11_core::{Category, PlayerStats};

    use crate::catalog::PlayerProfile;

    use super::*;

    fn player(id: i64, total_runs: u32) -> Player {
        Player::new(
            id,
            PlayerProfile {
                name: format!("Player {}", id),
                university: "NSBM".to_string(),
                category: Category::Batsman,
                stats: PlayerStats {
                    total_runs,
                    balls_faced: 100,
                    innings_played: 1,
                    ..Default::default()
                },
            },
        )
    }

    #[test]
    fn test_picks_top_eleven_with_stable_ties() {
        let mut players: Vec<Player> = (1..=15).map(|id| player(id, 10)).collect();
        players[13] = player(14, 50);
        let suggestion = TeamSuggestion::from_catalog(players);

        assert_eq!(suggestion.players.len(), SQUAD_SIZE);
        assert_eq!(suggestion.players[0].id, 14);
        assert_eq!(
            suggestion.players[1..].iter().map(|p| p.id).collect::<Vec<_>>(),
            (1..=10).collect::<Vec<_>>()
        );
        assert!(
            suggestion
                .players
                .windows(2)
                .all(|w| w[0].points() >= w[1].points())
        );
    }

    #[test]
    fn test_budget_is_reported_not_enforced() {
        let cheap = TeamSuggestion::from_catalog((1..=11).map(|id| player(id, 0)).collect());
        assert_eq!(cheap.total_value, 11 * 100_000);
        assert!(!cheap.exceeds_budget);

        // 1000 runs in one innings off 100 balls is worth several million each
        let stars = TeamSuggestion::from_catalog((1..=11).map(|id| player(id, 1000)).collect());
        assert_eq!(stars.players.len(), SQUAD_SIZE);
        assert!(stars.exceeds_budget);
    }

    #[test]
    fn test_small_catalog() {
        let suggestion = TeamSuggestion::from_catalog((1..=3).map(|id| player(id, 5)).collect());
        assert_eq!(suggestion.players.len(), 3);
    }
}
