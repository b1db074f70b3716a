use std::sync::Arc;

use crate::{
    ServiceResult, UserId,
    account::{ArcUserRepository, User},
    roster::ArcRosterRepository,
    util::{Page, Pagination, paginate},
};
use spirit11_core::SQUAD_SIZE;

#[derive(Clone, Debug, Default)]
pub struct LeaderboardFilter {
    /// Case-insensitive substring match.
    pub username: Option<String>,
    /// Case-insensitive exact match.
    pub university: Option<String>,
    pub complete_only: bool,
}

#[derive(Clone, Debug, Default)]
pub struct LeaderboardQuery {
    pub filter: LeaderboardFilter,
    pub pagination: Pagination,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LeaderboardEntry {
    pub user_id: UserId,
    pub username: String,
    pub university: Option<String>,
    pub team_points: f64,
    pub rank: usize,
    pub is_current_user: bool,
}

pub type ArcLeaderboardService = Arc<Box<dyn LeaderboardService + Send + Sync + 'static>>;

#[async_trait::async_trait]
pub trait LeaderboardService {
    async fn get_leaderboard(
        &self,
        query: LeaderboardQuery,
        current_user: Option<UserId>,
    ) -> ServiceResult<Page<LeaderboardEntry>>;
}

pub struct LeaderboardServiceImpl {
    user_repository: ArcUserRepository,
    roster_repository: ArcRosterRepository,
}

impl LeaderboardServiceImpl {
    pub fn new(user_repository: ArcUserRepository, roster_repository: ArcRosterRepository) -> Self {
        Self {
            user_repository,
            roster_repository,
        }
    }

    fn matches(filter: &LeaderboardFilter, user: &User) -> bool {
        if let Some(username) = filter.username.as_deref().filter(|u| !u.is_empty()) {
            if !user
                .username
                .to_lowercase()
                .contains(&username.to_lowercase())
            {
                return false;
            }
        }
        if let Some(university) = filter.university.as_deref().filter(|u| !u.is_empty()) {
            let matches = user
                .university
                .as_deref()
                .is_some_and(|u| u.eq_ignore_ascii_case(university));
            if !matches {
                return false;
            }
        }
        true
    }
}

#[async_trait::async_trait]
impl LeaderboardService for LeaderboardServiceImpl {
    async fn get_leaderboard(
        &self,
        query: LeaderboardQuery,
        current_user: Option<UserId>,
    ) -> ServiceResult<Page<LeaderboardEntry>> {
        let mut users: Vec<User> = self
            .user_repository
            .get_users()
            .await?
            .into_iter()
            .filter(|u| Self::matches(&query.filter, u))
            .collect();

        if query.filter.complete_only {
            let mut complete = Vec::with_capacity(users.len());
            for user in users {
                if self.roster_repository.get_roster(user.id).await?.len() == SQUAD_SIZE {
                    complete.push(user);
                }
            }
            users = complete;
        }

        // users arrive ordered by id and the sort is stable, so ties keep id order
        users.sort_by(|a, b| b.team_points.total_cmp(&a.team_points));

        let entries = users
            .into_iter()
            .enumerate()
            .map(|(index, user)| LeaderboardEntry {
                is_current_user: current_user == Some(user.id),
                user_id: user.id,
                username: user.username,
                university: user.university,
                team_points: user.team_points,
                rank: index + 1,
            })
            .collect();

        Ok(paginate(entries, query.pagination))
    }
}

#[cfg(test)]
mod tests {
    use spirit11_core::{Category, PlayerStats, valuate};

    use crate::{
        account::{NewUser, UserRepository},
        catalog::{PlayerProfile, PlayerRepository},
        memory::InMemoryStore,
        roster::{RosterLedger, RosterLedgerImpl},
    };

    use super::*;

    async fn user(store: &InMemoryStore, username: &str, university: &str) -> UserId {
        store
            .create_user(&NewUser {
                username: username.to_string(),
                password_hash: String::new(),
                is_admin: false,
                university: Some(university.to_string()),
            })
            .await
            .unwrap()
    }

    /// Gives the user a complete squad of batters with `runs` runs each.
    async fn complete_squad(store: &InMemoryStore, ledger: &RosterLedgerImpl, user_id: UserId, runs: u32) {
        for i in 0..SQUAD_SIZE {
            let profile = PlayerProfile {
                name: format!("Batter {} {}", user_id, i),
                university: "University of Ruhuna".to_string(),
                category: Category::Batsman,
                stats: PlayerStats {
                    total_runs: runs,
                    balls_faced: 100,
                    innings_played: 5,
                    ..Default::default()
                },
            };
            let id = store
                .create_player(&profile, valuate(&profile.stats))
                .await
                .unwrap();
            ledger.add_player(user_id, id).await.unwrap();
        }
    }

    fn setup(store: &InMemoryStore) -> (RosterLedgerImpl, LeaderboardServiceImpl) {
        (
            RosterLedgerImpl::new(
                Arc::new(Box::new(store.clone())),
                Arc::new(Box::new(store.clone())),
                Arc::new(Box::new(store.clone())),
            ),
            LeaderboardServiceImpl::new(
                Arc::new(Box::new(store.clone())),
                Arc::new(Box::new(store.clone())),
            ),
        )
    }

    #[tokio::test]
    async fn test_ranking_and_ties() {
        let store = InMemoryStore::new();
        let (ledger, leaderboard) = setup(&store);
        let low = user(&store, "low_scorer", "UCSC").await;
        let tie_a = user(&store, "tie_scorer_a", "UCSC").await;
        let tie_b = user(&store, "tie_scorer_b", "SLIIT").await;
        let idle = user(&store, "idle_player", "SLIIT").await;
        complete_squad(&store, &ledger, low, 50).await;
        complete_squad(&store, &ledger, tie_b, 100).await;
        complete_squad(&store, &ledger, tie_a, 100).await;

        let page = leaderboard
            .get_leaderboard(LeaderboardQuery::default(), Some(tie_b))
            .await
            .unwrap();
        let order: Vec<UserId> = page.items.iter().map(|e| e.user_id).collect();
        assert_eq!(order, vec![tie_a, tie_b, low, idle]);
        assert_eq!(
            page.items.iter().map(|e| e.rank).collect::<Vec<_>>(),
            vec![1, 2, 3, 4]
        );
        assert!(page.items[1].is_current_user);
        assert!(!page.items[0].is_current_user);
        assert!(
            page.items
                .windows(2)
                .all(|w| w[0].team_points >= w[1].team_points)
        );
        assert_eq!(page.items[3].team_points, 0.0);
    }

    #[tokio::test]
    async fn test_filters_apply_before_ranking() {
        let store = InMemoryStore::new();
        let (ledger, leaderboard) = setup(&store);
        let first = user(&store, "first_place", "UCSC").await;
        let second = user(&store, "second_place", "SLIIT").await;
        let _idle = user(&store, "idle_player", "sliit").await;
        complete_squad(&store, &ledger, first, 200).await;
        complete_squad(&store, &ledger, second, 100).await;

        let query = LeaderboardQuery {
            filter: LeaderboardFilter {
                university: Some("sliit".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let page = leaderboard.get_leaderboard(query, None).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].user_id, second);
        assert_eq!(page.items[0].rank, 1);

        let query = LeaderboardQuery {
            filter: LeaderboardFilter {
                username: Some("PLACE".into()),
                complete_only: true,
                ..Default::default()
            },
            ..Default::default()
        };
        let page = leaderboard.get_leaderboard(query, None).await.unwrap();
        assert_eq!(page.total, 2);

        let query = LeaderboardQuery {
            filter: LeaderboardFilter {
                complete_only: true,
                ..Default::default()
            },
            pagination: Pagination::new(Some(2), Some(1)),
        };
        let page = leaderboard.get_leaderboard(query, None).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].user_id, second);
        assert_eq!(page.items[0].rank, 2);
        assert!(page.has_prev);
        assert!(!page.has_next);
    }
}
