use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard},
};

use spirit11_core::Valuation;

use crate::{
    PlayerId, ServiceError, ServiceResult, UserId,
    account::{NewUser, User, UserRepository, initial_user},
    catalog::{Eviction, Player, PlayerFilter, PlayerProfile, PlayerRepository},
    roster::{RosterChange, RosterCommit, RosterRepository},
};

#[derive(Default)]
struct MemoryState {
    users: BTreeMap<UserId, User>,
    players: BTreeMap<PlayerId, Player>,
    roster_entries: Vec<(UserId, PlayerId)>,
    next_user_id: UserId,
    next_player_id: PlayerId,
}

impl MemoryState {
    fn insert_player(&mut self, profile: &PlayerProfile, valuation: Valuation) -> PlayerId {
        self.next_player_id += 1;
        let id = self.next_player_id;
        self.players.insert(
            id,
            Player {
                id,
                profile: profile.clone(),
                valuation,
            },
        );
        id
    }
}

/// Implements every repository over one shared state guarded by a single
/// mutex, so each call is atomic. Clones share the same state.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    #[cfg(test)]
    pub(crate) fn add_test_user(&self, username: &str) -> UserId {
        let mut state = self.state();
        state.next_user_id += 1;
        let id = state.next_user_id;
        let user = NewUser {
            username: username.to_string(),
            password_hash: String::new(),
            is_admin: false,
            university: None,
        };
        state.users.insert(id, initial_user(id, &user));
        id
    }

    #[cfg(test)]
    pub(crate) fn test_user(&self, id: UserId) -> User {
        self.state().users.get(&id).cloned().expect("user exists")
    }
}

#[async_trait::async_trait]
impl UserRepository for InMemoryStore {
    async fn create_user(&self, user: &NewUser) -> ServiceResult<UserId> {
        let mut state = self.state();
        if state.users.values().any(|u| u.username == user.username) {
            return ServiceError::not_possible("Username already exists");
        }
        state.next_user_id += 1;
        let id = state.next_user_id;
        state.users.insert(id, initial_user(id, user));
        Ok(id)
    }

    async fn get_user(&self, id: UserId) -> ServiceResult<Option<User>> {
        Ok(self.state().users.get(&id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> ServiceResult<Option<User>> {
        Ok(self
            .state()
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn get_users(&self) -> ServiceResult<Vec<User>> {
        Ok(self.state().users.values().cloned().collect())
    }
}

#[async_trait::async_trait]
impl PlayerRepository for InMemoryStore {
    async fn get_player(&self, id: PlayerId) -> ServiceResult<Option<Player>> {
        Ok(self.state().players.get(&id).cloned())
    }

    async fn get_players(&self, filter: PlayerFilter) -> ServiceResult<Vec<Player>> {
        Ok(self
            .state()
            .players
            .values()
            .filter(|p| filter.category.is_none_or(|c| p.profile.category == c))
            .cloned()
            .collect())
    }

    async fn create_player(
        &self,
        profile: &PlayerProfile,
        valuation: Valuation,
    ) -> ServiceResult<PlayerId> {
        Ok(self.state().insert_player(profile, valuation))
    }

    async fn create_players(
        &self,
        players: &[(PlayerProfile, Valuation)],
    ) -> ServiceResult<Vec<PlayerId>> {
        let mut state = self.state();
        Ok(players
            .iter()
            .map(|(profile, valuation)| state.insert_player(profile, *valuation))
            .collect())
    }

    async fn update_player(
        &self,
        id: PlayerId,
        profile: &PlayerProfile,
        valuation: Valuation,
    ) -> ServiceResult<()> {
        let mut state = self.state();
        let Some(player) = state.players.get_mut(&id) else {
            return ServiceError::not_found("Player not found");
        };
        player.profile = profile.clone();
        player.valuation = valuation;
        Ok(())
    }

    async fn delete_player(&self, id: PlayerId) -> ServiceResult<Eviction> {
        let mut state = self.state();
        let Some(player) = state.players.remove(&id) else {
            return ServiceError::not_found("Player not found");
        };
        let refund = player.value();
        let mut affected = Vec::new();
        state.roster_entries.retain(|&(user_id, player_id)| {
            if player_id == id {
                affected.push(user_id);
                false
            } else {
                true
            }
        });
        for user_id in &affected {
            if let Some(user) = state.users.get_mut(user_id) {
                user.budget += refund;
                user.team_points = 0.0;
            }
        }
        affected.sort_unstable();
        Ok(Eviction {
            holders: affected,
            refund,
        })
    }
}

#[async_trait::async_trait]
impl RosterRepository for InMemoryStore {
    async fn get_roster(&self, user_id: UserId) -> ServiceResult<Vec<PlayerId>> {
        Ok(self
            .state()
            .roster_entries
            .iter()
            .filter(|(u, _)| *u == user_id)
            .map(|(_, p)| *p)
            .collect())
    }

    async fn get_holders(&self, player_id: PlayerId) -> ServiceResult<Vec<UserId>> {
        let mut holders: Vec<UserId> = self
            .state()
            .roster_entries
            .iter()
            .filter(|(_, p)| *p == player_id)
            .map(|(u, _)| *u)
            .collect();
        holders.sort_unstable();
        Ok(holders)
    }

    async fn commit(&self, commit: &RosterCommit) -> ServiceResult<()> {
        let mut state = self.state();
        let user_id = commit.user_id;
        if !state.users.contains_key(&user_id) {
            return ServiceError::not_found("User not found");
        }
        match commit.change {
            RosterChange::Insert(player_id) => {
                if !state.players.contains_key(&player_id) {
                    return ServiceError::not_found("Player not found");
                }
                if state.roster_entries.contains(&(user_id, player_id)) {
                    return ServiceError::not_possible("Player already in team");
                }
                state.roster_entries.push((user_id, player_id));
            }
            RosterChange::Delete(player_id) => {
                let Some(index) = state
                    .roster_entries
                    .iter()
                    .position(|&entry| entry == (user_id, player_id))
                else {
                    return ServiceError::not_possible("Player not in team");
                };
                state.roster_entries.remove(index);
            }
            RosterChange::Recalculate => {}
        }
        if let Some(user) = state.users.get_mut(&user_id) {
            user.budget += commit.budget_delta;
            user.team_points = commit.team_points;
        }
        Ok(())
    }
}
