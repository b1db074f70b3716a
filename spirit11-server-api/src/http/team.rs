use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use spirit11_core::Money;
use spirit11_server_domain::{
    PlayerId, UserId,
    app::AppState,
    leaderboard::{LeaderboardFilter, LeaderboardQuery, LeaderboardService},
    roster::{RosterLedger, RosterStatus},
    util::Pagination,
};

use crate::{
    ApiResult, CurrentUser,
    http::{
        PaginatedResponse,
        players::{PlayerView, Visibility},
    },
};

#[derive(Serialize, Debug)]
pub struct JsonTeam {
    team: Vec<PlayerView>,
    team_count: usize,
    team_complete: bool,
    budget: Money,
    team_points: f64,
}

pub async fn get_team(
    CurrentUser(user): CurrentUser,
    State(app): State<AppState>,
) -> ApiResult<Json<JsonTeam>> {
    let team = app.roster_ledger.get_team(user.id).await?;
    Ok(Json(JsonTeam {
        team: PlayerView::project_all(team.players, Visibility::Public),
        team_count: team.status.count,
        team_complete: team.status.is_complete,
        budget: team.status.budget,
        team_points: team.status.team_points,
    }))
}

#[derive(Serialize, Debug)]
pub struct JsonRosterChange {
    success: bool,
    message: &'static str,
    team_count: usize,
    is_complete: bool,
    budget: Money,
    team_points: f64,
}

impl JsonRosterChange {
    fn new(message: &'static str, status: RosterStatus) -> Self {
        Self {
            success: true,
            message,
            team_count: status.count,
            is_complete: status.is_complete,
            budget: status.budget,
            team_points: status.team_points,
        }
    }
}

pub async fn add_player(
    CurrentUser(user): CurrentUser,
    State(app): State<AppState>,
    Path(player_id): Path<PlayerId>,
) -> ApiResult<Json<JsonRosterChange>> {
    let status = app.roster_ledger.add_player(user.id, player_id).await?;
    Ok(Json(JsonRosterChange::new("Player added to team", status)))
}

pub async fn remove_player(
    CurrentUser(user): CurrentUser,
    State(app): State<AppState>,
    Path(player_id): Path<PlayerId>,
) -> ApiResult<Json<JsonRosterChange>> {
    let status = app.roster_ledger.remove_player(user.id, player_id).await?;
    Ok(Json(JsonRosterChange::new("Player removed from team", status)))
}

#[derive(Serialize, Debug)]
pub struct JsonTeamStatus {
    team_count: usize,
    is_complete: bool,
    status: String,
}

pub async fn get_status(
    CurrentUser(user): CurrentUser,
    State(app): State<AppState>,
) -> ApiResult<Json<JsonTeamStatus>> {
    let status = app.roster_ledger.get_status(user.id).await?;
    Ok(Json(JsonTeamStatus {
        status: status.summary(),
        team_count: status.count,
        is_complete: status.is_complete,
    }))
}

#[derive(Serialize, Debug)]
pub struct JsonPlayerSpending {
    id: PlayerId,
    name: String,
    value: Money,
}

#[derive(Serialize, Debug)]
pub struct JsonBudget {
    available_budget: Money,
    total_spent: Money,
    initial_budget: Money,
    player_spending: Vec<JsonPlayerSpending>,
}

pub async fn get_budget(
    CurrentUser(user): CurrentUser,
    State(app): State<AppState>,
) -> ApiResult<Json<JsonBudget>> {
    let breakdown = app.roster_ledger.budget_breakdown(user.id).await?;
    Ok(Json(JsonBudget {
        available_budget: breakdown.available_budget,
        total_spent: breakdown.total_spent,
        initial_budget: breakdown.initial_budget,
        player_spending: breakdown
            .player_spending
            .into_iter()
            .map(|p| JsonPlayerSpending {
                id: p.id,
                name: p.name,
                value: p.value,
            })
            .collect(),
    }))
}

#[derive(Deserialize, Debug, Default)]
pub struct JsonLeaderboardQuery {
    page: Option<usize>,
    page_size: Option<usize>,
    username: Option<String>,
    university: Option<String>,
    #[serde(default)]
    complete_only: bool,
}

#[derive(Serialize, Debug)]
pub struct JsonLeaderboardEntry {
    id: UserId,
    username: String,
    university: Option<String>,
    team_points: f64,
    rank: usize,
    is_current_user: bool,
}

pub async fn get_leaderboard(
    CurrentUser(user): CurrentUser,
    State(app): State<AppState>,
    Query(query): Query<JsonLeaderboardQuery>,
) -> ApiResult<Json<PaginatedResponse<JsonLeaderboardEntry>>> {
    let query = LeaderboardQuery {
        filter: LeaderboardFilter {
            username: query.username,
            university: query.university,
            complete_only: query.complete_only,
        },
        pagination: Pagination::new(query.page, query.page_size),
    };
    let page = app
        .leaderboard_service
        .get_leaderboard(query, Some(user.id))
        .await?;
    Ok(Json(PaginatedResponse::from_page(page, |entry| {
        JsonLeaderboardEntry {
            id: entry.user_id,
            username: entry.username,
            university: entry.university,
            team_points: entry.team_points,
            rank: entry.rank,
            is_current_user: entry.is_current_user,
        }
    })))
}
