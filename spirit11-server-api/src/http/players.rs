use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use spirit11_core::{Category, Money, PlayerStats};
use spirit11_server_domain::{
    PlayerId, ServiceError, ServiceResult,
    account::User,
    app::AppState,
    catalog::{Player, PlayerCatalogService, PlayerProfile, TournamentSummary},
};

use crate::{
    AdminUser, ApiResult, CurrentUser,
    http::MessageResponse,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Privileged,
}

impl Visibility {
    pub fn of(user: &User) -> Self {
        if user.is_admin {
            Visibility::Privileged
        } else {
            Visibility::Public
        }
    }
}

/// Every player leaving the API goes through this projection; points are only
/// included for privileged callers.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: String,
    pub university: String,
    pub category: &'static str,
    pub total_runs: u32,
    pub balls_faced: u32,
    pub innings_played: u32,
    pub wickets: u32,
    pub overs_bowled: f64,
    pub runs_conceded: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_points: Option<f64>,
    pub player_value: Money,
}

impl PlayerView {
    pub fn project(player: Player, visibility: Visibility) -> Self {
        let stats = &player.profile.stats;
        Self {
            id: player.id,
            category: player.profile.category.as_str(),
            total_runs: stats.total_runs,
            balls_faced: stats.balls_faced,
            innings_played: stats.innings_played,
            wickets: stats.wickets,
            overs_bowled: stats.overs_bowled,
            runs_conceded: stats.runs_conceded,
            player_points: match visibility {
                Visibility::Privileged => Some(player.valuation.points),
                Visibility::Public => None,
            },
            player_value: player.valuation.value,
            name: player.profile.name,
            university: player.profile.university,
        }
    }

    pub fn project_all(players: Vec<Player>, visibility: Visibility) -> Vec<Self> {
        players
            .into_iter()
            .map(|p| Self::project(p, visibility))
            .collect()
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct PlayerInput {
    name: String,
    university: String,
    category: String,
    #[serde(default)]
    total_runs: u32,
    #[serde(default)]
    balls_faced: u32,
    #[serde(default)]
    innings_played: u32,
    #[serde(default)]
    wickets: u32,
    #[serde(default)]
    overs_bowled: f64,
    #[serde(default)]
    runs_conceded: u32,
}

impl PlayerInput {
    fn into_profile(self) -> ServiceResult<PlayerProfile> {
        let category = parse_category(&self.category)?;
        Ok(PlayerProfile {
            name: self.name,
            university: self.university,
            category,
            stats: PlayerStats {
                total_runs: self.total_runs,
                balls_faced: self.balls_faced,
                innings_played: self.innings_played,
                wickets: self.wickets,
                overs_bowled: self.overs_bowled,
                runs_conceded: self.runs_conceded,
            },
        })
    }
}

fn parse_category(category: &str) -> ServiceResult<Category> {
    category
        .parse()
        .map_err(|e: spirit11_core::UnknownCategory| ServiceError::BadRequest(e.to_string()))
}

pub async fn get_all_players(
    CurrentUser(user): CurrentUser,
    State(app): State<AppState>,
) -> ApiResult<Json<Vec<PlayerView>>> {
    let players = app.catalog_service.list_players().await?;
    Ok(Json(PlayerView::project_all(players, Visibility::of(&user))))
}

pub async fn get_player(
    CurrentUser(user): CurrentUser,
    State(app): State<AppState>,
    Path(id): Path<PlayerId>,
) -> ApiResult<Json<PlayerView>> {
    let player = app.catalog_service.get_player(id).await?;
    Ok(Json(PlayerView::project(player, Visibility::of(&user))))
}

pub async fn get_players_by_category(
    CurrentUser(user): CurrentUser,
    State(app): State<AppState>,
    Path(category): Path<String>,
) -> ApiResult<Json<Vec<PlayerView>>> {
    let category = parse_category(&category)?;
    let players = app.catalog_service.list_by_category(category).await?;
    Ok(Json(PlayerView::project_all(players, Visibility::of(&user))))
}

pub async fn create_player(
    AdminUser(_): AdminUser,
    State(app): State<AppState>,
    Json(input): Json<PlayerInput>,
) -> ApiResult<(StatusCode, Json<PlayerView>)> {
    let player = app
        .catalog_service
        .add_player(input.into_profile()?)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(PlayerView::project(player, Visibility::Privileged)),
    ))
}

pub async fn update_player(
    AdminUser(_): AdminUser,
    State(app): State<AppState>,
    Path(id): Path<PlayerId>,
    Json(input): Json<PlayerInput>,
) -> ApiResult<Json<PlayerView>> {
    let player = app
        .catalog_service
        .update_player(id, input.into_profile()?)
        .await?;
    Ok(Json(PlayerView::project(player, Visibility::Privileged)))
}

pub async fn delete_player(
    AdminUser(_): AdminUser,
    State(app): State<AppState>,
    Path(id): Path<PlayerId>,
) -> ApiResult<Json<MessageResponse>> {
    app.catalog_service.remove_player(id).await?;
    Ok(Json(MessageResponse::new("Player deleted successfully")))
}

#[derive(Serialize, Debug)]
pub struct JsonTopRunScorer {
    id: PlayerId,
    name: String,
    university: String,
    total_runs: u32,
}

#[derive(Serialize, Debug)]
pub struct JsonTopWicketTaker {
    id: PlayerId,
    name: String,
    university: String,
    wickets: u32,
}

#[derive(Serialize, Debug)]
pub struct JsonTournamentSummary {
    overall_runs: u64,
    overall_wickets: u64,
    highest_run_scorer: Option<JsonTopRunScorer>,
    highest_wicket_taker: Option<JsonTopWicketTaker>,
}

impl From<TournamentSummary> for JsonTournamentSummary {
    fn from(summary: TournamentSummary) -> Self {
        Self {
            overall_runs: summary.overall_runs,
            overall_wickets: summary.overall_wickets,
            highest_run_scorer: summary.highest_run_scorer.map(|p| JsonTopRunScorer {
                id: p.id,
                name: p.name,
                university: p.university,
                total_runs: p.total_runs,
            }),
            highest_wicket_taker: summary.highest_wicket_taker.map(|p| JsonTopWicketTaker {
                id: p.id,
                name: p.name,
                university: p.university,
                wickets: p.wickets,
            }),
        }
    }
}

pub async fn get_tournament_summary(
    AdminUser(_): AdminUser,
    State(app): State<AppState>,
) -> ApiResult<Json<JsonTournamentSummary>> {
    let summary = app.catalog_service.tournament_summary().await?;
    Ok(Json(summary.into()))
}

pub async fn bulk_import(
    AdminUser(_): AdminUser,
    State(app): State<AppState>,
    Json(body): Json<Value>,
) -> ApiResult<(StatusCode, Json<Vec<PlayerView>>)> {
    if !body.is_array() {
        return Err(ServiceError::BadRequest("Input must be an array of players".into()).into());
    }
    let inputs: Vec<PlayerInput> = serde_json::from_value(body)
        .map_err(|e| ServiceError::BadRequest(format!("Invalid player data: {}", e)))?;
    let profiles = inputs
        .into_iter()
        .map(PlayerInput::into_profile)
        .collect::<ServiceResult<Vec<_>>>()?;
    let players = app.catalog_service.bulk_add(profiles).await?;
    Ok((
        StatusCode::CREATED,
        Json(PlayerView::project_all(players, Visibility::Privileged)),
    ))
}
