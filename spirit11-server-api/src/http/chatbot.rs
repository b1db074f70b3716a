use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use spirit11_core::Money;
use spirit11_server_domain::{advisory::AdvisoryService, app::AppState, chatbot::ChatbotService};

use crate::{
    ApiResult, CurrentUser,
    http::players::{PlayerView, Visibility},
};

#[derive(Deserialize, Debug)]
pub struct JsonQuery {
    #[serde(default)]
    query: String,
}

#[derive(Serialize, Debug)]
pub struct JsonReply {
    response: String,
}

pub async fn query(
    CurrentUser(_): CurrentUser,
    State(app): State<AppState>,
    Json(body): Json<JsonQuery>,
) -> ApiResult<Json<JsonReply>> {
    let response = app.chatbot_service.process_query(&body.query).await?;
    Ok(Json(JsonReply { response }))
}

#[derive(Serialize, Debug)]
pub struct JsonBestTeam {
    message: &'static str,
    team: Vec<PlayerView>,
    total_value: Money,
    exceeds_budget: bool,
}

pub async fn best_team(
    CurrentUser(_): CurrentUser,
    State(app): State<AppState>,
) -> ApiResult<Json<JsonBestTeam>> {
    let suggestion = app.advisory_service.suggest_best_team().await?;
    Ok(Json(JsonBestTeam {
        message: "Here's the best team based on player statistics:",
        team: PlayerView::project_all(suggestion.players, Visibility::Public),
        total_value: suggestion.total_value,
        exceeds_budget: suggestion.exceeds_budget,
    }))
}
