use std::sync::Arc;

use crate::{
    account::{AccountServiceImpl, ArcAccountService, ArcUserRepository},
    advisory::{AdvisoryServiceImpl, ArcAdvisoryService},
    catalog::{ArcPlayerCatalogService, ArcPlayerRepository, PlayerCatalogServiceImpl},
    chatbot::{ArcChatbotService, ChatbotServiceImpl},
    jwt::ArcJwtService,
    leaderboard::{ArcLeaderboardService, LeaderboardServiceImpl},
    roster::{ArcRosterLedger, ArcRosterRepository, RosterLedgerImpl},
};

#[derive(Clone)]
pub struct AppState {
    pub account_service: ArcAccountService,
    pub catalog_service: ArcPlayerCatalogService,
    pub roster_ledger: ArcRosterLedger,
    pub leaderboard_service: ArcLeaderboardService,
    pub advisory_service: ArcAdvisoryService,
    pub chatbot_service: ArcChatbotService,
    pub jwt_service: ArcJwtService,
}

pub fn construct_app(
    user_repository: ArcUserRepository,
    player_repository: ArcPlayerRepository,
    roster_repository: ArcRosterRepository,
    jwt_service: ArcJwtService,
    admin_secret: Option<String>,
) -> AppState {
    let account_service: ArcAccountService = Arc::new(Box::new(AccountServiceImpl::new(
        user_repository.clone(),
        jwt_service.clone(),
        admin_secret,
    )));

    let roster_ledger: ArcRosterLedger = Arc::new(Box::new(RosterLedgerImpl::new(
        user_repository.clone(),
        player_repository.clone(),
        roster_repository.clone(),
    )));

    let catalog_service: ArcPlayerCatalogService = Arc::new(Box::new(
        PlayerCatalogServiceImpl::new(player_repository.clone(), roster_ledger.clone()),
    ));

    let leaderboard_service: ArcLeaderboardService = Arc::new(Box::new(
        LeaderboardServiceImpl::new(user_repository, roster_repository),
    ));

    let advisory_service: ArcAdvisoryService =
        Arc::new(Box::new(AdvisoryServiceImpl::new(player_repository.clone())));

    let chatbot_service: ArcChatbotService = Arc::new(Box::new(ChatbotServiceImpl::new(
        player_repository,
        advisory_service.clone(),
    )));

    AppState {
        account_service,
        catalog_service,
        roster_ledger,
        leaderboard_service,
        advisory_service,
        chatbot_service,
        jwt_service,
    }
}
