use std::{fmt::Write, sync::Arc};

use spirit11_core::INITIAL_BUDGET;

use crate::{
    ServiceError, ServiceResult,
    advisory::{ArcAdvisoryService, TeamSuggestion},
    catalog::{ArcPlayerRepository, Player, PlayerFilter},
};

const TEAM_KEYWORDS: [&str; 4] = ["best team", "strongest team", "recommend team", "suggest team"];

pub const UNKNOWN_PLAYER_REPLY: &str = "Which player's stats would you like to know about?";

pub const POINTS_REFUSAL: &str =
    "I'm not allowed to reveal player points. I can help you with other information about players.";

pub const FALLBACK_REPLY: &str = "I don't have enough knowledge to answer that question.";

pub type ArcChatbotService = Arc<Box<dyn ChatbotService + Send + Sync + 'static>>;

#[async_trait::async_trait]
pub trait ChatbotService {
    async fn process_query(&self, query: &str) -> ServiceResult<String>;
}

pub struct ChatbotServiceImpl {
    player_repository: ArcPlayerRepository,
    advisory_service: ArcAdvisoryService,
}

impl ChatbotServiceImpl {
    pub fn new(player_repository: ArcPlayerRepository, advisory_service: ArcAdvisoryService) -> Self {
        Self {
            player_repository,
            advisory_service,
        }
    }
}

#[async_trait::async_trait]
impl ChatbotService for ChatbotServiceImpl {
    async fn process_query(&self, query: &str) -> ServiceResult<String> {
        if query.trim().is_empty() {
            return ServiceError::bad_request("Query is required");
        }
        let query = query.to_lowercase();

        if query.contains("stats") && (query.contains("player") || query.contains("stats for")) {
            let players = self
                .player_repository
                .get_players(PlayerFilter::default())
                .await?;
            return Ok(players
                .iter()
                .find(|p| query.contains(&p.name().to_lowercase()))
                .map(describe_stats)
                .unwrap_or_else(|| UNKNOWN_PLAYER_REPLY.to_string()));
        }

        if TEAM_KEYWORDS.iter().any(|k| query.contains(k)) {
            let suggestion = self.advisory_service.suggest_best_team().await?;
            return Ok(describe_suggestion(&suggestion));
        }

        if query.contains("points") || query.contains("score") {
            return Ok(POINTS_REFUSAL.to_string());
        }

        Ok(FALLBACK_REPLY.to_string())
    }
}

fn describe_stats(player: &Player) -> String {
    let stats = &player.profile.stats;
    format!(
        "Here are {}'s stats:\n\
         University: {}\n\
         Category: {}\n\
         Total Runs: {}\n\
         Balls Faced: {}\n\
         Innings Played: {}\n\
         Wickets: {}\n\
         Overs Bowled: {}\n\
         Runs Conceded: {}",
        player.name(),
        player.profile.university,
        player.profile.category,
        stats.total_runs,
        stats.balls_faced,
        stats.innings_played,
        stats.wickets,
        stats.overs_bowled,
        stats.runs_conceded,
    )
}

fn describe_suggestion(suggestion: &TeamSuggestion) -> String {
    let mut reply =
        String::from("Based on player statistics, here's the best team I can suggest:\n\n");
    for (index, player) in suggestion.players.iter().enumerate() {
        let _ = writeln!(
            reply,
            "{}. {} ({}) - {}",
            index + 1,
            player.name(),
            player.profile.university,
            player.profile.category
        );
    }
    if suggestion.exceeds_budget {
        let _ = write!(
            reply,
            "\nNote: This team exceeds the budget of Rs.{}. You may need to make adjustments.",
            INITIAL_BUDGET
        );
    }
    reply
}

#[cfg(test)]
mod tests {
    use spirit11_core::{Category, PlayerStats, valuate};

    use crate::{
        advisory::AdvisoryServiceImpl,
        catalog::{PlayerProfile, PlayerRepository},
        memory::InMemoryStore,
    };

    use super::*;

    async fn chatbot() -> ChatbotServiceImpl {
        let store = InMemoryStore::new();
        let profile = PlayerProfile {
            name: "Chamika Chandimal".to_string(),
            university: "University of the Visual & Performing Arts".to_string(),
            category: Category::AllRounder,
            stats: PlayerStats {
                total_runs: 530,
                balls_faced: 588,
                innings_played: 10,
                wickets: 1,
                overs_bowled: 10.0,
                runs_conceded: 72,
            },
        };
        store
            .create_player(&profile, valuate(&profile.stats))
            .await
            .unwrap();
        let players: ArcPlayerRepository = Arc::new(Box::new(store));
        ChatbotServiceImpl::new(
            players.clone(),
            Arc::new(Box::new(AdvisoryServiceImpl::new(players))),
        )
    }

    #[tokio::test]
    async fn test_player_stats() {
        let bot = chatbot().await;
        let reply = bot
            .process_query("Show me the stats for Chamika Chandimal")
            .await
            .unwrap();
        assert!(reply.starts_with("Here are Chamika Chandimal's stats:"));
        assert!(reply.contains("Total Runs: 530"));
        assert!(!reply.to_lowercase().contains("points"));

        let reply = bot
            .process_query("player stats for someone else")
            .await
            .unwrap();
        assert_eq!(reply, UNKNOWN_PLAYER_REPLY);
    }

    #[tokio::test]
    async fn test_best_team() {
        let bot = chatbot().await;
        let reply = bot.process_query("Suggest team please").await.unwrap();
        assert!(reply.contains("1. Chamika Chandimal"));
        assert!(!reply.contains("exceeds the budget"));
    }

    #[tokio::test]
    async fn test_points_refused_and_fallback() {
        let bot = chatbot().await;
        assert_eq!(
            bot.process_query("What is his score?").await.unwrap(),
            POINTS_REFUSAL
        );
        assert_eq!(
            bot.process_query("Who won the toss?").await.unwrap(),
            FALLBACK_REPLY
        );
        assert!(matches!(
            bot.process_query("   ").await,
            Err(ServiceError::BadRequest(_))
        ));
    }
}
