use axum::{
    Router,
    routing::{delete, get, post},
};
use log::info;
use serde::Serialize;
use spirit11_server_domain::{app::AppState, util::Page};
use tower_http::cors::CorsLayer;

mod auth;
mod chatbot;
pub mod players;
mod team;

const DEFAULT_HOST: &str = "127.0.0.1";

const DEFAULT_PORT: u16 = 5000;

pub fn router(app: AppState) -> Router {
    let api: Router<AppState> = Router::new()
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/auth/create-admin", post(auth::create_admin))
        .route(
            "/players",
            get(players::get_all_players).post(players::create_player),
        )
        .route(
            "/players/{id}",
            get(players::get_player)
                .put(players::update_player)
                .delete(players::delete_player),
        )
        .route(
            "/players/category/{category}",
            get(players::get_players_by_category),
        )
        .route(
            "/players/admin/tournament-summary",
            get(players::get_tournament_summary),
        )
        .route("/players/admin/bulk-import", post(players::bulk_import))
        .route("/team", get(team::get_team))
        .route("/team/add/{player_id}", post(team::add_player))
        .route("/team/remove/{player_id}", delete(team::remove_player))
        .route("/team/status", get(team::get_status))
        .route("/team/budget", get(team::get_budget))
        .route("/team/leaderboard", get(team::get_leaderboard))
        .route("/chatbot/query", post(chatbot::query))
        .route("/chatbot/best-team", get(chatbot::best_team));

    Router::new()
        .nest("/api", api)
        .layer(CorsLayer::permissive())
        .with_state(app)
}

pub async fn run(
    app: AppState,
    shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
) {
    let host = std::env::var("SPIRIT11_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
    let port = match std::env::var("SPIRIT11_HTTP_PORT") {
        Ok(port) => port
            .parse::<u16>()
            .expect("SPIRIT11_HTTP_PORT must be a valid u16"),
        Err(_) => DEFAULT_PORT,
    };

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", host, port))
        .await
        .expect("Failed to bind HTTP listener");

    info!("API server listening on {}:{}", host, port);
    axum::serve(listener, router(app))
        .with_graceful_shutdown(shutdown_signal)
        .await
        .expect("HTTP server failed");

    info!("HTTP API shut down gracefully");
}

#[derive(Serialize, Debug)]
pub struct PaginatedResponse<T> {
    items: Vec<T>,
    total: usize,
    page: usize,
    per_page: usize,
    total_pages: usize,
    has_next: bool,
    has_prev: bool,
}

impl<T> PaginatedResponse<T> {
    fn from_page<U>(page: Page<U>, f: impl FnMut(U) -> T) -> Self {
        Self {
            items: page.items.into_iter().map(f).collect(),
            total: page.total,
            page: page.page,
            per_page: page.page_size,
            total_pages: page.total_pages,
            has_next: page.has_next,
            has_prev: page.has_prev,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct MessageResponse {
    message: String,
}

impl MessageResponse {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_util {
    use std::sync::Arc;

    use spirit11_core::{Category, PlayerStats};
    use spirit11_server_domain::{
        UserId,
        account::{NewUser, User, UserRepository},
        app::{AppState, construct_app},
        catalog::{Player, PlayerCatalogService, PlayerProfile},
        memory::InMemoryStore,
    };

    use crate::JwtServiceImpl;

    pub struct TestApp {
        pub app: AppState,
        pub store: InMemoryStore,
    }

    impl TestApp {
        pub fn new() -> Self {
            let store = InMemoryStore::new();
            let app = construct_app(
                Arc::new(Box::new(store.clone())),
                Arc::new(Box::new(store.clone())),
                Arc::new(Box::new(store.clone())),
                Arc::new(Box::new(JwtServiceImpl)),
                Some("admin-secret".to_string()),
            );
            Self { app, store }
        }

        pub async fn user(&self, username: &str, is_admin: bool) -> User {
            let id: UserId = self
                .store
                .create_user(&NewUser {
                    username: username.to_string(),
                    password_hash: String::new(),
                    is_admin,
                    university: Some("University of Colombo".to_string()),
                })
                .await
                .unwrap();
            self.store.get_user(id).await.unwrap().unwrap()
        }

        pub async fn player(&self, name: &str, total_runs: u32) -> Player {
            self.app
                .catalog_service
                .add_player(PlayerProfile {
                    name: name.to_string(),
                    university: "University of Colombo".to_string(),
                    category: Category::Batsman,
                    stats: PlayerStats {
                        total_runs,
                        balls_faced: 300,
                        innings_played: 12,
                        ..Default::default()
                    },
                })
                .await
                .unwrap()
        }
    }
}
