use std::sync::Arc;

use log::{info, warn};
use spirit11_persistence_sqlite::{
    SqlitePlayerRepository, SqliteRosterRepository, SqliteUserRepository, create_db_pool,
};
use spirit11_server_api::JwtServiceImpl;
use spirit11_server_domain::{
    account::ArcUserRepository, app::construct_app, catalog::ArcPlayerRepository,
    roster::ArcRosterRepository,
};

mod logs;

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received. Preparing graceful exit...");
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    logs::init_logger();

    let pool = create_db_pool();
    let user_repo: ArcUserRepository = Arc::new(Box::new(SqliteUserRepository::new(pool.clone())));
    let player_repo: ArcPlayerRepository =
        Arc::new(Box::new(SqlitePlayerRepository::new(pool.clone())));
    let roster_repo: ArcRosterRepository = Arc::new(Box::new(SqliteRosterRepository::new(pool)));

    let admin_secret = std::env::var("SPIRIT11_ADMIN_SECRET")
        .ok()
        .filter(|s| !s.is_empty());
    if admin_secret.is_none() {
        warn!("SPIRIT11_ADMIN_SECRET not set, admin creation over HTTP is disabled");
    }

    let app = construct_app(
        user_repo,
        player_repo,
        roster_repo,
        Arc::new(Box::new(JwtServiceImpl)),
        admin_secret,
    );

    info!("Starting application");

    spirit11_server_api::http::run(app, shutdown_signal()).await;
}
