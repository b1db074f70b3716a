use serde::Deserialize;
use spirit11_core::{PlayerStats, Valuation, valuate};
use spirit11_persistence_sqlite::{create_db_pool, replace_catalog};
use spirit11_server_domain::{catalog::PlayerProfile, util::validate};

#[derive(Deserialize)]
struct PlayerRecord {
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

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: load_players <players.json>");
        std::process::exit(1);
    }

    let content = std::fs::read_to_string(&args[1]).expect("Failed to read player file");
    let records: Vec<PlayerRecord> =
        serde_json::from_str(&content).expect("Player file must be a JSON array of players");

    let players: Vec<(PlayerProfile, Valuation)> = records
        .into_iter()
        .map(|record| {
            let profile = PlayerProfile {
                category: record
                    .category
                    .parse()
                    .unwrap_or_else(|e| panic!("Player {}: {}", record.name, e)),
                stats: PlayerStats {
                    total_runs: record.total_runs,
                    balls_faced: record.balls_faced,
                    innings_played: record.innings_played,
                    wickets: record.wickets,
                    overs_bowled: record.overs_bowled,
                    runs_conceded: record.runs_conceded,
                },
                name: record.name,
                university: record.university,
            };
            validate(&profile, &profile.name).unwrap_or_else(|e| panic!("{}", e));
            let valuation = valuate(&profile.stats);
            (profile, valuation)
        })
        .collect();

    let pool = create_db_pool();
    let ids = replace_catalog(&pool, &players)
        .await
        .expect("Failed to replace players and reset teams");

    println!("Loaded {} players", ids.len());
}
