use spirit11_persistence_sqlite::{SqliteUserRepository, create_db_pool};
use spirit11_server_domain::account::{NewUser, UserRepository};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 && args.len() != 4 {
        eprintln!("Usage: add_user <username> <password> [admin]");
        std::process::exit(1);
    }

    let username = &args[1];
    let password = &args[2];
    let is_admin = args.get(3).is_some_and(|role| role == "admin");

    let repo = SqliteUserRepository::new(create_db_pool());

    if repo
        .get_user_by_username(username)
        .await
        .expect("Failed to query for existing user")
        .is_some()
    {
        panic!("User with name [{}] already exists", username);
    }

    let password_hash =
        bcrypt::hash(password, bcrypt::DEFAULT_COST).expect("Failed to hash password");

    let id = repo
        .create_user(&NewUser {
            username: username.clone(),
            password_hash,
            is_admin,
            university: None,
        })
        .await
        .expect("Failed to insert new user");

    println!(
        "Created {} [{}] with id {}",
        if is_admin { "admin" } else { "user" },
        username,
        id
    );
}
