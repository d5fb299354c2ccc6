//! Broadcastr server binary.

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use broadcastr::api::{AppState, create_router};
use broadcastr::crypto::hash_password;
use broadcastr::db::repository::{ConfigRepository, NewUser, UserRepository};
use broadcastr::db::{DbConfig, DbPool, run_migrations};
use broadcastr::lastfm::{API_KEY_CONFIG_KEY, LastFmClient, ListeningRefresher};

/// Social backend over music-listening statistics.
#[derive(Parser)]
#[command(name = "broadcastr")]
#[command(about = "Broadcastr social music backend")]
struct Cli {
    /// Database file path
    #[arg(short, long, default_value = "broadcastr.db")]
    database: String,

    /// Server port
    #[arg(short, long, default_value = "8000")]
    port: u16,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new user profile
    CreateUser {
        /// Last.fm profile name
        #[arg(short, long)]
        username: String,

        /// First name
        #[arg(long)]
        first_name: String,

        /// Last name
        #[arg(long)]
        last_name: String,

        /// Email address
        #[arg(short, long)]
        email: String,

        /// Password
        #[arg(short, long)]
        password: String,
    },

    /// Store a runtime configuration value (e.g. the Last.fm API key)
    SetConfig {
        /// Configuration key
        #[arg(short, long)]
        key: String,

        /// Configuration value
        #[arg(short, long)]
        value: String,
    },

    /// Refresh a user's listening data from the scrobbling API
    RefreshUser {
        /// Last.fm profile name
        #[arg(short, long)]
        username: String,
    },

    /// Start the server (default)
    Serve,
}

fn setup_database(database_url: &str) -> DbPool {
    let config = DbConfig::new(database_url);
    let pool = config.build_pool().expect("Failed to create database pool");

    let mut conn = pool.get().expect("Failed to get database connection");
    run_migrations(&mut conn).expect("Failed to run migrations");

    pool
}

fn create_user(
    pool: &DbPool,
    username: &str,
    first_name: &str,
    last_name: &str,
    email: &str,
    password: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let password_hash = hash_password(password)?;
    let repo = UserRepository::new(pool.clone());

    let new_user = NewUser::new(username, first_name, last_name, email, &password_hash, false);
    match repo.create(&new_user) {
        Ok(user) => {
            println!("Created user '{}' (id: {})", user.username, user.id);
            Ok(())
        }
        Err(e) => {
            eprintln!("Failed to create user: {}", e);
            Err(Box::new(e))
        }
    }
}

async fn refresh_user(pool: &DbPool, username: &str) {
    let users = UserRepository::new(pool.clone());
    let user = match users.find_by_username(username) {
        Ok(Some(user)) => user,
        Ok(None) => {
            eprintln!("User '{}' not found", username);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Database error: {}", e);
            std::process::exit(1);
        }
    };

    let config = ConfigRepository::new(pool.clone());
    let api_key = match config.get(API_KEY_CONFIG_KEY) {
        Ok(Some(key)) => key,
        Ok(None) => {
            eprintln!(
                "No API key configured. Set one with: broadcastr set-config --key {} --value <key>",
                API_KEY_CONFIG_KEY
            );
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Database error: {}", e);
            std::process::exit(1);
        }
    };

    let refresher = ListeningRefresher::new(LastFmClient::new(api_key), pool.clone());
    match refresher.refresh_user(user.id, &user.username).await {
        Ok(()) => println!("Refreshed listening data for '{}'", username),
        Err(e) => {
            eprintln!("Refresh failed: {}", e);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "broadcastr=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let pool = setup_database(&cli.database);

    match cli.command {
        Some(Commands::CreateUser {
            username,
            first_name,
            last_name,
            email,
            password,
        }) => {
            if create_user(&pool, &username, &first_name, &last_name, &email, &password).is_err() {
                std::process::exit(1);
            }
        }
        Some(Commands::SetConfig { key, value }) => {
            let repo = ConfigRepository::new(pool.clone());
            match repo.set(&key, &value) {
                Ok(()) => println!("Stored config key '{}'", key),
                Err(e) => {
                    eprintln!("Failed to store config: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Some(Commands::RefreshUser { username }) => {
            refresh_user(&pool, &username).await;
        }
        Some(Commands::Serve) | None => {
            run_server(pool, cli.port).await;
        }
    }
}

async fn run_server(pool: DbPool, port: u16) {
    let config = ConfigRepository::new(pool.clone());
    if config.get(API_KEY_CONFIG_KEY).ok().flatten().is_none() {
        tracing::warn!("No scrobbling API key configured. Listening refreshes will be skipped.");
        tracing::warn!(
            "  broadcastr set-config --key {} --value <key>",
            API_KEY_CONFIG_KEY
        );
    }

    let state = AppState::new(pool);
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind to {}: {}", addr, e);
            tracing::error!("Is another process already using port {}?", port);
            std::process::exit(1);
        }
    };
    tracing::info!(
        "Broadcastr server listening on {}",
        listener
            .local_addr()
            .expect("listener should have local addr")
    );

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
