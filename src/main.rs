use clap::{Parser, Subcommand};

mod accounts;
mod app;
mod config;
mod error;
mod extract;
mod labels;
mod recipes;
mod state;
mod storage;

use crate::accounts::services::{create_superuser, NewAccount};
use crate::config::AppConfig;
use crate::state::AppState;

#[derive(Parser)]
#[command(name = "recipebox", version, about = "Recipe management API server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Create an account with staff and superuser flags set
    CreateSuperuser {
        #[arg(long, env = "SUPERUSER_EMAIL")]
        email: String,
        #[arg(long, env = "SUPERUSER_PASSWORD")]
        password: String,
        #[arg(long, default_value = "")]
        name: String,
    },
}

fn init_tracing() {
    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "recipebox=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let app_state = AppState::init().await?;
            sqlx::migrate!("./migrations").run(&app_state.db).await?;
            app::serve(app::build_app(app_state)).await
        }
        Command::CreateSuperuser {
            email,
            password,
            name,
        } => {
            let config = AppConfig::from_env()?;
            let db = AppState::connect_db(&config).await?;
            sqlx::migrate!("./migrations").run(&db).await?;
            let new = NewAccount {
                email,
                password,
                name,
            };
            let user = create_superuser(&db, &new)
                .await
                .map_err(|e| anyhow::anyhow!("create superuser: {e}"))?;
            tracing::info!(user_id = %user.id, email = %user.email, "superuser created");
            Ok(())
        }
    }
}
