use anyhow::Result;
use bulus::brain::OpenAiBrain;
use bulus::config::Config;
use bulus::engine;
use bulus::runner::ConsoleEffects;
use bulus::storage::{FileSessionRepository, SessionRepository};
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "bulus", about = "Status-driven conversational data-collection agent")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Drive one session interactively against the OpenAI-backed brain
    Run {
        /// Session id (one JSON document per id)
        #[arg(long, default_value = "demo_session")]
        session: String,
    },
    /// Run the deterministic multi-session demo (no API calls)
    Simulate {
        #[arg(long, default_value_t = 5)]
        cycles: usize,
    },
    /// List known session ids and their status
    Sessions,
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let config = Config::load_or_init()?;
    let repo = FileSessionRepository::new(config.sessions_dir());

    match Cli::parse().command {
        Command::Run { session } => {
            let api_key = config.resolve_api_key();
            let brain = OpenAiBrain::new(api_key.as_deref(), &config.model, config.history_window);
            engine::run_session(
                &repo,
                &brain,
                &ConsoleEffects,
                config.unknown_tool_policy,
                &session,
            )
            .await
        }
        Command::Simulate { cycles } => {
            engine::simulate(&repo, &ConsoleEffects, config.unknown_tool_policy, cycles).await
        }
        Command::Sessions => {
            for session_id in repo.list_sessions().await? {
                let doc = repo.load(&session_id).await;
                println!(
                    "{session_id}  status={}  entries={}",
                    doc.metadata.status,
                    doc.history.len()
                );
            }
            Ok(())
        }
    }
}
