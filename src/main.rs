use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use claude_dash::display::DisplayManager;
use claude_dash::logging::init_logging;
use claude_dash::{get_config, ClaudeDashboard, TimePeriod};
use std::process;
use tracing::info;

#[derive(Parser)]
#[command(name = "claude-dash")]
#[command(about = "Browse Claude Code sessions, costs and skill usage from local transcripts")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List sessions, most recently active first
    Sessions {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
        /// Show at most N sessions
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show one session and its transcript
    Session {
        /// Session id
        id: String,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Show cost and token usage for a period
    Stats {
        /// Time period to aggregate
        #[arg(long, value_enum, default_value_t = TimePeriod::Week)]
        period: TimePeriod,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Show skill invocation counts
    Skills {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Print transcript changes until interrupted
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = get_config();
    let _log_guard = init_logging(&config.logging, &config.paths.log_directory);

    let dashboard = ClaudeDashboard::from_config(config);
    let display = DisplayManager::new();

    match cli.command.unwrap_or(Commands::Sessions {
        json: false,
        limit: None,
    }) {
        Commands::Sessions { json, limit } => {
            let sessions = dashboard.list_sessions().await;
            display.display_sessions(&sessions, limit, json);
        }
        Commands::Session { id, json } => match dashboard.get_session(&id).await {
            Some(detail) => display.display_session(&detail, json),
            None => {
                if json {
                    println!("{}", serde_json::json!({ "error": "Session not found" }));
                } else {
                    eprintln!("Session not found: {}", id);
                }
                process::exit(1);
            }
        },
        Commands::Stats { period, json } => {
            let stats = dashboard.usage_stats(period).await;
            display.display_stats(&stats, period, json);
        }
        Commands::Skills { json } => {
            let usage = dashboard.skill_usage().await;
            display.display_skill_usage(&usage, json);
        }
        Commands::Watch => watch(&dashboard, &display).await?,
    }

    Ok(())
}

async fn watch(dashboard: &ClaudeDashboard, display: &DisplayManager) -> Result<()> {
    let mut watcher = dashboard.change_watcher();
    let _index_subscription = dashboard.session_index().attach(&watcher);
    let (_subscription, mut events) = watcher.subscribe_channel();

    watcher
        .start()
        .with_context(|| format!("Failed to watch {}", dashboard.projects_dir().display()))?;
    if !watcher.is_running() {
        eprintln!(
            "No transcripts directory at {}",
            dashboard.projects_dir().display()
        );
        return Ok(());
    }

    info!(root = %dashboard.projects_dir().display(), "Watching for changes, press Ctrl+C to stop");
    loop {
        tokio::select! {
            Some(event) = events.recv() => display.display_change(&event),
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    watcher.stop();
    Ok(())
}
