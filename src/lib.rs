//! Claude Dash Library
//!
//! The data core of a local dashboard for Claude Code sessions. It reads the `.jsonl`
//! transcripts Claude Code writes under `~/.claude/projects`, and turns them into
//! session summaries, cost and token rollups, and skill usage counts.
//!
//! ## Core Features
//!
//! - **Transcript parsing**: per-file session summaries and full message lists, tolerant
//!   of unknown entry kinds and content blocks
//! - **Session index**: listing by recent activity and lookup by id, with an id→path map
//!   kept current by the change watcher
//! - **Cost rollups**: configurable per-model pricing with cache-read discounts, grouped by
//!   model, project and day for a time period
//! - **Skill usage**: cached invocation counts for `Skill` tool calls
//! - **Change notifications**: debounced `added`/`changed`/`removed` events for transcripts
//!
//! Missing or corrupt local data never surfaces as an error from the core; it shows up as
//! empty or absent results and a log line.
//!
//! ## Architecture Overview
//!
//! - [`models`] - Transcript entries, session summaries and aggregated views
//! - [`parser`] - Transcript parsing with fail-fast and skip-malformed line policies
//! - [`file_discovery`] - Locating transcript files under a root
//! - [`session_index`] - Session listing and lookup
//! - [`watcher`] - Debounced file watching with cancellable subscriptions
//! - [`pricing`] - Model pricing and display names
//! - [`aggregator`] - Period filtering and usage rollups
//! - [`skills`] - Skill usage cache
//! - [`analyzer`] - [`ClaudeDashboard`], the facade over all of the above
//! - [`config`] - Configuration management with environment variable support
//! - [`logging`] - Structured logging with JSON and pretty-print formats
//! - [`display`] - Terminal and JSON output for the CLI
//!
//! ## Main Entry Point
//!
//! ```rust,no_run
//! use claude_dash::{ClaudeDashboard, TimePeriod};
//!
//! # async fn example() {
//! let dashboard = ClaudeDashboard::new("/home/me/.claude/projects");
//!
//! for session in dashboard.list_sessions().await.iter().take(5) {
//!     println!("{} {}", session.last_activity_at, session.slug);
//! }
//!
//! let stats = dashboard.usage_stats(TimePeriod::Month).await;
//! println!("${:.2}", stats.total_cost);
//! # }
//! ```

pub mod aggregator;
pub mod analyzer;
pub mod config;
pub mod display;
pub mod file_discovery;
pub mod logging;
pub mod models;
pub mod parser;
pub mod pricing;
pub mod session_index;
pub mod skills;
pub mod timestamp_parser;
pub mod watcher;

pub use aggregator::UsageAggregator;
pub use analyzer::ClaudeDashboard;
pub use config::{get_config, Config};
pub use models::{
    ParsedSession, RawTranscriptEntry, SessionDetail, Skill, SkillMetadata, SkillUsageRecord,
    TimePeriod, TokenUsage, UsageStats,
};
pub use parser::{TranscriptError, TranscriptParser};
pub use pricing::{ModelPricing, PricingTable};
pub use session_index::SessionIndex;
pub use skills::{normalize_skill_id, SkillUsageIndex};
pub use watcher::{ChangeEvent, ChangeKind, ChangeWatcher, Subscription};
