//! Dashboard facade
//!
//! [`ClaudeDashboard`] wires the core components together from a [`Config`] and answers
//! the questions a dashboard asks:
//!
//! - which sessions exist, most recent first
//! - one session's summary and full transcript
//! - cost and token usage for a period
//! - how often each skill has been invoked
//!
//! Every call degrades to empty or absent results when transcripts are missing or
//! unreadable; nothing here returns an error for bad local data.
//!
//! ```rust,no_run
//! use claude_dash::{ClaudeDashboard, Config, TimePeriod};
//!
//! # async fn example() {
//! let dashboard = ClaudeDashboard::from_config(&Config::default());
//! let stats = dashboard.usage_stats(TimePeriod::Week).await;
//! println!("${:.2} across {} sessions", stats.total_cost, stats.session_count);
//! # }
//! ```

use crate::aggregator::UsageAggregator;
use crate::config::Config;
use crate::models::*;
use crate::pricing::PricingTable;
use crate::session_index::SessionIndex;
use crate::skills::SkillUsageIndex;
use crate::watcher::ChangeWatcher;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub struct ClaudeDashboard {
    projects_dir: PathBuf,
    stability: Duration,
    emit_initial: bool,
    sessions: SessionIndex,
    aggregator: UsageAggregator,
    skills: SkillUsageIndex,
}

impl ClaudeDashboard {
    pub fn from_config(config: &Config) -> Self {
        let projects_dir = config.projects_dir();
        debug!(projects_dir = %projects_dir.display(), "Creating dashboard");

        Self {
            sessions: SessionIndex::new(&projects_dir)
                .with_read_concurrency(config.processing.read_concurrency),
            aggregator: UsageAggregator::new(PricingTable::from_config(&config.pricing)),
            skills: SkillUsageIndex::new(&projects_dir, config.skills.cache_ttl()),
            stability: config.watcher.stability(),
            emit_initial: config.watcher.emit_initial,
            projects_dir,
        }
    }

    /// Dashboard over `projects_dir` with default settings otherwise.
    pub fn new(projects_dir: impl Into<PathBuf>) -> Self {
        let mut config = Config::default();
        config.paths.projects_dir = Some(projects_dir.into());
        Self::from_config(&config)
    }

    pub fn projects_dir(&self) -> &Path {
        &self.projects_dir
    }

    pub fn session_index(&self) -> &SessionIndex {
        &self.sessions
    }

    pub fn skill_index(&self) -> &SkillUsageIndex {
        &self.skills
    }

    pub fn aggregator(&self) -> &UsageAggregator {
        &self.aggregator
    }

    pub async fn list_sessions(&self) -> Vec<ParsedSession> {
        self.sessions.list_sessions().await
    }

    pub async fn get_session(&self, id: &str) -> Option<SessionDetail> {
        self.sessions.get_session(id).await
    }

    pub async fn usage_stats(&self, period: TimePeriod) -> UsageStats {
        let sessions = self.sessions.list_sessions().await;
        self.aggregator.aggregate(&sessions, period)
    }

    pub async fn skill_usage(&self) -> HashMap<String, SkillUsageRecord> {
        self.skills.snapshot().await
    }

    pub async fn skills_with_usage(&self, skills: Vec<SkillMetadata>) -> Vec<Skill> {
        self.skills.merge_into(skills).await
    }

    /// A watcher over the projects directory using the configured stability window.
    /// It is not started.
    pub fn change_watcher(&self) -> ChangeWatcher {
        ChangeWatcher::new(&self.projects_dir, self.stability).with_initial_events(self.emit_initial)
    }
}
