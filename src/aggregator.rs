//! Usage Aggregator
//!
//! Rolls a set of [`ParsedSession`] values up into [`UsageStats`] for a [`TimePeriod`]:
//! totals, a per-model breakdown keyed by display name, projects ordered by cost and
//! days ordered by date.
//!
//! The period filter compares each session's last-activity timestamp against a cutoff.
//! `today` starts at midnight in the caller's time zone, `week` and `month` are rolling
//! 7 and 30 day windows, and `all` skips filtering altogether.

use crate::models::*;
use crate::pricing::PricingTable;
use crate::timestamp_parser::TimestampParser;
use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

const UNKNOWN_PROJECT: &str = "Unknown";

#[derive(Debug, Clone, Default)]
pub struct UsageAggregator {
    pricing: PricingTable,
}

#[derive(Default)]
struct ProjectTotals {
    cost: f64,
    sessions: u64,
}

#[derive(Default)]
struct DayTotals {
    tokens: u64,
    cost: f64,
    sessions: u64,
}

impl UsageAggregator {
    pub fn new(pricing: PricingTable) -> Self {
        Self { pricing }
    }

    pub fn pricing(&self) -> &PricingTable {
        &self.pricing
    }

    pub fn calculate_cost(&self, session: &ParsedSession) -> f64 {
        self.pricing.calculate_cost(session)
    }

    /// Start of the window for `period` as seen from `now`; `None` for `all`.
    pub fn cutoff<Tz: TimeZone>(period: TimePeriod, now: &DateTime<Tz>) -> Option<DateTime<Utc>> {
        match period {
            TimePeriod::Today => {
                let midnight = now.date_naive().and_hms_opt(0, 0, 0)?;
                // earliest() covers a DST gap/overlap at midnight
                let local_midnight = now.timezone().from_local_datetime(&midnight).earliest();
                Some(
                    local_midnight
                        .map(|dt| dt.with_timezone(&Utc))
                        .unwrap_or_else(|| midnight.and_utc()),
                )
            }
            TimePeriod::Week => Some(now.with_timezone(&Utc) - Duration::days(7)),
            TimePeriod::Month => Some(now.with_timezone(&Utc) - Duration::days(30)),
            TimePeriod::All => None,
        }
    }

    pub fn filter_by_period<'a, Tz: TimeZone>(
        sessions: &'a [ParsedSession],
        period: TimePeriod,
        now: &DateTime<Tz>,
    ) -> Vec<&'a ParsedSession> {
        match Self::cutoff(period, now) {
            None => sessions.iter().collect(),
            Some(cutoff) => sessions
                .iter()
                .filter(|s| s.last_activity().map_or(false, |at| at >= cutoff))
                .collect(),
        }
    }

    /// Aggregate relative to the current local time.
    pub fn aggregate(&self, sessions: &[ParsedSession], period: TimePeriod) -> UsageStats {
        self.aggregate_at(sessions, period, &Local::now())
    }

    pub fn aggregate_at<Tz: TimeZone>(
        &self,
        sessions: &[ParsedSession],
        period: TimePeriod,
        now: &DateTime<Tz>,
    ) -> UsageStats {
        let filtered = Self::filter_by_period(sessions, period, now);

        let mut stats = UsageStats::default();
        let mut by_project: HashMap<String, ProjectTotals> = HashMap::new();
        let mut by_day: BTreeMap<String, DayTotals> = BTreeMap::new();

        for session in &filtered {
            let cost = self.calculate_cost(session);
            let tokens = session.token_usage.billable();

            stats.total_cost += cost;
            stats.total_tokens += tokens;
            stats.session_count += 1;

            let model = stats
                .by_model
                .entry(self.pricing.display_name(&session.model))
                .or_default();
            model.tokens += tokens;
            model.cost += cost;

            let project_key = session
                .project_path
                .clone()
                .unwrap_or_else(|| UNKNOWN_PROJECT.to_string());
            let project = by_project.entry(project_key).or_default();
            project.cost += cost;
            project.sessions += 1;

            match TimestampParser::utc_day(&session.last_activity_at) {
                Some(day) => {
                    let day = by_day.entry(day).or_default();
                    day.tokens += tokens;
                    day.cost += cost;
                    day.sessions += 1;
                }
                None => debug!(session = %session.id, "No day bucket for unparseable timestamp"),
            }
        }

        let mut projects: Vec<ProjectUsage> = by_project
            .into_iter()
            .map(|(path, totals)| ProjectUsage {
                path,
                cost: totals.cost,
                sessions: totals.sessions,
            })
            .collect();
        projects.sort_by(|a, b| b.cost.total_cmp(&a.cost).then_with(|| a.path.cmp(&b.path)));
        stats.by_project = projects;

        // BTreeMap iteration is already ascending by date
        stats.by_day = by_day
            .into_iter()
            .map(|(date, totals)| DayUsage {
                date,
                tokens: totals.tokens,
                cost: totals.cost,
                sessions: totals.sessions,
            })
            .collect();

        stats
    }
}
