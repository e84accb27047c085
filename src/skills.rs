//! Skill Usage Index
//!
//! Counts `Skill` tool invocations across every transcript under the projects directory.
//! The result is held in a time-boxed cache that is rebuilt wholesale once it is older
//! than its TTL; there is no incremental update. Rebuilds run under an async mutex, so
//! requests that arrive while a rebuild is in flight wait for it instead of starting
//! their own scan.

use crate::file_discovery::FileDiscovery;
use crate::models::{RawTranscriptEntry, Skill, SkillMetadata, SkillUsageRecord};
use crate::parser::{process_transcript, JsonlProcessor, LinePolicy, TranscriptParser};
use crate::timestamp_parser::TimestampParser;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const UNKNOWN_NAMESPACE: &str = "unknown";

/// Normalize a skill reference to `<namespace>:<name>` form.
pub fn normalize_skill_id(skill_ref: &str) -> String {
    if skill_ref.contains(':') {
        skill_ref.to_string()
    } else {
        format!("{}:{}", UNKNOWN_NAMESPACE, skill_ref)
    }
}

/// Collects `(skill id, invoked at)` pairs from one transcript
#[derive(Default)]
struct SkillInvocationCollector {
    invocations: Vec<(String, DateTime<Utc>)>,
}

impl JsonlProcessor for SkillInvocationCollector {
    type Output = Vec<(String, DateTime<Utc>)>;

    fn process_entry(&mut self, entry: RawTranscriptEntry, line_number: usize) {
        let mut skills = entry.skill_invocations().peekable();
        if skills.peek().is_none() {
            return;
        }

        let Some(at) = entry
            .timestamp
            .as_deref()
            .and_then(|ts| TimestampParser::parse(ts).ok())
        else {
            debug!(line = line_number, "Skipping skill invocation with invalid timestamp");
            return;
        };

        for skill in skills {
            self.invocations.push((normalize_skill_id(skill), at));
        }
    }

    fn finalize(self) -> Self::Output {
        self.invocations
    }
}

struct SkillCache {
    built_at: Option<Instant>,
    records: HashMap<String, SkillUsageRecord>,
}

impl SkillCache {
    fn is_stale(&self, now: Instant, ttl: Duration) -> bool {
        match self.built_at {
            None => true,
            Some(built_at) => now.saturating_duration_since(built_at) > ttl,
        }
    }
}

pub struct SkillUsageIndex {
    projects_dir: PathBuf,
    ttl: Duration,
    cache: Mutex<SkillCache>,
}

impl SkillUsageIndex {
    pub fn new(projects_dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            projects_dir: projects_dir.into(),
            ttl,
            cache: Mutex::new(SkillCache {
                built_at: None,
                records: HashMap::new(),
            }),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Usage of one skill; a never-used skill reads as count 0.
    pub async fn get_usage(&self, skill_id: &str) -> SkillUsageRecord {
        let mut cache = self.cache.lock().await;
        self.ensure_fresh(&mut cache).await;
        cache.records.get(skill_id).copied().unwrap_or_default()
    }

    /// All recorded skills.
    pub async fn snapshot(&self) -> HashMap<String, SkillUsageRecord> {
        let mut cache = self.cache.lock().await;
        self.ensure_fresh(&mut cache).await;
        cache.records.clone()
    }

    /// Attach usage to skill metadata; most used first, then by name.
    pub async fn merge_into(&self, skills: Vec<SkillMetadata>) -> Vec<Skill> {
        let usage = self.snapshot().await;
        merge_usage(skills, &usage)
    }

    /// Force the next read to rebuild.
    pub async fn invalidate(&self) {
        self.cache.lock().await.built_at = None;
    }

    async fn ensure_fresh(&self, cache: &mut SkillCache) {
        if !cache.is_stale(Instant::now(), self.ttl) {
            return;
        }

        let started = Instant::now();
        cache.records = Self::scan(&self.projects_dir).await;
        cache.built_at = Some(Instant::now());

        info!(
            skills = cache.records.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Rebuilt skill usage cache"
        );
    }

    async fn scan(projects_dir: &Path) -> HashMap<String, SkillUsageRecord> {
        let mut records: HashMap<String, SkillUsageRecord> = HashMap::new();

        for path in FileDiscovery::find_transcript_files_async(projects_dir).await {
            let contents = match TranscriptParser::read_transcript(&path).await {
                Ok(contents) => contents,
                Err(e) => {
                    warn!(error = %e, "Skipping transcript during skill scan");
                    continue;
                }
            };

            let invocations = process_transcript(
                &contents,
                LinePolicy::SkipMalformed,
                SkillInvocationCollector::default(),
            )
            .unwrap_or_default();

            for (skill_id, at) in invocations {
                records.entry(skill_id).or_default().record(at);
            }
        }

        records
    }
}

pub fn merge_usage(
    skills: Vec<SkillMetadata>,
    usage: &HashMap<String, SkillUsageRecord>,
) -> Vec<Skill> {
    let mut merged: Vec<Skill> = skills
        .into_iter()
        .map(|metadata| {
            let record = usage.get(&metadata.id).copied().unwrap_or_default();
            Skill {
                metadata,
                usage_count: record.count,
                last_used_at: record.last_used_at,
            }
        })
        .collect();

    merged.sort_by(|a, b| {
        b.usage_count
            .cmp(&a.usage_count)
            .then_with(|| a.metadata.name.cmp(&b.metadata.name))
    });
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_skill_id() {
        assert_eq!(normalize_skill_id("foo"), "unknown:foo");
        assert_eq!(normalize_skill_id("ns:foo"), "ns:foo");
        assert_eq!(normalize_skill_id("a:b:c"), "a:b:c");
    }

    #[test]
    fn test_collector_skips_invalid_timestamps() {
        let contents = [
            r#"{"type":"assistant","timestamp":"2025-01-01T00:00:00Z","message":{"role":"assistant","content":[{"type":"tool_use","name":"Skill","input":{"skill":"tdd"}}]}}"#,
            r#"{"type":"assistant","timestamp":"not a date","message":{"role":"assistant","content":[{"type":"tool_use","name":"Skill","input":{"skill":"tdd"}}]}}"#,
            r#"{"type":"assistant","message":{"role":"assistant","content":[{"type":"tool_use","name":"Skill","input":{"skill":"tdd"}}]}}"#,
            "{torn",
        ]
        .join("\n");

        let invocations = process_transcript(
            &contents,
            LinePolicy::SkipMalformed,
            SkillInvocationCollector::default(),
        )
        .unwrap();

        assert_eq!(invocations.len(), 1);
        assert_eq!(invocations[0].0, "unknown:tdd");
    }

    #[test]
    fn test_cache_staleness() {
        let ttl = Duration::from_secs(60);
        let now = Instant::now();
        let mut cache = SkillCache {
            built_at: None,
            records: HashMap::new(),
        };
        assert!(cache.is_stale(now, ttl));

        cache.built_at = Some(now);
        assert!(!cache.is_stale(now + Duration::from_secs(30), ttl));
        assert!(cache.is_stale(now + Duration::from_secs(61), ttl));
    }

    #[test]
    fn test_merge_usage_sorts_by_count_then_name() {
        let meta = |id: &str, name: &str| SkillMetadata {
            id: id.to_string(),
            name: name.to_string(),
            plugin: "p".to_string(),
            path: format!("/skills/{}", name),
            description: String::new(),
            triggers: Vec::new(),
        };
        let mut usage = HashMap::new();
        usage.insert(
            "p:zeta".to_string(),
            SkillUsageRecord {
                count: 3,
                last_used_at: None,
            },
        );

        let merged = merge_usage(
            vec![meta("p:beta", "beta"), meta("p:zeta", "zeta"), meta("p:alpha", "alpha")],
            &usage,
        );
        let names: Vec<&str> = merged.iter().map(|s| s.metadata.name.as_str()).collect();

        assert_eq!(names, vec!["zeta", "alpha", "beta"]);
        assert_eq!(merged[0].usage_count, 3);
        assert_eq!(merged[1].usage_count, 0);
    }
}
