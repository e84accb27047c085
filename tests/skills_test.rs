//! Skill usage cache over a Claude home

mod common;

use claude_dash::{SkillMetadata, SkillUsageIndex};
use common::*;
use std::time::Duration;

fn metadata(id: &str, name: &str) -> SkillMetadata {
    SkillMetadata {
        id: id.to_string(),
        name: name.to_string(),
        plugin: id.split(':').next().unwrap_or_default().to_string(),
        path: format!("/skills/{}/SKILL.md", name),
        description: format!("The {} skill", name),
        triggers: vec![name.to_string()],
    }
}

fn seed(home: &ClaudeHome) {
    home.write_transcript(
        "-p",
        "one",
        &[
            skill_entry("one", "2025-01-01T10:00:00Z", "superpowers:tdd"),
            skill_entry("one", "2025-01-03T10:00:00Z", "superpowers:tdd"),
            skill_entry("one", "2025-01-02T10:00:00Z", "brainstorm"),
        ],
    );
    home.write_transcript(
        "-q",
        "two",
        &[
            skill_entry("two", "2025-01-05T10:00:00Z", "superpowers:tdd"),
            skill_entry("two", "not-a-time", "superpowers:tdd"),
            "{broken".to_string(),
        ],
    );
}

#[tokio::test]
async fn test_counts_and_last_used() {
    let home = ClaudeHome::new();
    seed(&home);

    let index = SkillUsageIndex::new(home.projects(), Duration::from_secs(60));
    let tdd = index.get_usage("superpowers:tdd").await;

    assert_eq!(tdd.count, 3);
    assert_eq!(
        tdd.last_used_at.map(|at| at.to_rfc3339()),
        Some("2025-01-05T10:00:00+00:00".to_string())
    );

    let brainstorm = index.get_usage("unknown:brainstorm").await;
    assert_eq!(brainstorm.count, 1);

    let never = index.get_usage("ns:never").await;
    assert_eq!(never.count, 0);
    assert!(never.last_used_at.is_none());
}

#[tokio::test]
async fn test_cache_is_reused_within_ttl() {
    let home = ClaudeHome::new();
    seed(&home);
    let index = SkillUsageIndex::new(home.projects(), Duration::from_secs(3600));
    assert_eq!(index.get_usage("superpowers:tdd").await.count, 3);

    home.write_transcript("-r", "three", &[skill_entry("three", "2025-02-01T00:00:00Z", "superpowers:tdd")]);

    assert_eq!(index.get_usage("superpowers:tdd").await.count, 3);

    index.invalidate().await;
    assert_eq!(index.get_usage("superpowers:tdd").await.count, 4);
}

#[tokio::test]
async fn test_zero_ttl_rebuilds_every_read() {
    let home = ClaudeHome::new();
    seed(&home);
    let index = SkillUsageIndex::new(home.projects(), Duration::ZERO);
    assert_eq!(index.get_usage("superpowers:tdd").await.count, 3);

    home.write_transcript("-r", "three", &[skill_entry("three", "2025-02-01T00:00:00Z", "superpowers:tdd")]);
    tokio::time::sleep(Duration::from_millis(5)).await;

    assert_eq!(index.get_usage("superpowers:tdd").await.count, 4);
}

#[tokio::test]
async fn test_concurrent_reads_share_one_cache() {
    let home = ClaudeHome::new();
    seed(&home);
    let index = SkillUsageIndex::new(home.projects(), Duration::from_secs(60));

    let (a, b, c) = tokio::join!(
        index.get_usage("superpowers:tdd"),
        index.get_usage("unknown:brainstorm"),
        index.snapshot()
    );

    assert_eq!(a.count, 3);
    assert_eq!(b.count, 1);
    assert_eq!(c.len(), 2);
}

#[tokio::test]
async fn test_merge_into_metadata() {
    let home = ClaudeHome::new();
    seed(&home);
    let index = SkillUsageIndex::new(home.projects(), Duration::from_secs(60));

    let skills = index
        .merge_into(vec![
            metadata("superpowers:zzz", "zzz"),
            metadata("unknown:brainstorm", "brainstorm"),
            metadata("superpowers:tdd", "tdd"),
            metadata("superpowers:aaa", "aaa"),
        ])
        .await;

    let names: Vec<&str> = skills.iter().map(|s| s.metadata.name.as_str()).collect();
    assert_eq!(names, vec!["tdd", "brainstorm", "aaa", "zzz"]);
    assert_eq!(skills[0].usage_count, 3);
    assert!(skills[3].last_used_at.is_none());

    let json = serde_json::to_value(&skills[0]).unwrap();
    assert_eq!(json["usageCount"], 3);
    assert_eq!(json["name"], "tdd");
}

#[tokio::test]
async fn test_missing_root_has_no_usage() {
    let home = ClaudeHome::new();
    let index = SkillUsageIndex::new(home.home().join("missing"), Duration::from_secs(60));

    assert!(index.snapshot().await.is_empty());
}
