//! Configuration loading tests

use claude_dash::config::Config;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

#[cfg(test)]
mod config_tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = Config::default();

        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.logging.format, "pretty");
        assert_eq!(config.logging.output, "console");
        assert!(config.paths.claude_home.ends_with(".claude"));
        assert!(config.projects_dir().ends_with("projects"));
        assert_eq!(config.watcher.stability_ms, 500);
        assert_eq!(config.skills.cache_ttl_secs, 60);
        assert_eq!(config.processing.read_concurrency, 8);
        assert_eq!(config.pricing.rules.len(), 2);
    }

    #[test]
    fn test_config_file_loading() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("claude-dash.toml");
        fs::write(
            &config_path,
            r#"
[logging]
level = "debug"
format = "json"

[paths]
claude_home = "/srv/claude"
projects_dir = "/srv/transcripts"

[skills]
cache_ttl_secs = 5

[pricing.default]
input_per_million = 1.0
output_per_million = 2.0
cache_hit_discount = 0.5
"#,
        )
        .unwrap();

        let config = Config::load_from_file(&config_path).unwrap();

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.logging.output, "console");
        assert_eq!(config.projects_dir(), PathBuf::from("/srv/transcripts"));
        assert_eq!(config.skills.cache_ttl_secs, 5);
        assert_eq!(config.pricing.default.output_per_million, 2.0);
        assert_eq!(config.pricing.rules.len(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_file_errors() {
        let temp_dir = TempDir::new().unwrap();

        let missing = Config::load_from_file(&temp_dir.path().join("nope.toml"));
        assert!(missing.is_err());

        let bad_path = temp_dir.path().join("bad.toml");
        fs::write(&bad_path, "[watcher\nstability_ms = ").unwrap();
        let err = Config::load_from_file(&bad_path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_config_serialization() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("saved.toml");

        let mut config = Config::default();
        config.watcher.stability_ms = 750;
        config.paths.projects_dir = Some(PathBuf::from("/data/projects"));
        config.save_to_file(&path).unwrap();

        let loaded = Config::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
