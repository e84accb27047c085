use glob::{glob, Pattern};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File extension of Claude Code session transcripts
pub const TRANSCRIPT_EXTENSION: &str = "jsonl";

/// Handles file system traversal and discovery of session transcript files
pub struct FileDiscovery;

impl FileDiscovery {
    /// Default Claude home (`~/.claude`)
    pub fn default_claude_home() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".claude")
    }

    /// Directory holding the per-project transcript folders
    pub fn projects_dir(claude_home: &Path) -> PathBuf {
        claude_home.join("projects")
    }

    /// Whether a path follows the transcript naming convention
    pub fn is_transcript_file(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext == TRANSCRIPT_EXTENSION)
            .unwrap_or(false)
    }

    /// Find every transcript under `root`, at any depth.
    ///
    /// A missing or unreadable root yields an empty list. The result is sorted so
    /// callers see a stable order.
    pub fn find_transcript_files(root: &Path) -> Vec<PathBuf> {
        if !root.is_dir() {
            debug!(root = %root.display(), "Transcript root does not exist");
            return Vec::new();
        }

        let escaped_root = PathBuf::from(Pattern::escape(&root.to_string_lossy()));
        let pattern = escaped_root
            .join("**")
            .join(format!("*.{}", TRANSCRIPT_EXTENSION));
        let mut files = Vec::new();

        match glob(&pattern.to_string_lossy()) {
            Ok(paths) => {
                for entry in paths {
                    match entry {
                        Ok(path) if path.is_file() => files.push(path),
                        Ok(_) => {}
                        Err(e) => {
                            warn!(error = %e, "Skipping unreadable path while scanning transcripts")
                        }
                    }
                }
            }
            Err(e) => {
                warn!(root = %root.display(), error = %e, "Invalid transcript glob pattern");
            }
        }

        files.sort();
        files
    }

    /// Async wrapper that runs the directory walk off the runtime threads
    pub async fn find_transcript_files_async(root: &Path) -> Vec<PathBuf> {
        let root = root.to_path_buf();
        match tokio::task::spawn_blocking(move || Self::find_transcript_files(&root)).await {
            Ok(files) => files,
            Err(e) => {
                warn!(error = %e, "Transcript scan task failed");
                Vec::new()
            }
        }
    }

    /// File name without extension, used as the slug/id fallback
    pub fn file_stem(path: &Path) -> String {
        path.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_is_transcript_file() {
        assert!(FileDiscovery::is_transcript_file(Path::new("/a/b/abc.jsonl")));
        assert!(!FileDiscovery::is_transcript_file(Path::new("/a/b/abc.json")));
        assert!(!FileDiscovery::is_transcript_file(Path::new("/a/b/jsonl")));
    }

    #[test]
    fn test_find_transcript_files_recurses() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("-home-me-proj").join("subagents");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join("-home-me-proj").join("a.jsonl"), "{}").unwrap();
        fs::write(nested.join("b.jsonl"), "{}").unwrap();
        fs::write(nested.join("notes.txt"), "x").unwrap();

        let files = FileDiscovery::find_transcript_files(dir.path());
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| FileDiscovery::is_transcript_file(f)));
    }

    #[test]
    fn test_missing_root_is_empty() {
        let dir = tempdir().unwrap();
        let files = FileDiscovery::find_transcript_files(&dir.path().join("missing"));
        assert!(files.is_empty());
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(
            FileDiscovery::file_stem(Path::new("/x/7f3a-uuid.jsonl")),
            "7f3a-uuid"
        );
    }
}
