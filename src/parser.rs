//! Transcript Parser
//!
//! Turns the text of one `.jsonl` transcript into a [`ParsedSession`] summary and/or the
//! ordered list of [`RawTranscriptEntry`] values.
//!
//! Two line policies exist. The summary path is fail-fast: a single line that is not a
//! valid transcript record discards the whole file, since transcripts are machine-written
//! and a bad line means a torn write. The message path skips bad lines so the transcript
//! view stays available.
//!
//! Both paths drive a [`JsonlProcessor`], the same visitor the skill index uses to scan
//! transcripts without materialising sessions.

use crate::file_discovery::FileDiscovery;
use crate::models::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

const UNKNOWN: &str = "unknown";

#[derive(Debug, Error)]
pub enum TranscriptError {
    #[error("failed to read transcript {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("transcript has no entries")]
    Empty,
    #[error("malformed transcript line {line}: {source}")]
    Malformed {
        line: usize,
        source: serde_json::Error,
    },
}

/// How a processor run treats a line that does not parse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinePolicy {
    /// Abort the whole transcript
    FailFast,
    /// Log and continue with the next line
    SkipMalformed,
}

/// Visitor over the entries of a transcript, in file order
pub trait JsonlProcessor {
    type Output;

    fn process_entry(&mut self, entry: RawTranscriptEntry, line_number: usize);
    fn finalize(self) -> Self::Output;
}

/// Run `processor` over every non-blank line of `contents`.
pub fn process_transcript<P: JsonlProcessor>(
    contents: &str,
    policy: LinePolicy,
    mut processor: P,
) -> Result<P::Output, TranscriptError> {
    for (index, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let line_number = index + 1;
        match serde_json::from_str::<RawTranscriptEntry>(line) {
            Ok(entry) => processor.process_entry(entry, line_number),
            Err(source) => match policy {
                LinePolicy::FailFast => {
                    return Err(TranscriptError::Malformed {
                        line: line_number,
                        source,
                    })
                }
                LinePolicy::SkipMalformed => {
                    debug!(line = line_number, error = %source, "Skipping malformed transcript line");
                }
            },
        }
    }

    Ok(processor.finalize())
}

/// Builds a [`ParsedSession`] from the entries of one transcript
pub struct SessionAccumulator {
    fallback_slug: String,
    first: Option<RawTranscriptEntry>,
    last_timestamp: Option<String>,
    message_count: u64,
    token_usage: TokenUsage,
    tools_used: BTreeMap<String, u64>,
    skills_used: BTreeMap<String, u64>,
    model: Option<String>,
}

impl SessionAccumulator {
    pub fn new(fallback_slug: impl Into<String>) -> Self {
        Self {
            fallback_slug: fallback_slug.into(),
            first: None,
            last_timestamp: None,
            message_count: 0,
            token_usage: TokenUsage::default(),
            tools_used: BTreeMap::new(),
            skills_used: BTreeMap::new(),
            model: None,
        }
    }
}

impl JsonlProcessor for SessionAccumulator {
    type Output = Option<ParsedSession>;

    fn process_entry(&mut self, entry: RawTranscriptEntry, _line_number: usize) {
        if let Some(message) = &entry.message {
            if let Some(usage) = &message.usage {
                self.token_usage.add(usage);
            }
            if let Some(model) = message.model.as_deref().filter(|m| !m.is_empty()) {
                self.model = Some(model.to_string());
            }
            if message.role.is_some() {
                self.message_count += 1;
            }
        }

        for block in entry.blocks() {
            if let Some(tool) = block.tool_name() {
                *self.tools_used.entry(tool.to_string()).or_insert(0) += 1;
            }
            if let Some(skill) = block.skill_name() {
                *self.skills_used.entry(skill.to_string()).or_insert(0) += 1;
            }
        }

        self.last_timestamp = entry.timestamp.clone();
        if self.first.is_none() {
            // Only the header fields are needed; drop the payload.
            self.first = Some(RawTranscriptEntry {
                message: None,
                ..entry
            });
        }
    }

    fn finalize(self) -> Option<ParsedSession> {
        let first = self.first?;
        let non_empty = |value: Option<String>| value.filter(|v| !v.is_empty());

        Some(ParsedSession {
            id: non_empty(first.session_id).unwrap_or_else(|| self.fallback_slug.clone()),
            slug: non_empty(first.slug).unwrap_or_else(|| self.fallback_slug.clone()),
            project_path: non_empty(first.cwd),
            git_branch: non_empty(first.git_branch).unwrap_or_else(|| UNKNOWN.to_string()),
            started_at: first.timestamp.unwrap_or_default(),
            last_activity_at: self.last_timestamp.unwrap_or_default(),
            message_count: self.message_count,
            token_usage: self.token_usage,
            tools_used: self.tools_used,
            skills_used: self.skills_used,
            model: self.model.unwrap_or_else(|| UNKNOWN.to_string()),
        })
    }
}

/// Collects every entry in file order
#[derive(Default)]
pub struct MessageCollector {
    entries: Vec<RawTranscriptEntry>,
}

impl JsonlProcessor for MessageCollector {
    type Output = Vec<RawTranscriptEntry>;

    fn process_entry(&mut self, entry: RawTranscriptEntry, _line_number: usize) {
        self.entries.push(entry);
    }

    fn finalize(self) -> Vec<RawTranscriptEntry> {
        self.entries
    }
}

pub struct TranscriptParser;

impl TranscriptParser {
    /// Summarise a transcript, reporting why it could not be summarised.
    pub fn try_parse_session(
        contents: &str,
        fallback_slug: &str,
    ) -> Result<ParsedSession, TranscriptError> {
        process_transcript(
            contents,
            LinePolicy::FailFast,
            SessionAccumulator::new(fallback_slug),
        )?
        .ok_or(TranscriptError::Empty)
    }

    /// Summarise a transcript; empty or malformed contents yield `None`.
    pub fn parse_session(contents: &str, fallback_slug: &str) -> Option<ParsedSession> {
        match Self::try_parse_session(contents, fallback_slug) {
            Ok(session) => Some(session),
            Err(e) => {
                debug!(slug = fallback_slug, error = %e, "Transcript yields no session");
                None
            }
        }
    }

    /// Every parseable entry, in file order. Malformed lines are skipped.
    pub fn get_messages(contents: &str) -> Vec<RawTranscriptEntry> {
        // SkipMalformed never returns Err
        process_transcript(contents, LinePolicy::SkipMalformed, MessageCollector::default())
            .unwrap_or_default()
    }

    pub async fn read_transcript(path: &Path) -> Result<String, TranscriptError> {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|source| TranscriptError::Io {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Read and summarise a transcript file. Unreadable files are logged and yield `None`.
    pub async fn parse_session_file(path: &Path) -> Option<ParsedSession> {
        let contents = Self::read_logged(path).await?;
        Self::summarise_logged(path, &contents)
    }

    /// Read a transcript file's entries. Unreadable files are logged and yield nothing.
    pub async fn read_messages(path: &Path) -> Vec<RawTranscriptEntry> {
        match Self::read_logged(path).await {
            Some(contents) => Self::get_messages(&contents),
            None => Vec::new(),
        }
    }

    /// Summary and messages from a single read of the file.
    pub async fn read_session_detail(path: &Path) -> Option<SessionDetail> {
        let contents = Self::read_logged(path).await?;
        let session = Self::summarise_logged(path, &contents)?;
        let messages = Self::get_messages(&contents);
        Some(SessionDetail { session, messages })
    }

    async fn read_logged(path: &Path) -> Option<String> {
        match Self::read_transcript(path).await {
            Ok(contents) => Some(contents),
            Err(e) => {
                warn!(error = %e, "Skipping unreadable transcript");
                None
            }
        }
    }

    fn summarise_logged(path: &Path, contents: &str) -> Option<ParsedSession> {
        match Self::try_parse_session(contents, &FileDiscovery::file_stem(path)) {
            Ok(session) => Some(session),
            Err(TranscriptError::Empty) => {
                debug!(path = %path.display(), "Empty transcript");
                None
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Discarding malformed transcript");
                None
            }
        }
    }
}
