//! Session Directory Index
//!
//! Lists and looks up sessions under a transcript root. Sessions are not indexed by id on
//! disk, so a cold lookup is a linear scan; every file parsed along the way is remembered
//! in an id→path map, and later lookups try the remembered file first.
//!
//! A missing root is not an error: listing yields nothing and lookups yield `None`.

use crate::file_discovery::FileDiscovery;
use crate::models::{ParsedSession, SessionDetail};
use crate::parser::TranscriptParser;
use crate::watcher::{ChangeEvent, ChangeKind, ChangeWatcher, Subscription};
use dashmap::DashMap;
use futures::stream::{self, StreamExt};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const DEFAULT_READ_CONCURRENCY: usize = 8;

pub struct SessionIndex {
    root: PathBuf,
    read_concurrency: usize,
    paths: Arc<DashMap<String, PathBuf>>,
}

impl SessionIndex {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            read_concurrency: DEFAULT_READ_CONCURRENCY,
            paths: Arc::new(DashMap::new()),
        }
    }

    /// Maximum number of transcripts read at once.
    pub fn with_read_concurrency(mut self, read_concurrency: usize) -> Self {
        self.read_concurrency = read_concurrency.max(1);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Every parseable session, most recently active first.
    pub async fn list_sessions(&self) -> Vec<ParsedSession> {
        let files = FileDiscovery::find_transcript_files_async(&self.root).await;
        let file_count = files.len();

        let parsed: Vec<(PathBuf, Option<ParsedSession>)> = stream::iter(files)
            .map(|path| async move {
                let session = TranscriptParser::parse_session_file(&path).await;
                (path, session)
            })
            .buffered(self.read_concurrency)
            .collect()
            .await;

        let mut sessions: Vec<ParsedSession> = parsed
            .into_iter()
            .filter_map(|(path, session)| {
                let session = session?;
                self.paths.insert(session.id.clone(), path);
                Some(session)
            })
            .collect();

        sort_by_recent_activity(&mut sessions);

        info!(
            root = %self.root.display(),
            files = file_count,
            sessions = sessions.len(),
            "Listed sessions"
        );
        sessions
    }

    /// Summary and messages for one session, or `None` if no transcript has that id.
    pub async fn get_session(&self, id: &str) -> Option<SessionDetail> {
        let remembered = self.paths.get(id).map(|entry| entry.value().clone());
        if let Some(path) = remembered {
            if let Some(detail) = TranscriptParser::read_session_detail(&path).await {
                if detail.session.id == id {
                    return Some(detail);
                }
            }
            debug!(session = id, path = %path.display(), "Stale session path, rescanning");
            self.paths.remove(id);
        }

        self.scan_for(id).await
    }

    /// Number of sessions with a remembered file.
    pub fn indexed_len(&self) -> usize {
        self.paths.len()
    }

    /// Forget sessions whose file was changed or removed.
    pub fn apply_change(&self, event: &ChangeEvent) {
        forget_path(&self.paths, event);
    }

    /// Keep the id→path map in step with `watcher` for as long as the subscription lives.
    pub fn attach(&self, watcher: &ChangeWatcher) -> Subscription {
        let paths = Arc::clone(&self.paths);
        watcher.subscribe(move |event| forget_path(&paths, event))
    }

    async fn scan_for(&self, id: &str) -> Option<SessionDetail> {
        for path in FileDiscovery::find_transcript_files_async(&self.root).await {
            let Some(detail) = TranscriptParser::read_session_detail(&path).await else {
                continue;
            };

            self.paths.insert(detail.session.id.clone(), path.clone());
            if detail.session.id == id {
                return Some(detail);
            }
        }

        debug!(session = id, root = %self.root.display(), "Session not found");
        None
    }
}

fn forget_path(paths: &DashMap<String, PathBuf>, event: &ChangeEvent) {
    match event.kind {
        // A new file cannot hold a session we already remember elsewhere
        ChangeKind::Added => {}
        ChangeKind::Changed | ChangeKind::Removed => {
            paths.retain(|_, path| path != &event.path);
        }
    }
}

/// Most recent first; unparseable timestamps last; ties by id.
pub fn sort_by_recent_activity(sessions: &mut [ParsedSession]) {
    sessions.sort_by(|a, b| {
        let order = match (a.last_activity(), b.last_activity()) {
            (Some(a), Some(b)) => b.cmp(&a),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        order.then_with(|| a.id.cmp(&b.id))
    });
}
