#![allow(dead_code)]

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A throwaway `~/.claude` with an empty `projects` directory
pub struct ClaudeHome {
    pub dir: TempDir,
}

impl ClaudeHome {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("projects")).unwrap();
        Self { dir }
    }

    pub fn home(&self) -> &Path {
        self.dir.path()
    }

    pub fn projects(&self) -> PathBuf {
        self.dir.path().join("projects")
    }

    /// Write `lines` as `<projects>/<project>/<file>.jsonl`
    pub fn write_transcript(&self, project: &str, file: &str, lines: &[String]) -> PathBuf {
        let dir = self.projects().join(project);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(format!("{}.jsonl", file));
        create_test_jsonl(&dir, &format!("{}.jsonl", file), &lines.join("\n")).unwrap();
        path
    }
}

pub fn create_test_jsonl(dir: &Path, filename: &str, content: &str) -> Result<()> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(())
}

pub fn user_entry(session: &str, cwd: &str, timestamp: &str, text: &str) -> String {
    format!(
        r#"{{"type":"user","uuid":"u-{ts}","parentUuid":null,"timestamp":"{ts}","sessionId":"{session}","cwd":"{cwd}","gitBranch":"main","slug":"{session}-slug","version":"2.0.1","message":{{"role":"user","content":"{text}"}}}}"#,
        ts = timestamp,
        session = session,
        cwd = cwd,
        text = text
    )
}

pub fn assistant_entry(session: &str, timestamp: &str, model: &str, input: u64, output: u64, cache_read: u64) -> String {
    format!(
        r#"{{"type":"assistant","uuid":"a-{ts}","timestamp":"{ts}","sessionId":"{session}","message":{{"role":"assistant","model":"{model}","content":[{{"type":"text","text":"ok"}},{{"type":"tool_use","id":"t1","name":"Read","input":{{"file_path":"/x"}}}}],"usage":{{"input_tokens":{input},"output_tokens":{output},"cache_read_input_tokens":{cache_read},"cache_creation_input_tokens":0}}}}}}"#,
        ts = timestamp,
        session = session,
        model = model,
        input = input,
        output = output,
        cache_read = cache_read
    )
}

pub fn skill_entry(session: &str, timestamp: &str, skill: &str) -> String {
    format!(
        r#"{{"type":"assistant","timestamp":"{ts}","sessionId":"{session}","message":{{"role":"assistant","model":"claude-sonnet-4-20250514","content":[{{"type":"tool_use","id":"s1","name":"Skill","input":{{"skill":"{skill}"}}}}]}}}}"#,
        ts = timestamp,
        session = session,
        skill = skill
    )
}

/// A two-entry session with the given usage on the assistant turn
pub fn simple_session(session: &str, cwd: &str, start: &str, end: &str, model: &str, input: u64, output: u64) -> Vec<String> {
    vec![
        user_entry(session, cwd, start, "hello"),
        assistant_entry(session, end, model, input, output, 0),
    ]
}
