//! Output formatting for the CLI
//!
//! Every view has two renderings: colored terminal output for people and pretty-printed
//! JSON (the same shapes the dashboard frontend consumes) for scripts. Command output
//! goes to stdout; diagnostics go to stderr.

use crate::models::*;
use crate::watcher::{ChangeEvent, ChangeKind};
use colored::Colorize;
use serde::Serialize;
use std::collections::HashMap;

const RULE_WIDTH: usize = 80;

pub struct DisplayManager;

impl Default for DisplayManager {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayManager {
    pub fn new() -> Self {
        Self
    }

    pub fn display_sessions(&self, sessions: &[ParsedSession], limit: Option<usize>, json_output: bool) {
        let shown = &sessions[..limit.map_or(sessions.len(), |n| n.min(sessions.len()))];

        if json_output {
            print_json(&shown);
            return;
        }

        self.header("Claude Sessions");
        if shown.is_empty() {
            println!("\n{}\n", "No sessions found".bright_yellow());
            return;
        }

        println!(
            "\n{} {} of {} sessions\n",
            "📂".bright_yellow(),
            shown.len().to_string().bright_white().bold(),
            sessions.len().to_string().bright_white().bold()
        );

        for session in shown {
            println!(
                "{} {} {}",
                session.last_activity_at.bright_blue(),
                session.slug.bright_white().bold(),
                format!("({})", session.id).dimmed()
            );
            println!(
                "   {} • {} • {} messages • {} tokens",
                session
                    .project_path
                    .as_deref()
                    .unwrap_or("Unknown")
                    .bright_cyan(),
                session.git_branch.bright_magenta(),
                session.message_count.to_string().bright_white(),
                session.token_usage.billable().to_string().bright_white()
            );
        }
        println!();
    }

    pub fn display_session(&self, detail: &SessionDetail, json_output: bool) {
        if json_output {
            print_json(detail);
            return;
        }

        let session = &detail.session;
        self.header(&format!("Session {}", session.slug));

        println!();
        self.field("ID", &session.id);
        self.field("Project", session.project_path.as_deref().unwrap_or("Unknown"));
        self.field("Branch", &session.git_branch);
        self.field("Model", &session.model);
        self.field("Started", &session.started_at);
        self.field("Last activity", &session.last_activity_at);
        self.field("Messages", &session.message_count.to_string());
        self.field(
            "Tokens",
            &format!(
                "{} in • {} out • {} cache read • {} cache write",
                session.token_usage.input,
                session.token_usage.output,
                session.token_usage.cache_read,
                session.token_usage.cache_creation
            ),
        );

        if !session.tools_used.is_empty() {
            println!("\n{}", "Tools".bright_white().bold());
            for (tool, count) in &session.tools_used {
                println!("   {}: {}", tool.bright_cyan(), count.to_string().bright_white());
            }
        }
        if !session.skills_used.is_empty() {
            println!("\n{}", "Skills".bright_white().bold());
            for (skill, count) in &session.skills_used {
                println!("   {}: {}", skill.bright_cyan(), count.to_string().bright_white());
            }
        }

        println!("\n{}", "Transcript".bright_white().bold());
        for entry in &detail.messages {
            if let Some(line) = summarize_entry(entry) {
                println!("{}", line);
            }
        }
        println!();
    }

    pub fn display_stats(&self, stats: &UsageStats, period: TimePeriod, json_output: bool) {
        if json_output {
            print_json(stats);
            return;
        }

        self.header(&format!("Claude Usage ({})", period));

        println!(
            "\n{} {} sessions • {} tokens • {} total\n",
            "📊".bright_yellow(),
            stats.session_count.to_string().bright_white().bold(),
            stats.total_tokens.to_string().bright_white().bold(),
            format!("${:.2}", stats.total_cost).bright_green().bold()
        );

        if stats.session_count == 0 {
            return;
        }

        println!("{}", "By model".bright_white().bold());
        for (model, usage) in &stats.by_model {
            println!(
                "   {}: {} ({} tokens)",
                model.bright_cyan(),
                format!("${:.2}", usage.cost).bright_green(),
                usage.tokens.to_string().bright_white()
            );
        }

        println!("\n{}", "By project".bright_white().bold());
        for project in &stats.by_project {
            let percentage = if stats.total_cost > 0.0 {
                project.cost / stats.total_cost * 100.0
            } else {
                0.0
            };
            println!(
                "   {}: {} ({}%, {} sessions)",
                project.path.bright_cyan(),
                format!("${:.2}", project.cost).bright_green(),
                format!("{:.0}", percentage).bright_yellow(),
                project.sessions.to_string().bright_white()
            );
        }

        println!("\n{}", "By day".bright_white().bold());
        for day in &stats.by_day {
            println!(
                "   {} {} — {} ({} sessions)",
                "📅".bright_blue(),
                day.date.bright_white().bold(),
                format!("${:.2}", day.cost).bright_green().bold(),
                day.sessions.to_string().bright_white()
            );
        }
        println!();
    }

    pub fn display_skill_usage(&self, usage: &HashMap<String, SkillUsageRecord>, json_output: bool) {
        let mut rows: Vec<(&String, &SkillUsageRecord)> = usage.iter().collect();
        rows.sort_by(|a, b| b.1.count.cmp(&a.1.count).then_with(|| a.0.cmp(b.0)));

        if json_output {
            let ordered: Vec<serde_json::Value> = rows
                .iter()
                .map(|(id, record)| {
                    serde_json::json!({
                        "id": id,
                        "count": record.count,
                        "lastUsedAt": record.last_used_at,
                    })
                })
                .collect();
            print_json(&ordered);
            return;
        }

        self.header("Skill Usage");
        if rows.is_empty() {
            println!("\n{}\n", "No skill invocations found".bright_yellow());
            return;
        }

        println!();
        for (id, record) in rows {
            let last_used = record
                .last_used_at
                .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "never".to_string());
            println!(
                "   {}: {} uses (last {})",
                id.bright_cyan(),
                record.count.to_string().bright_white().bold(),
                last_used.dimmed()
            );
        }
        println!();
    }

    pub fn display_change(&self, event: &ChangeEvent) {
        let kind = match event.kind {
            ChangeKind::Added => "added".bright_green(),
            ChangeKind::Changed => "changed".bright_yellow(),
            ChangeKind::Removed => "removed".bright_red(),
        };
        println!("{:>8} {}", kind, event.path.display());
    }

    fn header(&self, title: &str) {
        println!("\n{}", "=".repeat(RULE_WIDTH).bright_cyan());
        println!("{}", title.bright_white().bold());
        println!("{}", "=".repeat(RULE_WIDTH).bright_cyan());
    }

    fn field(&self, label: &str, value: &str) {
        println!("   {:<14} {}", format!("{}:", label).dimmed(), value.bright_white());
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json_str) => println!("{}", json_str),
        Err(e) => eprintln!("Error serializing output to JSON: {}", e),
    }
}

/// One line per entry for the transcript view; entries without a message are skipped.
fn summarize_entry(entry: &RawTranscriptEntry) -> Option<String> {
    let message = entry.message.as_ref()?;
    let who = match message.role {
        Some(Role::User) => "user".bright_green(),
        Some(Role::Assistant) => "assistant".bright_blue(),
        _ => "other".dimmed(),
    };

    let body = match &message.content {
        MessageContent::Text(text) => preview(text),
        MessageContent::Blocks(blocks) => blocks
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(preview(text)),
                ContentBlock::ToolUse { .. } => block.tool_name().map(|name| format!("[{}]", name)),
                ContentBlock::ToolResult { .. } => Some("[result]".to_string()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(" "),
    };

    Some(format!(
        "   {} {:>9} {}",
        entry.timestamp.as_deref().unwrap_or("").dimmed(),
        who,
        body
    ))
}

fn preview(text: &str) -> String {
    const MAX_CHARS: usize = 100;
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() > MAX_CHARS {
        format!("{}…", flat.chars().take(MAX_CHARS).collect::<String>())
    } else {
        flat
    }
}
