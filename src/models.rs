//! Core Data Models
//!
//! This module defines the data structures that flow through the dashboard core, from
//! the raw lines of a transcript file to the aggregated views handed to the UI layer.
//!
//! ## Data Flow
//!
//! 1. **Raw Data**: [`RawTranscriptEntry`] - One line of a `.jsonl` transcript
//! 2. **Summary**: [`ParsedSession`] - Derived per-file summary, recomputed on every read
//! 3. **Rollups**: [`UsageStats`] - Cost/token aggregation for a [`TimePeriod`]
//! 4. **Skills**: [`SkillUsageRecord`] - Per-skill invocation counts, merged into [`Skill`]
//!
//! ## Features
//!
//! - **Serde Integration**: Raw entries round-trip with the camelCase field names Claude Code
//!   writes; derived types serialize with the names the dashboard frontend expects
//! - **Lenient Parsing**: Any JSON object is a valid entry. Unknown entry kinds and block
//!   types are accepted and ignored, a field of the wrong shape reads as absent, and missing
//!   or nonsensical token counts read as zero

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::timestamp_parser::TimestampParser;

/// Tool name under which Claude Code records skill invocations.
pub const SKILL_TOOL_NAME: &str = "Skill";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    User,
    Assistant,
    Progress,
    #[default]
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    #[serde(other)]
    Other,
}

/// One line of a transcript file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTranscriptEntry {
    #[serde(rename = "type", default, deserialize_with = "lenient::or_default")]
    pub kind: EntryKind,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub uuid: Option<String>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub parent_uuid: Option<String>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub timestamp: Option<String>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub session_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub cwd: Option<String>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub version: Option<String>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub git_branch: Option<String>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub slug: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::or_default",
        skip_serializing_if = "Option::is_none"
    )]
    pub message: Option<MessagePayload>,
}

impl RawTranscriptEntry {
    /// Content blocks of the message payload, empty for plain-text or missing messages.
    pub fn blocks(&self) -> &[ContentBlock] {
        match self.message.as_ref().map(|m| &m.content) {
            Some(MessageContent::Blocks(blocks)) => blocks,
            _ => &[],
        }
    }

    /// Skill names invoked by this entry via the `Skill` tool.
    pub fn skill_invocations(&self) -> impl Iterator<Item = &str> {
        self.blocks().iter().filter_map(ContentBlock::skill_name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagePayload {
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub role: Option<Role>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub content: MessageContent,
    #[serde(
        default,
        deserialize_with = "lenient::or_default",
        skip_serializing_if = "Option::is_none"
    )]
    pub model: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::or_default",
        skip_serializing_if = "Option::is_none"
    )]
    pub usage: Option<UsageRecord>,
}

/// User prompts are stored as a bare string, everything else as a block list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

impl<'de> Deserialize<'de> for MessageContent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(text) => MessageContent::Text(text),
            // Unreadable blocks become `Unknown`
            Value::Array(items) => MessageContent::Blocks(
                items
                    .into_iter()
                    .map(|item| serde_json::from_value(item).unwrap_or(ContentBlock::Unknown))
                    .collect(),
            ),
            _ => MessageContent::default(),
        })
    }
}

impl Default for MessageContent {
    fn default() -> Self {
        MessageContent::Blocks(Vec::new())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        #[serde(default, deserialize_with = "lenient::or_default")]
        text: String,
    },
    Thinking {
        #[serde(default, deserialize_with = "lenient::or_default")]
        thinking: String,
    },
    ToolUse {
        #[serde(
            default,
            deserialize_with = "lenient::or_default",
            skip_serializing_if = "Option::is_none"
        )]
        id: Option<String>,
        #[serde(default, deserialize_with = "lenient::or_default")]
        name: String,
        #[serde(default, deserialize_with = "lenient::or_default")]
        input: serde_json::Value,
    },
    ToolResult {
        #[serde(
            default,
            deserialize_with = "lenient::or_default",
            skip_serializing_if = "Option::is_none"
        )]
        tool_use_id: Option<String>,
        #[serde(default, deserialize_with = "lenient::or_default")]
        content: serde_json::Value,
        #[serde(
            default,
            deserialize_with = "lenient::or_default",
            skip_serializing_if = "Option::is_none"
        )]
        is_error: Option<bool>,
    },
    #[serde(other)]
    Unknown,
}

impl ContentBlock {
    /// Tool name for a `tool_use` block with a non-empty name.
    pub fn tool_name(&self) -> Option<&str> {
        match self {
            ContentBlock::ToolUse { name, .. } if !name.is_empty() => Some(name),
            _ => None,
        }
    }

    /// The `skill` input field of a `Skill` tool invocation.
    pub fn skill_name(&self) -> Option<&str> {
        match self {
            ContentBlock::ToolUse { name, input, .. } if name == SKILL_TOOL_NAME => input
                .get("skill")
                .and_then(serde_json::Value::as_str)
                .filter(|s| !s.is_empty()),
            _ => None,
        }
    }
}

/// Token usage as written by the API. Sub-fields may be missing, null or not a count.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    #[serde(default, deserialize_with = "lenient::token_count")]
    pub input_tokens: Option<u64>,
    #[serde(default, deserialize_with = "lenient::token_count")]
    pub output_tokens: Option<u64>,
    #[serde(default, deserialize_with = "lenient::token_count")]
    pub cache_read_input_tokens: Option<u64>,
    #[serde(default, deserialize_with = "lenient::token_count")]
    pub cache_creation_input_tokens: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub input: u64,
    pub output: u64,
    pub cache_read: u64,
    pub cache_creation: u64,
}

impl TokenUsage {
    pub fn add(&mut self, usage: &UsageRecord) {
        self.input += usage.input_tokens.unwrap_or(0);
        self.output += usage.output_tokens.unwrap_or(0);
        self.cache_read += usage.cache_read_input_tokens.unwrap_or(0);
        self.cache_creation += usage.cache_creation_input_tokens.unwrap_or(0);
    }

    /// Input plus output tokens, the figure the dashboard reports as "tokens".
    pub fn billable(&self) -> u64 {
        self.input + self.output
    }

    pub fn total(&self) -> u64 {
        self.input + self.output + self.cache_read + self.cache_creation
    }
}

/// Summary of one transcript file. A pure function of the file contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedSession {
    pub id: String,
    pub slug: String,
    pub project_path: Option<String>,
    pub git_branch: String,
    pub started_at: String,
    pub last_activity_at: String,
    pub message_count: u64,
    pub token_usage: TokenUsage,
    pub tools_used: BTreeMap<String, u64>,
    pub skills_used: BTreeMap<String, u64>,
    pub model: String,
}

impl ParsedSession {
    pub fn started(&self) -> Option<DateTime<Utc>> {
        TimestampParser::parse(&self.started_at).ok()
    }

    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        TimestampParser::parse(&self.last_activity_at).ok()
    }
}

/// A session together with its full message list, for the transcript view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionDetail {
    pub session: ParsedSession,
    pub messages: Vec<RawTranscriptEntry>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ModelUsage {
    pub tokens: u64,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectUsage {
    pub path: String,
    pub cost: f64,
    pub sessions: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayUsage {
    pub date: String,
    pub tokens: u64,
    pub cost: f64,
    pub sessions: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStats {
    pub total_cost: f64,
    pub total_tokens: u64,
    pub session_count: u64,
    pub by_model: BTreeMap<String, ModelUsage>,
    pub by_project: Vec<ProjectUsage>,
    pub by_day: Vec<DayUsage>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillUsageRecord {
    pub count: u64,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl SkillUsageRecord {
    pub fn record(&mut self, at: DateTime<Utc>) {
        self.count += 1;
        if self.last_used_at.map_or(true, |last| at > last) {
            self.last_used_at = Some(at);
        }
    }
}

/// Skill description supplied by the skill-discovery layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillMetadata {
    pub id: String,
    pub name: String,
    pub plugin: String,
    pub path: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub triggers: Vec<String>,
}

/// Skill metadata with usage attached.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    #[serde(flatten)]
    pub metadata: SkillMetadata,
    pub usage_count: u64,
    pub last_used_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TimePeriod {
    /// Since local midnight
    Today,
    /// Rolling seven days
    #[default]
    Week,
    /// Rolling thirty days
    Month,
    /// No filtering
    All,
}

impl TimePeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimePeriod::Today => "today",
            TimePeriod::Week => "week",
            TimePeriod::Month => "month",
            TimePeriod::All => "all",
        }
    }
}

impl fmt::Display for TimePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimePeriod {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "today" => Ok(TimePeriod::Today),
            "week" => Ok(TimePeriod::Week),
            "month" => Ok(TimePeriod::Month),
            "all" => Ok(TimePeriod::All),
            other => anyhow::bail!(
                "Invalid period '{}'. Use: today, week, month, or all",
                other
            ),
        }
    }
}

/// Field deserializers that accept any well-formed JSON value.
mod lenient {
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// The field's value, or its default when it has an unexpected shape.
    pub fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned + Default,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(serde_json::from_value(value).unwrap_or_default())
    }

    /// Non-negative numbers, truncated to whole tokens. Anything else is absent.
    pub fn token_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::Number(n) => n.as_u64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && *f > 0.0)
                    .map(|f| f as u64)
            }),
            _ => None,
        })
    }
}
