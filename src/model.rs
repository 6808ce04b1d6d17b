//! Configuration-time data model: the literal image of §3's entities as they
//! appear in the YAML document (`categories`, `connections`, `command_sets`,
//! `access_lists`, `final`, `admins`).
#![allow(dead_code)]

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A UI-level grouping of command sets. When `is_mutex` is set, at most one
/// member set is "current" per user (the user's selected style).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub order: i64,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub allow_user_switch: bool,
    #[serde(default)]
    pub default_command_set: Option<String>,
    #[serde(default = "default_true")]
    pub is_mutex: bool,
}

/// A single routable command, scoped to the command set that declares it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    /// Canonical name; always begins with `/`.
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_privileged: bool,
    #[serde(default)]
    pub time_restriction: Option<TimeRange>,
    #[serde(default)]
    pub group_restriction: Vec<i64>,
    #[serde(default)]
    pub user_whitelist: Vec<i64>,
    #[serde(default)]
    pub user_blacklist: Vec<i64>,
}

impl Command {
    /// Does `token` (already stripped of its leading `/`... no — `token`
    /// includes the leading `/`) match this command's name or any alias?
    pub fn matches(&self, token: &str) -> bool {
        self.name.eq_ignore_ascii_case(token) || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(token))
    }
}

/// Wall-clock local-time window, inclusive, wrapping around midnight when
/// `start > end`. On the wire, `start`/`end` are plain `"HH:MM"` strings
/// (matching the hand-editable config format), not `[hour, minute]` pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: (u32, u32),
    pub end: (u32, u32),
}

#[derive(Serialize, Deserialize)]
struct TimeRangeWire {
    start: String,
    end: String,
}

fn parse_hm(s: &str) -> Result<(u32, u32), String> {
    let (h, m) = s
        .split_once(':')
        .ok_or_else(|| format!("invalid time '{s}', expected \"HH:MM\""))?;
    let hour: u32 = h.parse().map_err(|_| format!("invalid hour in '{s}'"))?;
    let minute: u32 = m.parse().map_err(|_| format!("invalid minute in '{s}'"))?;
    if hour > 23 || minute > 59 {
        return Err(format!("time '{s}' out of range"));
    }
    Ok((hour, minute))
}

impl Serialize for TimeRange {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        TimeRangeWire {
            start: format!("{:02}:{:02}", self.start.0, self.start.1),
            end: format!("{:02}:{:02}", self.end.0, self.end.1),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TimeRange {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let wire = TimeRangeWire::deserialize(deserializer)?;
        let start = parse_hm(&wire.start).map_err(serde::de::Error::custom)?;
        let end = parse_hm(&wire.end).map_err(serde::de::Error::custom)?;
        Ok(TimeRange { start, end })
    }
}

impl TimeRange {
    /// Whether `(hour, minute)` falls within this window.
    pub fn contains(&self, now: (u32, u32)) -> bool {
        if self.start <= self.end {
            now >= self.start && now <= self.end
        } else {
            // Wraps midnight, e.g. 22:00-06:00.
            now >= self.start || now <= self.end
        }
    }

    pub fn display(&self) -> String {
        format!(
            "{:02}:{:02} - {:02}:{:02}",
            self.start.0, self.start.1, self.end.0, self.end.1
        )
    }
}

/// A named bundle of commands routed to one downstream target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSet {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_public: bool,
    pub target_ws: String,
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub strip_prefix: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub user_access_list: Option<String>,
    #[serde(default)]
    pub group_access_list: Option<String>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub commands: Vec<Command>,
}

impl CommandSet {
    /// Find a command within this set by name or alias.
    pub fn find_command(&self, token: &str) -> Option<&Command> {
        self.commands.iter().find(|c| c.matches(token))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessListType {
    User,
    Group,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessListMode {
    Whitelist,
    Blacklist,
}

/// A whitelist or blacklist of user ids or group ids, referenced by command
/// sets for bulk gating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessList {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AccessListType,
    pub mode: AccessListMode,
    #[serde(default)]
    pub items: Vec<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FinalAction {
    Reject,
    Allow,
    Forward,
}

impl Default for FinalAction {
    fn default() -> Self {
        Self::Reject
    }
}

/// The catch-all rule applied to messages that don't parse as a command or
/// don't match any set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalRuleConfig {
    #[serde(default)]
    pub action: FinalAction,
    #[serde(default = "default_true")]
    pub send_message: bool,
    #[serde(default = "default_unknown_command_message")]
    pub message: Option<String>,
    #[serde(default)]
    pub target_ws: Option<String>,
}

fn default_unknown_command_message() -> Option<String> {
    Some("未知指令".to_string())
}

impl Default for FinalRuleConfig {
    fn default() -> Self {
        Self {
            action: FinalAction::Reject,
            send_message: true,
            message: default_unknown_command_message(),
            target_ws: None,
        }
    }
}

/// Static configuration for one outbound downstream link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_true")]
    pub auto_reconnect: bool,
    #[serde(default = "default_reconnect_interval")]
    pub reconnect_interval: u64,
    #[serde(default)]
    pub allow_forward: bool,
}

fn default_reconnect_interval() -> u64 {
    5
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// `self_id` stamped onto outbound lifecycle events and forwarded
    /// envelopes; also sent as `X-Self-ID` on outbound connect.
    #[serde(default)]
    pub self_id: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            self_id: 0,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "sqlite://gateway.db".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

/// The whole YAML document: `server, database, logging, categories,
/// connections, command_sets, access_lists, final, admins`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub connections: Vec<ConnectionConfig>,
    #[serde(default)]
    pub command_sets: Vec<CommandSet>,
    #[serde(default)]
    pub access_lists: Vec<AccessList>,
    #[serde(rename = "final", default)]
    pub final_rule: FinalRuleConfig,
    #[serde(default)]
    pub admins: Vec<i64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
            categories: Vec::new(),
            connections: Vec::new(),
            command_sets: Vec::new(),
            access_lists: Vec::new(),
            final_rule: FinalRuleConfig::default(),
            admins: Vec::new(),
        }
    }
}

/// Map of category id to the display names used by `/list` and `/style`.
pub fn category_lookup(categories: &[Category]) -> HashMap<&str, &Category> {
    categories.iter().map(|c| (c.id.as_str(), c)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_range_handles_midnight_wrap() {
        let r = TimeRange {
            start: (22, 0),
            end: (6, 0),
        };
        assert!(r.contains((23, 30)));
        assert!(r.contains((0, 0)));
        assert!(r.contains((5, 59)));
        assert!(!r.contains((12, 0)));
    }

    #[test]
    fn time_range_handles_normal_window() {
        let r = TimeRange {
            start: (9, 0),
            end: (17, 0),
        };
        assert!(r.contains((12, 0)));
        assert!(!r.contains((20, 0)));
    }

    #[test]
    fn time_range_deserializes_from_hh_mm_strings() {
        let r: TimeRange = serde_json::from_str(r#"{"start":"22:00","end":"06:00"}"#).unwrap();
        assert_eq!(r.start, (22, 0));
        assert_eq!(r.end, (6, 0));
    }

    #[test]
    fn time_range_rejects_malformed_string() {
        let result: Result<TimeRange, _> = serde_json::from_str(r#"{"start":"25:00","end":"06:00"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn final_rule_config_default_replies_with_unknown_command_message() {
        let rule = FinalRuleConfig::default();
        assert_eq!(rule.action, FinalAction::Reject);
        assert!(rule.send_message);
        assert_eq!(rule.message.as_deref(), Some("未知指令"));
    }

    #[test]
    fn command_matches_name_or_alias_case_insensitively() {
        let cmd = Command {
            name: "/chat".to_string(),
            aliases: vec!["/c".to_string()],
            description: String::new(),
            is_privileged: false,
            time_restriction: None,
            group_restriction: vec![],
            user_whitelist: vec![],
            user_blacklist: vec![],
        };
        assert!(cmd.matches("/chat"));
        assert!(cmd.matches("/CHAT"));
        assert!(cmd.matches("/c"));
        assert!(!cmd.matches("/other"));
    }
}
