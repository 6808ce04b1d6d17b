//! Persisted state boundary (§3, §7): users and the message-log audit trail.
//! The real backing store (a database) is out of scope; these traits are the
//! contract the core routing path depends on, with in-memory defaults
//! suitable for tests and single-process deployments.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreError;

/// A chat-protocol user, auto-created with defaults on first sight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub qq_id: i64,
    pub nickname: String,
    pub is_admin: bool,
    pub is_privileged: bool,
    /// `category_id -> command_set_id`, the user's current "style" per category.
    pub selected_styles: HashMap<String, String>,
    pub allowed_switch_groups: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(qq_id: i64, nickname: String, now: DateTime<Utc>) -> Self {
        Self {
            qq_id,
            nickname,
            is_admin: false,
            is_privileged: false,
            selected_styles: HashMap::new(),
            allowed_switch_groups: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStatus {
    Success,
    Rejected,
    Error,
}

impl LogStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Rejected => "rejected",
            Self::Error => "error",
        }
    }
}

/// One append-only audit row per routed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageLogEntry {
    pub user_id: i64,
    pub group_id: Option<i64>,
    pub command: String,
    pub command_set_id: Option<String>,
    pub target_ws: Option<String>,
    pub status: LogStatus,
    pub error_message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Persistence boundary for users. Implementations own their own
/// concurrency; callers never serialize per-user (§5, last-write-wins is
/// accepted).
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fetch the user row, creating it with defaults if absent, and
    /// populating `nickname` if it was previously empty.
    async fn get_or_create(&self, qq_id: i64, nickname: &str) -> Result<User, StoreError>;

    async fn get(&self, qq_id: i64) -> Result<Option<User>, StoreError>;

    /// Apply `mutate` to the current row and persist the result.
    async fn update(
        &self,
        qq_id: i64,
        mutate: Box<dyn FnOnce(&mut User) + Send>,
    ) -> Result<User, StoreError>;
}

/// Best-effort append-only audit sink. Failures to write must never fail
/// the request that produced them (§7) — callers log-and-discard the error.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn log(&self, entry: MessageLogEntry) -> Result<(), StoreError>;
}

/// In-memory `UserStore`, adequate for tests and for deployments that don't
/// need user state to survive a restart.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<i64, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn get_or_create(&self, qq_id: i64, nickname: &str) -> Result<User, StoreError> {
        let now = Utc::now();
        let mut users = self
            .users
            .write()
            .map_err(|_| StoreError::Backend("user store lock poisoned".to_string()))?;

        let user = users.entry(qq_id).or_insert_with(|| User::new(qq_id, nickname.to_string(), now));
        if user.nickname.is_empty() && !nickname.is_empty() {
            user.nickname = nickname.to_string();
            user.updated_at = now;
        }
        Ok(user.clone())
    }

    async fn get(&self, qq_id: i64) -> Result<Option<User>, StoreError> {
        let users = self
            .users
            .read()
            .map_err(|_| StoreError::Backend("user store lock poisoned".to_string()))?;
        Ok(users.get(&qq_id).cloned())
    }

    async fn update(
        &self,
        qq_id: i64,
        mutate: Box<dyn FnOnce(&mut User) + Send>,
    ) -> Result<User, StoreError> {
        let mut users = self
            .users
            .write()
            .map_err(|_| StoreError::Backend("user store lock poisoned".to_string()))?;

        let user = users
            .entry(qq_id)
            .or_insert_with(|| User::new(qq_id, String::new(), Utc::now()));
        mutate(user);
        user.updated_at = Utc::now();
        Ok(user.clone())
    }
}

/// In-memory `AuditSink`, keeps the last `capacity` rows for inspection in
/// tests and status reporting.
#[derive(Debug)]
pub struct InMemoryAuditSink {
    entries: RwLock<Vec<MessageLogEntry>>,
    capacity: usize,
}

impl InMemoryAuditSink {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            capacity,
        }
    }

    pub fn entries(&self) -> Vec<MessageLogEntry> {
        self.entries.read().map(|e| e.clone()).unwrap_or_default()
    }
}

impl Default for InMemoryAuditSink {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditSink {
    async fn log(&self, entry: MessageLogEntry) -> Result<(), StoreError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| StoreError::Backend("audit sink lock poisoned".to_string()))?;
        entries.push(entry);
        if entries.len() > self.capacity {
            let overflow = entries.len() - self.capacity;
            entries.drain(0..overflow);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_or_create_populates_nickname_once() {
        let store = InMemoryUserStore::new();
        let user = store.get_or_create(1, "alice").await.unwrap();
        assert_eq!(user.nickname, "alice");

        let same = store.get_or_create(1, "bob").await.unwrap();
        assert_eq!(same.nickname, "alice", "nickname is only populated when empty");
    }

    #[tokio::test]
    async fn update_mutates_and_persists() {
        let store = InMemoryUserStore::new();
        store.get_or_create(1, "alice").await.unwrap();
        store
            .update(1, Box::new(|u| u.is_privileged = true))
            .await
            .unwrap();
        let user = store.get(1).await.unwrap().unwrap();
        assert!(user.is_privileged);
    }

    #[tokio::test]
    async fn audit_sink_caps_capacity() {
        let sink = InMemoryAuditSink::new(2);
        for i in 0..5 {
            sink.log(MessageLogEntry {
                user_id: i,
                group_id: None,
                command: "/chat".to_string(),
                command_set_id: None,
                target_ws: None,
                status: LogStatus::Success,
                error_message: None,
                timestamp: Utc::now(),
            })
            .await
            .unwrap();
        }
        assert_eq!(sink.entries().len(), 2);
    }
}
