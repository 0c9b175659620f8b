//! Audit records - immutable who-did-what-when rows.
//!
//! Audit rows are append-only (the store rejects updates and deletes) and
//! are written in the same transaction as the mutation they describe, so
//! no audit row can exist without its change having committed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Entity a record refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityKind {
    User,
    Account,
    Transaction,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::User => "USER",
            EntityKind::Account => "ACCOUNT",
            EntityKind::Transaction => "TRANSACTION",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "USER" => Some(EntityKind::User),
            "ACCOUNT" => Some(EntityKind::Account),
            "TRANSACTION" => Some(EntityKind::Transaction),
            _ => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What happened to the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Create,
    Update,
    StatusChange,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "CREATE",
            AuditAction::Update => "UPDATE",
            AuditAction::StatusChange => "STATUS_CHANGE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CREATE" => Some(AuditAction::Create),
            "UPDATE" => Some(AuditAction::Update),
            "STATUS_CHANGE" => Some(AuditAction::StatusChange),
            _ => None,
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One committed audit row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub log_id: i64,
    pub entity_type: EntityKind,
    /// Id of the entity, stringified (user/account ids are integers,
    /// employee ids are opaque strings)
    pub entity_id: String,
    pub action: AuditAction,
    /// JSON snapshot before the change, if any
    pub old_value: Option<Value>,
    /// JSON snapshot after the change, if any
    pub new_value: Option<Value>,
    /// User id or employee id of the actor; None for the system
    pub performed_by: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}
