//! Users - customer-facing authentication principals.
//!
//! A user is created pending KYC, may be verified or rejected by an
//! employee, and may be deactivated and reactivated. Users are never
//! deleted.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// KYC verification state of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KycStatus {
    /// Freshly registered, documents not yet reviewed
    Pending,
    /// Identity verified by an employee
    Verified,
    /// Verification rejected
    Rejected,
}

impl KycStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            KycStatus::Pending => "pending",
            KycStatus::Verified => "verified",
            KycStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(KycStatus::Pending),
            "verified" => Some(KycStatus::Verified),
            "rejected" => Some(KycStatus::Rejected),
            _ => None,
        }
    }
}

impl fmt::Display for KycStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Role of a user principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Customer,
    Admin,
    Auditor,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Customer => "customer",
            UserRole::Admin => "admin",
            UserRole::Auditor => "auditor",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "customer" => Some(UserRole::Customer),
            "admin" => Some(UserRole::Admin),
            "auditor" => Some(UserRole::Auditor),
            _ => None,
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A registered user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Server-assigned id
    pub user_id: i64,
    pub username: String,
    /// Opaque output of a slow KDF; hashing happens outside the ledger
    pub password_hash: String,
    pub email: String,
    pub phone: Option<String>,
    pub full_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub kyc_status: KycStatus,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_active(&self) -> bool {
        self.is_active
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (user {}, kyc: {}, role: {})",
            self.username, self.user_id, self.kyc_status, self.role
        )
    }
}

/// Input for registering a user. The id and timestamps are assigned by the
/// store.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub email: String,
    pub phone: Option<String>,
    pub full_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub role: UserRole,
}

impl NewUser {
    pub fn new(username: &str, password_hash: &str, email: &str, full_name: &str) -> Self {
        Self {
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            email: email.to_string(),
            phone: None,
            full_name: full_name.to_string(),
            date_of_birth: None,
            role: UserRole::Customer,
        }
    }

    pub fn with_phone(mut self, phone: &str) -> Self {
        self.phone = Some(phone.to_string());
        self
    }

    pub fn with_date_of_birth(mut self, dob: NaiveDate) -> Self {
        self.date_of_birth = Some(dob);
        self
    }

    pub fn with_role(mut self, role: UserRole) -> Self {
        self.role = role;
        self
    }
}
