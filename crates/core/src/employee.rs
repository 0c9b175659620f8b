//! Employees - the back-office authentication principal.
//!
//! Employees are distinct from users: they never own accounts and they are
//! the only principals allowed to run the privileged admin operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Department an employee belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Department {
    Admin,
    Operations,
    Support,
    Audit,
}

impl Department {
    pub fn as_str(&self) -> &'static str {
        match self {
            Department::Admin => "admin",
            Department::Operations => "operations",
            Department::Support => "support",
            Department::Audit => "audit",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Department::Admin),
            "operations" => Some(Department::Operations),
            "support" => Some(Department::Support),
            "audit" => Some(Department::Audit),
            _ => None,
        }
    }
}

impl fmt::Display for Department {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A bank employee.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    /// Opaque employee id (EMP1001, ...)
    pub employee_id: String,
    pub password_hash: String,
    pub full_name: String,
    pub email: String,
    pub department: Department,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl fmt::Display for Employee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, {})",
            self.full_name, self.employee_id, self.department
        )
    }
}

/// Input for provisioning an employee.
#[derive(Debug, Clone)]
pub struct NewEmployee {
    pub employee_id: String,
    pub password_hash: String,
    pub full_name: String,
    pub email: String,
    pub department: Department,
}

impl NewEmployee {
    pub fn new(
        employee_id: &str,
        password_hash: &str,
        full_name: &str,
        email: &str,
        department: Department,
    ) -> Self {
        Self {
            employee_id: employee_id.to_string(),
            password_hash: password_hash.to_string(),
            full_name: full_name.to_string(),
            email: email.to_string(),
            department,
        }
    }
}
