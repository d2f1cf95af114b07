use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Lifecycle status of a farmer account. Employee-onboarded farmers start
/// Pending and may not log in until an employee activates them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "account_status", rename_all = "lowercase")]
pub enum AccountStatus {
    Pending,
    Active,
}

/// Capability role attached to an account.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Farmer,
    Employee,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Farmer => "farmer",
            Role::Employee => "employee",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "farmer" => Ok(Role::Farmer),
            "employee" => Ok(Role::Employee),
            other => anyhow::bail!("unknown role: {other}"),
        }
    }
}

/// Account record in the database.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub status: AccountStatus,
    /// None for self-registered accounts, Some(employee) when onboarded.
    pub registered_by: Option<Uuid>,
    pub registration_date: OffsetDateTime,
    pub created_at: OffsetDateTime,
}

/// Input for creating an account; the store assigns id and timestamps.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub status: AccountStatus,
    pub registered_by: Option<Uuid>,
}
