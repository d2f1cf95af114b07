use std::str::FromStr;

use anyhow::Context;
use axum::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use super::repo_types::{Account, AccountStatus, NewAccount, Role};

#[derive(Debug, Error)]
pub enum CreateAccountError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error("{0}")]
    Other(anyhow::Error),
}

#[derive(Debug, Error)]
#[error("persistence error: {0}")]
pub struct PersistenceError(pub anyhow::Error);

/// Identity store. Postgres in production, in-memory in tests.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn create(&self, new: NewAccount) -> Result<Account, CreateAccountError>;
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<Account>>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Account>>;
    /// Single read-modify-write; concurrent writers are last-write-wins.
    async fn update_status(&self, id: Uuid, status: AccountStatus)
        -> Result<(), PersistenceError>;
    /// Accounts onboarded by the given employee, newest registration first.
    async fn list_registered_by(&self, employee_id: Uuid) -> anyhow::Result<Vec<Account>>;
}

/// Capability assignment, separate from account creation. A grant can fail
/// after the account exists; callers decide what to do with that.
#[async_trait]
pub trait RoleAssigner: Send + Sync {
    async fn grant(&self, account_id: Uuid, role: Role) -> anyhow::Result<()>;
    async fn roles_of(&self, account_id: Uuid) -> anyhow::Result<Vec<Role>>;
}

#[derive(Clone)]
pub struct PgAccountStore {
    db: PgPool,
}

impl PgAccountStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn create(&self, new: NewAccount) -> Result<Account, CreateAccountError> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (id, email, password_hash, first_name, last_name, phone,
                                  status, registered_by, registration_date, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, now(), now())
            RETURNING id, email, password_hash, first_name, last_name, phone,
                      status, registered_by, registration_date, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(&new.first_name)
        .bind(&new.last_name)
        .bind(&new.phone)
        .bind(new.status)
        .bind(new.registered_by)
        .fetch_one(&self.db)
        .await
        .map_err(|e| {
            if e.as_database_error()
                .map(|d| d.is_unique_violation())
                .unwrap_or(false)
            {
                CreateAccountError::DuplicateEmail
            } else {
                CreateAccountError::Other(anyhow::Error::new(e).context("insert account"))
            }
        })?;
        Ok(account)
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, email, password_hash, first_name, last_name, phone,
                   status, registered_by, registration_date, created_at
            FROM accounts
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("find account by email")?;
        Ok(account)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, email, password_hash, first_name, last_name, phone,
                   status, registered_by, registration_date, created_at
            FROM accounts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find account by id")?;
        Ok(account)
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: AccountStatus,
    ) -> Result<(), PersistenceError> {
        sqlx::query("UPDATE accounts SET status = $1 WHERE id = $2")
            .bind(status)
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(|e| PersistenceError(anyhow::Error::new(e).context("update account status")))?;
        Ok(())
    }

    async fn list_registered_by(&self, employee_id: Uuid) -> anyhow::Result<Vec<Account>> {
        let accounts = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, email, password_hash, first_name, last_name, phone,
                   status, registered_by, registration_date, created_at
            FROM accounts
            WHERE registered_by = $1
            ORDER BY registration_date DESC
            "#,
        )
        .bind(employee_id)
        .fetch_all(&self.db)
        .await
        .context("list accounts by registering employee")?;
        Ok(accounts)
    }
}

#[derive(Clone)]
pub struct PgRoleAssigner {
    db: PgPool,
}

impl PgRoleAssigner {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RoleAssigner for PgRoleAssigner {
    async fn grant(&self, account_id: Uuid, role: Role) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO account_roles (account_id, role)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(account_id)
        .bind(role.as_str())
        .execute(&self.db)
        .await
        .context("grant role")?;
        Ok(())
    }

    async fn roles_of(&self, account_id: Uuid) -> anyhow::Result<Vec<Role>> {
        let names: Vec<String> =
            sqlx::query_scalar("SELECT role FROM account_roles WHERE account_id = $1")
                .bind(account_id)
                .fetch_all(&self.db)
                .await
                .context("list roles")?;
        names.iter().map(|n| Role::from_str(n)).collect()
    }
}
