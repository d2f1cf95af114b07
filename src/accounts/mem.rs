use std::collections::HashMap;

use axum::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::repo::{AccountStore, CreateAccountError, PersistenceError, RoleAssigner};
use super::repo_types::{Account, AccountStatus, NewAccount, Role};

/// In-memory account store, used by `AppState::fake()` and the unit tests.
#[derive(Default)]
pub struct MemoryAccountStore {
    accounts: Mutex<Vec<Account>>,
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn create(&self, new: NewAccount) -> Result<Account, CreateAccountError> {
        let mut accounts = self.accounts.lock().await;
        if accounts.iter().any(|a| a.email == new.email) {
            return Err(CreateAccountError::DuplicateEmail);
        }
        let now = OffsetDateTime::now_utc();
        let account = Account {
            id: Uuid::new_v4(),
            email: new.email,
            password_hash: new.password_hash,
            first_name: new.first_name,
            last_name: new.last_name,
            phone: new.phone,
            status: new.status,
            registered_by: new.registered_by,
            registration_date: now,
            created_at: now,
        };
        accounts.push(account.clone());
        Ok(account)
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<Account>> {
        let accounts = self.accounts.lock().await;
        Ok(accounts.iter().find(|a| a.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Account>> {
        let accounts = self.accounts.lock().await;
        Ok(accounts.iter().find(|a| a.id == id).cloned())
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: AccountStatus,
    ) -> Result<(), PersistenceError> {
        let mut accounts = self.accounts.lock().await;
        if let Some(account) = accounts.iter_mut().find(|a| a.id == id) {
            account.status = status;
        }
        Ok(())
    }

    async fn list_registered_by(&self, employee_id: Uuid) -> anyhow::Result<Vec<Account>> {
        let accounts = self.accounts.lock().await;
        let mut out: Vec<Account> = accounts
            .iter()
            .filter(|a| a.registered_by == Some(employee_id))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.registration_date.cmp(&a.registration_date));
        Ok(out)
    }
}

/// In-memory role table.
#[derive(Default)]
pub struct MemoryRoleAssigner {
    roles: Mutex<HashMap<Uuid, Vec<Role>>>,
}

#[async_trait]
impl RoleAssigner for MemoryRoleAssigner {
    async fn grant(&self, account_id: Uuid, role: Role) -> anyhow::Result<()> {
        let mut roles = self.roles.lock().await;
        let entry = roles.entry(account_id).or_default();
        if !entry.contains(&role) {
            entry.push(role);
        }
        Ok(())
    }

    async fn roles_of(&self, account_id: Uuid) -> anyhow::Result<Vec<Role>> {
        let roles = self.roles.lock().await;
        Ok(roles.get(&account_id).cloned().unwrap_or_default())
    }
}
