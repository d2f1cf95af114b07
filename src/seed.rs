use tracing::{info, warn};

use crate::accounts::repo::CreateAccountError;
use crate::accounts::repo_types::{AccountStatus, NewAccount, Role};
use crate::auth::password::hash_password;
use crate::state::AppState;

struct DemoAccount {
    email: &'static str,
    password: &'static str,
    first_name: &'static str,
    last_name: &'static str,
    phone: &'static str,
    role: Role,
}

const DEMO_ACCOUNTS: [DemoAccount; 2] = [
    DemoAccount {
        email: "farmer@test.com",
        password: "Farmer1!",
        first_name: "John",
        last_name: "Doe",
        phone: "1234567890",
        role: Role::Farmer,
    },
    DemoAccount {
        email: "employee@test.com",
        password: "Employee123!",
        first_name: "Emma",
        last_name: "Smith",
        phone: "0987654321",
        role: Role::Employee,
    },
];

/// Idempotent demo-account seeding, run once at startup. Goes through the
/// ordinary store and role-assigner calls; reruns find the accounts and do
/// nothing.
pub async fn run(state: &AppState) -> anyhow::Result<()> {
    for demo in &DEMO_ACCOUNTS {
        if state.accounts.find_by_email(demo.email).await?.is_some() {
            continue;
        }

        let account = match state
            .accounts
            .create(NewAccount {
                email: demo.email.to_string(),
                password_hash: hash_password(demo.password)?,
                first_name: demo.first_name.to_string(),
                last_name: demo.last_name.to_string(),
                phone: demo.phone.to_string(),
                // Demo accounts are usable immediately.
                status: AccountStatus::Active,
                registered_by: None,
            })
            .await
        {
            Ok(a) => a,
            // Lost a race with a concurrently starting instance.
            Err(CreateAccountError::DuplicateEmail) => {
                warn!(email = demo.email, "demo account already exists");
                continue;
            }
            Err(CreateAccountError::Other(e)) => return Err(e),
        };

        state.roles.grant(account.id, demo.role).await?;
        info!(email = demo.email, role = ?demo.role, "demo account seeded");
    }
    Ok(())
}
