use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::password::hash_password;
use crate::error::{ApiError, FieldError};
use crate::state::AppState;

use super::dto::OnboardFarmerRequest;
use super::repo::CreateAccountError;
use super::repo_types::{Account, AccountStatus, NewAccount, Role};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn is_valid_phone(phone: &str) -> bool {
    lazy_static! {
        static ref PHONE_RE: Regex = Regex::new(r"^\+?[0-9][0-9 ()\-]{5,19}$").unwrap();
    }
    PHONE_RE.is_match(phone)
}

fn validate_onboard(input: &OnboardFarmerRequest) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if input.first_name.trim().is_empty() {
        errors.push(FieldError::new("first_name", "First name is required"));
    }
    if input.last_name.trim().is_empty() {
        errors.push(FieldError::new("last_name", "Last name is required"));
    }
    if !is_valid_email(&input.email) {
        errors.push(FieldError::new("email", "Invalid email address"));
    }
    if !is_valid_phone(&input.phone) {
        errors.push(FieldError::new("phone", "Invalid phone number"));
    }
    if input.password.len() < 8 {
        errors.push(FieldError::new("password", "Password too short"));
    }
    errors
}

/// Employee onboarding: creates a Pending farmer account and grants the
/// Farmer role. A failed grant leaves the account in place without the role.
pub async fn onboard_farmer(
    state: &AppState,
    employee_id: Uuid,
    mut input: OnboardFarmerRequest,
) -> Result<Account, ApiError> {
    input.email = input.email.trim().to_lowercase();

    let errors = validate_onboard(&input);
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let password_hash = hash_password(&input.password)?;

    let account = state
        .accounts
        .create(NewAccount {
            email: input.email,
            password_hash,
            first_name: input.first_name,
            last_name: input.last_name,
            phone: input.phone,
            status: AccountStatus::Pending,
            registered_by: Some(employee_id),
        })
        .await
        .map_err(|e| match e {
            CreateAccountError::DuplicateEmail => {
                ApiError::field("email", "email already registered")
            }
            CreateAccountError::Other(e) => ApiError::Persistence(e),
        })?;

    // The account is kept even if the grant fails; operators reconcile from
    // the log line.
    if let Err(e) = state.roles.grant(account.id, Role::Farmer).await {
        warn!(account_id = %account.id, error = %e, "farmer role grant failed; account left without role");
    }

    info!(account_id = %account.id, email = %account.email, employee_id = %employee_id, "farmer onboarded");
    Ok(account)
}

/// Farmers onboarded by this employee only, newest registration first.
pub async fn list_farmers(state: &AppState, employee_id: Uuid) -> Result<Vec<Account>, ApiError> {
    let farmers = state.accounts.list_registered_by(employee_id).await?;
    Ok(farmers)
}

/// Pending -> Active. Persists first; the activation notice is only sent
/// after the status change is durable, and a failed send never fails the
/// activation.
pub async fn activate_farmer(state: &AppState, email: &str) -> Result<Account, ApiError> {
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return Err(ApiError::bad_request("email is required"));
    }

    let mut account = state
        .accounts
        .find_by_email(&email)
        .await?
        .ok_or(ApiError::NotFound("farmer"))?;

    state
        .accounts
        .update_status(account.id, AccountStatus::Active)
        .await
        .map_err(|e| ApiError::Persistence(e.0))?;
    account.status = AccountStatus::Active;

    if let Err(e) = state
        .notifier
        .send_activation_notice(&account.email, &account.first_name)
        .await
    {
        warn!(email = %account.email, error = %e, "activation notice failed");
    }

    info!(account_id = %account.id, email = %account.email, "farmer activated");
    Ok(account)
}

/// Handler-level role guard.
pub async fn require_role(
    state: &AppState,
    account_id: Uuid,
    role: Role,
) -> Result<(), ApiError> {
    let roles = state.roles.roles_of(account_id).await?;
    if roles.contains(&role) {
        Ok(())
    } else {
        Err(ApiError::Forbidden("insufficient role"))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::async_trait;

    use super::*;
    use crate::accounts::mem::MemoryAccountStore;
    use crate::accounts::repo::{AccountStore, PersistenceError};
    use crate::notify::RecordingNotifier;

    fn onboard_input(email: &str) -> OnboardFarmerRequest {
        OnboardFarmerRequest {
            first_name: "John".into(),
            last_name: "Doe".into(),
            email: email.into(),
            phone: "+27 82 555 0101".into(),
            password: "TempPass1!".into(),
        }
    }

    fn state_with_recorder() -> (AppState, Arc<RecordingNotifier>) {
        let mut state = AppState::fake();
        let recorder = Arc::new(RecordingNotifier::default());
        state.notifier = recorder.clone();
        (state, recorder)
    }

    #[test]
    fn email_validation() {
        assert!(is_valid_email("farmer@test.com"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("two@at@signs.com"));
    }

    #[test]
    fn phone_validation() {
        assert!(is_valid_phone("0825550101"));
        assert!(is_valid_phone("+27 82 555 0101"));
        assert!(!is_valid_phone("phone"));
        assert!(!is_valid_phone("12"));
    }

    #[tokio::test]
    async fn onboard_creates_pending_account_with_farmer_role() {
        let (state, _) = state_with_recorder();
        let employee = Uuid::new_v4();

        let account = onboard_farmer(&state, employee, onboard_input("jane@farm.test"))
            .await
            .expect("onboarding should succeed");

        assert_eq!(account.status, AccountStatus::Pending);
        assert_eq!(account.registered_by, Some(employee));
        let roles = state.roles.roles_of(account.id).await.unwrap();
        assert_eq!(roles, vec![Role::Farmer]);
    }

    #[tokio::test]
    async fn onboard_rejects_malformed_fields_without_creating_account() {
        let (state, _) = state_with_recorder();
        let mut input = onboard_input("bad-email");
        input.phone = "nope".into();

        let err = onboard_farmer(&state, Uuid::new_v4(), input)
            .await
            .unwrap_err();

        match err {
            ApiError::Validation(fields) => {
                let names: Vec<_> = fields.iter().map(|f| f.field).collect();
                assert!(names.contains(&"email"));
                assert!(names.contains(&"phone"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(state
            .accounts
            .find_by_email("bad-email")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn onboard_duplicate_email_is_validation_error_and_grants_nothing() {
        let (state, _) = state_with_recorder();
        let employee = Uuid::new_v4();

        let first = onboard_farmer(&state, employee, onboard_input("dup@farm.test"))
            .await
            .expect("first onboarding should succeed");

        let err = onboard_farmer(&state, employee, onboard_input("dup@farm.test"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        // The original account is untouched and still holds exactly one role.
        let roles = state.roles.roles_of(first.id).await.unwrap();
        assert_eq!(roles.len(), 1);
    }

    #[tokio::test]
    async fn onboard_survives_role_grant_failure() {
        struct RefusingAssigner;

        #[async_trait]
        impl crate::accounts::repo::RoleAssigner for RefusingAssigner {
            async fn grant(&self, _: Uuid, _: Role) -> anyhow::Result<()> {
                anyhow::bail!("role backend down")
            }
            async fn roles_of(&self, _: Uuid) -> anyhow::Result<Vec<Role>> {
                Ok(Vec::new())
            }
        }

        let (mut state, _) = state_with_recorder();
        state.roles = Arc::new(RefusingAssigner);

        let account = onboard_farmer(&state, Uuid::new_v4(), onboard_input("orphan@farm.test"))
            .await
            .expect("account creation should still succeed");

        // Account exists, role-less.
        assert!(state
            .accounts
            .find_by_id(account.id)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn list_farmers_is_scoped_to_the_registering_employee() {
        let (state, _) = state_with_recorder();
        let employee_a = Uuid::new_v4();
        let employee_b = Uuid::new_v4();

        onboard_farmer(&state, employee_a, onboard_input("a1@farm.test"))
            .await
            .unwrap();
        onboard_farmer(&state, employee_a, onboard_input("a2@farm.test"))
            .await
            .unwrap();
        onboard_farmer(&state, employee_b, onboard_input("b1@farm.test"))
            .await
            .unwrap();

        let for_a = list_farmers(&state, employee_a).await.unwrap();
        assert_eq!(for_a.len(), 2);
        assert!(for_a.iter().all(|f| f.registered_by == Some(employee_a)));
        assert!(for_a.iter().all(|f| f.email != "b1@farm.test"));
    }

    #[tokio::test]
    async fn activate_transitions_pending_to_active_with_one_notice() {
        let (state, recorder) = state_with_recorder();
        let employee = Uuid::new_v4();
        onboard_farmer(&state, employee, onboard_input("farmer@test.com"))
            .await
            .unwrap();

        let activated = activate_farmer(&state, "farmer@test.com").await.unwrap();
        assert_eq!(activated.status, AccountStatus::Active);

        let stored = state
            .accounts
            .find_by_email("farmer@test.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, AccountStatus::Active);

        let sent = recorder.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0], "farmer@test.com");
    }

    #[tokio::test]
    async fn activate_unknown_email_is_not_found_and_sends_nothing() {
        let (state, recorder) = state_with_recorder();

        let err = activate_farmer(&state, "ghost@test.com").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
        assert!(recorder.sent().await.is_empty());
    }

    #[tokio::test]
    async fn activate_empty_email_is_bad_request() {
        let (state, recorder) = state_with_recorder();

        let err = activate_farmer(&state, "  ").await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
        assert!(recorder.sent().await.is_empty());
    }

    #[tokio::test]
    async fn activate_persistence_failure_keeps_pending_and_sends_nothing() {
        struct FailingStatusStore(MemoryAccountStore);

        #[async_trait]
        impl AccountStore for FailingStatusStore {
            async fn create(
                &self,
                new: crate::accounts::repo_types::NewAccount,
            ) -> Result<Account, CreateAccountError> {
                self.0.create(new).await
            }
            async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<Account>> {
                self.0.find_by_email(email).await
            }
            async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Account>> {
                self.0.find_by_id(id).await
            }
            async fn update_status(
                &self,
                _: Uuid,
                _: AccountStatus,
            ) -> Result<(), PersistenceError> {
                Err(PersistenceError(anyhow::anyhow!("write failed")))
            }
            async fn list_registered_by(&self, id: Uuid) -> anyhow::Result<Vec<Account>> {
                self.0.list_registered_by(id).await
            }
        }

        let (mut state, recorder) = state_with_recorder();
        state.accounts = Arc::new(FailingStatusStore(MemoryAccountStore::default()));
        onboard_farmer(&state, Uuid::new_v4(), onboard_input("stuck@farm.test"))
            .await
            .unwrap();

        let err = activate_farmer(&state, "stuck@farm.test").await.unwrap_err();
        assert!(matches!(err, ApiError::Persistence(_)));

        let stored = state
            .accounts
            .find_by_email("stuck@farm.test")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, AccountStatus::Pending);
        assert!(recorder.sent().await.is_empty());
    }

    #[tokio::test]
    async fn require_role_rejects_missing_role() {
        let (state, _) = state_with_recorder();
        let account = onboard_farmer(&state, Uuid::new_v4(), onboard_input("role@farm.test"))
            .await
            .unwrap();

        assert!(require_role(&state, account.id, Role::Farmer).await.is_ok());
        let err = require_role(&state, account.id, Role::Employee)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }
}
