use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{Account, AccountStatus};

/// Form an employee submits to onboard a farmer.
#[derive(Debug, Deserialize)]
pub struct OnboardFarmerRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    /// Temporary password handed to the farmer out of band.
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ActivateFarmerRequest {
    pub email: String,
}

/// Farmer row shown on the employee dashboard.
#[derive(Debug, Serialize)]
pub struct FarmerSummary {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub status: AccountStatus,
    pub registration_date: OffsetDateTime,
}

impl From<Account> for FarmerSummary {
    fn from(a: Account) -> Self {
        Self {
            id: a.id,
            first_name: a.first_name,
            last_name: a.last_name,
            email: a.email,
            phone: a.phone,
            status: a.status,
            registration_date: a.registration_date,
        }
    }
}
