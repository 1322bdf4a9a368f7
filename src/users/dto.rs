use serde::Deserialize;

use crate::clustering::GroupSummary;
use crate::geo::Coordinates;
use crate::users::repo_types::User;

/// Register form body.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub address: String,
}

/// Unrecognised values fall back to auto-detect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationMode {
    Manual,
    #[default]
    #[serde(other)]
    Auto,
}

/// Login form body. `radius_km` stays text so a blank field means "use the default".
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub location_mode: LocationMode,
    pub address: String,
    pub radius_km: String,
}

/// Everything the result page needs after a successful login.
#[derive(Debug)]
pub struct LoginOutcome {
    pub user: User,
    pub location: Coordinates,
    pub radius_km: f64,
    pub nearby: Vec<User>,
    pub groups: Option<GroupSummary>,
}
