use std::net::IpAddr;

use lazy_static::lazy_static;
use regex::Regex;
use time::{macros::format_description, OffsetDateTime};
use tracing::{debug, info, warn};

use super::dto::{LocationMode, LoginForm, LoginOutcome, RegisterForm};
use super::repo::UserRepo;
use super::repo_types::{NewUser, User};
use crate::auth::password::{hash_password, verify_password};
use crate::clustering::density_groups;
use crate::error::{AppError, AppResult};
use crate::geo::{distance::EARTH_RADIUS_KM, Coordinates, Geocoder};
use crate::matching::{find_nearby, MatchQuery};
use crate::state::AppState;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn format_timestamp(at: OffsetDateTime) -> String {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    at.format(format)
        .unwrap_or_else(|_| at.unix_timestamp().to_string())
}

pub async fn register(state: &AppState, mut form: RegisterForm) -> AppResult<User> {
    form.name = form.name.trim().to_string();
    form.email = form.email.trim().to_lowercase();
    form.address = form.address.trim().to_string();

    if form.name.is_empty()
        || form.email.is_empty()
        || form.password.is_empty()
        || form.address.is_empty()
    {
        return Err(AppError::validation("All fields are required for registration."));
    }
    if !is_valid_email(&form.email) {
        warn!(email = %form.email, "invalid email");
        return Err(AppError::validation("Please enter a valid email address."));
    }

    if state.users.find_by_email(&form.email).await?.is_some() {
        warn!(email = %form.email, "email already registered");
        return Err(AppError::EmailTaken);
    }

    let root = state.geocoder.geocode(&form.address).await?.ok_or_else(|| {
        AppError::LocationNotFound(
            "Could not find the specified location. Please enter a valid address.".into(),
        )
    })?;

    let password_hash = hash_password(&form.password)?;
    let user = state
        .users
        .create(NewUser {
            name: form.name,
            email: form.email,
            password_hash,
            root,
        })
        .await?;

    info!(user_id = user.id, email = %user.email, "user registered");
    Ok(user)
}

/// Returns the user only when the email exists and the password matches.
pub async fn validate_login(
    users: &dyn UserRepo,
    email: &str,
    password: &str,
) -> AppResult<Option<User>> {
    let Some(user) = users.find_by_email(email).await? else {
        warn!(%email, "login unknown email");
        return Ok(None);
    };
    if !verify_password(password, &user.password_hash)? {
        warn!(%email, user_id = user.id, "login invalid password");
        return Ok(None);
    }
    Ok(Some(user))
}

/// Persist a new current location, replacing the previous one. Returns the stored timestamp.
pub async fn update_temp_location(
    users: &dyn UserRepo,
    user: &mut User,
    location: Coordinates,
    at: OffsetDateTime,
) -> AppResult<String> {
    let stamp = format_timestamp(at);
    users
        .update_temp_location(user.id, location, &stamp)
        .await?;
    user.temp_latitude = Some(location.latitude);
    user.temp_longitude = Some(location.longitude);
    user.last_updated = Some(stamp.clone());
    Ok(stamp)
}

/// Half the Earth's circumference; any larger radius covers the whole globe.
pub(crate) const MAX_RADIUS_KM: f64 = std::f64::consts::PI * EARTH_RADIUS_KM;

pub(crate) fn parse_radius(raw: &str, default_km: f64) -> AppResult<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(default_km);
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 && v <= MAX_RADIUS_KM => Ok(v),
        _ => Err(AppError::validation(format!(
            "The radius must be a positive number of kilometers, at most {:.0}.",
            MAX_RADIUS_KM
        ))),
    }
}

async fn resolve_location(
    geocoder: &dyn Geocoder,
    mode: LocationMode,
    address: &str,
    caller_ip: Option<IpAddr>,
) -> anyhow::Result<Option<Coordinates>> {
    match mode {
        LocationMode::Manual if !address.is_empty() => geocoder.geocode(address).await,
        _ => geocoder.locate_ip(caller_ip).await,
    }
}

pub async fn login(
    state: &AppState,
    mut form: LoginForm,
    caller_ip: Option<IpAddr>,
) -> AppResult<LoginOutcome> {
    form.email = form.email.trim().to_lowercase();
    form.address = form.address.trim().to_string();

    if form.email.is_empty() || form.password.is_empty() {
        return Err(AppError::validation("Please enter both email and password."));
    }
    let radius_km = parse_radius(&form.radius_km, state.config.matching.default_radius_km)?;

    let mut user = validate_login(state.users.as_ref(), &form.email, &form.password)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let location = resolve_location(
        state.geocoder.as_ref(),
        form.location_mode,
        &form.address,
        caller_ip,
    )
    .await?
    .ok_or_else(|| {
        AppError::LocationNotFound("Could not detect your current location.".into())
    })?;

    update_temp_location(
        state.users.as_ref(),
        &mut user,
        location,
        OffsetDateTime::now_utc(),
    )
    .await?;

    let query = MatchQuery {
        temp: location,
        root: user.root_location(),
        radius_km,
        root_radius_km: state.config.matching.root_radius_km,
    };
    let candidates = state.users.list_with_temp_location().await?;
    let nearby: Vec<User> = find_nearby(candidates, &query)
        .into_iter()
        .filter(|u| u.id != user.id)
        .collect();

    let points: Vec<Coordinates> = nearby.iter().filter_map(User::temp_location).collect();
    let groups = density_groups(&points, radius_km, 2);
    debug!(matches = nearby.len(), ?groups, "nearby lookup done");

    info!(user_id = user.id, matches = nearby.len(), radius_km, "user logged in");
    Ok(LoginOutcome {
        user,
        location,
        radius_km,
        nearby,
        groups,
    })
}
