use std::net::{IpAddr, SocketAddr};

use axum::{
    extract::{ConnectInfo, State},
    http::{HeaderMap, StatusCode},
    response::Html,
    routing::get,
    Form, Router,
};
use tracing::instrument;

use super::dto::{LoginForm, RegisterForm};
use super::services;
use crate::error::PageError;
use crate::state::AppState;
use crate::web::pages::{self, Notice, Page};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(login_page))
        .route("/login", get(login_page).post(login))
        .route("/register", get(register_page).post(register))
}

pub async fn login_page() -> Html<String> {
    Html(pages::form_page(Page::Login, None))
}

pub async fn register_page() -> Html<String> {
    Html(pages::form_page(Page::Register, None))
}

#[instrument(skip(state, form), fields(email = %form.email))]
pub async fn register(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> Result<(StatusCode, Html<String>), PageError> {
    services::register(&state, form)
        .await
        .map_err(|e| e.on(Page::Register))?;

    let notice = Notice::success("Registration successful! You can now log in.");
    Ok((
        StatusCode::CREATED,
        Html(pages::form_page(Page::Login, Some(&notice))),
    ))
}

#[instrument(skip(state, headers, connect_info, form), fields(email = %form.email))]
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    Form(form): Form<LoginForm>,
) -> Result<Html<String>, PageError> {
    let ip = caller_ip(
        &headers,
        connect_info.map(|ConnectInfo(addr)| addr),
        state.config.trust_forwarded_for,
    );
    let outcome = services::login(&state, form, ip)
        .await
        .map_err(|e| e.on(Page::Login))?;

    Ok(Html(pages::result_page(&state.config.geo.api_key, &outcome)))
}

/// The socket peer, or the first `X-Forwarded-For` hop when the proxy header is trusted.
fn caller_ip(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trust_forwarded_for: bool,
) -> Option<IpAddr> {
    let forwarded = || {
        headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|v| v.trim().parse::<IpAddr>().ok())
    };
    trust_forwarded_for
        .then(forwarded)
        .flatten()
        .or_else(|| peer.map(|addr| addr.ip()))
}
