use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use crate::web::pages::{self, Notice, Page};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    LocationNotFound(String),

    #[error("This email is already registered.")]
    EmailTaken,

    #[error("Invalid email or password.")]
    InvalidCredentials,

    #[error("Internal server error")]
    Internal(#[source] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::LocationNotFound(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::EmailTaken => StatusCode::CONFLICT,
            AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The inline message shown to the user. Internal details never leave the server.
    pub fn notice(&self) -> Notice {
        match self {
            AppError::Validation(_) | AppError::LocationNotFound(_) | AppError::EmailTaken => {
                Notice::warning(self.to_string())
            }
            AppError::InvalidCredentials => Notice::error(self.to_string()),
            AppError::Internal(_) => {
                Notice::error("Something went wrong. Please try again later.")
            }
        }
    }

    /// Attach the form the error should be rendered on.
    pub fn on(self, page: Page) -> PageError {
        PageError { page, error: self }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        AppError::Internal(e)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            if db.code().as_deref() == Some("23505") {
                return AppError::EmailTaken;
            }
        }
        AppError::Internal(e.into())
    }
}

/// An error together with the form it re-renders.
#[derive(Debug)]
pub struct PageError {
    pub page: Page,
    pub error: AppError,
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        if let AppError::Internal(e) = &self.error {
            error!(error = ?e, page = ?self.page, "request failed");
        }
        let status = self.error.status_code();
        let body = pages::form_page(self.page, Some(&self.error.notice()));
        (status, Html(body)).into_response()
    }
}
