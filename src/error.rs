use std::any::Any;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Errori dei collaboratori di autenticazione (database, cache, OAuth)
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("{0} binding not available")]
    MissingBinding(&'static str),

    #[error("Missing required auth environment variable: {0}")]
    MissingConfig(&'static str),

    #[error("Errore database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Errore cache sessioni: {0}")]
    Cache(String),

    #[error("Record di sessione in cache non valido: {0}")]
    CorruptCacheEntry(#[from] serde_json::Error),

    #[error("Errore provider OAuth: {0}")]
    Upstream(String),

    #[error("{0}")]
    Unexpected(String),
}

impl AuthError {
    /// Errori dovuti a deploy incompleto piuttosto che a guasti transitori
    pub fn is_config_error(&self) -> bool {
        matches!(self, AuthError::MissingBinding(_) | AuthError::MissingConfig(_))
    }
}

/// Fallimento opaco della corsia studenti.
///
/// Raccoglie qualsiasi errore o panic avvenuto durante la risoluzione della
/// sessione; il dettaglio resta nei log e non arriva mai al client.
#[derive(Debug)]
pub struct InfrastructureFailure {
    detail: String,
}

impl InfrastructureFailure {
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let detail = if let Some(s) = payload.downcast_ref::<&str>() {
            format!("panic: {}", s)
        } else if let Some(s) = payload.downcast_ref::<String>() {
            format!("panic: {}", s)
        } else {
            "panic con payload sconosciuto".to_string()
        };
        Self { detail }
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl From<AuthError> for InfrastructureFailure {
    fn from(err: AuthError) -> Self {
        Self {
            detail: err.to_string(),
        }
    }
}

impl std::fmt::Display for InfrastructureFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.detail)
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Non autorizzato: {0}")]
    Unauthorized(String),

    #[error("Richiesta non valida: {0}")]
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        };

        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
