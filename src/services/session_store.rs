//! Session store autorevole per l'area studenti

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::HeaderMap;

use crate::db::{self, DbPool};
use crate::error::AuthError;
use crate::models::SessionRecord;
use crate::utils::{cookie_header, extract_session_token, verify_signed_token};

/// Variabili richieste per costruire lo store
#[derive(Clone, PartialEq, Eq)]
pub struct AuthEnv {
    pub google_client_id: String,
    pub google_client_secret: String,
    pub better_auth_secret: String,
    pub better_auth_url: String,
}

impl std::fmt::Debug for AuthEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthEnv")
            .field("google_client_id", &self.google_client_id)
            .field("better_auth_url", &self.better_auth_url)
            .finish_non_exhaustive()
    }
}

impl AuthEnv {
    /// Estrae le variabili dai binding, segnalando la prima mancante
    pub fn from_vars(vars: &crate::config::EnvVars) -> Result<Self, AuthError> {
        fn required(
            value: &Option<String>,
            name: &'static str,
        ) -> Result<String, AuthError> {
            value.clone().ok_or(AuthError::MissingConfig(name))
        }

        Ok(Self {
            google_client_id: required(&vars.google_client_id, "GOOGLE_CLIENT_ID")?,
            google_client_secret: required(&vars.google_client_secret, "GOOGLE_CLIENT_SECRET")?,
            better_auth_secret: required(&vars.better_auth_secret, "BETTER_AUTH_SECRET")?,
            better_auth_url: required(&vars.better_auth_url, "BETTER_AUTH_URL")?,
        })
    }
}

/// Configurazione passata alla factory dello store
#[derive(Debug, Clone)]
pub struct SessionStoreConfig {
    pub db: DbPool,
    pub env: AuthEnv,
}

/// Lookup di sessione a partire dagli header della richiesta
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get_session(&self, headers: &HeaderMap) -> Result<Option<SessionRecord>, AuthError>;
}

/// Costruisce uno store per richiesta
pub trait SessionStoreFactory: Send + Sync {
    fn create(&self, config: SessionStoreConfig) -> Result<Arc<dyn SessionStore>, AuthError>;
}

/// Store su SQLite con cookie firmato HMAC
pub struct SqlSessionStore {
    db: DbPool,
    secret: String,
}

impl SqlSessionStore {
    pub fn new(config: SessionStoreConfig) -> Self {
        Self {
            db: config.db,
            secret: config.env.better_auth_secret,
        }
    }
}

#[async_trait]
impl SessionStore for SqlSessionStore {
    async fn get_session(&self, headers: &HeaderMap) -> Result<Option<SessionRecord>, AuthError> {
        let cookies = cookie_header(headers);
        let Some(cookie_value) = extract_session_token(cookies.as_deref()) else {
            return Ok(None);
        };

        let Some(token) = verify_signed_token(&cookie_value, &self.secret) else {
            tracing::debug!("Cookie di sessione con firma non valida");
            return Ok(None);
        };

        Ok(db::sessions::find_active_by_token(&self.db, &token).await?)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SqlSessionStoreFactory;

impl SessionStoreFactory for SqlSessionStoreFactory {
    fn create(&self, config: SessionStoreConfig) -> Result<Arc<dyn SessionStore>, AuthError> {
        if config.env.better_auth_secret.len() < 32 {
            tracing::warn!("BETTER_AUTH_SECRET più corto di 32 caratteri");
        }
        Ok(Arc::new(SqlSessionStore::new(config)))
    }
}
