//! Validazione del JWT di Cloudflare Access per le route del portale

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::http::HeaderMap;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use crate::config::EnvBindings;

/// Header con cui Cloudflare Access inoltra il token
pub const ACCESS_JWT_HEADER: &str = "Cf-Access-Jwt-Assertion";

/// Identità verificata dal validatore
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedAccess {
    pub email: String,
}

/// Validatore del token d'accesso emesso da terzi
#[async_trait]
pub trait AccessTokenValidator: Send + Sync {
    /// `None` se il token manca, non è valido o la configurazione è incompleta
    async fn validate(&self, headers: &HeaderMap, env: &EnvBindings) -> Option<VerifiedAccess>;
}

/// Errori interni di validazione: non escono dal validatore
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("Token non valido: {0}")]
    InvalidToken(String),
    #[error("Token scaduto")]
    TokenExpired,
    #[error("Issuer non valido")]
    InvalidIssuer,
    #[error("Audience non valido")]
    InvalidAudience,
    #[error("Claim email assente")]
    MissingEmail,
    #[error("Errore nel recupero delle chiavi Access: {0}")]
    KeyFetchError(String),
    #[error("Chiave non trovata: {0}")]
    KeyNotFound(String),
}

/// Chiave pubblica Access (JWK)
#[derive(Debug, Deserialize, Clone)]
pub struct AccessJwk {
    pub kid: String,
    pub n: String,
    pub e: String,
    #[serde(default)]
    pub kty: Option<String>,
    #[serde(default)]
    pub alg: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AccessJwks {
    keys: Vec<AccessJwk>,
}

#[derive(Debug, Deserialize)]
struct AccessClaims {
    email: Option<String>,
}

type KeySet = HashMap<String, AccessJwk>;

/// Validatore Cloudflare Access con cache delle chiavi per team domain
pub struct CfAccessValidator {
    client: reqwest::Client,
    keys: RwLock<HashMap<String, (KeySet, Instant)>>,
    cache_duration: Duration,
    /// Età minima del set in cache prima di un refresh forzato
    min_refresh_interval: Duration,
}

impl CfAccessValidator {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_default();

        Self {
            client,
            keys: RwLock::new(HashMap::new()),
            cache_duration: Duration::from_secs(3600), // 1 ora
            min_refresh_interval: Duration::from_secs(60),
        }
    }

    fn cached_keys(&self, certs_url: &str, max_age: Duration) -> Option<KeySet> {
        let cache = self.keys.read().unwrap_or_else(PoisonError::into_inner);
        cache
            .get(certs_url)
            .filter(|(_, fetched_at)| fetched_at.elapsed() < max_age)
            .map(|(keys, _)| keys.clone())
    }

    /// Ottiene le chiavi, fetchandole se scadute.
    ///
    /// Con `force` il set viene riscaricato solo se più vecchio di
    /// `min_refresh_interval`: un `kid` inventato non genera un fetch per
    /// ogni richiesta.
    async fn get_keys(&self, certs_url: &str, force: bool) -> Result<KeySet, AccessError> {
        let max_age = if force {
            self.min_refresh_interval
        } else {
            self.cache_duration
        };
        if let Some(keys) = self.cached_keys(certs_url, max_age) {
            return Ok(keys);
        }

        let jwks: AccessJwks = self
            .client
            .get(certs_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AccessError::KeyFetchError(e.to_string()))?
            .json()
            .await
            .map_err(|e| AccessError::KeyFetchError(e.to_string()))?;

        let keys: KeySet = jwks
            .keys
            .into_iter()
            .map(|key| (key.kid.clone(), key))
            .collect();

        self.keys
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(certs_url.to_string(), (keys.clone(), Instant::now()));

        Ok(keys)
    }

    /// Verifica il token contro le chiavi del team
    pub async fn verify(
        &self,
        token: &str,
        team_domain: &str,
        audience: &str,
    ) -> Result<VerifiedAccess, AccessError> {
        let header = decode_header(token).map_err(|e| AccessError::InvalidToken(e.to_string()))?;
        let kid = header
            .kid
            .ok_or_else(|| AccessError::InvalidToken("Token senza kid nell'header".to_string()))?;

        let issuer = team_domain.trim_end_matches('/');
        let certs_url = format!("{}/cdn-cgi/access/certs", issuer);

        // Kid sconosciuto: le chiavi potrebbero essere state ruotate
        let mut keys = self.get_keys(&certs_url, false).await?;
        if !keys.contains_key(&kid) {
            keys = self.get_keys(&certs_url, true).await?;
        }
        let jwk = keys.get(&kid).ok_or_else(|| AccessError::KeyNotFound(kid.clone()))?;

        verify_with_key(token, jwk, issuer, audience)
    }
}

impl Default for CfAccessValidator {
    fn default() -> Self {
        Self::new()
    }
}

fn verify_with_key(
    token: &str,
    jwk: &AccessJwk,
    issuer: &str,
    audience: &str,
) -> Result<VerifiedAccess, AccessError> {
    let decoding_key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e)
        .map_err(|e| AccessError::InvalidToken(e.to_string()))?;

    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_audience(&[audience]);
    validation.set_issuer(&[issuer]);

    let token_data = decode::<AccessClaims>(token, &decoding_key, &validation).map_err(|e| {
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AccessError::TokenExpired,
            jsonwebtoken::errors::ErrorKind::InvalidIssuer => AccessError::InvalidIssuer,
            jsonwebtoken::errors::ErrorKind::InvalidAudience => AccessError::InvalidAudience,
            _ => AccessError::InvalidToken(e.to_string()),
        }
    })?;

    token_data
        .claims
        .email
        .filter(|email| !email.is_empty())
        .map(|email| VerifiedAccess { email })
        .ok_or(AccessError::MissingEmail)
}

#[async_trait]
impl AccessTokenValidator for CfAccessValidator {
    async fn validate(&self, headers: &HeaderMap, env: &EnvBindings) -> Option<VerifiedAccess> {
        let token = headers
            .get(ACCESS_JWT_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())?;

        let (team_domain, audience) = match (
            env.vars.cf_access_team_domain.as_deref(),
            env.vars.cf_access_aud.as_deref(),
        ) {
            (Some(team), Some(aud)) => (team, aud),
            _ => {
                tracing::warn!("CF_ACCESS_TEAM_DOMAIN o CF_ACCESS_AUD non configurati");
                return None;
            }
        };

        match self.verify(token, team_domain, audience).await {
            Ok(access) => Some(access),
            Err(e) => {
                tracing::debug!("JWT Access rifiutato: {}", e);
                None
            }
        }
    }
}
