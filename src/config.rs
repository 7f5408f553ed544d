use std::fmt;
use std::sync::Arc;

use crate::db::DbPool;
use crate::services::session_cache::{MemorySessionCache, SessionCache};

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Salta la validazione esterna su /portal e /student
    pub dev_mode: bool,
    pub session_cache: SessionCacheMode,
    pub env: EnvVars,
}

/// Backend della cache sessioni (`SESSION_CACHE`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCacheMode {
    Off,
    Memory,
}

/// Variabili d'ambiente lette dai collaboratori di autenticazione.
///
/// I nomi delle variabili fanno parte del contratto di deploy.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct EnvVars {
    pub cf_access_team_domain: Option<String>,
    pub cf_access_aud: Option<String>,
    pub google_client_id: Option<String>,
    pub google_client_secret: Option<String>,
    pub better_auth_secret: Option<String>,
    pub better_auth_url: Option<String>,
}

// I segreti non finiscono nei log
impl fmt::Debug for EnvVars {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<impostato>");
        f.debug_struct("EnvVars")
            .field("cf_access_team_domain", &self.cf_access_team_domain)
            .field("cf_access_aud", &self.cf_access_aud)
            .field("google_client_id", &self.google_client_id)
            .field("google_client_secret", &redact(&self.google_client_secret))
            .field("better_auth_secret", &redact(&self.better_auth_secret))
            .field("better_auth_url", &self.better_auth_url)
            .finish()
    }
}

impl EnvVars {
    pub fn from_env() -> Self {
        Self {
            cf_access_team_domain: non_empty_var("CF_ACCESS_TEAM_DOMAIN"),
            cf_access_aud: non_empty_var("CF_ACCESS_AUD"),
            google_client_id: non_empty_var("GOOGLE_CLIENT_ID"),
            google_client_secret: non_empty_var("GOOGLE_CLIENT_SECRET"),
            better_auth_secret: non_empty_var("BETTER_AUTH_SECRET"),
            better_auth_url: non_empty_var("BETTER_AUTH_URL"),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 4321,
            database_url: "sqlite:portal.db?mode=rwc".to_string(),
            dev_mode: false,
            session_cache: SessionCacheMode::Off,
            env: EnvVars::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("PORTAL_HOST") {
            config.host = host;
        }

        if let Ok(port) = std::env::var("PORTAL_PORT") {
            if let Ok(p) = port.parse() {
                config.port = p;
            }
        }

        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database_url = url;
        }

        if let Ok(dev) = std::env::var("PORTAL_DEV_MODE") {
            config.dev_mode = parse_flag(&dev);
        }

        if let Ok(cache) = std::env::var("SESSION_CACHE") {
            config.session_cache = match cache.trim().to_lowercase().as_str() {
                "memory" | "1" | "true" => SessionCacheMode::Memory,
                _ => SessionCacheMode::Off,
            };
        }

        config.env = EnvVars::from_env();

        config
    }

    /// Istanzia la cache sessioni configurata, se presente
    pub fn build_session_cache(&self) -> Option<Arc<MemorySessionCache>> {
        match self.session_cache {
            SessionCacheMode::Memory => Some(Arc::new(MemorySessionCache::new())),
            SessionCacheMode::Off => None,
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Binding di runtime disponibili per ogni richiesta
#[derive(Clone, Default)]
pub struct EnvBindings {
    pub vars: EnvVars,
    /// Database delle sessioni (`PORTAL_DB`)
    pub portal_db: Option<DbPool>,
    /// Cache opzionale delle sessioni (`SESSION_CACHE`)
    pub session_cache: Option<Arc<dyn SessionCache>>,
}

impl fmt::Debug for EnvBindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvBindings")
            .field("vars", &self.vars)
            .field("portal_db", &self.portal_db.is_some())
            .field("session_cache", &self.session_cache.is_some())
            .finish()
    }
}

/// Contesto passato esplicitamente al classificatore
#[derive(Clone, Debug, Default)]
pub struct RuntimeContext {
    pub dev_mode: bool,
    pub env: EnvBindings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("1"));
        assert!(parse_flag("TRUE"));
        assert!(parse_flag(" yes "));
        assert!(!parse_flag("0"));
        assert!(!parse_flag(""));
        assert!(!parse_flag("development"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let vars = EnvVars {
            google_client_secret: Some("super-secret".to_string()),
            better_auth_secret: Some("another-secret".to_string()),
            ..Default::default()
        };
        let printed = format!("{:?}", vars);
        assert!(!printed.contains("super-secret"));
        assert!(!printed.contains("another-secret"));
        assert!(printed.contains("<impostato>"));
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.port, 4321);
        assert!(!config.dev_mode);
        assert_eq!(config.session_cache, SessionCacheMode::Off);
        assert!(config.build_session_cache().is_none());
    }

    #[test]
    fn test_memory_cache_mode() {
        let config = Config {
            session_cache: SessionCacheMode::Memory,
            ..Default::default()
        };
        let cache = config.build_session_cache().unwrap();
        assert!(cache.is_empty());
    }
}
