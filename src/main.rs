use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::middleware;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use portal_gate::config::{Config, EnvBindings, RuntimeContext};
use portal_gate::db;
use portal_gate::middleware::{route_auth, AuthState};
use portal_gate::routes;
use portal_gate::services::{CfAccessValidator, SessionCache, SqlSessionStoreFactory};

#[tokio::main]
async fn main() {
    // Carica variabili da .env
    dotenvy::dotenv().ok();

    // Inizializza logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "portal_gate=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Carica configurazione
    let config = Config::from_env();

    tracing::info!("Connessione al database: {}", config.database_url);

    let db_pool = match db::init_db(&config.database_url).await {
        Ok(pool) => {
            tracing::info!("Database SQLite inizializzato");
            pool
        }
        Err(e) => {
            tracing::error!("Errore inizializzazione database: {}", e);
            std::process::exit(1);
        }
    };

    let memory_cache = config.build_session_cache();
    let bindings = EnvBindings {
        vars: config.env.clone(),
        portal_db: Some(db_pool.clone()),
        session_cache: memory_cache
            .clone()
            .map(|cache| cache as Arc<dyn SessionCache>),
    };

    let http = match reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("Errore creazione client HTTP: {}", e);
            std::process::exit(1);
        }
    };

    // Auth state per middleware
    let auth_state = AuthState {
        ctx: Arc::new(RuntimeContext {
            dev_mode: config.dev_mode,
            env: bindings.clone(),
        }),
        validator: Arc::new(CfAccessValidator::new()),
        sessions: Arc::new(SqlSessionStoreFactory),
    };

    let app = routes::create_router(bindings, http)
        .layer(middleware::from_fn_with_state(auth_state, route_auth))
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = match format!("{}:{}", config.host, config.port).parse() {
        Ok(addr) => addr,
        Err(e) => {
            tracing::error!("Indirizzo non valido {}:{}: {}", config.host, config.port, e);
            std::process::exit(1);
        }
    };

    tracing::info!("========================================");
    tracing::info!("  Portal Gate v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("========================================");
    tracing::info!("Server: http://{}", addr);
    tracing::info!("----------------------------------------");
    tracing::info!("Corsie:");
    tracing::info!("  /portal/*   - Sponsor (Cloudflare Access)");
    tracing::info!("  /student/*  - Studenti (sessione Google)");
    tracing::info!("  altro       - Pubblico");
    tracing::info!("----------------------------------------");
    tracing::info!("Endpoints Auth:");
    tracing::info!("  GET  /api/auth/sign-in/social - Login con Google");
    tracing::info!("  GET  /api/auth/callback/google- Callback OAuth");
    tracing::info!("  POST /api/auth/sign-out       - Logout");
    tracing::info!("  GET  /api/auth/get-session    - Sessione corrente");
    tracing::info!("----------------------------------------");
    if config.dev_mode {
        tracing::warn!("DEV MODE ATTIVO: /portal e /student ricevono identità fittizie");
    }
    if config.env.cf_access_team_domain.is_none() || config.env.cf_access_aud.is_none() {
        tracing::warn!("Cloudflare Access: NON configurato (imposta CF_ACCESS_TEAM_DOMAIN e CF_ACCESS_AUD)");
    }
    if config.env.google_client_id.is_some() {
        tracing::info!("Google OAuth: Configurato");
    } else {
        tracing::warn!("Google OAuth: NON configurato (imposta GOOGLE_CLIENT_ID)");
    }
    match &memory_cache {
        Some(_) => tracing::info!("Cache sessioni: memoria"),
        None => tracing::info!("Cache sessioni: disattivata"),
    }

    // Task background per sessioni scadute (ogni ora)
    let cleanup_pool = db_pool.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            tracing::info!("Avvio cleanup sessioni scadute...");
            match db::sessions::cleanup_expired(&cleanup_pool).await {
                Ok(count) => tracing::info!("Cleanup completato: {} sessioni eliminate", count),
                Err(e) => tracing::error!("Errore cleanup: {}", e),
            }
            if let Some(cache) = &memory_cache {
                let purged = cache.purge_expired();
                tracing::debug!("Cache sessioni: {} voci scadute rimosse", purged);
            }
        }
    });

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Impossibile aprire {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Errore server: {}", e);
        std::process::exit(1);
    }
}
