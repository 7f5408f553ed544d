use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures::FutureExt;

use crate::config::RuntimeContext;
use crate::db;
use crate::error::{AuthError, InfrastructureFailure};
use crate::models::{CachedSession, Identity, SessionRecord};
use crate::services::{
    AccessTokenValidator, AuthEnv, SessionCache, SessionStoreConfig, SessionStoreFactory,
};
use crate::utils::{cookie_header, extract_session_token};

/// Destinazione del redirect quando lo studente non ha sessione
pub const SIGN_IN_REDIRECT: &str = "/api/auth/sign-in/social?provider=google&callbackURL=/student/";

/// Durata delle voci nella cache sessioni
pub const SESSION_CACHE_TTL: Duration = Duration::from_secs(300);

pub const DEV_SPONSOR_EMAIL: &str = "dev@example.com";
pub const DEV_STUDENT_EMAIL: &str = "dev-student@example.com";
pub const DEV_STUDENT_NAME: &str = "Dev Student";

/// Corsia di autenticazione di una richiesta
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lane {
    Public,
    Portal,
    Student,
}

/// Classifica il path: funzione pura e totale, dipende solo dal prefisso
pub fn classify(path: &str) -> Lane {
    if path.starts_with("/portal") {
        Lane::Portal
    } else if path.starts_with("/student") {
        Lane::Student
    } else {
        Lane::Public
    }
}

/// Stato per il middleware di autenticazione
#[derive(Clone)]
pub struct AuthState {
    pub ctx: Arc<RuntimeContext>,
    pub validator: Arc<dyn AccessTokenValidator>,
    pub sessions: Arc<dyn SessionStoreFactory>,
}

/// Middleware a tre corsie: pubblica, portale sponsor, area studenti.
///
/// Le route pubbliche passano senza I/O. In dev mode le route protette
/// ricevono un'identità fittizia. Il portale valida il JWT Access (401 se
/// assente o non valido); l'area studenti risolve la sessione passando
/// prima dalla cache (302 verso il login senza sessione, 503 su guasto).
pub async fn route_auth(State(state): State<AuthState>, mut request: Request, next: Next) -> Response {
    match (classify(request.uri().path()), state.ctx.dev_mode) {
        (Lane::Public, _) => next.run(request).await,
        (lane, true) => {
            let identity = match lane {
                Lane::Portal => Identity::sponsor(DEV_SPONSOR_EMAIL),
                _ => Identity::student(DEV_STUDENT_EMAIL, Some(DEV_STUDENT_NAME.to_string())),
            };
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        (Lane::Portal, false) => portal_lane(&state, request, next).await,
        (Lane::Student, false) => student_lane(&state, request, next).await,
    }
}

async fn portal_lane(state: &AuthState, mut request: Request, next: Next) -> Response {
    match state.validator.validate(request.headers(), &state.ctx.env).await {
        Some(access) => {
            request
                .extensions_mut()
                .insert(Identity::sponsor(access.email));
            next.run(request).await
        }
        None => {
            // Access dovrebbe bloccare all'edge: qui c'è un errore di configurazione
            tracing::warn!(path = %request.uri().path(), "Richiesta portale senza JWT Access valido");
            (StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
        }
    }
}

enum StudentOutcome {
    Cached(Identity),
    Resolved(SessionRecord),
    NoSession,
}

async fn student_lane(state: &AuthState, mut request: Request, next: Next) -> Response {
    let token = extract_session_token(cookie_header(request.headers()).as_deref());
    let cache = state.ctx.env.session_cache.clone();

    let resolution = AssertUnwindSafe(resolve_student(
        state,
        request.headers(),
        token.as_deref(),
        cache.as_deref(),
    ))
    .catch_unwind()
    .await;

    let outcome = match resolution {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(err)) => return service_unavailable(&request, InfrastructureFailure::from(err)),
        Err(panic) => return service_unavailable(&request, InfrastructureFailure::from_panic(panic)),
    };

    match outcome {
        StudentOutcome::Cached(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        StudentOutcome::NoSession => {
            (StatusCode::FOUND, [(header::LOCATION, SIGN_IN_REDIRECT)]).into_response()
        }
        StudentOutcome::Resolved(record) => {
            request.extensions_mut().insert(record.identity());
            let response = next.run(request).await;

            if let (Some(cache), Some(token)) = (cache, token) {
                spawn_cache_write(cache, token, record.cache_entry());
            }

            response
        }
    }
}

async fn resolve_student(
    state: &AuthState,
    headers: &HeaderMap,
    token: Option<&str>,
    cache: Option<&dyn SessionCache>,
) -> Result<StudentOutcome, AuthError> {
    if let (Some(cache), Some(token)) = (cache, token) {
        if let Some(raw) = cache.get(token).await? {
            // Un `null` salvato vale come miss
            if let Some(cached) = serde_json::from_str::<Option<CachedSession>>(&raw)? {
                return Ok(StudentOutcome::Cached(cached.into_identity()));
            }
        }
    }

    let config = SessionStoreConfig {
        db: db::get_db(&state.ctx.env)?,
        env: AuthEnv::from_vars(&state.ctx.env.vars)?,
    };
    let store = state.sessions.create(config)?;

    Ok(match store.get_session(headers).await? {
        Some(record) => StudentOutcome::Resolved(record),
        None => StudentOutcome::NoSession,
    })
}

/// Scrive in cache senza bloccare la risposta; gli errori vengono ignorati.
///
/// La risposta è già costruita quando il task parte: nessuna garanzia che la
/// scrittura termini prima che il client riceva i dati.
fn spawn_cache_write(cache: Arc<dyn SessionCache>, token: String, entry: CachedSession) {
    tokio::spawn(async move {
        let Ok(value) = serde_json::to_string(&entry) else {
            return;
        };
        if let Err(e) = cache.put(&token, value, SESSION_CACHE_TTL).await {
            tracing::debug!("Scrittura cache sessione ignorata: {}", e);
        }
    });
}

fn service_unavailable(request: &Request, failure: InfrastructureFailure) -> Response {
    tracing::error!(
        path = %request.uri().path(),
        "Risoluzione sessione studente fallita: {}",
        failure
    );
    (StatusCode::SERVICE_UNAVAILABLE, "Service Unavailable").into_response()
}
