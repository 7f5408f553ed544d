use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rand::{distributions::Alphanumeric, Rng};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use crate::config::EnvBindings;
use crate::db::{self, sessions, users};
use crate::error::{AppError, AuthError};
use crate::models::SessionRecord;
use crate::services::{AuthEnv, SessionStoreConfig, SessionStoreFactory, SqlSessionStoreFactory};
use crate::utils::cookie::{session_clear_cookie, session_set_cookie};
use crate::utils::{cookie_header, extract_session_token, sign_session_token, verify_signed_token};

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";

/// Validità di uno state OAuth non ancora usato
const OAUTH_STATE_TTL: Duration = Duration::from_secs(600);

/// Login in sospeso conservati al massimo
const MAX_PENDING_SIGN_INS: usize = 10_000;

/// Login in corso, in attesa del callback Google
#[derive(Debug, Clone)]
pub struct PendingSignIn {
    pub callback_url: String,
    pub created_at: Instant,
}

/// State per le route di autenticazione
#[derive(Clone)]
pub struct AuthRouteState {
    pub bindings: EnvBindings,
    pub http: reqwest::Client,
    /// Cache per i state OAuth (CSRF protection)
    pub oauth_states: Arc<RwLock<HashMap<String, PendingSignIn>>>,
    pub max_pending: usize,
}

impl AuthRouteState {
    pub fn new(bindings: EnvBindings, http: reqwest::Client) -> Self {
        Self {
            bindings,
            http,
            oauth_states: Arc::new(RwLock::new(HashMap::new())),
            max_pending: MAX_PENDING_SIGN_INS,
        }
    }

    /// Salva un login in sospeso; oltre il limite scarta il più vecchio
    fn remember_sign_in(&self, oauth_state: String, callback_url: String) {
        let mut states = self
            .oauth_states
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        // Pulisci stati vecchi
        states.retain(|_, pending| pending.created_at.elapsed() < OAUTH_STATE_TTL);

        while states.len() >= self.max_pending.max(1) {
            let oldest = states
                .iter()
                .min_by_key(|(_, pending)| pending.created_at)
                .map(|(key, _)| key.clone());
            match oldest {
                Some(key) => states.remove(&key),
                None => break,
            };
        }

        states.insert(
            oauth_state,
            PendingSignIn {
                callback_url,
                created_at: Instant::now(),
            },
        );
    }
}

pub fn router(state: AuthRouteState) -> Router {
    Router::new()
        .route(
            "/api/auth/sign-in/social",
            get(sign_in_social).post(sign_in_social),
        )
        .route("/api/auth/callback/google", get(google_callback))
        .route("/api/auth/sign-out", post(sign_out))
        .route("/api/auth/get-session", get(get_session))
        .with_state(state)
}

/// Errori delle route `/api/auth`
#[derive(Debug)]
pub enum AuthRouteError {
    App(AppError),
    Failure(AuthError),
}

impl From<AppError> for AuthRouteError {
    fn from(err: AppError) -> Self {
        AuthRouteError::App(err)
    }
}

impl From<AuthError> for AuthRouteError {
    fn from(err: AuthError) -> Self {
        AuthRouteError::Failure(err)
    }
}

impl From<sqlx::Error> for AuthRouteError {
    fn from(err: sqlx::Error) -> Self {
        AuthRouteError::Failure(err.into())
    }
}

impl IntoResponse for AuthRouteError {
    fn into_response(self) -> Response {
        match self {
            AuthRouteError::App(err) => err.into_response(),
            AuthRouteError::Failure(err) => {
                tracing::error!("Errore auth: {}", err);
                let (status, message) = if err.is_config_error() {
                    (StatusCode::INTERNAL_SERVER_ERROR, "Auth configuration error")
                } else {
                    (StatusCode::SERVICE_UNAVAILABLE, "Auth service unavailable")
                };
                (status, Json(json!({ "error": message }))).into_response()
            }
        }
    }
}

type AuthResult<T> = std::result::Result<T, AuthRouteError>;

/// Query per l'avvio del login social
#[derive(Debug, Deserialize)]
pub struct SignInQuery {
    pub provider: Option<String>,
    #[serde(rename = "callbackURL")]
    pub callback_url: Option<String>,
}

/// Query params per callback Google
#[derive(Debug, Deserialize)]
pub struct GoogleCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Risposta token da Google
#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
    expires_in: Option<i64>,
    refresh_token: Option<String>,
    scope: Option<String>,
}

/// Accetta solo path dello stesso sito, per evitare open redirect
fn sanitize_callback(callback: Option<&str>) -> String {
    match callback {
        Some(url) if url.starts_with('/') && !url.starts_with("//") && !url.contains('\\') => {
            url.to_string()
        }
        _ => "/".to_string(),
    }
}

fn redirect_uri(env: &AuthEnv) -> String {
    format!(
        "{}/api/auth/callback/google",
        env.better_auth_url.trim_end_matches('/')
    )
}

fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// Genera stringa casuale per OAuth state
fn generate_random_state() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

/// Avvia il login con Google
pub async fn sign_in_social(
    State(state): State<AuthRouteState>,
    Query(query): Query<SignInQuery>,
) -> AuthResult<Response> {
    match query.provider.as_deref() {
        Some("google") => {}
        other => {
            return Err(AppError::BadRequest(format!(
                "Provider non supportato: {}",
                other.unwrap_or("<assente>")
            ))
            .into())
        }
    }

    let env = AuthEnv::from_vars(&state.bindings.vars)?;
    let oauth_state = generate_random_state();

    state.remember_sign_in(
        oauth_state.clone(),
        sanitize_callback(query.callback_url.as_deref()),
    );

    let url = format!(
        "{}?client_id={}&redirect_uri={}&response_type=code&scope=openid%20email%20profile&state={}&prompt=select_account",
        GOOGLE_AUTH_URL,
        urlencoding::encode(&env.google_client_id),
        urlencoding::encode(&redirect_uri(&env)),
        urlencoding::encode(&oauth_state),
    );

    Ok(found(&url))
}

fn auth_error_redirect(msg: &str) -> Response {
    found(&format!("/?auth_error={}", urlencoding::encode(msg)))
}

/// Callback da Google OAuth
pub async fn google_callback(
    State(state): State<AuthRouteState>,
    headers: HeaderMap,
    Query(query): Query<GoogleCallbackQuery>,
) -> AuthResult<Response> {
    if let Some(error) = query.error {
        return Ok(auth_error_redirect(&error));
    }

    let (Some(code), Some(oauth_state)) = (query.code, query.state) else {
        return Ok(auth_error_redirect("Missing authorization code or state"));
    };

    // Verifica CSRF state
    let pending = state
        .oauth_states
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .remove(&oauth_state);
    let Some(pending) = pending.filter(|p| p.created_at.elapsed() < OAUTH_STATE_TTL) else {
        return Ok(auth_error_redirect("Invalid state - possible CSRF attack"));
    };

    let env = AuthEnv::from_vars(&state.bindings.vars)?;
    let pool = db::get_db(&state.bindings)?;

    let token = exchange_code_for_token(&state.http, &code, &env).await?;
    let profile = get_google_profile(&state.http, &token.access_token).await?;
    let tokens = users::OAuthTokens {
        access_token: Some(token.access_token),
        refresh_token: token.refresh_token,
        expires_in: token.expires_in,
        scope: token.scope,
    };

    complete_sign_in(&pool, &env, &headers, &profile, &tokens, pending.callback_url).await
}

/// Registra l'utente, apre la sessione e imposta il cookie firmato
async fn complete_sign_in(
    pool: &db::DbPool,
    env: &AuthEnv,
    headers: &HeaderMap,
    profile: &users::GoogleProfile,
    tokens: &users::OAuthTokens,
    callback_url: String,
) -> AuthResult<Response> {
    let Some(user) = users::upsert_google_user(pool, profile, tokens).await? else {
        return Ok(auth_error_redirect("Email not verified"));
    };

    let ip_address = headers
        .get("cf-connecting-ip")
        .or_else(|| headers.get("x-forwarded-for"))
        .and_then(|v| v.to_str().ok());
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok());
    let session = sessions::create_session(pool, &user.id, ip_address, user_agent).await?;

    tracing::info!("Login studente: {}", user.email);

    let cookie = session_set_cookie(
        &sign_session_token(&session.token, &env.better_auth_secret),
        sessions::SESSION_TTL_SECS,
        env.better_auth_url.starts_with("https://"),
    );

    Ok((
        StatusCode::FOUND,
        [
            (header::LOCATION, callback_url),
            (header::SET_COOKIE, cookie),
        ],
    )
        .into_response())
}

/// Scambia authorization code per access token
async fn exchange_code_for_token(
    http: &reqwest::Client,
    code: &str,
    env: &AuthEnv,
) -> Result<GoogleTokenResponse, AuthError> {
    let redirect_uri = redirect_uri(env);
    let params = [
        ("code", code),
        ("client_id", env.google_client_id.as_str()),
        ("client_secret", env.google_client_secret.as_str()),
        ("redirect_uri", redirect_uri.as_str()),
        ("grant_type", "authorization_code"),
    ];

    let response = http
        .post(GOOGLE_TOKEN_URL)
        .form(&params)
        .send()
        .await
        .map_err(|e| AuthError::Upstream(format!("Request failed: {}", e)))?;

    if !response.status().is_success() {
        let error_text = response.text().await.unwrap_or_default();
        return Err(AuthError::Upstream(format!(
            "Token request failed: {}",
            error_text
        )));
    }

    response
        .json::<GoogleTokenResponse>()
        .await
        .map_err(|e| AuthError::Upstream(format!("Failed to parse token response: {}", e)))
}

/// Ottieni profilo utente da Google
async fn get_google_profile(
    http: &reqwest::Client,
    access_token: &str,
) -> Result<users::GoogleProfile, AuthError> {
    let response = http
        .get(GOOGLE_USERINFO_URL)
        .bearer_auth(access_token)
        .send()
        .await
        .map_err(|e| AuthError::Upstream(format!("Request failed: {}", e)))?;

    if !response.status().is_success() {
        let error_text = response.text().await.unwrap_or_default();
        return Err(AuthError::Upstream(format!(
            "User info request failed: {}",
            error_text
        )));
    }

    response
        .json::<users::GoogleProfile>()
        .await
        .map_err(|e| AuthError::Upstream(format!("Failed to parse user info: {}", e)))
}

/// Sessione corrente (`null` se assente)
pub async fn get_session(
    State(state): State<AuthRouteState>,
    headers: HeaderMap,
) -> AuthResult<Json<Option<SessionRecord>>> {
    let config = SessionStoreConfig {
        db: db::get_db(&state.bindings)?,
        env: AuthEnv::from_vars(&state.bindings.vars)?,
    };
    let store = SqlSessionStoreFactory.create(config)?;
    Ok(Json(store.get_session(&headers).await?))
}

/// Logout: elimina la sessione, svuota la cache e cancella il cookie
pub async fn sign_out(
    State(state): State<AuthRouteState>,
    headers: HeaderMap,
) -> AuthResult<Response> {
    let cookies = cookie_header(&headers);
    let cookie_value = extract_session_token(cookies.as_deref())
        .ok_or_else(|| AppError::Unauthorized("sessione assente".to_string()))?;

    let env = AuthEnv::from_vars(&state.bindings.vars)?;
    let pool = db::get_db(&state.bindings)?;

    // La cache è indicizzata sul valore grezzo del cookie: lo stesso token
    // firmato può arrivare codificato o no, quindi si rimuovono tutte le forme
    let mut cache_keys = vec![cookie_value.clone()];
    if let Ok(decoded) = urlencoding::decode(&cookie_value) {
        cache_keys.push(decoded.into_owned());
    }

    if let Some(token) = verify_signed_token(&cookie_value, &env.better_auth_secret) {
        sessions::delete_by_token(&pool, &token).await?;
        cache_keys.push(sign_session_token(&token, &env.better_auth_secret));
    }

    cache_keys.sort();
    cache_keys.dedup();

    if let Some(cache) = &state.bindings.session_cache {
        for key in &cache_keys {
            if let Err(e) = cache.delete(key).await {
                tracing::warn!("Impossibile rimuovere la sessione dalla cache: {}", e);
            }
        }
    }

    Ok((
        [(header::SET_COOKIE, session_clear_cookie())],
        Json(json!({ "success": true })),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnvVars;
    use crate::db::test_pool;
    use crate::services::{MemorySessionCache, SessionCache};
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    const SECRET: &str = "test-secret-at-least-32-chars-long!!";

    fn vars() -> EnvVars {
        EnvVars {
            google_client_id: Some("test-google-id".to_string()),
            google_client_secret: Some("test-google-secret".to_string()),
            better_auth_secret: Some(SECRET.to_string()),
            better_auth_url: Some("http://localhost:4321".to_string()),
            ..Default::default()
        }
    }

    fn state_with(bindings: EnvBindings) -> AuthRouteState {
        AuthRouteState::new(bindings, reqwest::Client::new())
    }

    async fn call(state: AuthRouteState, request: Request<Body>) -> (StatusCode, HeaderMap, String) {
        let response = router(state).oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn with_cookie(method: &str, uri: &str, cookie: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::COOKIE, format!("better-auth.session_token={}", cookie))
            .body(Body::empty())
            .unwrap()
    }

    async fn seeded_session(pool: &db::DbPool) -> String {
        let profile = users::GoogleProfile {
            sub: "g-1".to_string(),
            email: "student@test.com".to_string(),
            email_verified: true,
            name: Some("Test Student".to_string()),
            picture: None,
        };
        let user = users::upsert_google_user(pool, &profile, &users::OAuthTokens::default())
            .await
            .unwrap()
            .unwrap();
        sessions::create_session(pool, &user.id, None, None)
            .await
            .unwrap()
            .token
    }

    #[test]
    fn test_sanitize_callback() {
        assert_eq!(sanitize_callback(Some("/student/")), "/student/");
        assert_eq!(sanitize_callback(Some("//evil.com")), "/");
        assert_eq!(sanitize_callback(Some("https://evil.com")), "/");
        assert_eq!(sanitize_callback(Some("/\\evil.com")), "/");
        assert_eq!(sanitize_callback(None), "/");
    }

    #[tokio::test]
    async fn test_sign_in_redirects_to_google() {
        let state = state_with(EnvBindings {
            vars: vars(),
            ..Default::default()
        });
        let (status, headers, _) = call(
            state.clone(),
            get("/api/auth/sign-in/social?provider=google&callbackURL=/student/"),
        )
        .await;

        assert_eq!(status, StatusCode::FOUND);
        let location = headers.get(header::LOCATION).unwrap().to_str().unwrap();
        assert!(location.starts_with(GOOGLE_AUTH_URL));
        assert!(location.contains("client_id=test-google-id"));
        assert!(location.contains(
            "redirect_uri=http%3A%2F%2Flocalhost%3A4321%2Fapi%2Fauth%2Fcallback%2Fgoogle"
        ));

        let states = state.oauth_states.read().unwrap();
        assert_eq!(states.len(), 1);
        assert_eq!(states.values().next().unwrap().callback_url, "/student/");
    }

    #[tokio::test]
    async fn test_sign_in_rejects_unknown_provider() {
        let state = state_with(EnvBindings {
            vars: vars(),
            ..Default::default()
        });
        let (status, _, _) = call(state, get("/api/auth/sign-in/social?provider=github")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_sign_in_without_env_is_config_error() {
        let state = state_with(EnvBindings::default());
        let (status, _, body) = call(state, get("/api/auth/sign-in/social?provider=google")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body["error"], "Auth configuration error");
    }

    #[tokio::test]
    async fn test_callback_with_unknown_state() {
        let state = state_with(EnvBindings {
            vars: vars(),
            ..Default::default()
        });
        let (status, headers, _) =
            call(state, get("/api/auth/callback/google?code=abc&state=forged")).await;
        assert_eq!(status, StatusCode::FOUND);
        let location = headers.get(header::LOCATION).unwrap().to_str().unwrap();
        assert!(location.starts_with("/?auth_error="));
    }

    #[tokio::test]
    async fn test_get_session_with_valid_cookie() {
        let pool = test_pool().await;
        let token = seeded_session(&pool).await;
        let state = state_with(EnvBindings {
            vars: vars(),
            portal_db: Some(pool),
            session_cache: None,
        });

        let (status, _, body) = call(
            state,
            with_cookie("GET", "/api/auth/get-session", &sign_session_token(&token, SECRET)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body["user"]["email"], "student@test.com");
        assert_eq!(body["session"]["token"], token.as_str());
    }

    #[tokio::test]
    async fn test_get_session_without_cookie_is_null() {
        let state = state_with(EnvBindings {
            vars: vars(),
            portal_db: Some(test_pool().await),
            session_cache: None,
        });
        let (status, _, body) = call(state, get("/api/auth/get-session")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "null");
    }

    #[tokio::test]
    async fn test_get_session_without_db_binding() {
        let state = state_with(EnvBindings {
            vars: vars(),
            ..Default::default()
        });
        let (status, _, body) = call(state, get("/api/auth/get-session")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body["error"], "Auth configuration error");
    }

    #[tokio::test]
    async fn test_database_failure_is_unavailable() {
        let pool = test_pool().await;
        let token = seeded_session(&pool).await;
        pool.close().await;
        let state = state_with(EnvBindings {
            vars: vars(),
            portal_db: Some(pool),
            session_cache: None,
        });

        let (status, _, body) = call(
            state,
            with_cookie("GET", "/api/auth/get-session", &sign_session_token(&token, SECRET)),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        let body: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body["error"], "Auth service unavailable");
    }

    #[tokio::test]
    async fn test_sign_out_removes_session_and_cache_entry() {
        let pool = test_pool().await;
        let token = seeded_session(&pool).await;
        let cookie = sign_session_token(&token, SECRET);

        let cache = Arc::new(MemorySessionCache::new());
        cache
            .put(&cookie, r#"{"email":"student@test.com"}"#.to_string(), Duration::from_secs(300))
            .await
            .unwrap();

        let state = state_with(EnvBindings {
            vars: vars(),
            portal_db: Some(pool.clone()),
            session_cache: Some(cache.clone()),
        });

        let (status, headers, body) =
            call(state, with_cookie("POST", "/api/auth/sign-out", &cookie)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"success":true}"#);
        let set_cookie = headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
        assert!(set_cookie.contains("Max-Age=0"));

        assert!(sessions::find_active_by_token(&pool, &token).await.unwrap().is_none());
        assert_eq!(cache.get(&cookie).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_sign_out_evicts_decoded_cookie_spelling() {
        let pool = test_pool().await;
        let token = seeded_session(&pool).await;
        let encoded = sign_session_token(&token, SECRET);
        let decoded = urlencoding::decode(&encoded).unwrap().into_owned();
        assert_ne!(encoded, decoded);

        let cache = Arc::new(MemorySessionCache::new());
        for key in [&encoded, &decoded] {
            cache
                .put(key, r#"{"email":"student@test.com"}"#.to_string(), Duration::from_secs(300))
                .await
                .unwrap();
        }

        let state = state_with(EnvBindings {
            vars: vars(),
            portal_db: Some(pool),
            session_cache: Some(cache.clone()),
        });

        let (status, _, _) = call(state, with_cookie("POST", "/api/auth/sign-out", &encoded)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cache.get(&encoded).await.unwrap(), None);
        assert_eq!(cache.get(&decoded).await.unwrap(), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_pending_sign_ins_are_capped() {
        let mut state = state_with(EnvBindings::default());
        state.max_pending = 3;

        for i in 0..5 {
            state.remember_sign_in(format!("state-{}", i), "/".to_string());
            std::thread::sleep(Duration::from_millis(2));
        }

        let states = state.oauth_states.read().unwrap();
        assert_eq!(states.len(), 3);
        assert!(states.contains_key("state-4"));
        assert!(!states.contains_key("state-0"));
    }

    fn google_profile(sub: &str, email: &str, verified: bool) -> users::GoogleProfile {
        users::GoogleProfile {
            sub: sub.to_string(),
            email: email.to_string(),
            email_verified: verified,
            name: Some("Test Student".to_string()),
            picture: None,
        }
    }

    fn auth_env() -> AuthEnv {
        AuthEnv::from_vars(&vars()).unwrap()
    }

    #[tokio::test]
    async fn test_complete_sign_in_sets_session_cookie() {
        let pool = test_pool().await;
        let response = complete_sign_in(
            &pool,
            &auth_env(),
            &HeaderMap::new(),
            &google_profile("g-1", "student@test.com", true),
            &users::OAuthTokens::default(),
            "/student/".to_string(),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/student/");
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(set_cookie.starts_with("better-auth.session_token="));
        assert!(set_cookie.contains("HttpOnly"));
    }

    #[tokio::test]
    async fn test_unverified_email_of_existing_user_is_rejected() {
        let pool = test_pool().await;
        seeded_session(&pool).await;

        let response = complete_sign_in(
            &pool,
            &auth_env(),
            &HeaderMap::new(),
            &google_profile("g-other", "student@test.com", false),
            &users::OAuthTokens::default(),
            "/student/".to_string(),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        let location = response.headers().get(header::LOCATION).unwrap().to_str().unwrap();
        assert!(location.starts_with("/?auth_error="));
        assert!(response.headers().get(header::SET_COOKIE).is_none());

        let (sessions,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM session")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(sessions, 1);
    }

    #[tokio::test]
    async fn test_sign_out_without_cookie() {
        let state = state_with(EnvBindings {
            vars: vars(),
            ..Default::default()
        });
        let request = Request::builder()
            .method("POST")
            .uri("/api/auth/sign-out")
            .body(Body::empty())
            .unwrap();
        let (status, _, _) = call(state, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
