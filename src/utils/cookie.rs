//! Parsing del cookie di sessione

use std::sync::OnceLock;

use axum::http::{header, HeaderMap};
use regex_lite::Regex;

/// Nome del cookie di sessione emesso dalle route `/api/auth`
pub const SESSION_COOKIE_NAME: &str = "better-auth.session_token";

fn session_token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"better-auth\.session_token=([^;]+)").expect("pattern cookie di sessione")
    })
}

/// Estrae il token di sessione dall'header `Cookie`.
///
/// Il valore termina al primo `;` così gli attributi successivi non
/// finiscono nel token.
pub fn extract_session_token(cookie_header: Option<&str>) -> Option<String> {
    let header = cookie_header?;
    session_token_pattern()
        .captures(header)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Unisce tutti gli header `Cookie` della richiesta (HTTP/2 li può separare)
pub fn cookie_header(headers: &HeaderMap) -> Option<String> {
    let values: Vec<&str> = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();

    if values.is_empty() {
        None
    } else {
        Some(values.join("; "))
    }
}

/// `Set-Cookie` per una nuova sessione
pub fn session_set_cookie(value: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE_NAME, value, max_age_secs
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` che cancella il cookie di sessione
pub fn session_clear_cookie() -> String {
    format!(
        "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
        SESSION_COOKIE_NAME
    )
}
