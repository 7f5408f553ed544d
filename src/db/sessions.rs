use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};

use super::{timestamp, DbPool};
use crate::models::{SessionInfo, SessionRecord, SessionUser};

/// Durata di una sessione studente
pub const SESSION_TTL_SECS: i64 = 7 * 24 * 3600;

/// Sessione appena creata
#[derive(Debug, Clone)]
pub struct NewSession {
    pub id: String,
    pub token: String,
}

fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

/// Crea una sessione per l'utente
pub async fn create_session(
    pool: &DbPool,
    user_id: &str,
    ip_address: Option<&str>,
    user_agent: Option<&str>,
) -> Result<NewSession, sqlx::Error> {
    let now = Utc::now();
    let session = NewSession {
        id: uuid::Uuid::new_v4().to_string(),
        token: generate_token(),
    };

    sqlx::query(
        r#"
        INSERT INTO session (id, token, user_id, expires_at, ip_address, user_agent, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&session.id)
    .bind(&session.token)
    .bind(user_id)
    .bind(timestamp(now + chrono::Duration::seconds(SESSION_TTL_SECS)))
    .bind(ip_address)
    .bind(user_agent)
    .bind(timestamp(now))
    .bind(timestamp(now))
    .execute(pool)
    .await?;

    Ok(session)
}

/// Trova una sessione non scaduta per token
pub async fn find_active_by_token(
    pool: &DbPool,
    token: &str,
) -> Result<Option<SessionRecord>, sqlx::Error> {
    let row: Option<(String, String, String, String, String)> = sqlx::query_as(
        r#"
        SELECT s.id, s.token, u.id, u.email, u.name
        FROM session s
        JOIN "user" u ON u.id = s.user_id
        WHERE s.token = ? AND s.expires_at > ?
        "#,
    )
    .bind(token)
    .bind(timestamp(Utc::now()))
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(session_id, token, user_id, email, name)| SessionRecord {
        user: SessionUser {
            id: user_id,
            email,
            name: Some(name),
        },
        session: SessionInfo {
            id: session_id,
            token: Some(token),
        },
    }))
}

/// Elimina la sessione (logout)
pub async fn delete_by_token(pool: &DbPool, token: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM session WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Elimina le sessioni scadute
pub async fn cleanup_expired(pool: &DbPool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM session WHERE expires_at <= ?")
        .bind(timestamp(Utc::now()))
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
