use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::{timestamp, DbPool};

/// Utente registrato tramite Google
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub image: Option<String>,
}

/// Profilo restituito da Google userinfo
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleProfile {
    pub sub: String,
    pub email: String,
    #[serde(default)]
    pub email_verified: bool,
    pub name: Option<String>,
    pub picture: Option<String>,
}

/// Token OAuth da salvare sull'account
#[derive(Debug, Clone, Default)]
pub struct OAuthTokens {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    pub scope: Option<String>,
}

pub const GOOGLE_PROVIDER_ID: &str = "google";

/// Trova utente per email
pub async fn find_by_email(pool: &DbPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    let row: Option<(String, String, String, Option<String>)> =
        sqlx::query_as(r#"SELECT id, email, name, image FROM "user" WHERE email = ?"#)
            .bind(email)
            .fetch_optional(pool)
            .await?;

    Ok(row.map(|(id, email, name, image)| User {
        id,
        email,
        name,
        image,
    }))
}

/// Trova l'utente collegato a un account Google
pub async fn find_by_google_account(
    pool: &DbPool,
    google_sub: &str,
) -> Result<Option<User>, sqlx::Error> {
    let row: Option<(String, String, String, Option<String>)> = sqlx::query_as(
        r#"
        SELECT u.id, u.email, u.name, u.image
        FROM account a
        JOIN "user" u ON u.id = a.user_id
        WHERE a.provider_id = ? AND a.account_id = ?
        "#,
    )
    .bind(GOOGLE_PROVIDER_ID)
    .bind(google_sub)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(id, email, name, image)| User {
        id,
        email,
        name,
        image,
    }))
}

/// Login o registrazione con Google.
///
/// Cerca prima l'account Google, poi l'email (utente creato altrove);
/// aggiorna profilo e token in entrambi i casi. Un nuovo account Google
/// viene collegato a un utente esistente solo se Google ha verificato
/// l'email: altrimenti restituisce `None` e non scrive nulla.
pub async fn upsert_google_user(
    pool: &DbPool,
    profile: &GoogleProfile,
    tokens: &OAuthTokens,
) -> Result<Option<User>, sqlx::Error> {
    let now = timestamp(Utc::now());
    let name = profile
        .name
        .clone()
        .unwrap_or_else(|| profile.email.clone());

    let existing = match find_by_google_account(pool, &profile.sub).await? {
        Some(user) => Some(user),
        None => match find_by_email(pool, &profile.email).await? {
            Some(_) if !profile.email_verified => {
                tracing::warn!(
                    "Collegamento rifiutato: email non verificata già registrata ({})",
                    profile.email
                );
                return Ok(None);
            }
            other => other,
        },
    };

    let user = match existing {
        Some(user) => {
            sqlx::query(
                r#"
                UPDATE "user"
                SET email = ?, name = ?, image = ?, email_verified = ?, updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(&profile.email)
            .bind(&name)
            .bind(&profile.picture)
            .bind(profile.email_verified)
            .bind(&now)
            .bind(&user.id)
            .execute(pool)
            .await?;

            User {
                id: user.id,
                email: profile.email.clone(),
                name,
                image: profile.picture.clone(),
            }
        }
        None => {
            let id = uuid::Uuid::new_v4().to_string();
            sqlx::query(
                r#"
                INSERT INTO "user" (id, name, email, email_verified, image, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&id)
            .bind(&name)
            .bind(&profile.email)
            .bind(profile.email_verified)
            .bind(&profile.picture)
            .bind(&now)
            .bind(&now)
            .execute(pool)
            .await?;

            User {
                id,
                email: profile.email.clone(),
                name,
                image: profile.picture.clone(),
            }
        }
    };

    let expires_at = tokens
        .expires_in
        .map(|secs| timestamp(Utc::now() + chrono::Duration::seconds(secs)));

    sqlx::query(
        r#"
        INSERT INTO account (id, account_id, provider_id, user_id, access_token, refresh_token,
                             access_token_expires_at, scope, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (provider_id, account_id) DO UPDATE SET
            user_id = excluded.user_id,
            access_token = excluded.access_token,
            refresh_token = COALESCE(excluded.refresh_token, account.refresh_token),
            access_token_expires_at = excluded.access_token_expires_at,
            scope = excluded.scope,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(&profile.sub)
    .bind(GOOGLE_PROVIDER_ID)
    .bind(&user.id)
    .bind(&tokens.access_token)
    .bind(&tokens.refresh_token)
    .bind(&expires_at)
    .bind(&tokens.scope)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    Ok(Some(user))
}
