use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Extension, Json, Router,
};
use serde::Serialize;
use serde_json::json;

use crate::config::EnvBindings;
use crate::db;
use crate::models::Identity;

pub fn router(bindings: EnvBindings) -> Router {
    Router::new()
        .route("/portal/api/me", get(me))
        .route("/portal/api/db-health", get(db_health))
        .with_state(bindings)
}

/// Identità dello sponsor allegata dal middleware
pub async fn me(identity: Option<Extension<Identity>>) -> Json<Option<Identity>> {
    Json(identity.map(|Extension(identity)| identity))
}

#[derive(Debug, Serialize)]
pub struct TableInfo {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct DbHealthResponse {
    pub ok: bool,
    pub tables: Vec<TableInfo>,
}

/// Verifica che lo store delle sessioni risponda
pub async fn db_health(State(bindings): State<EnvBindings>) -> Response {
    let result = match db::get_db(&bindings) {
        Ok(pool) => db::list_tables(&pool).await.map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };

    match result {
        Ok(names) => (
            [(header::CACHE_CONTROL, "no-store")],
            Json(DbHealthResponse {
                ok: true,
                tables: names.into_iter().map(|name| TableInfo { name }).collect(),
            }),
        )
            .into_response(),
        Err(error) => {
            tracing::error!("Database non raggiungibile: {}", error);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CACHE_CONTROL, "no-store")],
                Json(json!({ "ok": false, "error": error })),
            )
                .into_response()
        }
    }
}
