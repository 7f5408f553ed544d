use axum::{routing::get, Extension, Json, Router};

use crate::models::Identity;

pub fn router() -> Router {
    Router::new().route("/student/api/me", get(me))
}

/// Identità dello studente risolta dalla sessione
pub async fn me(identity: Option<Extension<Identity>>) -> Json<Option<Identity>> {
    Json(identity.map(|Extension(identity)| identity))
}
