pub mod auth;
pub mod portal;
pub mod student;

use axum::Router;

use crate::config::EnvBindings;

pub fn create_router(bindings: EnvBindings, http: reqwest::Client) -> Router {
    Router::new()
        .merge(auth::router(auth::AuthRouteState::new(bindings.clone(), http)))
        .merge(portal::router(bindings))
        .merge(student::router())
}
