pub mod auth;

pub use auth::{classify, route_auth, AuthState, Lane};
