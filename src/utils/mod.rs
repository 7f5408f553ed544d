pub mod cookie;
pub mod signing;

pub use cookie::{cookie_header, extract_session_token, SESSION_COOKIE_NAME};
pub use signing::{sign_session_token, verify_signed_token};
