pub mod access_jwt;
pub mod session_cache;
pub mod session_store;

pub use access_jwt::{AccessTokenValidator, CfAccessValidator, VerifiedAccess};
pub use session_cache::{MemorySessionCache, SessionCache};
pub use session_store::{
    AuthEnv, SessionStore, SessionStoreConfig, SessionStoreFactory, SqlSessionStoreFactory,
};
