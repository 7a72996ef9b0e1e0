use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::jwt::JwtKeys;
use crate::config::{AppConfig, JwtConfig};
use crate::users::repo::{PgUserRepository, UserRepository};

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub keys: JwtKeys,
}

impl AppState {
    pub fn new(db: PgPool, config: &AppConfig) -> Self {
        let users = Arc::new(PgUserRepository::new(db)) as Arc<dyn UserRepository>;
        Self::from_parts(users, &config.jwt)
    }

    pub fn from_parts(users: Arc<dyn UserRepository>, jwt: &JwtConfig) -> Self {
        Self {
            users,
            keys: JwtKeys::from(jwt),
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::users::memory::MemoryUserRepository;

        let jwt = JwtConfig {
            secret: "test".into(),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            ttl_minutes: 5,
        };
        let users = Arc::new(MemoryUserRepository::default()) as Arc<dyn UserRepository>;
        Self::from_parts(users, &jwt)
    }
}
