use std::env;
use std::path::PathBuf;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

const DEFAULT_SESSION_TTL_DAYS: i64 = 30;
const DEFAULT_LOGIN_TOKEN_TTL_MINUTES: i64 = 15;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// Base URL under which this server is reachable, used to build the
    /// public URLs of uploaded images.
    pub public_base_url: String,
    /// Directory uploaded images are written to and served from.
    pub upload_dir: PathBuf,
    pub session_ttl_days: i64,
    pub login_token_ttl_minutes: i64,
}

impl Config {
    pub fn from_env() -> Self {
        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3001);

        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/eventfully".to_string()),
            port,
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| format!("http://localhost:{port}")),
            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("uploads")),
            session_ttl_days: env::var("SESSION_TTL_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_SESSION_TTL_DAYS),
            login_token_ttl_minutes: env::var("LOGIN_TOKEN_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_LOGIN_TOKEN_TTL_MINUTES),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_env() {
        std::env::remove_var("SESSION_TTL_DAYS");
        std::env::remove_var("LOGIN_TOKEN_TTL_MINUTES");
        let config = Config::from_env();
        assert_eq!(config.session_ttl_days, DEFAULT_SESSION_TTL_DAYS);
        assert_eq!(config.login_token_ttl_minutes, DEFAULT_LOGIN_TOKEN_TTL_MINUTES);
        assert!(config.public_base_url.starts_with("http"));
    }
}
