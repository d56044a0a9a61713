use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::link::LoginLinkSender;
use crate::config::Config;

/// Shared application state handed to every handler.
///
/// `PgPool` is internally reference-counted, so cloning the state is cheap.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub link_sender: Arc<dyn LoginLinkSender>,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config, link_sender: Arc<dyn LoginLinkSender>) -> Self {
        Self {
            pool,
            config: Arc::new(config),
            link_sender,
        }
    }
}
