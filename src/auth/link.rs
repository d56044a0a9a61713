use async_trait::async_trait;
use uuid::Uuid;

use crate::utils::error::AppError;

/// Delivery seam for sign-in links.
///
/// Production deployments plug in a real mail provider here; the default
/// implementation writes the link to the server log so the flow can be
/// exercised locally without any mail infrastructure.
#[async_trait]
pub trait LoginLinkSender: Send + Sync {
    async fn send_login_link(&self, email: &str, token: Uuid) -> Result<(), AppError>;
}

/// Logs the sign-in link instead of emailing it.
pub struct ConsoleLinkSender {
    base_url: String,
}

impl ConsoleLinkSender {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl LoginLinkSender for ConsoleLinkSender {
    async fn send_login_link(&self, email: &str, token: Uuid) -> Result<(), AppError> {
        tracing::info!(
            email = %email,
            "sign-in link: {}/auth/verify?token={}",
            self.base_url,
            token
        );
        Ok(())
    }
}
