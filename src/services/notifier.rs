use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Failed to deliver verification message: {0}")]
    DeliveryFailed(String),
}

/// Delivers the email-verification link to a newly registered user.
#[async_trait]
pub trait VerificationNotifier: Send + Sync {
    async fn send_verification(
        &self,
        email: &str,
        username: &str,
        verify_url: &str,
    ) -> Result<(), NotifyError>;
}

/// Writes the verification link to the log instead of sending mail.
pub struct LogNotifier;

#[async_trait]
impl VerificationNotifier for LogNotifier {
    async fn send_verification(
        &self,
        email: &str,
        username: &str,
        verify_url: &str,
    ) -> Result<(), NotifyError> {
        info!(%email, %username, %verify_url, "Verification link issued.");
        Ok(())
    }
}
