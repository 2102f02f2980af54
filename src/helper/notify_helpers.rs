use serde_json::json;
use thiserror::Error;

use crate::config::Config;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("notification relay is not configured")]
    NotConfigured,
    #[error("relay request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("relay rejected the message with HTTP {0}")]
    Rejected(u16),
}

/// Best-effort delivery through the transactional-email relay: one POST,
/// the outcome reported to the caller, no retry and no queueing. The store
/// write that preceded this call is never rolled back on failure.
pub async fn send_notification(
    client: &reqwest::Client,
    config: &Config,
    to: &str,
    subject: &str,
    message: &str,
) -> Result<(), NotifyError> {
    if config.mail_relay_url.is_empty() || to.is_empty() {
        return Err(NotifyError::NotConfigured);
    }

    let mut request = client.post(&config.mail_relay_url).json(&json!({
        "to": to,
        "subject": subject,
        "message": message,
    }));
    if !config.mail_relay_token.is_empty() {
        request = request.bearer_auth(&config.mail_relay_token);
    }

    let response = request.send().await?;
    if !response.status().is_success() {
        return Err(NotifyError::Rejected(response.status().as_u16()));
    }
    Ok(())
}
