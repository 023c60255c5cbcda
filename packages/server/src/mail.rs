use async_trait::async_trait;
use tracing::info;

/// Outbound mail transport.
///
/// Fire-and-forget: implementations log delivery failures and never surface
/// them to the request that triggered the mail.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str);
}

/// Default transport that writes outbound mail to the log.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) {
        info!(to, subject, body_len = body.len(), "Outbound mail");
    }
}
