use axum::async_trait;
use tokio::sync::Mutex;
use tracing::info;

/// Outbound notification seam. The caller treats sends as fire-and-forget:
/// a failed send is logged, never retried and never propagated.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_activation_notice(&self, email: &str, first_name: &str) -> anyhow::Result<()>;
}

pub const ACTIVATION_SUBJECT: &str = "Your AgriConnect account is active";

pub fn activation_message(first_name: &str) -> String {
    format!(
        "Hi {first_name}, your AgriConnect farmer account has been activated. \
         You can now log in and list your products."
    )
}

/// Default notifier: writes the rendered notice to the log instead of
/// sending mail. Real transport lives behind the same trait.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_activation_notice(&self, email: &str, first_name: &str) -> anyhow::Result<()> {
        info!(
            to = %email,
            subject = ACTIVATION_SUBJECT,
            body = %activation_message(first_name),
            "activation notice"
        );
        Ok(())
    }
}

/// Records recipients instead of sending; used by tests asserting on
/// exactly-once delivery.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub async fn sent(&self) -> Vec<String> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_activation_notice(&self, email: &str, _first_name: &str) -> anyhow::Result<()> {
        self.sent.lock().await.push(email.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activation_message_addresses_the_farmer() {
        let body = activation_message("John");
        assert!(body.starts_with("Hi John,"));
        assert!(body.contains("activated"));
    }

    #[tokio::test]
    async fn recording_notifier_tracks_recipients() {
        let notifier = RecordingNotifier::default();
        notifier
            .send_activation_notice("farmer@test.com", "John")
            .await
            .unwrap();
        assert_eq!(notifier.sent().await, vec!["farmer@test.com".to_string()]);
    }
}
