use std::fmt::Write as _;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use superbot_models::response::FinalDecision;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::AgentError;

/// What a notifier delivers for an adjudicated run.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DecisionNotice {
    pub run_id: Uuid,
    pub symbols: Vec<String>,
    pub decision: FinalDecision,
}

impl DecisionNotice {
    pub fn subject(&self) -> String {
        format!(
            "SuperBot Trading Decision: {} - {}",
            self.decision.direction.as_str().to_uppercase(),
            self.symbols.join(", ")
        )
    }

    pub fn render_text(&self) -> String {
        let d = &self.decision;
        let level = |v: Option<rust_decimal::Decimal>| {
            v.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string())
        };

        let mut body = String::new();
        let _ = writeln!(body, "{}", self.subject());
        let _ = writeln!(body);
        let _ = writeln!(body, "Decision:    {}", d.direction.as_str().to_uppercase());
        let _ = writeln!(body, "Confidence:  {:?}", d.confidence_level);
        let _ = writeln!(body, "Risk:        {:?}", d.risk_assessment);
        let _ = writeln!(body, "Entry:       {}", level(d.entry_price));
        let _ = writeln!(body, "Stop loss:   {}", level(d.stop_loss));
        let _ = writeln!(body, "Take profit: {}", level(d.take_profit));
        let _ = writeln!(body);
        let _ = writeln!(body, "{}", d.rationale);
        let _ = writeln!(body);
        let _ = write!(body, "Run: {}", self.run_id);
        body
    }
}

/// Out-of-band delivery of a final decision. Mockable for testing.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    async fn notify(&self, notice: &DecisionNotice) -> Result<(), AgentError>;
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    subject: String,
    text: String,
    notice: &'a DecisionNotice,
}

/// POSTs the notice as JSON to a configured endpoint.
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, AgentError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn notify(&self, notice: &DecisionNotice) -> Result<(), AgentError> {
        let payload = WebhookPayload {
            subject: notice.subject(),
            text: notice.render_text(),
            notice,
        };

        debug!(url = %self.url, run_id = %notice.run_id, "Posting decision webhook");
        self.client
            .post(&self.url)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Writes the notice to the log. Used when no webhook is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    async fn notify(&self, notice: &DecisionNotice) -> Result<(), AgentError> {
        info!(
            run_id = %notice.run_id,
            subject = %notice.subject(),
            rationale = %notice.decision.rationale,
            "Trading decision"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixtures;
    use mockito::Matcher;

    fn notice() -> DecisionNotice {
        DecisionNotice {
            run_id: Uuid::nil(),
            symbols: vec!["BTCUSD".to_string()],
            decision: FinalDecision::from(&fixtures::buy_decision()),
        }
    }

    #[test]
    fn subject_matches_mail_format() {
        assert_eq!(notice().subject(), "SuperBot Trading Decision: BUY - BTCUSD");
    }

    #[test]
    fn text_contains_levels() {
        let text = notice().render_text();
        assert!(text.contains("Entry:       96500"));
        assert!(text.contains("Stop loss:   95000"));
        assert!(text.contains("Take profit: 98000"));
        assert!(text.ends_with(&Uuid::nil().to_string()));
    }

    #[tokio::test]
    async fn webhook_posts_json() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hooks/superbot")
            .match_header("content-type", "application/json")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "subject": "SuperBot Trading Decision: BUY - BTCUSD",
                "notice": {"decision": {"direction": "buy"}}
            })))
            .with_status(204)
            .create_async()
            .await;

        let notifier = WebhookNotifier::new(
            &format!("{}/hooks/superbot", server.url()),
            Duration::from_secs(5),
        )
        .unwrap();
        notifier.notify(&notice()).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn webhook_rejection_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/hook")
            .with_status(500)
            .create_async()
            .await;

        let notifier =
            WebhookNotifier::new(&format!("{}/hook", server.url()), Duration::from_secs(5))
                .unwrap();
        let err = notifier.notify(&notice()).await.unwrap_err();
        assert!(matches!(err, AgentError::Http(_)));
    }

    #[tokio::test]
    async fn log_notifier_always_succeeds() {
        assert!(LogNotifier.notify(&notice()).await.is_ok());
    }
}
