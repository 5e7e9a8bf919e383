//! SMS notifier - Best-effort messages for gig lifecycle events
//!
//! Notifications happen after the funds-moving mutation has committed and a
//! failure here must never surface as a ledger failure, so the interface
//! reports a plain bool and implementations swallow their own errors.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

/// Outbound notification interface consumed by the ledger
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `message` to `to` (falling back to any configured demo
    /// recipient when `to` is `None`). Returns whether delivery was handed
    /// off; never errors into the caller.
    async fn notify(&self, to: Option<&str>, message: &str) -> bool;
}

/// Configuration for the Twilio-style SMS gateway
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SmsNotifierConfig {
    /// Gateway account identifier; empty means simulation mode
    pub account_sid: String,
    pub auth_token: String,
    /// Sender number
    pub from_number: String,
    /// Recipient used when an event has no contact number on file
    pub demo_recipient: Option<String>,
    /// Gateway API base URL
    pub api_base: String,
}

impl Default for SmsNotifierConfig {
    fn default() -> Self {
        Self {
            account_sid: String::new(),
            auth_token: String::new(),
            from_number: String::new(),
            demo_recipient: None,
            api_base: "https://api.twilio.com".to_string(),
        }
    }
}

/// SMS notifier backed by a Twilio-compatible REST gateway.
///
/// Without credentials it logs the message instead of sending, which is what
/// local development and the test suite use.
pub struct SmsNotifier {
    config: SmsNotifierConfig,
    client: reqwest::Client,
}

impl SmsNotifier {
    pub fn new(config: SmsNotifierConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn is_configured(&self) -> bool {
        !self.config.account_sid.is_empty() && !self.config.auth_token.is_empty()
    }
}

#[async_trait]
impl Notifier for SmsNotifier {
    async fn notify(&self, to: Option<&str>, message: &str) -> bool {
        let recipient = match to.or(self.config.demo_recipient.as_deref()) {
            Some(r) => r.to_string(),
            None => {
                warn!("No recipient number provided and no demo recipient configured");
                return false;
            }
        };

        if !self.is_configured() {
            info!(to = %recipient, %message, "Simulated SMS");
            return true;
        }

        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.api_base, self.config.account_sid
        );
        let params = [
            ("To", recipient.as_str()),
            ("From", self.config.from_number.as_str()),
            ("Body", message),
        ];

        match self
            .client
            .post(&url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&params)
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => {
                info!(to = %recipient, "SMS sent");
                true
            }
            Ok(resp) => {
                warn!(to = %recipient, status = %resp.status(), "SMS gateway rejected message");
                false
            }
            Err(err) => {
                warn!(to = %recipient, error = %err, "Failed to send SMS");
                false
            }
        }
    }
}

// Message templates for the gig workflow, one per lifecycle event.

pub fn employer_new_request_message(freelancer_name: &str, gig_title: &str) -> String {
    format!("New gig request! {freelancer_name} has applied for your gig: '{gig_title}'")
}

pub fn request_accepted_message(gig_title: &str, employer_name: &str) -> String {
    format!(
        "Good news! {employer_name} has accepted your application for '{gig_title}'. The gig is now active."
    )
}

pub fn request_rejected_message(gig_title: &str, employer_name: &str) -> String {
    format!("Your application for '{gig_title}' by {employer_name} was not accepted at this time.")
}

pub fn milestone_submitted_message(
    freelancer_name: &str,
    gig_title: &str,
    milestone_number: usize,
) -> String {
    format!(
        "{freelancer_name} has submitted milestone {milestone_number} for your gig '{gig_title}'. Please review it."
    )
}

pub fn milestone_approved_message(
    gig_title: &str,
    milestone_number: usize,
    payment_amount: f64,
) -> String {
    format!(
        "Milestone {milestone_number} of '{gig_title}' was approved. ${payment_amount} has been added to your balance."
    )
}

pub fn milestone_rejected_message(gig_title: &str) -> String {
    format!("Your milestone submission for '{gig_title}' was rejected and the gig has been terminated.")
}

pub fn freelancer_completed_message(gig_title: &str, total_payment: f64) -> String {
    format!("Congratulations! You completed '{gig_title}' and earned a total of ${total_payment}.")
}

pub fn employer_completed_message(gig_title: &str, freelancer_name: &str) -> String {
    format!("Your gig '{gig_title}' has been completed by {freelancer_name}.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_notifier_simulates_delivery() {
        let notifier = SmsNotifier::new(SmsNotifierConfig::default());
        assert!(notifier.notify(Some("+15550100"), "hello").await);
    }

    #[tokio::test]
    async fn missing_recipient_without_fallback_fails() {
        let notifier = SmsNotifier::new(SmsNotifierConfig::default());
        assert!(!notifier.notify(None, "hello").await);
    }

    #[tokio::test]
    async fn demo_recipient_is_used_as_fallback() {
        let notifier = SmsNotifier::new(SmsNotifierConfig {
            demo_recipient: Some("+15550199".to_string()),
            ..SmsNotifierConfig::default()
        });
        assert!(notifier.notify(None, "hello").await);
    }

    #[test]
    fn templates_mention_the_gig() {
        let msg = milestone_approved_message("Landing page", 1, 100.0);
        assert!(msg.contains("Landing page"));
        assert!(msg.contains("$100"));
        assert!(employer_new_request_message("Alex", "Logo").contains("Alex"));
    }
}
