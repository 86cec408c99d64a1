use std::time::Duration;

use anyhow::{Context, Result, bail};
use arc14_common::NotificationConfig;
use arc14_core::ScheduledTask;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

const SEND_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Delivery {
    pub recipient: String,
    pub message_id: Option<String>,
}

/// Outbound notification channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    /// Whether credentials are present. Sends fail fast when they are not.
    fn is_configured(&self) -> bool;

    async fn send(&self, message: &EmailMessage) -> Result<Delivery>;
}

/// SendGrid v3 `mail/send` client.
pub struct SendGridMailer {
    client: Client,
    api_base: String,
    api_key: Option<String>,
    sender: Option<String>,
}

impl SendGridMailer {
    pub fn from_config(config: &NotificationConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            sender: config.sender.clone().filter(|s| !s.trim().is_empty()),
        })
    }
}

#[derive(Serialize)]
struct Address<'a> {
    email: &'a str,
}

#[derive(Serialize)]
struct Personalization<'a> {
    to: [Address<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    value: &'a str,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    personalizations: [Personalization<'a>; 1],
    from: Address<'a>,
    subject: &'a str,
    content: [Content<'a>; 2],
}

fn send_request<'a>(sender: &'a str, message: &'a EmailMessage) -> SendRequest<'a> {
    SendRequest {
        personalizations: [Personalization {
            to: [Address { email: &message.to }],
        }],
        from: Address { email: sender },
        subject: &message.subject,
        content: [
            Content {
                kind: "text/plain",
                value: &message.text,
            },
            Content {
                kind: "text/html",
                value: &message.html,
            },
        ],
    }
}

#[async_trait]
impl Notifier for SendGridMailer {
    fn name(&self) -> &str {
        "sendgrid"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some() && self.sender.is_some()
    }

    async fn send(&self, message: &EmailMessage) -> Result<Delivery> {
        let (Some(api_key), Some(sender)) = (&self.api_key, &self.sender) else {
            bail!("Email not configured");
        };
        if message.to.trim().is_empty() {
            bail!("recipient is required");
        }
        let resp = self
            .client
            .post(format!("{}/v3/mail/send", self.api_base))
            .bearer_auth(api_key)
            .json(&send_request(sender, message))
            .send()
            .await
            .context("sendgrid request failed")?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("sendgrid mail/send failed: {status} {body}");
        }
        let message_id = resp
            .headers()
            .get("x-message-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        Ok(Delivery {
            recipient: message.to.clone(),
            message_id,
        })
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

pub fn reminder_message(task: &ScheduledTask, to: &str) -> EmailMessage {
    let when = format!(
        "{} at {}",
        task.scheduled_date.format("%A, %B %-d, %Y"),
        task.scheduled_time.to_12_hour()
    );
    let mut text = format!(
        "Reminder: {}\nScheduled: {when}\nPriority: {}\nCategory: {}\n",
        task.title, task.priority, task.category
    );
    if !task.description.is_empty() {
        text.push_str(&format!("\n{}\n", task.description));
    }
    text.push_str("\nComplete it on time to earn up to 10 punctuality points.\n");

    let description = if task.description.is_empty() {
        String::new()
    } else {
        format!("<p>{}</p>", escape_html(&task.description))
    };
    let html = format!(
        "<h2>{}</h2><p><strong>Scheduled:</strong> {when}<br>\
         <strong>Priority:</strong> {}<br><strong>Category:</strong> {}</p>{description}\
         <p>Complete it on time to earn up to 10 punctuality points.</p>",
        escape_html(&task.title),
        task.priority,
        task.category
    );

    EmailMessage {
        to: to.to_string(),
        subject: format!("Reminder: {}", task.title),
        text,
        html,
    }
}

pub fn test_message(to: &str) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: "ARC-14 test email".to_string(),
        text: "Email notifications are working.".to_string(),
        html: "<p>Email notifications are working.</p>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use arc14_common::NotificationConfig;
    use arc14_core::input::NewScheduledTask;
    use chrono::Utc;

    use super::{Notifier, SendGridMailer, escape_html, reminder_message, send_request};

    #[tokio::test]
    async fn unconfigured_mailer_refuses_to_send() {
        let mailer = SendGridMailer::from_config(&NotificationConfig {
            api_key: None,
            sender: Some("me@example.com".to_string()),
            ..Default::default()
        })
        .expect("mailer");
        assert!(!mailer.is_configured());
        let err = mailer
            .send(&super::test_message("you@example.com"))
            .await
            .expect_err("not configured");
        assert_eq!(err.to_string(), "Email not configured");
    }

    #[test]
    fn reminder_mentions_task_and_twelve_hour_time() {
        let task = NewScheduledTask {
            title: Some("Gym <legs>".to_string()),
            scheduled_date: Some("2026-10-17".to_string()),
            scheduled_time: Some("18:30".to_string()),
            ..Default::default()
        }
        .into_task(Utc::now())
        .expect("valid task");
        let message = reminder_message(&task, "me@example.com");
        assert_eq!(message.subject, "Reminder: Gym <legs>");
        assert!(message.text.contains("Saturday, October 17, 2026 at 6:30 PM"));
        assert!(message.html.contains("Gym &lt;legs&gt;"));

        let payload = serde_json::to_value(send_request("bot@example.com", &message))
            .expect("serialize");
        assert_eq!(payload["personalizations"][0]["to"][0]["email"], "me@example.com");
        assert_eq!(payload["from"]["email"], "bot@example.com");
        assert_eq!(payload["content"][1]["type"], "text/html");
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape_html("a & \"b\""), "a &amp; &quot;b&quot;");
    }
}
