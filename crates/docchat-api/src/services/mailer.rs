//! SendGrid v3 mail delivery.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use docchat_core::defaults;
use docchat_core::{EmailAttachment, Error, Mailer, Result};

/// Configuration for [`SendGridMailer`].
#[derive(Debug, Clone)]
pub struct SendGridConfig {
    pub api_key: String,
    pub from_email: String,
    pub base_url: String,
    pub timeout_seconds: u64,
}

impl SendGridConfig {
    /// `None` unless both `SENDGRID_API_KEY` and `SENDGRID_FROM_EMAIL` are set.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("SENDGRID_API_KEY").ok().filter(|s| !s.is_empty())?;
        let from_email = std::env::var("SENDGRID_FROM_EMAIL")
            .ok()
            .filter(|s| !s.is_empty())?;
        Some(Self {
            api_key,
            from_email,
            base_url: std::env::var("SENDGRID_BASE_URL")
                .unwrap_or_else(|_| defaults::SENDGRID_URL.to_string()),
            timeout_seconds: defaults::EMAIL_TIMEOUT_SECS,
        })
    }
}

#[derive(Serialize)]
struct Address<'a> {
    email: &'a str,
}

#[derive(Serialize)]
struct Personalization<'a> {
    to: Vec<Address<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    content_type: &'a str,
    value: &'a str,
}

#[derive(Serialize)]
struct Attachment<'a> {
    content: String,
    filename: &'a str,
    #[serde(rename = "type")]
    content_type: &'a str,
    disposition: &'a str,
}

#[derive(Serialize)]
struct MailSend<'a> {
    personalizations: Vec<Personalization<'a>>,
    from: Address<'a>,
    subject: &'a str,
    content: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<Attachment<'a>>,
}

/// [`Mailer`] backed by SendGrid's `/mail/send` endpoint.
pub struct SendGridMailer {
    client: Client,
    config: SendGridConfig,
}

impl SendGridMailer {
    pub fn new(config: SendGridConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::Email(format!("Failed to create HTTP client: {}", e)))?;

        info!(from = %config.from_email, "Initializing SendGrid mailer");
        Ok(Self { client, config })
    }

    /// Build from the environment; `Ok(None)` when email is not configured.
    pub fn from_env() -> Result<Option<Self>> {
        SendGridConfig::from_env().map(Self::new).transpose()
    }
}

#[async_trait]
impl Mailer for SendGridMailer {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        body: &str,
        attachments: Vec<EmailAttachment>,
    ) -> Result<()> {
        let payload = MailSend {
            personalizations: vec![Personalization {
                to: vec![Address { email: to }],
            }],
            from: Address {
                email: &self.config.from_email,
            },
            subject,
            content: vec![Content {
                content_type: "text/plain",
                value: body,
            }],
            attachments: attachments
                .iter()
                .map(|a| Attachment {
                    content: BASE64.encode(&a.bytes),
                    filename: &a.file_name,
                    content_type: &a.content_type,
                    disposition: "attachment",
                })
                .collect(),
        };

        let url = format!("{}/mail/send", self.config.base_url.trim_end_matches('/'));
        debug!(to = %to, attachment_count = attachments.len(), "Sending email");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::Email(format!("SendGrid request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "SendGrid rejected email");
            return Err(Error::Email(format!("SendGrid returned {}: {}", status, body)));
        }

        info!(to = %to, attachment_count = attachments.len(), "Email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn mailer_for(server: &MockServer) -> SendGridMailer {
        SendGridMailer::new(SendGridConfig {
            api_key: "sg-test".to_string(),
            from_email: "bot@docchat.dev".to_string(),
            base_url: server.uri(),
            timeout_seconds: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_send_posts_mail_with_base64_attachment() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/mail/send"))
            .and(header("Authorization", "Bearer sg-test"))
            .and(body_partial_json(json!({
                "personalizations": [{"to": [{"email": "alex@example.com"}]}],
                "from": {"email": "bot@docchat.dev"},
                "subject": "Your Document Report",
                "attachments": [{
                    "content": "JVBERg==",
                    "filename": "report.pdf",
                    "type": "application/pdf",
                    "disposition": "attachment"
                }]
            })))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        mailer_for(&server)
            .send(
                "alex@example.com",
                "Your Document Report",
                "See attached.",
                vec![EmailAttachment::new("report.pdf", b"%PDF".to_vec())],
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_rejected_send_is_email_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/mail/send"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let err = mailer_for(&server)
            .send("alex@example.com", "s", "b", Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Email(ref m) if m.contains("401")));
    }
}
