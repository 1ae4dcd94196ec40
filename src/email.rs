use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::json;
use tracing::info;

const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";

/// A hung SMTP relay or API must not hold the signup response open.
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Email delivery seam. The auth flow only sees this trait; tests and
/// keyless dev environments substitute their own implementation.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> anyhow::Result<()>;
}

/// Delivers through the Resend HTTP API.
pub struct ResendMailer {
    client: reqwest::Client,
    api_key: String,
    from: String,
}

impl ResendMailer {
    pub fn new(api_key: &str, from: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .context("build email http client")?;
        Ok(Self {
            client,
            api_key: api_key.to_string(),
            from: from.to_string(),
        })
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> anyhow::Result<()> {
        let response = self
            .client
            .post(RESEND_ENDPOINT)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": self.from,
                "to": to,
                "subject": subject,
                "html": html,
            }))
            .send()
            .await
            .context("send verification email")?;

        if !response.status().is_success() {
            anyhow::bail!("email delivery rejected with status {}", response.status());
        }
        Ok(())
    }
}

/// Logs instead of sending; used when no API key is configured.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, _html: &str) -> anyhow::Result<()> {
        info!(%to, %subject, "email send stub");
        Ok(())
    }
}

pub async fn send_otp_email(
    mailer: &dyn Mailer,
    to: &str,
    otp: &str,
    link: &str,
) -> anyhow::Result<()> {
    mailer
        .send(to, "Verify your email address", &otp_email_html(otp, link))
        .await
}

pub fn otp_email_html(otp: &str, link: &str) -> String {
    format!(
        r#"<div style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
  <div style="text-align: center; margin-bottom: 30px;">
    <h1 style="color: #1a365d; font-size: 24px; margin-bottom: 10px;">Welcome to Super QA!</h1>
    <p style="color: #4a5568; font-size: 16px;">Please verify your email address to complete your registration.</p>
  </div>
  <div style="background-color: #f7fafc; padding: 20px; border-radius: 6px; text-align: center; margin-bottom: 30px;">
    <p style="color: #4a5568; font-size: 14px; margin-bottom: 10px;">Your verification code is:</p>
    <span style="color: #2d3748; font-size: 32px; font-weight: bold; letter-spacing: 8px; font-family: monospace;">{otp}</span>
    <p style="color: #718096; font-size: 12px; margin-top: 10px;">This code will expire in 10 minutes</p>
  </div>
  <div style="text-align: center; margin-bottom: 30px;">
    <a href="{link}" style="display: inline-block; background-color: #3b82f6; color: #ffffff; padding: 12px 24px; text-decoration: none; border-radius: 6px; font-weight: 500; font-size: 16px;">Verify Email Address</a>
  </div>
  <div style="text-align: center; color: #718096; font-size: 14px; border-top: 1px solid #e2e8f0; padding-top: 20px;">
    <p style="margin: 0;">If you didn't create an account with Super QA, please ignore this email.</p>
  </div>
</div>"#
    )
}
