// server/src/services/email_client.rs

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use storefront_core::CoreResult;
use tracing::{info, instrument};

use super::http::{ensure_success, transport_error, trim_base};

const PROVIDER: &str = "email";

/// Sends the newsletter welcome message.
#[async_trait]
pub trait WelcomeMailer: Send + Sync {
  async fn send_welcome(&self, email: &str) -> CoreResult<()>;
}

#[derive(Debug, Serialize)]
struct Address<'a> {
  email: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TransactionalEmail<'a> {
  sender: Address<'a>,
  to: [Address<'a>; 1],
  subject: &'a str,
  html_content: &'a str,
}

const WELCOME_SUBJECT: &str = "Bem-vindo(a) à nossa newsletter";
const WELCOME_HTML: &str = "<p>Obrigado por se inscrever! Você será o primeiro a saber das novidades e promoções.</p>";

/// Brevo transactional email API.
pub struct TransactionalEmailClient {
  http: Client,
  base_url: String,
  api_key: String,
  sender: String,
}

impl TransactionalEmailClient {
  pub fn new(http: Client, base_url: &str, api_key: String, sender: String) -> Self {
    Self {
      http,
      base_url: trim_base(base_url),
      api_key,
      sender,
    }
  }
}

#[async_trait]
impl WelcomeMailer for TransactionalEmailClient {
  #[instrument(name = "service::send_welcome_email", skip(self, email))]
  async fn send_welcome(&self, email: &str) -> CoreResult<()> {
    let url = format!("{}/v3/smtp/email", self.base_url);
    let message = TransactionalEmail {
      sender: Address { email: &self.sender },
      to: [Address { email }],
      subject: WELCOME_SUBJECT,
      html_content: WELCOME_HTML,
    };

    let response = self
      .http
      .post(&url)
      .header("api-key", &self.api_key)
      .json(&message)
      .send()
      .await
      .map_err(|e| transport_error(PROVIDER, e))?;
    ensure_success(PROVIDER, response).await?;
    info!("Welcome email queued.");
    Ok(())
  }
}
