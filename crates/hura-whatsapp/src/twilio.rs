//! Twilio API client for WhatsApp

use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use tracing::info;

use hura_core::config::WhatsAppConfig;

use crate::error::{Result, WhatsAppError};

type HmacSha1 = Hmac<Sha1>;

const WHATSAPP_PREFIX: &str = "whatsapp:";

/// Add the `whatsapp:` channel prefix when missing
pub fn whatsapp_address(number: &str) -> String {
    if number.starts_with(WHATSAPP_PREFIX) {
        number.to_string()
    } else {
        format!("{}{}", WHATSAPP_PREFIX, number)
    }
}

/// Remove the `whatsapp:` channel prefix
pub fn strip_whatsapp_prefix(address: &str) -> &str {
    address.strip_prefix(WHATSAPP_PREFIX).unwrap_or(address)
}

/// Twilio API client
#[derive(Debug, Clone)]
pub struct TwilioClient {
    client: Client,
    account_sid: String,
    auth_token: String,
    phone_number: String,
    base_url: String,
}

/// Outgoing message payload
#[derive(Debug, Serialize)]
struct SendMessagePayload {
    #[serde(rename = "From")]
    from: String,
    #[serde(rename = "To")]
    to: String,
    #[serde(rename = "Body")]
    body: String,
}

#[derive(Debug, Deserialize)]
struct SendMessageResponse {
    sid: String,
}

impl TwilioClient {
    pub fn new(config: &WhatsAppConfig) -> Self {
        Self {
            client: Client::new(),
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
            phone_number: config.phone_number.clone(),
            base_url: "https://api.twilio.com".to_string(),
        }
    }

    /// Point at another API host (for testing)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Account SID, auth token and sender number are all present
    pub fn is_configured(&self) -> bool {
        !self.account_sid.is_empty() && !self.auth_token.is_empty() && !self.phone_number.is_empty()
    }

    /// Send a WhatsApp message; returns the message SID
    pub async fn send_message(&self, to: &str, body: &str) -> Result<String> {
        if !self.is_configured() {
            return Err(WhatsAppError::CredentialsNotSet);
        }

        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, self.account_sid
        );

        let payload = SendMessagePayload {
            from: whatsapp_address(&self.phone_number),
            to: whatsapp_address(to),
            body: body.to_string(),
        };

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(WhatsAppError::Api(format!(
                "Failed to send message: {} - {}",
                status, text
            )));
        }

        let result: SendMessageResponse = response.json().await?;
        info!("WhatsApp message sent: {}", result.sid);
        Ok(result.sid)
    }
}

fn signing_mac(auth_token: &str, url: &str, params: &BTreeMap<String, String>) -> Option<HmacSha1> {
    let mut mac = HmacSha1::new_from_slice(auth_token.as_bytes()).ok()?;
    mac.update(url.as_bytes());
    for (key, value) in params {
        mac.update(key.as_bytes());
        mac.update(value.as_bytes());
    }
    Some(mac)
}

/// Twilio request signature: base64 HMAC-SHA1 over the full URL followed
/// by every POST parameter name and value, sorted by name
pub fn compute_signature(auth_token: &str, url: &str, params: &BTreeMap<String, String>) -> Option<String> {
    signing_mac(auth_token, url, params).map(|mac| STANDARD.encode(mac.finalize().into_bytes()))
}

/// Checks `X-Twilio-Signature` headers
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    auth_token: String,
    webhook_url: String,
}

impl SignatureVerifier {
    /// `webhook_url` is the public URL Twilio posts to
    pub fn new(auth_token: impl Into<String>, webhook_url: impl Into<String>) -> Self {
        Self {
            auth_token: auth_token.into(),
            webhook_url: webhook_url.into(),
        }
    }

    pub fn verify(&self, params: &BTreeMap<String, String>, signature: &str) -> bool {
        let Ok(provided) = STANDARD.decode(signature.trim()) else {
            return false;
        };
        signing_mac(&self.auth_token, &self.webhook_url, params)
            .is_some_and(|mac| mac.verify_slice(&provided).is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config() -> WhatsAppConfig {
        WhatsAppConfig {
            account_sid: "AC123".to_string(),
            auth_token: "token123".to_string(),
            phone_number: "+14155238886".to_string(),
            ..WhatsAppConfig::default()
        }
    }

    fn params() -> BTreeMap<String, String> {
        BTreeMap::from([
            ("Body".to_string(), "menu".to_string()),
            ("From".to_string(), "whatsapp:+250788123456".to_string()),
            ("To".to_string(), "whatsapp:+14155238886".to_string()),
        ])
    }

    #[test]
    fn test_address_prefix() {
        assert_eq!(whatsapp_address("+250788123456"), "whatsapp:+250788123456");
        assert_eq!(whatsapp_address("whatsapp:+1"), "whatsapp:+1");
        assert_eq!(strip_whatsapp_prefix("whatsapp:+1"), "+1");
        assert_eq!(strip_whatsapp_prefix("+1"), "+1");
    }

    #[test]
    fn test_signature_roundtrip() {
        let url = "https://example.test/whatsapp/webhook";
        let signature = compute_signature("token123", url, &params()).unwrap();
        let verifier = SignatureVerifier::new("token123", url);
        assert!(verifier.verify(&params(), &signature));
    }

    #[test]
    fn test_signature_rejects_tampering() {
        let url = "https://example.test/whatsapp/webhook";
        let signature = compute_signature("token123", url, &params()).unwrap();

        let mut tampered = params();
        tampered.insert("Body".to_string(), "quit".to_string());
        assert!(!SignatureVerifier::new("token123", url).verify(&tampered, &signature));
        assert!(!SignatureVerifier::new("other", url).verify(&params(), &signature));
        assert!(!SignatureVerifier::new("token123", "https://elsewhere.test").verify(&params(), &signature));
        assert!(!SignatureVerifier::new("token123", url).verify(&params(), "not base64!"));
    }

    #[test]
    fn test_is_configured() {
        assert!(TwilioClient::new(&config()).is_configured());
        assert!(!TwilioClient::new(&WhatsAppConfig::default()).is_configured());
    }

    #[tokio::test]
    async fn test_send_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2010-04-01/Accounts/AC123/Messages.json"))
            .and(header_exists("authorization"))
            .and(body_string_contains("To=whatsapp%3A%2B250788123456"))
            .and(body_string_contains("From=whatsapp%3A%2B14155238886"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"sid": "SM1"})))
            .mount(&server)
            .await;

        let client = TwilioClient::new(&config()).with_base_url(server.uri());
        let sid = client.send_message("+250788123456", "Muraho").await.unwrap();
        assert_eq!(sid, "SM1");
    }

    #[tokio::test]
    async fn test_send_without_credentials() {
        let client = TwilioClient::new(&WhatsAppConfig::default());
        let err = client.send_message("+1", "hi").await.unwrap_err();
        assert!(matches!(err, WhatsAppError::CredentialsNotSet));
    }

    #[tokio::test]
    async fn test_send_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad number"))
            .mount(&server)
            .await;

        let client = TwilioClient::new(&config()).with_base_url(server.uri());
        let err = client.send_message("+1", "hi").await.unwrap_err();
        assert!(matches!(err, WhatsAppError::Api(msg) if msg.contains("bad number")));
    }
}
