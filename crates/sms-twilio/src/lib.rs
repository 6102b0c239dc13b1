//! # Twilio SMS Provider
//!
//! - [`TwilioClient`] sends messages through the Programmable Messaging REST API.
//! - [`TwilioWebhook`] parses inbound SMS webhooks and, when given the public
//!   webhook URL, checks the `X-Twilio-Signature` header.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sms_core::{
    header, Headers, InboundMessage, InboundWebhook, SendRequest, SendResponse, SmsClient,
    SmsError,
};
use std::collections::HashMap;
use tracing::{debug, warn};

const PROVIDER: &str = "twilio";

pub const DEFAULT_BASE_URL: &str = "https://api.twilio.com";

pub const SIGNATURE_HEADER: &str = "X-Twilio-Signature";

type HmacSha1 = Hmac<Sha1>;

/// Twilio REST client.
#[derive(Clone, Debug)]
pub struct TwilioClient {
    /// Twilio Account SID.
    pub account_sid: String,
    /// Twilio Auth Token (password for Basic auth).
    pub auth_token: String,
    /// API base URL; override for testing/mocking.
    pub base_url: String,
    http: reqwest::Client,
}

impl TwilioClient {
    pub fn new<S: Into<String>>(account_sid: S, auth_token: S) -> Self {
        Self::with_base_url(account_sid, auth_token, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url<S: Into<String>>(account_sid: S, auth_token: S, base_url: String) -> Self {
        Self {
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
            base_url,
            http: reqwest::Client::new(),
        }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url.trim_end_matches('/'),
            self.account_sid
        )
    }

    // Credentials are only checked here, when a message is actually sent.
    fn check_credentials(&self, req: &SendRequest<'_>) -> Result<(), SmsError> {
        if self.account_sid.is_empty() {
            return Err(SmsError::Auth("twilio account sid is not configured".into()));
        }
        if self.auth_token.is_empty() {
            return Err(SmsError::Auth("twilio auth token is not configured".into()));
        }
        if req.from.is_empty() {
            return Err(SmsError::Invalid("sender phone number is not configured".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct TwilioSendForm<'a> {
    to: &'a str,
    from: &'a str,
    body: &'a str,
}

#[async_trait]
impl SmsClient for TwilioClient {
    async fn send(&self, req: SendRequest<'_>) -> Result<SendResponse, SmsError> {
        self.check_credentials(&req)?;

        let form = TwilioSendForm {
            to: req.to,
            from: req.from,
            body: req.text,
        };
        let res = self
            .http
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&form)
            .send()
            .await
            .map_err(|e| SmsError::Http(e.to_string()))?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            warn!(%status, "twilio rejected message");
            return Err(SmsError::Provider(format!("HTTP {}: {}", status, body)));
        }

        let raw_text = res
            .text()
            .await
            .map_err(|e| SmsError::Http(e.to_string()))?;
        let raw_json: serde_json::Value = serde_json::from_str(&raw_text)
            .unwrap_or_else(|_| serde_json::json!({ "raw": raw_text }));

        let id = raw_json
            .get("sid")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .unwrap_or_else(sms_core::fallback_id);
        debug!(%id, to = req.to, "twilio accepted message");

        Ok(SendResponse {
            id,
            provider: PROVIDER,
            raw: raw_json,
        })
    }
}

/// Form fields Twilio posts for an inbound SMS.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TwilioInbound {
    #[serde(rename = "From")]
    pub from: String,
    #[serde(rename = "To", default)]
    pub to: String,
    #[serde(rename = "Body", default)]
    pub body: String,
    #[serde(rename = "MessageSid")]
    pub message_sid: Option<String>,
    #[serde(rename = "AccountSid")]
    pub account_sid: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, String>,
}

impl From<TwilioInbound> for InboundMessage {
    fn from(t: TwilioInbound) -> Self {
        let raw = serde_json::to_value(&t).unwrap_or_default();
        InboundMessage {
            id: t.message_sid,
            from: t.from,
            to: t.to,
            text: t.body,
            provider: PROVIDER,
            raw,
        }
    }
}

/// Inbound side of Twilio.
#[derive(Clone, Debug)]
pub struct TwilioWebhook {
    auth_token: String,
    /// Public URL Twilio posts to. Signatures are only checked when set.
    webhook_url: Option<String>,
}

impl TwilioWebhook {
    pub fn new<S: Into<String>>(auth_token: S) -> Self {
        Self {
            auth_token: auth_token.into(),
            webhook_url: None,
        }
    }

    pub fn with_signature_url<S: Into<String>>(mut self, url: S) -> Self {
        self.webhook_url = Some(url.into());
        self
    }

    fn mac(&self, url: &str, params: &[(String, String)]) -> Result<HmacSha1, SmsError> {
        let mut mac = HmacSha1::new_from_slice(self.auth_token.as_bytes())
            .map_err(|e| SmsError::Unexpected(e.to_string()))?;
        mac.update(url.as_bytes());
        let mut sorted: Vec<&(String, String)> = params.iter().collect();
        sorted.sort();
        for (k, v) in sorted {
            mac.update(k.as_bytes());
            mac.update(v.as_bytes());
        }
        Ok(mac)
    }

    /// Signature Twilio would send for `params` posted to `url`.
    pub fn signature(&self, url: &str, params: &[(String, String)]) -> Result<String, SmsError> {
        let mac = self.mac(url, params)?;
        Ok(BASE64.encode(mac.finalize().into_bytes()))
    }
}

fn decode_form(body: &[u8]) -> Result<Vec<(String, String)>, SmsError> {
    serde_urlencoded::from_bytes(body).map_err(|e| SmsError::Invalid(format!("form decode: {}", e)))
}

impl InboundWebhook for TwilioWebhook {
    fn provider(&self) -> &'static str {
        PROVIDER
    }

    fn parse_inbound(&self, _headers: &Headers, body: &[u8]) -> Result<InboundMessage, SmsError> {
        let inbound: TwilioInbound = serde_urlencoded::from_bytes(body)
            .map_err(|e| SmsError::Invalid(format!("form decode: {}", e)))?;
        Ok(inbound.into())
    }

    fn verify(&self, headers: &Headers, body: &[u8]) -> Result<(), SmsError> {
        let Some(url) = self.webhook_url.as_deref() else {
            return Ok(());
        };
        let provided = header(headers, SIGNATURE_HEADER)
            .ok_or_else(|| SmsError::Auth(format!("missing {} header", SIGNATURE_HEADER)))?;
        let provided = BASE64
            .decode(provided)
            .map_err(|e| SmsError::Auth(format!("malformed signature: {}", e)))?;
        let params = decode_form(body)?;
        self.mac(url, &params)?
            .verify_slice(&provided)
            .map_err(|_| SmsError::Auth("signature mismatch".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const URL: &str = "https://bot.example.com/sms";

    fn form(pairs: &[(&str, &str)]) -> Vec<u8> {
        serde_urlencoded::to_string(pairs).unwrap().into_bytes()
    }

    fn pairs(body: &[u8]) -> Vec<(String, String)> {
        serde_urlencoded::from_bytes(body).unwrap()
    }

    #[test]
    fn inbound_conversion() {
        let body = form(&[
            ("MessageSid", "SM123"),
            ("AccountSid", "AC123"),
            ("From", "+2348010000000"),
            ("To", "+15550002222"),
            ("Body", "nigeria"),
            ("NumMedia", "0"),
        ]);
        let msg = TwilioWebhook::new("token").parse_inbound(&vec![], &body).unwrap();
        assert_eq!(msg.from, "+2348010000000");
        assert_eq!(msg.text, "nigeria");
        assert_eq!(msg.id.as_deref(), Some("SM123"));
        assert_eq!(msg.provider, "twilio");
        assert_eq!(msg.raw["NumMedia"], "0");
    }

    #[test]
    fn missing_body_becomes_empty_text() {
        let body = form(&[("From", "+2348010000000")]);
        let msg = TwilioWebhook::new("token").parse_inbound(&vec![], &body).unwrap();
        assert_eq!(msg.text, "");
        assert_eq!(msg.to, "");
    }

    #[test]
    fn missing_from_is_rejected() {
        let body = form(&[("Body", "nigeria")]);
        let err = TwilioWebhook::new("token").parse_inbound(&vec![], &body).unwrap_err();
        assert!(matches!(err, SmsError::Invalid(_)));
    }

    #[test]
    fn verification_is_skipped_without_url() {
        let hook = TwilioWebhook::new("token");
        assert!(hook.verify(&vec![], b"From=%2B1").is_ok());
    }

    #[test]
    fn accepts_valid_signature_regardless_of_param_order() {
        let hook = TwilioWebhook::new("12345").with_signature_url(URL);
        let body = form(&[("To", "+15550002222"), ("From", "+1555"), ("Body", "ghana")]);
        let reordered = form(&[("Body", "ghana"), ("From", "+1555"), ("To", "+15550002222")]);
        let signature = hook.signature(URL, &pairs(&reordered)).unwrap();
        let headers: Headers = vec![("x-twilio-signature".into(), signature)];
        assert!(hook.verify(&headers, &body).is_ok());
    }

    #[test]
    fn rejects_tampered_body() {
        let hook = TwilioWebhook::new("12345").with_signature_url(URL);
        let signed = form(&[("From", "+1555"), ("Body", "ghana")]);
        let signature = hook.signature(URL, &pairs(&signed)).unwrap();
        let headers: Headers = vec![(SIGNATURE_HEADER.into(), signature)];
        let tampered = form(&[("From", "+1555"), ("Body", "togo")]);
        let err = hook.verify(&headers, &tampered).unwrap_err();
        assert!(matches!(err, SmsError::Auth(_)));
    }

    #[test]
    fn rejects_signature_from_another_token() {
        let body = form(&[("From", "+1555"), ("Body", "ghana")]);
        let other = TwilioWebhook::new("not-the-token").signature(URL, &pairs(&body)).unwrap();
        let hook = TwilioWebhook::new("12345").with_signature_url(URL);
        let headers: Headers = vec![(SIGNATURE_HEADER.into(), other)];
        assert!(hook.verify(&headers, &body).is_err());
    }

    #[test]
    fn rejects_missing_signature_header() {
        let hook = TwilioWebhook::new("12345").with_signature_url(URL);
        let err = hook.verify(&vec![], &form(&[("From", "+1555")])).unwrap_err();
        assert!(err.to_string().contains(SIGNATURE_HEADER));
    }

    #[test]
    fn send_form_uses_twilio_field_names() {
        let encoded = serde_urlencoded::to_string(TwilioSendForm {
            to: "+1",
            from: "+2",
            body: "hi there",
        })
        .unwrap();
        assert_eq!(encoded, "To=%2B1&From=%2B2&Body=hi+there");
    }

    #[test]
    fn messages_url_includes_account() {
        let client = TwilioClient::with_base_url("AC1", "tok", "http://localhost:9/".into());
        assert_eq!(
            client.messages_url(),
            "http://localhost:9/2010-04-01/Accounts/AC1/Messages.json"
        );
    }

    fn reply() -> SendRequest<'static> {
        SendRequest {
            to: "+2348010000000",
            from: "+15550001111",
            text: "Today Cases: 10",
        }
    }

    #[tokio::test]
    async fn send_posts_authenticated_form_and_returns_sid() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2010-04-01/Accounts/AC1/Messages.json"))
            // base64("AC1:tok")
            .and(header("authorization", "Basic QUMxOnRvaw=="))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string(
                "To=%2B2348010000000&From=%2B15550001111&Body=Today+Cases%3A+10",
            ))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "sid": "SM42",
                "status": "queued"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = TwilioClient::with_base_url("AC1", "tok", server.uri());
        let receipt = client.send(reply()).await.unwrap();
        assert_eq!(receipt.id, "SM42");
        assert_eq!(receipt.provider, "twilio");
        assert_eq!(receipt.raw["status"], "queued");
    }

    #[tokio::test]
    async fn receipt_without_sid_gets_generated_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201).set_body_string("accepted"))
            .expect(1)
            .mount(&server)
            .await;

        let client = TwilioClient::with_base_url("AC1", "tok", server.uri());
        let receipt = client.send(reply()).await.unwrap();
        assert!(!receipt.id.is_empty());
        assert_eq!(receipt.raw["raw"], "accepted");
    }

    #[tokio::test]
    async fn rejected_send_is_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_string(r#"{"code":21211,"message":"Invalid 'To' Phone Number"}"#),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = TwilioClient::with_base_url("AC1", "tok", server.uri());
        let err = client.send(reply()).await.unwrap_err();
        match err {
            SmsError::Provider(msg) => {
                assert!(msg.starts_with("HTTP 400"), "{msg}");
                assert!(msg.contains("21211"), "{msg}");
            }
            other => panic!("expected provider error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_credentials_fail_before_any_request() {
        // Port 9 is never contacted: the credential check comes first.
        let client = TwilioClient::with_base_url("", "", "http://127.0.0.1:9".into());
        let err = client
            .send(SendRequest {
                to: "+1",
                from: "+2",
                text: "hi",
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SmsError::Auth(_)));

        let client = TwilioClient::with_base_url("AC1", "tok", "http://127.0.0.1:9".into());
        let err = client
            .send(SendRequest {
                to: "+1",
                from: "",
                text: "hi",
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SmsError::Invalid(_)));
    }
}
