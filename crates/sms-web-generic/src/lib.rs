use sms_core::{
    Headers, HandlerError, HttpStatus, InboundHandler, InboundMessage, InboundWebhook,
    SmsError, WebhookError, WebhookResponse,
};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Framework-agnostic webhook processor that handles the core SMS logic
#[derive(Clone)]
pub struct WebhookProcessor {
    hook: Arc<dyn InboundWebhook>,
    handler: Arc<dyn InboundHandler>,
}

impl WebhookProcessor {
    pub fn new(hook: Arc<dyn InboundWebhook>, handler: Arc<dyn InboundHandler>) -> Self {
        Self { hook, handler }
    }

    /// Process an incoming webhook request and return a framework-agnostic response
    pub async fn process_webhook(&self, headers: Headers, body: &[u8]) -> WebhookResponse {
        match self.process_webhook_internal(headers, body).await {
            Ok(()) => WebhookResponse::acknowledged(),
            Err(e) => self.error_to_response(e),
        }
    }

    async fn process_webhook_internal(
        &self,
        headers: Headers,
        body: &[u8],
    ) -> Result<(), WebhookError> {
        let message = self.parse(&headers, body)?;
        debug!(
            provider = message.provider,
            id = message.id.as_deref().unwrap_or("-"),
            from = %message.from,
            "inbound message parsed"
        );
        self.handler.handle(&message).await?;
        Ok(())
    }

    fn parse(&self, headers: &Headers, body: &[u8]) -> Result<InboundMessage, WebhookError> {
        self.hook
            .verify(headers, body)
            .map_err(|e| WebhookError::VerificationFailed(e.to_string()))?;

        self.hook
            .parse_inbound(headers, body)
            .map_err(|e| WebhookError::ParseError(e.to_string()))
    }

    fn error_to_response(&self, error: WebhookError) -> WebhookResponse {
        match error {
            WebhookError::VerificationFailed(msg) => {
                warn!(provider = self.hook.provider(), %msg, "rejected unsigned webhook");
                WebhookResponse::error(
                    HttpStatus::Unauthorized,
                    &format!("verification failed: {}", msg),
                )
            }
            WebhookError::ParseError(msg) => {
                warn!(provider = self.hook.provider(), %msg, "malformed webhook");
                WebhookResponse::error(HttpStatus::BadRequest, &format!("parse error: {}", msg))
            }
            WebhookError::Handler(e) => {
                error!(error = %e, "inbound message not handled");
                WebhookResponse::error(handler_status(&e), &e.to_string())
            }
        }
    }
}

fn handler_status(error: &HandlerError) -> HttpStatus {
    match error {
        // Missing credentials or sender number: our fault, not the provider's.
        HandlerError::Sms(SmsError::Auth(_) | SmsError::Invalid(_)) => {
            HttpStatus::InternalServerError
        }
        HandlerError::Upstream(_) | HandlerError::Sms(_) => HttpStatus::BadGateway,
    }
}

/// Helper trait for framework adapters to convert headers
pub trait HeaderConverter {
    type HeaderType;

    fn to_generic_headers(headers: &Self::HeaderType) -> Headers;
}

/// Helper trait for framework adapters to convert responses
pub trait ResponseConverter {
    type ResponseType;

    fn from_webhook_response(response: WebhookResponse) -> Self::ResponseType;
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct StaticHook {
        verified: bool,
    }

    impl InboundWebhook for StaticHook {
        fn provider(&self) -> &'static str {
            "static"
        }

        fn parse_inbound(&self, _headers: &Headers, body: &[u8]) -> Result<InboundMessage, SmsError> {
            let text = std::str::from_utf8(body).map_err(|e| SmsError::Invalid(e.to_string()))?;
            Ok(InboundMessage {
                id: None,
                from: "+1555".into(),
                to: String::new(),
                text: text.to_string(),
                provider: "static",
                raw: serde_json::Value::Null,
            })
        }

        fn verify(&self, _headers: &Headers, _body: &[u8]) -> Result<(), SmsError> {
            if self.verified {
                Ok(())
            } else {
                Err(SmsError::Auth("bad signature".into()))
            }
        }
    }

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<String>>,
        fail_with: Option<fn() -> HandlerError>,
    }

    #[async_trait]
    impl InboundHandler for Recorder {
        async fn handle(&self, message: &InboundMessage) -> Result<(), HandlerError> {
            self.seen.lock().unwrap().push(message.text.clone());
            match self.fail_with {
                Some(make) => Err(make()),
                None => Ok(()),
            }
        }
    }

    fn processor(verified: bool, handler: Arc<Recorder>) -> WebhookProcessor {
        WebhookProcessor::new(Arc::new(StaticHook { verified }), handler)
    }

    #[tokio::test]
    async fn acknowledges_handled_message() {
        let handler = Arc::new(Recorder::default());
        let response = processor(true, handler.clone())
            .process_webhook(vec![], b"ghana")
            .await;
        assert_eq!(response.status.as_u16(), 200);
        assert_eq!(response.content_type, "text/xml");
        assert_eq!(*handler.seen.lock().unwrap(), vec!["ghana".to_string()]);
    }

    #[tokio::test]
    async fn unverified_request_never_reaches_handler() {
        let handler = Arc::new(Recorder::default());
        let response = processor(false, handler.clone())
            .process_webhook(vec![], b"ghana")
            .await;
        assert_eq!(response.status.as_u16(), 401);
        assert!(handler.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn parse_failure_is_bad_request() {
        let handler = Arc::new(Recorder::default());
        let response = processor(true, handler.clone())
            .process_webhook(vec![], &[0xff, 0xfe])
            .await;
        assert_eq!(response.status.as_u16(), 400);
        assert!(response.body.contains("parse error"));
    }

    #[tokio::test]
    async fn handler_failures_map_to_status() {
        let cases: [(fn() -> HandlerError, u16); 4] = [
            (|| HandlerError::Upstream("stats down".into()), 502),
            (|| SmsError::Provider("HTTP 400".into()).into(), 502),
            (|| SmsError::Auth("no sid".into()).into(), 500),
            (|| SmsError::Invalid("no sender".into()).into(), 500),
        ];
        for (make, status) in cases {
            let handler = Arc::new(Recorder {
                fail_with: Some(make),
                ..Default::default()
            });
            let response = processor(true, handler).process_webhook(vec![], b"x").await;
            assert_eq!(response.status.as_u16(), status);
        }
    }
}
