use crate::config::AppConfig;
use crate::handler::NotificationHandler;
use axum::Router;
use covid_stats::{DiseaseShClient, StatsSource};
use sms_core::SmsClient;
use sms_twilio::{TwilioClient, TwilioWebhook};
use sms_web_axum::AppState;
use sms_web_generic::WebhookProcessor;
use std::sync::Arc;

/// Router backed by the real Twilio and disease.sh clients.
pub fn build_router(config: &AppConfig) -> Router {
    let stats = DiseaseShClient::new(config.stats.base_url.clone());
    let twilio = TwilioClient::with_base_url(
        config.twilio.account_sid.clone(),
        config.twilio.auth_token.clone(),
        config.twilio.base_url.clone(),
    );
    build_router_with(config, Arc::new(stats), Arc::new(twilio))
}

/// Router with the two outbound services supplied by the caller.
pub fn build_router_with(
    config: &AppConfig,
    stats: Arc<dyn StatsSource>,
    sms: Arc<dyn SmsClient>,
) -> Router {
    let handler = NotificationHandler::new(stats, sms, config.twilio.phone_number.clone());

    let mut hook = TwilioWebhook::new(config.twilio.auth_token.clone());
    if config.security.verify_signatures {
        if let Some(url) = &config.security.public_url {
            hook = hook.with_signature_url(url.clone());
        }
    }

    let state = AppState {
        processor: WebhookProcessor::new(Arc::new(hook), Arc::new(handler)),
    };
    sms_web_axum::router(state, config.security.max_body_size)
}
