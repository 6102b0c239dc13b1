use crate::summary::format_summary;
use async_trait::async_trait;
use covid_stats::{StatsError, StatsResponse, StatsSource};
use sms_core::{
    HandlerError, InboundHandler, InboundMessage, SendRequest, SendResponse, SmsClient, SmsError,
};
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::{info, instrument};

#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error("stats lookup failed: {0}")]
    Stats(#[from] StatsError),
    #[error("reply not sent: {0}")]
    Sms(#[from] SmsError),
}

impl From<BotError> for HandlerError {
    fn from(e: BotError) -> Self {
        match e {
            BotError::Stats(e) => HandlerError::Upstream(e.to_string()),
            BotError::Sms(e) => HandlerError::Sms(e),
        }
    }
}

/// Answers a text containing a country name with that country's counters.
#[derive(Clone)]
pub struct NotificationHandler {
    stats: Arc<dyn StatsSource>,
    sms: Arc<dyn SmsClient>,
    /// Number replies are sent from.
    sender: String,
}

impl NotificationHandler {
    pub fn new(
        stats: Arc<dyn StatsSource>,
        sms: Arc<dyn SmsClient>,
        sender: impl Into<String>,
    ) -> Self {
        Self {
            stats,
            sms,
            sender: sender.into(),
        }
    }

    /// Looks up `body` as a country and texts the result back to `from`.
    ///
    /// Sends exactly one message once the lookup has produced a decodable
    /// answer, and none if it has not.
    #[instrument(skip(self), err)]
    pub async fn handle(&self, from: &str, body: &str) -> Result<SendResponse, BotError> {
        let reply = match self.stats.country(body).await? {
            StatsResponse::NotFound { message } => {
                info!(%message, "stats service rejected the query");
                message
            }
            StatsResponse::Found(stats) => {
                format_summary(body, &stats, OffsetDateTime::now_utc())
            }
        };

        let receipt = self
            .sms
            .send(SendRequest {
                to: from,
                from: &self.sender,
                text: &reply,
            })
            .await?;
        info!(id = %receipt.id, provider = receipt.provider, "reply sent");
        Ok(receipt)
    }
}

#[async_trait]
impl InboundHandler for NotificationHandler {
    async fn handle(&self, message: &InboundMessage) -> Result<(), HandlerError> {
        NotificationHandler::handle(self, &message.from, &message.text).await?;
        Ok(())
    }
}
