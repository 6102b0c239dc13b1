//! # covid-sms-bot
//!
//! Answers an SMS naming a country with that country's COVID-19 numbers.
//!
//! Twilio posts the inbound text to `POST /sms`. The body is looked up with the
//! disease.sh per-country endpoint and the reply goes back to the sender
//! through Twilio's Messages API:
//!
//! ```text
//! 👋 Here's the summary of the Covid-19 cases in Nigeria as at Sunday, 18-Oct-26 09:05:03 UTC
//!
//! Today Cases: 10
//! Recovered Cases: 5
//! Deaths Recorded: 1
//! Total Cases: 100
//! ```
//!
//! When the stats service answers with an error (typically an unknown
//! country) its message is texted back as is.
//!
//! ## Configuration
//!
//! ```rust,ignore
//! use covid_sms_bot::config::AppConfig;
//!
//! let config = AppConfig::load()?;
//! let app = covid_sms_bot::startup::build_router(&config);
//! ```

pub mod config;
pub mod handler;
pub mod startup;
pub mod summary;
pub mod telemetry;

pub use crate::config::*;

/// Common imports
pub mod prelude {
    pub use crate::config::{
        AppConfig, LoggingConfig, SecurityConfig, ServerConfig, StatsConfig, TwilioConfig,
    };
    pub use crate::handler::{BotError, NotificationHandler};
    pub use covid_stats::{CountryStats, StatsError, StatsResponse, StatsSource};
    pub use sms_core::*;
}
