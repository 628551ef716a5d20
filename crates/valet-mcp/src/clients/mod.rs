//! Provider HTTP clients.
//!
//! Thin reqwest wrappers around the external services Valet's tools call.
//! Each client reports failures through its own error enum; OAuth-backed
//! clients additionally classify authentication rejections so the token
//! lifecycle can refresh and retry once.

pub mod analytics;
pub mod calendar;
pub mod config;
pub mod gmail;
pub mod rides;
pub mod weather;

pub use analytics::{AnalyticsClient, AnalyticsError, ReportRequest, ReportResponse};
pub use calendar::{CalendarClient, CalendarError, CreatedEvent, NewEvent};
pub use config::{ConfigError, ServiceConfig, ServiceEndpoint};
pub use gmail::{GmailClient, GmailError, OutgoingMessage, SentMessage};
pub use rides::{
    PriceEstimate, RideReceipt, RideRequest, RidesClient, RidesError,
};
pub use weather::{CurrentWeather, WeatherClient, WeatherError};

use serde::de::DeserializeOwned;

/// Decode a provider response, mapping non-2xx statuses to an API error.
pub(crate) async fn decode_json<T, E>(
    response: reqwest::Response,
    api_error: impl FnOnce(u16, String) -> E,
) -> Result<T, E>
where
    T: DeserializeOwned,
    E: From<reqwest::Error>,
{
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_else(|_| status.to_string());
        return Err(api_error(status.as_u16(), message));
    }
    response.json::<T>().await.map_err(E::from)
}
