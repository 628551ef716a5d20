//! Ride tools: price estimates and booking.

use crate::clients::{RideRequest, RidesClient};
use crate::server::{McpServerError, McpServerResult, Tool, ToolContext};
use crate::types::{ToolDefinition, ToolResult};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::error;
use valet_auth::{call_with_reauth, ProviderCallError, TokenLifecycle};

/// Price estimate tool name, also its credential key.
pub const RIDE_PRICE_TOOL: &str = "ride_price_estimate";

/// Booking tool name, also its credential key.
pub const RIDE_REQUEST_TOOL: &str = "ride_request";

fn trip_schema(require_product: bool) -> serde_json::Value {
    let mut required = vec![
        "start_latitude",
        "start_longitude",
        "end_latitude",
        "end_longitude",
    ];
    if require_product {
        required.push("product_id");
    }
    serde_json::json!({
        "type": "object",
        "properties": {
            "start_latitude": {"type": "number"},
            "start_longitude": {"type": "number"},
            "end_latitude": {"type": "number"},
            "end_longitude": {"type": "number"},
            "product_id": {
                "type": "string",
                "description": "Ride product to book"
            }
        },
        "required": required
    })
}

#[derive(Debug, Deserialize)]
struct TripParams {
    start_latitude: f64,
    start_longitude: f64,
    end_latitude: f64,
    end_longitude: f64,
    #[serde(default)]
    product_id: Option<String>,
}

impl TripParams {
    fn into_request(self) -> RideRequest {
        RideRequest {
            start_latitude: self.start_latitude,
            start_longitude: self.start_longitude,
            end_latitude: self.end_latitude,
            end_longitude: self.end_longitude,
            product_id: self.product_id,
        }
    }
}

/// Tool fetching price estimates for a trip.
pub struct RidePriceTool {
    lifecycle: Arc<TokenLifecycle>,
    client: RidesClient,
}

impl RidePriceTool {
    /// Create the tool around a token lifecycle and ride client.
    pub fn new(lifecycle: Arc<TokenLifecycle>, client: RidesClient) -> Self {
        Self { lifecycle, client }
    }
}

#[async_trait]
impl Tool for RidePriceTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(RIDE_PRICE_TOOL, "Get ride price estimates for a trip")
            .with_schema(trip_schema(false))
    }

    async fn execute(
        &self,
        args: serde_json::Value,
        context: &ToolContext,
    ) -> McpServerResult<ToolResult> {
        let params: TripParams = serde_json::from_value(args)
            .map_err(|e| McpServerError::InvalidParams(e.to_string()))?;
        let trip = params.into_request();

        let outcome = call_with_reauth(
            &self.lifecycle,
            &context.user_id,
            RIDE_PRICE_TOOL,
            |token| {
                let client = self.client.clone();
                let trip = trip.clone();
                async move { client.price_estimates(&token, &trip).await }
            },
        )
        .await;

        match outcome {
            Ok(estimates) => {
                let prices: Vec<serde_json::Value> = estimates
                    .prices
                    .into_iter()
                    .map(|p| {
                        serde_json::json!({
                            "product": p.display_name,
                            "estimate": p.estimate,
                            "currency": p.currency_code,
                            "duration_secs": p.duration
                        })
                    })
                    .collect();
                Ok(ToolResult::json(serde_json::json!({ "prices": prices })))
            }
            Err(ProviderCallError::Auth(e)) => Ok(ToolResult::error(format!(
                "🔐 {e}. Please re-connect your ride account from the Valet dashboard."
            ))),
            Err(ProviderCallError::Provider(e)) => {
                error!("Failed to fetch price estimates: {}", e);
                Ok(ToolResult::error(format!(
                    "Failed to fetch price estimates: {e}"
                )))
            }
        }
    }
}

/// Tool booking a ride.
pub struct RideRequestTool {
    lifecycle: Arc<TokenLifecycle>,
    client: RidesClient,
}

impl RideRequestTool {
    /// Create the tool around a token lifecycle and ride client.
    pub fn new(lifecycle: Arc<TokenLifecycle>, client: RidesClient) -> Self {
        Self { lifecycle, client }
    }
}

#[async_trait]
impl Tool for RideRequestTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(RIDE_REQUEST_TOOL, "Book a ride for the user")
            .with_schema(trip_schema(true))
    }

    async fn execute(
        &self,
        args: serde_json::Value,
        context: &ToolContext,
    ) -> McpServerResult<ToolResult> {
        let params: TripParams = serde_json::from_value(args)
            .map_err(|e| McpServerError::InvalidParams(e.to_string()))?;
        let trip = params.into_request();

        let outcome = call_with_reauth(
            &self.lifecycle,
            &context.user_id,
            RIDE_REQUEST_TOOL,
            |token| {
                let client = self.client.clone();
                let trip = trip.clone();
                async move { client.request_ride(&token, &trip).await }
            },
        )
        .await;

        match outcome {
            Ok(receipt) => Ok(ToolResult::json(serde_json::json!({
                "request_id": receipt.request_id,
                "status": receipt.status,
                "eta_minutes": receipt.eta
            }))),
            Err(ProviderCallError::Auth(e)) => Ok(ToolResult::error(format!(
                "🔐 {e}. Please re-connect your ride account from the Valet dashboard."
            ))),
            Err(ProviderCallError::Provider(e)) => {
                error!("Failed to book ride: {}", e);
                Ok(ToolResult::error(format!("Failed to book ride: {e}")))
            }
        }
    }
}
