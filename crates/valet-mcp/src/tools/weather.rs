//! Weather tool.

use crate::clients::WeatherClient;
use crate::server::{McpServerError, McpServerResult, Tool, ToolContext};
use crate::types::{ToolDefinition, ToolResult};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::error;

#[derive(Debug, Deserialize)]
struct WeatherParams {
    latitude: f64,
    longitude: f64,
}

/// Human-readable description for the provider weather code.
fn describe(code: Option<i64>) -> &'static str {
    match code {
        Some(0) => "clear sky",
        Some(1..=3) => "partly cloudy",
        Some(45) | Some(48) => "fog",
        Some(51..=67) => "rain",
        Some(71..=77) => "snow",
        Some(80..=82) => "showers",
        Some(95..=99) => "thunderstorm",
        _ => "unknown conditions",
    }
}

/// Tool returning current conditions for a coordinate.
pub struct GetWeatherTool {
    client: WeatherClient,
}

impl GetWeatherTool {
    /// Create the tool around a weather client.
    pub fn new(client: WeatherClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for GetWeatherTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("get_weather", "Get current weather conditions for a coordinate")
            .with_schema(serde_json::json!({
                "type": "object",
                "properties": {
                    "latitude": {
                        "type": "number",
                        "description": "Latitude in decimal degrees"
                    },
                    "longitude": {
                        "type": "number",
                        "description": "Longitude in decimal degrees"
                    }
                },
                "required": ["latitude", "longitude"]
            }))
    }

    async fn execute(
        &self,
        args: serde_json::Value,
        _context: &ToolContext,
    ) -> McpServerResult<ToolResult> {
        let params: WeatherParams = serde_json::from_value(args)
            .map_err(|e| McpServerError::InvalidParams(e.to_string()))?;

        match self
            .client
            .current(params.latitude, params.longitude)
            .await
        {
            Ok(weather) => Ok(ToolResult::text(format!(
                "{:.1}°C, wind {:.1} km/h, {}",
                weather.temperature,
                weather.wind_speed,
                describe(weather.weather_code)
            ))),
            Err(e) => {
                error!("Failed to fetch weather: {}", e);
                Ok(ToolResult::error(format!("Failed to fetch weather: {e}")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::ServiceEndpoint;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_definition_requires_coordinates() {
        let client = WeatherClient::new(
            ServiceEndpoint {
                base_url: "http://localhost".to_string(),
                api_key: None,
            },
            Duration::from_secs(5),
        );
        let definition = GetWeatherTool::new(client).definition();
        assert_eq!(definition.name, "get_weather");
        assert_eq!(
            definition.input_schema["required"],
            serde_json::json!(["latitude", "longitude"])
        );
    }

    #[test]
    fn test_weather_code_descriptions() {
        assert_eq!(describe(Some(0)), "clear sky");
        assert_eq!(describe(Some(61)), "rain");
        assert_eq!(describe(None), "unknown conditions");
    }

    #[tokio::test]
    async fn test_execute_formats_conditions() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "current_weather": {"temperature": 21.3, "windspeed": 8.0, "weathercode": 0}
            })))
            .mount(&server)
            .await;

        let tool = GetWeatherTool::new(WeatherClient::new(
            ServiceEndpoint {
                base_url: server.uri(),
                api_key: None,
            },
            Duration::from_secs(5),
        ));

        let result = tool
            .execute(
                serde_json::json!({"latitude": 52.5, "longitude": 13.4}),
                &ToolContext::new("u1"),
            )
            .await
            .unwrap();

        assert!(!result.is_error);
        assert_eq!(result.first_text(), Some("21.3°C, wind 8.0 km/h, clear sky"));
    }
}
