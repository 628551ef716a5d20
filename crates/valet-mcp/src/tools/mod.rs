//! Valet MCP tools.
//!
//! This module is the explicit registration table for every tool the
//! server exposes. Tools receive their dependencies (provider clients,
//! token lifecycle, artifact storage) through construction; nothing is
//! discovered at runtime.

pub mod analytics;
pub mod artifacts;
pub mod calculator;
pub mod calendar;
pub mod clock;
pub mod gmail;
pub mod rides;
pub mod weather;

pub use analytics::AnalyticsReportTool;
pub use artifacts::{
    ArtifactCreateTool, ArtifactDeleteTool, ArtifactGetTool, ArtifactListTool, ArtifactUpdateTool,
};
pub use calculator::CalculateTool;
pub use calendar::CalendarCreateTool;
pub use clock::GetTimeTool;
pub use gmail::GmailSendTool;
pub use rides::{RidePriceTool, RideRequestTool};
pub use weather::GetWeatherTool;

use crate::clients::{
    AnalyticsClient, CalendarClient, GmailClient, RidesClient, ServiceConfig, WeatherClient,
};
use crate::server::Tool;
use std::sync::Arc;
use valet_auth::TokenLifecycle;
use valet_store::ArtifactStore;

/// Shared dependencies injected into the tool set.
#[derive(Clone)]
pub struct ToolDependencies {
    /// Provider endpoints and timeouts.
    pub config: ServiceConfig,

    /// Token lifecycle for OAuth-backed tools.
    pub lifecycle: Arc<TokenLifecycle>,

    /// Artifact persistence.
    pub artifacts: Arc<dyn ArtifactStore>,
}

/// Utility tools that need no user account (3).
pub fn utility_tools(deps: &ToolDependencies) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(GetTimeTool),
        Arc::new(CalculateTool),
        Arc::new(GetWeatherTool::new(WeatherClient::new(
            deps.config.weather.clone(),
            deps.config.timeout(),
        ))),
    ]
}

/// Google workspace tools (2).
pub fn workspace_tools(deps: &ToolDependencies) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(GmailSendTool::new(
            deps.lifecycle.clone(),
            GmailClient::new(deps.config.gmail.clone(), deps.config.timeout()),
        )),
        Arc::new(CalendarCreateTool::new(
            deps.lifecycle.clone(),
            CalendarClient::new(deps.config.calendar.clone(), deps.config.timeout()),
        )),
    ]
}

/// Analytics tools (1).
pub fn analytics_tools(deps: &ToolDependencies) -> Vec<Arc<dyn Tool>> {
    vec![Arc::new(AnalyticsReportTool::new(
        deps.lifecycle.clone(),
        AnalyticsClient::new(deps.config.analytics.clone(), deps.config.timeout()),
    ))]
}

/// Ride tools (2).
pub fn ride_tools(deps: &ToolDependencies) -> Vec<Arc<dyn Tool>> {
    let client = RidesClient::new(deps.config.rides.clone(), deps.config.timeout());
    vec![
        Arc::new(RidePriceTool::new(deps.lifecycle.clone(), client.clone())),
        Arc::new(RideRequestTool::new(deps.lifecycle.clone(), client)),
    ]
}

/// Artifact tools (5).
pub fn artifact_tools(deps: &ToolDependencies) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(ArtifactCreateTool::new(deps.artifacts.clone())),
        Arc::new(ArtifactGetTool::new(deps.artifacts.clone())),
        Arc::new(ArtifactListTool::new(deps.artifacts.clone())),
        Arc::new(ArtifactUpdateTool::new(deps.artifacts.clone())),
        Arc::new(ArtifactDeleteTool::new(deps.artifacts.clone())),
    ]
}

/// Get all available MCP tools.
///
/// Returns a vector containing all implemented tools across all
/// categories:
/// - Utility: time, calculator, weather
/// - Workspace: email sending and calendar events
/// - Analytics: metric reports
/// - Rides: price estimates and booking
/// - Artifacts: user-scoped document CRUD
pub fn all_tools(deps: &ToolDependencies) -> Vec<Arc<dyn Tool>> {
    let mut tools = Vec::new();

    // Utility tools (3)
    tools.extend(utility_tools(deps));

    // Workspace tools (2)
    tools.extend(workspace_tools(deps));

    // Analytics tools (1)
    tools.extend(analytics_tools(deps));

    // Ride tools (2)
    tools.extend(ride_tools(deps));

    // Artifact tools (5)
    tools.extend(artifact_tools(deps));

    tools
}

#[cfg(test)]
mod tests {
    use super::*;
    use valet_auth::HttpTokenRefresher;
    use valet_store::{InMemoryArtifactStore, InMemoryCredentialStore};

    fn test_deps() -> ToolDependencies {
        let config = ServiceConfig::default();
        let lifecycle = TokenLifecycle::new(
            Arc::new(InMemoryCredentialStore::new()),
            Arc::new(HttpTokenRefresher::new(config.timeout())),
        );
        ToolDependencies {
            config,
            lifecycle: Arc::new(lifecycle),
            artifacts: Arc::new(InMemoryArtifactStore::new()),
        }
    }

    #[test]
    fn test_all_tools_count() {
        let tools = all_tools(&test_deps());
        // 3 utility + 2 workspace + 1 analytics + 2 rides + 5 artifacts
        assert_eq!(tools.len(), 13, "Expected 13 total tools");
    }

    #[test]
    fn test_all_tools_unique_names() {
        let tools = all_tools(&test_deps());
        let mut names = std::collections::HashSet::new();

        for tool in tools {
            let def = tool.definition();
            assert!(
                names.insert(def.name.clone()),
                "Duplicate tool name: {}",
                def.name
            );
        }
    }

    #[test]
    fn test_tool_categories() {
        let deps = test_deps();
        assert_eq!(utility_tools(&deps).len(), 3);
        assert_eq!(workspace_tools(&deps).len(), 2);
        assert_eq!(analytics_tools(&deps).len(), 1);
        assert_eq!(ride_tools(&deps).len(), 2);
        assert_eq!(artifact_tools(&deps).len(), 5);
    }
}
