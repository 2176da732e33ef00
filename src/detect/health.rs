//! External-service health probes

use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::config::{ExternalService, HEALTH_CHECK_TIMEOUT_MS};

/// Outcome of one health probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Healthy,
    Degraded,
    Unreachable,
    Timeout,
    /// No health-check URL configured for the service
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceHealth {
    pub service: String,
    pub status: ServiceStatus,
    pub status_code: Option<u16>,
}

/// Issues timestamped GETs with a fixed timeout against configured
/// health-check URLs. Probes never block detection beyond the timeout.
pub struct HealthProbe {
    client: reqwest::Client,
}

impl HealthProbe {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("depsync")
                .timeout(Duration::from_millis(HEALTH_CHECK_TIMEOUT_MS))
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    pub async fn probe(&self, service: &ExternalService) -> ServiceHealth {
        let Some(url) = &service.healthcheck else {
            return ServiceHealth {
                service: service.name.clone(),
                status: ServiceStatus::Unknown,
                status_code: None,
            };
        };

        debug!("Probing {} at {}", service.name, url);

        match self.client.get(url).send().await {
            Ok(response) => {
                let code = response.status().as_u16();
                let status = if code == 200 {
                    ServiceStatus::Healthy
                } else {
                    ServiceStatus::Degraded
                };
                ServiceHealth {
                    service: service.name.clone(),
                    status,
                    status_code: Some(code),
                }
            }
            Err(e) if e.is_timeout() => ServiceHealth {
                service: service.name.clone(),
                status: ServiceStatus::Timeout,
                status_code: None,
            },
            Err(_) => ServiceHealth {
                service: service.name.clone(),
                status: ServiceStatus::Unreachable,
                status_code: None,
            },
        }
    }
}

impl Default for HealthProbe {
    fn default() -> Self {
        Self::new()
    }
}
