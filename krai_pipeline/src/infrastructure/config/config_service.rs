// /////////////////////////////////////////////////////////////////////////////
// Krai Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Observability Configuration Service
//!
//! Loads the logging/metrics/tracing/alerting settings layered over
//! `observability.toml` plus environment variables, per `SPEC_FULL.md` §2.
//! Distinct from `PipelineConfig` (`infrastructure::config::pipeline_config`),
//! which holds the domain-facing settings (database URL, chunking defaults,
//! retry policies).

use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use tracing::{debug, warn};

use krai_pipeline_domain::error::PipelineError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    pub observability: ObservabilitySettings,
    pub logging: LoggingSettings,
    pub metrics: MetricsSettings,
    pub tracing: TracingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilitySettings {
    pub enable_structured_logging: bool,
    pub metrics_export_interval_secs: u64,
    pub trace_sample_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
    pub format: String,
    pub enable_file_logging: bool,
    pub log_file_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSettings {
    pub port: u16,
    pub enable_custom_metrics: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TracingSettings {
    pub enable_distributed_tracing: bool,
    pub jaeger_endpoint: String,
    pub service_name: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            observability: ObservabilitySettings {
                enable_structured_logging: true,
                metrics_export_interval_secs: 30,
                trace_sample_rate: 1.0,
            },
            logging: LoggingSettings {
                level: "info".to_string(),
                format: "pretty".to_string(),
                enable_file_logging: false,
                log_file_path: "logs/krai_pipeline.log".to_string(),
            },
            metrics: MetricsSettings {
                port: 9090,
                enable_custom_metrics: true,
            },
            tracing: TracingSettings {
                enable_distributed_tracing: false,
                jaeger_endpoint: "http://localhost:14268/api/traces".to_string(),
                service_name: "krai-pipeline".to_string(),
            },
        }
    }
}

/// Loads `ObservabilityConfig` from a TOML file, falling back to defaults.
pub struct ConfigService;

impl ConfigService {
    pub async fn load_observability_config<P: AsRef<Path>>(config_path: P) -> Result<ObservabilityConfig, PipelineError> {
        let config_path = config_path.as_ref();

        if !config_path.exists() {
            warn!("observability config not found at {:?}, using defaults", config_path);
            return Ok(ObservabilityConfig::default());
        }

        let config_content = fs::read_to_string(config_path)
            .await
            .map_err(|e| PipelineError::input(format!("failed to read config file {config_path:?}: {e}")))?;

        let config: ObservabilityConfig = toml::from_str(&config_content)
            .map_err(|e| PipelineError::validation(format!("failed to parse config file {config_path:?}: {e}")))?;

        debug!(
            metrics_port = config.metrics.port,
            structured_logging = config.observability.enable_structured_logging,
            "loaded observability config from {:?}",
            config_path
        );

        Ok(config)
    }

    /// Looks for `observability.toml` in the current directory and up to 3
    /// parents, falling back to defaults if none is found.
    pub async fn load_default_observability_config() -> Result<ObservabilityConfig, PipelineError> {
        let mut current_dir =
            std::env::current_dir().map_err(|e| PipelineError::input(format!("failed to get current directory: {e}")))?;

        for _ in 0..4 {
            let config_path = current_dir.join("observability.toml");
            if config_path.exists() {
                debug!("found observability config at: {:?}", config_path);
                return Self::load_observability_config(config_path).await;
            }

            match current_dir.parent() {
                Some(parent) => current_dir = parent.to_path_buf(),
                None => break,
            }
        }

        warn!("no observability.toml found, using default configuration");
        Ok(ObservabilityConfig::default())
    }

    pub async fn get_metrics_port() -> u16 {
        Self::load_default_observability_config().await.map(|c| c.metrics.port).unwrap_or(9090)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn test_load_config_from_file() {
        let temp_file = tempfile::NamedTempFile::new().unwrap();
        let config_content = r#"
[observability]
enable_structured_logging = true
metrics_export_interval_secs = 30
trace_sample_rate = 1.0

[logging]
level = "debug"
format = "json"
enable_file_logging = true
log_file_path = "test.log"

[metrics]
port = 8080
enable_custom_metrics = true

[tracing]
enable_distributed_tracing = true
jaeger_endpoint = "http://test:14268/api/traces"
service_name = "test_service"
"#;

        let mut file = tokio::fs::File::create(temp_file.path()).await.unwrap();
        file.write_all(config_content.as_bytes()).await.unwrap();
        file.flush().await.unwrap();
        drop(file);

        let config = ConfigService::load_observability_config(temp_file.path()).await.unwrap();

        assert_eq!(config.metrics.port, 8080);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.enable_file_logging);
        assert!(config.tracing.enable_distributed_tracing);
    }

    #[tokio::test]
    async fn test_missing_file_falls_back_to_defaults() {
        let config = ConfigService::load_observability_config("/nonexistent/path.toml").await.unwrap();
        assert_eq!(config.metrics.port, 9090);
    }
}
