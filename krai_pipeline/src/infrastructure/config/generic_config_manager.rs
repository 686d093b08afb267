// /////////////////////////////////////////////////////////////////////////////
// Krai Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Generic Configuration Manager
//!
//! A reusable, type-generic configuration container with validation,
//! layered sources, and change history — used for `PipelineConfig` and
//! `ObservabilityConfig` alike rather than writing bespoke load/validate/
//! reload plumbing for each.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, RwLock};

use krai_pipeline_domain::error::PipelineError;

/// Implemented by any config type that wants validation + schema versioning.
pub trait ConfigValidation: Clone + Debug + Send + Sync + 'static {
    fn validate(&self) -> ConfigValidationResult;

    fn schema_version(&self) -> String;
}

#[derive(Debug, Clone)]
pub struct ConfigValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationWarning>,
}

impl ConfigValidationResult {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
        self.is_valid = false;
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationWarning {
            field: field.into(),
            message: message.into(),
        });
    }
}

#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct ConfigValidationWarning {
    pub field: String,
    pub message: String,
}

/// A source configuration can be loaded from and (optionally) saved to.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    async fn load(&self) -> Result<String, PipelineError>;

    async fn save(&self, data: &str) -> Result<(), PipelineError>;

    async fn exists(&self) -> bool;

    fn source_id(&self) -> String;
}

pub struct FileConfigSource {
    file_path: String,
}

impl FileConfigSource {
    pub fn new(file_path: String) -> Self {
        Self { file_path }
    }
}

#[async_trait]
impl ConfigSource for FileConfigSource {
    async fn load(&self) -> Result<String, PipelineError> {
        tokio::fs::read_to_string(&self.file_path)
            .await
            .map_err(|e| PipelineError::input(format!("failed to read config file {}: {e}", self.file_path)))
    }

    async fn save(&self, data: &str) -> Result<(), PipelineError> {
        tokio::fs::write(&self.file_path, data)
            .await
            .map_err(|e| PipelineError::input(format!("failed to write config file {}: {e}", self.file_path)))
    }

    async fn exists(&self) -> bool {
        tokio::fs::metadata(&self.file_path).await.is_ok()
    }

    fn source_id(&self) -> String {
        self.file_path.clone()
    }
}

/// Reads `PREFIX_*` environment variables into a JSON object, per the
/// `APP_`-prefixed env var contract of `SPEC_FULL.md` §6.
pub struct EnvConfigSource {
    prefix: String,
}

impl EnvConfigSource {
    pub fn new(prefix: String) -> Self {
        Self { prefix }
    }
}

#[async_trait]
impl ConfigSource for EnvConfigSource {
    async fn load(&self) -> Result<String, PipelineError> {
        let mut config_map = HashMap::new();

        for (key, value) in std::env::vars() {
            if let Some(config_key) = key.strip_prefix(&self.prefix) {
                config_map.insert(config_key.to_lowercase(), value);
            }
        }

        serde_json::to_string(&config_map).map_err(PipelineError::from)
    }

    async fn save(&self, _data: &str) -> Result<(), PipelineError> {
        Err(PipelineError::invariant("cannot save to environment variables"))
    }

    async fn exists(&self) -> bool {
        std::env::vars().any(|(key, _)| key.starts_with(&self.prefix))
    }

    fn source_id(&self) -> String {
        format!("env:{}", self.prefix)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigChangeEvent<T> {
    pub config_type: String,
    pub old_config: Option<T>,
    pub new_config: T,
    pub changed_at: chrono::DateTime<chrono::Utc>,
    pub change_reason: String,
}

/// Centralized, validated, source-layered configuration holder.
pub struct GenericConfigManager<T>
where
    T: ConfigValidation + Serialize + DeserializeOwned,
{
    config: RwLock<T>,
    sources: Vec<Arc<dyn ConfigSource>>,
    change_history: RwLock<Vec<ConfigChangeEvent<T>>>,
}

impl<T> GenericConfigManager<T>
where
    T: ConfigValidation + Serialize + DeserializeOwned,
{
    pub fn new(default_config: T) -> Self {
        Self {
            config: RwLock::new(default_config),
            sources: Vec::new(),
            change_history: RwLock::new(Vec::new()),
        }
    }

    pub fn add_source(mut self, source: Arc<dyn ConfigSource>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn get_config(&self) -> Result<T, PipelineError> {
        self.config
            .read()
            .map_err(|e| PipelineError::invariant(format!("poisoned config lock: {e}")))
            .map(|config| config.clone())
    }

    pub async fn update_config(&self, new_config: T, change_reason: String) -> Result<(), PipelineError> {
        let validation_result = new_config.validate();
        if !validation_result.is_valid {
            let messages: Vec<String> = validation_result.errors.iter().map(|e| format!("{}: {}", e.field, e.message)).collect();
            return Err(PipelineError::validation(format!("configuration validation failed: {}", messages.join(", "))));
        }

        let old_config = self.get_config().ok();

        {
            let mut config = self.config.write().map_err(|e| PipelineError::invariant(format!("poisoned config lock: {e}")))?;
            *config = new_config.clone();
        }

        let change_event = ConfigChangeEvent {
            config_type: std::any::type_name::<T>().to_string(),
            old_config,
            new_config,
            changed_at: chrono::Utc::now(),
            change_reason,
        };

        if let Ok(mut history) = self.change_history.write() {
            history.push(change_event);
            if history.len() > 100 {
                history.remove(0);
            }
        }

        Ok(())
    }

    /// Loads from all sources in order; later sources override earlier ones.
    pub async fn load_from_sources(&self) -> Result<(), PipelineError> {
        let mut merged_config = None;

        for source in &self.sources {
            if source.exists().await {
                let config_data = source.load().await?;
                let config: T = serde_json::from_str(&config_data)
                    .map_err(|e| PipelineError::validation(format!("failed to parse config from {}: {e}", source.source_id())))?;
                merged_config = Some(config);
            }
        }

        if let Some(config) = merged_config {
            self.update_config(config, "loaded from sources".to_string()).await?;
        }

        Ok(())
    }

    pub fn get_change_history(&self) -> Vec<ConfigChangeEvent<T>> {
        self.change_history.read().map(|history| history.clone()).unwrap_or_default()
    }

    pub fn validate_current_config(&self) -> Result<ConfigValidationResult, PipelineError> {
        Ok(self.get_config()?.validate())
    }
}
