// /////////////////////////////////////////////////////////////////////////////
// Krai Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pipeline Configuration
//!
//! The domain-facing settings the core depends on, per `SPEC_FULL.md` §6's
//! closed environment-variable list, layered TOML-then-env the way
//! `adaptive_pipeline`'s `config_service` layers observability settings —
//! here over `config::Config` instead of a hand-rolled loader, since this
//! settings group has many more fields with independent env overrides.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use krai_pipeline_domain::error::PipelineError;

use super::generic_config_manager::{ConfigValidation, ConfigValidationResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub database_connection_url: String,

    pub object_storage_endpoint: String,
    pub object_storage_access_key: String,
    pub object_storage_secret_key: String,
    pub object_storage_region: String,
    pub object_storage_use_ssl: bool,

    pub embedding_service_url: String,
    pub embedding_api_key: String,
    pub embedding_model: String,
    pub embedding_dimension: usize,

    pub vision_service_url: String,
    pub vision_api_key: String,
    pub vision_model: String,

    pub http_request_timeout_seconds: u64,

    pub llm_max_pages: u32,

    pub enable_image_context: bool,
    pub enable_context_extraction: bool,
    pub enable_error_code_extraction: bool,
    pub enable_product_extraction: bool,
    pub enable_context_embeddings: bool,

    pub max_media_items_per_batch: u32,
    pub context_extraction_timeout_seconds: u64,
    pub embedding_generation_timeout_seconds: u64,

    pub input_dir: String,
    pub processed_dir: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            database_connection_url: "sqlite://./krai_pipeline.db".to_string(),

            object_storage_endpoint: "http://localhost:9000".to_string(),
            object_storage_access_key: String::new(),
            object_storage_secret_key: String::new(),
            object_storage_region: "us-east-1".to_string(),
            object_storage_use_ssl: false,

            embedding_service_url: "https://api.openai.com/v1/embeddings".to_string(),
            embedding_api_key: String::new(),
            embedding_model: "text-embedding-3-small".to_string(),
            embedding_dimension: 1536,

            vision_service_url: "https://api.openai.com/v1/chat/completions".to_string(),
            vision_api_key: String::new(),
            vision_model: "gpt-4o-mini".to_string(),

            http_request_timeout_seconds: 30,

            llm_max_pages: 500,

            enable_image_context: true,
            enable_context_extraction: true,
            enable_error_code_extraction: true,
            enable_product_extraction: true,
            enable_context_embeddings: true,

            max_media_items_per_batch: 16,
            context_extraction_timeout_seconds: 60,
            embedding_generation_timeout_seconds: 30,

            input_dir: "./input".to_string(),
            processed_dir: "./processed".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Loads layered configuration: defaults, then an optional TOML file,
    /// then environment variables (`APP_*`, double-underscore nesting),
    /// matching `SPEC_FULL.md` §2's `config` crate layering.
    pub fn load(config_path: Option<&str>) -> Result<Self, PipelineError> {
        let defaults = Config::try_from(&PipelineConfig::default())
            .map_err(|e| PipelineError::validation(format!("failed to serialize default configuration: {e}")))?;
        let mut builder = Config::builder().add_source(defaults);

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(false));
        }

        let builder = builder.add_source(Environment::with_prefix("APP").separator("__"));

        let config: PipelineConfig = builder
            .build()
            .map_err(|e| PipelineError::validation(format!("failed to build configuration: {e}")))?
            .try_deserialize()
            .map_err(|e| PipelineError::validation(format!("failed to deserialize configuration: {e}")))?;

        let validation = config.validate();
        if !validation.is_valid {
            let messages: Vec<String> = validation.errors.iter().map(|e| format!("{}: {}", e.field, e.message)).collect();
            return Err(PipelineError::validation(format!("invalid configuration: {}", messages.join(", "))));
        }

        Ok(config)
    }
}

impl ConfigValidation for PipelineConfig {
    fn validate(&self) -> ConfigValidationResult {
        let mut result = ConfigValidationResult::valid();

        if self.database_connection_url.is_empty() {
            result.add_error("database_connection_url", "must not be empty");
        }
        if self.embedding_dimension == 0 {
            result.add_error("embedding_dimension", "must be greater than 0");
        }
        if self.llm_max_pages == 0 {
            result.add_warning("llm_max_pages", "0 disables LLM-backed extraction entirely");
        }
        if self.input_dir.is_empty() {
            result.add_error("input_dir", "must not be empty");
        }

        result
    }

    fn schema_version(&self) -> String {
        "1.0.0".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(PipelineConfig::default().validate().is_valid);
    }

    #[test]
    fn test_zero_embedding_dimension_is_invalid() {
        let mut config = PipelineConfig::default();
        config.embedding_dimension = 0;
        assert!(!config.validate().is_valid);
    }

    #[test]
    fn test_load_with_no_file_falls_back_to_defaults() {
        let config = PipelineConfig::load(None).unwrap();
        assert_eq!(config.embedding_dimension, 1536);
    }

    #[test]
    fn test_env_override() {
        std::env::set_var("APP_EMBEDDING_MODEL", "text-embedding-3-large");
        let config = PipelineConfig::load(None).unwrap();
        std::env::remove_var("APP_EMBEDDING_MODEL");
        assert_eq!(config.embedding_model, "text-embedding-3-large");
    }
}
