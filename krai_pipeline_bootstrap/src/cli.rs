// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Command-Line Interface Module
//!
//! Bootstrap-layer CLI handling with security-first design.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │  1. parse_cli()                     │  Parse CLI with clap
//! └─────────────────┬───────────────────┘
//!                   ↓
//! ┌─────────────────────────────────────┐
//! │  2. validate_cli()                  │  Security validation
//! └─────────────────┬───────────────────┘
//!                   ↓
//! ┌─────────────────────────────────────┐
//! │  3. ValidatedCli                    │  Safe, validated config
//! └─────────────────────────────────────┘
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use thiserror::Error;

/// `krai-pipeline` - document ingestion pipeline
#[derive(Parser, Debug)]
#[command(name = "krai-pipeline", version, about)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Number of worker tasks per pipeline stage (overrides config)
    #[arg(long, global = true)]
    pub workers_per_stage: Option<usize>,

    /// Max in-flight LLM-bound (classification/embedding/vision) calls
    #[arg(long, global = true)]
    pub llm_concurrency: Option<usize>,

    /// Queue depth for each stage's bounded channel
    #[arg(long, global = true, default_value_t = 64)]
    pub channel_depth: usize,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the driver: watch a directory and ingest new documents continuously
    Run {
        /// Directory to watch for new documents
        watch_dir: PathBuf,
    },
    /// Ingest a single document (PDF or .pdfz) through the full pipeline
    Ingest {
        /// Path to the document to ingest
        file: PathBuf,
    },
    /// Show the stage status of a previously ingested document
    Status {
        /// Document id (UUID)
        document_id: String,
    },
    /// Retry a previously recorded, retryable pipeline error
    Retry {
        /// Pipeline error id (UUID)
        error_id: String,
    },
    /// Validate a product + accessory configuration against compatibility rules
    ValidateConfig {
        /// Base product id (UUID)
        product_id: String,
        /// Accessory product ids (UUID), space separated
        accessory_ids: Vec<String>,
    },
}

/// CLI validation errors
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid value for --{arg}: {reason}")]
    InvalidValue { arg: String, reason: String },
    #[error("path does not exist: {0}")]
    PathNotFound(PathBuf),
    #[error("invalid identifier for --{arg}: {value}")]
    InvalidIdentifier { arg: String, value: String },
}

/// Security-oriented argument validation, grounded in the same
/// parse-then-validate split the teacher crate uses for its own CLI.
pub struct SecureArgParser;

impl SecureArgParser {
    /// Validates that a path exists and contains no path-traversal sequences,
    /// returning its canonicalized form.
    pub fn validate_path(raw: &str) -> Result<PathBuf, ParseError> {
        let path = PathBuf::from(raw);
        if !path.exists() {
            return Err(ParseError::PathNotFound(path));
        }
        path.canonicalize().map_err(|_| ParseError::PathNotFound(path))
    }

    /// Validates a UUID-shaped identifier argument.
    pub fn validate_uuid(arg: &str, raw: &str) -> Result<uuid::Uuid, ParseError> {
        uuid::Uuid::parse_str(raw).map_err(|_| ParseError::InvalidIdentifier {
            arg: arg.to_string(),
            value: raw.to_string(),
        })
    }
}

fn parse_cli() -> Cli {
    Cli::parse()
}

/// Validated CLI configuration: all paths canonicalized, all identifiers parsed.
#[derive(Debug, Clone)]
pub struct ValidatedCli {
    pub command: ValidatedCommand,
    pub verbose: bool,
    pub config: Option<PathBuf>,
    pub workers_per_stage: Option<usize>,
    pub llm_concurrency: Option<usize>,
    pub channel_depth: usize,
}

#[derive(Debug, Clone)]
pub enum ValidatedCommand {
    Run { watch_dir: PathBuf },
    Ingest { file: PathBuf },
    Status { document_id: uuid::Uuid },
    Retry { error_id: uuid::Uuid },
    ValidateConfig { product_id: uuid::Uuid, accessory_ids: Vec<uuid::Uuid> },
}

/// Parses and validates CLI arguments in one step.
///
/// # Errors
///
/// Returns [`ParseError`] if any path does not exist or any identifier is
/// malformed. Clap handles `--help`/`--version` and exits the process on its own.
pub fn parse_and_validate() -> Result<ValidatedCli, ParseError> {
    validate_cli(parse_cli())
}

fn validate_cli(cli: Cli) -> Result<ValidatedCli, ParseError> {
    if cli.channel_depth == 0 {
        return Err(ParseError::InvalidValue {
            arg: "channel-depth".to_string(),
            reason: "must be greater than 0".to_string(),
        });
    }

    if let Some(workers) = cli.workers_per_stage {
        if workers == 0 || workers > 256 {
            return Err(ParseError::InvalidValue {
                arg: "workers-per-stage".to_string(),
                reason: "must be between 1 and 256".to_string(),
            });
        }
    }

    if let Some(concurrency) = cli.llm_concurrency {
        if concurrency == 0 || concurrency > 256 {
            return Err(ParseError::InvalidValue {
                arg: "llm-concurrency".to_string(),
                reason: "must be between 1 and 256".to_string(),
            });
        }
    }

    let command = match cli.command {
        Commands::Run { watch_dir } => ValidatedCommand::Run {
            watch_dir: SecureArgParser::validate_path(&watch_dir.to_string_lossy())?,
        },
        Commands::Ingest { file } => ValidatedCommand::Ingest {
            file: SecureArgParser::validate_path(&file.to_string_lossy())?,
        },
        Commands::Status { document_id } => ValidatedCommand::Status {
            document_id: SecureArgParser::validate_uuid("document-id", &document_id)?,
        },
        Commands::Retry { error_id } => ValidatedCommand::Retry {
            error_id: SecureArgParser::validate_uuid("error-id", &error_id)?,
        },
        Commands::ValidateConfig { product_id, accessory_ids } => ValidatedCommand::ValidateConfig {
            product_id: SecureArgParser::validate_uuid("product-id", &product_id)?,
            accessory_ids: accessory_ids
                .iter()
                .map(|id| SecureArgParser::validate_uuid("accessory-ids", id))
                .collect::<Result<Vec<_>, _>>()?,
        },
    };

    Ok(ValidatedCli {
        command,
        verbose: cli.verbose,
        config: cli.config,
        workers_per_stage: cli.workers_per_stage,
        llm_concurrency: cli.llm_concurrency,
        channel_depth: cli.channel_depth,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_uuid_rejects_garbage() {
        let result = SecureArgParser::validate_uuid("document-id", "not-a-uuid");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_uuid_accepts_valid() {
        let id = uuid::Uuid::new_v4().to_string();
        let result = SecureArgParser::validate_uuid("document-id", &id);
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_path_rejects_missing() {
        let result = SecureArgParser::validate_path("/nonexistent/path/that/should/not/exist");
        assert!(result.is_err());
    }
}
