// /////////////////////////////////////////////////////////////////////////////
// Krai Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # `krai-pipeline` Entry Point
//!
//! Composition root: parses the CLI, builds the `reqwest`/sqlx/lopdf
//! adapters behind each domain port, wires the shutdown coordinator, and
//! dispatches to the use case matching the chosen subcommand.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;

use krai_pipeline::application::use_cases::{
    IngestDocumentUseCase, RetryErrorUseCase, RunDriverUseCase, StatusUseCase, ValidateConfigurationUseCase,
};
use krai_pipeline::infrastructure::clients::{HttpEmbeddingClient, HttpOcrClient, HttpVisionClient};
use krai_pipeline::infrastructure::config::pipeline_config::PipelineConfig;
use krai_pipeline::infrastructure::pdf::LopdfPdfSource;
use krai_pipeline::infrastructure::repositories::catalog_repository::{
    SqliteErrorCodeRepository, SqliteManufacturerRepository, SqliteProductAccessoryRepository, SqliteProductRepository, SqliteProductSeriesRepository,
};
use krai_pipeline::infrastructure::repositories::content_repository::{SqliteChunkRepository, SqliteEmbeddingRepository, SqlitePartRepository, SqliteImageRepository};
use krai_pipeline::infrastructure::repositories::document_repository::SqliteDocumentRepository;
use krai_pipeline::infrastructure::repositories::object_store::FilesystemObjectStore;
use krai_pipeline::infrastructure::repositories::pipeline_error_repository::SqlitePipelineErrorRepository;
use krai_pipeline::infrastructure::repositories::schema;
use krai_pipeline::infrastructure::repositories::stage_marker_repository::SqliteStageMarkerRepository;
use krai_pipeline::infrastructure::runtime::orchestrator::StageOrchestrator;
use krai_pipeline::infrastructure::runtime::scheduler::StageScheduler;
use krai_pipeline_bootstrap::shutdown::ShutdownCoordinator;
use krai_pipeline_bootstrap::{result_to_exit_code, signals, ValidatedCommand};
use krai_pipeline_domain::error::PipelineError;
use krai_pipeline_domain::value_objects::ids::{DocumentId, PipelineErrorId, ProductId};

/// Per-stage lane capacity in the `StageScheduler`'s bounded channels.
const STAGE_CHANNEL_CAPACITY: usize = 32;

#[tokio::main]
async fn main() -> ExitCode {
    let validated = match krai_pipeline_bootstrap::parse_and_validate() {
        Ok(cli) => cli,
        Err(error) => {
            eprintln!("error: {error}");
            return ExitCode::from(64);
        }
    };

    krai_pipeline::infrastructure::logging::init_tracing();

    let result = run(validated).await;
    result_to_exit_code(result, |e: &PipelineError| e.category())
}

async fn run(cli: krai_pipeline_bootstrap::ValidatedCli) -> Result<(), PipelineError> {
    let shutdown = ShutdownCoordinator::default();
    signals::install_signal_handlers(shutdown.clone());

    let cancellation = tokio_util::sync::CancellationToken::new();
    let bootstrap_token = shutdown.token();
    let bridge_cancellation = cancellation.clone();
    tokio::spawn(async move {
        bootstrap_token.cancelled().await;
        bridge_cancellation.cancel();
    });

    let config = Arc::new(PipelineConfig::load(cli.config.as_ref().map(|p| p.to_string_lossy().into_owned()).as_deref())?);

    schema::create_database_if_missing(&config.database_connection_url)
        .await
        .map_err(|e| PipelineError::permanent("database", e.to_string()))?;
    let pool: SqlitePool = schema::initialize_database(&config.database_connection_url)
        .await
        .map_err(|e| PipelineError::permanent("database", e.to_string()))?;

    let documents = Arc::new(SqliteDocumentRepository::new(pool.clone()));
    let markers = Arc::new(SqliteStageMarkerRepository::new(pool.clone()));
    let errors = Arc::new(SqlitePipelineErrorRepository::new(pool.clone()));
    let chunks = Arc::new(SqliteChunkRepository::new(pool.clone()));
    let images = Arc::new(SqliteImageRepository::new(pool.clone()));
    let manufacturers = Arc::new(SqliteManufacturerRepository::new(pool.clone()));
    let products = Arc::new(SqliteProductRepository::new(pool.clone()));
    let series_repo = Arc::new(SqliteProductSeriesRepository::new(pool.clone()));
    let accessories = Arc::new(SqliteProductAccessoryRepository::new(pool.clone()));
    let error_codes = Arc::new(SqliteErrorCodeRepository::new(pool.clone()));
    let parts = Arc::new(SqlitePartRepository::new(pool.clone()));
    let embeddings = Arc::new(SqliteEmbeddingRepository::new(pool.clone()));

    let orchestrator = Arc::new(StageOrchestrator::new(documents.clone(), markers, errors.clone()));
    let scheduler = Arc::new(StageScheduler::start(STAGE_CHANNEL_CAPACITY, cancellation.clone()));

    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http_request_timeout_seconds))
        .build()
        .map_err(|e| PipelineError::permanent("http", e.to_string()))?;

    let embedding_client = Arc::new(HttpEmbeddingClient::new(
        http_client.clone(),
        config.embedding_service_url.clone(),
        config.embedding_api_key.clone(),
        config.embedding_model.clone(),
        config.embedding_dimension,
    ));
    let vision_client = Arc::new(HttpVisionClient::new(http_client.clone(), config.vision_service_url.clone(), config.vision_api_key.clone(), config.vision_model.clone()));
    let ocr_client = Arc::new(HttpOcrClient::new(http_client, config.vision_service_url.clone(), config.vision_api_key.clone(), config.vision_model.clone()));

    let page_text_source = Arc::new(LopdfPdfSource);
    let pdf_image_source = Arc::new(LopdfPdfSource);
    let object_store = Arc::new(FilesystemObjectStore::new(config.object_storage_endpoint.clone()));

    let ingest = Arc::new(IngestDocumentUseCase::new(
        documents.clone(),
        orchestrator,
        scheduler.clone(),
        chunks,
        images,
        manufacturers,
        products,
        series_repo,
        error_codes,
        parts,
        embeddings,
        page_text_source,
        pdf_image_source,
        object_store,
        embedding_client,
        vision_client,
        ocr_client,
        config.clone(),
    ));

    let outcome = match cli.command {
        ValidatedCommand::Ingest { file } => {
            let document_id = ingest.execute(&file).await?;
            println!("ingested document {document_id}");
            Ok(())
        }
        ValidatedCommand::Run { watch_dir } => run_driver(ingest.clone(), errors, watch_dir, cancellation.clone()).await,
        ValidatedCommand::Status { document_id } => {
            let status_use_case = StatusUseCase::new(documents);
            match status_use_case.execute(DocumentId::from_uuid(document_id)).await? {
                Some(report) => {
                    println!("{:#?}", report);
                    Ok(())
                }
                None => Err(PipelineError::input(format!("no document found with id {document_id}"))),
            }
        }
        ValidatedCommand::Retry { error_id } => {
            let retry_use_case = RetryErrorUseCase::new(errors);
            let outcome = retry_use_case.execute(PipelineErrorId::from_uuid(error_id)).await?;
            println!("{:?}", outcome);
            Ok(())
        }
        ValidatedCommand::ValidateConfig { product_id, accessory_ids } => {
            let validate_use_case = ValidateConfigurationUseCase::new(accessories);
            let accessory_ids: Vec<ProductId> = accessory_ids.into_iter().map(ProductId::from_uuid).collect();
            let result = validate_use_case.execute(ProductId::from_uuid(product_id), accessory_ids).await?;
            println!("{:#?}", result);
            if result.valid {
                Ok(())
            } else {
                Err(PipelineError::validation(result.errors.join("; ")))
            }
        }
    };

    cancellation.cancel();
    drop(ingest);
    match Arc::try_unwrap(scheduler) {
        Ok(scheduler) => scheduler.shutdown().await,
        Err(_) => tracing::debug!("scheduler still has outstanding references at shutdown"),
    }
    shutdown.complete_shutdown();

    outcome
}

async fn run_driver(
    ingest: Arc<IngestDocumentUseCase>,
    errors: Arc<SqlitePipelineErrorRepository>,
    watch_dir: std::path::PathBuf,
    cancellation: tokio_util::sync::CancellationToken,
) -> Result<(), PipelineError> {
    let processed_dir = watch_dir.join("processed");
    let driver = RunDriverUseCase::new(ingest, errors, watch_dir, processed_dir, Duration::from_secs(10));
    driver.execute(cancellation).await
}
