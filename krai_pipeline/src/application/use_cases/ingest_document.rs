// /////////////////////////////////////////////////////////////////////////////
// Krai Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Ingest Document Use Case
//!
//! Drives a single file through all eight canonical stages in order,
//! reporting progress and failures through the injected
//! [`StageOrchestrator`]. Grounded in the same construction-with-injected-
//! services shape as `adaptive_pipeline`'s `process_file` use case,
//! generalized from its compress/encrypt/checksum stages to this crate's
//! extraction/classification/embedding stages.

use std::future::Future;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use flate2::read::GzDecoder;
use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

use krai_pipeline_domain::entities::chunk::{Chunk, ChunkMetadata};
use krai_pipeline_domain::entities::document::Document;
use krai_pipeline_domain::entities::embedding::Embedding;
use krai_pipeline_domain::entities::error_code::{ErrorCodeRecord, ExtractionMethod};
use krai_pipeline_domain::entities::image::{Image, ImageType};
use krai_pipeline_domain::entities::manufacturer::Manufacturer;
use krai_pipeline_domain::entities::part::Part;
use krai_pipeline_domain::entities::product::Product;
use krai_pipeline_domain::entities::product_series::ProductSeries;
use krai_pipeline_domain::error::PipelineError;
use krai_pipeline_domain::repositories::catalog_repository::{
    ErrorCodeRepository, ManufacturerRepository, ProductRepository, ProductSeriesRepository,
};
use krai_pipeline_domain::repositories::content_repository::{ChunkRepository, EmbeddingRepository, ImageRepository, PartRepository};
use krai_pipeline_domain::repositories::document_repository::DocumentRepository;
use krai_pipeline_domain::repositories::object_store::{image_storage_path, ObjectStore};
use krai_pipeline_domain::services::chunker::{self, ChunkDraft, PageText, PageTextSource};
use krai_pipeline_domain::services::embedding_client::EmbeddingClient;
use krai_pipeline_domain::services::entity_resolution;
use krai_pipeline_domain::services::image_source::PdfImageSource;
use krai_pipeline_domain::services::normalizer;
use krai_pipeline_domain::services::vision_client::{OcrClient, VisionClient};
use krai_pipeline_domain::value_objects::chunking_config::ChunkingConfig;
use krai_pipeline_domain::value_objects::ids::{DocumentId, ManufacturerId};
use krai_pipeline_domain::value_objects::stage::StageName;

use crate::infrastructure::config::pipeline_config::PipelineConfig;
use crate::infrastructure::runtime::orchestrator::{StageFailure, StageOrchestrator};
use crate::infrastructure::runtime::scheduler::StageScheduler;

const DEFAULT_MAX_RETRIES: u32 = 3;

static ERROR_CODE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b([A-Z]{0,2}-?\d{2,3}(?:[.-]\d{2}){1,2})\b").unwrap());
static PART_NUMBER_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b([A-Z]{1,3}\d[\dA-Z-]{3,})\b").unwrap());
static SERIES_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b([A-Za-z0-9]+(?:\s[A-Za-z0-9]+){0,2})\s+Series\b").unwrap());
static MODEL_NUMBER_IN_FILENAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b([A-Z]{1,4}-?\d{2,5}[A-Za-z]{0,3})\b").unwrap());

/// Orchestrates Upload through Embedding & Search Indexing for one file.
pub struct IngestDocumentUseCase {
    documents: Arc<dyn DocumentRepository>,
    orchestrator: Arc<StageOrchestrator>,
    scheduler: Arc<StageScheduler>,
    chunks: Arc<dyn ChunkRepository>,
    images: Arc<dyn ImageRepository>,
    manufacturers: Arc<dyn ManufacturerRepository>,
    products: Arc<dyn ProductRepository>,
    series_repo: Arc<dyn ProductSeriesRepository>,
    error_codes: Arc<dyn ErrorCodeRepository>,
    parts: Arc<dyn PartRepository>,
    embeddings: Arc<dyn EmbeddingRepository>,
    page_text_source: Arc<dyn PageTextSource>,
    pdf_image_source: Arc<dyn PdfImageSource>,
    object_store: Arc<dyn ObjectStore>,
    embedding_client: Arc<dyn EmbeddingClient>,
    vision_client: Arc<dyn VisionClient>,
    ocr_client: Arc<dyn OcrClient>,
    config: Arc<PipelineConfig>,
}

impl IngestDocumentUseCase {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        documents: Arc<dyn DocumentRepository>,
        orchestrator: Arc<StageOrchestrator>,
        scheduler: Arc<StageScheduler>,
        chunks: Arc<dyn ChunkRepository>,
        images: Arc<dyn ImageRepository>,
        manufacturers: Arc<dyn ManufacturerRepository>,
        products: Arc<dyn ProductRepository>,
        series_repo: Arc<dyn ProductSeriesRepository>,
        error_codes: Arc<dyn ErrorCodeRepository>,
        parts: Arc<dyn PartRepository>,
        embeddings: Arc<dyn EmbeddingRepository>,
        page_text_source: Arc<dyn PageTextSource>,
        pdf_image_source: Arc<dyn PdfImageSource>,
        object_store: Arc<dyn ObjectStore>,
        embedding_client: Arc<dyn EmbeddingClient>,
        vision_client: Arc<dyn VisionClient>,
        ocr_client: Arc<dyn OcrClient>,
        config: Arc<PipelineConfig>,
    ) -> Self {
        Self {
            documents,
            orchestrator,
            scheduler,
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
            config,
        }
    }

    #[tracing::instrument(skip(self), fields(file = %file_path.display()))]
    pub async fn execute(&self, file_path: &Path) -> Result<DocumentId, PipelineError> {
        let correlation_id = Uuid::new_v4();
        let raw_bytes = tokio::fs::read(file_path).await?;
        if raw_bytes.is_empty() {
            return Err(PipelineError::input(format!("{} is a zero-byte file", file_path.display())));
        }

        let is_compressed = file_path.extension().and_then(|e| e.to_str()) == Some("pdfz");
        let pdf_bytes = if is_compressed { decompress(&raw_bytes, file_path)? } else { raw_bytes };

        let source_path_holder;
        let source_path: &Path = if is_compressed {
            let temp = tempfile::Builder::new().suffix(".pdf").tempfile().map_err(PipelineError::from)?;
            tokio::fs::write(temp.path(), &pdf_bytes).await?;
            source_path_holder = temp;
            source_path_holder.path()
        } else {
            file_path
        };

        let file_hash = sha256_hex(&pdf_bytes);
        let filename = file_path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();

        let pages = self.page_text_source.extract_pages(source_path).await?;

        let document = Document::new(file_hash.clone(), filename.clone(), pdf_bytes.len() as u64, pages.len() as u32)?;
        let document_id = self.documents.upsert(&document).await?;

        self.run_stage(document_id, StageName::Upload, correlation_id, file_hash.clone(), async { Ok(()) })
            .await?;

        let drafts = self
            .run_text_extraction(document_id, correlation_id, &pages)
            .await?;

        self.run_table_extraction(document_id, correlation_id, &drafts).await?;

        self.run_image_processing(document_id, correlation_id, source_path).await?;

        let manufacturer_id = self
            .run_classification(document_id, correlation_id, &filename, &pages, &drafts)
            .await?;

        self.run_parts_extraction(document_id, correlation_id, manufacturer_id, &drafts).await?;

        self.run_series_detection(document_id, correlation_id, manufacturer_id, &filename, &pages).await?;

        self.run_embedding(document_id, correlation_id, &drafts).await?;

        Ok(document_id)
    }

    /// Looks up the document a file would resolve to without ingesting it,
    /// by recomputing the same content hash `execute` uses. Lets the `run`
    /// driver check a file's retry/give-up state (`SPEC_FULL.md` §4.8)
    /// before deciding whether to re-ingest it.
    pub async fn resolve_existing_document(&self, file_path: &Path) -> Result<Option<DocumentId>, PipelineError> {
        let raw_bytes = tokio::fs::read(file_path).await?;
        if raw_bytes.is_empty() {
            return Ok(None);
        }
        let is_compressed = file_path.extension().and_then(|e| e.to_str()) == Some("pdfz");
        let pdf_bytes = if is_compressed { decompress(&raw_bytes, file_path)? } else { raw_bytes };
        let file_hash = sha256_hex(&pdf_bytes);

        let document = self.documents.find_by_file_hash(&file_hash).await?;
        Ok(document.map(|document| document.id))
    }

    /// Runs one stage's `work`, skipping it if a fresh completion marker
    /// already exists, and routing failures through the orchestrator so
    /// `documents.stage_status`/`pipeline_errors` stay authoritative.
    ///
    /// `work` itself is submitted to the [`StageScheduler`], not awaited
    /// directly: this is what lets another document's same-stage work run
    /// concurrently with this one, up to that stage's worker count, while
    /// this document's own stages still execute in their fixed order.
    async fn run_stage<F>(&self, document_id: DocumentId, stage: StageName, correlation_id: Uuid, data_hash: String, work: F) -> Result<(), PipelineError>
    where
        F: Future<Output = Result<(), PipelineError>> + Send + 'static,
    {
        if self.orchestrator.skip_if_complete(document_id, stage, &data_hash).await? {
            return Ok(());
        }
        self.orchestrator.start_stage(document_id, stage).await?;

        match self.scheduler.submit_and_await(document_id, stage, correlation_id, Box::pin(work)).await {
            Ok(()) => {
                self.orchestrator.complete_stage(document_id, stage, data_hash).await?;
                Ok(())
            }
            Err(error) => {
                let failure = if error.is_recoverable() {
                    StageFailure::Transient(error.clone())
                } else {
                    StageFailure::Permanent(error.clone())
                };
                self.orchestrator
                    .fail_stage(document_id, stage, failure, correlation_id, DEFAULT_MAX_RETRIES)
                    .await?;
                Err(error)
            }
        }
    }

    async fn run_text_extraction(&self, document_id: DocumentId, correlation_id: Uuid, pages: &[PageText]) -> Result<Vec<ChunkDraft>, PipelineError> {
        let config = ChunkingConfig::default();
        let data_hash = chunker::content_hash(&pages.iter().map(|p| p.text.as_str()).collect::<Vec<_>>().join("\n"));
        let drafts = chunker::chunk_pages(pages, &config)?;

        let chunks_repo = self.chunks.clone();
        let entities = drafts_to_chunks(document_id, &drafts)?;
        self.run_stage(document_id, StageName::TextExtraction, correlation_id, data_hash, async move {
            chunks_repo.insert_all(&entities).await
        })
        .await?;

        Ok(drafts)
    }

    /// Table extraction is a verification pass over chunks the chunker
    /// already tagged `ChunkType::Table` during text extraction (`chunk_pages`
    /// step 5 classifies table-shaped text as it splits), rather than a
    /// second independent extraction — see the design note in DESIGN.md.
    async fn run_table_extraction(&self, document_id: DocumentId, correlation_id: Uuid, drafts: &[ChunkDraft]) -> Result<(), PipelineError> {
        use krai_pipeline_domain::entities::chunk::ChunkType;
        let table_count = drafts.iter().filter(|d| d.chunk_type == ChunkType::Table).count();
        let data_hash = chunker::content_hash(&table_count.to_string());
        self.run_stage(document_id, StageName::TableExtraction, correlation_id, data_hash, async move {
            tracing::debug!(table_count, "table extraction verified already-tagged table chunks");
            Ok(())
        })
        .await
    }

    async fn run_image_processing(&self, document_id: DocumentId, correlation_id: Uuid, source_path: &Path) -> Result<(), PipelineError> {
        let page_images = self.pdf_image_source.extract_images(source_path).await?;
        let page_images = if page_images.is_empty() {
            self.pdf_image_source.render_pages(source_path, 150).await?
        } else {
            page_images
        };

        let data_hash = chunker::content_hash(&page_images.len().to_string());
        let images_repo = self.images.clone();
        let object_store = self.object_store.clone();
        let vision_client = self.vision_client.clone();
        let ocr_client = self.ocr_client.clone();
        let enable_context = self.config.enable_image_context;

        self.run_stage(document_id, StageName::ImageProcessing, correlation_id, data_hash, async move {
            for page_image in page_images {
                let file_hash = sha256_hex(&page_image.png_bytes);
                let storage_path = image_storage_path(&file_hash);
                object_store.put(&storage_path, page_image.png_bytes.clone()).await?;

                let mut image = Image::new(
                    document_id,
                    page_image.page_number,
                    page_image.image_index,
                    file_hash,
                    storage_path,
                    page_image.width_px,
                    page_image.height_px,
                    "png".to_string(),
                    ImageType::Photo,
                );

                if enable_context {
                    let description = vision_client.describe_image(&page_image.png_bytes).await?;
                    image = image.with_vision_result(description.description, description.confidence)?;
                    image.ocr_text = ocr_client.extract_text(&page_image.png_bytes).await?;
                }

                images_repo.upsert(&image).await?;
            }
            Ok(())
        })
        .await
    }

    async fn run_classification(
        &self,
        document_id: DocumentId,
        correlation_id: Uuid,
        filename: &str,
        pages: &[PageText],
        drafts: &[ChunkDraft],
    ) -> Result<Option<ManufacturerId>, PipelineError> {
        let raw_manufacturer = guess_manufacturer_from_filename(filename);
        let manufacturer_name = normalizer::normalize_manufacturer_name(&raw_manufacturer);
        let model_number = guess_model_number(filename, pages);

        let data_hash = chunker::content_hash(&format!("{manufacturer_name}|{model_number:?}"));

        let manufacturers = self.manufacturers.clone();
        let products = self.products.clone();
        let error_codes = self.error_codes.clone();
        let documents = self.documents.clone();
        let manufacturer_name_owned = manufacturer_name.clone();
        let model_number_owned = model_number.clone();
        let drafts_owned = drafts.to_vec();

        let manufacturer_id_cell = std::sync::Arc::new(std::sync::Mutex::new(None));
        let manufacturer_id_cell_clone = manufacturer_id_cell.clone();

        self.run_stage(document_id, StageName::Classification, correlation_id, data_hash, async move {
            let manufacturer = Manufacturer::new(manufacturer_name_owned.clone())?;
            let manufacturer_id = manufacturers.find_or_create(manufacturer).await?;
            *manufacturer_id_cell_clone.lock().unwrap() = Some(manufacturer_id);

            let mut models = std::collections::BTreeSet::new();
            if let Some(model_number) = &model_number_owned {
                let product_type = entity_resolution::classify_product_type(model_number, None);
                let product = Product::new(manufacturer_id, model_number.clone(), product_type)?;
                products.find_or_create(product).await?;
                models.insert(model_number.clone());
            }

            for draft in &drafts_owned {
                if !draft.contains_error_code {
                    continue;
                }
                for capture in ERROR_CODE_PATTERN.captures_iter(&draft.content) {
                    let code = capture[1].to_string();
                    let record = ErrorCodeRecord::new(
                        document_id,
                        manufacturer_id,
                        code,
                        draft.content.chars().take(200).collect(),
                        draft.page_start,
                        0.6,
                        ExtractionMethod::Regex,
                    )?;
                    error_codes.upsert(record).await?;
                }
            }

            documents
                .update_classification(
                    document_id,
                    krai_pipeline_domain::entities::document::DocumentType::ServiceManual,
                    Some(manufacturer_id),
                    None,
                    models,
                )
                .await
        })
        .await?;

        Ok(*manufacturer_id_cell.lock().unwrap())
    }

    async fn run_parts_extraction(&self, document_id: DocumentId, correlation_id: Uuid, manufacturer_id: Option<ManufacturerId>, drafts: &[ChunkDraft]) -> Result<(), PipelineError> {
        let Some(manufacturer_id) = manufacturer_id else {
            return Ok(());
        };

        let data_hash = chunker::content_hash(&drafts.iter().filter(|d| d.contains_part_number).count().to_string());
        let parts_repo = self.parts.clone();
        let drafts_owned = drafts.to_vec();

        self.run_stage(document_id, StageName::PartsExtraction, correlation_id, data_hash, async move {
            for draft in &drafts_owned {
                if !draft.contains_part_number {
                    continue;
                }
                for capture in PART_NUMBER_PATTERN.captures_iter(&draft.content) {
                    let part_number = capture[1].to_string();
                    let part = Part::new(document_id, manufacturer_id, part_number)?.with_description(
                        draft.content.chars().take(200).collect(),
                        draft.page_start,
                    );
                    parts_repo.upsert(&part).await?;
                }
            }
            Ok(())
        })
        .await
    }

    async fn run_series_detection(
        &self,
        document_id: DocumentId,
        correlation_id: Uuid,
        manufacturer_id: Option<ManufacturerId>,
        filename: &str,
        pages: &[PageText],
    ) -> Result<(), PipelineError> {
        let Some(manufacturer_id) = manufacturer_id else {
            return Ok(());
        };

        let haystack = format!("{filename}\n{}", pages.first().map(|p| p.text.as_str()).unwrap_or(""));
        let series_name = SERIES_MARKER.captures(&haystack).map(|c| format!("{} Series", &c[1]));
        let data_hash = chunker::content_hash(series_name.as_deref().unwrap_or(""));

        let series_repo = self.series_repo.clone();
        self.run_stage(document_id, StageName::SeriesDetection, correlation_id, data_hash, async move {
            if let Some(series_name) = series_name {
                let series = ProductSeries::new(manufacturer_id, series_name)?;
                series_repo.find_or_create(series).await?;
            }
            Ok(())
        })
        .await
    }

    async fn run_embedding(&self, document_id: DocumentId, correlation_id: Uuid, drafts: &[ChunkDraft]) -> Result<(), PipelineError> {
        let data_hash = chunker::content_hash(&drafts.len().to_string());
        let embedding_client = self.embedding_client.clone();
        let embeddings_repo = self.embeddings.clone();
        let chunks_repo = self.chunks.clone();

        self.run_stage(document_id, StageName::EmbeddingAndSearch, correlation_id, data_hash, async move {
            let persisted_chunks = chunks_repo.find_by_document(document_id).await?;
            if persisted_chunks.is_empty() {
                return Ok(());
            }

            let texts: Vec<String> = persisted_chunks.iter().map(|c| c.content.clone()).collect();
            let vectors = embedding_client.embed_batch(&texts).await?;

            for (chunk, vector) in persisted_chunks.iter().zip(vectors.into_iter()) {
                let embedding = Embedding::new(chunk.id, vector, embedding_client.model_name().to_string(), embedding_client.dimension())?;
                embeddings_repo.upsert(&embedding).await?;
            }
            Ok(())
        })
        .await
    }
}

fn decompress(bytes: &[u8], path: &Path) -> Result<Vec<u8>, PipelineError> {
    let mut decoder = GzDecoder::new(bytes);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| PipelineError::input(format!("failed to decompress {}: {e}", path.display())))?;
    Ok(out)
}

fn sha256_hex(bytes: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    format!("{:x}", Sha256::digest(bytes))
}

fn drafts_to_chunks(document_id: DocumentId, drafts: &[ChunkDraft]) -> Result<Vec<Chunk>, PipelineError> {
    drafts
        .iter()
        .map(|draft| {
            let hash = chunker::content_hash(&draft.content);
            let chunk = Chunk::new(
                document_id,
                draft.chunk_index,
                draft.page_start,
                draft.page_end,
                draft.content.clone(),
                hash,
                draft.chunk_type,
                draft.section_hierarchy.clone(),
            )?;
            chunk.with_metadata(ChunkMetadata {
                confidence: 0.8,
                contains_error_code: draft.contains_error_code,
                contains_procedure: draft.contains_procedure,
                contains_part_number: draft.contains_part_number,
                error_code: None,
            })
        })
        .collect()
}

/// Heuristic manufacturer guess from a service-manual filename, e.g.
/// `hp_laserjet_m454dn_sm.pdf` -> "hp". Falls back to "Unknown" when the
/// filename carries no recognizable leading token.
fn guess_manufacturer_from_filename(filename: &str) -> String {
    let stem = Path::new(filename).file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    stem.split(['_', '-', ' ']).next().filter(|s| !s.is_empty()).unwrap_or("Unknown").to_string()
}

/// Heuristic model-number guess: the filename is checked first (service
/// manual filenames usually embed the model), then the first page of text.
fn guess_model_number(filename: &str, pages: &[PageText]) -> Option<String> {
    if let Some(capture) = MODEL_NUMBER_IN_FILENAME.captures(filename) {
        return Some(capture[1].to_string());
    }
    pages.first().and_then(|page| MODEL_NUMBER_IN_FILENAME.captures(&page.text)).map(|c| c[1].to_string())
}
