// /////////////////////////////////////////////////////////////////////////////
// Krai Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # SQLite Content Repositories
//!
//! Chunk/Image/Embedding/Link/Video/Part adapters, grouped in one module
//! since every port shares the `(document_id, ...)` scoping shape
//! (`SPEC_FULL.md` §3).

use std::cmp::Ordering;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use krai_pipeline_domain::entities::chunk::{Chunk, ChunkMetadata, ChunkType};
use krai_pipeline_domain::entities::embedding::Embedding;
use krai_pipeline_domain::entities::image::{Image, ImageType};
use krai_pipeline_domain::entities::link::{LinkEnrichment, ScrapeStatus, ScrapedMetadata};
use krai_pipeline_domain::entities::part::Part;
use krai_pipeline_domain::entities::video::Video;
use krai_pipeline_domain::error::PipelineError;
use krai_pipeline_domain::repositories::content_repository::{
    ChunkRepository, EmbeddingRepository, ImageRepository, LinkRepository, PartRepository, VideoRepository,
};
use krai_pipeline_domain::value_objects::ids::{ChunkId, DocumentId, ImageId, LinkId, ManufacturerId, PartId, VideoId};

fn db_err(e: sqlx::Error) -> PipelineError {
    PipelineError::transient("database", e.to_string())
}

fn chunk_type_str(t: ChunkType) -> &'static str {
    match t {
        ChunkType::Text => "text",
        ChunkType::Procedure => "procedure",
        ChunkType::ErrorCode => "error_code",
        ChunkType::List => "list",
        ChunkType::Table => "table",
    }
}

fn parse_chunk_type(s: &str) -> ChunkType {
    match s {
        "procedure" => ChunkType::Procedure,
        "error_code" => ChunkType::ErrorCode,
        "list" => ChunkType::List,
        "table" => ChunkType::Table,
        _ => ChunkType::Text,
    }
}

fn image_type_str(t: ImageType) -> &'static str {
    match t {
        ImageType::Diagram => "diagram",
        ImageType::Photo => "photo",
        ImageType::VectorGraphic => "vector_graphic",
        ImageType::PngConversion => "png_conversion",
    }
}

fn parse_image_type(s: &str) -> ImageType {
    match s {
        "photo" => ImageType::Photo,
        "vector_graphic" => ImageType::VectorGraphic,
        "png_conversion" => ImageType::PngConversion,
        _ => ImageType::Diagram,
    }
}

fn scrape_status_str(s: ScrapeStatus) -> &'static str {
    match s {
        ScrapeStatus::Pending => "pending",
        ScrapeStatus::Success => "success",
        ScrapeStatus::Failed => "failed",
    }
}

fn parse_scrape_status(s: &str) -> ScrapeStatus {
    match s {
        "success" => ScrapeStatus::Success,
        "failed" => ScrapeStatus::Failed,
        _ => ScrapeStatus::Pending,
    }
}

fn parse_rfc3339(s: &str) -> Result<chrono::DateTime<chrono::Utc>, PipelineError> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|e| PipelineError::validation(e.to_string()))
}

pub struct SqliteChunkRepository {
    pool: SqlitePool,
}

impl SqliteChunkRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn row_to_chunk(row: &sqlx::sqlite::SqliteRow) -> Result<Chunk, PipelineError> {
    let id: String = row.try_get("id").map_err(db_err)?;
    let document_id: String = row.try_get("document_id").map_err(db_err)?;
    let section_hierarchy: String = row.try_get("section_hierarchy").map_err(db_err)?;
    let metadata: String = row.try_get("metadata").map_err(db_err)?;

    Ok(Chunk {
        id: ChunkId::from_str(&id).map_err(|e| PipelineError::validation(e.to_string()))?,
        document_id: DocumentId::from_str(&document_id).map_err(|e| PipelineError::validation(e.to_string()))?,
        chunk_index: row.try_get::<i64, _>("chunk_index").map_err(db_err)? as u32,
        page_start: row.try_get::<i64, _>("page_start").map_err(db_err)? as u32,
        page_end: row.try_get::<i64, _>("page_end").map_err(db_err)? as u32,
        content: row.try_get("content").map_err(db_err)?,
        content_hash: row.try_get("content_hash").map_err(db_err)?,
        chunk_type: parse_chunk_type(&row.try_get::<String, _>("chunk_type").map_err(db_err)?),
        section_hierarchy: serde_json::from_str(&section_hierarchy)?,
        metadata: serde_json::from_str::<ChunkMetadata>(&metadata)?,
    })
}

#[async_trait]
impl ChunkRepository for SqliteChunkRepository {
    async fn insert_all(&self, chunks: &[Chunk]) -> Result<(), PipelineError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        for chunk in chunks {
            let section_hierarchy = serde_json::to_string(&chunk.section_hierarchy)?;
            let metadata = serde_json::to_string(&chunk.metadata)?;

            sqlx::query(
                "INSERT INTO chunks (id, document_id, chunk_index, page_start, page_end, content, content_hash, chunk_type, section_hierarchy, metadata) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
                 ON CONFLICT (document_id, content_hash) DO NOTHING",
            )
            .bind(chunk.id.to_string())
            .bind(chunk.document_id.to_string())
            .bind(chunk.chunk_index as i64)
            .bind(chunk.page_start as i64)
            .bind(chunk.page_end as i64)
            .bind(&chunk.content)
            .bind(&chunk.content_hash)
            .bind(chunk_type_str(chunk.chunk_type))
            .bind(section_hierarchy)
            .bind(metadata)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }
        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn find_by_document(&self, document_id: DocumentId) -> Result<Vec<Chunk>, PipelineError> {
        let rows = sqlx::query("SELECT * FROM chunks WHERE document_id = ? ORDER BY chunk_index")
            .bind(document_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter().map(row_to_chunk).collect()
    }

    async fn find_by_id(&self, id: ChunkId) -> Result<Option<Chunk>, PipelineError> {
        let row = sqlx::query("SELECT * FROM chunks WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(row_to_chunk).transpose()
    }
}

pub struct SqliteImageRepository {
    pool: SqlitePool,
}

impl SqliteImageRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn row_to_image(row: &sqlx::sqlite::SqliteRow) -> Result<Image, PipelineError> {
    let id: String = row.try_get("id").map_err(db_err)?;
    let document_id: String = row.try_get("document_id").map_err(db_err)?;
    let chunk_id: Option<String> = row.try_get("chunk_id").map_err(db_err)?;

    Ok(Image {
        id: ImageId::from_str(&id).map_err(|e| PipelineError::validation(e.to_string()))?,
        document_id: DocumentId::from_str(&document_id).map_err(|e| PipelineError::validation(e.to_string()))?,
        page_number: row.try_get::<i64, _>("page_number").map_err(db_err)? as u32,
        image_index: row.try_get::<i64, _>("image_index").map_err(db_err)? as u32,
        file_hash: row.try_get("file_hash").map_err(db_err)?,
        storage_path: row.try_get("storage_path").map_err(db_err)?,
        width_px: row.try_get::<i64, _>("width_px").map_err(db_err)? as u32,
        height_px: row.try_get::<i64, _>("height_px").map_err(db_err)? as u32,
        image_format: row.try_get("image_format").map_err(db_err)?,
        image_type: parse_image_type(&row.try_get::<String, _>("image_type").map_err(db_err)?),
        ai_description: row.try_get("ai_description").map_err(db_err)?,
        ai_confidence: row.try_get::<Option<f64>, _>("ai_confidence").map_err(db_err)?.map(|v| v as f32),
        ocr_text: row.try_get("ocr_text").map_err(db_err)?,
        chunk_id: chunk_id
            .map(|s| krai_pipeline_domain::value_objects::ids::ChunkId::from_str(&s))
            .transpose()
            .map_err(|e| PipelineError::validation(e.to_string()))?,
    })
}

#[async_trait]
impl ImageRepository for SqliteImageRepository {
    async fn upsert(&self, image: &Image) -> Result<ImageId, PipelineError> {
        let existing = sqlx::query("SELECT id FROM images WHERE document_id = ? AND file_hash = ?")
            .bind(image.document_id.to_string())
            .bind(&image.file_hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        if let Some(row) = existing {
            let id: String = row.try_get("id").map_err(db_err)?;
            let id = ImageId::from_str(&id).map_err(|e| PipelineError::validation(e.to_string()))?;

            sqlx::query("UPDATE images SET ai_description = ?, ai_confidence = ?, ocr_text = ?, chunk_id = ? WHERE id = ?")
                .bind(&image.ai_description)
                .bind(image.ai_confidence.map(|v| v as f64))
                .bind(&image.ocr_text)
                .bind(image.chunk_id.map(|id| id.to_string()))
                .bind(id.to_string())
                .execute(&self.pool)
                .await
                .map_err(db_err)?;
            return Ok(id);
        }

        sqlx::query(
            "INSERT INTO images (id, document_id, page_number, image_index, file_hash, storage_path, width_px, height_px, image_format, image_type, ai_description, ai_confidence, ocr_text, chunk_id) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(image.id.to_string())
        .bind(image.document_id.to_string())
        .bind(image.page_number as i64)
        .bind(image.image_index as i64)
        .bind(&image.file_hash)
        .bind(&image.storage_path)
        .bind(image.width_px as i64)
        .bind(image.height_px as i64)
        .bind(&image.image_format)
        .bind(image_type_str(image.image_type))
        .bind(&image.ai_description)
        .bind(image.ai_confidence.map(|v| v as f64))
        .bind(&image.ocr_text)
        .bind(image.chunk_id.map(|id| id.to_string()))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(image.id)
    }

    async fn find_by_document(&self, document_id: DocumentId) -> Result<Vec<Image>, PipelineError> {
        let rows = sqlx::query("SELECT * FROM images WHERE document_id = ? ORDER BY page_number, image_index")
            .bind(document_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter().map(row_to_image).collect()
    }

    async fn find_by_hash(&self, file_hash: &str) -> Result<Option<Image>, PipelineError> {
        let row = sqlx::query("SELECT * FROM images WHERE file_hash = ?")
            .bind(file_hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(row_to_image).transpose()
    }
}

pub struct SqliteEmbeddingRepository {
    pool: SqlitePool,
}

impl SqliteEmbeddingRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EmbeddingRepository for SqliteEmbeddingRepository {
    async fn upsert(&self, embedding: &Embedding) -> Result<(), PipelineError> {
        let vector = serde_json::to_string(&embedding.vector)?;

        sqlx::query(
            "INSERT INTO embeddings (chunk_id, vector, model_name, created_at) VALUES (?, ?, ?, ?) \
             ON CONFLICT (chunk_id) DO UPDATE SET vector = excluded.vector, model_name = excluded.model_name, created_at = excluded.created_at",
        )
        .bind(embedding.chunk_id.to_string())
        .bind(vector)
        .bind(&embedding.model_name)
        .bind(embedding.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    /// No native vector index in SQLite: scores every row for `model_name`
    /// in-process and keeps the top `top_k`, per `SPEC_FULL.md` §4.7's note
    /// that nearest-neighbor search is a full scan at this data scale.
    async fn search(&self, query_vector: &[f32], model_name: &str, top_k: usize) -> Result<Vec<(ChunkId, f32)>, PipelineError> {
        let rows = sqlx::query("SELECT chunk_id, vector FROM embeddings WHERE model_name = ?")
            .bind(model_name)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        let mut scored = Vec::with_capacity(rows.len());
        for row in &rows {
            let chunk_id: String = row.try_get("chunk_id").map_err(db_err)?;
            let vector: String = row.try_get("vector").map_err(db_err)?;
            let vector: Vec<f32> = serde_json::from_str(&vector)?;
            let chunk_id = ChunkId::from_str(&chunk_id).map_err(|e| PipelineError::validation(e.to_string()))?;
            scored.push((chunk_id, cosine_similarity(query_vector, &vector)));
        }

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

pub struct SqliteLinkRepository {
    pool: SqlitePool,
}

impl SqliteLinkRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn row_to_link(row: &sqlx::sqlite::SqliteRow) -> Result<LinkEnrichment, PipelineError> {
    let id: String = row.try_get("id").map_err(db_err)?;
    let document_id: String = row.try_get("document_id").map_err(db_err)?;
    let scraped_metadata: String = row.try_get("scraped_metadata").map_err(db_err)?;
    let scraped_at: Option<String> = row.try_get("scraped_at").map_err(db_err)?;

    Ok(LinkEnrichment {
        id: LinkId::from_str(&id).map_err(|e| PipelineError::validation(e.to_string()))?,
        document_id: DocumentId::from_str(&document_id).map_err(|e| PipelineError::validation(e.to_string()))?,
        url: row.try_get("url").map_err(db_err)?,
        scrape_status: parse_scrape_status(&row.try_get::<String, _>("scrape_status").map_err(db_err)?),
        scraped_content: row.try_get("scraped_content").map_err(db_err)?,
        content_hash: row.try_get("content_hash").map_err(db_err)?,
        scraped_metadata: serde_json::from_str::<ScrapedMetadata>(&scraped_metadata)?,
        scraped_at: scraped_at.map(|s| parse_rfc3339(&s)).transpose()?,
    })
}

#[async_trait]
impl LinkRepository for SqliteLinkRepository {
    async fn upsert(&self, link: &LinkEnrichment) -> Result<LinkId, PipelineError> {
        let scraped_metadata = serde_json::to_string(&link.scraped_metadata)?;

        sqlx::query(
            "INSERT INTO links (id, document_id, url, scrape_status, scraped_content, content_hash, scraped_metadata, scraped_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT (document_id, url) DO UPDATE SET scrape_status = excluded.scrape_status, scraped_content = excluded.scraped_content, \
                content_hash = excluded.content_hash, scraped_metadata = excluded.scraped_metadata, scraped_at = excluded.scraped_at",
        )
        .bind(link.id.to_string())
        .bind(link.document_id.to_string())
        .bind(&link.url)
        .bind(scrape_status_str(link.scrape_status))
        .bind(&link.scraped_content)
        .bind(&link.content_hash)
        .bind(scraped_metadata)
        .bind(link.scraped_at.map(|t| t.to_rfc3339()))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        let row = sqlx::query("SELECT id FROM links WHERE document_id = ? AND url = ?")
            .bind(link.document_id.to_string())
            .bind(&link.url)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        let id: String = row.try_get("id").map_err(db_err)?;
        LinkId::from_str(&id).map_err(|e| PipelineError::validation(e.to_string()))
    }

    async fn find_pending(&self, document_id: DocumentId) -> Result<Vec<LinkEnrichment>, PipelineError> {
        let rows = sqlx::query("SELECT * FROM links WHERE document_id = ? AND scrape_status = 'pending'")
            .bind(document_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter().map(row_to_link).collect()
    }
}

pub struct SqliteVideoRepository {
    pool: SqlitePool,
}

impl SqliteVideoRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn row_to_video(row: &sqlx::sqlite::SqliteRow) -> Result<Video, PipelineError> {
    let id: String = row.try_get("id").map_err(db_err)?;
    let document_id: String = row.try_get("document_id").map_err(db_err)?;

    Ok(Video {
        id: VideoId::from_str(&id).map_err(|e| PipelineError::validation(e.to_string()))?,
        document_id: DocumentId::from_str(&document_id).map_err(|e| PipelineError::validation(e.to_string()))?,
        canonical_url: row.try_get("canonical_url").map_err(db_err)?,
        title: row.try_get("title").map_err(db_err)?,
        description: row.try_get("description").map_err(db_err)?,
    })
}

#[async_trait]
impl VideoRepository for SqliteVideoRepository {
    async fn upsert(&self, video: &Video) -> Result<VideoId, PipelineError> {
        let existing = sqlx::query("SELECT id FROM videos WHERE document_id = ? AND canonical_url = ?")
            .bind(video.document_id.to_string())
            .bind(&video.canonical_url)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        if let Some(row) = existing {
            let id: String = row.try_get("id").map_err(db_err)?;
            return VideoId::from_str(&id).map_err(|e| PipelineError::validation(e.to_string()));
        }

        sqlx::query("INSERT INTO videos (id, document_id, canonical_url, title, description) VALUES (?, ?, ?, ?, ?)")
            .bind(video.id.to_string())
            .bind(video.document_id.to_string())
            .bind(&video.canonical_url)
            .bind(&video.title)
            .bind(&video.description)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(video.id)
    }

    async fn find_by_document(&self, document_id: DocumentId) -> Result<Vec<Video>, PipelineError> {
        let rows = sqlx::query("SELECT * FROM videos WHERE document_id = ?")
            .bind(document_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter().map(row_to_video).collect()
    }
}

pub struct SqlitePartRepository {
    pool: SqlitePool,
}

impl SqlitePartRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn row_to_part(row: &sqlx::sqlite::SqliteRow) -> Result<Part, PipelineError> {
    let id: String = row.try_get("id").map_err(db_err)?;
    let document_id: String = row.try_get("document_id").map_err(db_err)?;
    let manufacturer_id: String = row.try_get("manufacturer_id").map_err(db_err)?;
    let page_number: Option<i64> = row.try_get("page_number").map_err(db_err)?;

    Ok(Part {
        id: PartId::from_str(&id).map_err(|e| PipelineError::validation(e.to_string()))?,
        document_id: DocumentId::from_str(&document_id).map_err(|e| PipelineError::validation(e.to_string()))?,
        manufacturer_id: ManufacturerId::from_str(&manufacturer_id).map_err(|e| PipelineError::validation(e.to_string()))?,
        part_number: row.try_get("part_number").map_err(db_err)?,
        description: row.try_get("description").map_err(db_err)?,
        page_number: page_number.map(|v| v as u32),
    })
}

#[async_trait]
impl PartRepository for SqlitePartRepository {
    async fn upsert(&self, part: &Part) -> Result<PartId, PipelineError> {
        let existing = sqlx::query("SELECT id FROM parts WHERE document_id = ? AND part_number = ?")
            .bind(part.document_id.to_string())
            .bind(&part.part_number)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        if let Some(row) = existing {
            let id: String = row.try_get("id").map_err(db_err)?;
            let id = PartId::from_str(&id).map_err(|e| PipelineError::validation(e.to_string()))?;

            sqlx::query("UPDATE parts SET description = ?, page_number = ? WHERE id = ?")
                .bind(&part.description)
                .bind(part.page_number.map(|v| v as i64))
                .bind(id.to_string())
                .execute(&self.pool)
                .await
                .map_err(db_err)?;
            return Ok(id);
        }

        sqlx::query("INSERT INTO parts (id, document_id, manufacturer_id, part_number, description, page_number) VALUES (?, ?, ?, ?, ?, ?)")
            .bind(part.id.to_string())
            .bind(part.document_id.to_string())
            .bind(part.manufacturer_id.to_string())
            .bind(&part.part_number)
            .bind(&part.description)
            .bind(part.page_number.map(|v| v as i64))
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(part.id)
    }

    async fn find_by_document(&self, document_id: DocumentId) -> Result<Vec<Part>, PipelineError> {
        let rows = sqlx::query("SELECT * FROM parts WHERE document_id = ?")
            .bind(document_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter().map(row_to_part).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::repositories::document_repository::SqliteDocumentRepository;
    use crate::infrastructure::repositories::schema::initialize_database;
    use krai_pipeline_domain::entities::document::Document;
    use krai_pipeline_domain::repositories::document_repository::DocumentRepository;

    async fn pool() -> SqlitePool {
        let temp = tempfile::NamedTempFile::new().unwrap();
        let url = format!("sqlite://{}", temp.path().to_str().unwrap());
        drop(temp);
        initialize_database(&url).await.unwrap()
    }

    async fn document_id(pool: &SqlitePool, seed: &str) -> DocumentId {
        let documents = SqliteDocumentRepository::new(pool.clone());
        documents
            .upsert(&Document::new(seed.repeat(64 / seed.len().max(1)).chars().take(64).collect(), "m.pdf".into(), 1, 1).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_chunk_insert_all_skips_duplicate_content_hash() {
        let pool = pool().await;
        let document_id = document_id(&pool, "a").await;
        let repo = SqliteChunkRepository::new(pool);

        let chunk = Chunk::new(document_id, 0, 1, 1, "fuser assembly".into(), "hash1".into(), ChunkType::Text, vec![]).unwrap();
        repo.insert_all(&[chunk.clone()]).await.unwrap();
        repo.insert_all(&[chunk]).await.unwrap();

        let found = repo.find_by_document(document_id).await.unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn test_image_upsert_is_idempotent_per_document_and_hash() {
        let pool = pool().await;
        let document_id = document_id(&pool, "b").await;
        let repo = SqliteImageRepository::new(pool);

        let image = Image::new(document_id, 1, 0, "h".repeat(64), "images/h.png".into(), 800, 600, "png".into(), ImageType::Diagram);
        let first = repo.upsert(&image).await.unwrap();
        let second = repo.upsert(&image).await.unwrap();
        assert_eq!(first, second);

        let found = repo.find_by_hash(&"h".repeat(64)).await.unwrap().unwrap();
        assert_eq!(found.id, first);
    }

    #[tokio::test]
    async fn test_embedding_search_ranks_by_cosine_similarity() {
        let pool = pool().await;
        let document_id = document_id(&pool, "c").await;
        let chunks = SqliteChunkRepository::new(pool.clone());
        let chunk_a = Chunk::new(document_id, 0, 1, 1, "aligned".into(), "hash-a".into(), ChunkType::Text, vec![]).unwrap();
        let chunk_b = Chunk::new(document_id, 1, 1, 1, "orthogonal".into(), "hash-b".into(), ChunkType::Text, vec![]).unwrap();
        chunks.insert_all(&[chunk_a.clone(), chunk_b.clone()]).await.unwrap();

        let repo = SqliteEmbeddingRepository::new(pool);
        repo.upsert(&Embedding::new(chunk_a.id, vec![1.0, 0.0], "m1".into(), 2).unwrap()).await.unwrap();
        repo.upsert(&Embedding::new(chunk_b.id, vec![0.0, 1.0], "m1".into(), 2).unwrap()).await.unwrap();

        let results = repo.search(&[1.0, 0.0], "m1", 1).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, chunk_a.id);
    }

    #[tokio::test]
    async fn test_link_upsert_then_find_pending() {
        let pool = pool().await;
        let document_id = document_id(&pool, "d").await;
        let repo = SqliteLinkRepository::new(pool);

        let link = LinkEnrichment::new(document_id, "https://example.com/faq".into()).unwrap();
        repo.upsert(&link).await.unwrap();

        let pending = repo.find_pending(document_id).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].scrape_status, ScrapeStatus::Pending);
    }

    #[tokio::test]
    async fn test_video_upsert_is_idempotent_on_canonical_url() {
        let pool = pool().await;
        let document_id = document_id(&pool, "e").await;
        let repo = SqliteVideoRepository::new(pool);

        let video = Video::new(document_id, "https://example.com/watch").unwrap();
        let first = repo.upsert(&video).await.unwrap();
        let second = repo.upsert(&video).await.unwrap();
        assert_eq!(first, second);

        let found = repo.find_by_document(document_id).await.unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn test_part_upsert_updates_description_on_same_part_number() {
        let pool = pool().await;
        let document_id = document_id(&pool, "f").await;
        let manufacturer_id = ManufacturerId::new();
        let repo = SqlitePartRepository::new(pool.clone());

        // parts.manufacturer_id has no FK constraint in the schema, so a
        // freestanding ManufacturerId is fine for this adapter-level test.
        let part = Part::new(document_id, manufacturer_id, "RM2-5452-000".into()).unwrap();
        repo.upsert(&part).await.unwrap();

        let updated = part.with_description("Fuser unit".into(), 42);
        repo.upsert(&updated).await.unwrap();

        let found = repo.find_by_document(document_id).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].description.as_deref(), Some("Fuser unit"));
    }
}
