// /////////////////////////////////////////////////////////////////////////////
// Krai Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # SQLite Catalog Repositories
//!
//! Manufacturer/ProductSeries/Product/ProductAccessory/ErrorCode adapters,
//! grouped in one module since they share a pool and the same
//! lookup-or-create idiom used by [`super::document_repository`].

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use krai_pipeline_domain::entities::error_code::{ErrorCodeRecord, ExtractionMethod, Severity};
use krai_pipeline_domain::entities::manufacturer::Manufacturer;
use krai_pipeline_domain::entities::product::Product;
use krai_pipeline_domain::entities::product_accessory::{CompatibilityType, ProductAccessory};
use krai_pipeline_domain::entities::product_series::ProductSeries;
use krai_pipeline_domain::error::PipelineError;
use krai_pipeline_domain::repositories::catalog_repository::{
    ErrorCodeRepository, ManufacturerRepository, ProductAccessoryRepository, ProductRepository, ProductSeriesRepository,
};
use krai_pipeline_domain::value_objects::ids::{ErrorCodeId, ManufacturerId, ProductId, ProductSeriesId};
use krai_pipeline_domain::value_objects::product_type::ProductType;

fn db_err(e: sqlx::Error) -> PipelineError {
    PipelineError::transient("database", e.to_string())
}

fn parse_product_type(s: &str) -> Result<ProductType, PipelineError> {
    s.parse().map_err(|e: krai_pipeline_domain::value_objects::product_type::UnknownProductType| PipelineError::validation(e.to_string()))
}

fn compatibility_type_str(c: CompatibilityType) -> &'static str {
    match c {
        CompatibilityType::Compatible => "compatible",
        CompatibilityType::Requires => "requires",
        CompatibilityType::Conflicts => "conflicts",
        CompatibilityType::Recommended => "recommended",
        CompatibilityType::Alternative => "alternative",
        CompatibilityType::Prerequisite => "prerequisite",
    }
}

fn parse_compatibility_type(s: &str) -> CompatibilityType {
    match s {
        "requires" => CompatibilityType::Requires,
        "conflicts" => CompatibilityType::Conflicts,
        "recommended" => CompatibilityType::Recommended,
        "alternative" => CompatibilityType::Alternative,
        "prerequisite" => CompatibilityType::Prerequisite,
        _ => CompatibilityType::Compatible,
    }
}

fn extraction_method_str(m: ExtractionMethod) -> &'static str {
    match m {
        ExtractionMethod::Regex => "regex",
        ExtractionMethod::Llm => "llm",
        ExtractionMethod::PatternTable => "pattern_table",
    }
}

fn parse_extraction_method(s: &str) -> ExtractionMethod {
    match s {
        "llm" => ExtractionMethod::Llm,
        "pattern_table" => ExtractionMethod::PatternTable,
        _ => ExtractionMethod::Regex,
    }
}

fn severity_str(s: Severity) -> &'static str {
    match s {
        Severity::Info => "info",
        Severity::Warning => "warning",
        Severity::Critical => "critical",
    }
}

fn parse_severity(s: &str) -> Severity {
    match s {
        "warning" => Severity::Warning,
        "critical" => Severity::Critical,
        _ => Severity::Info,
    }
}

pub struct SqliteManufacturerRepository {
    pool: SqlitePool,
}

impl SqliteManufacturerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ManufacturerRepository for SqliteManufacturerRepository {
    async fn find_or_create(&self, manufacturer: Manufacturer) -> Result<ManufacturerId, PipelineError> {
        if let Some(existing) = self.find_by_name(&manufacturer.normalized_name).await? {
            return Ok(existing.id);
        }

        sqlx::query("INSERT INTO manufacturers (id, name, normalized_name) VALUES (?, ?, ?)")
            .bind(manufacturer.id.to_string())
            .bind(&manufacturer.name)
            .bind(&manufacturer.normalized_name)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        for alias in &manufacturer.aliases {
            sqlx::query("INSERT OR IGNORE INTO manufacturer_aliases (manufacturer_id, alias) VALUES (?, ?)")
                .bind(manufacturer.id.to_string())
                .bind(alias)
                .execute(&self.pool)
                .await
                .map_err(db_err)?;
        }

        Ok(manufacturer.id)
    }

    async fn find_by_name(&self, normalized_name: &str) -> Result<Option<Manufacturer>, PipelineError> {
        let row = sqlx::query("SELECT * FROM manufacturers WHERE normalized_name = ?")
            .bind(normalized_name)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        let Some(row) = row else { return Ok(None) };

        let id: String = row.try_get("id").map_err(db_err)?;
        let id = ManufacturerId::from_str(&id).map_err(|e| PipelineError::validation(e.to_string()))?;

        let alias_rows = sqlx::query("SELECT alias FROM manufacturer_aliases WHERE manufacturer_id = ?")
            .bind(id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        let aliases = alias_rows
            .iter()
            .map(|r| r.try_get::<String, _>("alias"))
            .collect::<Result<_, _>>()
            .map_err(db_err)?;

        Ok(Some(Manufacturer {
            id,
            name: row.try_get("name").map_err(db_err)?,
            normalized_name: row.try_get("normalized_name").map_err(db_err)?,
            aliases,
        }))
    }
}

pub struct SqliteProductSeriesRepository {
    pool: SqlitePool,
}

impl SqliteProductSeriesRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductSeriesRepository for SqliteProductSeriesRepository {
    async fn find_or_create(&self, series: ProductSeries) -> Result<ProductSeriesId, PipelineError> {
        let row = sqlx::query("SELECT id FROM product_series WHERE manufacturer_id = ? AND name = ?")
            .bind(series.manufacturer_id.to_string())
            .bind(&series.name)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        if let Some(row) = row {
            let id: String = row.try_get("id").map_err(db_err)?;
            return ProductSeriesId::from_str(&id).map_err(|e| PipelineError::validation(e.to_string()));
        }

        sqlx::query("INSERT INTO product_series (id, manufacturer_id, name, description) VALUES (?, ?, ?, ?)")
            .bind(series.id.to_string())
            .bind(series.manufacturer_id.to_string())
            .bind(&series.name)
            .bind(&series.description)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(series.id)
    }
}

pub struct SqliteProductRepository {
    pool: SqlitePool,
}

impl SqliteProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn row_to_product(row: &sqlx::sqlite::SqliteRow) -> Result<Product, PipelineError> {
    let id: String = row.try_get("id").map_err(db_err)?;
    let manufacturer_id: String = row.try_get("manufacturer_id").map_err(db_err)?;
    let series_id: Option<String> = row.try_get("series_id").map_err(db_err)?;
    let rebrand_of: Option<String> = row.try_get("rebrand_of").map_err(db_err)?;

    Ok(Product {
        id: ProductId::from_str(&id).map_err(|e| PipelineError::validation(e.to_string()))?,
        manufacturer_id: ManufacturerId::from_str(&manufacturer_id).map_err(|e| PipelineError::validation(e.to_string()))?,
        series_id: series_id
            .map(|s| ProductSeriesId::from_str(&s))
            .transpose()
            .map_err(|e| PipelineError::validation(e.to_string()))?,
        model_number: row.try_get("model_number").map_err(db_err)?,
        product_type: parse_product_type(&row.try_get::<String, _>("product_type").map_err(db_err)?)?,
        is_rebrand: row.try_get::<i64, _>("is_rebrand").map_err(db_err)? != 0,
        rebrand_of: rebrand_of
            .map(|s| ProductId::from_str(&s))
            .transpose()
            .map_err(|e| PipelineError::validation(e.to_string()))?,
    })
}

#[async_trait]
impl ProductRepository for SqliteProductRepository {
    async fn find_or_create(&self, product: Product) -> Result<ProductId, PipelineError> {
        if let Some(existing) = self.find_by_model_number(product.manufacturer_id, &product.model_number).await? {
            return Ok(existing.id);
        }

        sqlx::query(
            "INSERT INTO products (id, manufacturer_id, series_id, model_number, product_type, is_rebrand, rebrand_of) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(product.id.to_string())
        .bind(product.manufacturer_id.to_string())
        .bind(product.series_id.map(|id| id.to_string()))
        .bind(&product.model_number)
        .bind(product.product_type.as_str())
        .bind(product.is_rebrand as i64)
        .bind(product.rebrand_of.map(|id| id.to_string()))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(product.id)
    }

    async fn find_by_model_number(&self, manufacturer_id: ManufacturerId, model_number: &str) -> Result<Option<Product>, PipelineError> {
        let row = sqlx::query("SELECT * FROM products WHERE manufacturer_id = ? AND model_number = ?")
            .bind(manufacturer_id.to_string())
            .bind(model_number)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(row_to_product).transpose()
    }
}

pub struct SqliteProductAccessoryRepository {
    pool: SqlitePool,
}

impl SqliteProductAccessoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductAccessoryRepository for SqliteProductAccessoryRepository {
    async fn link(&self, link: ProductAccessory) -> Result<(), PipelineError> {
        let existing = sqlx::query("SELECT 1 FROM product_accessories WHERE product_id = ? AND accessory_id = ?")
            .bind(link.product_id.to_string())
            .bind(link.accessory_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        if existing.is_some() {
            return Err(PipelineError::validation(format!(
                "product_accessory link {} -> {} already exists",
                link.product_id, link.accessory_id
            )));
        }

        sqlx::query(
            "INSERT INTO product_accessories (product_id, accessory_id, compatibility_type, is_standard, notes) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(link.product_id.to_string())
        .bind(link.accessory_id.to_string())
        .bind(compatibility_type_str(link.compatibility_type))
        .bind(link.is_standard as i64)
        .bind(&link.notes)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn find_neighborhood(&self, product_id: ProductId, accessory_ids: &[ProductId]) -> Result<Vec<ProductAccessory>, PipelineError> {
        let mut ids: Vec<String> = vec![product_id.to_string()];
        ids.extend(accessory_ids.iter().map(|id| id.to_string()));
        let placeholders = ids.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
        let sql = format!(
            "SELECT * FROM product_accessories WHERE product_id IN ({placeholders}) OR accessory_id IN ({placeholders})"
        );

        let mut query = sqlx::query(&sql);
        for id in &ids {
            query = query.bind(id);
        }
        for id in &ids {
            query = query.bind(id);
        }

        let rows = query.fetch_all(&self.pool).await.map_err(db_err)?;
        rows.iter()
            .map(|row| {
                let product_id: String = row.try_get("product_id").map_err(db_err)?;
                let accessory_id: String = row.try_get("accessory_id").map_err(db_err)?;
                Ok(ProductAccessory {
                    product_id: ProductId::from_str(&product_id).map_err(|e| PipelineError::validation(e.to_string()))?,
                    accessory_id: ProductId::from_str(&accessory_id).map_err(|e| PipelineError::validation(e.to_string()))?,
                    compatibility_type: parse_compatibility_type(&row.try_get::<String, _>("compatibility_type").map_err(db_err)?),
                    is_standard: row.try_get::<i64, _>("is_standard").map_err(db_err)? != 0,
                    notes: row.try_get("notes").map_err(db_err)?,
                })
            })
            .collect()
    }
}

pub struct SqliteErrorCodeRepository {
    pool: SqlitePool,
}

impl SqliteErrorCodeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn row_to_error_code(row: &sqlx::sqlite::SqliteRow) -> Result<ErrorCodeRecord, PipelineError> {
    let id: String = row.try_get("id").map_err(db_err)?;
    let document_id: String = row.try_get("document_id").map_err(db_err)?;
    let manufacturer_id: String = row.try_get("manufacturer_id").map_err(db_err)?;
    let severity: Option<String> = row.try_get("severity").map_err(db_err)?;
    let chunk_id: Option<String> = row.try_get("chunk_id").map_err(db_err)?;

    Ok(ErrorCodeRecord {
        id: ErrorCodeId::from_str(&id).map_err(|e| PipelineError::validation(e.to_string()))?,
        document_id: krai_pipeline_domain::value_objects::ids::DocumentId::from_str(&document_id)
            .map_err(|e| PipelineError::validation(e.to_string()))?,
        manufacturer_id: ManufacturerId::from_str(&manufacturer_id).map_err(|e| PipelineError::validation(e.to_string()))?,
        error_code: row.try_get("error_code").map_err(db_err)?,
        error_description: row.try_get("error_description").map_err(db_err)?,
        solution_text: row.try_get("solution_text").map_err(db_err)?,
        page_number: row.try_get::<i64, _>("page_number").map_err(db_err)? as u32,
        confidence: row.try_get::<f64, _>("confidence").map_err(db_err)? as f32,
        severity: severity.as_deref().map(parse_severity),
        extraction_method: parse_extraction_method(&row.try_get::<String, _>("extraction_method").map_err(db_err)?),
        chunk_id: chunk_id
            .map(|s| krai_pipeline_domain::value_objects::ids::ChunkId::from_str(&s))
            .transpose()
            .map_err(|e| PipelineError::validation(e.to_string()))?,
    })
}

#[async_trait]
impl ErrorCodeRepository for SqliteErrorCodeRepository {
    async fn upsert(&self, error_code: ErrorCodeRecord) -> Result<ErrorCodeId, PipelineError> {
        let existing = sqlx::query("SELECT id FROM error_codes WHERE document_id = ? AND error_code = ? AND page_number = ?")
            .bind(error_code.document_id.to_string())
            .bind(&error_code.error_code)
            .bind(error_code.page_number as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        if let Some(row) = existing {
            let id: String = row.try_get("id").map_err(db_err)?;
            let id = ErrorCodeId::from_str(&id).map_err(|e| PipelineError::validation(e.to_string()))?;

            sqlx::query(
                "UPDATE error_codes SET error_description = ?, solution_text = ?, confidence = ?, severity = ?, extraction_method = ?, chunk_id = ? WHERE id = ?",
            )
            .bind(&error_code.error_description)
            .bind(&error_code.solution_text)
            .bind(error_code.confidence as f64)
            .bind(error_code.severity.map(severity_str))
            .bind(extraction_method_str(error_code.extraction_method))
            .bind(error_code.chunk_id.map(|id| id.to_string()))
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
            return Ok(id);
        }

        sqlx::query(
            "INSERT INTO error_codes (id, document_id, manufacturer_id, error_code, error_description, solution_text, page_number, confidence, severity, extraction_method, chunk_id) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(error_code.id.to_string())
        .bind(error_code.document_id.to_string())
        .bind(error_code.manufacturer_id.to_string())
        .bind(&error_code.error_code)
        .bind(&error_code.error_description)
        .bind(&error_code.solution_text)
        .bind(error_code.page_number as i64)
        .bind(error_code.confidence as f64)
        .bind(error_code.severity.map(severity_str))
        .bind(extraction_method_str(error_code.extraction_method))
        .bind(error_code.chunk_id.map(|id| id.to_string()))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(error_code.id)
    }

    async fn find_by_manufacturer(&self, manufacturer_id: ManufacturerId, code: &str) -> Result<Vec<ErrorCodeRecord>, PipelineError> {
        let rows = sqlx::query("SELECT * FROM error_codes WHERE manufacturer_id = ? AND error_code = ?")
            .bind(manufacturer_id.to_string())
            .bind(code)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter().map(row_to_error_code).collect()
    }
}
