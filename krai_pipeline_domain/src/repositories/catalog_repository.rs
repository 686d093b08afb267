// /////////////////////////////////////////////////////////////////////////////
// Krai Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Catalog Repository Ports
//!
//! Manufacturer/Product/ProductSeries/ProductAccessory/ErrorCode: the
//! entity-resolution side of the data model. Every lookup-or-create method
//! follows the `SPEC_FULL.md` §4.5 rule "canonical lookup first, create on
//! miss, return existing id on hit" — the Dedup Index backing these calls is
//! the authority, not the caller.

use crate::entities::error_code::ErrorCodeRecord;
use crate::entities::manufacturer::Manufacturer;
use crate::entities::product::Product;
use crate::entities::product_accessory::ProductAccessory;
use crate::entities::product_series::ProductSeries;
use crate::error::PipelineError;
use crate::value_objects::ids::{ErrorCodeId, ManufacturerId, ProductId, ProductSeriesId};
use async_trait::async_trait;

#[async_trait]
pub trait ManufacturerRepository: Send + Sync {
    async fn find_or_create(&self, manufacturer: Manufacturer) -> Result<ManufacturerId, PipelineError>;
    async fn find_by_name(&self, normalized_name: &str) -> Result<Option<Manufacturer>, PipelineError>;
}

#[async_trait]
pub trait ProductSeriesRepository: Send + Sync {
    async fn find_or_create(&self, series: ProductSeries) -> Result<ProductSeriesId, PipelineError>;
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Unique on `(manufacturer_id, model_number)`.
    async fn find_or_create(&self, product: Product) -> Result<ProductId, PipelineError>;
    async fn find_by_model_number(&self, manufacturer_id: ManufacturerId, model_number: &str) -> Result<Option<Product>, PipelineError>;
}

#[async_trait]
pub trait ProductAccessoryRepository: Send + Sync {
    /// Rejects a second insert of the same ordered `(product_id, accessory_id)`
    /// pair as a validation error, per the §3 uniqueness invariant.
    async fn link(&self, link: ProductAccessory) -> Result<(), PipelineError>;

    /// Every `ProductAccessory` row touching `product_id` or any id in
    /// `accessory_ids`, the neighborhood the configuration validator needs.
    async fn find_neighborhood(&self, product_id: ProductId, accessory_ids: &[ProductId]) -> Result<Vec<ProductAccessory>, PipelineError>;
}

#[async_trait]
pub trait ErrorCodeRepository: Send + Sync {
    /// Unique on `(document_id, error_code, page_number)`.
    async fn upsert(&self, error_code: ErrorCodeRecord) -> Result<ErrorCodeId, PipelineError>;
    async fn find_by_manufacturer(&self, manufacturer_id: ManufacturerId, code: &str) -> Result<Vec<ErrorCodeRecord>, PipelineError>;
}
