// /////////////////////////////////////////////////////////////////////////////
// Krai Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Product Entity
//!
//! A single sellable model (base product or accessory), resolved from a
//! document's model list by the Classification & Entity Resolution stage.

use crate::error::PipelineError;
use crate::value_objects::ids::{ManufacturerId, ProductId, ProductSeriesId};
use crate::value_objects::product_type::ProductType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub manufacturer_id: ManufacturerId,
    pub series_id: Option<ProductSeriesId>,
    /// Manufacturer-assigned model number, e.g. "M454dn".
    pub model_number: String,
    pub product_type: ProductType,
    /// True if this model number was introduced by `oem_rebrand` mapping
    /// rather than read verbatim from the document (`SPEC_FULL.md` §4.5).
    pub is_rebrand: bool,
    /// The `ProductId` this model is a rebrand of, when `is_rebrand` is set.
    pub rebrand_of: Option<ProductId>,
}

impl Product {
    pub fn new(manufacturer_id: ManufacturerId, model_number: String, product_type: ProductType) -> Result<Self, PipelineError> {
        if model_number.trim().is_empty() {
            return Err(PipelineError::validation("model_number must not be empty"));
        }
        Ok(Self {
            id: ProductId::new(),
            manufacturer_id,
            series_id: None,
            model_number,
            product_type,
            is_rebrand: false,
            rebrand_of: None,
        })
    }

    pub fn with_series(mut self, series_id: ProductSeriesId) -> Self {
        self.series_id = Some(series_id);
        self
    }

    pub fn as_rebrand_of(mut self, original: ProductId) -> Self {
        self.is_rebrand = true;
        self.rebrand_of = Some(original);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_model_number() {
        assert!(Product::new(ManufacturerId::new(), "".into(), ProductType::LaserPrinter).is_err());
    }

    #[test]
    fn test_rebrand_marking() {
        let original = Product::new(ManufacturerId::new(), "M454dn".into(), ProductType::LaserMultifunction).unwrap();
        let rebrand = Product::new(ManufacturerId::new(), "ImageClass MF455".into(), ProductType::LaserMultifunction)
            .unwrap()
            .as_rebrand_of(original.id);
        assert!(rebrand.is_rebrand);
        assert_eq!(rebrand.rebrand_of, Some(original.id));
    }
}
