// /////////////////////////////////////////////////////////////////////////////
// Krai Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Product Accessory Link Entity
//!
//! A compatibility edge between a base [`Product`](crate::entities::Product)
//! and an accessory `Product`, as stated or implied by a document.
//!
//! Dependency cycles among `requires` edges are permitted by this data model;
//! they are flagged, not rejected, by the configuration validator.

use crate::error::PipelineError;
use crate::value_objects::ids::ProductId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompatibilityType {
    Compatible,
    Requires,
    Conflicts,
    Recommended,
    Alternative,
    Prerequisite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductAccessory {
    pub product_id: ProductId,
    pub accessory_id: ProductId,
    pub compatibility_type: CompatibilityType,
    pub is_standard: bool,
    pub notes: Option<String>,
}

impl ProductAccessory {
    pub fn new(product_id: ProductId, accessory_id: ProductId, compatibility_type: CompatibilityType) -> Result<Self, PipelineError> {
        if product_id == accessory_id {
            return Err(PipelineError::invariant("a product cannot be its own accessory"));
        }
        Ok(Self {
            product_id,
            accessory_id,
            compatibility_type,
            is_standard: false,
            notes: None,
        })
    }

    pub fn as_standard(mut self) -> Self {
        self.is_standard = true;
        self
    }

    pub fn with_notes(mut self, notes: String) -> Self {
        self.notes = Some(notes);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_self_referencing_link() {
        let id = ProductId::new();
        assert!(ProductAccessory::new(id, id, CompatibilityType::Compatible).is_err());
    }

    #[test]
    fn test_accepts_distinct_products() {
        let link = ProductAccessory::new(ProductId::new(), ProductId::new(), CompatibilityType::Requires).unwrap();
        assert_eq!(link.compatibility_type, CompatibilityType::Requires);
        assert!(!link.is_standard);
    }

    #[test]
    fn test_standard_marking() {
        let link = ProductAccessory::new(ProductId::new(), ProductId::new(), CompatibilityType::Compatible)
            .unwrap()
            .as_standard();
        assert!(link.is_standard);
    }
}
