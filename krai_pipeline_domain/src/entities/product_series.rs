// /////////////////////////////////////////////////////////////////////////////
// Krai Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Product Series Entity
//!
//! Groups related [`Product`](crate::entities::Product) rows under a
//! manufacturer-assigned series name (e.g. "LaserJet Enterprise M4xx").

use crate::error::PipelineError;
use crate::value_objects::ids::{ManufacturerId, ProductSeriesId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSeries {
    pub id: ProductSeriesId,
    pub manufacturer_id: ManufacturerId,
    pub name: String,
    pub description: Option<String>,
}

impl ProductSeries {
    pub fn new(manufacturer_id: ManufacturerId, name: String) -> Result<Self, PipelineError> {
        if name.trim().is_empty() {
            return Err(PipelineError::validation("product series name must not be empty"));
        }
        Ok(Self {
            id: ProductSeriesId::new(),
            manufacturer_id,
            name,
            description: None,
        })
    }

    pub fn with_description(mut self, description: String) -> Self {
        self.description = Some(description);
        self
    }
}
