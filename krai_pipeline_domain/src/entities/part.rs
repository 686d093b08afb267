// /////////////////////////////////////////////////////////////////////////////
// Krai Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Part Entity
//!
//! A replaceable part number listed in a document's parts catalog.
//! `manufacturer_id` is always inherited from the owning document, never
//! supplied independently.

use crate::error::PipelineError;
use crate::value_objects::ids::{DocumentId, ManufacturerId, PartId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    pub id: PartId,
    pub document_id: DocumentId,
    pub manufacturer_id: ManufacturerId,
    pub part_number: String,
    pub description: Option<String>,
    pub page_number: Option<u32>,
}

impl Part {
    pub fn new(document_id: DocumentId, manufacturer_id: ManufacturerId, part_number: String) -> Result<Self, PipelineError> {
        if part_number.trim().is_empty() {
            return Err(PipelineError::validation("part_number must not be empty"));
        }
        Ok(Self {
            id: PartId::new(),
            document_id,
            manufacturer_id,
            part_number,
            description: None,
            page_number: None,
        })
    }

    pub fn with_description(mut self, description: String, page_number: u32) -> Self {
        self.description = Some(description);
        self.page_number = Some(page_number);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_part_number() {
        assert!(Part::new(DocumentId::new(), ManufacturerId::new(), "".into()).is_err());
    }

    #[test]
    fn test_manufacturer_is_carried_from_document_not_derived() {
        let doc_id = DocumentId::new();
        let mfr_id = ManufacturerId::new();
        let part = Part::new(doc_id, mfr_id, "RM2-5452-000".into()).unwrap();
        assert_eq!(part.document_id, doc_id);
        assert_eq!(part.manufacturer_id, mfr_id);
    }
}
