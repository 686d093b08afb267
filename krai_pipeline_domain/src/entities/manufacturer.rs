// /////////////////////////////////////////////////////////////////////////////
// Krai Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Manufacturer Entity
//!
//! Canonical manufacturer row plus its known aliases, maintained by the
//! normalization service in
//! [`crate::services::normalizer`](../services/normalizer/index.html) so
//! that "HP", "Hewlett-Packard" and "Hewlett Packard" all resolve to the
//! same [`ManufacturerId`].

use crate::error::PipelineError;
use crate::value_objects::ids::ManufacturerId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manufacturer {
    pub id: ManufacturerId,
    /// Canonical display name, e.g. "Hewlett-Packard".
    pub name: String,
    /// Lowercase, whitespace-collapsed form used as the dedup key.
    pub normalized_name: String,
    /// Alternate spellings and abbreviations that normalize to this manufacturer.
    pub aliases: BTreeSet<String>,
}

/// Collapses whitespace and lowercases a raw manufacturer string into the
/// form used for equality checks across documents.
pub fn normalize_name(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

impl Manufacturer {
    pub fn new(name: String) -> Result<Self, PipelineError> {
        if name.trim().is_empty() {
            return Err(PipelineError::validation("manufacturer name must not be empty"));
        }
        let normalized_name = normalize_name(&name);
        Ok(Self {
            id: ManufacturerId::new(),
            name,
            normalized_name,
            aliases: BTreeSet::new(),
        })
    }

    /// Registers `alias` as a known alternate spelling, a no-op if it is
    /// already present (case/whitespace-insensitive).
    pub fn add_alias(&mut self, alias: String) {
        self.aliases.insert(normalize_name(&alias));
    }

    /// True if `candidate` normalizes to this manufacturer's canonical name
    /// or one of its registered aliases.
    pub fn matches(&self, candidate: &str) -> bool {
        let normalized = normalize_name(candidate);
        normalized == self.normalized_name || self.aliases.contains(&normalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_name() {
        assert!(Manufacturer::new("   ".into()).is_err());
    }

    #[test]
    fn test_matches_is_case_and_whitespace_insensitive() {
        let mfr = Manufacturer::new("Hewlett-Packard".into()).unwrap();
        assert!(mfr.matches("  Hewlett-Packard  "));
        assert!(mfr.matches("HEWLETT-PACKARD"));
        assert!(!mfr.matches("Canon"));
    }

    #[test]
    fn test_alias_lookup() {
        let mut mfr = Manufacturer::new("Hewlett-Packard".into()).unwrap();
        mfr.add_alias("HP".into());
        assert!(mfr.matches("hp"));
        assert!(mfr.matches(" HP "));
    }
}
