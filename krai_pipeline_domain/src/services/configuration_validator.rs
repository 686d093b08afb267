// /////////////////////////////////////////////////////////////////////////////
// Krai Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Configuration Validator
//!
//! `SPEC_FULL.md` §4.6: "Given a base product and a set of accessory ids,
//! decide whether the configuration satisfies the relation model in §3."
//! Pure, read-only, and not part of the ingest hot path — the caller has
//! already loaded every [`ProductAccessory`] link that touches the
//! requested product/accessory set.

use crate::entities::product_accessory::{CompatibilityType, ProductAccessory};
use crate::value_objects::ids::ProductId;
use std::collections::{HashSet, VecDeque};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Validates a product/accessory configuration against its `requires`,
/// `conflicts` and `alternative` links.
///
/// `links` should include every `ProductAccessory` row whose `product_id`
/// or `accessory_id` is the base product or one of `accessory_ids` — the
/// repository layer is responsible for loading a large-enough neighborhood
/// for transitive `requires` detection to terminate.
pub fn validate_configuration(product_id: ProductId, accessory_ids: &[ProductId], links: &[ProductAccessory]) -> ValidationResult {
    let selected: HashSet<ProductId> = accessory_ids.iter().copied().collect();
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for link in links {
        if !selected.contains(&link.accessory_id) {
            continue;
        }
        match link.compatibility_type {
            CompatibilityType::Requires => {
                if !selected.contains(&link.product_id) && link.product_id != product_id {
                    errors.push(format!(
                        "{} requires {} (missing from configuration)",
                        link.accessory_id, link.product_id
                    ));
                }
            }
            CompatibilityType::Conflicts => {
                if selected.contains(&link.product_id) {
                    errors.push(format!("{} conflicts with {}", link.accessory_id, link.product_id));
                }
            }
            CompatibilityType::Alternative => {
                if selected.contains(&link.product_id) {
                    warnings.push(format!(
                        "{} and {} are alternatives to each other; both are selected",
                        link.accessory_id, link.product_id
                    ));
                }
            }
            CompatibilityType::Compatible | CompatibilityType::Recommended | CompatibilityType::Prerequisite => {}
        }
    }

    let recommendations = recommend(product_id, &selected, links);

    ValidationResult {
        valid: errors.is_empty(),
        errors,
        warnings,
        recommendations,
    }
}

/// Flags transitive `requires` chains the caller should be aware of even
/// though the direct check above already covers missing direct
/// dependencies, and surfaces `recommended` accessories not yet selected.
fn recommend(product_id: ProductId, selected: &HashSet<ProductId>, links: &[ProductAccessory]) -> Vec<String> {
    let mut recommendations = Vec::new();

    for link in links {
        if link.compatibility_type == CompatibilityType::Recommended
            && (link.product_id == product_id || selected.contains(&link.product_id))
            && !selected.contains(&link.accessory_id)
        {
            recommendations.push(format!("consider adding {} (recommended with {})", link.accessory_id, link.product_id));
        }
    }

    // Transitive requires: BFS from each selected accessory's direct
    // requirements to detect chains longer than one hop.
    let mut queue: VecDeque<ProductId> = selected.iter().copied().collect();
    let mut visited: HashSet<ProductId> = selected.clone();
    while let Some(current) = queue.pop_front() {
        for link in links {
            if link.accessory_id == current && link.compatibility_type == CompatibilityType::Requires && visited.insert(link.product_id) {
                if !selected.contains(&link.product_id) && link.product_id != product_id {
                    recommendations.push(format!("transitive dependency: {} requires {} via {}", current, link.product_id, current));
                }
                queue.push_back(link.product_id);
            }
        }
    }

    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_required_accessory_is_an_error() {
        let base = ProductId::new();
        let accessory = ProductId::new();
        let required = ProductId::new();
        let links = vec![ProductAccessory::new(required, accessory, CompatibilityType::Requires).unwrap()];

        let result = validate_configuration(base, &[accessory], &links);
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn test_conflicting_accessories_are_an_error() {
        let base = ProductId::new();
        let a = ProductId::new();
        let b = ProductId::new();
        let links = vec![ProductAccessory::new(b, a, CompatibilityType::Conflicts).unwrap()];

        let result = validate_configuration(base, &[a, b], &links);
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn test_alternatives_are_warnings_not_errors() {
        let base = ProductId::new();
        let a = ProductId::new();
        let b = ProductId::new();
        let links = vec![ProductAccessory::new(b, a, CompatibilityType::Alternative).unwrap()];

        let result = validate_configuration(base, &[a, b], &links);
        assert!(result.valid);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_satisfied_requirement_is_valid_with_no_errors() {
        let base = ProductId::new();
        let accessory = ProductId::new();
        let required = ProductId::new();
        let links = vec![ProductAccessory::new(required, accessory, CompatibilityType::Requires).unwrap()];

        let result = validate_configuration(base, &[accessory, required], &links);
        assert!(result.valid);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_recommended_accessory_not_selected_is_recommended() {
        let base = ProductId::new();
        let accessory = ProductId::new();
        let recommended = ProductId::new();
        let links = vec![ProductAccessory::new(base, recommended, CompatibilityType::Recommended).unwrap()];

        let result = validate_configuration(base, &[accessory], &links);
        assert_eq!(result.recommendations.len(), 1);
    }
}
