// /////////////////////////////////////////////////////////////////////////////
// Krai Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Accessory & Product-Type Classification
//!
//! Implements the `SPEC_FULL.md` §4.5 rule: "Prefixes take precedence over
//! manufacturer-series heuristics." An accessory's model-code prefix is
//! checked first against a closed regex table; only when nothing matches do
//! we fall back to a series-name lookup, and finally to
//! [`ProductType::fallback_base_product`].

use crate::value_objects::product_type::ProductType;
use once_cell::sync::Lazy;
use regex::Regex;

struct AccessoryPattern {
    /// Case-insensitive regex matched against the cleaned model number.
    pattern: &'static str,
    product_type: ProductType,
}

/// Closed prefix table, ported from the Konica Minolta accessory-code
/// conventions (`DF-`, `LU-`, `FS-`, `SD-`, `PK-`, `PH-`, `ZU-`, `ZF-`,
/// `TU-`, `PI-`, `JS-`, `CR-`, `FD-`, `BF-`, `AK-`, `IS-`, `DP-`, `PC-`,
/// `MT-`, `RU-`, `CU-`, `EK-`, `MIC-`, `VI-`, `WT-`, `AU-`, `UK-`, `SK-`)
/// and generalized to the analogous prefixes other vendors use for the
/// same accessory classes.
static ACCESSORY_PATTERNS: Lazy<Vec<AccessoryPattern>> = Lazy::new(|| {
    vec![
        AccessoryPattern {
            pattern: r"(?i)^DF-?\d{3}$",
            product_type: ProductType::DocumentFeeder,
        },
        AccessoryPattern {
            pattern: r"(?i)^ADF-?\d{3}$",
            product_type: ProductType::DocumentProcessor,
        },
        AccessoryPattern {
            pattern: r"(?i)^LU-?\d{3}$",
            product_type: ProductType::LargeCapacityFeeder,
        },
        AccessoryPattern {
            pattern: r"(?i)^PF-?\d{3}$",
            product_type: ProductType::PaperFeeder,
        },
        AccessoryPattern {
            pattern: r"(?i)^FS-?\d{3}$",
            product_type: ProductType::Finisher,
        },
        AccessoryPattern {
            pattern: r"(?i)^SD-?\d{3}$",
            product_type: ProductType::SaddleFinisher,
        },
        AccessoryPattern {
            pattern: r"(?i)^PK-?\d{3}$",
            product_type: ProductType::FinisherAccessory,
        },
        AccessoryPattern {
            pattern: r"(?i)^C\d{5}$",
            product_type: ProductType::LaserProductionPrinter,
        },
        AccessoryPattern {
            pattern: r"(?i)^TN-?\d{3,4}$",
            product_type: ProductType::TonerCartridge,
        },
        AccessoryPattern {
            pattern: r"(?i)^DR-?\d{3,4}$",
            product_type: ProductType::DrumUnit,
        },
        AccessoryPattern {
            pattern: r"(?i)^FK-?\d{3}$",
            product_type: ProductType::FaxKit,
        },
        AccessoryPattern {
            pattern: r"(?i)^HD-?\d{2,3}$",
            product_type: ProductType::HardDrive,
        },
        AccessoryPattern {
            pattern: r"(?i)^IC-?\d{3}[A-Z]?$",
            product_type: ProductType::ImageController,
        },
        AccessoryPattern {
            pattern: r"(?i)^AU-?\d{3}$",
            product_type: ProductType::CardReader,
        },
        AccessoryPattern {
            pattern: r"(?i)^MK-?\d{3,4}$",
            product_type: ProductType::MaintenanceKit,
        },
        AccessoryPattern {
            pattern: r"(?i)^PH-?\d{3,4}[A-Z]?$",
            product_type: ProductType::PunchFinisher,
        },
        AccessoryPattern {
            pattern: r"(?i)^ZU-?\d{3}$",
            product_type: ProductType::ZFoldUnit,
        },
        AccessoryPattern {
            pattern: r"(?i)^ZF-?\d{3,4}$",
            product_type: ProductType::ZFoldUnit,
        },
        AccessoryPattern {
            pattern: r"(?i)^TU-?\d{3}$",
            product_type: ProductType::Trimmer,
        },
        AccessoryPattern {
            pattern: r"(?i)^PI-?\d{3}$",
            product_type: ProductType::PostInserter,
        },
        AccessoryPattern {
            pattern: r"(?i)^JS-?\d{3,4}$",
            product_type: ProductType::JobSeparator,
        },
        AccessoryPattern {
            pattern: r"(?i)^CR-?\d{3}$",
            product_type: ProductType::Creaser,
        },
        AccessoryPattern {
            pattern: r"(?i)^FD-?\d{3}$",
            product_type: ProductType::FoldingUnit,
        },
        AccessoryPattern {
            pattern: r"(?i)^BF-?\d{3,4}$",
            product_type: ProductType::BannerFeeder,
        },
        AccessoryPattern {
            pattern: r"(?i)^AK-?\d{3,4}$",
            product_type: ProductType::AuthenticationKit,
        },
        AccessoryPattern {
            pattern: r"(?i)^IS-?\d{3,4}$",
            product_type: ProductType::InnerFinisher,
        },
        AccessoryPattern {
            pattern: r"(?i)^DP-?\d{3,4}$",
            product_type: ProductType::DocumentProcessor,
        },
        AccessoryPattern {
            pattern: r"(?i)^PC-?\d{3}$",
            product_type: ProductType::PaperFeeder,
        },
        AccessoryPattern {
            pattern: r"(?i)^MT-?\d{3}$",
            product_type: ProductType::Mailbox,
        },
        AccessoryPattern {
            pattern: r"(?i)^RU-?\d{3}$",
            product_type: ProductType::FinisherAccessory,
        },
        AccessoryPattern {
            pattern: r"(?i)^CU-?\d{3}$",
            product_type: ProductType::MaintenanceKit,
        },
        AccessoryPattern {
            pattern: r"(?i)^EK-?\d{3}$",
            product_type: ProductType::CardReader,
        },
        AccessoryPattern {
            pattern: r"(?i)^MIC-?\d{4}$",
            product_type: ProductType::ImageController,
        },
        AccessoryPattern {
            pattern: r"(?i)^VI-?\d{3}[A-Z]?$",
            product_type: ProductType::ControllerAccessory,
        },
        AccessoryPattern {
            pattern: r"(?i)^WT-?\d{3}$",
            product_type: ProductType::WasteTonerBox,
        },
        AccessoryPattern {
            pattern: r"(?i)^UK-?\d{3}$",
            product_type: ProductType::InterfaceKit,
        },
        AccessoryPattern {
            pattern: r"(?i)^SK-?\d{3}$",
            product_type: ProductType::FinisherAccessory,
        },
    ]
});

/// Series-name -> base product type, used only when no accessory prefix
/// matched; keyed by lowercased, whitespace-collapsed series name.
static SERIES_TYPE_MAP: Lazy<Vec<(&'static str, ProductType)>> = Lazy::new(|| {
    vec![
        ("laserjet pro", ProductType::LaserPrinter),
        ("laserjet enterprise", ProductType::LaserMultifunction),
        ("bizhub pro", ProductType::LaserProductionPrinter),
        ("bizhub", ProductType::LaserMultifunction),
        ("accuriopress", ProductType::LaserProductionPrinter),
        ("deskjet", ProductType::InkjetPrinter),
        ("officejet pro", ProductType::InkjetMultifunction),
        ("workcentre", ProductType::LaserMultifunction),
        ("versalink", ProductType::LaserMultifunction),
        ("imageclass", ProductType::LaserMultifunction),
        ("pixma", ProductType::InkjetPrinter),
    ]
});

fn clean_model(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Classifies a model code against the closed accessory-prefix table.
/// Returns `None` when the code does not match a known accessory pattern —
/// callers then fall through to series-based or default classification.
pub fn classify_accessory(model_number: &str) -> Option<ProductType> {
    let cleaned = clean_model(model_number);
    ACCESSORY_PATTERNS.iter().find_map(|candidate| {
        let re = Regex::new(candidate.pattern).expect("static accessory pattern is valid regex");
        re.is_match(&cleaned).then_some(candidate.product_type)
    })
}

/// Classifies a base product by its series name, falling back to
/// [`ProductType::fallback_base_product`] when the series is unrecognized.
pub fn classify_by_series(series_name: &str) -> ProductType {
    let normalized = series_name.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    SERIES_TYPE_MAP
        .iter()
        .find(|(series, _)| normalized.contains(series))
        .map(|(_, product_type)| *product_type)
        .unwrap_or_else(ProductType::fallback_base_product)
}

/// The full §4.5 classification order: accessory prefix first, then series,
/// then the closed-vocabulary default.
pub fn classify_product_type(model_number: &str, series_name: Option<&str>) -> ProductType {
    classify_accessory(model_number)
        .or_else(|| series_name.map(classify_by_series))
        .unwrap_or_else(ProductType::fallback_base_product)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessory_prefix_detected() {
        assert_eq!(classify_accessory("FS-534"), Some(ProductType::Finisher));
        assert_eq!(classify_accessory("df-628"), Some(ProductType::DocumentFeeder));
        assert_eq!(classify_accessory("TN512"), Some(ProductType::TonerCartridge));
        assert_eq!(classify_accessory("TN-328"), Some(ProductType::TonerCartridge));
        assert_eq!(classify_accessory("SD-513"), Some(ProductType::SaddleFinisher));
        assert_eq!(classify_accessory("C12010"), Some(ProductType::LaserProductionPrinter));
    }

    #[test]
    fn test_unmatched_model_returns_none() {
        assert_eq!(classify_accessory("M454dn"), None);
    }

    #[test]
    fn test_expanded_accessory_prefixes_detected() {
        assert_eq!(classify_accessory("PH-628"), Some(ProductType::PunchFinisher));
        assert_eq!(classify_accessory("ZU-609"), Some(ProductType::ZFoldUnit));
        assert_eq!(classify_accessory("ZF-503"), Some(ProductType::ZFoldUnit));
        assert_eq!(classify_accessory("TU-503"), Some(ProductType::Trimmer));
        assert_eq!(classify_accessory("PI-507"), Some(ProductType::PostInserter));
        assert_eq!(classify_accessory("JS-602"), Some(ProductType::JobSeparator));
        assert_eq!(classify_accessory("CR-101"), Some(ProductType::Creaser));
        assert_eq!(classify_accessory("FD-503"), Some(ProductType::FoldingUnit));
        assert_eq!(classify_accessory("BF-501"), Some(ProductType::BannerFeeder));
        assert_eq!(classify_accessory("IS-601"), Some(ProductType::InnerFinisher));
        assert_eq!(classify_accessory("DP-601"), Some(ProductType::DocumentProcessor));
        assert_eq!(classify_accessory("PC-410"), Some(ProductType::PaperFeeder));
        assert_eq!(classify_accessory("MT-502"), Some(ProductType::Mailbox));
        assert_eq!(classify_accessory("RU-101"), Some(ProductType::FinisherAccessory));
        assert_eq!(classify_accessory("CU-101"), Some(ProductType::MaintenanceKit));
        assert_eq!(classify_accessory("EK-101"), Some(ProductType::CardReader));
        assert_eq!(classify_accessory("MIC-1051"), Some(ProductType::ImageController));
        assert_eq!(classify_accessory("VI-509"), Some(ProductType::ControllerAccessory));
        assert_eq!(classify_accessory("WT-506"), Some(ProductType::WasteTonerBox));
        assert_eq!(classify_accessory("UK-204"), Some(ProductType::InterfaceKit));
        assert_eq!(classify_accessory("SK-506"), Some(ProductType::FinisherAccessory));
    }

    #[test]
    fn test_au_is_card_reader_and_ak_is_authentication_kit() {
        assert_eq!(classify_accessory("AU-101"), Some(ProductType::CardReader));
        assert_eq!(classify_accessory("AK-101"), Some(ProductType::AuthenticationKit));
    }

    #[test]
    fn test_series_fallback_when_no_accessory_prefix() {
        assert_eq!(classify_by_series("Bizhub C258"), ProductType::LaserMultifunction);
        assert_eq!(classify_by_series("AccurioPress C4080"), ProductType::LaserProductionPrinter);
        assert_eq!(classify_by_series("Totally Unknown Series"), ProductType::fallback_base_product());
    }

    #[test]
    fn test_prefix_takes_precedence_over_series() {
        // A finisher model code should classify as a finisher even if it
        // happens to be mentioned alongside a base-product series name.
        let result = classify_product_type("FS-534", Some("Bizhub C258"));
        assert_eq!(result, ProductType::Finisher);
    }
}
