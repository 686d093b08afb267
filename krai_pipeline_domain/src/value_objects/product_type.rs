// /////////////////////////////////////////////////////////////////////////////
// Krai Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Product Type Vocabulary
//!
//! A closed vocabulary of product/accessory types. Values outside this set
//! are a [`PipelineError::ValidationError`](crate::error::PipelineError), not
//! silently accepted — see `SPEC_FULL.md` §3.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    // Base products
    LaserPrinter,
    LaserMultifunction,
    LaserProductionPrinter,
    InkjetPrinter,
    InkjetMultifunction,
    Cabinet,

    // Paper handling accessories
    DocumentFeeder,
    DocumentProcessor,
    LargeCapacityFeeder,
    PaperFeeder,
    BannerFeeder,

    // Finishing accessories
    Finisher,
    FinisherAccessory,
    PunchFinisher,
    SaddleFinisher,
    InnerFinisher,
    ZFoldUnit,
    Trimmer,
    PostInserter,
    JobSeparator,
    Creaser,
    FoldingUnit,

    // Controller / connectivity
    ImageController,
    ControllerAccessory,
    InterfaceKit,
    HardDrive,
    CardReader,
    AuthenticationUnit,
    AuthenticationKit,
    FaxKit,
    RelayUnit,
    Mailbox,

    // Consumables
    TonerCartridge,
    DrumUnit,
    StapleCartridge,
    WasteTonerBox,
    MaintenanceKit,

    /// Generic fall-through for an accessory whose exact role is unknown but
    /// whose model number matched a manufacturer's prefix table.
    Accessory,
}

impl ProductType {
    pub fn as_str(self) -> &'static str {
        match self {
            ProductType::LaserPrinter => "laser_printer",
            ProductType::LaserMultifunction => "laser_multifunction",
            ProductType::LaserProductionPrinter => "laser_production_printer",
            ProductType::InkjetPrinter => "inkjet_printer",
            ProductType::InkjetMultifunction => "inkjet_multifunction",
            ProductType::Cabinet => "cabinet",
            ProductType::DocumentFeeder => "document_feeder",
            ProductType::DocumentProcessor => "document_processor",
            ProductType::LargeCapacityFeeder => "large_capacity_feeder",
            ProductType::PaperFeeder => "paper_feeder",
            ProductType::BannerFeeder => "banner_feeder",
            ProductType::Finisher => "finisher",
            ProductType::FinisherAccessory => "finisher_accessory",
            ProductType::PunchFinisher => "punch_finisher",
            ProductType::SaddleFinisher => "saddle_finisher",
            ProductType::InnerFinisher => "inner_finisher",
            ProductType::ZFoldUnit => "z_fold_unit",
            ProductType::Trimmer => "trimmer",
            ProductType::PostInserter => "post_inserter",
            ProductType::JobSeparator => "job_separator",
            ProductType::Creaser => "creaser",
            ProductType::FoldingUnit => "folding_unit",
            ProductType::ImageController => "image_controller",
            ProductType::ControllerAccessory => "controller_accessory",
            ProductType::InterfaceKit => "interface_kit",
            ProductType::HardDrive => "hard_drive",
            ProductType::CardReader => "card_reader",
            ProductType::AuthenticationUnit => "authentication_unit",
            ProductType::AuthenticationKit => "authentication_kit",
            ProductType::FaxKit => "fax_kit",
            ProductType::RelayUnit => "relay_unit",
            ProductType::Mailbox => "mailbox",
            ProductType::TonerCartridge => "toner_cartridge",
            ProductType::DrumUnit => "drum_unit",
            ProductType::StapleCartridge => "staple_cartridge",
            ProductType::WasteTonerBox => "waste_toner_box",
            ProductType::MaintenanceKit => "maintenance_kit",
            ProductType::Accessory => "accessory",
        }
    }

    /// Product-series-level fallback: any accessory type not otherwise
    /// classified on its own model number defaults to `laser_multifunction`
    /// for the *base product* type when building a product record with no
    /// more specific evidence (see `SPEC_FULL.md` §4.5).
    pub fn fallback_base_product() -> Self {
        ProductType::LaserMultifunction
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("'{0}' is not a recognized product type")]
pub struct UnknownProductType(pub String);

impl FromStr for ProductType {
    type Err = UnknownProductType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "laser_printer" => ProductType::LaserPrinter,
            "laser_multifunction" => ProductType::LaserMultifunction,
            "laser_production_printer" => ProductType::LaserProductionPrinter,
            "inkjet_printer" => ProductType::InkjetPrinter,
            "inkjet_multifunction" => ProductType::InkjetMultifunction,
            "cabinet" => ProductType::Cabinet,
            "document_feeder" => ProductType::DocumentFeeder,
            "document_processor" => ProductType::DocumentProcessor,
            "large_capacity_feeder" => ProductType::LargeCapacityFeeder,
            "paper_feeder" => ProductType::PaperFeeder,
            "banner_feeder" => ProductType::BannerFeeder,
            "finisher" => ProductType::Finisher,
            "finisher_accessory" => ProductType::FinisherAccessory,
            "punch_finisher" => ProductType::PunchFinisher,
            "saddle_finisher" => ProductType::SaddleFinisher,
            "inner_finisher" => ProductType::InnerFinisher,
            "z_fold_unit" => ProductType::ZFoldUnit,
            "trimmer" => ProductType::Trimmer,
            "post_inserter" => ProductType::PostInserter,
            "job_separator" => ProductType::JobSeparator,
            "creaser" => ProductType::Creaser,
            "folding_unit" => ProductType::FoldingUnit,
            "image_controller" => ProductType::ImageController,
            "controller_accessory" => ProductType::ControllerAccessory,
            "interface_kit" => ProductType::InterfaceKit,
            "hard_drive" => ProductType::HardDrive,
            "card_reader" => ProductType::CardReader,
            "authentication_unit" => ProductType::AuthenticationUnit,
            "authentication_kit" => ProductType::AuthenticationKit,
            "fax_kit" => ProductType::FaxKit,
            "relay_unit" => ProductType::RelayUnit,
            "mailbox" => ProductType::Mailbox,
            "toner_cartridge" => ProductType::TonerCartridge,
            "drum_unit" => ProductType::DrumUnit,
            "staple_cartridge" => ProductType::StapleCartridge,
            "waste_toner_box" => ProductType::WasteTonerBox,
            "maintenance_kit" => ProductType::MaintenanceKit,
            "accessory" => ProductType::Accessory,
            other => return Err(UnknownProductType(other.to_string())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_through_str() {
        for variant in [
            ProductType::SaddleFinisher,
            ProductType::InnerFinisher,
            ProductType::AuthenticationKit,
            ProductType::LaserProductionPrinter,
            ProductType::Accessory,
        ] {
            let parsed: ProductType = variant.as_str().parse().unwrap();
            assert_eq!(parsed, variant);
        }
    }

    #[test]
    fn test_unknown_type_rejected() {
        assert!("not_a_real_type".parse::<ProductType>().is_err());
    }
}
