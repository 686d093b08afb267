// /////////////////////////////////////////////////////////////////////////////
// Krai Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Validate Configuration Use Case
//!
//! Backs the `validate-config` CLI command: loads the accessory-link
//! neighborhood for a product and delegates to
//! [`configuration_validator::validate_configuration`].

use std::sync::Arc;

use krai_pipeline_domain::error::PipelineError;
use krai_pipeline_domain::repositories::catalog_repository::ProductAccessoryRepository;
use krai_pipeline_domain::services::configuration_validator::{self, ValidationResult};
use krai_pipeline_domain::value_objects::ids::ProductId;

pub struct ValidateConfigurationUseCase {
    accessories: Arc<dyn ProductAccessoryRepository>,
}

impl ValidateConfigurationUseCase {
    pub fn new(accessories: Arc<dyn ProductAccessoryRepository>) -> Self {
        Self { accessories }
    }

    #[tracing::instrument(skip(self, accessory_ids), fields(product_id = %product_id, accessory_count = accessory_ids.len()))]
    pub async fn execute(&self, product_id: ProductId, accessory_ids: Vec<ProductId>) -> Result<ValidationResult, PipelineError> {
        let links = self.accessories.find_neighborhood(product_id, &accessory_ids).await?;
        Ok(configuration_validator::validate_configuration(product_id, &accessory_ids, &links))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use krai_pipeline_domain::entities::product_accessory::{CompatibilityType, ProductAccessory};

    struct FakeAccessories(Vec<ProductAccessory>);

    #[async_trait]
    impl ProductAccessoryRepository for FakeAccessories {
        async fn link(&self, _link: ProductAccessory) -> Result<(), PipelineError> {
            unreachable!()
        }
        async fn find_neighborhood(&self, _product_id: ProductId, _accessory_ids: &[ProductId]) -> Result<Vec<ProductAccessory>, PipelineError> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_missing_required_accessory_fails_validation() {
        let base = ProductId::new();
        let accessory = ProductId::new();
        let required = ProductId::new();
        let links = vec![ProductAccessory::new(required, accessory, CompatibilityType::Requires).unwrap()];

        let use_case = ValidateConfigurationUseCase::new(Arc::new(FakeAccessories(links)));
        let result = use_case.execute(base, vec![accessory]).await.unwrap();
        assert!(!result.valid);
    }

    #[tokio::test]
    async fn test_empty_neighborhood_is_trivially_valid() {
        let use_case = ValidateConfigurationUseCase::new(Arc::new(FakeAccessories(Vec::new())));
        let result = use_case.execute(ProductId::new(), vec![ProductId::new()]).await.unwrap();
        assert!(result.valid);
        assert!(result.errors.is_empty());
    }
}
