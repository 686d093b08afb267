// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Bootstrap Configuration Path Resolution
//!
//! Bootstrap only resolves *which* configuration file to load; parsing and
//! validating its contents is an application/infrastructure concern
//! (`krai_pipeline::infrastructure::config`). Keeping this split mirrors the
//! bootstrap/enterprise layering used throughout this crate.

use std::path::PathBuf;

/// Default configuration file names searched, in order, when `--config` is not given.
const DEFAULT_CANDIDATES: &[&str] = &["krai-pipeline.toml", "config/krai-pipeline.toml"];

/// Resolves the configuration file path to load.
///
/// If `explicit` is provided (from `--config`), it is used as-is. Otherwise
/// the current directory is searched for the default candidate file names.
pub fn resolve_config_path(explicit: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path);
    }

    DEFAULT_CANDIDATES
        .iter()
        .map(PathBuf::from)
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_path_wins() {
        let explicit = Some(PathBuf::from("/tmp/custom.toml"));
        assert_eq!(resolve_config_path(explicit.clone()), explicit);
    }

    #[test]
    fn test_candidate_list_is_relative() {
        for candidate in DEFAULT_CANDIDATES {
            assert!(!PathBuf::from(candidate).is_absolute());
        }
    }
}
