// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Process Exit Codes
//!
//! Maps application results to the BSD `sysexits.h` convention, so shell
//! scripts and process supervisors driving `krai-pipeline` can distinguish
//! configuration errors from transient failures.

use std::process::ExitCode as StdExitCode;

/// Unix-style exit codes (a subset of `sysexits.h`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Successful termination
    Ok,
    /// Generic failure
    Failure,
    /// Command line usage error
    Usage,
    /// Input data was incorrect in some way (EX_DATAERR)
    DataErr,
    /// An input file did not exist or was not readable (EX_NOINPUT)
    NoInput,
    /// A service (database, embedding provider, object store) is unavailable (EX_UNAVAILABLE)
    Unavailable,
    /// Internal software error (EX_SOFTWARE)
    Software,
    /// Operation cancelled by shutdown signal
    Cancelled,
}

impl ExitCode {
    pub fn code(self) -> u8 {
        match self {
            ExitCode::Ok => 0,
            ExitCode::Failure => 1,
            ExitCode::Usage => 64,
            ExitCode::DataErr => 65,
            ExitCode::NoInput => 66,
            ExitCode::Unavailable => 69,
            ExitCode::Software => 70,
            ExitCode::Cancelled => 130,
        }
    }
}

impl From<ExitCode> for StdExitCode {
    fn from(code: ExitCode) -> Self {
        StdExitCode::from(code.code())
    }
}

/// Maps a `PipelineError`-style error message/category to an exit code.
///
/// Accepts the `category()` string produced by `krai_pipeline_domain::error::PipelineError`
/// rather than the error type itself, so bootstrap stays independent of the domain crate.
pub fn map_error_to_exit_code(category: &str) -> ExitCode {
    match category {
        "validation" | "input" => ExitCode::DataErr,
        "transient_service" => ExitCode::Unavailable,
        "permanent_service" => ExitCode::Software,
        "invariant_violation" => ExitCode::Software,
        "cancelled" => ExitCode::Cancelled,
        _ => ExitCode::Failure,
    }
}

/// Converts a `Result` into a process exit code, printing the error if present.
pub fn result_to_exit_code<T, E: std::fmt::Display>(result: Result<T, E>, category: impl Fn(&E) -> &str) -> StdExitCode {
    match result {
        Ok(_) => ExitCode::Ok.into(),
        Err(e) => {
            eprintln!("error: {e}");
            map_error_to_exit_code(category(&e)).into()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitCode::Ok.code(), 0);
        assert_eq!(ExitCode::Usage.code(), 64);
        assert_eq!(ExitCode::Cancelled.code(), 130);
    }

    #[test]
    fn test_map_error_to_exit_code() {
        assert_eq!(map_error_to_exit_code("validation").code(), 65);
        assert_eq!(map_error_to_exit_code("transient_service").code(), 69);
        assert_eq!(map_error_to_exit_code("unknown").code(), 1);
    }
}
