// /////////////////////////////////////////////////////////////////////////////
// Krai Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Application
//!
//! One use case per CLI command, composed over the domain's repository and
//! service ports. Use cases take `Arc<dyn Port>` collaborators in their
//! constructors and never reach for a concrete infrastructure type directly.

pub mod use_cases;
