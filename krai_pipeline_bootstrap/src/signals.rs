// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Signal Handling
//!
//! Wires OS shutdown signals (SIGTERM, SIGINT, and on Unix SIGHUP) into a
//! [`ShutdownCoordinator`](crate::shutdown::ShutdownCoordinator).

use crate::shutdown::ShutdownCoordinator;

/// Spawns a task that calls [`ShutdownCoordinator::initiate_shutdown`] on the
/// first SIGTERM/SIGINT/SIGHUP received.
///
/// Returns immediately; the signal task keeps running for the lifetime of
/// the coordinator.
pub fn install_signal_handlers(coordinator: ShutdownCoordinator) {
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        tracing::info!("shutdown signal received");
        coordinator.initiate_shutdown();
    });
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
    let mut sighup = signal(SignalKind::hangup()).expect("failed to install SIGHUP handler");

    tokio::select! {
        _ = sigterm.recv() => {}
        _ = sigint.recv() => {}
        _ = sighup.recv() => {}
    }
}

#[cfg(windows)]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_install_signal_handlers_does_not_fire_spuriously() {
        let coordinator = ShutdownCoordinator::new(Duration::from_secs(5));
        install_signal_handlers(coordinator.clone());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!coordinator.is_shutting_down());
    }
}
