/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Interaction and synchronization controller for a graph canvas whose
//! canonical graph lives with a remote authority.
//!
//! The local [`sync::Mirror`] is changed only by confirmed events from the
//! authority. User gestures handled by [`app::CanvasController`] produce
//! requests on a [`protocol::channel::CommandChannel`] and nothing else.

pub mod app;
pub mod camera;
pub mod export;
pub mod filter;
pub mod graph;
pub mod input;
pub mod prefs;
pub mod protocol;
pub mod render;
pub mod sync;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

use tracing_subscriber::EnvFilter;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install a stderr `fmt` subscriber. `filter` takes precedence over
/// `RUST_LOG`; with neither, `info` is used. `log` records from the library
/// are routed through the same subscriber.
pub fn init_tracing(filter: Option<&str>) {
    let filter = match filter {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
