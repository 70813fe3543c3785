/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Canvas preferences, loaded from TOML.

use std::fmt;
use std::path::Path;

use serde::Deserialize;

use crate::sync::PendingEdgePolicy;

#[derive(Debug, thiserror::Error)]
pub enum PrefsError {
    #[error("failed to read preferences: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse preferences: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid preferences: {0}")]
    Invalid(String),
}

/// Which surface the canvas is mounted as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanvasMode {
    /// Read-only knowledge-graph browser.
    Browser,
    /// Spatial editor with drag, drop, edge drawing, and delete.
    #[default]
    Editor,
}

impl fmt::Display for CanvasMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CanvasMode::Browser => f.write_str("browser"),
            CanvasMode::Editor => f.write_str("editor"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CanvasPrefs {
    pub mode: CanvasMode,
    pub min_zoom: f32,
    pub max_zoom: f32,
    /// Padding around content when fitting the view after a load.
    pub fit_padding: f32,
    /// Layout for `apply_layout` without a name.
    pub default_layout: String,
    /// Layout re-run over the visible subset after a filter change.
    pub filter_layout: String,
    pub pending_edges: PendingEdgePolicy,
}

impl Default for CanvasPrefs {
    fn default() -> Self {
        Self {
            mode: CanvasMode::default(),
            min_zoom: 0.3,
            max_zoom: 2.0,
            fit_padding: 50.0,
            default_layout: "grid".to_string(),
            filter_layout: "cose".to_string(),
            pending_edges: PendingEdgePolicy::default(),
        }
    }
}

impl CanvasPrefs {
    pub fn from_toml_str(text: &str) -> Result<Self, PrefsError> {
        let prefs: Self = toml::from_str(text)?;
        prefs.validate()?;
        Ok(prefs)
    }

    pub fn load(path: &Path) -> Result<Self, PrefsError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), PrefsError> {
        if !(self.min_zoom.is_finite() && self.min_zoom > 0.0) {
            return Err(PrefsError::Invalid(format!(
                "min_zoom must be positive, got {}",
                self.min_zoom
            )));
        }
        if !(self.max_zoom.is_finite() && self.max_zoom >= self.min_zoom) {
            return Err(PrefsError::Invalid(format!(
                "max_zoom {} is below min_zoom {}",
                self.max_zoom, self.min_zoom
            )));
        }
        if !(self.fit_padding.is_finite() && self.fit_padding >= 0.0) {
            return Err(PrefsError::Invalid(format!(
                "fit_padding must be non-negative, got {}",
                self.fit_padding
            )));
        }
        if self.pending_edges.capacity == 0 {
            return Err(PrefsError::Invalid(
                "pending_edges.capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
