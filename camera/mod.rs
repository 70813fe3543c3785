/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Viewport to graph-space coordinate mapping.
//!
//! The camera is owned by the rendering engine and changes continuously while
//! the user pans and zooms. Callers read it at the moment of the gesture and
//! pass it in; nothing here caches pan or zoom.

use euclid::default::{Point2D, Size2D, Vector2D};

/// Snapshot of the engine camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// Top-left corner of the rendering surface in pointer coordinates.
    pub viewport_origin: Point2D<f32>,
    pub viewport_size: Size2D<f32>,
    pub pan: Vector2D<f32>,
    pub zoom: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            viewport_origin: Point2D::origin(),
            viewport_size: Size2D::zero(),
            pan: Vector2D::zero(),
            zoom: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum CameraError {
    #[error("zoom factor must be finite and positive, got {0}")]
    InvalidZoom(f32),
    #[error("coordinates are not finite")]
    NonFinite,
}

/// Pointer coordinates to graph space: subtract the surface origin, then the
/// pan offset, then divide by zoom.
pub fn to_graph_space(
    pointer: Point2D<f32>,
    viewport_origin: Point2D<f32>,
    pan: Vector2D<f32>,
    zoom: f32,
) -> Result<Point2D<f32>, CameraError> {
    check_zoom(zoom)?;
    if !is_finite(pointer) || !is_finite(viewport_origin) || !is_finite(pan.to_point()) {
        return Err(CameraError::NonFinite);
    }
    let local = pointer - viewport_origin;
    Ok(((local - pan) / zoom).to_point())
}

/// Inverse of [`to_graph_space`].
pub fn to_viewport_space(
    graph: Point2D<f32>,
    viewport_origin: Point2D<f32>,
    pan: Vector2D<f32>,
    zoom: f32,
) -> Result<Point2D<f32>, CameraError> {
    check_zoom(zoom)?;
    if !is_finite(graph) {
        return Err(CameraError::NonFinite);
    }
    Ok(viewport_origin + pan + graph.to_vector() * zoom)
}

impl Camera {
    pub fn to_graph_space(&self, pointer: Point2D<f32>) -> Result<Point2D<f32>, CameraError> {
        to_graph_space(pointer, self.viewport_origin, self.pan, self.zoom)
    }

    pub fn to_viewport_space(&self, graph: Point2D<f32>) -> Result<Point2D<f32>, CameraError> {
        to_viewport_space(graph, self.viewport_origin, self.pan, self.zoom)
    }
}

fn check_zoom(zoom: f32) -> Result<(), CameraError> {
    if zoom.is_finite() && zoom > 0.0 {
        Ok(())
    } else {
        Err(CameraError::InvalidZoom(zoom))
    }
}

fn is_finite(point: Point2D<f32>) -> bool {
    point.x.is_finite() && point.y.is_finite()
}
