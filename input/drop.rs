/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Palette drag-and-drop ingestion.
//!
//! A drop never touches the mirror. It becomes an `add_node_from_palette`
//! request; the node appears when the authority confirms with `add_node`.

use std::collections::BTreeMap;

use euclid::default::Point2D;
use uuid::Uuid;

use crate::camera::{Camera, CameraError};
use crate::graph::EntityRef;
use crate::protocol::OutboundRequest;

/// Transfer key carrying the entity reference.
pub const ENTITY_REF_KEY: &str = "media-id";

/// Transfer key carrying the origin content reference.
pub const ORIGIN_REF_KEY: &str = "image-url";

/// Key/value data attached to an external drag, as set at drag start.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DragTransfer {
    entries: BTreeMap<String, String>,
}

impl DragTransfer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.entries.insert(key.to_string(), value.to_string());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }
}

/// Validated drop content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropPayload {
    pub entity_ref: EntityRef,
    pub origin_ref: Option<String>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DropRejected {
    #[error("drop payload is missing an entity reference")]
    MissingEntityRef,
    #[error("drop position could not be mapped: {0}")]
    Unmappable(#[from] CameraError),
}

impl DropPayload {
    pub fn from_transfer(transfer: &DragTransfer) -> Result<Self, DropRejected> {
        let entity_ref = transfer
            .get(ENTITY_REF_KEY)
            .and_then(EntityRef::parse)
            .ok_or(DropRejected::MissingEntityRef)?;
        let origin_ref = transfer
            .get(ORIGIN_REF_KEY)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        Ok(Self {
            entity_ref,
            origin_ref,
        })
    }
}

/// Turn a drop into a positioned palette request, using the camera as it is
/// right now.
pub fn ingest_drop(
    transfer: &DragTransfer,
    pointer: Point2D<f32>,
    camera: &Camera,
) -> Result<OutboundRequest, DropRejected> {
    let payload = DropPayload::from_transfer(transfer)?;
    let position = camera.to_graph_space(pointer)?;
    Ok(OutboundRequest::AddNodeFromPalette {
        entity_ref: payload.entity_ref,
        position: position.into(),
        origin_ref: payload.origin_ref,
        placeholder_id: format!("pending-{}", Uuid::new_v4()),
    })
}
