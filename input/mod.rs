/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Input handling for the canvas.
//!
//! The rendering engine does hit testing and reports what the user touched as
//! a `CanvasInput`. Interpretation (which request, if any, to send) happens in
//! the controller so it can be tested without an engine.

pub mod drop;
pub mod edge_gesture;

use euclid::default::Point2D;

use crate::graph::NodeId;
use drop::DragTransfer;

/// Interpreted-later user input, already hit tested by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasInput {
    /// Primary activation on a node.
    TapNode(NodeId),
    /// Primary activation on empty canvas.
    TapBackground,
    /// Secondary/contextual activation on a node.
    ContextActivate(NodeId),
    /// A node drag finished at `position` (graph space, engine-local).
    DragEnd { id: NodeId, position: Point2D<f32> },
    /// The engine added a node to its selection.
    SelectNode(NodeId),
    /// Delete/Backspace with no text input focused.
    DeleteSelection,
    /// External drag payload released over the canvas at `pointer`.
    Drop {
        transfer: DragTransfer,
        pointer: Point2D<f32>,
    },
}

impl CanvasInput {
    pub fn kind(&self) -> InputKind {
        match self {
            CanvasInput::TapNode(_) => InputKind::TapNode,
            CanvasInput::TapBackground => InputKind::TapBackground,
            CanvasInput::ContextActivate(_) => InputKind::ContextActivate,
            CanvasInput::DragEnd { .. } => InputKind::DragEnd,
            CanvasInput::SelectNode(_) => InputKind::SelectNode,
            CanvasInput::DeleteSelection => InputKind::DeleteSelection,
            CanvasInput::Drop { .. } => InputKind::Drop,
        }
    }
}

/// Input categories an engine must be able to deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InputKind {
    TapNode,
    TapBackground,
    ContextActivate,
    DragEnd,
    SelectNode,
    DeleteSelection,
    Drop,
}

pub const REQUIRED_INPUTS: [InputKind; 7] = [
    InputKind::TapNode,
    InputKind::TapBackground,
    InputKind::ContextActivate,
    InputKind::DragEnd,
    InputKind::SelectNode,
    InputKind::DeleteSelection,
    InputKind::Drop,
];
