/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Command channel boundary between the controller and the remote authority.
//!
//! Requests are fire-and-forget. Confirmations come back later through
//! `poll_event`, in the order the authority sent them, possibly interleaved
//! with unrelated events.

use crossbeam_channel::{Receiver, Sender, TryRecvError, unbounded};
use log::warn;

use super::{InboundEvent, OutboundRequest};

pub trait CommandChannel {
    /// Hand a request to the authority. Never waits for a reply.
    fn push(&mut self, request: OutboundRequest) -> Result<(), ChannelError>;

    /// Next confirmed event, if one has arrived.
    fn poll_event(&mut self) -> Option<InboundEvent>;
}

impl<C: CommandChannel + ?Sized> CommandChannel for &mut C {
    fn push(&mut self, request: OutboundRequest) -> Result<(), ChannelError> {
        (**self).push(request)
    }

    fn poll_event(&mut self) -> Option<InboundEvent> {
        (**self).poll_event()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    #[error("command channel disconnected")]
    Disconnected,
}

/// Controller side of an in-process channel pair.
pub struct ClientEndpoint {
    requests: Sender<OutboundRequest>,
    events: Receiver<InboundEvent>,
}

/// Authority side of an in-process channel pair.
pub struct AuthorityEndpoint {
    requests: Receiver<OutboundRequest>,
    events: Sender<InboundEvent>,
}

/// Build a connected pair of unbounded, order-preserving endpoints.
pub fn in_process() -> (ClientEndpoint, AuthorityEndpoint) {
    let (request_tx, request_rx) = unbounded();
    let (event_tx, event_rx) = unbounded();
    (
        ClientEndpoint {
            requests: request_tx,
            events: event_rx,
        },
        AuthorityEndpoint {
            requests: request_rx,
            events: event_tx,
        },
    )
}

impl CommandChannel for ClientEndpoint {
    fn push(&mut self, request: OutboundRequest) -> Result<(), ChannelError> {
        self.requests
            .send(request)
            .map_err(|_| ChannelError::Disconnected)
    }

    fn poll_event(&mut self) -> Option<InboundEvent> {
        match self.events.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                warn!("command channel: authority endpoint dropped");
                None
            },
        }
    }
}

impl AuthorityEndpoint {
    pub fn send(&self, event: InboundEvent) -> Result<(), ChannelError> {
        self.events
            .send(event)
            .map_err(|_| ChannelError::Disconnected)
    }

    pub fn drain_requests(&self) -> Vec<OutboundRequest> {
        self.requests.try_iter().collect()
    }
}
