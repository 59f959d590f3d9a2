// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Drives every endpoint's `read_ready`/`write_ready` off a readiness
//! report from whatever reactor owns the sockets (`mio`, `tokio`'s own
//! readiness events, or a test harness).

use std::collections::HashMap;

use tracing::warn;

use crate::{
    error::{EndpointId, EngineError},
    io::{
        endpoint::{DecodeOutcome, Endpoint},
        transport::Transport,
    },
};

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Readiness: u8 {
        const READABLE = 0b01;
        const WRITABLE = 0b10;
    }
}

/// Reports which endpoints became ready since the last poll. A real
/// reactor adapts `mio::Events` or a `tokio` readiness stream to this;
/// tests can implement it directly over a fixed list.
pub trait ReadinessSource {
    fn poll(&mut self) -> Vec<(EndpointId, Readiness)>;
}

/// Owns every live endpoint and dispatches readiness events to them.
#[derive(Default)]
pub struct Dispatcher<T> {
    endpoints: HashMap<EndpointId, Endpoint<T>>,
    iov_staging_max: usize,
}

impl<T: Transport> Dispatcher<T> {
    pub fn new(iov_staging_max: usize) -> Self {
        Dispatcher { endpoints: HashMap::new(), iov_staging_max }
    }

    pub fn insert(&mut self, endpoint: Endpoint<T>) {
        self.endpoints.insert(endpoint.id, endpoint);
    }

    pub fn remove(&mut self, id: EndpointId) -> Option<Endpoint<T>> {
        self.endpoints.remove(&id)
    }

    pub fn get_mut(&mut self, id: EndpointId) -> Option<&mut Endpoint<T>> {
        self.endpoints.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Services one endpoint's readiness. On a fatal error the
    /// endpoint is removed and torn down; the error is returned to the
    /// caller for logging.
    pub fn dispatch(
        &mut self,
        id: EndpointId,
        readiness: Readiness,
        mut on_pdu: impl FnMut(EndpointId, &[u8]) -> DecodeOutcome,
    ) -> Result<(), EngineError> {
        let endpoint = match self.endpoints.get_mut(&id) {
            Some(e) => e,
            None => return Ok(()),
        };

        let result = (|| {
            if readiness.contains(Readiness::READABLE) {
                endpoint.read_ready(|bytes| on_pdu(id, bytes))?;
            }
            if readiness.contains(Readiness::WRITABLE) {
                endpoint.write_ready(self.iov_staging_max)?;
            }
            Ok(())
        })();

        if let Err(err) = &result {
            if err.is_fatal() {
                warn!(endpoint = id, protocol = "io", cause = %err, "tearing down endpoint after fatal error");
                if let Some(mut endpoint) = self.endpoints.remove(&id) {
                    endpoint.close();
                }
            }
        }
        result
    }
}
