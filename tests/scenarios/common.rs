// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{
    collections::VecDeque,
    io,
    sync::{Arc, Mutex},
};

use stanag5066_engine::io::Transport;

/// One direction of an in-memory duplex pipe: bytes written on one end
/// land in `inbound` of the other.
#[derive(Clone)]
pub struct LoopbackTransport {
    inbound: Arc<Mutex<VecDeque<u8>>>,
    outbound: Arc<Mutex<VecDeque<u8>>>,
}

/// Builds a connected pair: `a`'s writes become `b`'s reads and vice
/// versa.
pub fn loopback_pair() -> (LoopbackTransport, LoopbackTransport) {
    let a_to_b = Arc::new(Mutex::new(VecDeque::new()));
    let b_to_a = Arc::new(Mutex::new(VecDeque::new()));
    let a = LoopbackTransport { inbound: b_to_a.clone(), outbound: a_to_b.clone() };
    let b = LoopbackTransport { inbound: a_to_b, outbound: b_to_a };
    (a, b)
}

impl Transport for LoopbackTransport {
    fn try_read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut inbound = self.inbound.lock().unwrap_or_else(|p| p.into_inner());
        if inbound.is_empty() {
            return Err(io::Error::from(io::ErrorKind::WouldBlock));
        }
        let n = buf.len().min(inbound.len());
        for slot in buf.iter_mut().take(n) {
            *slot = inbound.pop_front().unwrap_or(0);
        }
        Ok(n)
    }

    fn try_write(&mut self, bufs: &[&[u8]]) -> io::Result<usize> {
        let mut outbound = self.outbound.lock().unwrap_or_else(|p| p.into_inner());
        let mut total = 0;
        for b in bufs {
            outbound.extend(b.iter().copied());
            total += b.len();
        }
        Ok(total)
    }
}
