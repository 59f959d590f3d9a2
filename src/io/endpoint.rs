// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Per-connection read queue, write queue and in-flight write list.

use std::{collections::HashMap, io};

use tracing::warn;

use crate::{
    error::{EndpointId, EngineError},
    io::transport::Transport,
    pdu::{self, PduBuffer},
};

/// What the caller's decode closure found in the unscanned bytes of the
/// current read buffer.
pub enum DecodeOutcome {
    /// Not enough bytes yet; `need` is the new byte count required
    /// before the next call.
    NeedMore(usize),
    /// A PDU of `len` bytes (starting at the buffer's `base`) was
    /// consumed; any surplus is carried into a fresh buffer.
    Consumed(usize),
    /// The PDU is malformed beyond recovery for this endpoint.
    Reject(EngineError),
}

/// One outbound PDU as up to 3 scatter-gather parts (header, payload,
/// CRC). `part_idx`/`part_offset` mark how far the current part has
/// been written; earlier parts are always fully flushed.
struct OutboundPdu {
    tag: u64,
    request_tag: Option<u64>,
    parts: Vec<Vec<u8>>,
    part_idx: usize,
    part_offset: usize,
}

impl OutboundPdu {
    fn is_fully_written(&self) -> bool {
        self.part_idx >= self.parts.len()
    }

    fn remaining_iov_entries(&self) -> usize {
        self.parts.len() - self.part_idx
    }
}

/// One accepted connection: its transport, current read buffer, and
/// outbound FIFO/in-flight bookkeeping.
pub struct Endpoint<T> {
    pub id: EndpointId,
    transport: T,
    current_read: Option<PduBuffer>,
    outbound: std::collections::VecDeque<OutboundPdu>,
    in_flight: Vec<OutboundPdu>,
    responses_of: HashMap<u64, Vec<u64>>,
    next_tag: u64,
    pub bytes_read: u64,
    pub bytes_written: u64,
    pub pdus_read: u64,
}

impl<T: Transport> Endpoint<T> {
    pub fn new(id: EndpointId, transport: T) -> Self {
        Endpoint {
            id,
            transport,
            current_read: None,
            outbound: std::collections::VecDeque::new(),
            in_flight: Vec::new(),
            responses_of: HashMap::new(),
            next_tag: 0,
            bytes_read: 0,
            bytes_written: 0,
            pdus_read: 0,
        }
    }

    /// Drains readable bytes into the current PDU buffer, invoking
    /// `on_pdu` each time enough bytes have arrived to attempt a
    /// decode. Returns once the transport reports `WouldBlock`.
    pub fn read_ready(
        &mut self,
        mut on_pdu: impl FnMut(&[u8]) -> DecodeOutcome,
    ) -> Result<(), EngineError> {
        let mut buf = self.current_read.take().unwrap_or_else(pdu::acquire);

        loop {
            if buf.room() == 0 {
                pdu::release(buf);
                warn!(endpoint = self.id, protocol = "framing", "pdu buffer exhausted before a full pdu arrived");
                return Err(EngineError::FramingFatal {
                    endpoint: self.id,
                    reason: "pdu buffer exhausted before a full pdu arrived".to_string(),
                });
            }

            let n = match self.transport.try_read(buf.writable_tail()) {
                Ok(0) => {
                    pdu::release(buf);
                    warn!(endpoint = self.id, protocol = "io", "peer closed during read_ready");
                    return Err(EngineError::TransportFatal {
                        endpoint: self.id,
                        reason: "peer closed".to_string(),
                    });
                },
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    self.current_read = Some(buf);
                    return Ok(());
                },
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    pdu::release(buf);
                    warn!(endpoint = self.id, protocol = "io", cause = %e, "transport read failed fatally");
                    return Err(EngineError::TransportFatal { endpoint: self.id, reason: e.to_string() });
                },
            };
            buf.advance_append(n);
            self.bytes_read += n as u64;

            while buf.ready_to_decode() {
                match on_pdu(buf.unscanned()) {
                    DecodeOutcome::NeedMore(need) => {
                        buf.set_need(need);
                        break;
                    },
                    DecodeOutcome::Consumed(len) => {
                        self.pdus_read += 1;
                        let mut fresh = pdu::acquire();
                        if buf.split_overflow(len, &mut fresh) {
                            pdu::release(buf);
                            buf = fresh;
                        } else {
                            pdu::release(fresh);
                            pdu::release(buf);
                            buf = pdu::acquire();
                        }
                    },
                    DecodeOutcome::Reject(err) => {
                        pdu::release(buf);
                        warn!(endpoint = self.id, protocol = "framing", cause = %err, "pdu rejected");
                        return Err(err);
                    },
                }
            }
        }
    }

    /// Enqueues an already-encoded PDU for transmission, as its 1-3 iov
    /// entries (typically header, payload, CRC). `request_tag`, when
    /// set, links this PDU as a response to an earlier request so it
    /// can be orphaned if that request's endpoint closes first.
    pub fn enqueue(&mut self, parts: Vec<Vec<u8>>, request_tag: Option<u64>) -> u64 {
        let tag = self.next_tag;
        self.next_tag += 1;
        if let Some(req) = request_tag {
            self.responses_of.entry(req).or_default().push(tag);
        }
        self.outbound.push_back(OutboundPdu { tag, request_tag, parts, part_idx: 0, part_offset: 0 });
        tag
    }

    /// Stages outbound PDUs up to `iov_staging_max` total iov entries
    /// and issues a scatter-gather write, releasing fully-written
    /// PDUs. A write that lands mid-PDU leaves the partially-written
    /// iov entries in place for the next call.
    pub fn write_ready(&mut self, iov_staging_max: usize) -> Result<(), EngineError> {
        loop {
            let mut iov_count: usize = self.in_flight.iter().map(OutboundPdu::remaining_iov_entries).sum();
            while iov_count < iov_staging_max {
                let next_len = match self.outbound.front() {
                    Some(pdu) => pdu.parts.len(),
                    None => break,
                };
                if iov_count > 0 && iov_count + next_len > iov_staging_max {
                    break;
                }
                let pdu = match self.outbound.pop_front() {
                    Some(pdu) => pdu,
                    None => break,
                };
                iov_count += pdu.remaining_iov_entries();
                self.in_flight.push(pdu);
            }
            if self.in_flight.is_empty() {
                return Ok(());
            }

            let mut slices: Vec<&[u8]> = Vec::with_capacity(iov_count);
            for pdu in &self.in_flight {
                for (i, part) in pdu.parts[pdu.part_idx..].iter().enumerate() {
                    if i == 0 {
                        slices.push(&part[pdu.part_offset..]);
                    } else {
                        slices.push(part.as_slice());
                    }
                }
            }

            let n = match self.transport.try_write(&slices) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!(endpoint = self.id, protocol = "io", cause = %e, "transport write failed fatally");
                    return Err(EngineError::TransportFatal { endpoint: self.id, reason: e.to_string() });
                },
            };
            if n == 0 {
                return Ok(());
            }
            self.bytes_written += n as u64;
            self.apply_write_progress(n);
        }
    }

    /// Walks `in_flight` in write order, consuming `n` written bytes
    /// across iov entries and PDUs. A PDU that isn't fully flushed
    /// stops the walk: nothing after it on the wire could have been
    /// written by a well-behaved vectored write.
    fn apply_write_progress(&mut self, mut n: usize) {
        let mut done_count = 0;
        for pdu in self.in_flight.iter_mut() {
            while n > 0 && pdu.part_idx < pdu.parts.len() {
                let part_len = pdu.parts[pdu.part_idx].len() - pdu.part_offset;
                if part_len <= n {
                    n -= part_len;
                    pdu.part_idx += 1;
                    pdu.part_offset = 0;
                } else {
                    pdu.part_offset += n;
                    n = 0;
                }
            }
            if pdu.is_fully_written() {
                done_count += 1;
            } else {
                break;
            }
        }
        let done: Vec<OutboundPdu> = self.in_flight.drain(0..done_count).collect();
        for pdu in done {
            self.release_outbound(pdu);
        }
    }

    fn release_outbound(&mut self, pdu: OutboundPdu) {
        if let Some(req) = pdu.request_tag {
            if let Some(list) = self.responses_of.get_mut(&req) {
                list.retain(|&t| t != pdu.tag);
                if list.is_empty() {
                    self.responses_of.remove(&req);
                }
            }
        }
        self.responses_of.remove(&pdu.tag);
    }

    /// Drops the read buffer and any queued/in-flight writes; linked
    /// responses are simply discarded along with their entries.
    pub fn close(&mut self) {
        if let Some(buf) = self.current_read.take() {
            pdu::release(buf);
        }
        self.outbound.clear();
        self.in_flight.clear();
        self.responses_of.clear();
    }

    pub fn outbound_len(&self) -> usize {
        self.outbound.len()
    }

    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }
}
