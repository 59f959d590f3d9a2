// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! C_PDU segmentation on transmit and gap-tracked reassembly on
//! receive.

use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use thiserror::Error;

pub const MAX_SEGMENT_SIZE: usize = 800;
pub const MAX_CPDU_SIZE: usize = 4_096;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SegmentationError {
    #[error("segment size must be in 1..=800, got {0}")]
    BadSegmentSize(usize),
    #[error("c_pdu size {0} exceeds max 4096")]
    CpduTooLarge(usize),
    #[error("segment at offset {offset} len {len} exceeds declared c_pdu size {c_pdu_size}")]
    OffsetOutOfRange { offset: usize, len: usize, c_pdu_size: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingSegment {
    pub offset: usize,
    pub first: bool,
    pub last: bool,
    pub payload: Vec<u8>,
}

/// Splits `data` into `ceil(len / segment_size)` segments of at most
/// `segment_size` bytes each, flagging the first and last.
pub fn split(data: &[u8], segment_size: usize) -> Result<Vec<OutgoingSegment>, SegmentationError> {
    if segment_size == 0 || segment_size > MAX_SEGMENT_SIZE {
        return Err(SegmentationError::BadSegmentSize(segment_size));
    }
    if data.len() > MAX_CPDU_SIZE {
        return Err(SegmentationError::CpduTooLarge(data.len()));
    }
    if data.is_empty() {
        return Ok(Vec::new());
    }

    let total = data.len();
    let mut segments = Vec::with_capacity(total.div_ceil(segment_size));
    let mut offset = 0;
    while offset < total {
        let size = segment_size.min(total - offset);
        segments.push(OutgoingSegment {
            offset,
            first: offset == 0,
            last: offset + size == total,
            payload: data[offset..offset + size].to_vec(),
        });
        offset += size;
    }
    Ok(segments)
}

/// A C_PDU under reassembly: declared size, received bytes, and a
/// per-byte coverage bitmap.
pub struct ReassemblyRecord {
    c_pdu_size: usize,
    data: Vec<u8>,
    coverage: Vec<u8>,
    created_at: Instant,
}

impl ReassemblyRecord {
    pub fn new(c_pdu_size: usize, now: Instant) -> Self {
        ReassemblyRecord {
            c_pdu_size,
            data: vec![0u8; c_pdu_size],
            coverage: vec![0u8; c_pdu_size.div_ceil(8)],
            created_at: now,
        }
    }

    pub fn insert(&mut self, offset: usize, bytes: &[u8]) -> Result<(), SegmentationError> {
        if offset + bytes.len() > self.c_pdu_size {
            return Err(SegmentationError::OffsetOutOfRange {
                offset,
                len: bytes.len(),
                c_pdu_size: self.c_pdu_size,
            });
        }
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
        for i in offset..offset + bytes.len() {
            self.coverage[i / 8] |= 1 << (i % 8);
        }
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        let full_bytes = self.c_pdu_size / 8;
        if self.coverage[..full_bytes].iter().any(|&b| b != 0xFF) {
            return false;
        }
        let rem = self.c_pdu_size % 8;
        if rem > 0 {
            let mask = (1u8 << rem) - 1;
            if self.coverage[full_bytes] & mask != mask {
                return false;
            }
        }
        true
    }

    pub fn is_expired(&self, now: Instant, timeout: Duration) -> bool {
        now.duration_since(self.created_at) >= timeout
    }

    pub fn take(self) -> Vec<u8> {
        self.data
    }
}

/// Reassembly state across every `(remote_address, c_pdu_id)` pair
/// currently in flight on a connection.
#[derive(Default)]
pub struct ReassemblyTable {
    records: HashMap<(Vec<u8>, u16), ReassemblyRecord>,
}

impl ReassemblyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one received segment into the record for `(remote,
    /// c_pdu_id)`, creating it on first sight. Returns the reassembled
    /// C_PDU once every byte has arrived.
    pub fn on_segment(
        &mut self,
        remote: Vec<u8>,
        c_pdu_id: u16,
        c_pdu_size: usize,
        offset: usize,
        bytes: &[u8],
        now: Instant,
    ) -> Result<Option<Vec<u8>>, SegmentationError> {
        if c_pdu_size > MAX_CPDU_SIZE {
            return Err(SegmentationError::CpduTooLarge(c_pdu_size));
        }
        let key = (remote, c_pdu_id);
        let record = self.records.entry(key.clone()).or_insert_with(|| ReassemblyRecord::new(c_pdu_size, now));
        record.insert(offset, bytes)?;
        if record.is_complete() {
            match self.records.remove(&key) {
                Some(rec) => Ok(Some(rec.take())),
                None => Ok(None),
            }
        } else {
            Ok(None)
        }
    }

    /// Drops any record whose reassembly timeout has passed.
    pub fn sweep_expired(&mut self, now: Instant, timeout: Duration) {
        self.records.retain(|_, r| !r.is_expired(now, timeout));
    }

    pub fn pending_count(&self) -> usize {
        self.records.len()
    }
}
