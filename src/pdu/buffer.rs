// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Fixed-capacity PDU buffer with the four cursors described by the
//! spec's data model: `base <= scan <= append <= limit`.

/// A single fixed-capacity byte buffer backing one in-flight PDU.
///
/// `base` is always `0` for an owned buffer (there is no sub-slicing
/// between buffers); it is kept as an explicit field anyway so the
/// cursor arithmetic below reads the same as the spec's invariant.
#[derive(Debug)]
pub struct PduBuffer {
    data: Vec<u8>,
    base: usize,
    scan: usize,
    append: usize,
    limit: usize,
    /// Bytes still required before the decoder can make progress; `0`
    /// suppresses decoding until more are requested.
    need: usize,
}

impl PduBuffer {
    /// Allocates a new buffer of the given capacity, already
    /// initialized as `acquire()` would leave it.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut buf = PduBuffer {
            data: vec![0u8; capacity],
            base: 0,
            scan: 0,
            append: 0,
            limit: capacity,
            need: 0,
        };
        buf.reset();
        buf
    }

    /// Resets all cursors to the empty state and requires at least one
    /// byte before the next decode attempt, guaranteeing the first read
    /// is always attempted.
    pub fn reset(&mut self) {
        self.scan = self.base;
        self.append = self.base;
        self.need = 1;
        self.check_invariants();
    }

    #[inline]
    fn check_invariants(&self) {
        debug_assert!(self.base <= self.scan);
        debug_assert!(self.scan <= self.append);
        debug_assert!(self.append <= self.limit);
        debug_assert!(self.limit <= self.data.len());
    }

    pub fn capacity(&self) -> usize {
        self.limit - self.base
    }

    pub fn base(&self) -> usize {
        self.base
    }

    pub fn scan(&self) -> usize {
        self.scan
    }

    pub fn append(&self) -> usize {
        self.append
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn need(&self) -> usize {
        self.need
    }

    pub fn set_need(&mut self, need: usize) {
        self.need = need;
    }

    /// Bytes decoded so far but not yet consumed by the codec.
    pub fn pending(&self) -> usize {
        self.append - self.base
    }

    /// Room left for the next I/O read.
    pub fn room(&self) -> usize {
        self.limit - self.append
    }

    /// Whole-buffer view of bytes delivered by I/O so far (`[base,
    /// append)`).
    pub fn filled(&self) -> &[u8] {
        &self.data[self.base..self.append]
    }

    /// Mutable slice covering the writable tail (`[append, limit)`), for
    /// the I/O layer to read into.
    pub fn writable_tail(&mut self) -> &mut [u8] {
        &mut self.data[self.append..self.limit]
    }

    /// Advances `append` after an I/O read delivered `n` bytes.
    pub fn advance_append(&mut self, n: usize) {
        assert!(self.append + n <= self.limit, "read overran buffer capacity");
        self.append += n;
        self.check_invariants();
    }

    /// Bytes the codec has not yet examined (`[scan, append)`).
    pub fn unscanned(&self) -> &[u8] {
        &self.data[self.scan..self.append]
    }

    /// Advances the parse cursor after the codec examines `n` bytes
    /// without consuming the PDU.
    pub fn advance_scan(&mut self, n: usize) {
        assert!(self.scan + n <= self.append, "scan overran appended bytes");
        self.scan += n;
        self.check_invariants();
    }

    /// Whether enough bytes have arrived to satisfy the decoder's
    /// current `need`.
    pub fn ready_to_decode(&self) -> bool {
        self.need > 0 && self.pending() >= self.need
    }

    /// Applies the overflow discipline from the spec's PDU Buffer
    /// section: given a decoded PDU length `decoded_len`, splits any
    /// surplus bytes into a freshly-acquired buffer.
    ///
    /// Returns `Some(overflow)` holding the surplus bytes as the new
    /// `current_read`, or `None` if the buffer held exactly
    /// `decoded_len` or fewer bytes (the caller clears `current_read`).
    pub fn split_overflow(&mut self, decoded_len: usize, fresh: &mut PduBuffer) -> bool {
        let n = self.pending();
        if n <= decoded_len {
            return false;
        }
        let surplus = n - decoded_len;
        fresh.reset();
        fresh.data[fresh.base..fresh.base + surplus]
            .copy_from_slice(&self.data[self.base + decoded_len..self.base + n]);
        fresh.append = fresh.base + surplus;
        fresh.scan = fresh.base;
        fresh.need = 1;
        self.append = self.base + decoded_len;
        self.scan = self.append;
        self.check_invariants();
        fresh.check_invariants();
        true
    }
}
