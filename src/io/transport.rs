// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The non-blocking transport seam the dispatcher drives. Kept generic
//! so the protocol/ARQ core can be driven without a real socket; a real
//! deployment implements this for `tokio::net::TcpStream` via its
//! `try_read`/`try_write_vectored` family.

use std::io;

pub trait Transport {
    /// Reads into `buf` without blocking. `Ok(0)` means the peer closed;
    /// `Err` with `ErrorKind::WouldBlock` means no data is available yet.
    fn try_read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Writes as many of `bufs` as fit without blocking, in order.
    fn try_write(&mut self, bufs: &[&[u8]]) -> io::Result<usize>;
}

impl Transport for tokio::net::TcpStream {
    fn try_read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        tokio::net::TcpStream::try_read(self, buf)
    }

    fn try_write(&mut self, bufs: &[&[u8]]) -> io::Result<usize> {
        let iov: Vec<io::IoSlice<'_>> = bufs.iter().map(|b| io::IoSlice::new(b)).collect();
        tokio::net::TcpStream::try_write_vectored(self, &iov)
    }
}
