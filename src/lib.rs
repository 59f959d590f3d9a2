// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! A pure-Rust STANAG 5066 wire-protocol and ARQ engine: the Subnet
//! Interface Sublayer (Annex A) and Data Transfer Sublayer (Annex C)
//! multiplexed over a single event-driven I/O loop.
//!
//! `crc` and `pdu` are the framing primitives shared by both
//! sublayers. `sis` and `dts` implement their respective wire codecs
//! and session/ARQ state. `segmentation` splits and reassembles C_PDUs
//! across the DTS window. `bridge` routes between the two sublayers.
//! `io` is the only layer that touches a real socket; everything below
//! it is sans-io and drivable from plain function calls.

pub mod bridge;
pub mod cfg;
pub mod crc;
pub mod dts;
pub mod error;
pub mod io;
pub mod pdu;
pub mod segmentation;
pub mod sis;
