// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The I/O endpoint and dispatcher: the only layer that touches real
//! sockets. Everything above it (SIS, DTS, ARQ, segmentation, bridge)
//! is driven through plain function calls and stays sans-io.

pub mod dispatcher;
pub mod endpoint;
pub mod transport;

pub use dispatcher::{Dispatcher, Readiness, ReadinessSource};
pub use endpoint::{DecodeOutcome, Endpoint};
pub use transport::Transport;
