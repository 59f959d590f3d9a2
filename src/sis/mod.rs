// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Subnet Interface Sublayer (STANAG 5066 Annex A): framing and session
//! state for locally-bound SAPs.

pub mod codec;
pub mod session;

pub use codec::{SisCodecError, SisPdu, UnidataHeader};
pub use session::{SisSession, SisSessionTable};
