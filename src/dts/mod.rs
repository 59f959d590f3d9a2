// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Data Transfer Sublayer (STANAG 5066 Annex C): D_PDU framing and the
//! ARQ sliding-window state machine.

pub mod arq;
pub mod codec;

pub use arq::{ArqError, ArqState, ArqWindow, ReceiveOutcome};
pub use codec::{AckHeader, Body, DType, DataHeader, DtsCodecError, Frame, NonArqHeader};
