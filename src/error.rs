// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Crate-wide error taxonomy.
//!
//! The engine classifies failures the way Annex A/C implementations
//! have to: by what the failure requires of the caller, not by where
//! it was raised. `EngineError` carries exactly that classification so
//! the dispatcher, bridge, and ARQ state machine can each act on a
//! failure without re-deriving its severity from a generic error type.

use thiserror::Error;

/// Identifies the endpoint a fallible operation was performed against,
/// for inclusion in log records and error contexts.
pub type EndpointId = u64;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed PDU that cannot be recovered from: the endpoint must be
    /// torn down. Carries a short diagnostic plus the endpoint it applies
    /// to.
    #[error("framing fatal on endpoint {endpoint}: {reason}")]
    FramingFatal { endpoint: EndpointId, reason: String },

    /// A single PDU failed a local check (usually CRC) but the endpoint
    /// stays up; the PDU is simply dropped.
    #[error("framing recoverable on endpoint {endpoint}: {reason}")]
    FramingRecoverable { endpoint: EndpointId, reason: String },

    /// An ARQ connection exhausted its retransmission budget for one
    /// D_PDU.
    #[error("ARQ retry budget exhausted for seq {seq} on connection {connection}")]
    ArqExhausted { connection: EndpointId, seq: u32 },

    /// An SIS request violates session policy (duplicate bind, unknown
    /// SAP, oversized u_pdu); the endpoint is not closed, the client gets
    /// a rejection primitive.
    #[error("SIS policy violation on endpoint {endpoint}: {reason}")]
    SisPolicy { endpoint: EndpointId, reason: String },

    /// Interrupted syscall or "would block"; retried without state
    /// change. Callers should not log this as a failure.
    #[error("transport transient on endpoint {endpoint}: {reason}")]
    TransportTransient { endpoint: EndpointId, reason: String },

    /// Any other I/O error, or peer close; the endpoint must be torn
    /// down.
    #[error("transport fatal on endpoint {endpoint}: {reason}")]
    TransportFatal { endpoint: EndpointId, reason: String },
}

impl EngineError {
    /// True for variants that require tearing down the endpoint/channel
    /// they were raised against.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EngineError::FramingFatal { .. } | EngineError::TransportFatal { .. }
        )
    }

    pub fn endpoint(&self) -> EndpointId {
        match self {
            EngineError::FramingFatal { endpoint, .. }
            | EngineError::FramingRecoverable { endpoint, .. }
            | EngineError::SisPolicy { endpoint, .. }
            | EngineError::TransportTransient { endpoint, .. }
            | EngineError::TransportFatal { endpoint, .. } => *endpoint,
            EngineError::ArqExhausted { connection, .. } => *connection,
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
