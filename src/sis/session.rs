// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Per-endpoint SAP bind state (Annex A session lifecycle).

use std::collections::HashMap;

use tracing::warn;

use crate::error::{EndpointId, EngineError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SisSession {
    pub sap: u8,
    pub rank: u8,
    pub service_type: u16,
    pub mtu: u16,
}

/// Bound SAPs for one SIS endpoint. At most one session per SAP id, per
/// the session invariant.
#[derive(Debug, Default)]
pub struct SisSessionTable {
    sessions: HashMap<u8, SisSession>,
}

impl SisSessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(
        &mut self,
        endpoint: EndpointId,
        sap: u8,
        rank: u8,
        service_type: u16,
        mtu: u16,
    ) -> Result<(), EngineError> {
        if sap > 15 {
            warn!(endpoint, protocol = "sis", sap, "bind rejected: sap id out of range");
            return Err(EngineError::SisPolicy { endpoint, reason: format!("sap id {sap} out of range") });
        }
        if self.sessions.contains_key(&sap) {
            warn!(endpoint, protocol = "sis", sap, "bind rejected: sap already bound");
            return Err(EngineError::SisPolicy { endpoint, reason: format!("sap {sap} already bound") });
        }
        self.sessions.insert(sap, SisSession { sap, rank, service_type, mtu });
        Ok(())
    }

    pub fn unbind(&mut self, sap: u8) -> Option<SisSession> {
        self.sessions.remove(&sap)
    }

    pub fn get(&self, sap: u8) -> Option<&SisSession> {
        self.sessions.get(&sap)
    }

    pub fn is_bound(&self, sap: u8) -> bool {
        self.sessions.contains_key(&sap)
    }

    /// Drains all sessions, for endpoint-close handling: the caller emits
    /// an `UNBIND_INDICATION` for each one returned.
    pub fn close_all(&mut self) -> Vec<SisSession> {
        self.sessions.drain().map(|(_, s)| s).collect()
    }
}
