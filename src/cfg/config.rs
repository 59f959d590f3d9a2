// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{fs, path::Path};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

/// Top-level engine configuration, grouped the way the spec enumerates
/// its knobs: buffer/IO sizing, ARQ timers, and the two sublayer MTUs.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct EngineConfig {
    /// PDU buffer and I/O staging limits.
    pub buffers: Buffers,
    /// ARQ window, retry, and timer knobs.
    pub arq: Arq,
    /// Subnet Interface Sublayer limits.
    pub sis: Sis,
    /// Data Transfer Sublayer limits.
    pub dts: Dts,
}

/// PDU buffer and I/O staging limits.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Buffers {
    #[serde(rename = "PduBufferBytes", default = "default_pdu_buffer_bytes")]
    /// Fixed capacity of a single PDU buffer, in bytes.
    pub pdu_buffer_bytes: usize,

    #[serde(rename = "IovStagingMax", default = "default_iov_staging_max")]
    /// Maximum scatter-gather entries staged per write, capped at the
    /// platform IOV_MAX.
    pub iov_staging_max: usize,
}

fn default_pdu_buffer_bytes() -> usize {
    2_200
}

fn default_iov_staging_max() -> usize {
    32
}

impl Default for Buffers {
    fn default() -> Self {
        Buffers {
            pdu_buffer_bytes: default_pdu_buffer_bytes(),
            iov_staging_max: default_iov_staging_max(),
        }
    }
}

/// ARQ window, retry, and timer knobs.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Arq {
    #[serde(rename = "ArqWindowMax", default = "default_arq_window_max")]
    /// Maximum outstanding sequence numbers in flight (protocol cap: 127).
    pub arq_window_max: u32,

    #[serde(rename = "ArqRetryMax", default = "default_arq_retry_max")]
    /// Retransmission attempts before a D_PDU forces a RESET.
    pub arq_retry_max: u32,

    #[serde(
        rename = "ArqRetransmitTimeoutMs",
        default = "default_arq_retransmit_timeout_ms"
    )]
    /// Retransmission deadline for an unacknowledged D_PDU, in
    /// milliseconds.
    pub arq_retransmit_timeout_ms: u64,

    #[serde(rename = "ReassemblyTimeoutMs", default = "default_reassembly_timeout_ms")]
    /// Time a partially-received C_PDU is kept before being discarded, in
    /// milliseconds.
    pub reassembly_timeout_ms: u64,
}

fn default_arq_window_max() -> u32 {
    127
}

fn default_arq_retry_max() -> u32 {
    5
}

fn default_arq_retransmit_timeout_ms() -> u64 {
    2_000
}

fn default_reassembly_timeout_ms() -> u64 {
    30_000
}

impl Default for Arq {
    fn default() -> Self {
        Arq {
            arq_window_max: default_arq_window_max(),
            arq_retry_max: default_arq_retry_max(),
            arq_retransmit_timeout_ms: default_arq_retransmit_timeout_ms(),
            reassembly_timeout_ms: default_reassembly_timeout_ms(),
        }
    }
}

/// Subnet Interface Sublayer (Annex A) limits.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Sis {
    #[serde(rename = "SisMaxPduSize", default = "default_sis_max_pdu_size")]
    /// Maximum SIS wire PDU size in bytes (preamble + length + payload).
    pub sis_max_pdu_size: usize,

    #[serde(rename = "SisBroadcastMtu", default = "default_sis_broadcast_mtu")]
    /// Maximum u_pdu size accepted from a subnet client.
    pub sis_broadcast_mtu: usize,
}

fn default_sis_max_pdu_size() -> usize {
    8_192
}

fn default_sis_broadcast_mtu() -> usize {
    4_096
}

impl Default for Sis {
    fn default() -> Self {
        Sis {
            sis_max_pdu_size: default_sis_max_pdu_size(),
            sis_broadcast_mtu: default_sis_broadcast_mtu(),
        }
    }
}

/// Data Transfer Sublayer (Annex C) limits.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Dts {
    #[serde(rename = "DtsMaxPduSize", default = "default_dts_max_pdu_size")]
    /// Maximum DTS wire D_PDU size in bytes.
    pub dts_max_pdu_size: usize,

    #[serde(rename = "DtsSegmentSize", default = "default_dts_segment_size")]
    /// Maximum bytes of C_PDU payload carried by a single D_PDU segment.
    pub dts_segment_size: usize,
}

fn default_dts_max_pdu_size() -> usize {
    4_096
}

fn default_dts_segment_size() -> usize {
    800
}

impl Default for Dts {
    fn default() -> Self {
        Dts {
            dts_max_pdu_size: default_dts_max_pdu_size(),
            dts_segment_size: default_dts_segment_size(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            buffers: Buffers::default(),
            arq: Arq::default(),
            sis: Sis::default(),
            dts: Dts::default(),
        }
    }
}

impl EngineConfig {
    /// Loads the configuration from YAML, validates it, and returns the
    /// ready-to-use value.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = fs::read_to_string(path)?;
        let mut cfg: EngineConfig =
            serde_yaml::from_str(&s).context("failed to parse config YAML")?;
        cfg.validate_and_normalize()?;
        Ok(cfg)
    }

    /// Validates invariants named by the spec's configuration section.
    pub fn validate_and_normalize(&mut self) -> Result<()> {
        ensure!(
            self.buffers.pdu_buffer_bytes >= 6,
            "pdu_buffer_bytes must be large enough to hold the smallest DTS D_PDU"
        );
        ensure!(
            self.buffers.iov_staging_max >= 1 && self.buffers.iov_staging_max <= 32,
            "iov_staging_max must be in [1, 32]"
        );
        ensure!(
            self.arq.arq_window_max >= 1 && self.arq.arq_window_max <= 127,
            "arq_window_max must be in [1, 127]"
        );
        ensure!(self.arq.arq_retry_max >= 1, "arq_retry_max must be >= 1");
        ensure!(
            self.sis.sis_max_pdu_size >= 5 && self.sis.sis_max_pdu_size <= 8_192,
            "sis_max_pdu_size must be in [5, 8192]"
        );
        ensure!(
            self.sis.sis_broadcast_mtu >= 1 && self.sis.sis_broadcast_mtu <= 4_096,
            "sis_broadcast_mtu must be in [1, 4096]"
        );
        ensure!(
            self.dts.dts_max_pdu_size >= 6 && self.dts.dts_max_pdu_size <= 4_096,
            "dts_max_pdu_size must be in [6, 4096]"
        );
        ensure!(
            self.dts.dts_segment_size >= 1 && self.dts.dts_segment_size <= 800,
            "dts_segment_size must be in [1, 800]"
        );
        Ok(())
    }
}
