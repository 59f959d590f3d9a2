// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! C_PDU segmentation and reassembly.

pub mod engine;

pub use engine::{OutgoingSegment, ReassemblyRecord, ReassemblyTable, SegmentationError};
