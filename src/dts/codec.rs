// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Annex C (DTS) D_PDU framing: preamble, address, per-type headers, CRC.
//!
//! Wire layout: `[0x90][0xEB][d_type:4|eow_hi:4][eow_lo][eot][addr_size:3|hdr_len:5]
//! [address][type header][header CRC-32][payload][payload CRC]`. The
//! payload CRC is CRC-16 for the plain types and CRC-32 for the
//! extended (`E*`) and `WARNING` types.
//!
//! `EOW` doubles as the selective-ACK bitmap span: for `ACK_ONLY`/
//! `DATA_ACK`/`EACK_ONLY` frames the bitmap is `ceil(eow / 8)` bytes,
//! so the header is self-describing without a redundant length field.

use thiserror::Error;

use crate::crc::{crc16, crc32};

pub const PREAMBLE: [u8; 2] = [0x90, 0xEB];
pub const MIN_PDU_LEN: usize = 6;
pub const MAX_PDU_LEN: usize = 4_096;
pub const MAX_SEGMENT_SIZE: usize = 800;
pub const MAX_CPDU_SIZE: usize = 4_096;
pub const MAX_CPDU_ID: u16 = 4_095;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DtsCodecError {
    #[error("bad preamble: {0:02x?}")]
    BadPreamble([u8; 2]),
    #[error("reserved d_type {0}")]
    ReservedDType(u8),
    #[error("pdu shorter than minimum 6 bytes")]
    Truncated,
    #[error("pdu exceeds max length 4096")]
    TooLarge,
    #[error("malformed {0}: header too short")]
    HeaderTooShort(&'static str),
    #[error("header crc mismatch")]
    HeaderCrcMismatch,
    #[error("payload crc mismatch")]
    PayloadCrcMismatch,
    #[error("segment size {0} out of range")]
    BadSegmentSize(usize),
    #[error("c_pdu id {0} exceeds max 4095")]
    BadCpduId(u16),
    #[error("segment offset {offset} + size {size} exceeds c_pdu size {c_pdu_size}")]
    SegmentOutOfRange { offset: u16, size: u16, c_pdu_size: u16 },
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DType {
    DataOnly = 0,
    AckOnly = 1,
    DataAck = 2,
    Reset = 3,
    EDataOnly = 4,
    EAckOnly = 5,
    Mgmt = 6,
    NonArq = 7,
    ENonArq = 8,
    Warning = 15,
}

impl DType {
    pub fn from_nibble(n: u8) -> Result<Self, DtsCodecError> {
        Ok(match n {
            0 => Self::DataOnly,
            1 => Self::AckOnly,
            2 => Self::DataAck,
            3 => Self::Reset,
            4 => Self::EDataOnly,
            5 => Self::EAckOnly,
            6 => Self::Mgmt,
            7 => Self::NonArq,
            8 => Self::ENonArq,
            15 => Self::Warning,
            other => return Err(DtsCodecError::ReservedDType(other)),
        })
    }

    pub fn to_nibble(self) -> u8 {
        self as u8
    }

    fn wide_payload_crc(self) -> bool {
        matches!(self, Self::EDataOnly | Self::EAckOnly | Self::ENonArq | Self::Warning)
    }
}

/// Packs matching-length nibble arrays into bytes, source in the high
/// nibble and destination in the low nibble.
pub fn pack_address(source: &[u8], destination: &[u8]) -> Vec<u8> {
    source.iter().zip(destination).map(|(s, d)| ((s & 0x0F) << 4) | (d & 0x0F)).collect()
}

/// Inverse of [`pack_address`]: returns `(source, destination)` nibbles.
pub fn unpack_address(bytes: &[u8]) -> (Vec<u8>, Vec<u8>) {
    (bytes.iter().map(|b| b >> 4).collect(), bytes.iter().map(|b| b & 0x0F).collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataHeader {
    pub first: bool,
    pub last: bool,
    pub tx_uwe_marker: bool,
    pub tx_lwe_marker: bool,
    pub segment_size: u16,
    pub tx_seq: u8,
}

impl DataHeader {
    const LEN: usize = 3;

    fn encode(&self, out: &mut Vec<u8>) -> Result<(), DtsCodecError> {
        if self.segment_size == 0 || self.segment_size as usize > MAX_SEGMENT_SIZE {
            return Err(DtsCodecError::BadSegmentSize(self.segment_size as usize));
        }
        let mut flags = ((self.segment_size >> 8) & 0x03) as u8;
        if self.first {
            flags |= 0x80;
        }
        if self.last {
            flags |= 0x40;
        }
        if self.tx_uwe_marker {
            flags |= 0x20;
        }
        if self.tx_lwe_marker {
            flags |= 0x10;
        }
        out.push(flags);
        out.push((self.segment_size & 0xFF) as u8);
        out.push(self.tx_seq);
        Ok(())
    }

    fn decode(buf: &[u8]) -> Result<(Self, &[u8]), DtsCodecError> {
        if buf.len() < Self::LEN {
            return Err(DtsCodecError::HeaderTooShort("DATA_ONLY"));
        }
        let flags = buf[0];
        let segment_size = (((flags & 0x03) as u16) << 8) | buf[1] as u16;
        let hdr = DataHeader {
            first: flags & 0x80 != 0,
            last: flags & 0x40 != 0,
            tx_uwe_marker: flags & 0x20 != 0,
            tx_lwe_marker: flags & 0x10 != 0,
            segment_size,
            tx_seq: buf[2],
        };
        Ok((hdr, &buf[Self::LEN..]))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AckHeader {
    pub rx_lwe: u8,
    pub bitmap: Vec<u8>,
}

impl AckHeader {
    fn encode(&self, out: &mut Vec<u8>) {
        out.push(self.rx_lwe);
        out.extend_from_slice(&self.bitmap);
    }

    fn decode(buf: &[u8], bitmap_len: usize) -> Result<(Self, &[u8]), DtsCodecError> {
        if buf.len() < 1 + bitmap_len {
            return Err(DtsCodecError::HeaderTooShort("ACK_ONLY"));
        }
        let rx_lwe = buf[0];
        let bitmap = buf[1..1 + bitmap_len].to_vec();
        Ok((AckHeader { rx_lwe, bitmap }, &buf[1 + bitmap_len..]))
    }
}

/// Non-ARQ segment header. The 12-bit `c_pdu_id`'s top 4 bits ride in
/// the flags byte's otherwise-unused middle bits (no `tx_uwe`/`tx_lwe`
/// markers are needed outside ARQ), which is how this header fits in
/// exactly 9 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NonArqHeader {
    pub first: bool,
    pub last: bool,
    pub segment_size: u16,
    pub c_pdu_id: u16,
    pub c_pdu_size: u16,
    pub offset: u16,
    pub rx_window_hint: u16,
}

impl NonArqHeader {
    const LEN: usize = 9;

    fn encode(&self, out: &mut Vec<u8>) -> Result<(), DtsCodecError> {
        if self.segment_size == 0 || self.segment_size as usize > MAX_SEGMENT_SIZE {
            return Err(DtsCodecError::BadSegmentSize(self.segment_size as usize));
        }
        if self.c_pdu_id > MAX_CPDU_ID {
            return Err(DtsCodecError::BadCpduId(self.c_pdu_id));
        }
        if self.offset + self.segment_size > self.c_pdu_size || self.c_pdu_size as usize > MAX_CPDU_SIZE {
            return Err(DtsCodecError::SegmentOutOfRange {
                offset: self.offset,
                size: self.segment_size,
                c_pdu_size: self.c_pdu_size,
            });
        }
        let seg_hi = ((self.segment_size >> 8) & 0x03) as u8;
        let cpdu_hi4 = ((self.c_pdu_id >> 8) & 0x0F) as u8;
        let mut flags = seg_hi | (cpdu_hi4 << 2);
        if self.first {
            flags |= 0x80;
        }
        if self.last {
            flags |= 0x40;
        }
        out.push(flags);
        out.push((self.segment_size & 0xFF) as u8);
        out.push((self.c_pdu_id & 0xFF) as u8);
        out.extend_from_slice(&self.c_pdu_size.to_be_bytes());
        out.extend_from_slice(&self.offset.to_be_bytes());
        out.extend_from_slice(&self.rx_window_hint.to_be_bytes());
        Ok(())
    }

    fn decode(buf: &[u8]) -> Result<(Self, &[u8]), DtsCodecError> {
        if buf.len() < Self::LEN {
            return Err(DtsCodecError::HeaderTooShort("NONARQ"));
        }
        let flags = buf[0];
        let segment_size = (((flags & 0x03) as u16) << 8) | buf[1] as u16;
        let cpdu_hi4 = ((flags >> 2) & 0x0F) as u16;
        let c_pdu_id = (cpdu_hi4 << 8) | buf[2] as u16;
        let c_pdu_size = u16::from_be_bytes([buf[3], buf[4]]);
        let offset = u16::from_be_bytes([buf[5], buf[6]]);
        let rx_window_hint = u16::from_be_bytes([buf[7], buf[8]]);
        let hdr = NonArqHeader {
            first: flags & 0x80 != 0,
            last: flags & 0x40 != 0,
            segment_size,
            c_pdu_id,
            c_pdu_size,
            offset,
            rx_window_hint,
        };
        if hdr.offset + hdr.segment_size > hdr.c_pdu_size || hdr.c_pdu_size as usize > MAX_CPDU_SIZE {
            return Err(DtsCodecError::SegmentOutOfRange {
                offset: hdr.offset,
                size: hdr.segment_size,
                c_pdu_size: hdr.c_pdu_size,
            });
        }
        Ok((hdr, &buf[Self::LEN..]))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    DataOnly(DataHeader, Vec<u8>),
    AckOnly(AckHeader),
    DataAck(DataHeader, AckHeader, Vec<u8>),
    NonArq(NonArqHeader, Vec<u8>),
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub d_type: DType,
    pub eow: u16,
    pub eot: u8,
    pub address: Vec<u8>,
    pub body: Body,
}

pub fn decode(buf: &[u8]) -> Result<(Frame, usize), DtsCodecError> {
    if buf.len() < MIN_PDU_LEN {
        return Err(DtsCodecError::Truncated);
    }
    if buf[0..2] != PREAMBLE {
        return Err(DtsCodecError::BadPreamble([buf[0], buf[1]]));
    }
    let d_type = DType::from_nibble(buf[2] >> 4)?;
    let eow = (((buf[2] & 0x0F) as u16) << 8) | buf[3] as u16;
    let eot = buf[4] & 0x7F;
    let address_size = (buf[5] >> 5) as usize;
    let mut offset = 6;
    if buf.len() < offset + address_size {
        return Err(DtsCodecError::Truncated);
    }
    let address = buf[offset..offset + address_size].to_vec();
    offset += address_size;

    let (body, total) = match d_type {
        DType::DataOnly | DType::EDataOnly => {
            let (hdr, rest) = DataHeader::decode(&buf[offset..])?;
            let header_end = buf.len() - rest.len();
            verify_header_crc(buf, header_end)?;
            let after_crc = header_end + 4;
            let payload_end = checked_add(after_crc, hdr.segment_size as usize, buf)?;
            let payload = buf[after_crc..payload_end].to_vec();
            let total = verify_payload_crc(buf, after_crc, payload_end, d_type.wide_payload_crc())?;
            (Body::DataOnly(hdr, payload), total)
        },
        DType::AckOnly | DType::EAckOnly => {
            let bitmap_len = (eow as usize).div_ceil(8);
            let (hdr, rest) = AckHeader::decode(&buf[offset..], bitmap_len)?;
            let header_end = buf.len() - rest.len();
            verify_header_crc(buf, header_end)?;
            let after_crc = header_end + 4;
            let total = verify_payload_crc(buf, after_crc, after_crc, d_type.wide_payload_crc())?;
            (Body::AckOnly(hdr), total)
        },
        DType::DataAck => {
            let (data_hdr, rest) = DataHeader::decode(&buf[offset..])?;
            let bitmap_len = (eow as usize).div_ceil(8);
            let (ack_hdr, rest2) = AckHeader::decode(rest, bitmap_len)?;
            let header_end = buf.len() - rest2.len();
            verify_header_crc(buf, header_end)?;
            let after_crc = header_end + 4;
            let payload_end = checked_add(after_crc, data_hdr.segment_size as usize, buf)?;
            let payload = buf[after_crc..payload_end].to_vec();
            let total = verify_payload_crc(buf, after_crc, payload_end, d_type.wide_payload_crc())?;
            (Body::DataAck(data_hdr, ack_hdr, payload), total)
        },
        DType::NonArq | DType::ENonArq => {
            let (hdr, rest) = NonArqHeader::decode(&buf[offset..])?;
            let header_end = buf.len() - rest.len();
            verify_header_crc(buf, header_end)?;
            let after_crc = header_end + 4;
            let payload_end = checked_add(after_crc, hdr.segment_size as usize, buf)?;
            let payload = buf[after_crc..payload_end].to_vec();
            let total = verify_payload_crc(buf, after_crc, payload_end, d_type.wide_payload_crc())?;
            (Body::NonArq(hdr, payload), total)
        },
        DType::Reset | DType::Mgmt | DType::Warning => {
            verify_header_crc(buf, offset)?;
            let after_crc = offset + 4;
            let total = verify_payload_crc(buf, after_crc, after_crc, d_type.wide_payload_crc())?;
            (Body::Other, total)
        },
    };

    if total > MAX_PDU_LEN {
        return Err(DtsCodecError::TooLarge);
    }

    Ok((Frame { d_type, eow, eot, address, body }, total))
}

fn checked_add(start: usize, len: usize, buf: &[u8]) -> Result<usize, DtsCodecError> {
    let end = start + len;
    if buf.len() < end {
        return Err(DtsCodecError::Truncated);
    }
    Ok(end)
}

fn verify_header_crc(buf: &[u8], header_end: usize) -> Result<(), DtsCodecError> {
    if buf.len() < header_end + 4 {
        return Err(DtsCodecError::Truncated);
    }
    let computed = crc32(&buf[..header_end]);
    let on_wire = u32::from_be_bytes([
        buf[header_end],
        buf[header_end + 1],
        buf[header_end + 2],
        buf[header_end + 3],
    ]);
    if computed != on_wire {
        return Err(DtsCodecError::HeaderCrcMismatch);
    }
    Ok(())
}

fn verify_payload_crc(
    buf: &[u8],
    payload_start: usize,
    payload_end: usize,
    wide: bool,
) -> Result<usize, DtsCodecError> {
    let crc_len = if wide { 4 } else { 2 };
    if buf.len() < payload_end + crc_len {
        return Err(DtsCodecError::Truncated);
    }
    if wide {
        let computed = crc32(&buf[payload_start..payload_end]);
        let on_wire = u32::from_be_bytes([
            buf[payload_end],
            buf[payload_end + 1],
            buf[payload_end + 2],
            buf[payload_end + 3],
        ]);
        if computed != on_wire {
            return Err(DtsCodecError::PayloadCrcMismatch);
        }
    } else {
        let computed = crc16(&buf[payload_start..payload_end]);
        let on_wire = u16::from_be_bytes([buf[payload_end], buf[payload_end + 1]]);
        if computed != on_wire {
            return Err(DtsCodecError::PayloadCrcMismatch);
        }
    }
    Ok(payload_end + crc_len)
}

/// Encodes a frame as the up-to-3 scatter-gather parts a transport
/// write stages separately: the header (through its trailing CRC-32),
/// the payload, and the payload's own CRC. Frames with no payload
/// (`ACK_ONLY`, `RESET`, ...) collapse to 2 parts.
pub fn encode_parts(frame: &Frame) -> Result<Vec<Vec<u8>>, DtsCodecError> {
    let mut header = Vec::new();
    header.extend_from_slice(&PREAMBLE);
    let eow = frame.eow & 0x0FFF;
    header.push((frame.d_type.to_nibble() << 4) | ((eow >> 8) as u8));
    header.push((eow & 0xFF) as u8);
    header.push(frame.eot & 0x7F);
    let address_size = frame.address.len().min(7);
    header.push((address_size as u8) << 5);
    header.extend_from_slice(&frame.address[..address_size]);

    let payload: &[u8] = match &frame.body {
        Body::DataOnly(hdr, payload) => {
            hdr.encode(&mut header)?;
            payload
        },
        Body::AckOnly(hdr) => {
            hdr.encode(&mut header);
            &[]
        },
        Body::DataAck(data_hdr, ack_hdr, payload) => {
            data_hdr.encode(&mut header)?;
            ack_hdr.encode(&mut header);
            payload
        },
        Body::NonArq(hdr, payload) => {
            hdr.encode(&mut header)?;
            payload
        },
        Body::Other => &[],
    };
    append_header_crc(&mut header);

    let payload_crc = if frame.d_type.wide_payload_crc() {
        crc32(payload).to_be_bytes().to_vec()
    } else {
        crc16(payload).to_be_bytes().to_vec()
    };

    let total = header.len() + payload.len() + payload_crc.len();
    if total > MAX_PDU_LEN {
        return Err(DtsCodecError::TooLarge);
    }

    if payload.is_empty() {
        Ok(vec![header, payload_crc])
    } else {
        Ok(vec![header, payload.to_vec(), payload_crc])
    }
}

pub fn encode(frame: &Frame) -> Result<Vec<u8>, DtsCodecError> {
    let parts = encode_parts(frame)?;
    let mut out = Vec::with_capacity(parts.iter().map(Vec::len).sum());
    for part in parts {
        out.extend_from_slice(&part);
    }
    Ok(out)
}

fn append_header_crc(out: &mut Vec<u8>) {
    let crc = crc32(out);
    out.extend_from_slice(&crc.to_be_bytes());
}
