// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use stanag5066_engine::{
    dts::codec::{self, Body, DType, DataHeader, Frame},
    io::{DecodeOutcome, Endpoint},
};

use crate::scenarios::common::loopback_pair;

/// A `DATA_ONLY` D_PDU written on one endpoint's outbound queue arrives
/// intact on the peer endpoint's `read_ready`, including the case where
/// it shares a transport-layer read with a second, trailing PDU.
#[test]
fn data_pdu_round_trips_between_two_endpoints() {
    let (transport_a, transport_b) = loopback_pair();
    let mut sender = Endpoint::new(1, transport_a);
    let mut receiver = Endpoint::new(2, transport_b);

    let frame = Frame {
        d_type: DType::DataOnly,
        eow: 0,
        eot: 0,
        address: codec::pack_address(&[1], &[2]),
        body: Body::DataOnly(
            DataHeader { first: true, last: true, tx_uwe_marker: true, tx_lwe_marker: true, segment_size: 5, tx_seq: 1 },
            b"hello".to_vec(),
        ),
    };
    let wire = codec::encode(&frame).expect("encode");
    sender.enqueue(vec![wire.clone()], None);
    sender.write_ready(8).expect("write_ready");

    let mut decoded = Vec::new();
    receiver
        .read_ready(|bytes| match codec::decode(bytes) {
            Ok((f, len)) => {
                decoded.push(f);
                DecodeOutcome::Consumed(len)
            },
            Err(_) => DecodeOutcome::NeedMore(bytes.len() + 1),
        })
        .expect("read_ready");

    assert_eq!(decoded.len(), 1);
    assert_eq!(decoded[0], frame);
}

/// Two back-to-back PDUs delivered in a single transport read are both
/// decoded, exercising the PDU buffer's overflow-split discipline.
#[test]
fn two_pdus_in_one_read_are_both_decoded() {
    let (transport_a, transport_b) = loopback_pair();
    let mut sender = Endpoint::new(3, transport_a);
    let mut receiver = Endpoint::new(4, transport_b);

    let frame = |tx_seq: u8| Frame {
        d_type: DType::DataOnly,
        eow: 0,
        eot: 0,
        address: codec::pack_address(&[1], &[2]),
        body: Body::DataOnly(
            DataHeader { first: true, last: true, tx_uwe_marker: false, tx_lwe_marker: false, segment_size: 2, tx_seq },
            vec![tx_seq, tx_seq],
        ),
    };

    let wire1 = codec::encode(&frame(1)).expect("encode1");
    let wire2 = codec::encode(&frame(2)).expect("encode2");
    sender.enqueue(vec![wire1], None);
    sender.enqueue(vec![wire2], None);
    sender.write_ready(8).expect("write_ready");

    let mut decoded = Vec::new();
    receiver
        .read_ready(|bytes| match codec::decode(bytes) {
            Ok((f, len)) => {
                decoded.push(f);
                DecodeOutcome::Consumed(len)
            },
            Err(_) => DecodeOutcome::NeedMore(bytes.len() + 1),
        })
        .expect("read_ready");

    assert_eq!(decoded.len(), 2);
}

/// A `DATA_ONLY` D_PDU staged as its 3 separate iov entries (header,
/// payload, payload CRC) still arrives byte-identical on the peer.
#[test]
fn data_pdu_sent_as_three_iov_parts_round_trips() {
    let (transport_a, transport_b) = loopback_pair();
    let mut sender = Endpoint::new(5, transport_a);
    let mut receiver = Endpoint::new(6, transport_b);

    let frame = Frame {
        d_type: DType::DataOnly,
        eow: 0,
        eot: 0,
        address: codec::pack_address(&[1], &[2]),
        body: Body::DataOnly(
            DataHeader { first: true, last: true, tx_uwe_marker: true, tx_lwe_marker: true, segment_size: 5, tx_seq: 9 },
            b"hello".to_vec(),
        ),
    };
    let parts = codec::encode_parts(&frame).expect("encode_parts");
    assert_eq!(parts.len(), 3, "data_only carries header, payload, and payload crc as separate iov entries");
    sender.enqueue(parts, None);
    sender.write_ready(8).expect("write_ready");

    let mut decoded = Vec::new();
    receiver
        .read_ready(|bytes| match codec::decode(bytes) {
            Ok((f, len)) => {
                decoded.push(f);
                DecodeOutcome::Consumed(len)
            },
            Err(_) => DecodeOutcome::NeedMore(bytes.len() + 1),
        })
        .expect("read_ready");

    assert_eq!(decoded, vec![frame]);
}
