// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::time::{Duration, Instant};

use stanag5066_engine::dts::{
    arq::ArqWindow,
    codec::{self, AckHeader, Body, DType, DataHeader, Frame},
};

/// Two D_PDUs go out; the peer selectively ACKs only the second,
/// leaving the first due for retransmission until it too is ACKed.
#[test]
fn selective_ack_releases_only_the_acknowledged_segment() {
    let mut tx = ArqWindow::new(127, 3, Duration::from_millis(50));
    let now = Instant::now();

    let frame1 = sample_frame(1, b"first".to_vec());
    let frame2 = sample_frame(2, b"second".to_vec());
    let wire1 = codec::encode(&frame1).expect("encode frame1");
    let wire2 = codec::encode(&frame2).expect("encode frame2");

    let seq1 = tx.allocate_tx_seq(wire1, now).expect("allocate seq1");
    let seq2 = tx.allocate_tx_seq(wire2, now).expect("allocate seq2");
    assert_eq!((seq1, seq2), (1, 2));

    // Peer only saw seq 2: bitmap bit(i) acks seq = peer_lwe + i, and
    // peer_lwe is 0 here, so seq 2 needs bit 2 set, bit 1 clear.
    let ack_frame = Frame {
        d_type: DType::AckOnly,
        eow: 16,
        eot: 0,
        address: codec::pack_address(&[9], &[1]),
        body: Body::AckOnly(AckHeader { rx_lwe: 0, bitmap: vec![0b0000_0100, 0x00] }),
    };
    let wire = codec::encode(&ack_frame).expect("encode ACK_ONLY");
    let (decoded, _) = codec::decode(&wire).expect("decode ACK_ONLY");
    let ack_hdr = match decoded.body {
        Body::AckOnly(hdr) => hdr,
        other => panic!("unexpected body: {other:?}"),
    };

    tx.on_ack_received(ack_hdr.rx_lwe, &ack_hdr.bitmap);
    assert_eq!(tx.tx_lwe(), 0, "seq 1 still unacked blocks the window from advancing");

    let due = tx.due_for_retransmit(now + Duration::from_millis(50), 11).expect("seq1 is due");
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].0, 1);

    // Peer now also ACKs seq 1: bits 1 and 2 both set.
    let ack_hdr2 = AckHeader { rx_lwe: 0, bitmap: vec![0b0000_0110, 0x00] };
    tx.on_ack_received(ack_hdr2.rx_lwe, &ack_hdr2.bitmap);
    assert_eq!(tx.tx_lwe(), 2);
}

fn sample_frame(tx_seq: u8, payload: Vec<u8>) -> Frame {
    Frame {
        d_type: DType::DataOnly,
        eow: 0,
        eot: 0,
        address: codec::pack_address(&[1], &[9]),
        body: Body::DataOnly(
            DataHeader {
                first: tx_seq == 1,
                last: false,
                tx_uwe_marker: false,
                tx_lwe_marker: false,
                segment_size: payload.len() as u16,
                tx_seq,
            },
            payload,
        ),
    }
}
