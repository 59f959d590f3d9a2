// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::time::Instant;

use stanag5066_engine::{
    bridge::Bridge,
    dts::codec::{self, Body, DType, DataHeader, Frame},
    segmentation::{self, ReassemblyTable},
    sis::{self, SisPdu, UnidataHeader},
};

/// A SIS `UNIDATA_REQUEST` larger than one DTS segment is split across
/// several `DATA_ONLY` D_PDUs, routed by the bridge to a DTS channel,
/// and reassembled into a `UNIDATA_INDICATION` on the far side.
#[test]
fn large_unidata_request_segments_and_reassembles() {
    let header = UnidataHeader { dest_node: 9, orig_node: 1, dest_sap: 3, orig_sap: 5, service_type: 1, priority: 0, rank: 0 };
    let payload: Vec<u8> = (0..1_700u32).map(|b| (b % 256) as u8).collect();
    let wire = sis::codec::encode_unidata_request(&header, &payload).expect("encode UNIDATA_REQUEST");
    let (pdu, _) = sis::codec::decode(&wire, 4_096).expect("decode UNIDATA_REQUEST");
    let (decoded_header, c_pdu) = match pdu {
        SisPdu::UnidataRequest(h, data) => (h, data),
        other => panic!("unexpected pdu: {other:?}"),
    };
    assert_eq!(decoded_header, header);

    let mut bridge = Bridge::new();
    bridge.bind_route(decoded_header.dest_node, decoded_header.dest_sap, 42);
    bridge.bind_sap(decoded_header.dest_sap, 7);
    let channel = bridge.resolve(decoded_header.dest_node, decoded_header.dest_sap).expect("route bound");
    assert_eq!(channel, 42);

    let segments = segmentation::engine::split(&c_pdu, 800).expect("split into DTS segments");
    assert_eq!(segments.len(), 3);

    let c_pdu_id = 1u16;
    let mut reassembled = None;
    let mut table = ReassemblyTable::new();
    let now = Instant::now();
    for (tx_seq, segment) in segments.iter().enumerate() {
        let frame = Frame {
            d_type: DType::DataOnly,
            eow: 0,
            eot: 0,
            address: codec::pack_address(&[decoded_header.orig_node], &[decoded_header.dest_node]),
            body: Body::DataOnly(
                DataHeader {
                    first: segment.first,
                    last: segment.last,
                    tx_uwe_marker: segment.last,
                    tx_lwe_marker: segment.first,
                    segment_size: segment.payload.len() as u16,
                    tx_seq: tx_seq as u8,
                },
                segment.payload.clone(),
            ),
        };
        let on_wire = codec::encode(&frame).expect("encode DATA_ONLY");
        let (received, _) = codec::decode(&on_wire).expect("decode DATA_ONLY");
        let (data_hdr, payload) = match received.body {
            Body::DataOnly(hdr, payload) => (hdr, payload),
            other => panic!("unexpected body: {other:?}"),
        };
        let remote = received.address;
        let done = table
            .on_segment(remote, c_pdu_id, c_pdu.len(), segment.offset, &payload, now)
            .expect("reassembly accepts in-range segment");
        if data_hdr.last {
            reassembled = done;
        }
    }

    let reassembled = reassembled.expect("c_pdu completes on the last segment");
    assert_eq!(reassembled, c_pdu);

    let target = bridge.delivery_target(decoded_header.dest_sap).expect("sap bound");
    assert_eq!(target, 7);

    let indication = sis::codec::encode_unidata_indication(&decoded_header, &reassembled).expect("encode indication");
    let (indication_pdu, _) = sis::codec::decode(&indication, 4_096).expect("decode indication");
    match indication_pdu {
        SisPdu::UnidataIndication(h, data) => {
            assert_eq!(h, decoded_header);
            assert_eq!(data, c_pdu);
        },
        other => panic!("unexpected pdu: {other:?}"),
    }
}
