// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use stanag5066_engine::sis::{self, SisPdu, SisSessionTable};

#[test]
fn bind_request_then_unbind_clears_session_table() {
    let wire = sis::codec::encode_bind_request(4, 1, 0x0010).expect("encode BIND_REQUEST");
    let (pdu, consumed) = sis::codec::decode(&wire, 4_096).expect("decode BIND_REQUEST");
    assert_eq!(consumed, wire.len());

    let (sap, rank, service_type) = match pdu {
        SisPdu::BindRequest { sap, rank, service_type } => (sap, rank, service_type),
        other => panic!("unexpected pdu: {other:?}"),
    };

    let mut sessions = SisSessionTable::new();
    sessions.bind(1, sap, rank, service_type, 4_096).expect("bind");
    assert!(sessions.is_bound(sap));

    let accepted = sis::codec::encode_bind_accepted(sap, 4_096).expect("encode BIND_ACCEPTED");
    let (accepted_pdu, _) = sis::codec::decode(&accepted, 4_096).expect("decode BIND_ACCEPTED");
    assert_eq!(accepted_pdu, SisPdu::BindAccepted { sap, mtu: 4_096 });

    sessions.unbind(sap);
    assert!(!sessions.is_bound(sap));
}

#[test]
fn duplicate_bind_is_rejected_by_session_policy() {
    let mut sessions = SisSessionTable::new();
    sessions.bind(1, 2, 0, 0x0001, 4_096).expect("first bind");
    let err = sessions.bind(1, 2, 1, 0x0002, 4_096).expect_err("duplicate must fail");
    assert!(format!("{err}").contains("already bound"));
}
