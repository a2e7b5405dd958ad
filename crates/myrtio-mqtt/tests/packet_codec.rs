//! Wire format tests for the MQTT v3.1.1 packet codec.

use myrtio_mqtt::packet::{Connect, ConnectReturnCode, Incoming, Outgoing, Publish, QoS, Subscribe};
use myrtio_mqtt::util::{decode_remaining_length, encode_remaining_length, next_packet_id};
use myrtio_mqtt::PacketError;

fn encode(packet: &Outgoing<'_>) -> Vec<u8> {
    let mut buf = [0u8; 256];
    let len = packet.encode(&mut buf).unwrap();
    buf[..len].to_vec()
}

// -----------------------------------------------------------------------------
// Remaining length
// -----------------------------------------------------------------------------

#[test]
fn remaining_length_boundaries() {
    let cases: [(usize, &[u8]); 5] = [
        (0, &[0x00]),
        (127, &[0x7F]),
        (128, &[0x80, 0x01]),
        (16_383, &[0xFF, 0x7F]),
        (2_097_152, &[0x80, 0x80, 0x80, 0x01]),
    ];
    for (value, expected) in cases {
        let mut out = [0u8; 4];
        let size = encode_remaining_length(value, &mut out).unwrap();
        assert_eq!(&out[..size], expected, "encoding {value}");
        assert_eq!(
            decode_remaining_length(expected).unwrap(),
            Some((value, expected.len()))
        );
    }
}

#[test]
fn remaining_length_incomplete_and_overlong() {
    assert_eq!(decode_remaining_length(&[]).unwrap(), None);
    assert_eq!(decode_remaining_length(&[0x80]).unwrap(), None);
    assert_eq!(
        decode_remaining_length(&[0x80, 0x80, 0x80, 0x80, 0x01]),
        Err(PacketError::Malformed)
    );

    let mut out = [0u8; 4];
    assert_eq!(
        encode_remaining_length(268_435_456, &mut out),
        Err(PacketError::PayloadTooLarge)
    );
}

#[test]
fn packet_ids_skip_zero() {
    assert_eq!(next_packet_id(0), 1);
    assert_eq!(next_packet_id(41), 42);
    assert_eq!(next_packet_id(u16::MAX), 1);
}

// -----------------------------------------------------------------------------
// Outgoing packets
// -----------------------------------------------------------------------------

#[test]
fn connect_carries_credentials_and_keep_alive() {
    let bytes = encode(&Outgoing::Connect(Connect {
        client_id: "dev",
        username: Some("u"),
        password: Some(b"p"),
        keep_alive_secs: 60,
        clean_session: true,
    }));

    assert_eq!(
        bytes,
        [
            0x10, 21, // fixed header
            0, 4, b'M', b'Q', b'T', b'T', 4, 0xC2, 0, 60, // variable header
            0, 3, b'd', b'e', b'v', 0, 1, b'u', 0, 1, b'p',
        ]
    );
}

#[test]
fn connect_without_credentials_sets_only_clean_session() {
    let bytes = encode(&Outgoing::Connect(Connect {
        client_id: "x",
        username: None,
        password: None,
        keep_alive_secs: 15,
        clean_session: true,
    }));

    assert_eq!(bytes[9], 0x02);
    assert_eq!(bytes.len(), 2 + 10 + 3);
}

#[test]
fn publish_qos1_includes_packet_id() {
    let bytes = encode(&Outgoing::Publish(Publish {
        topic: "a/b",
        payload: b"hi",
        qos: QoS::AtLeastOnce,
        packet_id: Some(7),
        retain: false,
        dup: false,
    }));

    assert_eq!(bytes, [0x32, 9, 0, 3, b'a', b'/', b'b', 0, 7, b'h', b'i']);
}

#[test]
fn publish_qos1_without_packet_id_is_rejected() {
    let mut buf = [0u8; 32];
    let result = Outgoing::Publish(Publish {
        topic: "a",
        payload: b"",
        qos: QoS::AtLeastOnce,
        packet_id: None,
        retain: false,
        dup: false,
    })
    .encode(&mut buf);

    assert_eq!(result, Err(PacketError::MissingPacketId));
}

#[test]
fn subscribe_single_filter() {
    let bytes = encode(&Outgoing::Subscribe(Subscribe {
        packet_id: 1,
        filter: "a/#",
        qos: QoS::AtLeastOnce,
    }));

    assert_eq!(bytes, [0x82, 8, 0, 1, 0, 3, b'a', b'/', b'#', 1]);
}

#[test]
fn small_buffer_is_reported() {
    let mut buf = [0u8; 4];
    let result = Outgoing::Publish(Publish {
        topic: "devices/dev/messages/events/",
        payload: b"{}",
        qos: QoS::AtMostOnce,
        packet_id: None,
        retain: false,
        dup: false,
    })
    .encode(&mut buf);

    assert_eq!(result, Err(PacketError::BufferTooSmall));
}

// -----------------------------------------------------------------------------
// Incoming packets
// -----------------------------------------------------------------------------

#[test]
fn connack_return_codes() {
    let (packet, len) = Incoming::decode(&[0x20, 2, 0, 5]).unwrap().unwrap();
    assert_eq!(len, 4);
    assert_eq!(
        packet,
        Incoming::ConnAck {
            session_present: false,
            code: ConnectReturnCode::NotAuthorized,
        }
    );
    assert!(ConnectReturnCode::NotAuthorized.is_auth_failure());
    assert!(ConnectReturnCode::BadUsernameOrPassword.is_auth_failure());
    assert!(!ConnectReturnCode::ServerUnavailable.is_auth_failure());
}

#[test]
fn partial_packet_needs_more_bytes() {
    assert_eq!(Incoming::decode(&[0x20, 2, 0]).unwrap(), None);
    assert_eq!(Incoming::decode(&[]).unwrap(), None);
}

#[test]
fn inbound_publish_borrows_topic_and_payload() {
    let bytes = [0x32, 9, 0, 3, b'a', b'/', b'b', 0, 7, b'h', b'i', 0xD0, 0];
    let (packet, len) = Incoming::decode(&bytes).unwrap().unwrap();

    assert_eq!(len, 11);
    let Incoming::Publish(publish) = packet else {
        panic!("expected publish, got {packet:?}");
    };
    assert_eq!(publish.topic, "a/b");
    assert_eq!(publish.payload, b"hi");
    assert_eq!(publish.packet_id, Some(7));

    let (next, _) = Incoming::decode(&bytes[len..]).unwrap().unwrap();
    assert_eq!(next, Incoming::PingResp);
}

#[test]
fn suback_failure_code_means_rejected() {
    let (packet, _) = Incoming::decode(&[0x90, 3, 0, 1, 0x80]).unwrap().unwrap();
    assert_eq!(
        packet,
        Incoming::SubAck {
            packet_id: 1,
            granted: None,
        }
    );
}

#[test]
fn unsupported_packets_are_errors() {
    assert_eq!(
        Incoming::decode(&[0x50, 2, 0, 1]),
        Err(PacketError::UnexpectedPacket(0x50))
    );
    assert_eq!(
        Incoming::decode(&[0x34, 5, 0, 1, b'a', 0, 1]),
        Err(PacketError::UnsupportedQoS)
    );
}
