// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire format tests: length-prefix framing and JSON encoding.

use super::*;
use proptest::prelude::*;

#[test]
fn encode_returns_json_without_length_prefix() {
    let encoded = encode(&Response::Pong).expect("encode failed");

    let json_str = std::str::from_utf8(&encoded).expect("should be valid UTF-8");
    assert_eq!(json_str, r#"{"type":"Pong"}"#);
}

#[tokio::test]
async fn write_message_adds_length_prefix() {
    let data = b"test data";

    let mut buffer = Vec::new();
    write_message(&mut buffer, data).await.expect("write failed");

    let len = u32::from_be_bytes([buffer[0], buffer[1], buffer[2], buffer[3]]) as usize;
    assert_eq!(len, data.len());
    assert_eq!(&buffer[4..], data);
}

#[tokio::test]
async fn empty_stream_is_connection_closed() {
    let mut cursor = std::io::Cursor::new(Vec::<u8>::new());
    let err = read_message(&mut cursor).await.unwrap_err();
    assert!(matches!(err, ProtocolError::ConnectionClosed));
}

#[tokio::test]
async fn truncated_body_is_connection_closed() {
    let mut bytes = 10u32.to_be_bytes().to_vec();
    bytes.extend_from_slice(b"abc");
    let err = read_message(&mut std::io::Cursor::new(bytes)).await.unwrap_err();
    assert!(matches!(err, ProtocolError::ConnectionClosed));
}

#[tokio::test]
async fn oversized_frame_is_rejected_before_reading_body() {
    let bytes = ((MAX_MESSAGE_SIZE + 1) as u32).to_be_bytes().to_vec();
    let err = read_message(&mut std::io::Cursor::new(bytes)).await.unwrap_err();
    assert!(matches!(err, ProtocolError::MessageTooLarge { .. }));
}

#[tokio::test]
async fn request_and_response_cross_the_wire() {
    let (mut client, mut server) = tokio::io::duplex(4096);
    let timeout = Duration::from_secs(1);

    let request = Request::DeleteJob { id: "t1".to_string() };
    write_request(&mut client, &request, timeout).await.unwrap();
    assert_eq!(read_request(&mut server, timeout).await.unwrap(), request);

    write_response(&mut server, &Response::ShuttingDown, timeout).await.unwrap();
    assert_eq!(read_response(&mut client, timeout).await.unwrap(), Response::ShuttingDown);
}

#[tokio::test]
async fn silent_peer_times_out() {
    let (_client, mut server) = tokio::io::duplex(64);
    let err = read_request(&mut server, Duration::from_millis(50)).await.unwrap_err();
    assert!(matches!(err, ProtocolError::Timeout));
}

#[tokio::test]
async fn garbage_payload_is_json_error() {
    let mut buffer = Vec::new();
    write_message(&mut buffer, b"{not json").await.unwrap();
    let err =
        read_request(&mut std::io::Cursor::new(buffer), Duration::from_secs(1)).await.unwrap_err();
    assert!(matches!(err, ProtocolError::Json(_)));
}

proptest! {
    #[test]
    fn framing_preserves_arbitrary_payloads(data in proptest::collection::vec(any::<u8>(), 0..2048)) {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let read_back = rt.block_on(async {
            let mut buffer = Vec::new();
            write_message(&mut buffer, &data).await.unwrap();
            prop_assert_eq!(buffer.len(), 4 + data.len());
            Ok(read_message(&mut std::io::Cursor::new(buffer)).await.unwrap())
        })?;
        prop_assert_eq!(read_back, data);
    }
}
