//! Unit tests for the CRLF line codec.
//!
//! Covers:
//! - CRLF and bare LF terminators are both stripped
//! - batched lines decode one at a time
//! - partial delivery is buffered until the terminator arrives
//! - invalid UTF-8 is replaced rather than failing the stream
//! - over-long lines return `AppError::Protocol("line too long")`
//! - outbound lines gain a CRLF terminator

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use ami_monitor::ami::codec::{AmiCodec, MAX_LINE_BYTES};
use ami_monitor::AppError;

// ── Decoding ─────────────────────────────────────────────────

#[test]
fn crlf_terminator_is_stripped() {
    let mut codec = AmiCodec::new();
    let mut buf = BytesMut::from("Response: Success\r\n");

    let line = codec.decode(&mut buf).expect("decode succeeds");

    assert_eq!(line, Some("Response: Success".to_owned()));
    assert!(buf.is_empty());
}

#[test]
fn bare_lf_terminator_is_accepted() {
    let mut codec = AmiCodec::new();
    let mut buf = BytesMut::from("Event: QueueParams\n");

    let line = codec.decode(&mut buf).expect("decode succeeds");

    assert_eq!(line, Some("Event: QueueParams".to_owned()));
}

#[test]
fn blank_line_decodes_as_empty_string() {
    let mut codec = AmiCodec::new();
    let mut buf = BytesMut::from("\r\n");

    assert_eq!(codec.decode(&mut buf).unwrap(), Some(String::new()));
}

#[test]
fn batched_lines_decode_in_order() {
    let mut codec = AmiCodec::new();
    let mut buf = BytesMut::from("Queue: support\r\nCalls: 3\r\n\r\n");

    assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("Queue: support"));
    assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("Calls: 3"));
    assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some(""));
    assert_eq!(codec.decode(&mut buf).unwrap(), None);
}

#[test]
fn partial_line_is_buffered_until_terminator() {
    let mut codec = AmiCodec::new();
    let mut buf = BytesMut::from("Response: Succ");

    assert_eq!(codec.decode(&mut buf).unwrap(), None);

    buf.extend_from_slice(b"ess\r\n");
    assert_eq!(
        codec.decode(&mut buf).unwrap(),
        Some("Response: Success".to_owned())
    );
}

#[test]
fn unterminated_tail_is_returned_at_eof() {
    let mut codec = AmiCodec::new();
    let mut buf = BytesMut::from("--END COMMAND--");

    assert_eq!(
        codec.decode_eof(&mut buf).unwrap(),
        Some("--END COMMAND--".to_owned())
    );
}

#[test]
fn invalid_utf8_is_decoded_lossily() {
    let mut codec = AmiCodec::new();
    let mut buf = BytesMut::from(&b"CallerIDName: Jos\xe9\r\nCalls: 1\r\n"[..]);

    let line = codec.decode(&mut buf).expect("stray byte is not an error");

    assert_eq!(line, Some("CallerIDName: Jos\u{FFFD}".to_owned()));
    assert_eq!(codec.decode(&mut buf).unwrap(), Some("Calls: 1".to_owned()));
}

#[test]
fn invalid_utf8_in_unterminated_tail_is_decoded_lossily() {
    let mut codec = AmiCodec::new();
    let mut buf = BytesMut::from(&b"Message: \xff"[..]);

    assert_eq!(
        codec.decode_eof(&mut buf).unwrap(),
        Some("Message: \u{FFFD}".to_owned())
    );
}

#[test]
fn over_long_line_is_protocol_error() {
    let mut codec = AmiCodec::new();
    let mut buf = BytesMut::from("x".repeat(MAX_LINE_BYTES + 1).as_str());

    let err = codec.decode(&mut buf).expect_err("line exceeds limit");

    match err {
        AppError::Protocol(msg) => assert!(msg.contains("line too long"), "got {msg}"),
        other => panic!("expected Protocol, got {other:?}"),
    }
}

// ── Encoding ─────────────────────────────────────────────────

#[test]
fn encode_appends_crlf() {
    let mut codec = AmiCodec::new();
    let mut dst = BytesMut::new();

    codec.encode("Action: Logoff", &mut dst).unwrap();
    codec.encode("", &mut dst).unwrap();

    assert_eq!(&dst[..], b"Action: Logoff\r\n\r\n");
}

#[test]
fn encode_accepts_owned_strings() {
    let mut codec = AmiCodec::new();
    let mut dst = BytesMut::new();

    codec.encode(String::from("Events: off"), &mut dst).unwrap();

    assert_eq!(&dst[..], b"Events: off\r\n");
}
