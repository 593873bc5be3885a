//! Unit tests for the interactive shell line codec.

use bytes::BytesMut;
use tokio_util::codec::Decoder;

use remote_console::shell::codec::ShellLineCodec;

#[test]
fn lf_and_crlf_lines_decode_without_terminators() {
    let mut codec = ShellLineCodec::new();
    let mut buf = BytesMut::from("first\nsecond\r\n");

    assert_eq!(codec.decode(&mut buf).expect("decode"), Some("first".to_owned()));
    assert_eq!(codec.decode(&mut buf).expect("decode"), Some("second".to_owned()));
    assert_eq!(codec.decode(&mut buf).expect("decode"), None);
}

#[test]
fn partial_line_is_buffered_until_newline() {
    let mut codec = ShellLineCodec::new();
    let mut buf = BytesMut::from("par");

    assert_eq!(codec.decode(&mut buf).expect("decode"), None);

    buf.extend_from_slice(b"tial\n");
    assert_eq!(
        codec.decode(&mut buf).expect("decode"),
        Some("partial".to_owned())
    );
}

#[test]
fn empty_line_decodes_as_empty_string() {
    let mut codec = ShellLineCodec::new();
    let mut buf = BytesMut::from("\r\n");
    assert_eq!(codec.decode(&mut buf).expect("decode"), Some(String::new()));
}

/// Device output is not guaranteed to be UTF-8; it must not end the stream.
#[test]
fn invalid_utf8_is_replaced_not_rejected() {
    let mut codec = ShellLineCodec::new();
    let mut buf = BytesMut::from(&b"ok \xff\xfe end\n"[..]);

    let line = codec
        .decode(&mut buf)
        .expect("decode")
        .expect("line present");
    assert!(line.starts_with("ok "));
    assert!(line.ends_with(" end"));
    assert!(line.contains('\u{FFFD}'));
}

#[test]
fn overlong_line_is_split_at_limit() {
    let mut codec = ShellLineCodec::with_max_length(4);
    let mut buf = BytesMut::from("abcdefg\n");

    assert_eq!(codec.decode(&mut buf).expect("decode"), Some("abcd".to_owned()));
    assert_eq!(codec.decode(&mut buf).expect("decode"), Some("efg".to_owned()));
    assert_eq!(codec.decode(&mut buf).expect("decode"), None);
}

#[test]
fn unterminated_tail_is_flushed_at_eof() {
    let mut codec = ShellLineCodec::new();
    let mut buf = BytesMut::from("prompt$ ");

    assert_eq!(codec.decode(&mut buf).expect("decode"), None);
    assert_eq!(
        codec.decode_eof(&mut buf).expect("decode_eof"),
        Some("prompt$ ".to_owned())
    );
    assert_eq!(codec.decode_eof(&mut buf).expect("decode_eof"), None);
}
