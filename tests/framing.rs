//! Property-based tests for the frame codec
//!
//! These tests validate the framing invariant across a wide range of
//! randomly generated inputs: however a delimited byte stream is chunked,
//! the decoder emits exactly the same frames, each exactly once.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use bytes::BytesMut;
use proptest::prelude::*;
use relay_core::core::codec::FrameCodec;
use tokio_util::codec::{Decoder, Encoder};

/// Feed a buffer to a fresh codec in the given chunk sizes (cycled) and
/// collect every emitted frame.
fn decode_chunked(input: &[u8], chunk_sizes: &[usize]) -> Vec<String> {
    let mut codec = FrameCodec::new();
    let mut buf = BytesMut::new();
    let mut frames = Vec::new();

    let mut sizes = chunk_sizes.iter().copied().cycle();
    let mut offset = 0;
    while offset < input.len() {
        let size = sizes.next().unwrap_or(1).max(1);
        let end = (offset + size).min(input.len());
        buf.extend_from_slice(&input[offset..end]);
        offset = end;

        while let Some(frame) = codec.decode(&mut buf).expect("decode should not fail") {
            frames.push(frame);
        }
    }

    frames
}

fn delimited_stream(frames: &[Vec<u8>]) -> Vec<u8> {
    let mut stream = Vec::new();
    for frame in frames {
        stream.extend_from_slice(frame);
        stream.push(0);
    }
    stream
}

proptest! {
    // Property: chunking never changes what the decoder emits
    #[test]
    fn prop_chunking_is_idempotent(
        frames in prop::collection::vec(
            prop::collection::vec(any::<u8>().prop_filter("no delimiter", |b| *b != 0), 0..60),
            0..8,
        ),
        chunk_sizes in prop::collection::vec(1usize..9, 1..16),
    ) {
        let stream = delimited_stream(&frames);

        let whole = decode_chunked(&stream, &[stream.len().max(1)]);
        let chunked = decode_chunked(&stream, &chunk_sizes);

        prop_assert_eq!(whole.len(), frames.len());
        prop_assert_eq!(whole, chunked);
    }

    // Property: encode followed by decode restores the frame text
    #[test]
    fn prop_encode_decode_roundtrip(text in "[a-zA-Z0-9%<>{}\\[\\] ]{0,80}") {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();

        codec.encode(text.clone(), &mut buf).expect("encode");
        let decoded = codec.decode(&mut buf).expect("decode").expect("one frame");

        prop_assert_eq!(decoded, text);
        prop_assert!(buf.is_empty());
    }

    // Property: a byte-by-byte feed emits every frame exactly once
    #[test]
    fn prop_byte_by_byte_feed(
        frames in prop::collection::vec("[a-zA-Z0-9%]{0,20}", 0..6),
    ) {
        let byte_frames: Vec<Vec<u8>> =
            frames.iter().map(|f| f.as_bytes().to_vec()).collect();
        let stream = delimited_stream(&byte_frames);

        let decoded = decode_chunked(&stream, &[1]);
        prop_assert_eq!(decoded, frames);
    }
}

#[test]
fn test_partial_tail_is_not_emitted() {
    let mut codec = FrameCodec::new();
    let mut buf = BytesMut::from(&b"first\0second-without-delimiter"[..]);

    assert_eq!(codec.decode(&mut buf).unwrap().unwrap(), "first");
    assert!(codec.decode(&mut buf).unwrap().is_none());
    assert_eq!(&buf[..], b"second-without-delimiter");

    // Delimiter arrives later: the retained tail completes
    buf.extend_from_slice(b"\0");
    assert_eq!(
        codec.decode(&mut buf).unwrap().unwrap(),
        "second-without-delimiter"
    );
}

#[test]
fn test_back_to_back_delimiters_emit_empty_frames() {
    let mut codec = FrameCodec::new();
    let mut buf = BytesMut::from(&b"\0\0a\0"[..]);

    let mut frames = Vec::new();
    while let Some(frame) = codec.decode(&mut buf).unwrap() {
        frames.push(frame);
    }
    assert_eq!(frames, vec!["", "", "a"]);
}
