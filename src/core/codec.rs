//! # Frame Codec
//!
//! Tokio codec for the delimiter-framed text wire format.
//!
//! Frames are UTF-8 text separated by a single `0x00` byte with no length
//! prefix. The decoder accumulates bytes and emits one complete frame per
//! call, in arrival order, no matter how the input was chunked; trailing
//! partial data stays buffered until its delimiter arrives. The encoder
//! appends the delimiter and rejects frames that already contain it.

use bytes::{Buf, BufMut, BytesMut};
use std::io;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, warn};

use crate::config::{FRAME_DELIMITER, MAX_FRAME_SIZE};
use crate::error::constants;

/// Codec splitting a raw byte stream into `0x00`-delimited text frames
#[derive(Debug, Clone)]
pub struct FrameCodec {
    max_frame_size: usize,
}

impl FrameCodec {
    /// Create a codec with the default frame size limit
    pub fn new() -> Self {
        Self {
            max_frame_size: MAX_FRAME_SIZE,
        }
    }

    /// Create a codec with a custom frame size limit
    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameCodec {
    type Item = String;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(pos) = src.iter().position(|&b| b == FRAME_DELIMITER) else {
            // No delimiter yet: retain the partial frame, but refuse to
            // buffer past the frame size limit.
            if src.len() > self.max_frame_size {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("frame exceeds maximum size: {} bytes", src.len()),
                ));
            }
            return Ok(None);
        };

        let frame = src.split_to(pos);
        src.advance(1); // consume the delimiter

        match std::str::from_utf8(&frame) {
            Ok(text) => Ok(Some(text.to_owned())),
            Err(_) => {
                // The wire contract is UTF-8 text; a stray byte should not
                // kill the whole stream.
                warn!(bytes = frame.len(), "frame contained invalid UTF-8");
                Ok(Some(String::from_utf8_lossy(&frame).into_owned()))
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None => {
                if !src.is_empty() {
                    debug!(bytes = src.len(), "discarding partial frame at EOF");
                    src.clear();
                }
                Ok(None)
            }
        }
    }
}

impl Encoder<String> for FrameCodec {
    type Error = io::Error;

    fn encode(&mut self, frame: String, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if frame.as_bytes().contains(&FRAME_DELIMITER) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                constants::ERR_DELIMITER_IN_FRAME,
            ));
        }

        dst.reserve(frame.len() + 1);
        dst.extend_from_slice(frame.as_bytes());
        dst.put_u8(FRAME_DELIMITER);
        Ok(())
    }
}
