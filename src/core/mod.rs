//! # Core Relay Components
//!
//! Low-level framing and the multi-format message model.
//!
//! This module provides the foundation for the relay, handling frame
//! delimiting, format classification, and wire-text round-tripping.
//!
//! ## Components
//! - **FrameCodec**: Tokio codec for `0x00`-delimited text frames
//! - **Message**: classification, parsing, and serialization for the
//!   tokenized, XML, and JSON wire shapes
//!
//! ## Wire Format
//! ```text
//! [UTF-8 frame text] [0x00] [UTF-8 frame text] [0x00] ...
//! ```
//!
//! ## Security
//! - Maximum frame size (64 KB default) bounds decoder memory
//! - Frames may never contain the delimiter; the encoder enforces this

pub mod codec;
pub mod message;
pub mod xml;
