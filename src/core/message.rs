//! # Message Model
//!
//! Classification, parsing, and serialization for the three wire shapes that
//! share the delimiter framing.
//!
//! ## Formats
//! - **Tokenized**: `%`-separated fields (`%xt%o%rj%-1%room1%`)
//! - **Xml**: SmartFox-style documents (`<msg t="sys"><body action="..."/></msg>`)
//! - **Json**: nested objects (`{"b":{"o":{"_cmd":"login"}}}`)
//!
//! Format is decided purely from the first and last non-whitespace characters
//! of the frame. Each parsed message carries a type discriminator (`kind`)
//! extracted once at parse time and never recomputed, a mutable payload that
//! hooks may rewrite, and a one-way suppression latch: once a hook suppresses
//! a message it stays suppressed for the rest of the dispatch cycle.
//!
//! Round-trip law: for a well-formed frame that no hook mutated,
//! `serialize(parse(frame)) == frame`.

use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::core::xml::{self, Element};
use crate::error::{RelayError, Result};

/// Which socket a frame arrived from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Read from the local (game client) socket
    FromClient,
    /// Read from the remote (game server) socket
    FromServer,
}

impl Direction {
    /// Short label used in log fields and events
    pub fn label(self) -> &'static str {
        match self {
            Direction::FromClient => "client",
            Direction::FromServer => "server",
        }
    }
}

/// Wire shape of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    /// `%`-separated token fields
    Tokenized,
    /// XML document
    Xml,
    /// JSON object
    Json,
}

impl WireFormat {
    /// Determine the format from the first and last non-whitespace characters.
    /// Returns `None` for unclassifiable frames, which are dropped and counted
    /// as decode failures by the session.
    pub fn classify(frame: &str) -> Option<Self> {
        let trimmed = frame.trim();
        let first = trimmed.chars().next()?;
        let last = trimmed.chars().last()?;

        match (first, last) {
            ('<', '>') => Some(WireFormat::Xml),
            ('%', '%') => Some(WireFormat::Tokenized),
            ('{', '}') => Some(WireFormat::Json),
            _ => None,
        }
    }

    /// Get human-readable name
    pub fn name(self) -> &'static str {
        match self {
            WireFormat::Tokenized => "Tokenized",
            WireFormat::Xml => "XML",
            WireFormat::Json => "JSON",
        }
    }
}

/// Parsed, format-specific representation of a frame, mutable by hooks
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// The verbatim `%`-split of the frame, empty edge segments included
    Tokenized(Vec<String>),
    /// Root element of the document
    Xml(Element),
    /// Parsed object graph
    Json(Value),
}

impl Payload {
    /// Parse a frame into its payload representation
    pub fn parse(format: WireFormat, frame: &str) -> Result<Self> {
        match format {
            WireFormat::Tokenized => Ok(Payload::Tokenized(
                frame.split('%').map(String::from).collect(),
            )),
            WireFormat::Xml => Ok(Payload::Xml(xml::parse(frame)?)),
            WireFormat::Json => serde_json::from_str(frame)
                .map(Payload::Json)
                .map_err(|e| RelayError::Parse(e.to_string())),
        }
    }

    /// Serialize the payload back to frame text
    pub fn serialize(&self) -> Result<String> {
        match self {
            Payload::Tokenized(fields) => Ok(fields.join("%")),
            Payload::Xml(root) => xml::serialize(root),
            Payload::Json(value) => {
                serde_json::to_string(value).map_err(|e| RelayError::Parse(e.to_string()))
            }
        }
    }

    /// Extract the type discriminator.
    ///
    /// Tokenized frames count fields with the leading empty split segment
    /// skipped; the kind is field 3 when field 2 is the object-routing token
    /// `o`, otherwise field 2. This asymmetry is a real wire-format quirk and
    /// is preserved exactly. XML frames use the `action` attribute of the
    /// `body` element; JSON frames use the string at `b.o._cmd`. Anything
    /// missing resolves to the empty string, which dispatches to
    /// wildcard-only hooks.
    pub fn kind(&self) -> String {
        match self {
            Payload::Tokenized(fields) => {
                let fields: Vec<&str> = fields.iter().map(String::as_str).collect();
                let fields = match fields.first() {
                    Some(&"") => &fields[1..],
                    _ => &fields[..],
                };
                let kind = if fields.get(2).copied() == Some("o") {
                    fields.get(3)
                } else {
                    fields.get(2)
                };
                kind.copied().unwrap_or_default().to_owned()
            }
            Payload::Xml(root) => root
                .child("body")
                .and_then(|body| body.attr("action"))
                .unwrap_or_default()
                .to_owned(),
            Payload::Json(value) => value
                .pointer("/b/o/_cmd")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned(),
        }
    }
}

/// A decoded frame travelling through the relay
#[derive(Debug)]
pub struct RelayMessage {
    raw: String,
    kind: String,
    format: WireFormat,
    direction: Direction,
    payload: Mutex<Payload>,
    suppressed: AtomicBool,
}

impl RelayMessage {
    /// Classify and parse a frame into a message.
    ///
    /// Fails with [`RelayError::UnclassifiableFrame`] when the frame matches
    /// none of the wire shapes; the session drops such frames and keeps
    /// relaying.
    pub fn decode(direction: Direction, raw: String) -> Result<Self> {
        let format = WireFormat::classify(&raw).ok_or(RelayError::UnclassifiableFrame)?;
        let payload = Payload::parse(format, &raw)?;
        let kind = payload.kind();

        Ok(Self {
            raw,
            kind,
            format,
            direction,
            payload: Mutex::new(payload),
            suppressed: AtomicBool::new(false),
        })
    }

    /// Original frame text, kept for verbatim echoes and passive display
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Type discriminator, fixed at parse time
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Wire shape of the frame
    pub fn format(&self) -> WireFormat {
        self.format
    }

    /// Which socket the frame arrived from
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Prevent this message from being forwarded. The latch is one-way:
    /// there is deliberately no way to clear it within a dispatch cycle.
    pub fn suppress(&self) {
        self.suppressed.store(true, Ordering::SeqCst);
    }

    /// Whether a hook (or the handshake policy) suppressed this message
    pub fn is_suppressed(&self) -> bool {
        self.suppressed.load(Ordering::SeqCst)
    }

    /// Run a closure over the mutable payload. Hooks share this payload;
    /// the closure must not await, so the lock is held only briefly.
    pub fn with_payload<T>(&self, f: impl FnOnce(&mut Payload) -> T) -> T {
        let mut guard = self.payload.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Serialize the current payload back to frame text
    pub fn serialize(&self) -> Result<String> {
        self.with_payload(|payload| payload.serialize())
    }
}
