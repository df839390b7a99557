//! # Handshake Policy
//!
//! Pre-auth handshake frames must never reach the upstream server.
//!
//! The game client opens its connection with a version check and a random
//! key exchange. The relay answers those locally: the frame is suppressed
//! toward the remote side and echoed back verbatim to the client. The login
//! response is forwarded normally but captured into session state so hooks
//! and commands can read the player identity later.
//!
//! The tracker distinguishes a socket that died mid-handshake (reported as
//! a warning) from an orderly post-login close.

use std::sync::atomic::{AtomicBool, Ordering};

/// Version-check handshake kind
pub const KIND_VERSION_CHECK: &str = "verChk";

/// Random-key-exchange handshake kind
pub const KIND_RANDOM_KEY: &str = "rndK";

/// Login response kind; forwarded, but observed for identity capture
pub const KIND_LOGIN: &str = "login";

/// Session-state key under which the captured login frame is stored
pub const STATE_LOGIN: &str = "login";

/// Whether a message kind belongs to the local pre-auth handshake
pub fn is_handshake_kind(kind: &str) -> bool {
    matches!(kind, KIND_VERSION_CHECK | KIND_RANDOM_KEY)
}

/// Tracks how far a session's handshake progressed
#[derive(Debug, Default)]
pub struct HandshakeTracker {
    started: AtomicBool,
    completed: AtomicBool,
}

impl HandshakeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handshake frame was echoed back to the client
    pub fn record_echo(&self) {
        self.started.store(true, Ordering::SeqCst);
    }

    /// A login response was observed
    pub fn record_login(&self) {
        self.completed.store(true, Ordering::SeqCst);
    }

    /// True when the handshake began but never reached login
    pub fn interrupted(&self) -> bool {
        self.started.load(Ordering::SeqCst) && !self.completed.load(Ordering::SeqCst)
    }
}
