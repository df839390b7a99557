//! # Protocol Layer
//!
//! Interception machinery between the frame codec and the sockets.
//!
//! ## Components
//! - **Hooks**: registry of interceptor callbacks with wildcard filters
//! - **Dispatcher**: concurrent hook invocation with per-hook isolation
//! - **Commands**: chat-prefixed text commands and their router
//! - **Handshake**: pre-auth kinds answered locally instead of forwarded

pub mod commands;
pub mod dispatcher;
pub mod handshake;
pub mod hooks;

#[cfg(test)]
mod tests;
