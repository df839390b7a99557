//! # relay-core
//!
//! Transparent relay and interception core for delimiter-framed game
//! protocols.
//!
//! The relay sits between a game client and its authoritative server,
//! forwarding traffic in both directions while pluggable hooks inspect,
//! rewrite, or suppress individual messages. It understands the three text
//! wire shapes that share the `0x00` framing (tokenized, XML, JSON),
//! answers the pre-auth handshake locally, and exposes a chat command layer
//! behind the `!` prefix.
//!
//! ## Architecture
//! ```text
//! client socket -> FrameCodec -> classify/parse -> Dispatcher -> serialize -> server socket
//! server socket -> FrameCodec -> classify/parse -> Dispatcher -> serialize -> client socket
//! ```
//!
//! ## Usage
//! ```ignore
//! use relay_core::{config::RelayConfig, transport::listener};
//! use relay_core::protocol::hooks::{DirectionFilter, HookRegistry, KindFilter};
//! use relay_core::transport::session::SessionContext;
//! use relay_core::utils::metrics::RelayMetrics;
//! use std::sync::Arc;
//!
//! let config = RelayConfig::from_file("relay.toml")?;
//! let registry = HookRegistry::new();
//! let metrics = Arc::new(RelayMetrics::new());
//!
//! registry.register_fn(DirectionFilter::Any, KindFilter::Exact("pubMsg".into()), |ctx| async move {
//!     ctx.message.suppress();
//!     Ok(())
//! }).await;
//!
//! let ctx = SessionContext::new(registry, metrics, &config.relay);
//! listener::run(&config, ctx).await?;
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod transport;
pub mod utils;

pub use crate::config::RelayConfig;
pub use crate::core::codec::FrameCodec;
pub use crate::core::message::{Direction, Payload, RelayMessage, WireFormat};
pub use crate::error::{RelayError, Result};
pub use crate::protocol::commands::{command_fn, CommandRouter};
pub use crate::protocol::dispatcher::{DispatchReport, Dispatcher};
pub use crate::protocol::hooks::{
    hook_fn, DirectionFilter, HookContext, HookId, HookRegistry, KindFilter,
};
pub use crate::transport::session::{
    RelayEvent, RelaySession, SessionContext, SessionHandle, SessionStatus,
};
pub use crate::utils::metrics::RelayMetrics;
