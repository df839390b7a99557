//! # Transport Layer
//!
//! Socket plumbing for the relay: the local listener the game client
//! connects to, and the session type that pairs a local connection with a
//! dialed upstream connection.
//!
//! ## Components
//! - **Listener**: single-slot accept loop with graceful shutdown
//! - **Session**: the relay state machine, pump tasks, and plugin surface

pub mod listener;
pub mod session;
