//! # Utility Modules
//!
//! Supporting utilities for logging, metrics, and session timers.
//!
//! This module provides reusable utilities used throughout the relay.
//!
//! ## Components
//! - **Logging**: Structured logging configuration
//! - **Metrics**: Thread-safe observability counters
//! - **Timers**: Session-owned interval bag, drained once at teardown

pub mod logging;
pub mod metrics;
pub mod timers;

// Re-export public types for advanced users
pub use metrics::{MetricsSnapshot, RelayMetrics};
pub use timers::{TimerBag, TimerId};
