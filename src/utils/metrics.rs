//! Observability and Metrics
//!
//! This module provides metrics collection and observability features
//! for monitoring relay health and traffic volume.
//!
//! Uses atomic counters for thread-safe metrics collection. The collector is
//! an explicitly owned object shared by reference through the session
//! context rather than ambient global state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Metrics collector for relay operations
#[derive(Debug)]
pub struct RelayMetrics {
    /// Total sessions established
    pub sessions_total: AtomicU64,
    /// Currently active sessions
    pub sessions_active: AtomicU64,
    /// Sessions that failed to reach the upstream
    pub sessions_failed: AtomicU64,
    /// Total frames received on either socket
    pub frames_received: AtomicU64,
    /// Total bytes received on either socket
    pub bytes_received: AtomicU64,
    /// Total bytes written out
    pub bytes_sent: AtomicU64,
    /// Frames dropped because no format claimed them
    pub decode_failures: AtomicU64,
    /// Messages forwarded to the opposite socket
    pub messages_forwarded: AtomicU64,
    /// Messages held back by hooks or the handshake policy
    pub messages_suppressed: AtomicU64,
    /// Handshake frames echoed back to the local side
    pub handshake_echoes: AtomicU64,
    /// Hook callbacks that failed or panicked
    pub hook_failures: AtomicU64,
    /// Command callbacks that failed
    pub command_failures: AtomicU64,
    /// Writes dropped because the destination was gone
    pub write_failures: AtomicU64,
    /// Start time for uptime calculation
    start_time: Instant,
}

impl RelayMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            sessions_total: AtomicU64::new(0),
            sessions_active: AtomicU64::new(0),
            sessions_failed: AtomicU64::new(0),
            frames_received: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            decode_failures: AtomicU64::new(0),
            messages_forwarded: AtomicU64::new(0),
            messages_suppressed: AtomicU64::new(0),
            handshake_echoes: AtomicU64::new(0),
            hook_failures: AtomicU64::new(0),
            command_failures: AtomicU64::new(0),
            write_failures: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a new active session
    pub fn session_opened(&self) {
        self.sessions_total.fetch_add(1, Ordering::Relaxed);
        self.sessions_active.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a session reaching its terminal state
    pub fn session_closed(&self) {
        self.sessions_active.fetch_sub(1, Ordering::Relaxed);
    }

    /// Record a session that never became active
    pub fn session_failed(&self) {
        self.sessions_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a frame arriving on either socket
    pub fn frame_received(&self, byte_count: u64) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(byte_count, Ordering::Relaxed);
    }

    /// Record bytes written out
    pub fn bytes_sent(&self, byte_count: u64) {
        self.bytes_sent.fetch_add(byte_count, Ordering::Relaxed);
    }

    /// Record a frame no format claimed
    pub fn decode_failed(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a message forwarded to the opposite socket
    pub fn message_forwarded(&self) {
        self.messages_forwarded.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a message held back from forwarding
    pub fn message_suppressed(&self) {
        self.messages_suppressed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a handshake frame echoed to the local side
    pub fn handshake_echoed(&self) {
        self.handshake_echoes.fetch_add(1, Ordering::Relaxed);
    }

    /// Record failed hook callbacks
    pub fn hooks_failed(&self, count: u64) {
        self.hook_failures.fetch_add(count, Ordering::Relaxed);
    }

    /// Record a failed command callback
    pub fn command_failed(&self) {
        self.command_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a write dropped on a dead destination
    pub fn write_failed(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            sessions_total: self.sessions_total.load(Ordering::Relaxed),
            sessions_active: self.sessions_active.load(Ordering::Relaxed),
            sessions_failed: self.sessions_failed.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            messages_forwarded: self.messages_forwarded.load(Ordering::Relaxed),
            messages_suppressed: self.messages_suppressed.load(Ordering::Relaxed),
            handshake_echoes: self.handshake_echoes.load(Ordering::Relaxed),
            hook_failures: self.hook_failures.load(Ordering::Relaxed),
            command_failures: self.command_failures.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Log current metrics
    pub fn log_summary(&self) {
        let snapshot = self.snapshot();
        info!(
            sessions_total = snapshot.sessions_total,
            sessions_active = snapshot.sessions_active,
            sessions_failed = snapshot.sessions_failed,
            frames_received = snapshot.frames_received,
            bytes_received = snapshot.bytes_received,
            bytes_sent = snapshot.bytes_sent,
            decode_failures = snapshot.decode_failures,
            messages_forwarded = snapshot.messages_forwarded,
            messages_suppressed = snapshot.messages_suppressed,
            handshake_echoes = snapshot.handshake_echoes,
            hook_failures = snapshot.hook_failures,
            command_failures = snapshot.command_failures,
            write_failures = snapshot.write_failures,
            uptime_seconds = snapshot.uptime_seconds,
            "Relay metrics snapshot"
        );
    }
}

impl Default for RelayMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub sessions_total: u64,
    pub sessions_active: u64,
    pub sessions_failed: u64,
    pub frames_received: u64,
    pub bytes_received: u64,
    pub bytes_sent: u64,
    pub decode_failures: u64,
    pub messages_forwarded: u64,
    pub messages_suppressed: u64,
    pub handshake_echoes: u64,
    pub hook_failures: u64,
    pub command_failures: u64,
    pub write_failures: u64,
    pub uptime_seconds: u64,
}
