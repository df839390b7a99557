//! # Hook Registry
//!
//! Process-wide mapping from (direction, message kind) to interceptor
//! callbacks, plus wildcard buckets on both axes.
//!
//! Plugins register hooks against a concrete kind or against every message
//! of a direction; unregistration removes exactly one entry by id and is
//! safe while a dispatch for another message is in flight. Selection takes
//! a stable snapshot of the matching set under the read lock and releases
//! the lock before any callback runs, so a hook may itself register or
//! unregister without deadlocking.

use futures::future::BoxFuture;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::core::message::{Direction, RelayMessage};
use crate::error::Result;
use crate::transport::session::SessionHandle;

/// Everything a hook callback gets to see: the shared mutable message and
/// the session it arrived on
#[derive(Clone)]
pub struct HookContext {
    /// The decoded message; mutate via [`RelayMessage::with_payload`],
    /// suppress via [`RelayMessage::suppress`]
    pub message: Arc<RelayMessage>,
    /// Session-scoped plugin surface (send, state, timers)
    pub session: SessionHandle,
}

impl HookContext {
    /// Convenience accessor for the message's direction
    pub fn direction(&self) -> Direction {
        self.message.direction()
    }
}

/// Direction axis of a hook registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectionFilter {
    /// Match frames from either socket
    Any,
    /// Match frames from one socket only
    Only(Direction),
}

impl DirectionFilter {
    fn matches(self, direction: Direction) -> bool {
        match self {
            DirectionFilter::Any => true,
            DirectionFilter::Only(only) => only == direction,
        }
    }
}

/// Kind axis of a hook registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KindFilter {
    /// Match every message regardless of kind
    Any,
    /// Match one concrete type discriminator
    Exact(String),
}

impl KindFilter {
    fn matches(&self, kind: &str) -> bool {
        match self {
            KindFilter::Any => true,
            KindFilter::Exact(exact) => exact == kind,
        }
    }

    fn is_exact(&self) -> bool {
        matches!(self, KindFilter::Exact(_))
    }
}

/// Opaque handle identifying one registration, used to unregister it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(u64);

/// An interceptor callback
pub trait Hook: Send + Sync {
    /// Inspect, rewrite, or suppress the message in the context
    fn call(&self, ctx: HookContext) -> BoxFuture<'static, Result<()>>;
}

struct FnHook<F>(F);

impl<F, Fut> Hook for FnHook<F>
where
    F: Fn(HookContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    fn call(&self, ctx: HookContext) -> BoxFuture<'static, Result<()>> {
        Box::pin((self.0)(ctx))
    }
}

/// Wrap an async closure as a [`Hook`]
pub fn hook_fn<F, Fut>(f: F) -> Arc<dyn Hook>
where
    F: Fn(HookContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(FnHook(f))
}

struct HookEntry {
    id: HookId,
    direction: DirectionFilter,
    kind: KindFilter,
    hook: Arc<dyn Hook>,
}

/// A snapshot entry returned by [`HookRegistry::select`]
#[derive(Clone)]
pub struct SelectedHook {
    /// Registration id, used when reporting a callback failure
    pub id: HookId,
    /// The callback itself
    pub hook: Arc<dyn Hook>,
}

/// Registry of interceptor hooks, shared by reference across all sessions
#[derive(Default)]
pub struct HookRegistry {
    entries: RwLock<Vec<HookEntry>>,
    next_id: AtomicU64,
}

impl HookRegistry {
    /// Create a registry behind an `Arc`, ready to share with sessions
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a hook for the given direction and kind filters
    pub async fn register(
        &self,
        direction: DirectionFilter,
        kind: KindFilter,
        hook: Arc<dyn Hook>,
    ) -> HookId {
        let id = HookId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut entries = self.entries.write().await;
        entries.push(HookEntry {
            id,
            direction,
            kind,
            hook,
        });
        id
    }

    /// Register an async closure, see [`hook_fn`]
    pub async fn register_fn<F, Fut>(
        &self,
        direction: DirectionFilter,
        kind: KindFilter,
        f: F,
    ) -> HookId
    where
        F: Fn(HookContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.register(direction, kind, hook_fn(f)).await
    }

    /// Remove exactly the entry with the given id.
    ///
    /// Returns `true` when an entry was removed. In-flight dispatches hold
    /// their own snapshot and are unaffected.
    pub async fn unregister(&self, id: HookId) -> bool {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        entries.len() != before
    }

    /// Number of live registrations
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether no hooks are registered
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Snapshot the hooks matching a message: concrete-kind registrations
    /// first (in registration order), then wildcard-kind registrations.
    pub async fn select(&self, direction: Direction, kind: &str) -> Vec<SelectedHook> {
        let entries = self.entries.read().await;

        let mut selected = Vec::new();
        for entry in entries
            .iter()
            .filter(|e| e.kind.is_exact() && e.direction.matches(direction) && e.kind.matches(kind))
        {
            selected.push(SelectedHook {
                id: entry.id,
                hook: Arc::clone(&entry.hook),
            });
        }
        for entry in entries
            .iter()
            .filter(|e| !e.kind.is_exact() && e.direction.matches(direction))
        {
            selected.push(SelectedHook {
                id: entry.id,
                hook: Arc::clone(&entry.hook),
            });
        }

        selected
    }
}
