//! # Command Router
//!
//! Text commands typed into the game's chat box.
//!
//! One dedicated hook watches chat-shaped messages from the client. When the
//! chat text starts with the command prefix (`!`), the message is suppressed
//! unconditionally — a command invocation never reaches the server as chat —
//! and the remaining text is split on whitespace into a command name and
//! arguments. Unknown names are silently ignored; callback failures are
//! caught and reported, never propagated into the dispatch cycle.

use futures::future::BoxFuture;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::COMMAND_PREFIX;
use crate::core::message::{Direction, Payload, RelayMessage};
use crate::error::Result;
use crate::protocol::hooks::{DirectionFilter, HookContext, HookId, HookRegistry, KindFilter};
use crate::transport::session::SessionHandle;

/// A registered command callback
pub trait CommandHandler: Send + Sync {
    /// Run the command with the whitespace-split argument list
    fn call(&self, args: Vec<String>, session: SessionHandle) -> BoxFuture<'static, Result<()>>;
}

struct FnCommand<F>(F);

impl<F, Fut> CommandHandler for FnCommand<F>
where
    F: Fn(Vec<String>, SessionHandle) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    fn call(&self, args: Vec<String>, session: SessionHandle) -> BoxFuture<'static, Result<()>> {
        Box::pin((self.0)(args, session))
    }
}

/// Wrap an async closure as a [`CommandHandler`]
pub fn command_fn<F, Fut>(f: F) -> Arc<dyn CommandHandler>
where
    F: Fn(Vec<String>, SessionHandle) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(FnCommand(f))
}

struct CommandEntry {
    description: String,
    handler: Arc<dyn CommandHandler>,
}

/// Registry of named chat commands, shared by reference across sessions
#[derive(Default)]
pub struct CommandRouter {
    commands: RwLock<HashMap<String, CommandEntry>>,
}

impl CommandRouter {
    /// Create a router behind an `Arc`, ready to share with the hook registry
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a command.
    ///
    /// Registering a name that already exists is a no-op that preserves the
    /// first registration; returns `false` in that case.
    pub async fn register<N, D>(
        &self,
        name: N,
        description: D,
        handler: Arc<dyn CommandHandler>,
    ) -> bool
    where
        N: Into<String>,
        D: Into<String>,
    {
        let name = name.into();
        let mut commands = self.commands.write().await;
        match commands.entry(name) {
            Entry::Occupied(occupied) => {
                debug!(command = %occupied.key(), "duplicate command registration ignored");
                false
            }
            Entry::Vacant(vacant) => {
                vacant.insert(CommandEntry {
                    description: description.into(),
                    handler,
                });
                true
            }
        }
    }

    /// Register an async closure, see [`command_fn`]
    pub async fn register_fn<N, D, F, Fut>(&self, name: N, description: D, f: F) -> bool
    where
        N: Into<String>,
        D: Into<String>,
        F: Fn(Vec<String>, SessionHandle) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.register(name, description, command_fn(f)).await
    }

    /// Names and descriptions of every registered command, sorted by name
    pub async fn descriptions(&self) -> Vec<(String, String)> {
        let commands = self.commands.read().await;
        let mut list: Vec<(String, String)> = commands
            .iter()
            .map(|(name, entry)| (name.clone(), entry.description.clone()))
            .collect();
        list.sort();
        list
    }

    /// Number of registered commands
    pub async fn len(&self) -> usize {
        self.commands.read().await.len()
    }

    /// Whether no commands are registered
    pub async fn is_empty(&self) -> bool {
        self.commands.read().await.is_empty()
    }

    /// Invoke a command by name.
    ///
    /// Returns `false` for unknown names, which are not an error. A failing
    /// callback is reported and counted, never propagated.
    pub async fn invoke(&self, name: &str, args: Vec<String>, session: SessionHandle) -> bool {
        let handler = {
            let commands = self.commands.read().await;
            commands.get(name).map(|entry| Arc::clone(&entry.handler))
        };

        let Some(handler) = handler else {
            debug!(command = name, "unknown command ignored");
            return false;
        };

        if let Err(error) = handler.call(args, session.clone()).await {
            warn!(command = name, error = %error, "command failed");
            session.metrics().command_failed();
        }
        true
    }

    /// Attach the chat-interception hook to a registry.
    ///
    /// One hook per chat kind, client direction only: commands are typed by
    /// the local player. Returns the hook ids so a plugin reload can detach
    /// them again.
    pub async fn attach(self: &Arc<Self>, registry: &HookRegistry, chat_kinds: &[String]) -> Vec<HookId> {
        let mut ids = Vec::with_capacity(chat_kinds.len());
        for kind in chat_kinds {
            let router = Arc::clone(self);
            let id = registry
                .register_fn(
                    DirectionFilter::Only(Direction::FromClient),
                    KindFilter::Exact(kind.clone()),
                    move |ctx| {
                        let router = Arc::clone(&router);
                        async move { router.intercept(ctx).await }
                    },
                )
                .await;
            ids.push(id);
        }
        ids
    }

    async fn intercept(&self, ctx: HookContext) -> Result<()> {
        let Some(text) = chat_text(&ctx.message) else {
            return Ok(());
        };
        let Some(invocation) = text.strip_prefix(COMMAND_PREFIX) else {
            return Ok(());
        };

        // A command invocation never reaches the server as chat.
        ctx.message.suppress();

        let mut parts = invocation.split_whitespace();
        let Some(name) = parts.next() else {
            return Ok(());
        };
        let args: Vec<String> = parts.map(String::from).collect();

        debug!(command = name, args = args.len(), "chat command invoked");
        self.invoke(name, args, ctx.session.clone()).await;
        Ok(())
    }
}

/// Extract the human-readable chat text from a chat-shaped message.
///
/// Tokenized frames carry the text in the field after the kind; XML frames
/// carry it as the content of `body > txt`. JSON chat is not scanned for
/// commands.
pub fn chat_text(message: &RelayMessage) -> Option<String> {
    message.with_payload(|payload| match payload {
        Payload::Tokenized(fields) => {
            let fields: Vec<&str> = fields.iter().map(|f| f.as_str()).collect();
            let fields = match fields.first() {
                Some(&"") => &fields[1..],
                _ => &fields[..],
            };
            let text_index = if fields.get(2).copied() == Some("o") { 4 } else { 3 };
            fields.get(text_index).map(|text| (*text).to_owned())
        }
        Payload::Xml(root) => root
            .child("body")
            .and_then(|body| body.child("txt"))
            .map(|txt| txt.text()),
        Payload::Json(_) => None,
    })
}
