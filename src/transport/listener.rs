//! # Relay Listener
//!
//! Accepts the game client's connection and owns the single session slot.
//!
//! This is a single-client design: the listener relays exactly one session
//! at a time. A new inbound connection displaces the previous session — the
//! collaborating game client reconnects through the same patched endpoint,
//! so the newest connection is authoritative.

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{error, info, instrument, warn};

use crate::config::RelayConfig;
use crate::error::Result;
use crate::transport::session::{RelaySession, SessionContext, SessionHandle};

/// Run the relay listener until ctrl-c
#[instrument(skip_all, fields(address = %config.listener.address))]
pub async fn run(config: &RelayConfig, ctx: SessionContext) -> Result<()> {
    // Create internal shutdown channel
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);

    // Set up ctrl-c handler that sends to our internal shutdown channel
    tokio::spawn(async move {
        if let Ok(()) = tokio::signal::ctrl_c().await {
            info!("Received CTRL+C signal, shutting down");
            let _ = shutdown_tx.send(()).await;
        }
    });

    run_with_shutdown(config, ctx, shutdown_rx).await
}

/// Run the relay listener with an external shutdown channel
#[instrument(skip_all, fields(address = %config.listener.address))]
pub async fn run_with_shutdown(
    config: &RelayConfig,
    ctx: SessionContext,
    mut shutdown_rx: mpsc::Receiver<()>,
) -> Result<()> {
    let listener = TcpListener::bind(&config.listener.address).await?;
    info!("listening for game client");

    let mut active: Option<SessionHandle> = None;

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                info!("shutting down listener");

                if let Some(session) = active.take() {
                    session.disconnect();
                    if timeout(config.listener.shutdown_timeout, session.wait_closed())
                        .await
                        .is_err()
                    {
                        warn!("shutdown timeout reached before session closed");
                    }
                }

                return Ok(());
            }

            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        info!(peer = %peer, "game client connected");

                        // Single session slot: the newest client wins.
                        if let Some(previous) = active.take() {
                            info!("displacing previous session");
                            previous.disconnect();
                            previous.wait_closed().await;
                        }

                        match RelaySession::connect(stream, &config.remote, ctx.clone()).await {
                            Ok(session) => active = Some(session.handle()),
                            Err(e) => {
                                error!(error = %e, "failed to reach upstream; dropping client");
                            }
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "error accepting connection");
                    }
                }
            }
        }
    }
}
