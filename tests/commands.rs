//! Chat command routing over a live relay session

#![allow(clippy::expect_used, clippy::unwrap_used)]

use futures::{SinkExt, StreamExt};
use relay_core::config::RelayTunables;
use relay_core::core::codec::FrameCodec;
use relay_core::error::RelayError;
use relay_core::protocol::commands::CommandRouter;
use relay_core::protocol::hooks::HookRegistry;
use relay_core::transport::session::{RelaySession, SessionContext, SessionHandle};
use relay_core::utils::metrics::RelayMetrics;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::DuplexStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::codec::Framed;

type Wire = Framed<DuplexStream, FrameCodec>;

/// Session with the command router attached for the default chat kinds.
async fn relay_with_router(router: Arc<CommandRouter>) -> (SessionHandle, Wire, Wire) {
    let registry = HookRegistry::new();
    let tunables = RelayTunables::default();
    router.attach(&registry, &tunables.chat_kinds).await;

    let (client_io, local_io) = tokio::io::duplex(16 * 1024);
    let (server_io, remote_io) = tokio::io::duplex(16 * 1024);

    let metrics = Arc::new(RelayMetrics::new());
    let ctx = SessionContext::new(registry, metrics, &tunables);
    let session = RelaySession::attach(local_io, remote_io, ctx);

    (
        session.handle(),
        Framed::new(client_io, FrameCodec::new()),
        Framed::new(server_io, FrameCodec::new()),
    )
}

async fn recv(wire: &mut Wire) -> String {
    timeout(Duration::from_secs(2), wire.next())
        .await
        .expect("timed out waiting for frame")
        .expect("stream ended unexpectedly")
        .expect("frame error")
}

fn chat_frame(text: &str) -> String {
    format!(r#"<msg t="sys"><body action="pubMsg" r="1"><txt><![CDATA[{text}]]></txt></body></msg>"#)
}

#[tokio::test]
async fn test_bare_command_suppresses_and_invokes_with_empty_args() {
    let router = CommandRouter::new();
    let (args_tx, mut args_rx) = mpsc::unbounded_channel::<Vec<String>>();

    router
        .register_fn("color", "toggle chat color", move |args, _session| {
            let args_tx = args_tx.clone();
            async move {
                let _ = args_tx.send(args);
                Ok(())
            }
        })
        .await;

    let (_handle, mut client, mut server) = relay_with_router(router).await;

    client.send(chat_frame("!color")).await.unwrap();

    let args = timeout(Duration::from_secs(2), args_rx.recv())
        .await
        .expect("command never invoked")
        .expect("channel closed");
    assert!(args.is_empty());

    // A command invocation never reaches the server as chat: the next thing
    // the server sees is the ordinary message sent afterwards.
    client.send(chat_frame("hello")).await.unwrap();
    assert_eq!(recv(&mut server).await, chat_frame("hello"));
}

#[tokio::test]
async fn test_plain_chat_is_forwarded_and_invokes_nothing() {
    let router = CommandRouter::new();
    let (args_tx, mut args_rx) = mpsc::unbounded_channel::<Vec<String>>();

    router
        .register_fn("hello", "should never fire", move |args, _session| {
            let args_tx = args_tx.clone();
            async move {
                let _ = args_tx.send(args);
                Ok(())
            }
        })
        .await;

    let (_handle, mut client, mut server) = relay_with_router(router).await;

    client.send(chat_frame("hello")).await.unwrap();

    assert_eq!(recv(&mut server).await, chat_frame("hello"));
    assert!(args_rx.try_recv().is_err(), "no command should have fired");
}

#[tokio::test]
async fn test_tokenized_chat_command_with_arguments() {
    let router = CommandRouter::new();
    let (args_tx, mut args_rx) = mpsc::unbounded_channel::<Vec<String>>();

    router
        .register_fn("tp", "teleport to coordinates", move |args, _session| {
            let args_tx = args_tx.clone();
            async move {
                let _ = args_tx.send(args);
                Ok(())
            }
        })
        .await;

    let (_handle, mut client, mut server) = relay_with_router(router).await;

    client.send("%xt%t%ua%!tp 100 200%".to_owned()).await.unwrap();

    let args = timeout(Duration::from_secs(2), args_rx.recv())
        .await
        .expect("command never invoked")
        .expect("channel closed");
    assert_eq!(args, vec!["100".to_owned(), "200".to_owned()]);

    client.send("%xt%t%ua%plain%".to_owned()).await.unwrap();
    assert_eq!(recv(&mut server).await, "%xt%t%ua%plain%");
}

#[tokio::test]
async fn test_unknown_command_is_silently_swallowed() {
    let router = CommandRouter::new();
    let (_handle, mut client, mut server) = relay_with_router(router).await;

    client.send(chat_frame("!nosuchcommand")).await.unwrap();
    client.send(chat_frame("after")).await.unwrap();

    // Still suppressed, no error raised, traffic keeps flowing.
    assert_eq!(recv(&mut server).await, chat_frame("after"));
}

#[tokio::test]
async fn test_failing_command_is_reported_not_propagated() {
    let router = CommandRouter::new();

    router
        .register_fn("boom", "always fails", |_args, _session| async {
            Err(RelayError::Custom("deliberate command failure".to_owned()))
        })
        .await;

    let (handle, mut client, mut server) = relay_with_router(router).await;

    client.send(chat_frame("!boom")).await.unwrap();
    client.send(chat_frame("after")).await.unwrap();

    assert_eq!(recv(&mut server).await, chat_frame("after"));

    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while handle.metrics().snapshot().command_failures == 0 {
        assert!(
            tokio::time::Instant::now() < deadline,
            "command failure never recorded"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test]
async fn test_command_can_reply_through_the_session() {
    let router = CommandRouter::new();

    router
        .register_fn("ping", "reply locally", |_args, session| async move {
            session.send_local("%xt%t%pong%%".to_owned()).await?;
            Ok(())
        })
        .await;

    let (_handle, mut client, _server) = relay_with_router(router).await;

    client.send("%xt%t%ua%!ping%".to_owned()).await.unwrap();

    // The command's reply comes back on the local socket.
    assert_eq!(recv(&mut client).await, "%xt%t%pong%%");
}
