// test-only module included via protocol/mod.rs
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use crate::core::message::{Direction, RelayMessage};
use crate::protocol::commands::{chat_text, command_fn, CommandRouter};
use crate::protocol::handshake::{is_handshake_kind, HandshakeTracker};
use crate::protocol::hooks::{hook_fn, DirectionFilter, HookRegistry, KindFilter};

fn noop_hook() -> std::sync::Arc<dyn crate::protocol::hooks::Hook> {
    hook_fn(|_ctx| async { Ok(()) })
}

#[tokio::test]
async fn test_select_concrete_kind_before_wildcard() {
    let registry = HookRegistry::new();

    let wildcard = registry
        .register(DirectionFilter::Any, KindFilter::Any, noop_hook())
        .await;
    let concrete = registry
        .register(
            DirectionFilter::Only(Direction::FromClient),
            KindFilter::Exact("pubMsg".to_owned()),
            noop_hook(),
        )
        .await;

    let selected = registry.select(Direction::FromClient, "pubMsg").await;
    let ids: Vec<_> = selected.iter().map(|entry| entry.id).collect();
    assert_eq!(ids, vec![concrete, wildcard]);
}

#[tokio::test]
async fn test_select_respects_direction_filter() {
    let registry = HookRegistry::new();

    registry
        .register(
            DirectionFilter::Only(Direction::FromServer),
            KindFilter::Exact("rj".to_owned()),
            noop_hook(),
        )
        .await;

    assert_eq!(registry.select(Direction::FromServer, "rj").await.len(), 1);
    assert!(registry.select(Direction::FromClient, "rj").await.is_empty());
    assert!(registry.select(Direction::FromServer, "other").await.is_empty());
}

#[tokio::test]
async fn test_empty_kind_matches_wildcard_only() {
    let registry = HookRegistry::new();

    registry
        .register(
            DirectionFilter::Any,
            KindFilter::Exact("pubMsg".to_owned()),
            noop_hook(),
        )
        .await;
    let wildcard = registry
        .register(DirectionFilter::Any, KindFilter::Any, noop_hook())
        .await;

    let selected = registry.select(Direction::FromServer, "").await;
    let ids: Vec<_> = selected.iter().map(|entry| entry.id).collect();
    assert_eq!(ids, vec![wildcard]);
}

#[tokio::test]
async fn test_unregister_removes_exactly_one_entry() {
    let registry = HookRegistry::new();

    let first = registry
        .register(DirectionFilter::Any, KindFilter::Any, noop_hook())
        .await;
    let second = registry
        .register(DirectionFilter::Any, KindFilter::Any, noop_hook())
        .await;

    assert!(registry.unregister(first).await);
    assert!(!registry.unregister(first).await);
    assert_eq!(registry.len().await, 1);

    let selected = registry.select(Direction::FromClient, "anything").await;
    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].id, second);
}

#[tokio::test]
async fn test_duplicate_command_registration_is_noop() {
    let router = CommandRouter::new();

    assert!(
        router
            .register("color", "first registration", command_fn(|_, _| async { Ok(()) }))
            .await
    );
    assert!(
        !router
            .register("color", "second registration", command_fn(|_, _| async { Ok(()) }))
            .await
    );

    let descriptions = router.descriptions().await;
    assert_eq!(descriptions.len(), 1);
    assert_eq!(descriptions[0].1, "first registration");
}

#[test]
fn test_chat_text_tokenized() {
    let msg = RelayMessage::decode(Direction::FromClient, "%xt%t%ua%hello world%".to_owned())
        .unwrap();
    assert_eq!(chat_text(&msg).as_deref(), Some("hello world"));
}

#[test]
fn test_chat_text_xml_cdata() {
    let frame = r#"<msg t="sys"><body action="pubMsg" r="1"><txt><![CDATA[!color red]]></txt></body></msg>"#;
    let msg = RelayMessage::decode(Direction::FromClient, frame.to_owned()).unwrap();
    assert_eq!(chat_text(&msg).as_deref(), Some("!color red"));
}

#[test]
fn test_chat_text_json_is_not_scanned() {
    let msg = RelayMessage::decode(
        Direction::FromClient,
        r#"{"b":{"o":{"_cmd":"chat"}}}"#.to_owned(),
    )
    .unwrap();
    assert_eq!(chat_text(&msg), None);
}

#[test]
fn test_handshake_kind_set() {
    assert!(is_handshake_kind("verChk"));
    assert!(is_handshake_kind("rndK"));
    assert!(!is_handshake_kind("login"));
    assert!(!is_handshake_kind("pubMsg"));
    assert!(!is_handshake_kind(""));
}

#[test]
fn test_handshake_tracker_phases() {
    let tracker = HandshakeTracker::new();
    assert!(!tracker.interrupted());

    tracker.record_echo();
    assert!(tracker.interrupted());

    tracker.record_login();
    assert!(!tracker.interrupted());
}
