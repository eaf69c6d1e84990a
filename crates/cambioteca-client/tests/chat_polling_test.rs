//! The conversation controller against the stub backend: cursor-driven
//! polling, the draft round trip, and the teardown rules. Intervals are
//! shortened so a whole polling cycle fits in a test.

mod support;

use std::sync::atomic::Ordering;
use std::time::Duration;

use cambioteca_client::views::chat::ChatController;
use cambioteca_types::events::ChatEvent;
use cambioteca_types::models::ConversationSummary;

use support::{ANA, BENJA};

/// Poll `probe` until it holds or `deadline` passes.
async fn wait_until(deadline: Duration, mut probe: impl FnMut() -> bool) -> bool {
    let started = std::time::Instant::now();
    while started.elapsed() < deadline {
        if probe() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    probe()
}

async fn ana_conversation(ana: &cambioteca_client::ApiClient) -> ConversationSummary {
    ana.conversations(ANA.2)
        .await
        .expect("conversation list should load")
        .into_iter()
        .next()
        .expect("accepting should have opened a conversation")
}

#[tokio::test]
async fn opening_loads_history_and_marks_it_seen() {
    let server = support::server().await;
    let ana = support::client(&server);
    let benja = support::client(&server);
    support::login(&ana, ANA).await;
    support::login(&benja, BENJA).await;

    let (_, _, conversation_id) = support::accepted_exchange(&ana, &benja).await;
    benja
        .send_message(conversation_id, BENJA.2, "¡Hola! ¿Dónde nos juntamos?")
        .await
        .unwrap();
    benja
        .send_message(conversation_id, BENJA.2, "Puedo el sábado.")
        .await
        .unwrap();

    let summary = ana_conversation(&ana).await;
    assert_eq!(summary.counterpart.username, "benja");
    assert!(!summary.is_completed());

    let controller = ChatController::open(ana.clone(), &summary).await.unwrap();
    let messages = controller.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(controller.last_message_id(), Some(messages[1].id));
    assert!(!controller.is_completed());

    assert!(server.hits().seen_marks.load(Ordering::Relaxed) >= 1);
    let market = server.state().market();
    let record = market.conversation(conversation_id).unwrap();
    assert_eq!(record.seen.get(&ANA.2), Some(&messages[1].id));
}

#[tokio::test]
async fn polling_picks_up_messages_after_the_cursor() {
    let server = support::server().await;
    let ana = support::client(&server);
    let benja = support::client(&server);
    support::login(&ana, ANA).await;
    support::login(&benja, BENJA).await;

    let (_, _, conversation_id) = support::accepted_exchange(&ana, &benja).await;
    let summary = ana_conversation(&ana).await;
    let controller =
        ChatController::open_with_interval(ana.clone(), &summary, Duration::from_millis(50))
            .await
            .unwrap();
    let mut events = controller.subscribe();
    assert!(controller.messages().is_empty());

    benja
        .send_message(conversation_id, BENJA.2, "¡Hola!")
        .await
        .unwrap();

    let arrived = wait_until(Duration::from_secs(2), || {
        controller.messages().len() == 1
    })
    .await;
    assert!(arrived, "the poller should pick the message up");
    assert_eq!(controller.messages()[0].body, "¡Hola!");
    assert_eq!(controller.messages()[0].sender_id, BENJA.2);
    assert!(matches!(
        events.try_recv(),
        Ok(ChatEvent::MessagesAppended { count: 1, .. })
    ));
}

#[tokio::test]
async fn send_trims_and_clears_the_draft() {
    let server = support::server().await;
    let ana = support::client(&server);
    let benja = support::client(&server);
    support::login(&ana, ANA).await;
    support::login(&benja, BENJA).await;

    let (_, _, conversation_id) = support::accepted_exchange(&ana, &benja).await;
    let summary = ana_conversation(&ana).await;
    let controller = ChatController::open(ana.clone(), &summary).await.unwrap();

    controller.set_draft("  Hola benja  ");
    controller.send().await.unwrap();
    assert!(controller.draft().is_empty());
    let messages = controller.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].body, "Hola benja");
    assert_eq!(messages[0].sender_id, ANA.2);

    // The other side sees it on its next fetch.
    let theirs = benja.messages(conversation_id, None).await.unwrap();
    assert_eq!(theirs.len(), 1);
    assert_eq!(theirs[0].body, "Hola benja");
}

#[tokio::test]
async fn a_blank_draft_sends_nothing() {
    let server = support::server().await;
    let ana = support::client(&server);
    let benja = support::client(&server);
    support::login(&ana, ANA).await;
    support::login(&benja, BENJA).await;

    let (_, _, conversation_id) = support::accepted_exchange(&ana, &benja).await;
    let summary = ana_conversation(&ana).await;
    let controller = ChatController::open(ana.clone(), &summary).await.unwrap();

    controller.set_draft("   ");
    controller.send().await.unwrap();
    assert!(controller.messages().is_empty());
    let market = server.state().market();
    assert!(market.conversation(conversation_id).unwrap().messages.is_empty());
}

#[tokio::test]
async fn dropping_the_controller_stops_the_polling() {
    let server = support::server().await;
    let ana = support::client(&server);
    let benja = support::client(&server);
    support::login(&ana, ANA).await;
    support::login(&benja, BENJA).await;

    support::accepted_exchange(&ana, &benja).await;
    let summary = ana_conversation(&ana).await;
    let controller =
        ChatController::open_with_interval(ana.clone(), &summary, Duration::from_millis(25))
            .await
            .unwrap();

    let polled = wait_until(Duration::from_secs(2), || {
        server.hits().message_lists.load(Ordering::Relaxed) >= 3
    })
    .await;
    assert!(polled, "the poller should have fetched a few times");

    drop(controller);
    tokio::time::sleep(Duration::from_millis(100)).await;
    let settled = server.hits().message_lists.load(Ordering::Relaxed);
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(
        server.hits().message_lists.load(Ordering::Relaxed),
        settled,
        "no fetches may happen after the controller is gone"
    );
}

#[tokio::test]
async fn completed_conversations_open_readonly_and_never_poll() {
    let server = support::server().await;
    let ana = support::client(&server);
    let benja = support::client(&server);
    support::login(&ana, ANA).await;
    support::login(&benja, BENJA).await;

    let (_, exchange_id, _) = support::accepted_exchange(&ana, &benja).await;
    support::complete_exchange(&ana, &benja, exchange_id).await;

    let summary = ana_conversation(&ana).await;
    assert!(summary.is_completed());

    let before = server.hits().message_lists.load(Ordering::Relaxed);
    let controller =
        ChatController::open_with_interval(ana.clone(), &summary, Duration::from_millis(25))
            .await
            .unwrap();
    assert!(controller.is_completed());

    tokio::time::sleep(Duration::from_millis(250)).await;
    // One history fetch at open, nothing afterwards, and no seen mark.
    assert_eq!(
        server.hits().message_lists.load(Ordering::Relaxed),
        before + 1
    );
    assert_eq!(server.hits().seen_marks.load(Ordering::Relaxed), 0);

    let err = controller.send().await.expect_err("read-only conversation");
    assert_eq!(err.detail(), Some("La conversación ya está cerrada."));
}

#[tokio::test]
async fn a_send_refusal_with_detail_closes_the_conversation() {
    let server = support::server().await;
    let ana = support::client(&server);
    let benja = support::client(&server);
    support::login(&ana, ANA).await;
    support::login(&benja, BENJA).await;

    let (_, exchange_id, _) = support::accepted_exchange(&ana, &benja).await;
    let summary = ana_conversation(&ana).await;
    let controller =
        ChatController::open_with_interval(ana.clone(), &summary, Duration::from_millis(50))
            .await
            .unwrap();
    let mut events = controller.subscribe();

    // The exchange completes underneath the open chat.
    support::complete_exchange(&ana, &benja, exchange_id).await;

    controller.set_draft("¿Sigues ahí?");
    let err = controller.send().await.expect_err("the backend refuses now");
    assert!(err.is_conflict());
    assert_eq!(
        err.detail(),
        Some("El intercambio fue completado. La conversación está cerrada.")
    );

    assert!(controller.is_completed());
    assert_eq!(
        controller.close_reason().as_deref(),
        Some("El intercambio fue completado. La conversación está cerrada.")
    );
    // Nothing typed is lost.
    assert_eq!(controller.draft(), "¿Sigues ahí?");

    let mut closed = None;
    while let Ok(event) = events.try_recv() {
        if let ChatEvent::ConversationClosed { reason, .. } = event {
            closed = Some(reason);
            break;
        }
    }
    assert_eq!(
        closed.as_deref(),
        Some("El intercambio fue completado. La conversación está cerrada.")
    );
}
