//! One full exchange, end to end, driven through the screen controllers
//! the way the pages drive them: Ana proposes her Rayuela for Benja's
//! Dune, they schedule a meeting, the code changes hands, and both rate.

mod support;

use cambioteca_client::views::book_detail::BookDetailView;
use cambioteca_client::views::history::ExchangeHistoryView;
use cambioteca_client::views::proposals::ProposalsView;
use cambioteca_types::models::{ExchangeStatus, MeetingStatus, ProposalStatus};

use support::{ANA, BENJA};

#[tokio::test]
async fn a_full_exchange_from_proposal_to_mutual_rating() {
    let server = support::server().await;
    let ana = support::client(&server);
    let benja = support::client(&server);
    support::login(&ana, ANA).await;
    support::login(&benja, BENJA).await;

    // Ana finds Dune and offers her Rayuela for it.
    let mut book_page = BookDetailView::new(ana.clone(), 42);
    book_page.load().await;
    let mut form = book_page.propose_exchange();
    form.load().await;
    let offerable: Vec<i64> = form
        .offerable
        .ready()
        .expect("ana has books to offer")
        .iter()
        .map(|b| b.id)
        .collect();
    assert_eq!(offerable, vec![7, 8]);
    form.select(7);
    let confirmation = form.submit().await.unwrap();
    assert!(confirmation.contains("Dune"));

    // Benja sees it arrive and takes the single-offer shortcut.
    let mut inbox = ProposalsView::received(benja.clone());
    inbox.load().await;
    assert_eq!(inbox.rows().len(), 1);
    let proposal_id = inbox.rows()[0].proposal.id;
    assert!(inbox.can_accept_single_offer(proposal_id));
    inbox.accept_single_offer(proposal_id).await.unwrap();

    let row = &inbox.rows()[0];
    assert_eq!(row.proposal.status, ProposalStatus::Accepted);
    assert_eq!(row.proposal.accepted_book.as_ref().map(|b| b.id), Some(7));
    assert_eq!(row.meeting_status(), Some(MeetingStatus::Pending));
    let exchange_id = row.proposal.exchange_id.unwrap();

    // Both books are reserved while the exchange is alive.
    assert!(!ana.book(42).await.unwrap().available);
    assert!(!ana.book(7).await.unwrap().available);

    // Benja suggests where to meet; Ana sees the suggestion and agrees.
    inbox
        .propose_meeting(proposal_id, "Biblioteca Nacional", "2025-06-01T15:00")
        .await
        .unwrap();

    let mut outbox = ProposalsView::sent(ana.clone());
    outbox.load().await;
    let row = &outbox.rows()[0];
    assert_eq!(
        row.proposal.meeting_place.as_deref(),
        Some("Biblioteca Nacional")
    );
    assert_eq!(row.proposal.meeting_time.as_deref(), Some("2025-06-01T15:00"));
    assert_eq!(row.meeting_status(), Some(MeetingStatus::Pending));
    outbox.confirm_meeting(proposal_id, true).await.unwrap();
    assert!(outbox.rows()[0].place_confirmed());

    // At the meeting: Benja reads the code out, Ana types it in.
    let mut benja_history = ExchangeHistoryView::new(benja.clone());
    benja_history.load().await;
    assert!(benja_history.can_generate_code(exchange_id));
    assert!(!benja_history.can_complete(exchange_id));
    let code = benja_history.generate_code(exchange_id).await.unwrap();
    assert_eq!(code.code.len(), 6);

    let mut ana_history = ExchangeHistoryView::new(ana.clone());
    ana_history.load().await;
    assert!(ana_history.can_complete(exchange_id));
    assert!(!ana_history.can_generate_code(exchange_id));
    ana_history.complete(exchange_id, &code.code).await.unwrap();
    assert_eq!(
        ana_history.notices.current().map(|n| n.message.as_str()),
        Some("¡Intercambio completado con éxito!")
    );
    assert_eq!(
        ana_history.rows()[0].record.status,
        ExchangeStatus::Completed
    );

    // Completion shows everywhere: the mailboxes, the conversation list.
    outbox.load().await;
    assert_eq!(outbox.rows()[0].proposal.status, ProposalStatus::Completed);
    let conversation = ana
        .conversations(ANA.2)
        .await
        .unwrap()
        .into_iter()
        .next()
        .unwrap();
    assert!(conversation.is_completed());

    // One rating each, through different screens.
    assert!(outbox.can_rate(proposal_id));
    outbox
        .rate(proposal_id, 5, "  Excelente intercambio  ")
        .await
        .unwrap();
    assert!(outbox.has_rated(proposal_id));
    assert!(!outbox.can_rate(proposal_id));

    benja_history.load().await;
    assert!(benja_history.can_rate(exchange_id));
    benja_history
        .rate(exchange_id, 4, "Muy puntual")
        .await
        .unwrap();
    assert!(benja_history.has_rated(exchange_id));

    // A second rating from the same side never lands.
    let err = benja
        .rate_exchange(exchange_id, BENJA.2, 3, "")
        .await
        .expect_err("one rating per participant");
    assert!(err.is_conflict());

    // Each rating lands on the other participant's profile.
    let ana_metrics = ana.user_summary(ANA.2).await.unwrap().metrics;
    assert_eq!(ana_metrics.exchanges_completed, 1);
    assert_eq!(ana_metrics.average_rating, Some(4.0));
    assert_eq!(ana_metrics.ratings_count, 1);
    let benja_metrics = ana.user_summary(BENJA.2).await.unwrap().metrics;
    assert_eq!(benja_metrics.exchanges_completed, 1);
    assert_eq!(benja_metrics.average_rating, Some(5.0));

    // The comment survives with its whitespace trimmed.
    let benja_ratings = ana.user_ratings(BENJA.2).await.unwrap();
    let received = benja_ratings
        .iter()
        .find(|r| r.kind == cambioteca_types::models::RatingKind::Received)
        .unwrap();
    assert_eq!(received.comment.as_deref(), Some("Excelente intercambio"));
    assert_eq!(received.rater_username.as_deref(), Some("ana"));
}

#[tokio::test]
async fn a_mailbox_reload_keeps_the_rating_flags() {
    let server = support::server().await;
    let ana = support::client(&server);
    let benja = support::client(&server);
    support::login(&ana, ANA).await;
    support::login(&benja, BENJA).await;

    let (proposal_id, exchange_id, _) = support::accepted_exchange(&ana, &benja).await;
    support::complete_exchange(&ana, &benja, exchange_id).await;
    ana.rate_exchange(exchange_id, ANA.2, 5, "Todo bien")
        .await
        .unwrap();

    // A fresh load probes my-rating and recovers the flag.
    let mut outbox = ProposalsView::sent(ana.clone());
    outbox.load().await;
    assert!(outbox.has_rated(proposal_id));
    assert!(!outbox.can_rate(proposal_id));

    let mut inbox = ProposalsView::received(benja.clone());
    inbox.load().await;
    assert!(!inbox.has_rated(proposal_id));
    assert!(inbox.can_rate(proposal_id));
}
