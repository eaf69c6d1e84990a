//! Shared harness: one stub backend per test, a client wired against it,
//! and shortcuts through the proposal flow for the tests that start from
//! an already-accepted exchange.

#![allow(dead_code)]

use std::time::Duration;

use cambioteca_client::{ApiClient, ClientConfig, SessionStore};
use cambioteca_testkit::TestServer;
use cambioteca_types::api::CreateProposalRequest;
use cambioteca_types::models::{ProposalStatus, User};

/// Seeded accounts as (email, password, user id).
pub const ANA: (&str, &str, i64) = ("ana@cambioteca.cl", "ana-secret", 1);
pub const BENJA: (&str, &str, i64) = ("benja@cambioteca.cl", "benja-secret", 2);
pub const ADMIN: (&str, &str, i64) = ("admin@cambioteca.cl", "admin-secret", 9);

pub async fn server() -> TestServer {
    TestServer::spawn().await.expect("stub backend should start")
}

pub fn client(server: &TestServer) -> ApiClient {
    client_with(server, SessionStore::in_memory())
}

pub fn client_with(server: &TestServer, session: SessionStore) -> ApiClient {
    let mut config = ClientConfig::new(server.base_url());
    config.request_timeout = Duration::from_secs(5);
    ApiClient::new(&config, session).expect("client should build")
}

pub async fn login(api: &ApiClient, who: (&str, &str, i64)) -> User {
    api.login(who.0, who.1)
        .await
        .expect("seeded login should succeed")
}

/// Ana asks Benja for Dune (book 42) offering her Rayuela (book 7), and
/// Benja accepts. Returns (proposal_id, exchange_id, conversation_id).
pub async fn accepted_exchange(ana: &ApiClient, benja: &ApiClient) -> (i64, i64, i64) {
    let req = CreateProposalRequest {
        requester_id: ANA.2,
        requested_book_id: 42,
        offered_book_ids: vec![7],
    };
    ana.create_proposal(&req)
        .await
        .expect("proposal should be created");
    let inbox = benja
        .received_proposals(BENJA.2)
        .await
        .expect("inbox should load");
    let pending = inbox
        .iter()
        .find(|p| p.status == ProposalStatus::Pending && p.requested_book.id == 42)
        .expect("the new proposal should be pending");
    benja
        .accept_proposal(pending.id, BENJA.2, 7)
        .await
        .expect("recipient should be able to accept");
    let sent = ana.sent_proposals(ANA.2).await.expect("outbox should load");
    let accepted = sent
        .iter()
        .find(|p| p.id == pending.id)
        .expect("accepted proposal should still be listed");
    (
        accepted.id,
        accepted
            .exchange_id
            .expect("accepting should open an exchange"),
        accepted
            .conversation_id
            .expect("accepting should open a conversation"),
    )
}

/// Walk an accepted exchange to completion: Benja schedules, Ana agrees,
/// the code is minted and redeemed.
pub async fn complete_exchange(ana: &ApiClient, benja: &ApiClient, exchange_id: i64) {
    benja
        .propose_meeting(
            exchange_id,
            BENJA.2,
            "Biblioteca Nacional",
            "2025-06-01T15:00",
        )
        .await
        .expect("offerer should be able to schedule");
    ana.confirm_meeting(exchange_id, ANA.2, true)
        .await
        .expect("requester should be able to confirm");
    let code = benja
        .generate_code(exchange_id, BENJA.2)
        .await
        .expect("offerer should get a code");
    ana.complete_exchange(exchange_id, ANA.2, &code.code)
        .await
        .expect("requester should redeem the code");
}
