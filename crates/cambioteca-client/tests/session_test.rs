//! Session lifetime against the stub backend: login fills the store and
//! notifies subscribers, a refused token tears the session down, and a
//! persisted session survives a restart.

mod support;

use cambioteca_client::SessionStore;
use cambioteca_types::events::SessionEvent;
use cambioteca_types::models::Session;

use support::{ANA, BENJA};

#[tokio::test]
async fn login_fills_the_store_and_notifies() {
    let server = support::server().await;
    let api = support::client(&server);
    let mut events = api.session().subscribe();

    let user = support::login(&api, ANA).await;
    assert_eq!(user.id, ANA.2);
    assert_eq!(user.username, "ana");
    assert!(api.session().is_authenticated());
    assert!(!api.session().is_admin());
    assert!(api.session().token().is_some());
    assert!(matches!(
        events.try_recv(),
        Ok(SessionEvent::LoggedIn(u)) if u.id == ANA.2
    ));

    api.logout();
    assert!(!api.session().is_authenticated());
    assert!(matches!(events.try_recv(), Ok(SessionEvent::LoggedOut)));
}

#[tokio::test]
async fn failed_login_carries_the_backend_wording() {
    let server = support::server().await;
    let api = support::client(&server);

    let err = api
        .login(ANA.0, "wrong-password")
        .await
        .expect_err("a bad password must not log in");
    assert!(err.is_unauthorized());
    assert_eq!(err.detail(), Some("Credenciales inválidas."));
    assert!(!api.session().is_authenticated());
}

#[tokio::test]
async fn disabled_accounts_cannot_log_in() {
    let server = support::server().await;
    server.state().market().user_mut(BENJA.2).unwrap().active = false;

    let api = support::client(&server);
    let err = api
        .login(BENJA.0, BENJA.1)
        .await
        .expect_err("a disabled account must be refused");
    assert_eq!(err.detail(), Some("Tu cuenta está deshabilitada."));
}

#[tokio::test]
async fn a_persisted_session_survives_a_restart() {
    let server = support::server().await;
    let path = std::env::temp_dir().join(format!(
        "cambioteca-e2e-session-{}.json",
        std::process::id()
    ));

    {
        let api = support::client_with(&server, SessionStore::with_file(&path));
        support::login(&api, ANA).await;
    }

    // A later run reads the file back and talks with the stored token.
    let restored = SessionStore::with_file(&path);
    assert_eq!(restored.user_id(), Some(ANA.2));
    let api = support::client_with(&server, restored);
    let books = api
        .my_books(ANA.2)
        .await
        .expect("the stored token should still be honored");
    assert_eq!(books.len(), 2);

    api.session().clear();
    assert!(!path.exists());
}

#[tokio::test]
async fn a_fabricated_token_passes_the_bearer_check() {
    let server = support::server().await;
    let user = server.state().market().user(ANA.2).unwrap().user.clone();
    let token = cambioteca_testkit::issue_token(&user).expect("token should sign");

    let store = SessionStore::in_memory();
    store.establish(Session {
        access_token: token,
        user,
    });
    let api = support::client_with(&server, store);
    let conversations = api
        .conversations(ANA.2)
        .await
        .expect("the fabricated token should be accepted");
    assert!(conversations.is_empty());
}

#[tokio::test]
async fn a_rejected_token_destroys_the_session() {
    let server = support::server().await;
    let user = server.state().market().user(ANA.2).unwrap().user.clone();

    let store = SessionStore::in_memory();
    store.establish(Session {
        access_token: "no-longer-valid".into(),
        user,
    });
    let api = support::client_with(&server, store);
    let mut events = api.session().subscribe();

    let err = api
        .my_books(ANA.2)
        .await
        .expect_err("a stale token must be refused");
    assert!(err.is_unauthorized());
    assert_eq!(err.detail(), Some("Token inválido o expirado."));
    assert!(!api.session().is_authenticated());
    assert!(matches!(events.try_recv(), Ok(SessionEvent::LoggedOut)));
}

#[tokio::test]
async fn change_password_requires_the_current_one() {
    let server = support::server().await;
    let api = support::client(&server);
    support::login(&api, ANA).await;

    let err = api
        .change_password("not-my-password", "otra-clave-123")
        .await
        .expect_err("a wrong current password must be refused");
    assert_eq!(err.detail(), Some("La contraseña actual es incorrecta."));

    api.change_password(ANA.1, "otra-clave-123")
        .await
        .expect("change should go through");
    api.logout();
    api.login(ANA.0, "otra-clave-123")
        .await
        .expect("the new password should log in");
}

#[tokio::test]
async fn password_recovery_round_trip() {
    let server = support::server().await;
    let api = support::client(&server);

    // The answer never says whether the address exists.
    api.forgot_password(ANA.0).await.expect("known address");
    api.forgot_password("nadie@cambioteca.cl")
        .await
        .expect("unknown address answers politely too");

    let err = api
        .reset_password("reset-1", "clave-nueva-1", "clave-distinta")
        .await
        .expect_err("mismatched confirmation must be refused");
    assert_eq!(err.detail(), Some("Las contraseñas no coinciden."));

    api.reset_password("reset-1", "clave-nueva-1", "clave-nueva-1")
        .await
        .expect("matching confirmation should reset");
    api.login(ANA.0, "clave-nueva-1")
        .await
        .expect("the reset password should log in");
}
