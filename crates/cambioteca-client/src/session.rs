use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use tokio::sync::broadcast;
use tracing::warn;

use cambioteca_types::events::SessionEvent;
use cambioteca_types::models::{Session, User};

/// Holds the active session and tells subscribers when it changes.
///
/// Cloning is cheap; every clone shares the same state. There is no global
/// instance: whoever wires the application together owns one and hands it
/// to the API client and the views.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

struct SessionStoreInner {
    /// Session change events — every subscriber receives every event
    events_tx: broadcast::Sender<SessionEvent>,

    current: RwLock<Option<Session>>,

    /// Where the session survives restarts. `None` keeps it in memory.
    file: Option<PathBuf>,
}

impl SessionStore {
    pub fn in_memory() -> Self {
        Self::build(None)
    }

    /// A store persisted to `path`. An existing file restores the previous
    /// session; a corrupt one is ignored and overwritten on next login.
    pub fn with_file(path: impl Into<PathBuf>) -> Self {
        Self::build(Some(path.into()))
    }

    fn build(file: Option<PathBuf>) -> Self {
        let (events_tx, _) = broadcast::channel(64);
        let current = file.as_deref().and_then(|path| {
            let bytes = std::fs::read(path).ok()?;
            match serde_json::from_slice::<Session>(&bytes) {
                Ok(session) => Some(session),
                Err(err) => {
                    warn!("ignoring unreadable session file {}: {err}", path.display());
                    None
                }
            }
        });
        Self {
            inner: Arc::new(SessionStoreInner {
                events_tx,
                current: RwLock::new(current),
                file,
            }),
        }
    }

    /// Subscribe to session events. Returns a broadcast receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events_tx.subscribe()
    }

    /// Install a fresh session after a successful login.
    pub fn establish(&self, session: Session) {
        let user = session.user.clone();
        {
            let mut current = self.write_lock();
            *current = Some(session);
        }
        self.persist();
        let _ = self.inner.events_tx.send(SessionEvent::LoggedIn(user));
    }

    /// Drop the session. Safe to call when already logged out; the event
    /// only fires on an actual transition.
    pub fn clear(&self) {
        let had_session = {
            let mut current = self.write_lock();
            current.take().is_some()
        };
        if let Some(path) = &self.inner.file {
            if let Err(err) = std::fs::remove_file(path) {
                if err.kind() != std::io::ErrorKind::NotFound {
                    warn!("could not remove session file {}: {err}", path.display());
                }
            }
        }
        if had_session {
            let _ = self.inner.events_tx.send(SessionEvent::LoggedOut);
        }
    }

    /// Replace the stored account data, keeping the token.
    pub fn update_user(&self, user: User) {
        let updated = {
            let mut current = self.write_lock();
            match current.as_mut() {
                Some(session) => {
                    session.user = user.clone();
                    true
                }
                None => false,
            }
        };
        if updated {
            self.persist();
            let _ = self.inner.events_tx.send(SessionEvent::ProfileUpdated(user));
        }
    }

    /// Update only the avatar path, as the profile editor does after an
    /// avatar upload.
    pub fn update_avatar(&self, avatar_path: impl Into<String>) {
        let user = {
            let mut current = self.write_lock();
            match current.as_mut() {
                Some(session) => {
                    session.user.avatar_path = Some(avatar_path.into());
                    Some(session.user.clone())
                }
                None => None,
            }
        };
        if let Some(user) = user {
            self.persist();
            let _ = self.inner.events_tx.send(SessionEvent::ProfileUpdated(user));
        }
    }

    pub fn current_user(&self) -> Option<User> {
        self.read_lock().as_ref().map(|s| s.user.clone())
    }

    pub fn token(&self) -> Option<String> {
        self.read_lock().as_ref().map(|s| s.access_token.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.read_lock().is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.read_lock().as_ref().is_some_and(|s| s.user.is_admin)
    }

    pub fn user_id(&self) -> Option<i64> {
        self.read_lock().as_ref().map(|s| s.user.id)
    }

    fn persist(&self) {
        let Some(path) = &self.inner.file else {
            return;
        };
        let snapshot = self.read_lock().clone();
        let Some(session) = snapshot else {
            return;
        };
        let result = serde_json::to_vec_pretty(&session)
            .map_err(std::io::Error::other)
            .and_then(|bytes| std::fs::write(path, bytes));
        if let Err(err) = result {
            // A session that only lives until exit is still a session.
            warn!("could not persist session to {}: {err}", path.display());
        }
    }

    fn read_lock(&self) -> std::sync::RwLockReadGuard<'_, Option<Session>> {
        self.inner.current.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_lock(&self) -> std::sync::RwLockWriteGuard<'_, Option<Session>> {
        self.inner.current.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn sample_user(id: i64, admin: bool) -> User {
        User {
            id,
            username: format!("user{id}"),
            email: format!("user{id}@example.cl"),
            given_names: None,
            paternal_surname: None,
            maternal_surname: None,
            phone: None,
            address: None,
            avatar_path: None,
            is_admin: admin,
        }
    }

    fn sample_session(id: i64) -> Session {
        Session {
            access_token: format!("token-{id}"),
            user: sample_user(id, false),
        }
    }

    fn temp_session_file() -> PathBuf {
        static COUNTER: AtomicU32 = AtomicU32::new(0);
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!(
            "cambioteca-session-{}-{n}.json",
            std::process::id()
        ))
    }

    #[test]
    fn starts_logged_out() {
        let store = SessionStore::in_memory();
        assert!(!store.is_authenticated());
        assert!(store.current_user().is_none());
        assert!(store.token().is_none());
    }

    #[test]
    fn establish_then_clear_round_trip() {
        let store = SessionStore::in_memory();
        let mut events = store.subscribe();

        store.establish(sample_session(7));
        assert!(store.is_authenticated());
        assert_eq!(store.user_id(), Some(7));
        assert_eq!(store.token().as_deref(), Some("token-7"));
        assert!(matches!(
            events.try_recv(),
            Ok(SessionEvent::LoggedIn(user)) if user.id == 7
        ));

        store.clear();
        assert!(!store.is_authenticated());
        assert!(matches!(events.try_recv(), Ok(SessionEvent::LoggedOut)));
    }

    #[test]
    fn clearing_twice_fires_once() {
        let store = SessionStore::in_memory();
        let mut events = store.subscribe();
        store.establish(sample_session(1));
        store.clear();
        store.clear();
        assert!(matches!(events.try_recv(), Ok(SessionEvent::LoggedIn(_))));
        assert!(matches!(events.try_recv(), Ok(SessionEvent::LoggedOut)));
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn avatar_update_requires_a_session() {
        let store = SessionStore::in_memory();
        let mut events = store.subscribe();
        store.update_avatar("avatars/nuevo.jpg");
        assert!(events.try_recv().is_err());

        store.establish(sample_session(3));
        store.update_avatar("avatars/nuevo.jpg");
        let _ = events.try_recv(); // LoggedIn
        match events.try_recv() {
            Ok(SessionEvent::ProfileUpdated(user)) => {
                assert_eq!(user.avatar_path.as_deref(), Some("avatars/nuevo.jpg"));
            }
            other => panic!("expected ProfileUpdated, got {other:?}"),
        }
    }

    #[test]
    fn session_survives_a_restart() {
        let path = temp_session_file();
        {
            let store = SessionStore::with_file(&path);
            store.establish(sample_session(11));
        }
        let restored = SessionStore::with_file(&path);
        assert!(restored.is_authenticated());
        assert_eq!(restored.user_id(), Some(11));

        restored.clear();
        assert!(!path.exists());
        let after_logout = SessionStore::with_file(&path);
        assert!(!after_logout.is_authenticated());
    }

    #[test]
    fn corrupt_session_file_is_ignored() {
        let path = temp_session_file();
        std::fs::write(&path, b"{not json").unwrap();
        let store = SessionStore::with_file(&path);
        assert!(!store.is_authenticated());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn admin_flag_comes_from_the_user() {
        let store = SessionStore::in_memory();
        store.establish(Session {
            access_token: "t".into(),
            user: sample_user(1, true),
        });
        assert!(store.is_admin());
    }
}
