//! Transient notices: the toast strip at the top of a screen.

use std::time::{Duration, Instant};

/// Notices stay up this long unless the screen overrides it.
pub const NOTICE_TTL: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

/// One visible notice at a time; a new one replaces whatever is showing.
/// Expiry is evaluated on read, so no timer task is needed.
#[derive(Debug)]
pub struct NoticeBoard {
    slot: Option<(Notice, Instant)>,
    ttl: Duration,
}

impl Default for NoticeBoard {
    fn default() -> Self {
        Self::with_ttl(NOTICE_TTL)
    }
}

impl NoticeBoard {
    pub fn with_ttl(ttl: Duration) -> Self {
        Self { slot: None, ttl }
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.post(NoticeKind::Success, message.into());
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.post(NoticeKind::Error, message.into());
    }

    fn post(&mut self, kind: NoticeKind, message: String) {
        self.slot = Some((Notice { kind, message }, Instant::now()));
    }

    /// The notice to render right now, if it has not aged out.
    pub fn current(&self) -> Option<&Notice> {
        match &self.slot {
            Some((notice, posted)) if posted.elapsed() < self.ttl => Some(notice),
            _ => None,
        }
    }

    pub fn clear(&mut self) {
        self.slot = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_notice_wins() {
        let mut board = NoticeBoard::default();
        board.success("guardado");
        board.error("falló");
        let current = board.current().unwrap();
        assert_eq!(current.kind, NoticeKind::Error);
        assert_eq!(current.message, "falló");
    }

    #[test]
    fn notices_age_out() {
        let mut board = NoticeBoard::with_ttl(Duration::ZERO);
        board.success("fugaz");
        assert!(board.current().is_none());
    }

    #[test]
    fn clear_removes_the_notice() {
        let mut board = NoticeBoard::default();
        board.success("visible");
        assert!(board.current().is_some());
        board.clear();
        assert!(board.current().is_none());
    }
}
