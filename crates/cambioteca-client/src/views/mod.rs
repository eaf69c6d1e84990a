/// Headless view controllers: the state machines behind each screen,
/// with the rendering left to whatever frontend embeds them.
///
/// Every controller owns a [`ViewState`] and re-fetches server truth after
/// a mutation instead of computing the next state locally. Transient
/// confirmations go through a [`notice::NoticeBoard`]; validation problems
/// come back as [`crate::error::ApiError::Validation`] so forms can keep
/// them on screen until corrected.
pub mod admin;
pub mod book_detail;
pub mod chat;
pub mod history;
pub mod home;
pub mod notice;
pub mod proposal_detail;
pub mod proposals;

/// Where a screen's data stands. `Failed` carries the message the screen
/// shows in place of content.
#[derive(Debug, Clone, Default)]
pub enum ViewState<T> {
    #[default]
    Loading,
    Failed(String),
    Ready(T),
}

impl<T> ViewState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, ViewState::Loading)
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            ViewState::Ready(data) => Some(data),
            _ => None,
        }
    }

    pub fn ready_mut(&mut self) -> Option<&mut T> {
        match self {
            ViewState::Ready(data) => Some(data),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&str> {
        match self {
            ViewState::Failed(message) => Some(message),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_state_starts_loading() {
        let state = ViewState::<()>::default();
        assert!(state.is_loading());
        assert!(state.ready().is_none());
        assert!(state.failure().is_none());
    }

    #[test]
    fn failure_message_is_exposed() {
        let state = ViewState::<i64>::Failed("sin datos".into());
        assert_eq!(state.failure(), Some("sin datos"));
        assert!(state.ready().is_none());
    }
}
