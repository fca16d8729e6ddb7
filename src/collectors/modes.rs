//! Channel mode-list collector: `MODE +b`/`+e`/`+I` query state (spec.md
//! §4.4: "accumulates entries with setter/date metadata; reset bit per
//! list").

use crate::buffer::channel::{ListEntry, ListState};

/// Which of the three list modes a query/reply concerns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListMode {
    Ban,
    Exception,
    InviteException,
}

/// Events fired as a list's entries update (spec.md §4.4: "emits
/// ModesUpdated").
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModesUpdated {
    EntryAdded(ListMode, ListEntry),
    ListReset(ListMode),
    ListComplete(ListMode),
}

/// Tracks the fetch state of a channel's three list-mode collections, one
/// bit per list so a fresh query resets only its own list rather than
/// clobbering the others' cached entries.
#[derive(Debug, Default)]
pub struct ModeListCollector {
    pub ban_state: Option<ListState>,
    pub exception_state: Option<ListState>,
    pub invite_exception_state: Option<ListState>,
}

impl ModeListCollector {
    fn state_mut(&mut self, mode: ListMode) -> &mut Option<ListState> {
        match mode {
            ListMode::Ban => &mut self.ban_state,
            ListMode::Exception => &mut self.exception_state,
            ListMode::InviteException => &mut self.invite_exception_state,
        }
    }

    /// Begins a fresh query for `mode`, resetting its bit so accumulation
    /// starts clean.
    pub fn begin_query(&mut self, mode: ListMode) -> ModesUpdated {
        *self.state_mut(mode) = Some(ListState::Fetching);
        ModesUpdated::ListReset(mode)
    }

    pub fn complete_query(&mut self, mode: ListMode) -> ModesUpdated {
        *self.state_mut(mode) = Some(ListState::Fetched);
        ModesUpdated::ListComplete(mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_query_resets_only_its_own_list() {
        let mut collector = ModeListCollector::default();
        collector.exception_state = Some(ListState::Fetched);
        collector.begin_query(ListMode::Ban);
        assert_eq!(collector.ban_state, Some(ListState::Fetching));
        assert_eq!(collector.exception_state, Some(ListState::Fetched));
    }
}
