//! Listing open sessions for the join dialog.
//!
//! Every change notification triggers a full re-list. Fetches may overlap, so
//! each one takes a [`FetchTicket`] and [`FetchSequencer::accept`] drops any
//! result older than one already shown.

use mafia_core::screen::DiscoveryState;
use mafia_core::session::{SessionFilter, SessionStatus};

use crate::store::SessionStore;

/// Orders overlapping fetches. Later tickets compare greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FetchTicket(u64);

#[derive(Debug, Default)]
pub struct FetchSequencer {
    issued: u64,
    applied: u64,
}

impl FetchSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ticket for a fetch about to start.
    pub fn begin(&mut self) -> FetchTicket {
        self.issued += 1;
        FetchTicket(self.issued)
    }

    /// Whether a finished fetch may replace what is shown. Accepting a ticket
    /// retires every older one.
    pub fn accept(&mut self, ticket: FetchTicket) -> bool {
        if ticket.0 <= self.applied {
            return false;
        }
        self.applied = ticket.0;
        true
    }
}

/// Fetch sessions that are waiting for players.
pub async fn list_open_sessions<S: SessionStore>(store: &S) -> DiscoveryState {
    match store
        .select(SessionFilter::status(SessionStatus::Waiting))
        .await
    {
        Ok(Some(sessions)) => {
            tracing::debug!(count = sessions.len(), "listed open sessions");
            DiscoveryState::Loaded(sessions)
        }
        Ok(None) => {
            tracing::warn!("session listing returned no data");
            DiscoveryState::NoData
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to list sessions");
            DiscoveryState::Failed(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_store::MemoryStore;
    use mafia_core::session::NewSession;
    use mafia_core::settings::GameSettings;

    #[test]
    fn stale_results_are_discarded() {
        let mut seq = FetchSequencer::new();
        let first = seq.begin();
        let second = seq.begin();
        assert!(first < second);

        // The newer fetch lands first; the older one must not regress it.
        assert!(seq.accept(second));
        assert!(!seq.accept(first));
        assert!(!seq.accept(second));

        let third = seq.begin();
        assert!(seq.accept(third));
    }

    #[test]
    fn in_order_results_all_apply() {
        let mut seq = FetchSequencer::new();
        let a = seq.begin();
        assert!(seq.accept(a));
        let b = seq.begin();
        assert!(seq.accept(b));
    }

    #[tokio::test]
    async fn lists_only_waiting_sessions() {
        let store = MemoryStore::new();
        assert_eq!(list_open_sessions(&store).await, DiscoveryState::Loaded(Vec::new()));

        let settings = GameSettings::default();
        let open = store
            .insert(NewSession::waiting(&settings, "Ana", "GAME01"))
            .await
            .unwrap()
            .unwrap();
        let started = store
            .insert(NewSession::waiting(&settings, "Ben", "GAME02"))
            .await
            .unwrap()
            .unwrap();
        store
            .update_status(&started.id, SessionStatus::InProgress)
            .await
            .unwrap();

        assert_eq!(list_open_sessions(&store).await, DiscoveryState::Loaded(vec![open]));
    }
}
