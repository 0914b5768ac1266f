//! In-process session store.
//!
//! Used when no hosted store is configured, and by tests. Starts empty, so an
//! unconfigured client lists no games, and notifies every subscriber on each
//! mutation just like the hosted change feed.

use mafia_core::session::{NewSession, SessionFilter, SessionRecord, SessionStatus};
use tokio::sync::{RwLock, mpsc};

use crate::store::{ChangeEvent, ChangeKind, SessionStore, StoreError, StoreResult, Subscription};

#[derive(Default)]
struct Tables {
    rows: Vec<SessionRecord>,
    next_id: u64,
    subscribers: Vec<(String, mpsc::UnboundedSender<ChangeEvent>)>,
}

impl Tables {
    /// Notify subscribers of `table`, dropping the ones that went away.
    fn notify(&mut self, table: &str, kind: ChangeKind) {
        self.subscribers.retain(|(watched, tx)| {
            if watched != table {
                return !tx.is_closed();
            }
            tx.send(ChangeEvent {
                table: table.to_string(),
                kind,
            })
            .is_ok()
        });
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live change-feed subscribers.
    pub async fn subscriber_count(&self) -> usize {
        let tables = self.tables.read().await;
        tables.subscribers.iter().filter(|(_, tx)| !tx.is_closed()).count()
    }
}

impl SessionStore for MemoryStore {
    async fn insert(&self, session: NewSession) -> StoreResult<SessionRecord> {
        let mut tables = self.tables.write().await;
        tables.next_id += 1;
        let record = session.into_record(format!("session-{}", tables.next_id), None);
        tables.rows.push(record.clone());
        tables.notify(mafia_core::session::SESSIONS_TABLE, ChangeKind::Insert);
        Ok(Some(record))
    }

    async fn select(&self, filter: SessionFilter) -> StoreResult<Vec<SessionRecord>> {
        let tables = self.tables.read().await;
        let rows = tables
            .rows
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        Ok(Some(rows))
    }

    async fn update_status(&self, id: &str, status: SessionStatus) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let row = tables
            .rows
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        row.status = status;
        tables.notify(mafia_core::session::SESSIONS_TABLE, ChangeKind::Update);
        Ok(())
    }

    async fn add_player(&self, id: &str, seen: u32) -> StoreResult<SessionRecord> {
        let mut tables = self.tables.write().await;
        let row = tables
            .rows
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if row.current_players != seen || !row.is_joinable() {
            return Ok(None);
        }
        row.current_players += 1;
        let record = row.clone();
        tables.notify(mafia_core::session::SESSIONS_TABLE, ChangeKind::Update);
        Ok(Some(record))
    }

    async fn subscribe(&self, table: &str) -> Result<Subscription, StoreError> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.tables.write().await.subscribers.push((table.to_string(), tx));
        Ok(Subscription::new(rx, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mafia_core::session::SESSIONS_TABLE;
    use mafia_core::settings::GameSettings;

    fn new_session(code: &str) -> NewSession {
        NewSession::waiting(&GameSettings::default(), "Ana", code)
    }

    #[test]
    fn insert_assigns_ids_and_select_filters() {
        tokio_test::block_on(async {
            let store = MemoryStore::new();
            let a = store.insert(new_session("GAME01")).await.unwrap().unwrap();
            let b = store.insert(new_session("GAME02")).await.unwrap().unwrap();
            assert_ne!(a.id, b.id);

            store.update_status(&a.id, SessionStatus::InProgress).await.unwrap();
            let waiting = store
                .select(SessionFilter::status(SessionStatus::Waiting))
                .await
                .unwrap()
                .unwrap();
            assert_eq!(waiting.len(), 1);
            assert_eq!(waiting[0].game_code, "GAME02");

            let all = store.select(SessionFilter::all()).await.unwrap().unwrap();
            assert_eq!(all.len(), 2);
        });
    }

    #[test]
    fn empty_store_lists_nothing() {
        tokio_test::block_on(async {
            let store = MemoryStore::new();
            let rows = store.select(SessionFilter::all()).await.unwrap();
            assert_eq!(rows, Some(Vec::new()));
        });
    }

    #[test]
    fn update_unknown_row() {
        tokio_test::block_on(async {
            let store = MemoryStore::new();
            assert_eq!(
                store.update_status("nope", SessionStatus::Ended).await,
                Err(StoreError::NotFound("nope".to_string()))
            );
        });
    }

    #[tokio::test]
    async fn add_player_only_from_the_seen_count() {
        let store = MemoryStore::new();
        let settings = GameSettings::new(4, 1, 5);
        let row = store
            .insert(NewSession::waiting(&settings, "Ana", "GAME01"))
            .await
            .unwrap()
            .unwrap();

        let joined = store.add_player(&row.id, 1).await.unwrap().unwrap();
        assert_eq!(joined.current_players, 2);
        // Someone else already took seat 2.
        assert_eq!(store.add_player(&row.id, 1).await, Ok(None));

        store.add_player(&row.id, 2).await.unwrap().unwrap();
        store.add_player(&row.id, 3).await.unwrap().unwrap();
        assert_eq!(store.add_player(&row.id, 4).await, Ok(None));
        assert_eq!(
            store.add_player("nope", 1).await,
            Err(StoreError::NotFound("nope".to_string()))
        );
    }

    #[tokio::test]
    async fn subscribers_see_mutations_until_dropped() {
        let store = MemoryStore::new();
        let mut sub = store.subscribe(SESSIONS_TABLE).await.unwrap();
        let other = store.subscribe("players").await.unwrap();

        store.insert(new_session("GAME01")).await.unwrap();
        let ev = sub.recv().await.unwrap();
        assert_eq!(ev.kind, ChangeKind::Insert);
        assert_eq!(ev.table, SESSIONS_TABLE);
        assert_eq!(store.subscriber_count().await, 2);

        drop(sub);
        drop(other);
        store.insert(new_session("GAME02")).await.unwrap();
        assert_eq!(store.subscriber_count().await, 0);
    }
}
