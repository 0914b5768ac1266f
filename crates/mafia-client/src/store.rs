//! Storage abstraction for session rows.
//!
//! Decouples the orchestrator from any specific backend. The
//! [`SessionOrchestrator`](crate::orchestrator::SessionOrchestrator) is generic
//! over [`SessionStore`]; the binary picks
//! [`MemoryStore`](crate::memory_store::MemoryStore) or the hosted
//! `RestStore` once at startup.

use std::future::Future;

use mafia_core::session::{NewSession, SessionFilter, SessionRecord, SessionStatus};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Errors reported by a store backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The request never got a response.
    #[error("request failed: {0}")]
    Http(String),

    /// The store answered with a non-success status.
    #[error("store responded {status}: {message}")]
    Status { status: u16, message: String },

    /// The response body did not match the expected shape.
    #[error("invalid response: {0}")]
    Decode(String),

    /// The change feed could not be opened or failed.
    #[error("change feed error: {0}")]
    Realtime(String),

    #[error("no session with id '{0}'")]
    NotFound(String),
}

/// A store reply: `Ok(None)` means the call succeeded but carried no payload.
pub type StoreResult<T> = Result<Option<T>, StoreError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
    Other,
}

impl ChangeKind {
    pub fn from_wire(kind: &str) -> Self {
        match kind {
            "INSERT" => ChangeKind::Insert,
            "UPDATE" => ChangeKind::Update,
            "DELETE" => ChangeKind::Delete,
            _ => ChangeKind::Other,
        }
    }
}

/// A row in the watched table changed. Carries no row data: listeners
/// re-fetch the whole listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub table: String,
    pub kind: ChangeKind,
}

/// Live change-feed handle.
///
/// Dropping the handle (or calling [`unsubscribe`](Self::unsubscribe)) stops
/// delivery and aborts the backend's feed task, if any.
#[derive(Debug)]
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<ChangeEvent>,
    task: Option<JoinHandle<()>>,
    /// Keeps an idle feed's channel open so `recv` stays pending.
    _idle: Option<mpsc::UnboundedSender<ChangeEvent>>,
}

impl Subscription {
    pub fn new(rx: mpsc::UnboundedReceiver<ChangeEvent>, task: Option<JoinHandle<()>>) -> Self {
        Self {
            rx,
            task,
            _idle: None,
        }
    }

    /// A feed that never delivers anything.
    pub fn idle() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            rx,
            task: None,
            _idle: Some(tx),
        }
    }

    /// Wait for the next change. `None` once the feed has ended.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        self.rx.recv().await
    }

    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// A row-store holding session records.
pub trait SessionStore: Send + Sync + 'static {
    /// Insert a row and return it as stored.
    fn insert(
        &self,
        session: NewSession,
    ) -> impl Future<Output = StoreResult<SessionRecord>> + Send;

    /// Fetch every row matching `filter`.
    fn select(
        &self,
        filter: SessionFilter,
    ) -> impl Future<Output = StoreResult<Vec<SessionRecord>>> + Send;

    /// Set a row's status.
    fn update_status(
        &self,
        id: &str,
        status: SessionStatus,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Take a seat in session `id`, bumping `current_players` from `seen` to
    /// `seen + 1`. Returns the updated row, or `Ok(None)` when the stored
    /// count no longer equals `seen`, the row stopped waiting, or it is full.
    fn add_player(
        &self,
        id: &str,
        seen: u32,
    ) -> impl Future<Output = StoreResult<SessionRecord>> + Send;

    /// Open a change feed over `table`.
    fn subscribe(&self, table: &str)
    -> impl Future<Output = Result<Subscription, StoreError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_kinds_from_wire() {
        assert_eq!(ChangeKind::from_wire("INSERT"), ChangeKind::Insert);
        assert_eq!(ChangeKind::from_wire("DELETE"), ChangeKind::Delete);
        assert_eq!(ChangeKind::from_wire("TRUNCATE"), ChangeKind::Other);
    }

    #[tokio::test]
    async fn dropping_subscription_aborts_feed_task() {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(async move {
            let _tx = tx;
            std::future::pending::<()>().await;
        });
        let abort = task.abort_handle();
        let sub = Subscription::new(rx, Some(task));
        sub.unsubscribe();
        tokio::task::yield_now().await;
        assert!(abort.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn idle_feed_stays_pending() {
        let mut sub = Subscription::idle();
        let waited = tokio::time::timeout(std::time::Duration::from_secs(60), sub.recv()).await;
        assert!(waited.is_err());
    }
}
