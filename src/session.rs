//! A mounted notification view.
//!
//! A session is the unit of ownership for one list: it fetches on mount,
//! subscribes to the push channel for the inbox, applies events as they
//! arrive and tears the channel down on unmount. Sessions share nothing
//! with each other; two views mean two fetches and two connections.

use std::sync::Arc;

use url::Url;

use crate::auth::{AuthContext, UserProfile};
use crate::errors::{NotifyError, Result};
use crate::models::notification::{NotificationId, Scope};
use crate::reconcile::Change;
use crate::store::NotificationStore;
use crate::transport::push::{push_url, PushSignal, PushSubscription, ReconnectPolicy};
use crate::transport::rest::{CourseMessage, NotificationApi};

/// Outcome of one push signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update {
    Applied(Change),
    /// The list was replaced by a fresh fetch after a reconnect.
    Resynced { count: usize },
}

pub struct NotificationSession {
    auth: Arc<dyn AuthContext>,
    api: Arc<dyn NotificationApi>,
    ws_url: Option<Url>,
    reconnect: ReconnectPolicy,
    store: NotificationStore,
    push: Option<PushSubscription>,
}

impl NotificationSession {
    /// A fetch-only session. Call [`with_push`](Self::with_push) to enable
    /// live updates for the inbox.
    pub fn new(auth: Arc<dyn AuthContext>, api: Arc<dyn NotificationApi>) -> Self {
        Self {
            auth,
            api,
            ws_url: None,
            reconnect: ReconnectPolicy::disabled(),
            store: NotificationStore::default(),
            push: None,
        }
    }

    pub fn with_push(mut self, ws_url: Url, reconnect: ReconnectPolicy) -> Self {
        self.ws_url = Some(ws_url);
        self.reconnect = reconnect;
        self
    }

    pub fn store(&self) -> &NotificationStore {
        &self.store
    }

    pub fn scope(&self) -> Scope {
        self.store.scope()
    }

    pub fn unread_count(&self) -> usize {
        self.store.unread_count()
    }

    pub fn is_live(&self) -> bool {
        self.push.is_some()
    }

    pub fn profile(&self) -> Option<UserProfile> {
        self.auth.profile()
    }

    /// Fetch `scope` and, for the inbox, open the push channel.
    ///
    /// On a fetch failure the previous list is kept (empty on first mount).
    pub async fn mount(&mut self, scope: Scope) -> Result<()> {
        let token = self.token()?;
        let records = self.guard(self.api.fetch_list(&token, scope).await)?;
        tracing::info!(scope = %scope, count = records.len(), "notifications loaded");
        self.store.replace(scope, records);

        if scope.is_live() {
            self.open_push(&token).await;
        } else {
            self.close_push().await;
        }
        Ok(())
    }

    /// Replace the list with a fresh fetch of another scope.
    pub async fn switch_scope(&mut self, scope: Scope) -> Result<()> {
        self.mount(scope).await
    }

    /// Re-fetch the current scope. Returns the new list length.
    pub async fn refresh(&mut self) -> Result<usize> {
        let token = self.token()?;
        let scope = self.store.scope();
        let records = self.guard(self.api.fetch_list(&token, scope).await)?;
        let count = records.len();
        self.store.replace(scope, records);
        Ok(count)
    }

    /// Wait for the next push signal and apply it.
    ///
    /// `Ok(None)` means the channel is gone and the session is fetch-only.
    pub async fn next_update(&mut self) -> Result<Option<Update>> {
        let Some(push) = self.push.as_mut() else {
            return Ok(None);
        };

        match push.recv().await {
            Some(PushSignal::Event(event)) => {
                let kind = event.kind();
                let change = self.store.apply(event);
                tracing::debug!(kind, ?change, unread = self.store.unread_count(), "push event applied");
                Ok(Some(Update::Applied(change)))
            }
            Some(PushSignal::Resync) => {
                let count = self.refresh().await?;
                tracing::info!(count, "resynced notifications after reconnect");
                Ok(Some(Update::Resynced { count }))
            }
            None => {
                tracing::info!("push channel ended; continuing without live updates");
                self.push = None;
                Ok(None)
            }
        }
    }

    /// Mark one notification read: local first, then the backend.
    ///
    /// If the backend call fails the list is re-fetched so local state does
    /// not drift from the server, and the failed call's error is returned.
    pub async fn mark_read(&mut self, id: &NotificationId) -> Result<Change> {
        let token = self.token()?;
        let change = self.store.mark_read(id);
        match self.api.mark_read(&token, id).await {
            Ok(()) => Ok(change),
            Err(e) => Err(self.recover("mark_read", e).await),
        }
    }

    /// Mark everything read. Does nothing when there is nothing unread.
    pub async fn mark_all_read(&mut self) -> Result<Change> {
        if self.store.unread_count() == 0 {
            return Ok(Change::MarkedAllRead { updated: 0 });
        }
        let token = self.token()?;
        let change = self.store.mark_all_read();
        match self.api.mark_all_read(&token).await {
            Ok(()) => Ok(change),
            Err(e) => Err(self.recover("mark_all_read", e).await),
        }
    }

    pub async fn send_course(&mut self, message: &CourseMessage) -> Result<()> {
        let token = self.token()?;
        self.guard(self.api.send_course(&token, message).await)
    }

    /// Close the push channel. The list itself goes away with the session.
    pub async fn unmount(mut self) {
        self.close_push().await;
    }

    // ── internals ─────────────────────────────────────────────

    fn token(&self) -> Result<String> {
        match self.auth.token().filter(|t| !t.is_empty()) {
            Some(token) => Ok(token),
            None => {
                tracing::warn!("no stored credential");
                self.expire();
                Err(NotifyError::Unauthorized)
            }
        }
    }

    /// Credential wipe on `Unauthorized`; every other result passes through.
    fn guard<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(NotifyError::Unauthorized) = &result {
            self.expire();
        }
        result
    }

    fn expire(&self) {
        if let Err(e) = self.auth.clear() {
            tracing::error!(error = %e, "failed to clear credentials");
        }
    }

    async fn recover(&mut self, what: &'static str, err: NotifyError) -> NotifyError {
        if err.is_unauthorized() {
            self.expire();
            return err;
        }

        tracing::warn!(what, error = %err, "mutation failed; re-fetching to resync");
        if let Err(refetch) = self.refresh().await {
            tracing::warn!(
                what,
                error = %refetch,
                "re-fetch failed; local read state may differ from the server"
            );
        }
        err
    }

    async fn open_push(&mut self, token: &str) {
        if self.push.is_some() {
            return;
        }
        let Some(ws_url) = self.ws_url.as_ref() else {
            return;
        };

        match PushSubscription::open(push_url(ws_url, token), self.reconnect.clone()).await {
            Ok(sub) => self.push = Some(sub),
            Err(e) => {
                tracing::warn!(error = %e, "live updates unavailable; continuing fetch-only");
            }
        }
    }

    async fn close_push(&mut self) {
        if let Some(push) = self.push.take() {
            push.close().await;
        }
    }
}
