use crate::models::event::PushEvent;
use crate::models::notification::{NotificationId, NotificationRecord, ReadFilter, Scope};
use crate::reconcile::{self, Change};

/// In-memory notification list owned by one mounted view.
///
/// There is no process-wide instance: every session builds its own store,
/// fills it from a fetch and mutates it through the reconciler.
#[derive(Debug, Clone, Default)]
pub struct NotificationStore {
    scope: Scope,
    records: Vec<NotificationRecord>,
}

impl NotificationStore {
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            records: Vec::new(),
        }
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Replace the whole list with an authoritative snapshot.
    pub fn replace(&mut self, scope: Scope, records: Vec<NotificationRecord>) {
        self.scope = scope;
        self.records = records;
    }

    pub fn apply(&mut self, event: PushEvent) -> Change {
        reconcile::apply(&mut self.records, event)
    }

    pub fn mark_read(&mut self, id: &NotificationId) -> Change {
        reconcile::mark_read(&mut self.records, id)
    }

    pub fn mark_all_read(&mut self) -> Change {
        reconcile::mark_all_read(&mut self.records)
    }

    pub fn records(&self) -> &[NotificationRecord] {
        &self.records
    }

    pub fn filtered(&self, filter: ReadFilter) -> impl Iterator<Item = &NotificationRecord> {
        self.records.iter().filter(move |n| filter.accepts(n))
    }

    pub fn get(&self, id: &NotificationId) -> Option<&NotificationRecord> {
        self.records.iter().find(|n| &n.id == id)
    }

    pub fn unread_count(&self) -> usize {
        reconcile::unread_count(&self.records)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
