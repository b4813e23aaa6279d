//! RequestQueue - ordered membership with change notification

use tracing::trace;

use contracts::RequestId;

/// Something a queue can hold
pub trait QueueMember {
    fn id(&self) -> RequestId;

    /// Called once when the member is actually inserted
    fn on_joined(&mut self);

    /// Called once when the member is removed
    fn on_left(&mut self);
}

/// Observer invoked after every change notification with `(kind, len)`
pub type QueueObserver = Box<dyn Fn(&'static str, usize) + Send>;

/// Insertion-ordered request collection
///
/// Every effective mutation bumps `revision`; the owner re-reconciles when
/// it sees the revision move. Adding a member that is already present
/// inserts nothing but still notifies.
pub struct RequestQueue<T: QueueMember> {
    kind: &'static str,
    members: Vec<T>,
    revision: u64,
    observer: Option<QueueObserver>,
}

impl<T: QueueMember> RequestQueue<T> {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            members: Vec::new(),
            revision: 0,
            observer: None,
        }
    }

    /// Attach an observer called on every notification
    pub fn with_observer(mut self, observer: QueueObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Number of notifications so far
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, id: RequestId) -> bool {
        self.position(id).is_some()
    }

    /// Add a member
    ///
    /// Returns false (after notifying) when a member with the same id is
    /// already queued; the hook does not run a second time.
    pub fn add(&mut self, mut member: T) -> bool {
        let id = member.id();
        let inserted = if self.contains(id) {
            trace!(kind = self.kind, request_id = %id, "already queued");
            false
        } else {
            member.on_joined();
            self.members.push(member);
            true
        };
        self.notify();
        inserted
    }

    /// Remove a member; absent ids are a no-op without notification
    pub fn remove(&mut self, id: RequestId) -> Option<T> {
        let index = self.position(id)?;
        let mut member = self.members.remove(index);
        member.on_left();
        self.notify();
        Some(member)
    }

    /// Remove several members with a single notification
    pub fn remove_many(&mut self, ids: &[RequestId]) -> Vec<T> {
        let mut removed = Vec::new();
        for id in ids {
            if let Some(index) = self.position(*id) {
                let mut member = self.members.remove(index);
                member.on_left();
                removed.push(member);
            }
        }
        if !removed.is_empty() {
            self.notify();
        }
        removed
    }

    /// Remove every member with a single notification; no-op when empty
    pub fn remove_all(&mut self) -> Vec<T> {
        if self.members.is_empty() {
            return Vec::new();
        }
        let mut removed: Vec<T> = self.members.drain(..).collect();
        for member in &mut removed {
            member.on_left();
        }
        self.notify();
        removed
    }

    pub fn get(&self, id: RequestId) -> Option<&T> {
        self.members.iter().find(|m| m.id() == id)
    }

    pub fn get_mut(&mut self, id: RequestId) -> Option<&mut T> {
        self.members.iter_mut().find(|m| m.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.members.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.members.iter_mut()
    }

    /// Ids in insertion order
    pub fn ids(&self) -> Vec<RequestId> {
        self.members.iter().map(|m| m.id()).collect()
    }

    fn position(&self, id: RequestId) -> Option<usize> {
        self.members.iter().position(|m| m.id() == id)
    }

    fn notify(&mut self) {
        self.revision += 1;
        if let Some(observer) = &self.observer {
            observer(self.kind, self.members.len());
        }
    }
}
