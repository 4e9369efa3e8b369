//! Observer traits and single-slot dispatch

use std::sync::{Arc, RwLock};

use bytes::Bytes;
use tracing::debug;

use crate::Member;

/// Observer for membership changes.
pub trait MembershipListener: Send + Sync {
    /// A previously unknown peer was observed.
    fn member_added(&self, member: &Member);

    /// A known peer was not re-observed within the liveness timeout.
    fn member_disappeared(&self, member: &Member);
}

/// Observer for inbound messages handed over by the transport layer.
pub trait MessageListener: Send + Sync {
    /// Whether this listener wants the message; evaluated before delivery.
    fn accept(&self, _message: &Bytes) -> bool {
        true
    }

    /// Deliver an accepted message.
    fn message_received(&self, message: Bytes);
}

/// Single-slot, replaceable registration for one membership observer and
/// one message observer. Dispatch is a direct synchronous call to the
/// current observer, a no-op when the slot is empty.
#[derive(Default)]
pub struct ListenerSet {
    membership: RwLock<Option<Arc<dyn MembershipListener>>>,
    message: RwLock<Option<Arc<dyn MessageListener>>>,
}

impl ListenerSet {
    /// Create an empty listener set
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the membership observer, replacing any previous one
    pub fn set_membership_listener(&self, listener: Arc<dyn MembershipListener>) {
        *self.membership.write().unwrap() = Some(listener);
    }

    /// Unregister the membership observer
    pub fn remove_membership_listener(&self) {
        *self.membership.write().unwrap() = None;
    }

    /// Register the message observer, replacing any previous one
    pub fn set_message_listener(&self, listener: Arc<dyn MessageListener>) {
        *self.message.write().unwrap() = Some(listener);
    }

    /// Unregister the message observer
    pub fn remove_message_listener(&self) {
        *self.message.write().unwrap() = None;
    }

    /// Forward an add event to the current membership observer
    pub fn member_added(&self, member: &Member) {
        let listener = self.membership.read().unwrap().clone();
        if let Some(listener) = listener {
            listener.member_added(member);
        }
    }

    /// Forward a disappear event to the current membership observer
    pub fn member_disappeared(&self, member: &Member) {
        let listener = self.membership.read().unwrap().clone();
        if let Some(listener) = listener {
            listener.member_disappeared(member);
        }
    }

    /// Offer an inbound message to the current message observer; delivered
    /// only if its accept predicate agrees
    pub fn message_received(&self, message: Bytes) {
        let listener = self.message.read().unwrap().clone();
        match listener {
            Some(listener) if listener.accept(&message) => listener.message_received(message),
            Some(_) => debug!("message rejected by listener accept predicate"),
            None => debug!("no message listener registered, dropping message"),
        }
    }
}

impl std::fmt::Debug for ListenerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerSet").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemberId;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingListener {
        added: AtomicUsize,
        disappeared: AtomicUsize,
    }

    impl MembershipListener for CountingListener {
        fn member_added(&self, _member: &Member) {
            self.added.fetch_add(1, Ordering::SeqCst);
        }

        fn member_disappeared(&self, _member: &Member) {
            self.disappeared.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct SelectiveListener {
        accepting: AtomicBool,
        received: Mutex<Vec<Bytes>>,
    }

    impl MessageListener for SelectiveListener {
        fn accept(&self, _message: &Bytes) -> bool {
            self.accepting.load(Ordering::SeqCst)
        }

        fn message_received(&self, message: Bytes) {
            self.received.lock().unwrap().push(message);
        }
    }

    fn member() -> Member {
        Member::new("10.0.0.1", 4000, MemberId::from_seed(1))
    }

    #[test]
    fn dispatch_without_listener_is_a_noop() {
        let listeners = ListenerSet::new();
        listeners.member_added(&member());
        listeners.member_disappeared(&member());
        listeners.message_received(Bytes::from_static(b"hello"));
    }

    #[test]
    fn registration_replaces_rather_than_appends() {
        let listeners = ListenerSet::new();
        let first = Arc::new(CountingListener::default());
        let second = Arc::new(CountingListener::default());

        listeners.set_membership_listener(first.clone());
        listeners.set_membership_listener(second.clone());
        listeners.member_added(&member());

        assert_eq!(first.added.load(Ordering::SeqCst), 0);
        assert_eq!(second.added.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn removed_listener_receives_nothing() {
        let listeners = ListenerSet::new();
        let listener = Arc::new(CountingListener::default());
        listeners.set_membership_listener(listener.clone());
        listeners.remove_membership_listener();
        listeners.member_disappeared(&member());
        assert_eq!(listener.disappeared.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn accept_predicate_gates_delivery() {
        let listeners = ListenerSet::new();
        let listener = Arc::new(SelectiveListener {
            accepting: AtomicBool::new(false),
            received: Mutex::new(Vec::new()),
        });
        listeners.set_message_listener(listener.clone());

        listeners.message_received(Bytes::from_static(b"rejected"));
        assert!(listener.received.lock().unwrap().is_empty());

        listener.accepting.store(true, Ordering::SeqCst);
        listeners.message_received(Bytes::from_static(b"accepted"));
        let received = listener.received.lock().unwrap();
        assert_eq!(received.as_slice(), &[Bytes::from_static(b"accepted")]);
    }
}
