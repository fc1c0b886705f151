//! # Change Notifications
//!
//! Fire-and-forget fan-out of events to any number of subscribers.
//!
//! ```text
//!                ┌──> Receiver (UI)
//!   publish() ───┼──> Receiver (analytics)
//!                └──> Receiver (tests)
//! ```
//!
//! Each subscriber owns an unbounded crossbeam channel. Publishing never
//! blocks and never fails; subscribers whose receiver was dropped are
//! pruned on the next publish.

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

/// Registry of event subscribers.
pub struct Listeners<T> {
    senders: Mutex<Vec<Sender<T>>>,
}

impl<T: Clone> Listeners<T> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            senders: Mutex::new(Vec::new()),
        }
    }

    /// Registers a new subscriber and returns its receiving end.
    pub fn subscribe(&self) -> Receiver<T> {
        let (sender, receiver) = unbounded();
        self.senders.lock().push(sender);
        receiver
    }

    /// Delivers `event` to every live subscriber.
    pub fn publish(&self, event: &T) {
        self.senders
            .lock()
            .retain(|sender| sender.send(event.clone()).is_ok());
    }

    /// Number of subscribers still registered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.senders.lock().len()
    }

    /// Returns true if nobody is subscribed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.senders.lock().is_empty()
    }
}

impl<T: Clone> Default for Listeners<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Listeners<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners")
            .field("subscribers", &self.senders.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_reaches_all_subscribers() {
        let listeners = Listeners::new();
        let a = listeners.subscribe();
        let b = listeners.subscribe();

        listeners.publish(&7u32);

        assert_eq!(a.try_recv().unwrap(), 7);
        assert_eq!(b.try_recv().unwrap(), 7);
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let listeners = Listeners::new();
        let kept = listeners.subscribe();
        drop(listeners.subscribe());
        assert_eq!(listeners.len(), 2);

        listeners.publish(&1u32);

        assert_eq!(listeners.len(), 1);
        assert_eq!(kept.try_recv().unwrap(), 1);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let listeners: Listeners<u32> = Listeners::default();
        listeners.publish(&1);
        assert!(listeners.is_empty());
    }
}
