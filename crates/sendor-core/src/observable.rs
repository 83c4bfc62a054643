//! Minimal pub/sub bus, used by `FileStash` and `TaskQueue`.
//!
//! Subscribers are identified by pointer identity (`Arc::ptr_eq`), which
//! rejects duplicate subscriptions without requiring `E` to carry any
//! identity of its own. Notifications are delivered synchronously, in
//! subscription order; `notify` snapshots the subscriber list before
//! invoking anyone, so a subscriber calling `subscribe`/`unsubscribe` from
//! within its own callback never deadlocks on the bus's internal lock —
//! it just won't affect the notification already in flight.
//!
//! Subscribers may still be invoked while the *publisher's* lock is held
//! (e.g. `FileStash`'s index lock): do not call back into the publisher
//! from a subscriber.

use std::sync::{Arc, Mutex};

pub type Notifier<E> = Arc<dyn Fn(&E) + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum SubscribeError {
    #[error("notifier is already subscribed")]
    AlreadySubscribed,
}

#[derive(Debug, thiserror::Error)]
pub enum UnsubscribeError {
    #[error("notifier is not currently subscribed")]
    NotSubscribed,
}

pub struct Observable<E> {
    subscribers: Mutex<Vec<Notifier<E>>>,
}

impl<E> Default for Observable<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Observable<E> {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe(&self, notifier: Notifier<E>) -> Result<(), SubscribeError> {
        let mut subscribers = self.subscribers.lock().unwrap();
        if subscribers.iter().any(|s| Arc::ptr_eq(s, &notifier)) {
            return Err(SubscribeError::AlreadySubscribed);
        }
        subscribers.push(notifier);
        Ok(())
    }

    pub fn unsubscribe(&self, notifier: &Notifier<E>) -> Result<(), UnsubscribeError> {
        let mut subscribers = self.subscribers.lock().unwrap();
        let before = subscribers.len();
        subscribers.retain(|s| !Arc::ptr_eq(s, notifier));
        if subscribers.len() == before {
            return Err(UnsubscribeError::NotSubscribed);
        }
        Ok(())
    }

    pub fn notify(&self, event: &E) {
        let snapshot: Vec<Notifier<E>> = self.subscribers.lock().unwrap().clone();
        for notifier in snapshot {
            notifier(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn notify_with_no_subscribers_is_a_noop() {
        let bus: Observable<&'static str> = Observable::new();
        bus.notify(&"zeroth event");
    }

    #[test]
    fn duplicate_subscription_fails() {
        let bus: Observable<&'static str> = Observable::new();
        let notifier: Notifier<&'static str> = Arc::new(|_| {});
        bus.subscribe(notifier.clone()).unwrap();
        assert!(matches!(
            bus.subscribe(notifier),
            Err(SubscribeError::AlreadySubscribed)
        ));
    }

    #[test]
    fn delivers_to_multiple_subscribers_in_order() {
        let bus: Observable<&'static str> = Observable::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let log1 = log.clone();
        let n1: Notifier<&'static str> = Arc::new(move |e| log1.lock().unwrap().push(format!("1:{e}")));
        let log2 = log.clone();
        let n2: Notifier<&'static str> = Arc::new(move |e| log2.lock().unwrap().push(format!("2:{e}")));

        bus.subscribe(n1).unwrap();
        bus.subscribe(n2).unwrap();
        bus.notify(&"event");

        assert_eq!(*log.lock().unwrap(), vec!["1:event", "2:event"]);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let bus: Observable<&'static str> = Observable::new();
        let count = Arc::new(AtomicUsize::new(0));
        let count2 = count.clone();
        let notifier: Notifier<&'static str> = Arc::new(move |_| {
            count2.fetch_add(1, Ordering::SeqCst);
        });

        bus.subscribe(notifier.clone()).unwrap();
        bus.notify(&"first");
        bus.unsubscribe(&notifier).unwrap();
        bus.notify(&"second");

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribing_unknown_notifier_fails() {
        let bus: Observable<&'static str> = Observable::new();
        let notifier: Notifier<&'static str> = Arc::new(|_| {});
        assert!(matches!(
            bus.unsubscribe(&notifier),
            Err(UnsubscribeError::NotSubscribed)
        ));
    }
}
