//! Event Bus - zero-payload publish/subscribe for one mutation domain
//!
//! Each domain (transactions, budgets, ...) gets its own bus parameterized by a
//! closed event enum. Listeners are plain callbacks invoked synchronously by
//! [`EventBus::emit`]; async observers can additionally follow every emitted
//! event through [`EventBus::stream`].

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Capacity of the broadcast stream that mirrors emitted events
pub const DEFAULT_STREAM_CAPACITY: usize = 256;

/// A closed set of named change events for one domain
pub trait BusEvent: Copy + Eq + Hash + Debug + Send + Sync + 'static {
    /// Wire tag of the event (e.g. `transaction-created`)
    fn name(&self) -> &'static str;

    /// Every member of the closed set
    fn all() -> &'static [Self];
}

type Listener = Arc<dyn Fn() + Send + Sync>;

struct Registry<E> {
    next_id: u64,
    listeners: HashMap<E, Vec<(u64, Listener)>>,
}

impl<E: BusEvent> Registry<E> {
    fn remove(&mut self, event: E, id: u64) -> bool {
        let Some(entries) = self.listeners.get_mut(&event) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        let removed = entries.len() != before;
        if entries.is_empty() {
            self.listeners.remove(&event);
        }
        removed
    }
}

fn lock<E>(registry: &Mutex<Registry<E>>) -> MutexGuard<'_, Registry<E>> {
    // Listeners never run under the lock, so a poisoned registry is still consistent
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Publish/subscribe bus for the events of one domain
///
/// The bus is constructed explicitly and shared by `Arc`. It holds nothing
/// but callback references, so it lives as long as the application does.
pub struct EventBus<E: BusEvent> {
    registry: Arc<Mutex<Registry<E>>>,
    tx: broadcast::Sender<E>,
}

impl<E: BusEvent> EventBus<E> {
    /// Create a bus with the default stream capacity
    pub fn new() -> Self {
        Self::with_stream_capacity(DEFAULT_STREAM_CAPACITY)
    }

    /// Create a bus whose event stream buffers up to `capacity` events per observer
    pub fn with_stream_capacity(capacity: usize) -> Self {
        debug!(capacity, "EventBus::with_stream_capacity: creating event bus");
        let (tx, _) = broadcast::channel(capacity);
        Self {
            registry: Arc::new(Mutex::new(Registry {
                next_id: 0,
                listeners: HashMap::new(),
            })),
            tx,
        }
    }

    /// Register `callback` to run every time `event` is emitted
    ///
    /// Registering the same callback twice creates two independent
    /// registrations. The returned [`Subscription`] removes exactly this
    /// registration when cancelled or dropped.
    pub fn subscribe<F>(&self, event: E, callback: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = {
            let mut registry = lock(&self.registry);
            let id = registry.next_id;
            registry.next_id += 1;
            registry.listeners.entry(event).or_default().push((id, Arc::new(callback)));
            id
        };
        debug!(event = event.name(), id, "EventBus::subscribe: listener registered");

        let registry: Weak<Mutex<Registry<E>>> = Arc::downgrade(&self.registry);
        Subscription::new(move || {
            if let Some(registry) = registry.upgrade() {
                let removed = lock(&registry).remove(event, id);
                debug!(event = event.name(), id, removed, "Subscription: cancelled");
            }
        })
    }

    /// Invoke every listener currently registered for `event`
    ///
    /// The listener set is snapshotted before the first callback runs, so
    /// callbacks may subscribe or unsubscribe freely. A panicking listener is
    /// logged and skipped; the remaining listeners still run and the panic
    /// never reaches the caller.
    pub fn emit(&self, event: E) {
        let snapshot: Vec<Listener> = lock(&self.registry)
            .listeners
            .get(&event)
            .map(|entries| entries.iter().map(|(_, listener)| Arc::clone(listener)).collect())
            .unwrap_or_default();

        debug!(event = event.name(), listeners = snapshot.len(), "EventBus::emit");
        for listener in snapshot {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| listener())) {
                warn!(
                    event = event.name(),
                    panic = %panic_message(panic.as_ref()),
                    "EventBus::emit: listener panicked"
                );
            }
        }

        // No stream observers is fine
        let _ = self.tx.send(event);
    }

    /// Emit every event of the closed set, in declaration order
    pub fn emit_all(&self) {
        debug!("EventBus::emit_all: called");
        for event in E::all() {
            self.emit(*event);
        }
    }

    /// Observe every emitted event asynchronously
    ///
    /// Only events emitted after this call are received. Observers that fall
    /// more than the stream capacity behind skip the oldest events.
    pub fn stream(&self) -> broadcast::Receiver<E> {
        self.tx.subscribe()
    }

    /// Number of live registrations for `event`
    pub fn listener_count(&self, event: E) -> usize {
        lock(&self.registry).listeners.get(&event).map_or(0, Vec::len)
    }
}

impl<E: BusEvent> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: BusEvent> Debug for EventBus<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registry = lock(&self.registry);
        let mut counts: Vec<(&'static str, usize)> = registry
            .listeners
            .iter()
            .map(|(event, entries)| (event.name(), entries.len()))
            .collect();
        counts.sort_unstable();
        f.debug_struct("EventBus").field("listeners", &counts).finish()
    }
}

pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Handle to one listener registration
///
/// Cancelling is idempotent. Dropping the handle cancels it, so a
/// subscription never outlives the state its callback refers to.
pub struct Subscription {
    cancel: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Subscription {
    fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Mutex::new(Some(Box::new(cancel))),
        }
    }

    /// Remove the registration from its bus; later calls do nothing
    pub fn cancel(&self) {
        let cancel = self.cancel.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(cancel) = cancel {
            cancel();
        }
    }

    /// Whether [`cancel`](Self::cancel) has already run
    pub fn is_cancelled(&self) -> bool {
        self.cancel.lock().unwrap_or_else(PoisonError::into_inner).is_none()
    }

    /// Keep the registration for the rest of the bus's life
    pub fn detach(self) {
        self.cancel.lock().unwrap_or_else(PoisonError::into_inner).take();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::broadcast::error::TryRecvError;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Change {
        Created,
        Updated,
        Deleted,
    }

    impl BusEvent for Change {
        fn name(&self) -> &'static str {
            match self {
                Change::Created => "thing-created",
                Change::Updated => "thing-updated",
                Change::Deleted => "thing-deleted",
            }
        }

        fn all() -> &'static [Self] {
            &[Change::Created, Change::Updated, Change::Deleted]
        }
    }

    fn counter() -> (Arc<AtomicUsize>, impl Fn() + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&count);
        (count, move || {
            inner.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_emit_without_listeners_is_noop() {
        let bus = EventBus::<Change>::new();
        bus.emit(Change::Created);
        assert_eq!(bus.listener_count(Change::Created), 0);
    }

    #[test]
    fn test_emit_invokes_only_matching_event() {
        let bus = EventBus::<Change>::new();
        let (created, on_created) = counter();
        let (deleted, on_deleted) = counter();
        let _a = bus.subscribe(Change::Created, on_created);
        let _b = bus.subscribe(Change::Deleted, on_deleted);

        bus.emit(Change::Created);
        bus.emit(Change::Created);

        assert_eq!(created.load(Ordering::SeqCst), 2);
        assert_eq!(deleted.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unsubscribe_twice_is_noop() {
        let bus = EventBus::<Change>::new();
        let (count, on_created) = counter();
        let sub = bus.subscribe(Change::Created, on_created);
        assert_eq!(bus.listener_count(Change::Created), 1);

        sub.cancel();
        sub.cancel();
        assert!(sub.is_cancelled());
        assert_eq!(bus.listener_count(Change::Created), 0);

        bus.emit(Change::Created);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_cancel_removes_only_its_own_registration() {
        let bus = EventBus::<Change>::new();
        let count = Arc::new(AtomicUsize::new(0));
        let shared = {
            let count = Arc::clone(&count);
            Arc::new(move || {
                count.fetch_add(1, Ordering::SeqCst);
            })
        };
        let first = {
            let cb = Arc::clone(&shared);
            bus.subscribe(Change::Updated, move || cb())
        };
        let _second = {
            let cb = Arc::clone(&shared);
            bus.subscribe(Change::Updated, move || cb())
        };

        bus.emit(Change::Updated);
        assert_eq!(count.load(Ordering::SeqCst), 2);

        first.cancel();
        bus.emit(Change::Updated);
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_drop_cancels_subscription() {
        let bus = EventBus::<Change>::new();
        let (count, on_created) = counter();
        {
            let _sub = bus.subscribe(Change::Created, on_created);
            bus.emit(Change::Created);
        }
        bus.emit(Change::Created);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(bus.listener_count(Change::Created), 0);
    }

    #[test]
    fn test_detach_keeps_registration() {
        let bus = EventBus::<Change>::new();
        let (count, on_created) = counter();
        bus.subscribe(Change::Created, on_created).detach();
        bus.emit(Change::Created);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(bus.listener_count(Change::Created), 1);
    }

    #[test]
    fn test_panicking_listener_does_not_block_others() {
        let bus = EventBus::<Change>::new();
        let (count, on_created) = counter();
        let _bad = bus.subscribe(Change::Created, || panic!("listener failure"));
        let _good = bus.subscribe(Change::Created, on_created);

        bus.emit(Change::Created);
        bus.emit(Change::Created);

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unsubscribe_during_emit_does_not_affect_current_pass() {
        let bus = Arc::new(EventBus::<Change>::new());
        let (count, on_created) = counter();
        let victim = Arc::new(Mutex::new(None::<Subscription>));

        let _killer = {
            let victim = Arc::clone(&victim);
            bus.subscribe(Change::Created, move || {
                if let Some(sub) = victim.lock().unwrap().take() {
                    sub.cancel();
                }
            })
        };
        *victim.lock().unwrap() = Some(bus.subscribe(Change::Created, on_created));

        bus.emit(Change::Created);
        assert_eq!(count.load(Ordering::SeqCst), 1);

        bus.emit(Change::Created);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_subscribe_during_emit_waits_for_next_pass() {
        let bus = Arc::new(EventBus::<Change>::new());
        let (count, on_created) = counter();
        let on_created = Arc::new(on_created);
        let added = Arc::new(Mutex::new(Vec::<Subscription>::new()));

        let _adder = {
            let bus = Arc::clone(&bus);
            let added = Arc::clone(&added);
            let on_created = Arc::clone(&on_created);
            bus.clone().subscribe(Change::Created, move || {
                let cb = Arc::clone(&on_created);
                let sub = bus.subscribe(Change::Created, move || cb());
                added.lock().unwrap().push(sub);
            })
        };

        bus.emit(Change::Created);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(bus.listener_count(Change::Created), 2);

        added.lock().unwrap().clear();
        assert_eq!(bus.listener_count(Change::Created), 1);
    }

    #[test]
    fn test_emit_all_fires_every_event() {
        let bus = EventBus::<Change>::new();
        let (count, cb) = counter();
        let cb = Arc::new(cb);
        let subs: Vec<Subscription> = Change::all()
            .iter()
            .map(|event| {
                let cb = Arc::clone(&cb);
                bus.subscribe(*event, move || cb())
            })
            .collect();

        bus.emit_all();

        assert_eq!(count.load(Ordering::SeqCst), 3);
        drop(subs);
    }

    #[tokio::test]
    async fn test_stream_observes_emitted_events() {
        let bus = EventBus::<Change>::new();
        let mut rx = bus.stream();

        bus.emit(Change::Created);
        bus.emit(Change::Deleted);

        assert_eq!(rx.recv().await.unwrap(), Change::Created);
        assert_eq!(rx.recv().await.unwrap(), Change::Deleted);
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn test_subscription_outliving_bus_cancels_quietly() {
        let bus = EventBus::<Change>::new();
        let (_count, cb) = counter();
        let sub = bus.subscribe(Change::Created, cb);
        drop(bus);
        sub.cancel();
        assert!(sub.is_cancelled());
    }
}
