//! Resource - reactive state around one asynchronous read
//!
//! A [`Resource`] owns a fetch function and the latest [`ResourceState`] it
//! produced. It fetches once when spawned, again on every [`Resource::reload`],
//! and again whenever one of the bus events it was built with is emitted.
//!
//! Fetch cycles may overlap. Each cycle is tagged with a sequence number when
//! it starts, and a completion is applied only if no newer cycle has started
//! since. A failed fetch records its message but leaves the previous data in
//! place.

use std::fmt::{self, Display};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::bus::{BusEvent, EventBus, Subscription, panic_message};
use crate::loading::LoadingState;

/// Message recorded when a failure has no text of its own
pub const UNKNOWN_ERROR: &str = "unknown error";

/// Last successfully fetched data plus the current loading state
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceState<T> {
    pub data: T,
    pub loading: LoadingState,
}

type FetchFn<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, String>> + Send + Sync>;

type Trigger<T> = Box<dyn FnOnce(Weak<Shared<T>>) -> Subscription + Send>;

fn error_message<E: Display>(err: &E) -> String {
    let message = err.to_string();
    if message.trim().is_empty() {
        UNKNOWN_ERROR.to_string()
    } else {
        message
    }
}

struct Shared<T> {
    name: String,
    fetch: FetchFn<T>,
    runtime: Handle,
    latest: AtomicU64,
    state: watch::Sender<ResourceState<T>>,
}

impl<T: Send + Sync + 'static> Shared<T> {
    /// Issue a sequence number, mark loading, and spawn the task that
    /// completes the cycle. The task owns the fetch, so the cycle always
    /// finishes whether or not anyone awaits the returned handle.
    fn start_cycle(self: &Arc<Self>) -> JoinHandle<()> {
        let seq = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(resource = %self.name, seq, "Resource: fetch started");
        self.state.send_modify(|state| state.loading = LoadingState::Loading);

        let fetch = (self.fetch)();
        let shared = Arc::clone(self);
        self.runtime.spawn(async move {
            let result = match AssertUnwindSafe(fetch).catch_unwind().await {
                Ok(result) => result,
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    warn!(resource = %shared.name, seq, %message, "Resource: fetch panicked");
                    Err(format!("fetch panicked: {}", message))
                }
            };
            shared.complete(seq, result);
        })
    }

    fn complete(&self, seq: u64, result: Result<T, String>) {
        let succeeded = result.is_ok();
        let applied = self.state.send_if_modified(|state| {
            if self.latest.load(Ordering::SeqCst) != seq {
                return false;
            }
            match result {
                Ok(data) => {
                    state.data = data;
                    state.loading = LoadingState::Idle;
                }
                Err(message) => {
                    state.loading = LoadingState::Failed(message);
                }
            }
            true
        });

        if applied {
            debug!(resource = %self.name, seq, succeeded, "Resource: fetch applied");
        } else {
            debug!(resource = %self.name, seq, "Resource: stale fetch discarded");
        }
    }
}

/// Reactive container for one asynchronous data source
///
/// Dropping the resource cancels its bus subscriptions. A fetch still in
/// flight at that point finishes against state nobody observes any more.
pub struct Resource<T> {
    shared: Arc<Shared<T>>,
    subscriptions: Vec<Subscription>,
}

impl<T> Resource<T>
where
    T: Default + Send + Sync + 'static,
{
    /// Start building a resource around `fetch`
    ///
    /// `fetch` may be called any number of times; each call must produce an
    /// independent future. Its error type only needs `Display`: failures are
    /// kept as messages.
    pub fn builder<F, Fut, E>(name: impl Into<String>, fetch: F) -> ResourceBuilder<T>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Display + 'static,
    {
        let fetch: FetchFn<T> = Arc::new(move || {
            let fut = fetch();
            async move { fut.await.map_err(|e| error_message(&e)) }.boxed()
        });
        ResourceBuilder {
            name: name.into(),
            fetch,
            initial: T::default(),
            triggers: Vec::new(),
        }
    }
}

impl<T> Resource<T>
where
    T: Send + Sync + 'static,
{
    /// Start a new fetch cycle
    ///
    /// The cycle is registered, the state switches to loading, and the fetch
    /// is spawned before this returns. The returned future only waits for the
    /// cycle to finish; dropping it does not cancel the fetch. A newer cycle
    /// started before this one completes makes its result stale.
    pub fn reload(&self) -> BoxFuture<'static, ()> {
        debug!(resource = %self.shared.name, "Resource::reload: called");
        let handle = self.shared.start_cycle();
        let name = self.shared.name.clone();
        async move {
            if let Err(err) = handle.await {
                warn!(resource = %name, error = %err, "Resource::reload: fetch task did not finish");
            }
        }
        .boxed()
    }

    /// Start a new fetch cycle and return its task handle
    pub fn spawn_reload(&self) -> JoinHandle<()> {
        self.shared.start_cycle()
    }

    pub fn loading(&self) -> LoadingState {
        self.shared.state.borrow().loading.clone()
    }

    /// Receiver notified after every state change
    pub fn watch(&self) -> watch::Receiver<ResourceState<T>> {
        self.shared.state.subscribe()
    }

    /// Number of bus registrations held by this resource
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }
}

impl<T> Resource<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn state(&self) -> ResourceState<T> {
        self.shared.state.borrow().clone()
    }

    pub fn data(&self) -> T {
        self.shared.state.borrow().data.clone()
    }

    /// Wait until no fetch is in flight and return the state at that moment
    pub async fn settled(&self) -> ResourceState<T> {
        let mut rx = self.watch();
        match rx.wait_for(|state| !state.loading.is_loading()).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        }
    }
}

impl<T> fmt::Debug for Resource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("name", &self.shared.name)
            .field("loading", &self.shared.state.borrow().loading)
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}

/// Configures the initial value and refresh triggers of a [`Resource`]
pub struct ResourceBuilder<T> {
    name: String,
    fetch: FetchFn<T>,
    initial: T,
    triggers: Vec<Trigger<T>>,
}

impl<T> ResourceBuilder<T>
where
    T: Send + Sync + 'static,
{
    /// Data exposed until the first successful fetch (defaults to `T::default()`)
    pub fn initial(mut self, value: T) -> Self {
        self.initial = value;
        self
    }

    /// Fetch again every time `event` is emitted on `bus`
    pub fn refresh_on<E: BusEvent>(mut self, bus: &Arc<EventBus<E>>, event: E) -> Self {
        let bus = Arc::clone(bus);
        self.triggers.push(Box::new(move |shared: Weak<Shared<T>>| {
            bus.subscribe(event, move || {
                if let Some(shared) = shared.upgrade() {
                    debug!(resource = %shared.name, event = event.name(), "Resource: refresh triggered");
                    shared.start_cycle();
                }
            })
        }));
        self
    }

    /// Fetch again on every event of `bus`
    pub fn refresh_on_all<E: BusEvent>(self, bus: &Arc<EventBus<E>>) -> Self {
        E::all()
            .iter()
            .fold(self, |builder, event| builder.refresh_on(bus, *event))
    }

    /// Register the triggers and start the initial fetch
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn spawn(self) -> Resource<T> {
        let (state, _) = watch::channel(ResourceState {
            data: self.initial,
            loading: LoadingState::Idle,
        });
        let shared = Arc::new(Shared {
            name: self.name,
            fetch: self.fetch,
            runtime: Handle::current(),
            latest: AtomicU64::new(0),
            state,
        });
        debug!(resource = %shared.name, triggers = self.triggers.len(), "ResourceBuilder::spawn");

        let subscriptions = self
            .triggers
            .into_iter()
            .map(|trigger| trigger(Arc::downgrade(&shared)))
            .collect();

        shared.start_cycle();

        Resource { shared, subscriptions }
    }
}
