//! Refetch - mutation notification and refetching resource state
//!
//! Views that show server-owned data do not patch their cached copy when
//! something changes. Instead, whoever performs a mutation announces it on a
//! domain [`EventBus`], and every live [`Resource`] subscribed to that event
//! fetches again.
//!
//! # Architecture
//!
//! ```text
//!   mutation succeeds
//!          │
//!          ▼
//!   EventBus::emit(Created) ──► listener ──► spawned fetch cycle
//!          │                                       │
//!          └──► stream() (async observers)         ▼
//!                                            fetch() ──► ResourceState { data, loading }
//!                                                              │
//!                                                              ▼
//!                                                        watch() receivers
//! ```
//!
//! # Modules
//!
//! - [`bus`] - typed zero-payload publish/subscribe with per-listener isolation
//! - [`resource`] - generic fetch-state container with a sequence guard
//! - [`loading`] - loading state and multi-key aggregation

pub mod bus;
pub mod loading;
pub mod resource;

pub use bus::{BusEvent, DEFAULT_STREAM_CAPACITY, EventBus, Subscription};
pub use loading::{LoadingMap, LoadingState};
pub use resource::{Resource, ResourceBuilder, ResourceState, UNKNOWN_ERROR};
