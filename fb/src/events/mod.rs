//! Domain change events for the dashboard
//!
//! Every mutation the API client performs is announced on the bus of its
//! domain. Views never learn about each other: a budget list that needs to
//! follow transaction changes subscribes to the transaction bus.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────┐     ┌──────────────────────────────┐
//! │      TRANSACTION BUS         │     │         BUDGET BUS           │
//! │  transaction-created         │     │  budget-created              │
//! │  transaction-updated         │     │  budget-updated              │
//! │  transaction-deleted         │     │  budget-deleted              │
//! └──────────────────────────────┘     └──────────────────────────────┘
//!         ↑                 ↓                  ↑                 ↓
//!   TransactionsApi     Dashboard,        BudgetsApi         Dashboard
//!   create/update/      InsightsPanel,    create/update/     resources,
//!   delete              activity log      delete             activity log
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use finboard::events::{Buses, TransactionEvent};
//!
//! // Create once at startup and hand clones to whoever needs them
//! let buses = Buses::new();
//!
//! let _sub = buses.transactions.subscribe(TransactionEvent::Created, || {
//!     println!("a transaction was created");
//! });
//! buses.transactions.emit(TransactionEvent::Created);
//! ```

mod logger;

use std::fmt;
use std::sync::Arc;

use refetch::{BusEvent, EventBus};

pub use logger::spawn_activity_logger;

/// Changes to the transaction ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionEvent {
    Created,
    Updated,
    Deleted,
}

impl BusEvent for TransactionEvent {
    fn name(&self) -> &'static str {
        match self {
            TransactionEvent::Created => "transaction-created",
            TransactionEvent::Updated => "transaction-updated",
            TransactionEvent::Deleted => "transaction-deleted",
        }
    }

    fn all() -> &'static [Self] {
        &[TransactionEvent::Created, TransactionEvent::Updated, TransactionEvent::Deleted]
    }
}

impl fmt::Display for TransactionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Changes to budgets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BudgetEvent {
    Created,
    Updated,
    Deleted,
}

impl BusEvent for BudgetEvent {
    fn name(&self) -> &'static str {
        match self {
            BudgetEvent::Created => "budget-created",
            BudgetEvent::Updated => "budget-updated",
            BudgetEvent::Deleted => "budget-deleted",
        }
    }

    fn all() -> &'static [Self] {
        &[BudgetEvent::Created, BudgetEvent::Updated, BudgetEvent::Deleted]
    }
}

impl fmt::Display for BudgetEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub type TransactionBus = EventBus<TransactionEvent>;
pub type BudgetBus = EventBus<BudgetEvent>;

/// The application's buses, one per mutation domain
///
/// Constructed once at startup; clones share the same buses.
#[derive(Debug, Clone, Default)]
pub struct Buses {
    pub transactions: Arc<TransactionBus>,
    pub budgets: Arc<BudgetBus>,
}

impl Buses {
    pub fn new() -> Self {
        Self::default()
    }
}
