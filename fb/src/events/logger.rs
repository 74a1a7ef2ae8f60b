//! Activity logger - records every domain change in the log
//!
//! Follows the buses' event streams rather than registering listeners, so a
//! slow log writer never delays `emit`.

use refetch::BusEvent;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::Buses;

/// Log every transaction and budget event until both buses are dropped
///
/// Subscribes before returning, so events emitted right after the call are
/// not missed. The task resolves to the number of events logged.
pub fn spawn_activity_logger(buses: &Buses) -> JoinHandle<usize> {
    debug!("spawn_activity_logger: called");
    let transactions = buses.transactions.stream();
    let budgets = buses.budgets.stream();

    tokio::spawn(async move {
        let (tx_count, budget_count) = tokio::join!(
            log_stream("transactions", transactions),
            log_stream("budgets", budgets)
        );
        debug!(tx_count, budget_count, "spawn_activity_logger: streams closed");
        tx_count + budget_count
    })
}

async fn log_stream<E: BusEvent>(domain: &'static str, mut rx: broadcast::Receiver<E>) -> usize {
    let mut logged = 0;
    loop {
        match rx.recv().await {
            Ok(event) => {
                info!(domain, event = event.name(), "activity");
                logged += 1;
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(domain, skipped, "activity logger fell behind");
            }
            Err(RecvError::Closed) => break,
        }
    }
    logged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{BudgetEvent, TransactionEvent};
    use std::time::Duration;

    #[tokio::test]
    async fn test_logger_counts_events_until_buses_drop() {
        let buses = Buses::new();
        let handle = spawn_activity_logger(&buses);

        buses.transactions.emit(TransactionEvent::Created);
        buses.transactions.emit(TransactionEvent::Deleted);
        buses.budgets.emit(BudgetEvent::Updated);
        drop(buses);

        let logged = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("logger should stop once buses are dropped")
            .unwrap();
        assert_eq!(logged, 3);
    }
}
