//! Transaction ledger endpoints

use tracing::debug;

use super::{ApiClient, ApiError, ApiRequest, Method, Transaction, TransactionId, TransactionInput};
use crate::events::TransactionEvent;

/// Default page size for transaction listings
pub const DEFAULT_PAGE_SIZE: u32 = 100;

pub struct TransactionsApi<'a> {
    client: &'a ApiClient,
}

impl<'a> TransactionsApi<'a> {
    pub(super) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// List transactions, newest first
    pub async fn list(&self, skip: u32, limit: u32) -> Result<Vec<Transaction>, ApiError> {
        debug!(skip, limit, "TransactionsApi::list: called");
        let request = ApiRequest::new(Method::Get, "/transactions/")
            .query("skip", skip)
            .query("limit", limit);
        self.client.call(request).await
    }

    /// The `limit` most recent transactions
    pub async fn recent(&self, limit: u32) -> Result<Vec<Transaction>, ApiError> {
        self.list(0, limit).await
    }

    pub async fn get(&self, id: TransactionId) -> Result<Transaction, ApiError> {
        debug!(id, "TransactionsApi::get: called");
        self.client
            .call(ApiRequest::new(Method::Get, format!("/transactions/{}", id)))
            .await
    }

    /// Create a transaction and announce `transaction-created`
    pub async fn create(&self, input: &TransactionInput) -> Result<Transaction, ApiError> {
        debug!(amount = input.amount, kind = %input.kind, "TransactionsApi::create: called");
        let request = ApiRequest::new(Method::Post, "/transactions/").body(ApiClient::json_body(input)?);
        self.client
            .mutate(request, |buses| buses.transactions.emit(TransactionEvent::Created))
            .await
    }

    /// Replace a transaction and announce `transaction-updated`
    pub async fn update(&self, id: TransactionId, input: &TransactionInput) -> Result<Transaction, ApiError> {
        debug!(id, "TransactionsApi::update: called");
        let request =
            ApiRequest::new(Method::Put, format!("/transactions/{}", id)).body(ApiClient::json_body(input)?);
        self.client
            .mutate(request, |buses| buses.transactions.emit(TransactionEvent::Updated))
            .await
    }

    /// Delete a transaction and announce `transaction-deleted`
    pub async fn delete(&self, id: TransactionId) -> Result<(), ApiError> {
        debug!(id, "TransactionsApi::delete: called");
        self.client
            .call_unit(ApiRequest::new(Method::Delete, format!("/transactions/{}", id)))
            .await?;
        self.client.buses().transactions.emit(TransactionEvent::Deleted);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::transport::mock::MockTransport;
    use crate::api::TransactionKind;
    use crate::events::Buses;
    use chrono::NaiveDate;
    use refetch::Resource;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn sample_input() -> TransactionInput {
        TransactionInput {
            amount: -25.0,
            description: "Books".to_string(),
            category_id: Some(2),
            date: NaiveDate::from_ymd_opt(2026, 10, 2).unwrap(),
            kind: TransactionKind::Expense,
        }
    }

    fn sample_transaction(id: i64) -> serde_json::Value {
        json!({"id": id, "amount": -25.0, "description": "Books", "category_id": 2,
               "date": "2026-10-02", "type": "expense"})
    }

    fn counter(buses: &Buses, event: TransactionEvent) -> (Arc<AtomicUsize>, refetch::Subscription) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&count);
        let sub = buses.transactions.subscribe(event, move || {
            inner.fetch_add(1, Ordering::SeqCst);
        });
        (count, sub)
    }

    #[tokio::test]
    async fn test_list_sends_paging_query() {
        let transport = Arc::new(MockTransport::new().ok(Method::Get, "/transactions/", json!([sample_transaction(1)])));
        let client = ApiClient::new(transport.clone(), Buses::new());

        let txs = client.transactions().recent(5).await.unwrap();
        assert_eq!(txs.len(), 1);

        let request = &transport.requests()[0];
        assert_eq!(
            request.query,
            vec![("skip".to_string(), "0".to_string()), ("limit".to_string(), "5".to_string())]
        );
    }

    #[tokio::test]
    async fn test_mutations_emit_matching_events() {
        let transport = Arc::new(
            MockTransport::new()
                .ok(Method::Post, "/transactions/", sample_transaction(9))
                .ok(Method::Put, "/transactions/9", sample_transaction(9))
                .ok(Method::Delete, "/transactions/9", serde_json::Value::Null),
        );
        let buses = Buses::new();
        let client = ApiClient::new(transport, buses.clone());
        let (created, _a) = counter(&buses, TransactionEvent::Created);
        let (updated, _b) = counter(&buses, TransactionEvent::Updated);
        let (deleted, _c) = counter(&buses, TransactionEvent::Deleted);

        client.transactions().create(&sample_input()).await.unwrap();
        assert_eq!(created.load(Ordering::SeqCst), 1);

        client.transactions().update(9, &sample_input()).await.unwrap();
        assert_eq!(updated.load(Ordering::SeqCst), 1);

        client.transactions().delete(9).await.unwrap();
        assert_eq!(deleted.load(Ordering::SeqCst), 1);
        assert_eq!(created.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_mutation_emits_nothing() {
        let transport = Arc::new(MockTransport::new().status(
            Method::Post,
            "/transactions/",
            422,
            r#"{"detail": "amount must not be zero"}"#,
        ));
        let buses = Buses::new();
        let client = ApiClient::new(transport, buses.clone());
        let (created, _sub) = counter(&buses, TransactionEvent::Created);

        let err = client.transactions().create(&sample_input()).await.unwrap_err();
        assert_eq!(err.to_string(), "API error 422: amount must not be zero");
        assert_eq!(created.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_committed_create_emits_even_when_reply_is_malformed() {
        let transport = Arc::new(MockTransport::new().ok(Method::Post, "/transactions/", json!({"id": 5, "amount": -1.0})));
        let buses = Buses::new();
        let client = ApiClient::new(transport, buses.clone());
        let (created, _sub) = counter(&buses, TransactionEvent::Created);

        let err = client.transactions().create(&sample_input()).await.unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
        assert_eq!(created.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_create_refreshes_subscribed_resource_once() {
        let transport = Arc::new(
            MockTransport::new()
                .ok(Method::Post, "/transactions/", sample_transaction(3))
                .ok(Method::Get, "/transactions/", json!([])),
        );
        let buses = Buses::new();
        let client = ApiClient::new(transport.clone(), buses.clone());

        let fetches = Arc::new(AtomicUsize::new(0));
        let resource = {
            let client = client.clone();
            let fetches = Arc::clone(&fetches);
            Resource::builder("recent", move || {
                fetches.fetch_add(1, Ordering::SeqCst);
                let client = client.clone();
                async move { client.transactions().recent(5).await }
            })
            .refresh_on(&buses.transactions, TransactionEvent::Created)
            .spawn()
        };
        resource.settled().await;
        assert_eq!(fetches.load(Ordering::SeqCst), 1);

        client.transactions().create(&sample_input()).await.unwrap();
        assert_eq!(fetches.load(Ordering::SeqCst), 2);

        resource.settled().await;
        assert_eq!(transport.count(Method::Get, "/transactions/"), 2);
    }
}
