//! Budget endpoints

use tracing::debug;

use super::{ApiClient, ApiError, ApiRequest, Budget, BudgetId, BudgetInput, BudgetOverview, Method};
use crate::events::BudgetEvent;

pub struct BudgetsApi<'a> {
    client: &'a ApiClient,
}

impl<'a> BudgetsApi<'a> {
    pub(super) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self) -> Result<Vec<Budget>, ApiError> {
        debug!("BudgetsApi::list: called");
        self.client.call(ApiRequest::new(Method::Get, "/budgets/")).await
    }

    /// Spending against every active budget
    pub async fn overview(&self) -> Result<BudgetOverview, ApiError> {
        debug!("BudgetsApi::overview: called");
        self.client.call(ApiRequest::new(Method::Get, "/budgets/overview")).await
    }

    /// Create a budget and announce `budget-created`
    pub async fn create(&self, input: &BudgetInput) -> Result<Budget, ApiError> {
        debug!(category_id = input.category_id, period = %input.period, "BudgetsApi::create: called");
        let request = ApiRequest::new(Method::Post, "/budgets/").body(ApiClient::json_body(input)?);
        self.client
            .mutate(request, |buses| buses.budgets.emit(BudgetEvent::Created))
            .await
    }

    /// Replace a budget and announce `budget-updated`
    pub async fn update(&self, id: BudgetId, input: &BudgetInput) -> Result<Budget, ApiError> {
        debug!(id, "BudgetsApi::update: called");
        let request = ApiRequest::new(Method::Put, format!("/budgets/{}", id)).body(ApiClient::json_body(input)?);
        self.client
            .mutate(request, |buses| buses.budgets.emit(BudgetEvent::Updated))
            .await
    }

    /// Delete a budget and announce `budget-deleted`
    pub async fn delete(&self, id: BudgetId) -> Result<(), ApiError> {
        debug!(id, "BudgetsApi::delete: called");
        self.client
            .call_unit(ApiRequest::new(Method::Delete, format!("/budgets/{}", id)))
            .await?;
        self.client.buses().budgets.emit(BudgetEvent::Deleted);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::BudgetPeriod;
    use crate::api::transport::mock::MockTransport;
    use crate::events::Buses;
    use chrono::NaiveDate;
    use refetch::Resource;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn food_budget() -> BudgetInput {
        BudgetInput {
            category_id: 4,
            amount: 400.0,
            period: BudgetPeriod::Monthly,
            start_date: NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 10, 31).unwrap(),
        }
    }

    fn budget_json(id: i64) -> serde_json::Value {
        json!({"id": id, "category_id": 4, "amount": 400.0, "period": "monthly",
               "start_date": "2026-10-01", "end_date": "2026-10-31"})
    }

    #[tokio::test]
    async fn test_overview_refreshes_on_create_but_not_on_failure() {
        let transport = Arc::new(
            MockTransport::new()
                .ok(Method::Get, "/budgets/overview", json!({"total_budget": 400.0}))
                .ok(Method::Post, "/budgets/", budget_json(1))
                .status(Method::Post, "/budgets/", 503, r#"{"detail": "database unavailable"}"#),
        );
        let buses = Buses::new();
        let client = ApiClient::new(transport, buses.clone());

        let emitted = Arc::new(AtomicUsize::new(0));
        let _watch_created = {
            let emitted = Arc::clone(&emitted);
            buses.budgets.subscribe(BudgetEvent::Created, move || {
                emitted.fetch_add(1, Ordering::SeqCst);
            })
        };

        let fetches = Arc::new(AtomicUsize::new(0));
        let overview = {
            let client = client.clone();
            let fetches = Arc::clone(&fetches);
            Resource::builder("overview", move || {
                fetches.fetch_add(1, Ordering::SeqCst);
                let client = client.clone();
                async move { client.budgets().overview().await }
            })
            .refresh_on(&buses.budgets, BudgetEvent::Created)
            .refresh_on(&buses.budgets, BudgetEvent::Updated)
            .spawn()
        };
        assert_eq!(overview.settled().await.data.total_budget, 400.0);
        let before = fetches.load(Ordering::SeqCst);

        client.budgets().create(&food_budget()).await.unwrap();
        assert_eq!(fetches.load(Ordering::SeqCst), before + 1);
        assert_eq!(emitted.load(Ordering::SeqCst), 1);

        let err = client.budgets().create(&food_budget()).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(fetches.load(Ordering::SeqCst), before + 1);
        assert_eq!(emitted.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_committed_update_emits_even_when_reply_is_malformed() {
        let transport = Arc::new(MockTransport::new().ok(Method::Put, "/budgets/1", json!({"id": 1})));
        let buses = Buses::new();
        let client = ApiClient::new(transport, buses.clone());
        let mut stream = buses.budgets.stream();

        let err = client.budgets().update(1, &food_budget()).await.unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
        assert_eq!(stream.try_recv().unwrap(), BudgetEvent::Updated);
    }

    #[tokio::test]
    async fn test_update_and_delete_emit() {
        let transport = Arc::new(
            MockTransport::new()
                .ok(Method::Put, "/budgets/1", budget_json(1))
                .ok(Method::Delete, "/budgets/1", serde_json::Value::Null),
        );
        let buses = Buses::new();
        let client = ApiClient::new(transport, buses.clone());
        let mut stream = buses.budgets.stream();

        let updated = client.budgets().update(1, &food_budget()).await.unwrap();
        assert_eq!(updated.id, 1);
        client.budgets().delete(1).await.unwrap();

        assert_eq!(stream.recv().await.unwrap(), BudgetEvent::Updated);
        assert_eq!(stream.recv().await.unwrap(), BudgetEvent::Deleted);
    }
}
