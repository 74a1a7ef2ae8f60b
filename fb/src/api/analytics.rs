//! Analytics and AI insight endpoints
//!
//! All read-only: the backend derives these from the ledger and budgets, so
//! views showing them refresh on transaction and budget events.

use tracing::debug;

use super::{
    ApiClient, ApiError, ApiRequest, CategorySpending, FinancialSummary, Insight, Method, MonthlyTotals,
    SpendingPrediction,
};

pub struct AnalyticsApi<'a> {
    client: &'a ApiClient,
}

impl<'a> AnalyticsApi<'a> {
    pub(super) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Income, expenses and savings over the current period
    pub async fn summary(&self) -> Result<FinancialSummary, ApiError> {
        debug!("AnalyticsApi::summary: called");
        self.client.call(ApiRequest::new(Method::Get, "/analytics/summary")).await
    }

    /// Income and expenses for each of the last `months` months, oldest first
    pub async fn monthly(&self, months: u32) -> Result<Vec<MonthlyTotals>, ApiError> {
        debug!(months, "AnalyticsApi::monthly: called");
        self.client
            .call(ApiRequest::new(Method::Get, "/analytics/monthly").query("months", months))
            .await
    }

    /// Expense totals per category
    pub async fn category_breakdown(&self) -> Result<Vec<CategorySpending>, ApiError> {
        debug!("AnalyticsApi::category_breakdown: called");
        self.client.call(ApiRequest::new(Method::Get, "/analytics/categories")).await
    }
}

pub struct InsightsApi<'a> {
    client: &'a ApiClient,
}

impl<'a> InsightsApi<'a> {
    pub(super) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Spending observations generated by the AI service
    pub async fn insights(&self) -> Result<Vec<Insight>, ApiError> {
        debug!("InsightsApi::insights: called");
        self.client.call(ApiRequest::new(Method::Get, "/ai/insights")).await
    }

    /// Predicted spending per category for the next month
    pub async fn predictions(&self) -> Result<Vec<SpendingPrediction>, ApiError> {
        debug!("InsightsApi::predictions: called");
        self.client.call(ApiRequest::new(Method::Get, "/ai/predictions")).await
    }
}
