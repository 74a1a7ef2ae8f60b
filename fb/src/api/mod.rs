//! Backend API client
//!
//! Thin typed wrappers over the dashboard's REST backend. Read calls return
//! data; mutating calls additionally announce the change on the matching
//! domain bus once the backend has confirmed it.

mod analytics;
mod auth;
mod budgets;
mod categories;
mod error;
mod transactions;
pub mod transport;
mod types;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::debug;

pub use analytics::{AnalyticsApi, InsightsApi};
pub use auth::AuthApi;
pub use budgets::BudgetsApi;
pub use categories::CategoriesApi;
pub use error::ApiError;
pub use transactions::{DEFAULT_PAGE_SIZE, TransactionsApi};
pub use transport::{ApiRequest, Body, HttpTransport, Method, Transport};
pub use types::{
    Budget, BudgetId, BudgetInput, BudgetOverview, BudgetPeriod, BudgetStatus, Category, CategoryId, CategorySpending,
    FinancialSummary, Insight, InsightLevel, MonthlyTotals, RegisterRequest, SpendingPrediction, TokenResponse,
    Transaction, TransactionId, TransactionInput, TransactionKind, User,
};

use crate::config::ApiConfig;
use crate::events::Buses;

/// Create an API client from configuration
///
/// Uses the HTTP transport and picks up a bearer token from the configured
/// environment variable when one is set.
pub fn create_client(config: &ApiConfig, buses: Buses) -> Result<ApiClient, ApiError> {
    debug!(base_url = %config.base_url, "create_client: called");
    let transport = HttpTransport::new(&config.base_url, Duration::from_millis(config.timeout_ms))?;
    let client = ApiClient::new(Arc::new(transport), buses);
    match config.token() {
        Some(token) => {
            debug!("create_client: token found in environment");
            Ok(client.with_token(token))
        }
        None => Ok(client),
    }
}

/// Client for the dashboard backend
///
/// Cheap to clone; clones share the transport, the buses, and the login token.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    buses: Buses,
    token: Arc<RwLock<Option<String>>>,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>, buses: Buses) -> Self {
        Self {
            transport,
            buses,
            token: Arc::new(RwLock::new(None)),
        }
    }

    /// Start with a known bearer token
    pub fn with_token(self, token: impl Into<String>) -> Self {
        Self {
            token: Arc::new(RwLock::new(Some(token.into()))),
            ..self
        }
    }

    pub fn buses(&self) -> &Buses {
        &self.buses
    }

    pub async fn token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    pub(crate) async fn set_token(&self, token: Option<String>) {
        *self.token.write().await = token;
    }

    pub fn auth(&self) -> AuthApi<'_> {
        AuthApi::new(self)
    }

    pub fn transactions(&self) -> TransactionsApi<'_> {
        TransactionsApi::new(self)
    }

    pub fn budgets(&self) -> BudgetsApi<'_> {
        BudgetsApi::new(self)
    }

    pub fn categories(&self) -> CategoriesApi<'_> {
        CategoriesApi::new(self)
    }

    pub fn analytics(&self) -> AnalyticsApi<'_> {
        AnalyticsApi::new(self)
    }

    pub fn insights(&self) -> InsightsApi<'_> {
        InsightsApi::new(self)
    }

    /// Send a request with the current token and decode the response body
    pub(crate) async fn call<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let value = self.send(request).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Send a mutation, run `confirmed` once the backend accepts it, then decode
    ///
    /// A 2xx reply means the change is committed, so `confirmed` runs even when
    /// the body then fails to decode as `T`.
    pub(crate) async fn mutate<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
        confirmed: impl FnOnce(&Buses),
    ) -> Result<T, ApiError> {
        let value = self.send(request).await?;
        confirmed(&self.buses);
        Ok(serde_json::from_value(value)?)
    }

    /// Send a request whose response body is irrelevant
    pub(crate) async fn call_unit(&self, request: ApiRequest) -> Result<(), ApiError> {
        self.send(request).await.map(|_| ())
    }

    pub(crate) fn json_body<B: Serialize>(body: &B) -> Result<Body, ApiError> {
        Ok(Body::Json(serde_json::to_value(body)?))
    }

    async fn send(&self, request: ApiRequest) -> Result<serde_json::Value, ApiError> {
        let request = request.token(self.token().await);
        debug!(method = ?request.method, path = %request.path, "ApiClient::send");
        self.transport.send(request).await
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient").field("buses", &self.buses).finish_non_exhaustive()
    }
}
