//! Dashboard data
//!
//! The dashboard shows five independently loaded views of the backend. Each
//! is a [`Resource`] that refetches whenever any transaction or budget change
//! is announced, since every figure on the page is derived from both.

mod insights;

use std::fmt;

use futures::future::join_all;
use refetch::{LoadingMap, LoadingState, Resource};
use tracing::debug;

use crate::api::{ApiClient, ApiError, BudgetOverview, CategorySpending, FinancialSummary, MonthlyTotals, Transaction};
use crate::config::DashboardConfig;
use crate::events::Buses;

pub use insights::{InsightsKey, InsightsPanel};

/// Identifies one dashboard view in the loading map
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DashboardKey {
    Summary,
    Monthly,
    Categories,
    RecentTransactions,
    BudgetOverview,
}

impl DashboardKey {
    pub const ALL: [DashboardKey; 5] = [
        DashboardKey::Summary,
        DashboardKey::Monthly,
        DashboardKey::Categories,
        DashboardKey::RecentTransactions,
        DashboardKey::BudgetOverview,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DashboardKey::Summary => "summary",
            DashboardKey::Monthly => "monthly",
            DashboardKey::Categories => "categories",
            DashboardKey::RecentTransactions => "recent-transactions",
            DashboardKey::BudgetOverview => "budget-overview",
        }
    }
}

impl fmt::Display for DashboardKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Build a resource that refetches on every event of both buses
pub(crate) fn follow_all<T, F, Fut>(name: &str, buses: &Buses, fetch: F) -> Resource<T>
where
    T: Default + Send + Sync + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
{
    Resource::builder(name, fetch)
        .refresh_on_all(&buses.transactions)
        .refresh_on_all(&buses.budgets)
        .spawn()
}

/// The dashboard's live data
///
/// Each view loads on its own; a failing view does not hold back the others.
/// Dropping the dashboard unsubscribes all of its views.
#[derive(Debug)]
pub struct Dashboard {
    pub summary: Resource<FinancialSummary>,
    pub monthly: Resource<Vec<MonthlyTotals>>,
    pub categories: Resource<Vec<CategorySpending>>,
    pub recent: Resource<Vec<Transaction>>,
    pub budgets: Resource<BudgetOverview>,
}

impl Dashboard {
    /// Create every view and start its initial fetch
    ///
    /// Must be called inside a tokio runtime.
    pub fn spawn(api: &ApiClient, config: &DashboardConfig) -> Self {
        debug!(recent_limit = config.recent_limit, months = config.months, "Dashboard::spawn: called");
        let buses = api.buses().clone();

        let summary = {
            let api = api.clone();
            follow_all(DashboardKey::Summary.name(), &buses, move || {
                let api = api.clone();
                async move { api.analytics().summary().await }
            })
        };

        let monthly = {
            let api = api.clone();
            let months = config.months;
            follow_all(DashboardKey::Monthly.name(), &buses, move || {
                let api = api.clone();
                async move { api.analytics().monthly(months).await }
            })
        };

        let categories = {
            let api = api.clone();
            follow_all(DashboardKey::Categories.name(), &buses, move || {
                let api = api.clone();
                async move { api.analytics().category_breakdown().await }
            })
        };

        let recent = {
            let api = api.clone();
            let limit = config.recent_limit;
            follow_all(DashboardKey::RecentTransactions.name(), &buses, move || {
                let api = api.clone();
                async move { api.transactions().recent(limit).await }
            })
        };

        let budgets = {
            let api = api.clone();
            follow_all(DashboardKey::BudgetOverview.name(), &buses, move || {
                let api = api.clone();
                async move { api.budgets().overview().await }
            })
        };

        Self {
            summary,
            monthly,
            categories,
            recent,
            budgets,
        }
    }

    fn loading_of(&self, key: DashboardKey) -> LoadingState {
        match key {
            DashboardKey::Summary => self.summary.loading(),
            DashboardKey::Monthly => self.monthly.loading(),
            DashboardKey::Categories => self.categories.loading(),
            DashboardKey::RecentTransactions => self.recent.loading(),
            DashboardKey::BudgetOverview => self.budgets.loading(),
        }
    }

    /// Current loading state of every view
    pub fn loading(&self) -> LoadingMap<DashboardKey> {
        DashboardKey::ALL
            .into_iter()
            .map(|key| (key, self.loading_of(key)))
            .collect()
    }

    pub fn is_any_loading(&self) -> bool {
        self.loading().is_any_loading()
    }

    pub fn has_any_error(&self) -> bool {
        self.loading().has_any_error()
    }

    /// Refetch every view and wait for all of them
    pub async fn reload_all(&self) {
        debug!("Dashboard::reload_all: called");
        join_all([
            self.summary.reload(),
            self.monthly.reload(),
            self.categories.reload(),
            self.recent.reload(),
            self.budgets.reload(),
        ])
        .await;
    }

    /// Wait until no view is loading and return the loading map at that point
    pub async fn settled(&self) -> LoadingMap<DashboardKey> {
        loop {
            futures::join!(
                self.summary.settled(),
                self.monthly.settled(),
                self.categories.settled(),
                self.recent.settled(),
                self.budgets.settled(),
            );
            let loading = self.loading();
            if !loading.is_any_loading() {
                return loading;
            }
        }
    }
}
