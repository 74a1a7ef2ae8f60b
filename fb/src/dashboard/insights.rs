//! AI insights panel

use std::fmt;

use refetch::{LoadingMap, Resource};
use tracing::debug;

use crate::api::{ApiClient, Insight, SpendingPrediction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InsightsKey {
    Insights,
    Predictions,
}

impl InsightsKey {
    pub fn name(self) -> &'static str {
        match self {
            InsightsKey::Insights => "insights",
            InsightsKey::Predictions => "predictions",
        }
    }
}

impl fmt::Display for InsightsKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Insights and spending predictions, refreshed on every ledger change
///
/// Budgets do not feed the AI service, so budget events are ignored here.
#[derive(Debug)]
pub struct InsightsPanel {
    pub insights: Resource<Vec<Insight>>,
    pub predictions: Resource<Vec<SpendingPrediction>>,
}

impl InsightsPanel {
    pub fn spawn(api: &ApiClient) -> Self {
        debug!("InsightsPanel::spawn: called");
        let buses = api.buses();

        let insights = {
            let api = api.clone();
            Resource::builder(InsightsKey::Insights.name(), move || {
                let api = api.clone();
                async move { api.insights().insights().await }
            })
            .refresh_on_all(&buses.transactions)
            .spawn()
        };

        let predictions = {
            let api = api.clone();
            Resource::builder(InsightsKey::Predictions.name(), move || {
                let api = api.clone();
                async move { api.insights().predictions().await }
            })
            .refresh_on_all(&buses.transactions)
            .spawn()
        };

        Self { insights, predictions }
    }

    pub fn loading(&self) -> LoadingMap<InsightsKey> {
        [
            (InsightsKey::Insights, self.insights.loading()),
            (InsightsKey::Predictions, self.predictions.loading()),
        ]
        .into_iter()
        .collect()
    }

    pub async fn settled(&self) -> LoadingMap<InsightsKey> {
        loop {
            futures::join!(self.insights.settled(), self.predictions.settled());
            let loading = self.loading();
            if !loading.is_any_loading() {
                return loading;
            }
        }
    }
}
