//! Request and response types for the backend API

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub type TransactionId = i64;
pub type BudgetId = i64;
pub type CategoryId = i64;

/// Direction of money movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    #[default]
    Expense,
}

impl TransactionKind {
    /// Sign a magnitude the way the ledger stores it: income positive, expense negative
    pub fn signed(self, amount: f64) -> f64 {
        match self {
            TransactionKind::Income => amount.abs(),
            TransactionKind::Expense => -amount.abs(),
        }
    }

    /// Kind implied by a stored amount's sign
    pub fn of_amount(amount: f64) -> Self {
        if amount < 0.0 {
            TransactionKind::Expense
        } else {
            TransactionKind::Income
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionKind::Income => write!(f, "income"),
            TransactionKind::Expense => write!(f, "expense"),
        }
    }
}

impl FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "income" => Ok(TransactionKind::Income),
            "expense" => Ok(TransactionKind::Expense),
            other => Err(format!("Unknown transaction kind '{}'. Expected income or expense", other)),
        }
    }
}

/// A ledger entry as returned by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    /// Signed amount: positive for income, negative for expenses
    pub amount: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub category_name: Option<String>,
    pub date: NaiveDate,
    #[serde(rename = "type", default)]
    pub kind: Option<TransactionKind>,
}

impl Transaction {
    pub fn kind(&self) -> TransactionKind {
        self.kind.unwrap_or_else(|| TransactionKind::of_amount(self.amount))
    }
}

/// Body of transaction create and update requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionInput {
    pub amount: f64,
    pub description: String,
    pub category_id: Option<CategoryId>,
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
}

/// Length of a budget's window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetPeriod {
    Weekly,
    #[default]
    Monthly,
    Quarterly,
    Yearly,
}

impl fmt::Display for BudgetPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BudgetPeriod::Weekly => "weekly",
            BudgetPeriod::Monthly => "monthly",
            BudgetPeriod::Quarterly => "quarterly",
            BudgetPeriod::Yearly => "yearly",
        };
        f.write_str(s)
    }
}

impl FromStr for BudgetPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "weekly" | "week" => Ok(BudgetPeriod::Weekly),
            "monthly" | "month" => Ok(BudgetPeriod::Monthly),
            "quarterly" | "quarter" => Ok(BudgetPeriod::Quarterly),
            "yearly" | "year" | "annual" => Ok(BudgetPeriod::Yearly),
            other => Err(format!(
                "Unknown budget period '{}'. Expected weekly, monthly, quarterly or yearly",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub id: BudgetId,
    pub category_id: CategoryId,
    #[serde(default)]
    pub category_name: Option<String>,
    pub amount: f64,
    #[serde(default)]
    pub period: BudgetPeriod,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Body of budget create and update requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetInput {
    pub category_id: CategoryId,
    pub amount: f64,
    pub period: BudgetPeriod,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Spending against one budget
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetStatus {
    pub budget_id: BudgetId,
    pub category_name: String,
    pub amount: f64,
    pub spent: f64,
    pub remaining: f64,
    pub percentage: f64,
}

impl BudgetStatus {
    pub fn is_over(&self) -> bool {
        self.spent > self.amount
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetOverview {
    pub total_budget: f64,
    pub total_spent: f64,
    pub total_remaining: f64,
    pub budgets: Vec<BudgetStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: Option<TransactionKind>,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FinancialSummary {
    pub total_income: f64,
    pub total_expenses: f64,
    pub net_savings: f64,
    pub savings_rate: f64,
    pub transaction_count: u64,
}

/// Income and expenses for one month of the monthly series
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonthlyTotals {
    /// Month label as `YYYY-MM`
    pub month: String,
    pub income: f64,
    pub expenses: f64,
}

impl MonthlyTotals {
    pub fn net(&self) -> f64 {
        self.income - self.expenses
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CategorySpending {
    pub category: String,
    pub amount: f64,
    pub percentage: f64,
}

/// Severity the AI service attaches to an insight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightLevel {
    #[default]
    Info,
    Warning,
    Alert,
    Success,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Insight {
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub level: InsightLevel,
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpendingPrediction {
    pub category: String,
    pub predicted_amount: f64,
    /// Model confidence in `0.0..=1.0`
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}
