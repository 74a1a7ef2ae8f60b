//! Budget dialog form

use async_trait::async_trait;
use chrono::{Datelike, Days, Local, Months, NaiveDate};

use super::{FormDialog, FormKind, ValidationError};
use crate::api::{ApiClient, ApiError, Budget, BudgetInput, BudgetPeriod, CategoryId};

impl BudgetPeriod {
    /// Calendar window of this period that contains `date`
    ///
    /// Weeks run Monday to Sunday and quarters start in January, April, July
    /// and October. Both ends are inclusive. Returns `None` only at the edges
    /// of the representable date range.
    pub fn range_containing(self, date: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
        let (start, length) = match self {
            BudgetPeriod::Weekly => {
                let start = date.checked_sub_days(Days::new(date.weekday().num_days_from_monday().into()))?;
                let end = start.checked_add_days(Days::new(6))?;
                return Some((start, end));
            }
            BudgetPeriod::Monthly => (date.with_day(1)?, 1),
            BudgetPeriod::Quarterly => {
                let first_month = (date.month0() / 3) * 3 + 1;
                (NaiveDate::from_ymd_opt(date.year(), first_month, 1)?, 3)
            }
            BudgetPeriod::Yearly => (NaiveDate::from_ymd_opt(date.year(), 1, 1)?, 12),
        };
        let end = start.checked_add_months(Months::new(length))?.pred_opt()?;
        Some((start, end))
    }
}

/// Editable budget fields
///
/// The stored start and end dates are derived from `period` and `anchor`,
/// so a budget always covers one whole calendar window.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetForm {
    pub category_id: Option<CategoryId>,
    pub amount: f64,
    pub period: BudgetPeriod,
    /// Any day inside the window the budget should cover
    pub anchor: NaiveDate,
}

impl BudgetForm {
    pub fn validate(&self) -> Result<BudgetInput, ValidationError> {
        if !self.amount.is_finite() {
            return Err(ValidationError::NonFiniteAmount);
        }
        if self.amount <= 0.0 {
            return Err(ValidationError::NonPositiveBudget);
        }
        let category_id = self.category_id.ok_or(ValidationError::MissingCategory)?;
        let (start_date, end_date) = self
            .period
            .range_containing(self.anchor)
            .ok_or(ValidationError::DateOutOfRange(self.anchor))?;

        Ok(BudgetInput {
            category_id,
            amount: self.amount,
            period: self.period,
            start_date,
            end_date,
        })
    }
}

impl From<&Budget> for BudgetForm {
    fn from(budget: &Budget) -> Self {
        Self {
            category_id: Some(budget.category_id),
            amount: budget.amount,
            period: budget.period,
            anchor: budget.start_date,
        }
    }
}

#[derive(Debug)]
pub struct BudgetFormKind;

#[async_trait]
impl FormKind for BudgetFormKind {
    type Entity = Budget;
    type Form = BudgetForm;
    type Input = BudgetInput;

    fn blank() -> BudgetForm {
        BudgetForm {
            category_id: None,
            amount: 0.0,
            period: BudgetPeriod::default(),
            anchor: Local::now().date_naive(),
        }
    }

    fn edit(entity: &Budget) -> BudgetForm {
        BudgetForm::from(entity)
    }

    fn validate(form: &BudgetForm) -> Result<BudgetInput, ValidationError> {
        form.validate()
    }

    async fn create(api: &ApiClient, input: &BudgetInput) -> Result<Budget, ApiError> {
        api.budgets().create(input).await
    }

    async fn update(api: &ApiClient, entity: &Budget, input: &BudgetInput) -> Result<Budget, ApiError> {
        api.budgets().update(entity.id, input).await
    }
}

pub type BudgetDialog = FormDialog<BudgetFormKind>;
