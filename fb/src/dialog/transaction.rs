//! Transaction dialog form

use async_trait::async_trait;
use chrono::{Local, NaiveDate};

use super::{FormDialog, FormKind, ValidationError};
use crate::api::{ApiClient, ApiError, CategoryId, Transaction, TransactionInput, TransactionKind};

/// Editable transaction fields
///
/// `amount` is what the user typed. Its sign is ignored: the stored sign
/// always follows `kind`.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionForm {
    pub kind: TransactionKind,
    pub amount: f64,
    pub description: String,
    pub category_id: Option<CategoryId>,
    pub date: NaiveDate,
}

impl TransactionForm {
    pub fn validate(&self) -> Result<TransactionInput, ValidationError> {
        if !self.amount.is_finite() {
            return Err(ValidationError::NonFiniteAmount);
        }
        if self.amount == 0.0 {
            return Err(ValidationError::ZeroAmount);
        }
        let description = self.description.trim();
        if description.is_empty() {
            return Err(ValidationError::EmptyDescription);
        }

        Ok(TransactionInput {
            amount: self.kind.signed(self.amount),
            description: description.to_string(),
            category_id: self.category_id,
            date: self.date,
            kind: self.kind,
        })
    }
}

impl From<&Transaction> for TransactionForm {
    fn from(tx: &Transaction) -> Self {
        Self {
            kind: tx.kind(),
            amount: tx.amount.abs(),
            description: tx.description.clone(),
            category_id: tx.category_id,
            date: tx.date,
        }
    }
}

#[derive(Debug)]
pub struct TransactionFormKind;

#[async_trait]
impl FormKind for TransactionFormKind {
    type Entity = Transaction;
    type Form = TransactionForm;
    type Input = TransactionInput;

    fn blank() -> TransactionForm {
        TransactionForm {
            kind: TransactionKind::Expense,
            amount: 0.0,
            description: String::new(),
            category_id: None,
            date: Local::now().date_naive(),
        }
    }

    fn edit(entity: &Transaction) -> TransactionForm {
        TransactionForm::from(entity)
    }

    fn validate(form: &TransactionForm) -> Result<TransactionInput, ValidationError> {
        form.validate()
    }

    async fn create(api: &ApiClient, input: &TransactionInput) -> Result<Transaction, ApiError> {
        api.transactions().create(input).await
    }

    async fn update(api: &ApiClient, entity: &Transaction, input: &TransactionInput) -> Result<Transaction, ApiError> {
        api.transactions().update(entity.id, input).await
    }
}

pub type TransactionDialog = FormDialog<TransactionFormKind>;
