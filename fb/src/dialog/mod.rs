//! Create/edit form dialogs
//!
//! A dialog is opened either for a new entity or for an existing one, and the
//! two cases are distinct variants of [`DialogTarget`]. Submitting validates
//! the form locally, calls create or update accordingly, and closes the dialog
//! as soon as the backend accepts the change. Other views learn about the
//! change from the domain bus the API client emits on; the dialog itself never
//! emits and never waits for those views to refresh.

mod budget;
mod transaction;

use std::fmt::Debug;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;
use tracing::debug;

use crate::api::{ApiClient, ApiError};

pub use budget::{BudgetDialog, BudgetForm, BudgetFormKind};
pub use transaction::{TransactionDialog, TransactionForm, TransactionFormKind};

/// Problems found in a form before anything is sent
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Amount must be a finite number")]
    NonFiniteAmount,

    #[error("Amount must not be zero")]
    ZeroAmount,

    #[error("Budget amount must be greater than zero")]
    NonPositiveBudget,

    #[error("Description is required")]
    EmptyDescription,

    #[error("Category is required")]
    MissingCategory,

    #[error("No date range can be derived from {0}")]
    DateOutOfRange(NaiveDate),
}

#[derive(Debug, Error)]
pub enum DialogError {
    #[error("Dialog is not open")]
    NotOpen,

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// What a dialog was opened for
#[derive(Debug, Clone, PartialEq)]
pub enum DialogTarget<E> {
    New,
    Existing(E),
}

/// The entity-specific half of a form dialog
#[async_trait]
pub trait FormKind: Send + Sync + 'static {
    /// Entity as returned by the backend
    type Entity: Clone + Debug + Send + Sync;
    /// Editable field values
    type Form: Clone + Debug + Send + Sync;
    /// Validated request body
    type Input: Send + Sync;

    /// Form for a new entity
    fn blank() -> Self::Form;

    /// Form prefilled from an existing entity
    fn edit(entity: &Self::Entity) -> Self::Form;

    fn validate(form: &Self::Form) -> Result<Self::Input, ValidationError>;

    async fn create(api: &ApiClient, input: &Self::Input) -> Result<Self::Entity, ApiError>;

    async fn update(api: &ApiClient, entity: &Self::Entity, input: &Self::Input) -> Result<Self::Entity, ApiError>;
}

#[derive(Debug)]
pub enum DialogState<K: FormKind> {
    Closed,
    Open {
        target: DialogTarget<K::Entity>,
        form: K::Form,
        /// Message of the last failed submit
        error: Option<String>,
    },
}

/// Modal create/edit dialog
#[derive(Debug)]
pub struct FormDialog<K: FormKind> {
    state: DialogState<K>,
}

impl<K: FormKind> Default for FormDialog<K> {
    fn default() -> Self {
        Self {
            state: DialogState::Closed,
        }
    }
}

impl<K: FormKind> FormDialog<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_new(&mut self) {
        debug!("FormDialog::open_new: called");
        self.state = DialogState::Open {
            target: DialogTarget::New,
            form: K::blank(),
            error: None,
        };
    }

    pub fn open_edit(&mut self, entity: K::Entity) {
        debug!(?entity, "FormDialog::open_edit: called");
        self.state = DialogState::Open {
            form: K::edit(&entity),
            target: DialogTarget::Existing(entity),
            error: None,
        };
    }

    /// Close without saving
    pub fn close(&mut self) {
        self.state = DialogState::Closed;
    }

    pub fn state(&self) -> &DialogState<K> {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, DialogState::Open { .. })
    }

    pub fn target(&self) -> Option<&DialogTarget<K::Entity>> {
        match &self.state {
            DialogState::Open { target, .. } => Some(target),
            DialogState::Closed => None,
        }
    }

    pub fn form(&self) -> Option<&K::Form> {
        match &self.state {
            DialogState::Open { form, .. } => Some(form),
            DialogState::Closed => None,
        }
    }

    pub fn form_mut(&mut self) -> Option<&mut K::Form> {
        match &mut self.state {
            DialogState::Open { form, .. } => Some(form),
            DialogState::Closed => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            DialogState::Open { error, .. } => error.as_deref(),
            DialogState::Closed => None,
        }
    }

    /// Validate and save the form
    ///
    /// On success the dialog closes and the saved entity is returned. On a
    /// validation or backend failure the dialog stays open with the message
    /// set, and nothing is announced on any bus.
    pub async fn submit(&mut self, api: &ApiClient) -> Result<K::Entity, DialogError> {
        let DialogState::Open { target, form, error } = &mut self.state else {
            debug!("FormDialog::submit: dialog not open");
            return Err(DialogError::NotOpen);
        };

        let input = match K::validate(form) {
            Ok(input) => input,
            Err(e) => {
                debug!(error = %e, "FormDialog::submit: validation failed");
                *error = Some(e.to_string());
                return Err(DialogError::Invalid(e));
            }
        };
        *error = None;

        let result = match target {
            DialogTarget::New => K::create(api, &input).await,
            DialogTarget::Existing(entity) => K::update(api, entity, &input).await,
        };

        match result {
            Ok(saved) => {
                debug!("FormDialog::submit: saved, closing");
                self.state = DialogState::Closed;
                Ok(saved)
            }
            Err(e) => {
                debug!(error = %e, "FormDialog::submit: backend rejected");
                if let DialogState::Open { error, .. } = &mut self.state {
                    *error = Some(e.to_string());
                }
                Err(DialogError::Api(e))
            }
        }
    }
}
