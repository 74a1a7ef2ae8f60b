//! Finboard - personal-finance dashboard client
//!
//! Talks to the dashboard's REST backend and keeps derived views fresh after
//! every change. A mutation made through the API client is announced on a
//! domain bus once the backend confirms it, and every dashboard view that
//! depends on that domain fetches again.
//!
//! # Modules
//!
//! - [`api`] - typed backend client; mutations emit domain events
//! - [`events`] - transaction and budget buses, activity logger
//! - [`dashboard`] - dashboard views as refetching resources
//! - [`dialog`] - create/edit form dialogs with local validation
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod api;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod dialog;
pub mod events;

pub use api::{ApiClient, ApiError, create_client};
pub use config::Config;
pub use dashboard::{Dashboard, DashboardKey, InsightsPanel};
pub use dialog::{BudgetDialog, DialogError, TransactionDialog};
pub use events::{BudgetEvent, Buses, TransactionEvent, spawn_activity_logger};
