//! CLI command definitions and subcommands

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::debug;

use crate::api::{BudgetId, BudgetPeriod, CategoryId, DEFAULT_PAGE_SIZE, TransactionId, TransactionKind};

/// Finboard - personal-finance dashboard client
#[derive(Parser)]
#[command(
    name = "fb",
    about = "Personal-finance dashboard client",
    version = env!("CARGO_PKG_VERSION"),
    after_help = after_help()
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the dashboard: summary, monthly series, categories, recent activity, budgets
    Dashboard {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Manage transactions
    Transactions {
        #[command(subcommand)]
        command: TransactionCommand,
    },

    /// Manage budgets
    Budgets {
        #[command(subcommand)]
        command: BudgetCommand,
    },

    /// List categories
    Categories,

    /// Show AI insights and spending predictions
    Insights,

    /// Log in and print a bearer token
    Login {
        username: String,

        /// Password (read from FINBOARD_PASSWORD when omitted)
        #[arg(short, long, env = "FINBOARD_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Show the user the current token belongs to
    Me,
}

/// Transaction subcommands
#[derive(Debug, Subcommand)]
pub enum TransactionCommand {
    /// List transactions, newest first
    List {
        /// Number of transactions to skip
        #[arg(long, default_value = "0")]
        skip: u32,

        /// Maximum number of transactions
        #[arg(short = 'n', long, default_value_t = DEFAULT_PAGE_SIZE)]
        limit: u32,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Record a transaction
    Add {
        /// income or expense
        kind: TransactionKind,

        /// Amount; the sign is taken from the kind
        #[arg(allow_negative_numbers = true)]
        amount: f64,

        description: String,

        #[arg(long)]
        category: Option<CategoryId>,

        /// Date as YYYY-MM-DD (defaults to today)
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// Change fields of an existing transaction
    Edit {
        id: TransactionId,

        #[arg(short, long)]
        kind: Option<TransactionKind>,

        #[arg(short, long, allow_negative_numbers = true)]
        amount: Option<f64>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        category: Option<CategoryId>,

        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// Delete a transaction
    Delete { id: TransactionId },
}

/// Budget subcommands
#[derive(Debug, Subcommand)]
pub enum BudgetCommand {
    /// List budgets
    List,

    /// Spending against every active budget
    Overview,

    /// Create a budget covering the period that contains --date
    Add {
        category: CategoryId,

        #[arg(allow_negative_numbers = true)]
        amount: f64,

        /// weekly, monthly, quarterly or yearly
        #[arg(short, long, default_value = "monthly")]
        period: BudgetPeriod,

        /// Any date inside the period (defaults to today)
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// Delete a budget
    Delete { id: BudgetId },
}

/// Output format for listing commands
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "OutputFormat::from_str: called");
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Log file location
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("finboard")
        .join("logs")
        .join("finboard.log")
}

fn after_help() -> String {
    format!("Logs are written to: {}", get_log_path().display())
}
