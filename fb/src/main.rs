//! Finboard - personal-finance dashboard client
//!
//! CLI entry point.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing::{debug, info};

use finboard::api::{ApiClient, BudgetPeriod, CategoryId, Transaction, TransactionId, TransactionKind, create_client};
use finboard::cli::{BudgetCommand, Cli, Command, OutputFormat, TransactionCommand};
use finboard::config::Config;
use finboard::dashboard::{Dashboard, InsightsPanel};
use finboard::dialog::{BudgetDialog, TransactionDialog};
use finboard::events::{Buses, spawn_activity_logger};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("finboard")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > INFO
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(log_dir.join("finboard.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!(base_url = %config.api.base_url, "Finboard loaded config");

    let buses = Buses::new();
    let activity = spawn_activity_logger(&buses);
    let api = create_client(&config.api, buses).context("Failed to create API client")?;

    let result = dispatch(cli.command, &config, &api).await;

    // Give the activity logger a moment to record what the command changed
    drop(api);
    if let Ok(Ok(logged)) = tokio::time::timeout(Duration::from_millis(200), activity).await {
        debug!(logged, "main: activity logger finished");
    }

    result
}

async fn dispatch(command: Option<Command>, config: &Config, api: &ApiClient) -> Result<()> {
    debug!(?command, "main: dispatching command");
    match command {
        Some(Command::Dashboard { format }) => cmd_dashboard(config, api, format).await,
        Some(Command::Transactions { command }) => match command {
            TransactionCommand::List { skip, limit, format } => cmd_transactions_list(api, skip, limit, format).await,
            TransactionCommand::Add {
                kind,
                amount,
                description,
                category,
                date,
            } => cmd_transaction_add(api, kind, amount, description, category, date).await,
            TransactionCommand::Edit {
                id,
                kind,
                amount,
                description,
                category,
                date,
            } => cmd_transaction_edit(api, id, kind, amount, description, category, date).await,
            TransactionCommand::Delete { id } => {
                api.transactions().delete(id).await?;
                println!("{} Deleted transaction {}", "✓".green(), id);
                Ok(())
            }
        },
        Some(Command::Budgets { command }) => match command {
            BudgetCommand::List => cmd_budgets_list(api).await,
            BudgetCommand::Overview => cmd_budgets_overview(api).await,
            BudgetCommand::Add {
                category,
                amount,
                period,
                date,
            } => cmd_budget_add(api, category, amount, period, date).await,
            BudgetCommand::Delete { id } => {
                api.budgets().delete(id).await?;
                println!("{} Deleted budget {}", "✓".green(), id);
                Ok(())
            }
        },
        Some(Command::Categories) => cmd_categories(api).await,
        Some(Command::Insights) => cmd_insights(api).await,
        Some(Command::Login { username, password }) => cmd_login(config, api, &username, &password).await,
        Some(Command::Me) => {
            let user = api.auth().me().await?;
            println!("{} ({})", user.username.cyan(), user.email);
            Ok(())
        }
        None => {
            debug!("main: no command specified, showing dashboard");
            cmd_dashboard(config, api, OutputFormat::Text).await
        }
    }
}

fn money(amount: f64) -> ColoredString {
    let text = format!("{:>10.2}", amount);
    if amount < 0.0 { text.red() } else { text.green() }
}

fn print_transaction(tx: &Transaction) {
    println!(
        "{:>6}  {}  {}  {}  {}",
        tx.id.to_string().dimmed(),
        tx.date,
        money(tx.amount),
        tx.description,
        tx.category_name.as_deref().unwrap_or("").yellow()
    );
}

async fn cmd_dashboard(config: &Config, api: &ApiClient, format: OutputFormat) -> Result<()> {
    debug!(%format, "cmd_dashboard: called");
    let dashboard = Dashboard::spawn(api, &config.dashboard);
    let loading = dashboard.settled().await;

    if format == OutputFormat::Json {
        let errors: Vec<_> = loading
            .errors()
            .into_iter()
            .map(|(key, message)| serde_json::json!({"view": key.name(), "error": message}))
            .collect();
        let json = serde_json::json!({
            "summary": dashboard.summary.data(),
            "monthly": dashboard.monthly.data(),
            "categories": dashboard.categories.data(),
            "recent_transactions": dashboard.recent.data(),
            "budget_overview": dashboard.budgets.data(),
            "errors": errors,
        });
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    let summary = dashboard.summary.data();
    println!("{}", "Summary".bold());
    println!("  Income    {}", money(summary.total_income));
    println!("  Expenses  {}", money(-summary.total_expenses));
    println!("  Savings   {}  ({:.1}%)", money(summary.net_savings), summary.savings_rate);

    println!("\n{}", "Monthly".bold());
    for month in dashboard.monthly.data() {
        println!("  {}  {}  {}  {}", month.month, money(month.income), money(-month.expenses), money(month.net()));
    }

    println!("\n{}", "Spending by category".bold());
    for spending in dashboard.categories.data() {
        println!("  {:<20} {}  {:>5.1}%", spending.category, money(-spending.amount), spending.percentage);
    }

    println!("\n{}", "Recent transactions".bold());
    for tx in dashboard.recent.data() {
        print_transaction(&tx);
    }

    let overview = dashboard.budgets.data();
    println!("\n{}", "Budgets".bold());
    for status in &overview.budgets {
        let pct = format!("{:>5.1}%", status.percentage);
        let pct = if status.is_over() { pct.red() } else { pct.normal() };
        println!("  {:<20} {} of {}  {}", status.category_name, money(status.spent), money(status.amount), pct);
    }
    println!("  {:<20} {} of {}", "Total", money(overview.total_spent), money(overview.total_budget));

    for (key, message) in loading.errors() {
        eprintln!("{} {}: {}", "✗".red(), key, message);
    }
    Ok(())
}

async fn cmd_transactions_list(api: &ApiClient, skip: u32, limit: u32, format: OutputFormat) -> Result<()> {
    debug!(skip, limit, %format, "cmd_transactions_list: called");
    let transactions = api.transactions().list(skip, limit).await?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&transactions)?),
        OutputFormat::Text => {
            if transactions.is_empty() {
                println!("No transactions found.");
            }
            for tx in &transactions {
                print_transaction(tx);
            }
        }
    }
    Ok(())
}

async fn cmd_transaction_add(
    api: &ApiClient,
    kind: TransactionKind,
    amount: f64,
    description: String,
    category: Option<CategoryId>,
    date: Option<NaiveDate>,
) -> Result<()> {
    debug!(%kind, amount, "cmd_transaction_add: called");
    let mut dialog = TransactionDialog::new();
    dialog.open_new();
    if let Some(form) = dialog.form_mut() {
        form.kind = kind;
        form.amount = amount;
        form.description = description;
        form.category_id = category;
        form.date = date.unwrap_or_else(|| Local::now().date_naive());
    }

    let created = dialog.submit(api).await?;
    println!("{} Created transaction {}", "✓".green(), created.id);
    print_transaction(&created);
    Ok(())
}

async fn cmd_transaction_edit(
    api: &ApiClient,
    id: TransactionId,
    kind: Option<TransactionKind>,
    amount: Option<f64>,
    description: Option<String>,
    category: Option<CategoryId>,
    date: Option<NaiveDate>,
) -> Result<()> {
    debug!(id, "cmd_transaction_edit: called");
    let existing = api.transactions().get(id).await?;

    let mut dialog = TransactionDialog::new();
    dialog.open_edit(existing);
    if let Some(form) = dialog.form_mut() {
        if let Some(kind) = kind {
            form.kind = kind;
        }
        if let Some(amount) = amount {
            form.amount = amount;
        }
        if let Some(description) = description {
            form.description = description;
        }
        if category.is_some() {
            form.category_id = category;
        }
        if let Some(date) = date {
            form.date = date;
        }
    }

    let updated = dialog.submit(api).await?;
    println!("{} Updated transaction {}", "✓".green(), updated.id);
    print_transaction(&updated);
    Ok(())
}

async fn cmd_budgets_list(api: &ApiClient) -> Result<()> {
    debug!("cmd_budgets_list: called");
    let budgets = api.budgets().list().await?;
    if budgets.is_empty() {
        println!("No budgets found.");
    }
    for budget in budgets {
        println!(
            "{:>6}  {:<20} {}  {:<9} {} – {}",
            budget.id.to_string().dimmed(),
            budget.category_name.unwrap_or_else(|| format!("category {}", budget.category_id)),
            money(budget.amount),
            budget.period,
            budget.start_date,
            budget.end_date
        );
    }
    Ok(())
}

async fn cmd_budgets_overview(api: &ApiClient) -> Result<()> {
    debug!("cmd_budgets_overview: called");
    let overview = api.budgets().overview().await?;
    for status in &overview.budgets {
        let line = format!(
            "{:<20} {:>10.2} / {:>10.2}  {:>5.1}%",
            status.category_name, status.spent, status.amount, status.percentage
        );
        println!("{}", if status.is_over() { line.red() } else { line.normal() });
    }
    println!(
        "{:<20} {:>10.2} / {:>10.2}  remaining {:.2}",
        "Total".bold(),
        overview.total_spent,
        overview.total_budget,
        overview.total_remaining
    );
    Ok(())
}

async fn cmd_budget_add(
    api: &ApiClient,
    category: CategoryId,
    amount: f64,
    period: BudgetPeriod,
    date: Option<NaiveDate>,
) -> Result<()> {
    debug!(category, amount, %period, "cmd_budget_add: called");
    let mut dialog = BudgetDialog::new();
    dialog.open_new();
    if let Some(form) = dialog.form_mut() {
        form.category_id = Some(category);
        form.amount = amount;
        form.period = period;
        form.anchor = date.unwrap_or_else(|| Local::now().date_naive());
    }

    let created = dialog.submit(api).await?;
    println!(
        "{} Created {} budget {} ({} – {})",
        "✓".green(),
        created.period,
        created.id,
        created.start_date,
        created.end_date
    );
    Ok(())
}

async fn cmd_categories(api: &ApiClient) -> Result<()> {
    debug!("cmd_categories: called");
    for category in api.categories().list().await? {
        let kind = category.kind.map(|k| k.to_string()).unwrap_or_default();
        println!("{:>6}  {:<20} {}", category.id.to_string().dimmed(), category.name, kind.dimmed());
    }
    Ok(())
}

async fn cmd_insights(api: &ApiClient) -> Result<()> {
    debug!("cmd_insights: called");
    let panel = InsightsPanel::spawn(api);
    let loading = panel.settled().await;

    println!("{}", "Insights".bold());
    for insight in panel.insights.data() {
        println!("  {} {}", insight.title.cyan(), insight.description);
    }
    println!("\n{}", "Predicted spending".bold());
    for prediction in panel.predictions.data() {
        println!(
            "  {:<20} {}  ({:.0}% confidence)",
            prediction.category,
            money(-prediction.predicted_amount),
            prediction.confidence * 100.0
        );
    }

    for (key, message) in loading.errors() {
        eprintln!("{} {}: {}", "✗".red(), key, message);
    }
    Ok(())
}

async fn cmd_login(config: &Config, api: &ApiClient, username: &str, password: &str) -> Result<()> {
    debug!(%username, "cmd_login: called");
    let token = api.auth().login(username, password).await?;
    println!("{} Logged in as {}", "✓".green(), username.cyan());
    println!("export {}={}", config.api.token_env, token.access_token);
    Ok(())
}
