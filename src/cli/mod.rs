use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::application::LedgerService;
use crate::domain::{format_cents, parse_cents, TransactionDraft, UserDraft};

/// Walletbook - wallet bookkeeping backend
#[derive(Parser)]
#[command(name = "walletbook")]
#[command(about = "Record wallet transactions, compute balances and serve them over HTTP")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "WALLETBOOK_DATABASE", default_value = "walletbook.db")]
    pub database: String,

    /// How long to wait for another process's write lock, in milliseconds
    #[arg(long, env = "WALLETBOOK_BUSY_TIMEOUT_MS", default_value_t = 5000)]
    pub busy_timeout_ms: u64,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Serve the HTTP API
    Serve {
        /// Address to listen on
        #[arg(long, env = "WALLETBOOK_BIND", default_value = "127.0.0.1:8080")]
        bind: String,
    },

    /// User management commands
    #[command(subcommand)]
    User(UserCommands),

    /// Record a transaction for a user
    Record {
        /// User identifier
        user: String,

        /// Signed amount (e.g., "100", "-30.00")
        #[arg(allow_hyphen_values = true)]
        amount: String,

        /// Transaction type (e.g., deposit, withdrawal)
        #[arg(short = 't', long = "type")]
        transaction_type: String,
    },

    /// Show a user's balance
    Balance {
        /// User identifier
        user: String,
    },

    /// List a user's transactions with running balances
    Transactions {
        /// User identifier
        user: String,

        /// Only list this transaction type ("all" lists everything)
        #[arg(short = 't', long = "type")]
        transaction_type: Option<String>,
    },

    /// Reverse a transaction with a compensating entry
    Reverse {
        /// Transaction ID to reverse
        id: String,
    },

    /// Verify ledger integrity
    Check,
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Create a new user
    Create {
        #[arg(long)]
        firstname: String,

        #[arg(long)]
        lastname: String,

        #[arg(long)]
        username: String,

        #[arg(long)]
        email: String,
    },

    /// Show user details
    Show {
        /// User identifier
        id: String,
    },

    /// Update a user's status
    Status {
        /// User identifier
        id: String,

        /// New status (e.g., active, suspended)
        status: String,
    },
}

impl Cli {
    fn log_level(&self) -> &'static str {
        match (&self.command, self.verbose) {
            (_, true) => "debug",
            (Commands::Serve { .. }, false) => "info",
            _ => "warn",
        }
    }

    pub async fn run(self) -> Result<()> {
        crate::telemetry::init(self.log_level(), self.log_json);
        let busy_timeout = Duration::from_millis(self.busy_timeout_ms);

        match self.command {
            Commands::Init => {
                LedgerService::init_with(&self.database, busy_timeout).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Serve { bind } => {
                let service = LedgerService::init_with(&self.database, busy_timeout).await?;
                crate::api::serve(Arc::new(service), &bind).await?;
            }

            Commands::User(user_cmd) => {
                let service = LedgerService::connect_with(&self.database, busy_timeout).await?;
                run_user_command(&service, user_cmd).await?;
            }

            Commands::Record {
                user,
                amount,
                transaction_type,
            } => {
                let service = LedgerService::connect_with(&self.database, busy_timeout).await?;
                let amount_cents = parse_cents(&amount)
                    .context("Invalid amount format. Use '50.00', '50' or '-30'")?;

                let transaction = service
                    .record_transaction(TransactionDraft::new(user, amount_cents, transaction_type))
                    .await?;

                println!(
                    "Recorded transaction {}: {} {} for {}",
                    transaction.id,
                    transaction.transaction_type,
                    format_cents(transaction.amount_cents),
                    transaction.user_id
                );
            }

            Commands::Balance { user } => {
                let service = LedgerService::connect_with(&self.database, busy_timeout).await?;
                let result = service.get_balance(&user).await?;
                println!(
                    "Balance for {}: {} (as of {})",
                    result.user_id,
                    format_cents(result.balance),
                    result.computed_at.format("%Y-%m-%d %H:%M:%S")
                );
            }

            Commands::Transactions {
                user,
                transaction_type,
            } => {
                let service = LedgerService::connect_with(&self.database, busy_timeout).await?;
                run_transactions_command(&service, &user, transaction_type.as_deref()).await?;
            }

            Commands::Reverse { id } => {
                let service = LedgerService::connect_with(&self.database, busy_timeout).await?;
                let result = service.reverse_transaction(Some(&id)).await?;

                println!(
                    "Reversed transaction {}: {} {}",
                    result.original.id,
                    result.original.transaction_type,
                    format_cents(result.original.amount_cents)
                );
                println!(
                    "Created reversal {}: {} (balance now {})",
                    result.reversal.id,
                    format_cents(result.reversal.amount_cents),
                    format_cents(result.balance)
                );
            }

            Commands::Check => {
                let service = LedgerService::connect_with(&self.database, busy_timeout).await?;
                run_check_command(&service).await?;
            }
        }

        Ok(())
    }
}

async fn run_user_command(service: &LedgerService, cmd: UserCommands) -> Result<()> {
    match cmd {
        UserCommands::Create {
            firstname,
            lastname,
            username,
            email,
        } => {
            let user = service
                .create_user(UserDraft {
                    firstname: Some(firstname),
                    lastname: Some(lastname),
                    username: Some(username),
                    email: Some(email),
                })
                .await?;
            println!("Created user: {} ({})", user.username, user.id);
        }

        UserCommands::Show { id } => {
            let user = service.get_user(&id).await?;

            println!("User: {}", user.username);
            println!("  ID:        {}", user.id);
            println!("  Name:      {} {}", user.firstname, user.lastname);
            println!("  Email:     {}", user.email);
            println!("  Status:    {}", user.status);
            println!("  Created:   {}", user.created_at.format("%Y-%m-%d %H:%M:%S"));
            println!("  Modified:  {}", user.modified_at.format("%Y-%m-%d %H:%M:%S"));
        }

        UserCommands::Status { id, status } => {
            let user = service.update_user_status(&id, Some(status)).await?;
            println!("Updated user {}: status {}", user.id, user.status);
        }
    }
    Ok(())
}

async fn run_transactions_command(
    service: &LedgerService,
    user: &str,
    transaction_type: Option<&str>,
) -> Result<()> {
    let entries = service.list_transactions(user, transaction_type).await?;

    println!(
        "{:>6} {:<20} {:<12} {:>12} {:>12}",
        "ID", "DATE", "TYPE", "AMOUNT", "BALANCE"
    );
    println!("{}", "-".repeat(66));
    for entry in &entries {
        let tx = &entry.transaction;
        let marker = match tx.reverses {
            Some(original) => format!(" (reverses {})", original),
            None => String::new(),
        };
        println!(
            "{:>6} {:<20} {:<12} {:>12} {:>12}{}",
            tx.id,
            tx.created_at.format("%Y-%m-%d %H:%M:%S"),
            truncate(tx.transaction_type.as_str(), 12),
            format_cents(tx.amount_cents),
            format_cents(entry.running_balance),
            marker
        );
    }
    Ok(())
}

async fn run_check_command(service: &LedgerService) -> Result<()> {
    let report = service.check_integrity().await?;

    println!("Users:        {}", report.user_count);
    println!("Transactions: {}", report.transaction_count);

    if report.is_healthy() {
        println!("Ledger OK");
        Ok(())
    } else {
        for issue in &report.issues {
            println!("  ! {}", issue);
        }
        anyhow::bail!("Ledger integrity check failed ({} issue(s))", report.issues.len())
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}~", kept)
    }
}
