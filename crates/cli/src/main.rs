//! Settlement CLI - expense settlement records from the command line
//!
//! Usage:
//! ```bash
//! settlement new --owner alice --project "Hanoi survey" --fund 10000 --abroad Vietnam \
//!     --base-rate 35.20 --third-rate 24500
//! settlement add-item EXP-alice-2026-10-19-091500 --date 2026-10-18 --detail "Airport taxi" \
//!     --vendor "Mai Linh" --category Taxi --amount 500000 --currency VND
//! settlement set-rates EXP-alice-2026-10-19-091500 --base-rate 35.40
//! settlement totals EXP-alice-2026-10-19-091500
//! settlement preview EXP-alice-2026-10-19-091500
//! settlement finalize EXP-alice-2026-10-19-091500
//! settlement list --project hanoi
//! ```

use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;

use settlement_core::RecordId;
use settlement_expense::{CurrencyCode, LineItem, ReceiptType, RecordStatus};

mod commands;

use commands::App;

/// Expense settlement records: currency conversion, totals and paginated reports
#[derive(Parser)]
#[command(name = "settlement")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Data directory (overrides SETTLEMENT_DATA_DIR)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new draft record
    New {
        /// Owner used in the record id (e.g., a username)
        #[arg(long)]
        owner: String,
        #[arg(long)]
        project: String,
        /// Issuer name; defaults to the owner
        #[arg(long)]
        issued_by: Option<String>,
        /// Issue date (YYYY-MM-DD); defaults to today
        #[arg(long)]
        issue_date: Option<NaiveDate>,
        /// Advance received, in the reporting currency
        #[arg(long, default_value = "0")]
        fund: Decimal,
        /// Date the advance was received; defaults to the issue date
        #[arg(long)]
        receive_date: Option<NaiveDate>,
        /// Work country when working abroad
        #[arg(long)]
        abroad: Option<String>,
        /// Reporting currency per USD
        #[arg(long)]
        base_rate: Option<Decimal>,
        /// Third currency; defaults to the work country's currency
        #[arg(long)]
        third_currency: Option<CurrencyCode>,
        /// Third currency per USD
        #[arg(long)]
        third_rate: Option<Decimal>,
    },

    /// Change header fields of a draft record
    Edit {
        id: RecordId,
        #[arg(long)]
        project: Option<String>,
        #[arg(long)]
        issued_by: Option<String>,
        #[arg(long)]
        issue_date: Option<NaiveDate>,
        #[arg(long)]
        fund: Option<Decimal>,
        #[arg(long)]
        receive_date: Option<NaiveDate>,
        /// Work country; marks the record as abroad
        #[arg(long, conflicts_with = "domestic")]
        abroad: Option<String>,
        /// Mark the record as domestic work
        #[arg(long)]
        domestic: bool,
    },

    /// Change the exchange rates of a draft record
    SetRates {
        id: RecordId,
        /// Reporting currency per USD
        #[arg(long)]
        base_rate: Option<Decimal>,
        #[arg(long)]
        third_currency: Option<CurrencyCode>,
        /// Third currency per USD
        #[arg(long)]
        third_rate: Option<Decimal>,
        /// Remove the third currency and its rate
        #[arg(long, conflicts_with_all = ["third_currency", "third_rate"])]
        clear_third: bool,
    },

    /// Append a line item to a draft record
    AddItem {
        id: RecordId,
        #[command(flatten)]
        item: ItemArgs,
    },

    /// Replace a line item (1-based, as shown in reports)
    ReplaceItem {
        id: RecordId,
        number: usize,
        #[command(flatten)]
        item: ItemArgs,
    },

    /// Remove a line item (1-based, as shown in reports)
    RemoveItem { id: RecordId, number: usize },

    /// List records, newest first
    List {
        /// Case-insensitive project name substring
        #[arg(long)]
        project: Option<String>,
        /// Earliest issue date (inclusive)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Latest issue date (inclusive)
        #[arg(long)]
        to: Option<NaiveDate>,
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
        #[arg(long)]
        include_deleted: bool,
    },

    /// Print a record as JSON
    Show { id: RecordId },

    /// Validate a record and print its totals
    Totals { id: RecordId },

    /// Print the paginated report as text
    Preview {
        id: RecordId,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Write the laid-out pages as JSON for an external renderer
    Export {
        id: RecordId,
        #[arg(long, short)]
        output: PathBuf,
    },

    /// Validate and finalize a draft record
    Finalize { id: RecordId },

    /// Re-open a finalized record for editing
    Reopen {
        id: RecordId,
        /// Who is re-opening the record
        #[arg(long)]
        by: String,
    },

    /// Soft-delete a record, or remove it entirely with --hard
    Delete {
        id: RecordId,
        #[arg(long)]
        hard: bool,
    },

    /// Category and currency settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },

    /// List known countries and their currencies
    Countries,
}

#[derive(Args)]
pub struct ItemArgs {
    #[arg(long)]
    pub date: NaiveDate,
    #[arg(long)]
    pub detail: String,
    #[arg(long)]
    pub vendor: String,
    #[arg(long)]
    pub category: String,
    #[arg(long)]
    pub amount: Decimal,
    #[arg(long)]
    pub currency: CurrencyCode,
    #[arg(long, value_enum, default_value = "official")]
    pub receipt: ReceiptArg,
}

impl ItemArgs {
    pub fn to_line_item(self) -> LineItem {
        LineItem {
            date: self.date,
            detail: self.detail,
            vendor: self.vendor,
            category: self.category,
            amount: self.amount,
            currency: self.currency,
            receipt_type: self.receipt.to_receipt_type(),
        }
    }
}

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Print the current settings
    Show,
    AddCategory { name: String },
    RemoveCategory { name: String },
    AddCurrency { code: CurrencyCode },
    RemoveCurrency { code: CurrencyCode },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ReceiptArg {
    Official,
    NonOfficial,
}

impl ReceiptArg {
    pub fn to_receipt_type(self) -> ReceiptType {
        match self {
            ReceiptArg::Official => ReceiptType::Official,
            ReceiptArg::NonOfficial => ReceiptType::NonOfficial,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum StatusArg {
    Draft,
    Finalized,
    Deleted,
}

impl StatusArg {
    pub fn to_status(self) -> RecordStatus {
        match self {
            StatusArg::Draft => RecordStatus::Draft,
            StatusArg::Finalized => RecordStatus::Finalized,
            StatusArg::Deleted => RecordStatus::Deleted,
        }
    }
}

fn main() -> Result<()> {
    settlement_observability::init();

    let cli = Cli::parse();
    let app = App::open(cli.data_dir)?;
    commands::run(&app, cli.command)
}
