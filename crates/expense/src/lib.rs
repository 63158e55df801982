//! Expense settlement domain module.
//!
//! This crate contains the business rules for expense settlement records,
//! implemented purely as deterministic domain logic (no IO, no storage):
//! - two-hop currency conversion into the reporting currency
//! - the record/line-item model and its Draft/Finalized lifecycle
//! - the settlement calculator (totals, subtotals, remaining balance)
//! - injectable settings (categories, currency catalog, countries)

pub mod calculator;
pub mod currency;
pub mod record;
pub mod settings;

pub use calculator::{CategorySubtotal, CurrencyTotal, SettlementCalculator, Totals};
pub use currency::{
    Converter, Country, CurrencyCatalog, CurrencyCode, ExchangeRates, round_reporting,
};
pub use record::{
    AuditSnapshot, LineItem, ReceiptType, RecordHeader, RecordStatus, SettlementRecord,
    WorkLocation,
};
pub use settings::ExpenseSettings;
