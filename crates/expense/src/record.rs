use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use settlement_core::{AggregateRoot, DomainError, DomainResult, RecordId};

use crate::currency::{CurrencyCode, ExchangeRates};

/// Where the work was carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkLocation {
    Domestic,
    Abroad,
}

/// Record lifecycle.
///
/// `Deleted` is the soft-delete marker set by a store; nothing else moves a
/// record into or out of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Draft,
    Finalized,
    Deleted,
}

impl core::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            RecordStatus::Draft => "draft",
            RecordStatus::Finalized => "finalized",
            RecordStatus::Deleted => "deleted",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReceiptType {
    Official,
    NonOfficial,
}

impl ReceiptType {
    pub fn label(self) -> &'static str {
        match self {
            ReceiptType::Official => "Official",
            ReceiptType::NonOfficial => "Non-Official",
        }
    }
}

/// One expense line. `amount` is in `currency`, as written on the receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub date: NaiveDate,
    pub detail: String,
    pub vendor: String,
    pub category: String,
    pub amount: Decimal,
    pub currency: CurrencyCode,
    pub receipt_type: ReceiptType,
}

/// Editable header fields of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordHeader {
    pub project_name: String,
    pub issued_by: String,
    pub issue_date: NaiveDate,
    pub work_location: WorkLocation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_country: Option<String>,
    /// Advance received, in the reporting currency.
    pub fund_amount: Decimal,
    pub receive_date: NaiveDate,
}

/// Finalized state captured when a record is re-opened for editing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditSnapshot {
    pub reopened_at: DateTime<Utc>,
    pub reopened_by: String,
    /// The record as it was before re-opening, without its own history.
    pub record: Box<SettlementRecord>,
}

/// Aggregate root: one expense settlement form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementRecord {
    id: RecordId,
    #[serde(flatten)]
    header: RecordHeader,
    #[serde(flatten)]
    rates: ExchangeRates,
    #[serde(default)]
    items: Vec<LineItem>,
    status: RecordStatus,
    #[serde(default)]
    version: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    history: Vec<AuditSnapshot>,
}

impl SettlementRecord {
    /// A new, never-persisted draft (version `0`).
    pub fn draft(id: RecordId, header: RecordHeader) -> Self {
        Self {
            id,
            header,
            rates: ExchangeRates::default(),
            items: Vec::new(),
            status: RecordStatus::Draft,
            version: 0,
            history: Vec::new(),
        }
    }

    pub fn record_id(&self) -> &RecordId {
        &self.id
    }

    pub fn header(&self) -> &RecordHeader {
        &self.header
    }

    pub fn project_name(&self) -> &str {
        &self.header.project_name
    }

    pub fn issued_by(&self) -> &str {
        &self.header.issued_by
    }

    pub fn issue_date(&self) -> NaiveDate {
        self.header.issue_date
    }

    pub fn fund_amount(&self) -> Decimal {
        self.header.fund_amount
    }

    pub fn rates(&self) -> &ExchangeRates {
        &self.rates
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn status(&self) -> RecordStatus {
        self.status
    }

    pub fn history(&self) -> &[AuditSnapshot] {
        &self.history
    }

    pub fn is_draft(&self) -> bool {
        self.status == RecordStatus::Draft
    }

    fn ensure_draft(&self) -> DomainResult<()> {
        match self.status {
            RecordStatus::Draft => Ok(()),
            status => Err(DomainError::invariant(format!(
                "record {} is {status} and cannot be edited",
                self.id
            ))),
        }
    }

    fn ensure_index(&self, index: usize) -> DomainResult<()> {
        if index < self.items.len() {
            Ok(())
        } else {
            Err(DomainError::not_found(format!(
                "item {index} of record {}",
                self.id
            )))
        }
    }

    pub fn edit_header(&mut self, header: RecordHeader) -> DomainResult<()> {
        self.ensure_draft()?;
        self.header = header;
        Ok(())
    }

    pub fn set_rates(&mut self, rates: ExchangeRates) -> DomainResult<()> {
        self.ensure_draft()?;
        self.rates = rates;
        Ok(())
    }

    pub fn add_item(&mut self, item: LineItem) -> DomainResult<()> {
        self.ensure_draft()?;
        self.items.push(item);
        Ok(())
    }

    pub fn replace_item(&mut self, index: usize, item: LineItem) -> DomainResult<()> {
        self.ensure_draft()?;
        self.ensure_index(index)?;
        self.items[index] = item;
        Ok(())
    }

    pub fn remove_item(&mut self, index: usize) -> DomainResult<LineItem> {
        self.ensure_draft()?;
        self.ensure_index(index)?;
        Ok(self.items.remove(index))
    }

    /// Transition to `Finalized`. Only the calculator calls this, after a
    /// successful recompute.
    pub(crate) fn mark_finalized(&mut self) -> DomainResult<()> {
        self.ensure_draft()?;
        self.status = RecordStatus::Finalized;
        Ok(())
    }

    /// Re-open a finalized record for editing, keeping its finalized state in
    /// the audit history.
    pub fn reopen(&mut self, by: impl Into<String>, at: DateTime<Utc>) -> DomainResult<()> {
        if self.status != RecordStatus::Finalized {
            return Err(DomainError::invariant(format!(
                "only finalized records can be reopened; {} is {}",
                self.id, self.status
            )));
        }
        let by = by.into();
        if by.trim().is_empty() {
            return Err(DomainError::validation("reopenedBy", "is required"));
        }

        let mut snapshot = self.clone();
        snapshot.history.clear();
        self.history.push(AuditSnapshot {
            reopened_at: at,
            reopened_by: by,
            record: Box::new(snapshot),
        });
        self.status = RecordStatus::Draft;
        Ok(())
    }

    /// Soft delete.
    pub fn mark_deleted(&mut self) -> DomainResult<()> {
        if self.status == RecordStatus::Deleted {
            return Err(DomainError::invariant(format!(
                "record {} is already deleted",
                self.id
            )));
        }
        self.status = RecordStatus::Deleted;
        Ok(())
    }

    /// Version assigned by a record store on write.
    pub fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    /// Equality of everything except `version`.
    pub fn same_content(&self, other: &SettlementRecord) -> bool {
        self.id == other.id
            && self.header == other.header
            && self.rates == other.rates
            && self.items == other.items
            && self.status == other.status
            && self.history == other.history
    }
}

impl AggregateRoot for SettlementRecord {
    type Id = RecordId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}
