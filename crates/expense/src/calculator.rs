//! Settlement calculator: validation, totals and finalization.
//!
//! Conversions are summed at full precision and rounded once per reported
//! figure, so the grand total never carries per-line rounding drift.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use settlement_core::{DomainError, DomainResult, ValidationErrors};

use crate::currency::{Converter, Country, CurrencyCode, round_reporting};
use crate::record::{SettlementRecord, WorkLocation};
use crate::settings::ExpenseSettings;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyTotal {
    pub currency: CurrencyCode,
    /// Sum of original amounts, unconverted.
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySubtotal {
    pub category: String,
    /// Sum in the reporting currency.
    pub total: Decimal,
}

/// Derived figures of a record. Never persisted; recompute when needed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub reporting_currency: CurrencyCode,
    /// In order of first appearance.
    pub total_by_source_currency: Vec<CurrencyTotal>,
    pub total_reporting: Decimal,
    /// In order of first appearance.
    pub category_subtotals: Vec<CategorySubtotal>,
    /// `fund_amount - total_reporting`; negative when over budget.
    pub remaining: Decimal,
}

impl Totals {
    pub fn is_over_budget(&self) -> bool {
        self.remaining < Decimal::ZERO
    }

    pub fn subtotal(&self, category: &str) -> Option<Decimal> {
        self.category_subtotals
            .iter()
            .find(|s| s.category == category)
            .map(|s| s.total)
    }

    pub fn source_total(&self, currency: &CurrencyCode) -> Option<Decimal> {
        self.total_by_source_currency
            .iter()
            .find(|t| &t.currency == currency)
            .map(|t| t.total)
    }
}

/// Stateless calculator bound to the settings records are checked against.
#[derive(Debug, Clone, Copy)]
pub struct SettlementCalculator<'a> {
    settings: &'a ExpenseSettings,
}

impl<'a> SettlementCalculator<'a> {
    pub fn new(settings: &'a ExpenseSettings) -> Self {
        Self { settings }
    }

    /// Check the record, reporting every violation at once.
    pub fn validate(&self, record: &SettlementRecord) -> DomainResult<()> {
        self.recompute(record).map(|_| ())
    }

    /// Validate and compute totals. Does not modify the record.
    pub fn recompute(&self, record: &SettlementRecord) -> DomainResult<Totals> {
        let mut errors = ValidationErrors::new();
        self.check_header(record, &mut errors);
        let exact = self.convert_items(record, &mut errors)?;
        errors.into_result()?;

        let totals = self.summarize(record, &exact)?;
        debug!(
            record_id = %record.record_id(),
            items = record.items().len(),
            total = %totals.total_reporting,
            remaining = %totals.remaining,
            "recomputed settlement totals"
        );
        Ok(totals)
    }

    /// Recompute, then move the record to `Finalized`.
    pub fn finalize(&self, record: &mut SettlementRecord) -> DomainResult<Totals> {
        if !record.is_draft() {
            return Err(DomainError::invariant(format!(
                "record {} is {} and cannot be finalized",
                record.record_id(),
                record.status()
            )));
        }
        let totals = self.recompute(record)?;
        record.mark_finalized()?;
        info!(record_id = %record.record_id(), total = %totals.total_reporting, "record finalized");
        Ok(totals)
    }

    fn check_header(&self, record: &SettlementRecord, errors: &mut ValidationErrors) {
        let header = record.header();
        if header.project_name.trim().is_empty() {
            errors.push("projectName", "is required");
        }
        if header.issued_by.trim().is_empty() {
            errors.push("issuedBy", "is required");
        }
        if header.fund_amount < Decimal::ZERO {
            errors.push("fundAmount", "must not be negative");
        }

        if header.work_location == WorkLocation::Abroad {
            match header.work_country.as_deref().map(str::trim) {
                None | Some("") => errors.push("workCountry", "is required when working abroad"),
                Some(name) if Country::find(name).is_none() => {
                    errors.push("workCountry", format!("'{name}' is not a known country"))
                }
                Some(_) => {}
            }
        }

        let rates = record.rates();
        if matches!(rates.base_rate, Some(r) if r <= Decimal::ZERO) {
            errors.push("baseRate", "must be greater than zero");
        }
        if let Some(third) = &rates.third_currency {
            if !self.settings.currencies().contains(third) {
                errors.push("thirdCurrency", format!("{third} is not in the currency catalog"));
            }
            match rates.third_currency_rate {
                None => errors.push("thirdCurrencyRate", "is required when a third currency is set"),
                Some(r) if r <= Decimal::ZERO => {
                    errors.push("thirdCurrencyRate", "must be greater than zero")
                }
                Some(_) => {}
            }
        }
    }

    /// Exact reporting-currency value per item; `None` where the item failed.
    fn convert_items(
        &self,
        record: &SettlementRecord,
        errors: &mut ValidationErrors,
    ) -> DomainResult<Vec<Option<Decimal>>> {
        let reporting = self.settings.reporting_currency();
        let converter = Converter::new(record.rates(), reporting);
        let mut exact = Vec::with_capacity(record.items().len());

        for (idx, item) in record.items().iter().enumerate() {
            let field = |name: &str| format!("items[{idx}].{name}");

            if item.detail.trim().is_empty() {
                errors.push(field("detail"), "is required");
            }
            if item.vendor.trim().is_empty() {
                errors.push(field("vendor"), "is required");
            }
            if item.category.trim().is_empty() {
                errors.push(field("category"), "is required");
            } else if !self.settings.has_category(&item.category) {
                errors.push(field("category"), format!("unknown category '{}'", item.category));
            }
            if item.amount <= Decimal::ZERO {
                errors.push(field("amount"), "must be greater than zero");
            }
            if !self.settings.currencies().contains(&item.currency) {
                errors.push(
                    field("currency"),
                    format!("{} is not in the currency catalog", item.currency),
                );
                exact.push(None);
                continue;
            }

            match converter.convert_exact(item.amount, &item.currency) {
                Ok(value) => exact.push(Some(value)),
                Err(DomainError::UnsupportedCurrency { currency, .. }) => {
                    errors.push(
                        field("currency"),
                        format!("{currency} cannot be converted with this record's rates"),
                    );
                    exact.push(None);
                }
                Err(DomainError::MissingRate { field: rate }) => {
                    // One entry per rate field, however many items need it.
                    if !errors.has_field(&rate) {
                        errors.push(
                            rate.as_str(),
                            format!("is required to convert {}", item.currency),
                        );
                    }
                    exact.push(None);
                }
                Err(other) => return Err(other),
            }
        }
        Ok(exact)
    }

    fn summarize(&self, record: &SettlementRecord, exact: &[Option<Decimal>]) -> DomainResult<Totals> {
        let mut by_currency: Vec<CurrencyTotal> = Vec::new();
        let mut by_category: Vec<(String, Decimal)> = Vec::new();
        let mut total = Decimal::ZERO;

        for (item, value) in record.items().iter().zip(exact) {
            let value = value.ok_or_else(|| DomainError::invariant("unconverted item after validation"))?;
            total = checked_add(total, value)?;

            match by_currency.iter_mut().find(|t| t.currency == item.currency) {
                Some(t) => t.total = checked_add(t.total, item.amount)?,
                None => by_currency.push(CurrencyTotal {
                    currency: item.currency.clone(),
                    total: item.amount,
                }),
            }
            match by_category.iter_mut().find(|(c, _)| *c == item.category) {
                Some((_, sum)) => *sum = checked_add(*sum, value)?,
                None => by_category.push((item.category.clone(), value)),
            }
        }

        let total_reporting = round_reporting(total);
        let remaining = record
            .fund_amount()
            .checked_sub(total_reporting)
            .ok_or_else(|| DomainError::invariant("remaining balance overflow"))?;

        Ok(Totals {
            reporting_currency: self.settings.reporting_currency().clone(),
            total_by_source_currency: by_currency,
            total_reporting,
            category_subtotals: by_category
                .into_iter()
                .map(|(category, sum)| CategorySubtotal {
                    category,
                    total: round_reporting(sum),
                })
                .collect(),
            remaining,
        })
    }
}

fn checked_add(a: Decimal, b: Decimal) -> DomainResult<Decimal> {
    a.checked_add(b)
        .ok_or_else(|| DomainError::invariant("settlement total overflow"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::currency::ExchangeRates;
    use crate::record::{LineItem, ReceiptType, RecordHeader, RecordStatus};
    use chrono::{NaiveDate, TimeZone, Utc};
    use proptest::prelude::*;
    use rust_decimal_macros::dec;
    use settlement_core::RecordId;

    fn code(s: &str) -> CurrencyCode {
        s.parse().unwrap()
    }

    fn header(fund: Decimal) -> RecordHeader {
        RecordHeader {
            project_name: "Hanoi site survey".to_string(),
            issued_by: "alice".to_string(),
            issue_date: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
            work_location: WorkLocation::Abroad,
            work_country: Some("Vietnam".to_string()),
            fund_amount: fund,
            receive_date: NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
        }
    }

    fn item(category: &str, amount: Decimal, currency: &str) -> LineItem {
        LineItem {
            date: NaiveDate::from_ymd_opt(2026, 10, 3).unwrap(),
            detail: "Site visit".to_string(),
            vendor: "Vendor".to_string(),
            category: category.to_string(),
            amount,
            currency: code(currency),
            receipt_type: ReceiptType::NonOfficial,
        }
    }

    fn record(fund: Decimal, items: Vec<LineItem>) -> SettlementRecord {
        let at = Utc.with_ymd_and_hms(2026, 10, 19, 9, 15, 0).unwrap();
        let id = RecordId::generate(RecordId::EXPENSE_PREFIX, "alice", at).unwrap();
        let mut r = SettlementRecord::draft(id, header(fund));
        r.set_rates(ExchangeRates::new(dec!(35.20)).with_third_currency(code("VND"), dec!(24500)))
            .unwrap();
        for i in items {
            r.add_item(i).unwrap();
        }
        r
    }

    fn violations(err: DomainError) -> ValidationErrors {
        match err {
            DomainError::Validation(errors) => errors,
            other => panic!("Expected Validation error, got {other:?}"),
        }
    }

    #[test]
    fn vnd_item_converts_through_usd() {
        let settings = ExpenseSettings::default();
        let r = record(dec!(1000), vec![item("Taxi", dec!(500000), "VND")]);

        let totals = SettlementCalculator::new(&settings).recompute(&r).unwrap();
        assert_eq!(totals.total_reporting, dec!(718.37));
        assert_eq!(totals.remaining, dec!(281.63));
        assert_eq!(totals.source_total(&code("VND")), Some(dec!(500000)));
        assert_eq!(totals.subtotal("Taxi"), Some(dec!(718.37)));
    }

    #[test]
    fn mixed_currencies_are_grouped_in_first_appearance_order() {
        let settings = ExpenseSettings::default();
        let r = record(
            dec!(5000),
            vec![
                item("Hotel", dec!(1200), "THB"),
                item("Meals", dec!(10), "USD"),
                item("Hotel", dec!(30), "USD"),
                item("Meals", dec!(245000), "VND"),
            ],
        );

        let totals = SettlementCalculator::new(&settings).recompute(&r).unwrap();
        let currencies: Vec<_> = totals
            .total_by_source_currency
            .iter()
            .map(|t| (t.currency.as_str(), t.total))
            .collect();
        assert_eq!(currencies, [("THB", dec!(1200)), ("USD", dec!(40)), ("VND", dec!(245000))]);

        // 1200 + 40 * 35.20 + 245000 / 24500 * 35.20 = 1200 + 1408 + 352
        assert_eq!(totals.total_reporting, dec!(2960.00));
        assert_eq!(totals.subtotal("Hotel"), Some(dec!(2256.00)));
        assert_eq!(totals.subtotal("Meals"), Some(dec!(704.00)));
        assert_eq!(totals.category_subtotals[0].category, "Hotel");
        assert!(!totals.is_over_budget());
    }

    #[test]
    fn total_is_rounded_once_not_per_line() {
        let settings = ExpenseSettings::default();
        // 0.005 per line; rounding each line first would give 0.00
        let r = record(dec!(0), vec![
            item("Other", dec!(0.005), "THB"),
            item("Other", dec!(0.005), "THB"),
            item("Other", dec!(0.005), "THB"),
        ]);
        let totals = SettlementCalculator::new(&settings).recompute(&r).unwrap();
        assert_eq!(totals.total_reporting, dec!(0.02));
    }

    #[test]
    fn over_budget_remaining_is_negative() {
        let settings = ExpenseSettings::default();
        let r = record(dec!(100), vec![item("Fuel", dec!(10), "USD")]);
        let totals = SettlementCalculator::new(&settings).recompute(&r).unwrap();
        assert_eq!(totals.remaining, dec!(-252.00));
        assert!(totals.is_over_budget());
    }

    #[test]
    fn zero_items_total_zero() {
        let settings = ExpenseSettings::default();
        let r = record(dec!(50), vec![]);
        let totals = SettlementCalculator::new(&settings).recompute(&r).unwrap();
        assert_eq!(totals.total_reporting, Decimal::ZERO);
        assert_eq!(totals.remaining, dec!(50));
        assert!(totals.category_subtotals.is_empty());
    }

    #[test]
    fn every_violation_is_reported() {
        let settings = ExpenseSettings::default();
        let mut blank = item("Nope", dec!(0), "THB");
        blank.detail = " ".to_string();
        blank.vendor = String::new();

        let mut r = record(dec!(-1), vec![item("Taxi", dec!(10), "THB"), blank, item("Taxi", dec!(5), "EUR")]);
        let mut h = header(dec!(-1));
        h.project_name = String::new();
        h.work_country = Some("Atlantis".to_string());
        r.edit_header(h).unwrap();

        let errors = violations(SettlementCalculator::new(&settings).validate(&r).unwrap_err());
        for field in [
            "projectName",
            "fundAmount",
            "workCountry",
            "items[1].detail",
            "items[1].vendor",
            "items[1].category",
            "items[1].amount",
            "items[2].currency",
        ] {
            assert!(errors.has_field(field), "missing violation for {field}: {errors}");
        }
        assert!(!errors.has_field("items[0].amount"));
    }

    #[test]
    fn missing_rates_are_reported_once_per_rate() {
        let settings = ExpenseSettings::default();
        let mut r = record(dec!(100), vec![
            item("Taxi", dec!(1), "USD"),
            item("Taxi", dec!(2), "USD"),
        ]);
        r.set_rates(ExchangeRates::default()).unwrap();

        let errors = violations(SettlementCalculator::new(&settings).recompute(&r).unwrap_err());
        assert_eq!(errors.len(), 1);
        assert!(errors.has_field("baseRate"));
    }

    #[test]
    fn third_currency_requires_its_rate() {
        let settings = ExpenseSettings::default();
        let mut r = record(dec!(100), vec![]);
        r.set_rates(ExchangeRates {
            base_rate: Some(dec!(35)),
            third_currency: Some(code("VND")),
            third_currency_rate: None,
        })
        .unwrap();
        let errors = violations(SettlementCalculator::new(&settings).validate(&r).unwrap_err());
        assert!(errors.has_field("thirdCurrencyRate"));
    }

    #[test]
    fn domestic_records_need_no_country() {
        let settings = ExpenseSettings::default();
        let mut r = record(dec!(100), vec![item("Fuel", dec!(100), "THB")]);
        let mut h = header(dec!(100));
        h.work_location = WorkLocation::Domestic;
        h.work_country = None;
        r.edit_header(h).unwrap();
        assert!(SettlementCalculator::new(&settings).validate(&r).is_ok());
    }

    #[test]
    fn currency_outside_catalog_is_rejected() {
        let mut settings = ExpenseSettings::default();
        settings.currencies_mut().remove(&code("VND")).unwrap();
        let r = record(dec!(100), vec![item("Taxi", dec!(1000), "VND")]);
        let errors = violations(SettlementCalculator::new(&settings).validate(&r).unwrap_err());
        assert!(errors.has_field("items[0].currency"));
        assert!(errors.has_field("thirdCurrency"));
    }

    #[test]
    fn finalize_transitions_only_valid_drafts() {
        let settings = ExpenseSettings::default();
        let calc = SettlementCalculator::new(&settings);

        let mut bad = record(dec!(100), vec![item("Taxi", dec!(0), "THB")]);
        assert!(calc.finalize(&mut bad).is_err());
        assert_eq!(bad.status(), RecordStatus::Draft);

        let mut good = record(dec!(100), vec![item("Taxi", dec!(40), "THB")]);
        let totals = calc.finalize(&mut good).unwrap();
        assert_eq!(totals.remaining, dec!(60.00));
        assert_eq!(good.status(), RecordStatus::Finalized);

        assert!(matches!(
            calc.finalize(&mut good),
            Err(DomainError::InvariantViolation(_))
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        #[test]
        fn remaining_is_fund_minus_total(
            fund_cents in 0i64..10_000_000i64,
            amounts in proptest::collection::vec(1i64..5_000_000i64, 0..20),
        ) {
            let settings = ExpenseSettings::default();
            let fund = Decimal::new(fund_cents, 2);
            let items: Vec<_> = amounts
                .iter()
                .map(|cents| item("Other", Decimal::new(*cents, 2), "THB"))
                .collect();
            let r = record(fund, items);

            let totals = SettlementCalculator::new(&settings).recompute(&r).unwrap();
            let expected: Decimal = amounts.iter().map(|c| Decimal::new(*c, 2)).sum();
            prop_assert_eq!(totals.total_reporting, expected);
            prop_assert_eq!(totals.remaining, fund - expected);
            prop_assert_eq!(totals.is_over_budget(), expected > fund);
        }
    }
}
