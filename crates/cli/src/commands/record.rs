//! Record commands

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;

use settlement_core::{AggregateRoot, ExpectedVersion, RecordId};
use settlement_expense::{
    Country, CurrencyCode, ExchangeRates, LineItem, RecordHeader, SettlementCalculator,
    SettlementRecord, Totals, WorkLocation,
};
use settlement_infra::{RecordFilter, RecordStore};
use settlement_reports::{LayoutConfig, MonospaceMeasure, Page, PageGeometry, layout, render_text};

use super::App;

/// Arguments of `settlement new`.
pub struct NewRecord {
    pub owner: String,
    pub project: String,
    pub issued_by: Option<String>,
    pub issue_date: Option<NaiveDate>,
    pub fund: Decimal,
    pub receive_date: Option<NaiveDate>,
    pub abroad: Option<String>,
    pub base_rate: Option<Decimal>,
    pub third_currency: Option<CurrencyCode>,
    pub third_rate: Option<Decimal>,
}

/// Build a draft from the command arguments, without touching storage.
pub fn draft_from(args: NewRecord, id: RecordId) -> Result<SettlementRecord> {
    let issue_date = args.issue_date.unwrap_or_else(|| Utc::now().date_naive());
    let (work_location, third_currency) = match &args.abroad {
        Some(name) => {
            let country = Country::find(name)
                .with_context(|| format!("unknown country '{name}'; see `settlement countries`"))?;
            // USD converts with the base rate alone.
            let local = country.currency_code().filter(|c| !c.is_usd());
            (WorkLocation::Abroad, args.third_currency.or(local))
        }
        None => (WorkLocation::Domestic, args.third_currency),
    };

    let mut record = SettlementRecord::draft(
        id,
        RecordHeader {
            project_name: args.project,
            issued_by: args.issued_by.unwrap_or_else(|| args.owner.clone()),
            issue_date,
            work_location,
            work_country: args.abroad,
            fund_amount: args.fund,
            receive_date: args.receive_date.unwrap_or(issue_date),
        },
    );

    record.set_rates(ExchangeRates {
        base_rate: args.base_rate,
        third_currency,
        third_currency_rate: args.third_rate,
    })?;
    Ok(record)
}

pub fn create(app: &App, args: NewRecord) -> Result<()> {
    let id = RecordId::new_expense(&args.owner)?;
    let record = draft_from(args, id)?;
    let created = app.store.create(record).context("creating record")?;
    println!("{}", created.id());
    Ok(())
}

/// Load, apply `edit`, save at the loaded version.
fn update(
    app: &App,
    id: &RecordId,
    edit: impl FnOnce(&mut SettlementRecord) -> Result<()>,
) -> Result<SettlementRecord> {
    let mut record = app.store.load(id)?;
    let expected = ExpectedVersion::of(&record);
    edit(&mut record)?;
    let saved = app
        .store
        .save(record, expected)
        .with_context(|| format!("saving {id}; reload and retry if it was edited elsewhere"))?;
    Ok(saved)
}

/// Header changes from `settlement edit`; `None` keeps the current value.
pub struct HeaderEdit {
    pub project: Option<String>,
    pub issued_by: Option<String>,
    pub issue_date: Option<NaiveDate>,
    pub fund: Option<Decimal>,
    pub receive_date: Option<NaiveDate>,
    pub abroad: Option<String>,
    pub domestic: bool,
}

impl HeaderEdit {
    fn apply(self, header: &mut RecordHeader) -> Result<()> {
        if let Some(name) = self.abroad {
            if Country::find(&name).is_none() {
                bail!("unknown country '{name}'; see `settlement countries`");
            }
            header.work_location = WorkLocation::Abroad;
            header.work_country = Some(name);
        } else if self.domestic {
            header.work_location = WorkLocation::Domestic;
            header.work_country = None;
        }
        if let Some(project) = self.project {
            header.project_name = project;
        }
        if let Some(issued_by) = self.issued_by {
            header.issued_by = issued_by;
        }
        if let Some(date) = self.issue_date {
            header.issue_date = date;
        }
        if let Some(fund) = self.fund {
            header.fund_amount = fund;
        }
        if let Some(date) = self.receive_date {
            header.receive_date = date;
        }
        Ok(())
    }
}

/// Rate changes from `settlement set-rates`; `None` keeps the current value.
pub struct RatesEdit {
    pub base_rate: Option<Decimal>,
    pub third_currency: Option<CurrencyCode>,
    pub third_rate: Option<Decimal>,
    pub clear_third: bool,
}

impl RatesEdit {
    fn apply(self, rates: &ExchangeRates) -> ExchangeRates {
        let mut next = rates.clone();
        if let Some(base) = self.base_rate {
            next.base_rate = Some(base);
        }
        if self.clear_third {
            next.third_currency = None;
            next.third_currency_rate = None;
        }
        if let Some(currency) = self.third_currency {
            next.third_currency = Some(currency);
        }
        if let Some(rate) = self.third_rate {
            next.third_currency_rate = Some(rate);
        }
        next
    }
}

pub fn edit(app: &App, id: &RecordId, edit: HeaderEdit) -> Result<()> {
    let saved = update(app, id, |r| {
        let mut header = r.header().clone();
        edit.apply(&mut header)?;
        Ok(r.edit_header(header)?)
    })?;
    println!("{} updated (version {})", saved.id(), saved.version());
    Ok(())
}

pub fn set_rates(app: &App, id: &RecordId, edit: RatesEdit) -> Result<()> {
    let saved = update(app, id, |r| {
        let rates = edit.apply(r.rates());
        Ok(r.set_rates(rates)?)
    })?;
    println!("{} rates updated (version {})", saved.id(), saved.version());
    Ok(())
}

pub fn add_item(app: &App, id: &RecordId, item: LineItem) -> Result<()> {
    let saved = update(app, id, |r| Ok(r.add_item(item)?))?;
    println!("{} now has {} item(s)", saved.id(), saved.items().len());
    Ok(())
}

pub fn remove_item(app: &App, id: &RecordId, number: usize) -> Result<()> {
    if number == 0 {
        bail!("item numbers start at 1");
    }
    let saved = update(app, id, |r| r.remove_item(number - 1).map(|_| ()).map_err(Into::into))?;
    println!("{} now has {} item(s)", saved.id(), saved.items().len());
    Ok(())
}

pub fn replace_item(app: &App, id: &RecordId, number: usize, item: LineItem) -> Result<()> {
    if number == 0 {
        bail!("item numbers start at 1");
    }
    let saved = update(app, id, |r| Ok(r.replace_item(number - 1, item)?))?;
    println!("{} item {number} replaced", saved.id());
    Ok(())
}

pub fn list(app: &App, filter: &RecordFilter) -> Result<()> {
    for record in app.store.list(filter)? {
        println!(
            "{}\t{}\t{}\t{}\t{} item(s)",
            record.id(),
            record.issue_date(),
            record.status(),
            record.project_name(),
            record.items().len()
        );
    }
    Ok(())
}

pub fn show(app: &App, id: &RecordId) -> Result<()> {
    let record = app.store.load(id)?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

fn compute(app: &App, record: &SettlementRecord) -> Result<Totals> {
    SettlementCalculator::new(&app.settings)
        .recompute(record)
        .with_context(|| format!("record {} is not valid", record.id()))
}

pub fn totals(app: &App, id: &RecordId) -> Result<()> {
    let record = app.store.load(id)?;
    let totals = compute(app, &record)?;
    println!("{}", serde_json::to_string_pretty(&totals)?);
    Ok(())
}

pub fn pages(app: &App, record: &SettlementRecord) -> Result<Vec<Page>> {
    let totals = compute(app, record)?;
    let pages = layout(
        record,
        &totals,
        &PageGeometry::default(),
        &MonospaceMeasure::default(),
        &LayoutConfig::default(),
    )?;
    Ok(pages)
}

pub fn preview(app: &App, id: &RecordId, output: Option<&Path>) -> Result<()> {
    let record = app.store.load(id)?;
    let text = render_text(&pages(app, &record)?);
    match output {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("writing {}", path.display()))?
        }
        None => print!("{text}"),
    }
    Ok(())
}

pub fn export(app: &App, id: &RecordId, output: &Path) -> Result<()> {
    let record = app.store.load(id)?;
    let pages = pages(app, &record)?;
    let json = serde_json::to_string_pretty(&pages)?;
    fs::write(output, json).with_context(|| format!("writing {}", output.display()))?;
    println!("{} page(s) written to {}", pages.len(), output.display());
    Ok(())
}

pub fn finalize(app: &App, id: &RecordId) -> Result<()> {
    let calculator = SettlementCalculator::new(&app.settings);
    let saved = update(app, id, |r| {
        calculator.finalize(r)?;
        Ok(())
    })?;
    println!("{} finalized (version {})", saved.id(), saved.version());
    Ok(())
}

pub fn reopen(app: &App, id: &RecordId, by: &str) -> Result<()> {
    let saved = update(app, id, |r| Ok(r.reopen(by, Utc::now())?))?;
    println!(
        "{} reopened for editing ({} prior version(s) kept)",
        saved.id(),
        saved.history().len()
    );
    Ok(())
}

pub fn delete(app: &App, id: &RecordId, hard: bool) -> Result<()> {
    if hard {
        app.store.purge(id)?;
        println!("{id} purged");
    } else {
        app.store.delete(id)?;
        println!("{id} deleted");
    }
    Ok(())
}
