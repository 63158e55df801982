//! Pagination of a settlement report.
//!
//! Pages are filled top to bottom. Every page starts with the header; the
//! project/fund panels appear on the first page only; the item table flows
//! across as many pages as needed, repeating its column header on each; the
//! summary/signature block is never split and goes wherever it first fits.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use tracing::{debug, warn};

use settlement_core::AggregateRoot;
use settlement_expense::{LineItem, SettlementRecord, Totals, WorkLocation};

use crate::config::LayoutConfig;
use crate::error::LayoutError;
use crate::geometry::PageGeometry;
use crate::measure::TextMeasure;
use crate::wrap::wrap;

/// Tolerance for accumulated float error when comparing against page height.
const FIT_EPSILON: f32 = 1e-3;

/// Vertical placement, measured down from the top of the content area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Frame {
    pub top: f32,
    pub height: f32,
}

impl Frame {
    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeaderBlock {
    pub frame: Frame,
    pub title: String,
    pub record_id: String,
    pub issue_date: String,
    pub page_number: usize,
    pub page_count: usize,
}

/// A titled box of label/value rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Panel {
    pub title: String,
    pub rows: Vec<(String, String)>,
}

impl Panel {
    fn height(&self, config: &LayoutConfig) -> f32 {
        config.panel_title_height
            + config.panel_padding
            + self.rows.len() as f32 * config.panel_row_height
    }
}

/// Project and fund panels side by side; as tall as the taller panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfoBlock {
    pub frame: Frame,
    pub project: Panel,
    pub fund: Panel,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableColumn {
    pub title: String,
    pub width: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    /// 1-based position of the item in the record.
    pub number: usize,
    /// Wrapped lines per cell, in column order.
    pub cells: Vec<Vec<String>>,
    pub height: f32,
}

/// The part of the item table that sits on one page, including the repeated
/// column header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSlice {
    pub frame: Frame,
    pub columns: Vec<TableColumn>,
    pub header_cells: Vec<Vec<String>>,
    pub header_height: f32,
    pub rows: Vec<TableRow>,
    pub continues_on_next_page: bool,
}

/// Totals panel beside the signature panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryBlock {
    pub frame: Frame,
    pub summary: Panel,
    pub signatures: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Block {
    Header(HeaderBlock),
    ProjectAndFundInfo(InfoBlock),
    ItemTableSlice(TableSlice),
    SummaryAndSignature(SummaryBlock),
}

impl Block {
    pub fn frame(&self) -> Frame {
        match self {
            Block::Header(b) => b.frame,
            Block::ProjectAndFundInfo(b) => b.frame,
            Block::ItemTableSlice(b) => b.frame,
            Block::SummaryAndSignature(b) => b.frame,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    /// 1-based.
    pub number: usize,
    pub blocks: Vec<Block>,
}

impl Page {
    pub fn table_slice(&self) -> Option<&TableSlice> {
        self.blocks.iter().find_map(|b| match b {
            Block::ItemTableSlice(slice) => Some(slice),
            _ => None,
        })
    }

    pub fn has_info(&self) -> bool {
        self.blocks
            .iter()
            .any(|b| matches!(b, Block::ProjectAndFundInfo(_)))
    }

    pub fn has_summary(&self) -> bool {
        self.blocks
            .iter()
            .any(|b| matches!(b, Block::SummaryAndSignature(_)))
    }

    /// Bottom edge of the lowest block.
    pub fn used_height(&self) -> f32 {
        self.blocks
            .iter()
            .map(|b| b.frame().bottom())
            .fold(0.0, f32::max)
    }
}

/// Lay a record out onto pages.
pub fn layout(
    record: &SettlementRecord,
    totals: &Totals,
    geometry: &PageGeometry,
    measure: &impl TextMeasure,
    config: &LayoutConfig,
) -> Result<Vec<Page>, LayoutError> {
    geometry.validate()?;
    let widths = config.column_widths(geometry.content_width())?;
    let cell_width = |w: f32| w - 2.0 * config.cell_padding_x;
    let row_height =
        |lines: usize| lines.max(1) as f32 * measure.line_height() + 2.0 * config.cell_padding_y;

    let columns: Vec<TableColumn> = config
        .columns
        .iter()
        .zip(&widths)
        .map(|(c, w)| TableColumn {
            title: c.title.clone(),
            width: *w,
        })
        .collect();
    let header_cells: Vec<Vec<String>> = columns
        .iter()
        .map(|c| wrap(&c.title, cell_width(c.width), measure))
        .collect();
    let table_header_height = row_height(header_cells.iter().map(Vec::len).max().unwrap_or(1));

    let rows: Vec<TableRow> = record
        .items()
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            let cells: Vec<Vec<String>> = item_cells(idx + 1, item)
                .iter()
                .zip(&widths)
                .map(|(text, w)| wrap(text, cell_width(*w), measure))
                .collect();
            let lines = cells.iter().map(Vec::len).max().unwrap_or(1);
            TableRow {
                number: idx + 1,
                cells,
                height: row_height(lines),
            }
        })
        .collect();

    let reporting = totals.reporting_currency.as_str();
    let (project, fund) = info_panels(record, reporting);
    let info_height = project.height(config).max(fund.height(config));
    let summary = summary_panel(totals);
    let signatures = vec![
        format!("Issuer ({})", record.issued_by()),
        "Approved By".to_string(),
    ];
    let signature_height = config.panel_title_height
        + config.panel_padding
        + signatures.len() as f32 * config.signature_row_height;
    let summary_height = summary.height(config).max(signature_height);

    let mut pager = Paginator {
        header: HeaderBlock {
            frame: Frame {
                top: 0.0,
                height: config.header_height,
            },
            title: config.title.clone(),
            record_id: record.id().to_string(),
            issue_date: record.issue_date().format("%Y-%m-%d").to_string(),
            page_number: 0,
            page_count: 0,
        },
        available: geometry.content_height(),
        gap: config.block_gap,
        pages: Vec::new(),
        cursor: 0.0,
    };

    pager.start_page();
    pager.require("project and fund information", info_height)?;
    pager.place(
        info_height,
        |frame| Block::ProjectAndFundInfo(InfoBlock {
            frame,
            project,
            fund,
        }),
    );

    let new_slice = |pager: &Paginator| TableSlice {
        frame: Frame {
            top: pager.next_top(),
            height: table_header_height,
        },
        columns: columns.clone(),
        header_cells: header_cells.clone(),
        header_height: table_header_height,
        rows: Vec::new(),
        continues_on_next_page: false,
    };

    if !pager.fits(table_header_height) {
        pager.start_page();
        pager.require("item table header", table_header_height)?;
    }
    let mut slice = new_slice(&pager);

    for row in rows {
        if !pager.slice_fits(&slice, row.height) {
            let alone_on_fresh_page = slice.rows.is_empty() && pager.page_is_fresh();
            if !alone_on_fresh_page {
                debug!(
                    page = pager.pages.len(),
                    rows = slice.rows.len(),
                    "item table continues on next page"
                );
                slice.continues_on_next_page = true;
                pager.close(slice);
                pager.start_page();
                slice = new_slice(&pager);
            }
            if !pager.slice_fits(&slice, row.height) {
                warn!(
                    record_id = %record.id(),
                    item = row.number,
                    height = row.height,
                    available = pager.available,
                    "item row taller than a page, placed on its own page"
                );
            }
        }
        slice.frame.height += row.height;
        slice.rows.push(row);
    }
    pager.close(slice);

    if !pager.fits(summary_height) {
        debug!(page = pager.pages.len(), "summary moved to a new page");
        pager.start_page();
        pager.require("summary and signature", summary_height)?;
    }
    pager.place(summary_height, |frame| {
        Block::SummaryAndSignature(SummaryBlock {
            frame,
            summary,
            signatures,
        })
    });

    Ok(pager.finish())
}

struct Paginator {
    header: HeaderBlock,
    available: f32,
    gap: f32,
    pages: Vec<Page>,
    /// Bottom of the last block on the current page.
    cursor: f32,
}

impl Paginator {
    fn start_page(&mut self) {
        let number = self.pages.len() + 1;
        let mut header = self.header.clone();
        header.page_number = number;
        self.cursor = header.frame.bottom();
        self.pages.push(Page {
            number,
            blocks: vec![Block::Header(header)],
        });
    }

    fn next_top(&self) -> f32 {
        self.cursor + self.gap
    }

    fn fits(&self, height: f32) -> bool {
        self.next_top() + height <= self.available + FIT_EPSILON
    }

    fn slice_fits(&self, slice: &TableSlice, row_height: f32) -> bool {
        slice.frame.bottom() + row_height <= self.available + FIT_EPSILON
    }

    /// Only the header has been placed.
    fn page_is_fresh(&self) -> bool {
        self.pages.last().is_some_and(|p| p.blocks.len() == 1)
    }

    /// Fail when `height` does not fit even below the header of an empty page.
    fn require(&self, block: &'static str, height: f32) -> Result<(), LayoutError> {
        if self.fits(height) {
            Ok(())
        } else {
            Err(LayoutError::BlockTooTall {
                block,
                needed: self.header.frame.height + self.gap + height,
                available: self.available,
            })
        }
    }

    fn place(&mut self, height: f32, build: impl FnOnce(Frame) -> Block) {
        let frame = Frame {
            top: self.next_top(),
            height,
        };
        self.push(build(frame));
    }

    fn close(&mut self, slice: TableSlice) {
        self.push(Block::ItemTableSlice(slice));
    }

    fn push(&mut self, block: Block) {
        self.cursor = block.frame().bottom();
        if let Some(page) = self.pages.last_mut() {
            page.blocks.push(block);
        }
    }

    fn finish(mut self) -> Vec<Page> {
        let count = self.pages.len();
        for page in &mut self.pages {
            for block in &mut page.blocks {
                if let Block::Header(header) = block {
                    header.page_count = count;
                }
            }
        }
        self.pages
    }
}

fn item_cells(number: usize, item: &LineItem) -> [String; 8] {
    [
        number.to_string(),
        item.date.format("%Y-%m-%d").to_string(),
        item.detail.clone(),
        item.vendor.clone(),
        item.category.clone(),
        fixed(item.amount, 2),
        item.currency.to_string(),
        item.receipt_type.label().to_string(),
    ]
}

fn info_panels(record: &SettlementRecord, reporting: &str) -> (Panel, Panel) {
    let header = record.header();
    let rates = record.rates();

    let mut project = vec![
        ("Project Name:".to_string(), header.project_name.clone()),
        ("Issued By:".to_string(), header.issued_by.clone()),
        (
            "Issue Date:".to_string(),
            header.issue_date.format("%Y-%m-%d").to_string(),
        ),
    ];
    match header.work_location {
        WorkLocation::Domestic => project.push(("Work Location:".to_string(), "Domestic".to_string())),
        WorkLocation::Abroad => {
            project.push(("Work Location:".to_string(), "Abroad".to_string()));
            project.push((
                "Work Country:".to_string(),
                header.work_country.clone().unwrap_or_else(|| "-".to_string()),
            ));
            project.push((
                "Third Currency:".to_string(),
                rates
                    .third_currency
                    .as_ref()
                    .map_or_else(|| "-".to_string(), ToString::to_string),
            ));
        }
    }

    let mut fund = vec![
        (
            format!("Fund Amount ({reporting}):"),
            format!("{} {reporting}", fixed(header.fund_amount, 2)),
        ),
        (
            "Receive Date:".to_string(),
            header.receive_date.format("%Y-%m-%d").to_string(),
        ),
    ];
    if let Some(base) = rates.base_rate {
        fund.push((format!("{reporting} per USD:"), fixed(base, 4)));
    }
    if let (Some(third), Some(rate)) = (&rates.third_currency, rates.third_currency_rate) {
        fund.push((format!("{third} per USD:"), fixed(rate, 4)));
    }

    (
        Panel {
            title: "Project Information".to_string(),
            rows: project,
        },
        Panel {
            title: "Fund & Currency Information".to_string(),
            rows: fund,
        },
    )
}

fn summary_panel(totals: &Totals) -> Panel {
    let reporting = totals.reporting_currency.as_str();
    let mut rows: Vec<(String, String)> = totals
        .total_by_source_currency
        .iter()
        .map(|t| (format!("Total {}:", t.currency), fixed(t.total, 2)))
        .collect();
    rows.push((
        "Total Expense:".to_string(),
        format!("{} {reporting}", fixed(totals.total_reporting, 2)),
    ));
    rows.push((
        "Remaining Funds:".to_string(),
        format!("{} {reporting}", fixed(totals.remaining, 2)),
    ));
    Panel {
        title: "Summary".to_string(),
        rows,
    }
}

/// Fixed-point text with exactly `dp` decimals.
pub(crate) fn fixed(value: Decimal, dp: u32) -> String {
    let rounded = value.round_dp_with_strategy(dp, RoundingStrategy::MidpointNearestEven);
    format!("{rounded:.prec$}", prec = dp as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn fixed_pads_and_rounds() {
        assert_eq!(fixed(dec!(35.2), 4), "35.2000");
        assert_eq!(fixed(dec!(718.365), 2), "718.36");
        assert_eq!(fixed(dec!(-252), 2), "-252.00");
        assert_eq!(fixed(dec!(500000), 2), "500000.00");
    }

    #[test]
    fn frame_bottom() {
        let f = Frame {
            top: 10.0,
            height: 5.5,
        };
        assert_eq!(f.bottom(), 15.5);
    }
}
