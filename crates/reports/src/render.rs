use std::fmt::Write;

use crate::layout::{Block, HeaderBlock, InfoBlock, Page, Panel, SummaryBlock, TableSlice};

/// Plain-text rendering of laid-out pages, for previews and terminals.
pub fn render_text(pages: &[Page]) -> String {
    let mut out = String::new();
    for page in pages {
        for block in &page.blocks {
            match block {
                Block::Header(h) => header(&mut out, h),
                Block::ProjectAndFundInfo(info) => info_block(&mut out, info),
                Block::ItemTableSlice(slice) => table(&mut out, slice),
                Block::SummaryAndSignature(summary) => summary_block(&mut out, summary),
            }
            out.push('\n');
        }
    }
    out
}

fn header(out: &mut String, h: &HeaderBlock) {
    let _ = writeln!(out, "=== Page {} of {} ===", h.page_number, h.page_count);
    let _ = writeln!(out, "{}", h.title);
    let _ = writeln!(out, "Form ID: {}    Date: {}", h.record_id, h.issue_date);
}

fn panel(out: &mut String, p: &Panel) {
    let _ = writeln!(out, "[{}]", p.title);
    let label_width = p.rows.iter().map(|(l, _)| l.chars().count()).max().unwrap_or(0);
    for (label, value) in &p.rows {
        let _ = writeln!(out, "  {label:<label_width$}  {value}");
    }
}

fn info_block(out: &mut String, info: &InfoBlock) {
    panel(out, &info.project);
    panel(out, &info.fund);
}

fn summary_block(out: &mut String, s: &SummaryBlock) {
    panel(out, &s.summary);
    out.push('\n');
    for signature in &s.signatures {
        let _ = writeln!(out, "  ______________________");
        let _ = writeln!(out, "  {signature}");
    }
}

fn table(out: &mut String, slice: &TableSlice) {
    let widths: Vec<usize> = (0..slice.columns.len())
        .map(|col| {
            let cell_width = |cells: &Vec<Vec<String>>| {
                cells
                    .get(col)
                    .map(|lines| lines.iter().map(|l| l.chars().count()).max().unwrap_or(0))
                    .unwrap_or(0)
            };
            slice
                .rows
                .iter()
                .map(|r| cell_width(&r.cells))
                .chain(std::iter::once(cell_width(&slice.header_cells)))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let rule: String = widths
        .iter()
        .map(|w| "-".repeat(w + 2))
        .collect::<Vec<_>>()
        .join("+");
    let _ = writeln!(out, "+{rule}+");
    grid_row(out, &slice.header_cells, &widths);
    let _ = writeln!(out, "+{rule}+");
    for row in &slice.rows {
        grid_row(out, &row.cells, &widths);
    }
    let _ = writeln!(out, "+{rule}+");
    if slice.continues_on_next_page {
        let _ = writeln!(out, "(continued on next page)");
    }
}

fn grid_row(out: &mut String, cells: &[Vec<String>], widths: &[usize]) {
    let lines = cells.iter().map(Vec::len).max().unwrap_or(1).max(1);
    for i in 0..lines {
        out.push('|');
        for (cell, &width) in cells.iter().zip(widths) {
            let text = cell.get(i).map(String::as_str).unwrap_or("");
            let _ = write!(out, " {text:<width$} |");
        }
        out.push('\n');
    }
}
