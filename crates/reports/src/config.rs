use serde::{Deserialize, Serialize};

use crate::error::LayoutError;

/// One column of the item table. `weight` is relative; widths are scaled to
/// the page's content width.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub title: String,
    pub weight: f32,
}

impl ColumnSpec {
    pub fn new(title: impl Into<String>, weight: f32) -> Self {
        Self {
            title: title.into(),
            weight,
        }
    }
}

/// Fixed dimensions of the report, in points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub title: String,
    /// Exactly eight columns, in cell order: index, date, detail, vendor,
    /// category, amount, currency, receipt type.
    pub columns: Vec<ColumnSpec>,
    pub header_height: f32,
    /// Height of one label/value row inside an info or summary panel.
    pub panel_row_height: f32,
    pub panel_title_height: f32,
    pub panel_padding: f32,
    /// Vertical space reserved for each signature line and its caption.
    pub signature_row_height: f32,
    pub cell_padding_x: f32,
    pub cell_padding_y: f32,
    /// Space between consecutive blocks on a page.
    pub block_gap: f32,
}

pub(crate) const COLUMN_COUNT: usize = 8;

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            title: "Expense Reimbursement Report".to_string(),
            columns: vec![
                ColumnSpec::new("#", 20.0),
                ColumnSpec::new("Date", 60.0),
                ColumnSpec::new("Details", 130.0),
                ColumnSpec::new("Vendor", 80.0),
                ColumnSpec::new("Category", 60.0),
                ColumnSpec::new("Amount", 60.0),
                ColumnSpec::new("Currency", 60.0),
                ColumnSpec::new("Receipt Type", 60.0),
            ],
            header_height: 60.0,
            panel_row_height: 20.0,
            panel_title_height: 20.0,
            panel_padding: 15.0,
            signature_row_height: 40.0,
            cell_padding_x: 3.0,
            cell_padding_y: 4.0,
            block_gap: 15.0,
        }
    }
}

impl LayoutConfig {
    /// Column widths scaled so they fill `content_width` exactly.
    pub fn column_widths(&self, content_width: f32) -> Result<Vec<f32>, LayoutError> {
        if self.columns.len() != COLUMN_COUNT {
            return Err(LayoutError::InvalidColumns(format!(
                "expected {COLUMN_COUNT} columns, got {}",
                self.columns.len()
            )));
        }
        if let Some(bad) = self
            .columns
            .iter()
            .find(|c| !c.weight.is_finite() || c.weight <= 0.0)
        {
            return Err(LayoutError::InvalidColumns(format!(
                "column '{}' has weight {}",
                bad.title, bad.weight
            )));
        }

        let total: f32 = self.columns.iter().map(|c| c.weight).sum();
        let widths: Vec<f32> = self
            .columns
            .iter()
            .map(|c| c.weight / total * content_width)
            .collect();

        if let Some((col, _)) = self
            .columns
            .iter()
            .zip(&widths)
            .find(|(_, w)| **w <= 2.0 * self.cell_padding_x)
        {
            return Err(LayoutError::InvalidColumns(format!(
                "column '{}' is narrower than its padding",
                col.title
            )));
        }
        Ok(widths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_widths_fill_the_content_width() {
        let config = LayoutConfig::default();
        let widths = config.column_widths(530.0).unwrap();
        assert!((widths.iter().sum::<f32>() - 530.0).abs() < 0.01);
        // Details keeps its 130/530 share
        assert!((widths[2] - 130.0).abs() < 0.01);
    }

    #[test]
    fn bad_columns_are_rejected() {
        let mut config = LayoutConfig::default();
        config.columns[3].weight = 0.0;
        assert!(config.column_widths(500.0).is_err());

        let mut config = LayoutConfig::default();
        config.columns.pop();
        assert!(config.column_widths(500.0).is_err());

        let config = LayoutConfig::default();
        assert!(config.column_widths(40.0).is_err());
    }
}
