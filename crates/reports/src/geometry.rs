use serde::{Deserialize, Serialize};

use crate::error::LayoutError;

/// Page size and margins in points (1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin_top: f32,
    pub margin_bottom: f32,
    pub margin_left: f32,
    pub margin_right: f32,
}

impl PageGeometry {
    /// ISO A4 portrait with uniform margins.
    pub fn a4_portrait(margin: f32) -> Self {
        Self {
            width: 595.28,
            height: 841.89,
            margin_top: margin,
            margin_bottom: margin,
            margin_left: margin,
            margin_right: margin,
        }
    }

    pub fn content_width(&self) -> f32 {
        self.width - self.margin_left - self.margin_right
    }

    pub fn content_height(&self) -> f32 {
        self.height - self.margin_top - self.margin_bottom
    }

    pub fn validate(&self) -> Result<(), LayoutError> {
        let margins = [
            self.margin_top,
            self.margin_bottom,
            self.margin_left,
            self.margin_right,
        ];
        if margins.iter().any(|m| !m.is_finite() || *m < 0.0) {
            return Err(LayoutError::InvalidGeometry(
                "margins must be finite and non-negative".to_string(),
            ));
        }
        if !(self.content_width() > 0.0 && self.content_height() > 0.0) {
            return Err(LayoutError::InvalidGeometry(format!(
                "no content area left on a {}x{} page",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::a4_portrait(30.0)
    }
}
