/// Text metrics supplied by the host renderer.
///
/// A PDF host implements this with its font metrics; the layout only needs
/// string widths and a fixed line advance.
pub trait TextMeasure {
    /// Width of `text` on one line, in points.
    fn width(&self, text: &str) -> f32;

    /// Vertical advance between wrapped lines, in points.
    fn line_height(&self) -> f32;
}

impl<M: TextMeasure + ?Sized> TextMeasure for &M {
    fn width(&self, text: &str) -> f32 {
        (**self).width(text)
    }

    fn line_height(&self) -> f32 {
        (**self).line_height()
    }
}

/// Every character has the same advance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonospaceMeasure {
    pub char_width: f32,
    pub line_height: f32,
}

impl MonospaceMeasure {
    pub fn new(char_width: f32, line_height: f32) -> Self {
        Self {
            char_width,
            line_height,
        }
    }
}

impl Default for MonospaceMeasure {
    /// Roughly an 8pt sans-serif body with 10pt leading.
    fn default() -> Self {
        Self::new(4.5, 10.0)
    }
}

impl TextMeasure for MonospaceMeasure {
    fn width(&self, text: &str) -> f32 {
        text.chars().count() as f32 * self.char_width
    }

    fn line_height(&self) -> f32 {
        self.line_height
    }
}
