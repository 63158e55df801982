use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LayoutError {
    #[error("invalid page geometry: {0}")]
    InvalidGeometry(String),

    #[error("invalid column configuration: {0}")]
    InvalidColumns(String),

    /// A block that cannot be split does not fit on an empty page.
    #[error("{block} block needs {needed:.1}pt but a page offers {available:.1}pt")]
    BlockTooTall {
        block: &'static str,
        needed: f32,
        available: f32,
    },
}
