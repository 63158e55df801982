//! Report layout for settlement records.
//!
//! `layout` turns a record and its totals into fixed-size pages of
//! positioned blocks. It measures text through the host's [`TextMeasure`]
//! and never draws anything itself; `render_text` is the bundled renderer
//! and other renderers (e.g. PDF) consume the same pages.

pub mod config;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod measure;
pub mod render;
pub mod wrap;

pub use config::{ColumnSpec, LayoutConfig};
pub use error::LayoutError;
pub use geometry::PageGeometry;
pub use layout::{
    Block, Frame, HeaderBlock, InfoBlock, Page, Panel, SummaryBlock, TableColumn, TableRow,
    TableSlice, layout,
};
pub use measure::{MonospaceMeasure, TextMeasure};
pub use render::render_text;
pub use wrap::wrap;
