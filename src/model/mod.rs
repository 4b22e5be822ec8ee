//! Document model types.
//!
//! The model is shared by both directions of the pipeline: binding and
//! layout build it up for rendering, extraction reconstructs it from
//! existing PDFs.

mod document;
mod extracted;
mod geometry;
mod image;
mod page;
mod style;
mod table;
mod text;

pub use document::{Document, Metadata};
pub use extracted::{ElementKind, ExtractedElement};
pub use geometry::{Margins, PageConstraints, PageSize, Rect, EPSILON};
pub use image::{ImageBlock, ImageFormat};
pub use page::{Block, Page};
pub use style::{Alignment, Colour, ResolvedStyle, StyleAttributes, StyleCascade};
pub use table::{TableBlock, TableCell, TableRow};
pub use text::TextBlock;
