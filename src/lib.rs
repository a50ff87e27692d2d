//! Extraction of normalized budget line items from the Spanish state budget
//! (PGE) breakdown pages published since 2008.
//!
//! A [`Document`] is classified from its filename, its data grid is located
//! and normalized, and [`Breakdown::line_items`] rebuilds the subtotal
//! hierarchy the pages only imply.

pub mod breakdown;
pub mod config;
pub mod document;
pub mod error;
pub mod model;
pub mod util;

pub use breakdown::{Breakdown, GenericBreakdown, classify};
pub use config::ExtractionConfig;
pub use document::Document;
pub use error::{BreakdownError, Result};
pub use model::{Category, Classification, Institution, ItemKind, Level, LineItem};
