//! Tabular data engine
//!
//! Pure, synchronous building blocks for viewing a table: typed values,
//! rows, type inference, filtering, grouping, sorting, split partitions,
//! column layout, number formatting and the virtual row window.
//! [`pipeline::process`] wires them together.

pub mod filter;
pub mod format;
pub mod group;
pub mod infer;
pub mod layout;
pub mod pipeline;
pub mod row;
pub mod sort;
pub mod split;
pub mod style;
pub mod value;
pub mod view;
pub mod window;

pub use pipeline::{process, ProcessedTable};
pub use row::{Row, RowId, RowSet};
pub use style::{ColumnStyle, ColumnType, SortMode};
pub use value::Value;
pub use view::ViewState;
