//! Two-axis ordered grid model for HTML-style tables.
//!
//! A `Grid` holds rows (in title, body and footer sections) and columns, and
//! keeps exactly one `Cell` at every row/column intersection. Cells hold text,
//! opaque host content, or another grid. Grids serialize to and rebuild from
//! a plain `GridDescriptor` tree.

pub mod axis;
pub mod content;
pub mod descriptor;
pub mod entity;
pub mod error;
pub mod events;
pub mod grid;
pub mod identity;
pub mod options;
pub mod render;

#[cfg(test)]
pub mod harness;

pub use axis::{AxisEntity, Links, OrderedAxis, Position};
pub use content::{Cell, CellAddress, CellDefinition, Content, DetachedSnapshot, OpaqueContent, OpaqueHandle};
pub use descriptor::{
    CellDescriptor, CellValue, ColumnDescriptor, ContentDescriptor, GridDescriptor, OrderedMap, RowDescriptor,
};
pub use entity::{Column, ColumnDefaults, Row};
pub use error::{GridError, Result};
pub use events::{EventCallback, EventCollector, GridEvent, SubscriptionId};
pub use grid::{ColumnDefinition, EntityRef, Grid, Lifecycle, RowDefinition, SortDirection};
pub use identity::{AxisKind, EntityId, IdSequence, RowKind};
pub use options::{GridOptions, KindDefaults, OpaqueLoader};
pub use render::{Completion, RenderHandle, RenderTarget, Renderer};
