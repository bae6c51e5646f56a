//! Plain-data descriptor tree for grids.
//!
//! `Grid::serialize` produces a `GridDescriptor`; `Grid::deserialize` replays
//! one. The tree is plain serde data and round-trips through JSON. Row and
//! column content maps keep their insertion order so cells come out in column
//! order.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{GridError, Result};
use crate::identity::RowKind;

fn is_false(b: &bool) -> bool {
    !*b
}

/// A whole grid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridDescriptor {
    #[serde(default)]
    pub columns: Vec<ColumnDescriptor>,
    /// Title rows first, then body rows, then footer rows.
    #[serde(default)]
    pub rows: Vec<RowDescriptor>,
    #[serde(default)]
    pub title_row_count: usize,
    #[serde(default)]
    pub footer_row_count: usize,
}

impl GridDescriptor {
    /// Section of the row at `index` according to the title/footer counts.
    pub fn kind_of_row(&self, index: usize) -> RowKind {
        if index < self.title_row_count {
            RowKind::Title
        } else if index + self.footer_row_count >= self.rows.len() {
            RowKind::Footer
        } else {
            RowKind::Body
        }
    }

    /// Check that the section counts fit the row list.
    pub fn validate(&self) -> Result<()> {
        let sections = self.title_row_count + self.footer_row_count;
        if sections > self.rows.len() {
            return Err(GridError::InvalidDescriptor(format!(
                "{} title and {} footer rows declared but only {} rows present",
                self.title_row_count,
                self.footer_row_count,
                self.rows.len()
            )));
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// A column, or the definition of a column to add.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_id: Option<String>,
    /// Default content for title rows that give none for this column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_content: Option<CellValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_content: Option<CellValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer_content: Option<CellValue>,
    /// Explicit content keyed by row id. Only used when adding a column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<OrderedMap<CellValue>>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub generate_missing_rows: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub hidden: bool,
}

/// A row, or the definition of a row to add.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_id: Option<String>,
    /// Content keyed by column id, in column order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<OrderedMap<CellValue>>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub generate_missing_columns: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub hidden: bool,
}

/// Tagged cell content: `{"type": "string" | "opaque" | "grid", "content": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "lowercase")]
pub enum ContentDescriptor {
    String(String),
    /// Snapshot produced by the opaque content's owner.
    Opaque(serde_json::Value),
    Grid(Box<GridDescriptor>),
}

/// Cell content as it appears in row/column maps: a bare string or a tagged
/// descriptor. Serialization always emits the tagged form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Plain(String),
    Typed(ContentDescriptor),
}

impl CellValue {
    pub fn into_descriptor(self) -> ContentDescriptor {
        match self {
            CellValue::Plain(s) => ContentDescriptor::String(s),
            CellValue::Typed(d) => d,
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Plain(s.to_string())
    }
}

impl From<ContentDescriptor> for CellValue {
    fn from(d: ContentDescriptor) -> Self {
        CellValue::Typed(d)
    }
}

/// A single cell. `content` is omitted when serialized without content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellDescriptor {
    pub row_id: String,
    pub column_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<ContentDescriptor>,
}

/// String-keyed map that keeps insertion order, serialized as a JSON object.
pub type OrderedMap<V> = IndexMap<String, V>;
