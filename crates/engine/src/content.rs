//! Cell content: plain text, opaque externally-owned content, or a nested grid.
//!
//! `Content::clone` is the deep copy: text is copied, nested grids are copied
//! recursively, and opaque handles are aliased (the copy points at the same
//! externally-owned object).

use std::fmt;
use std::sync::Arc;

use crate::descriptor::{CellDescriptor, CellValue, ContentDescriptor, GridDescriptor};
use crate::error::Result;
use crate::grid::Grid;
use crate::identity::EntityId;
use crate::options::GridOptions;

/// Content owned and rendered outside the grid.
pub trait OpaqueContent: fmt::Debug + Send + Sync {
    /// Plain-data snapshot, used for descriptors and for equality.
    fn snapshot(&self) -> serde_json::Value;
}

pub type OpaqueHandle = Arc<dyn OpaqueContent>;

/// Opaque content rebuilt from a descriptor when no loader is configured.
#[derive(Debug, Clone, PartialEq)]
pub struct DetachedSnapshot(pub serde_json::Value);

impl OpaqueContent for DetachedSnapshot {
    fn snapshot(&self) -> serde_json::Value {
        self.0.clone()
    }
}

#[derive(Debug)]
pub enum Content {
    /// Used verbatim; no escaping.
    Text(String),
    Opaque(OpaqueHandle),
    Grid(Box<Grid>),
}

impl Default for Content {
    fn default() -> Self {
        Content::Text(String::new())
    }
}

impl Clone for Content {
    fn clone(&self) -> Self {
        match self {
            Content::Text(s) => Content::Text(s.clone()),
            Content::Opaque(handle) => Content::Opaque(Arc::clone(handle)),
            Content::Grid(grid) => Content::Grid(Box::new(grid.deep_copy())),
        }
    }
}

impl PartialEq for Content {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Content::Text(a), Content::Text(b)) => a == b,
            (Content::Opaque(a), Content::Opaque(b)) => a.snapshot() == b.snapshot(),
            (Content::Grid(a), Content::Grid(b)) => match (nested_descriptor(a), nested_descriptor(b)) {
                (Ok(a), Ok(b)) => a == b,
                _ => false,
            },
            _ => false,
        }
    }
}

impl From<&str> for Content {
    fn from(s: &str) -> Self {
        Content::Text(s.to_string())
    }
}

impl From<String> for Content {
    fn from(s: String) -> Self {
        Content::Text(s)
    }
}

impl From<Grid> for Content {
    fn from(grid: Grid) -> Self {
        Content::Grid(Box::new(grid))
    }
}

impl Content {
    pub fn opaque(content: impl OpaqueContent + 'static) -> Self {
        Content::Opaque(Arc::new(content))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_grid(&self) -> Option<&Grid> {
        match self {
            Content::Grid(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_grid_mut(&mut self) -> Option<&mut Grid> {
        match self {
            Content::Grid(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_opaque(&self) -> Option<&OpaqueHandle> {
        match self {
            Content::Opaque(h) => Some(h),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Content::Text(s) if s.is_empty())
    }

    /// Descriptor tag for this content.
    pub fn type_name(&self) -> &'static str {
        match self {
            Content::Text(_) => "string",
            Content::Opaque(_) => "opaque",
            Content::Grid(_) => "grid",
        }
    }

    /// Build content from a definition. This is the single classification step
    /// every cell constructor goes through.
    pub fn from_definition(definition: CellDefinition, options: &GridOptions) -> Result<Self> {
        match definition {
            CellDefinition::Empty => Ok(Content::default()),
            CellDefinition::Text(s) => Ok(Content::Text(s)),
            CellDefinition::Opaque(handle) => Ok(Content::Opaque(handle)),
            CellDefinition::Grid(descriptor) => {
                let grid = Grid::deserialize(&descriptor, options.clone())?;
                Ok(Content::Grid(Box::new(grid)))
            }
            CellDefinition::Descriptor(descriptor) => Content::from_descriptor(&descriptor, options),
            CellDefinition::Copy(content) => Ok(content),
        }
    }

    pub fn from_descriptor(descriptor: &ContentDescriptor, options: &GridOptions) -> Result<Self> {
        match descriptor {
            ContentDescriptor::String(s) => Ok(Content::Text(s.clone())),
            ContentDescriptor::Opaque(snapshot) => Ok(Content::Opaque(options.load_opaque(snapshot))),
            ContentDescriptor::Grid(nested) => {
                let grid = Grid::deserialize(nested, options.clone())?;
                Ok(Content::Grid(Box::new(grid)))
            }
        }
    }

    /// Fails only when a nested grid has been destroyed.
    pub fn serialize(&self) -> Result<ContentDescriptor> {
        Ok(match self {
            Content::Text(s) => ContentDescriptor::String(s.clone()),
            Content::Opaque(handle) => ContentDescriptor::Opaque(handle.snapshot()),
            Content::Grid(grid) => ContentDescriptor::Grid(Box::new(nested_descriptor(grid)?)),
        })
    }
}

/// A nested grid destroyed in place still occupies its cell; it reads as an
/// empty grid so the enclosing grid stays serializable.
fn nested_descriptor(grid: &Grid) -> Result<GridDescriptor> {
    if grid.is_destroyed() {
        return Ok(GridDescriptor::default());
    }
    grid.serialize(true)
}

/// Every accepted way of saying what a cell should contain.
#[derive(Debug, Clone, Default)]
pub enum CellDefinition {
    #[default]
    Empty,
    Text(String),
    Opaque(OpaqueHandle),
    /// A nested grid, built from its descriptor.
    Grid(GridDescriptor),
    /// Tagged content as found in descriptors.
    Descriptor(ContentDescriptor),
    /// Content copied from an existing cell (already deep-copied).
    Copy(Content),
}

impl CellDefinition {
    pub fn copy_of(content: &Content) -> Self {
        CellDefinition::Copy(content.clone())
    }
}

impl From<&str> for CellDefinition {
    fn from(s: &str) -> Self {
        CellDefinition::Text(s.to_string())
    }
}

impl From<String> for CellDefinition {
    fn from(s: String) -> Self {
        CellDefinition::Text(s)
    }
}

impl From<CellValue> for CellDefinition {
    fn from(value: CellValue) -> Self {
        match value {
            CellValue::Plain(s) => CellDefinition::Text(s),
            CellValue::Typed(d) => CellDefinition::Descriptor(d),
        }
    }
}

impl From<ContentDescriptor> for CellDefinition {
    fn from(d: ContentDescriptor) -> Self {
        CellDefinition::Descriptor(d)
    }
}

impl From<GridDescriptor> for CellDefinition {
    fn from(d: GridDescriptor) -> Self {
        CellDefinition::Grid(d)
    }
}

impl From<Content> for CellDefinition {
    fn from(content: Content) -> Self {
        CellDefinition::Copy(content)
    }
}

impl From<OpaqueHandle> for CellDefinition {
    fn from(handle: OpaqueHandle) -> Self {
        CellDefinition::Opaque(handle)
    }
}

/// The (row, column) intersection a cell sits at.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CellAddress {
    pub row: EntityId,
    pub column: EntityId,
}

#[derive(Debug, PartialEq)]
pub struct Cell {
    address: CellAddress,
    content: Content,
}

impl Clone for Cell {
    /// Deep copy that re-points a copied nested grid at this cell's address.
    fn clone(&self) -> Self {
        Cell::new(self.address.row.clone(), self.address.column.clone(), self.content.clone())
    }
}

impl Cell {
    pub(crate) fn new(row: EntityId, column: EntityId, mut content: Content) -> Self {
        let address = CellAddress { row, column };
        if let Content::Grid(grid) = &mut content {
            grid.set_parent_cell(Some(address.clone()));
        }
        Self { address, content }
    }

    /// Build a free-standing cell from its descriptor. Missing content means empty.
    pub fn from_descriptor(descriptor: &CellDescriptor, options: &GridOptions) -> Result<Self> {
        let content = match &descriptor.content {
            Some(d) => Content::from_descriptor(d, options)?,
            None => Content::default(),
        };
        Ok(Cell::new(
            EntityId::from(&descriptor.row_id),
            EntityId::from(&descriptor.column_id),
            content,
        ))
    }

    pub fn row_id(&self) -> &EntityId {
        &self.address.row
    }

    pub fn column_id(&self) -> &EntityId {
        &self.address.column
    }

    pub fn address(&self) -> &CellAddress {
        &self.address
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    /// Mutable access to a nested grid, if this cell holds one.
    pub fn nested_grid_mut(&mut self) -> Option<&mut Grid> {
        self.content.as_grid_mut()
    }

    pub(crate) fn replace_content(&mut self, content: Content) -> Content {
        let mut content = content;
        if let Content::Grid(grid) = &mut content {
            grid.set_parent_cell(Some(self.address.clone()));
        }
        std::mem::replace(&mut self.content, content)
    }

    /// Structural metadata, plus the content when `include_content` is set.
    pub fn serialize(&self, include_content: bool) -> Result<CellDescriptor> {
        let content = if include_content {
            Some(self.content.serialize()?)
        } else {
            None
        };
        Ok(CellDescriptor {
            row_id: self.address.row.to_string(),
            column_id: self.address.column.to_string(),
            content,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{ColumnDefinition, RowDefinition};
    use crate::identity::RowKind;

    #[derive(Debug)]
    struct Widget {
        label: &'static str,
    }

    impl OpaqueContent for Widget {
        fn snapshot(&self) -> serde_json::Value {
            serde_json::json!({ "widget": self.label })
        }
    }

    fn small_grid() -> Grid {
        let mut grid = Grid::new();
        grid.add_column(ColumnDefinition::new().id("a"), None).unwrap();
        grid.add_row(RowKind::Body, RowDefinition::new().id("r1").cell("a", "inner"), None)
            .unwrap();
        grid
    }

    #[test]
    fn test_text_round_trip() {
        let cell = Cell::new("r".into(), "c".into(), Content::from("hello"));
        let desc = cell.serialize(true).unwrap();
        let back = Cell::from_descriptor(&desc, &GridOptions::default()).unwrap();
        assert_eq!(back.content(), cell.content());
        assert_eq!(back.address(), cell.address());
    }

    #[test]
    fn test_serialize_without_content() {
        let cell = Cell::new("r".into(), "c".into(), Content::from("hello"));
        let desc = cell.serialize(false).unwrap();
        assert!(desc.content.is_none());
        assert_eq!(desc.row_id, "r");
        let json = serde_json::to_string(&desc).unwrap();
        assert!(!json.contains("content"));
    }

    #[test]
    fn test_nested_grid_round_trip() {
        let cell = Cell::new("r".into(), "c".into(), Content::from(small_grid()));
        let desc = cell.serialize(true).unwrap();
        assert!(matches!(desc.content, Some(ContentDescriptor::Grid(_))));
        let back = Cell::from_descriptor(&desc, &GridOptions::default()).unwrap();
        assert_eq!(back.content(), cell.content());
        let nested = back.content().as_grid().unwrap();
        assert_eq!(nested.parent_cell(), Some(&CellAddress { row: "r".into(), column: "c".into() }));
    }

    #[test]
    fn test_destroyed_nested_grid_reads_as_empty() {
        let mut cell = Cell::new("r".into(), "c".into(), Content::from(small_grid()));
        cell.nested_grid_mut().unwrap().destroy();
        assert_eq!(cell.content(), cell.content());
        let desc = cell.serialize(true).unwrap();
        assert_eq!(desc.content, Some(ContentDescriptor::Grid(Box::default())));
        assert_eq!(cell.content(), &Content::from(Grid::new()));
    }

    #[test]
    fn test_copy_aliases_opaque_and_deep_copies_grid() {
        let opaque = Content::opaque(Widget { label: "chart" });
        let copy = opaque.clone();
        let (a, b) = (opaque.as_opaque().unwrap(), copy.as_opaque().unwrap());
        assert!(Arc::ptr_eq(a, b));

        let mut original = Content::from(small_grid());
        let copy = original.clone();
        original
            .as_grid_mut()
            .unwrap()
            .set_cell("r1", "a", CellDefinition::from("changed"))
            .unwrap();
        let copied_text = copy.as_grid().unwrap().get_cell("r1", "a").unwrap().content().clone();
        assert_eq!(copied_text, Content::from("inner"));
        assert_ne!(original, copy);
    }

    #[test]
    fn test_opaque_snapshot_reloads_detached() {
        let cell = Cell::new("r".into(), "c".into(), Content::opaque(Widget { label: "map" }));
        let desc = cell.serialize(true).unwrap();
        let back = Cell::from_descriptor(&desc, &GridOptions::default()).unwrap();
        assert_eq!(back.content().type_name(), "opaque");
        // Equality goes through the snapshot
        assert_eq!(back.content(), cell.content());
    }

    #[test]
    fn test_definition_classification() {
        let options = GridOptions::default();
        assert_eq!(Content::from_definition(CellDefinition::Empty, &options).unwrap(), Content::default());
        let typed = CellDefinition::from(CellValue::Typed(ContentDescriptor::String("t".into())));
        assert_eq!(Content::from_definition(typed, &options).unwrap(), Content::from("t"));
        let nested = CellDefinition::from(small_grid().serialize(true).unwrap());
        assert_eq!(Content::from_definition(nested, &options).unwrap().type_name(), "grid");
    }
}
