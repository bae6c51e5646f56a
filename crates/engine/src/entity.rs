//! Rows and columns.
//!
//! Entities carry no content equality: two rows are the same row exactly when
//! they have the same id in the same grid. Compare `id()`s, not entities.

use rustc_hash::FxHashMap;

use crate::axis::{AxisEntity, Links};
use crate::content::{Cell, Content};
use crate::identity::{EntityId, RowKind};

#[derive(Debug, Clone)]
pub struct Row {
    id: EntityId,
    kind: RowKind,
    links: Links,
    /// One cell per live column, keyed by column id.
    cells: FxHashMap<EntityId, Cell>,
    pub(crate) visible: bool,
}

impl Row {
    pub(crate) fn new(id: EntityId, kind: RowKind) -> Self {
        Self {
            id,
            kind,
            links: Links::default(),
            cells: FxHashMap::default(),
            visible: true,
        }
    }

    pub fn id(&self) -> &EntityId {
        &self.id
    }

    pub fn kind(&self) -> RowKind {
        self.kind
    }

    /// Index in the grid's row order (title rows count first).
    pub fn position(&self) -> usize {
        self.links.position()
    }

    pub fn prev(&self) -> Option<&EntityId> {
        self.links.prev()
    }

    pub fn next(&self) -> Option<&EntityId> {
        self.links.next()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn cell(&self, column: &str) -> Option<&Cell> {
        self.cells.get(column)
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub(crate) fn cells(&self) -> impl Iterator<Item = &Cell> + '_ {
        self.cells.values()
    }

    pub(crate) fn cell_mut(&mut self, column: &str) -> Option<&mut Cell> {
        self.cells.get_mut(column)
    }

    pub(crate) fn insert_cell(&mut self, cell: Cell) {
        self.cells.insert(cell.column_id().clone(), cell);
    }

    pub(crate) fn remove_cell(&mut self, column: &str) -> Option<Cell> {
        self.cells.remove(column)
    }
}

impl AxisEntity for Row {
    fn id(&self) -> &EntityId {
        &self.id
    }

    fn links(&self) -> &Links {
        &self.links
    }

    fn links_mut(&mut self) -> &mut Links {
        &mut self.links
    }
}

/// Per-kind default content templates of a column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnDefaults {
    pub title: Option<Content>,
    pub body: Option<Content>,
    pub footer: Option<Content>,
}

impl ColumnDefaults {
    pub fn get(&self, kind: RowKind) -> Option<&Content> {
        match kind {
            RowKind::Title => self.title.as_ref(),
            RowKind::Body => self.body.as_ref(),
            RowKind::Footer => self.footer.as_ref(),
        }
    }

    pub fn set(&mut self, kind: RowKind, content: Option<Content>) {
        match kind {
            RowKind::Title => self.title = content,
            RowKind::Body => self.body = content,
            RowKind::Footer => self.footer = content,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Column {
    id: EntityId,
    links: Links,
    pub(crate) defaults: ColumnDefaults,
    pub(crate) visible: bool,
}

impl Column {
    pub(crate) fn new(id: EntityId, defaults: ColumnDefaults) -> Self {
        Self {
            id,
            links: Links::default(),
            defaults,
            visible: true,
        }
    }

    pub fn id(&self) -> &EntityId {
        &self.id
    }

    pub fn position(&self) -> usize {
        self.links.position()
    }

    pub fn prev(&self) -> Option<&EntityId> {
        self.links.prev()
    }

    pub fn next(&self) -> Option<&EntityId> {
        self.links.next()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn defaults(&self) -> &ColumnDefaults {
        &self.defaults
    }

    /// Content a new cell in this column gets for a row of `kind` that
    /// supplies none: the column's template, else the grid-wide text.
    pub(crate) fn fallback_content(&self, kind: RowKind, grid_default: &str) -> Content {
        self.defaults
            .get(kind)
            .cloned()
            .unwrap_or_else(|| Content::Text(grid_default.to_string()))
    }
}

impl AxisEntity for Column {
    fn id(&self) -> &EntityId {
        &self.id
    }

    fn links(&self) -> &Links {
        &self.links
    }

    fn links_mut(&mut self) -> &mut Links {
        &mut self.links
    }
}
