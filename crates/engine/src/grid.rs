//! The grid: two ordered axes plus the full cross product of cells.
//!
//! Rows own their cells (keyed by column id), so removing a row removes its
//! cells and removing a column removes one cell from every row. Row order is
//! partitioned into contiguous title, body and footer sections; row positions
//! given to `add_row`/`move_row` resolve inside the row's own section.
//!
//! Every mutation validates its input completely before changing anything, so
//! a failed call leaves the grid exactly as it was. Events are emitted only
//! after the change is committed.

use std::cmp::Ordering;
use std::fmt;
use std::ops::Range;

use rustc_hash::FxHashMap;

use crate::axis::{OrderedAxis, Position};
use crate::content::{Cell, CellAddress, CellDefinition, Content};
use crate::descriptor::{CellValue, ColumnDescriptor, GridDescriptor, OrderedMap, RowDescriptor};
use crate::entity::{Column, ColumnDefaults, Row};
use crate::error::{GridError, Result};
use crate::events::{EventCallback, GridEvent, SubscriptionId};
use crate::identity::{AxisKind, EntityId, RowKind};
use crate::options::GridOptions;
use crate::render::{Completion, RenderHandle, RenderKey, RenderTarget, Renderer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Being replayed from a descriptor.
    Constructing,
    Ready,
    /// State released; every mutation fails with `UseAfterDestroy`.
    Destroyed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// A row or column named by id or by position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityRef<'a> {
    Id(&'a str),
    Position(usize),
}

impl<'a> From<&'a str> for EntityRef<'a> {
    fn from(id: &'a str) -> Self {
        EntityRef::Id(id)
    }
}

impl<'a> From<&'a String> for EntityRef<'a> {
    fn from(id: &'a String) -> Self {
        EntityRef::Id(id)
    }
}

impl<'a> From<&'a EntityId> for EntityRef<'a> {
    fn from(id: &'a EntityId) -> Self {
        EntityRef::Id(id.as_str())
    }
}

impl<'a> From<&'a Row> for EntityRef<'a> {
    fn from(row: &'a Row) -> Self {
        EntityRef::Id(row.id().as_str())
    }
}

impl<'a> From<&'a Column> for EntityRef<'a> {
    fn from(column: &'a Column) -> Self {
        EntityRef::Id(column.id().as_str())
    }
}

impl From<usize> for EntityRef<'_> {
    fn from(position: usize) -> Self {
        EntityRef::Position(position)
    }
}

/// What a new row should contain.
#[derive(Debug, Clone, Default)]
pub struct RowDefinition {
    /// Generated when `None`.
    pub id: Option<EntityId>,
    /// Explicit content keyed by column id.
    pub content: Vec<(EntityId, CellDefinition)>,
    /// Create columns named in `content` that do not exist yet.
    pub generate_missing_columns: bool,
    pub hidden: bool,
}

impl RowDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: impl Into<EntityId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn cell(mut self, column: impl Into<EntityId>, definition: impl Into<CellDefinition>) -> Self {
        self.content.push((column.into(), definition.into()));
        self
    }

    pub fn generate_missing_columns(mut self, generate: bool) -> Self {
        self.generate_missing_columns = generate;
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }
}

impl From<&RowDescriptor> for RowDefinition {
    fn from(d: &RowDescriptor) -> Self {
        Self {
            id: d.row_id.as_deref().map(EntityId::from),
            content: d
                .content
                .iter()
                .flat_map(|map| map.iter())
                .map(|(column, value)| (EntityId::from(column), CellDefinition::from(value.clone())))
                .collect(),
            generate_missing_columns: d.generate_missing_columns,
            hidden: d.hidden,
        }
    }
}

/// What a new column should contain.
#[derive(Debug, Clone, Default)]
pub struct ColumnDefinition {
    pub id: Option<EntityId>,
    /// Explicit content keyed by row id.
    pub content: Vec<(EntityId, CellDefinition)>,
    pub title_default: Option<CellDefinition>,
    pub body_default: Option<CellDefinition>,
    pub footer_default: Option<CellDefinition>,
    /// Create (body) rows named in `content` that do not exist yet.
    pub generate_missing_rows: bool,
    pub hidden: bool,
}

impl ColumnDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: impl Into<EntityId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn cell(mut self, row: impl Into<EntityId>, definition: impl Into<CellDefinition>) -> Self {
        self.content.push((row.into(), definition.into()));
        self
    }

    pub fn default_for(mut self, kind: RowKind, definition: impl Into<CellDefinition>) -> Self {
        let definition = Some(definition.into());
        match kind {
            RowKind::Title => self.title_default = definition,
            RowKind::Body => self.body_default = definition,
            RowKind::Footer => self.footer_default = definition,
        }
        self
    }

    pub fn generate_missing_rows(mut self, generate: bool) -> Self {
        self.generate_missing_rows = generate;
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }
}

impl From<&ColumnDescriptor> for ColumnDefinition {
    fn from(d: &ColumnDescriptor) -> Self {
        let default = |value: &Option<CellValue>| value.clone().map(CellDefinition::from);
        Self {
            id: d.column_id.as_deref().map(EntityId::from),
            content: d
                .content
                .iter()
                .flat_map(|map| map.iter())
                .map(|(row, value)| (EntityId::from(row), CellDefinition::from(value.clone())))
                .collect(),
            title_default: default(&d.title_content),
            body_default: default(&d.body_content),
            footer_default: default(&d.footer_content),
            generate_missing_rows: d.generate_missing_rows,
            hidden: d.hidden,
        }
    }
}

pub struct Grid {
    lifecycle: Lifecycle,
    rows: OrderedAxis<Row>,
    columns: OrderedAxis<Column>,
    title_count: usize,
    footer_count: usize,
    options: GridOptions,
    /// Informational back-reference for nested grids. Never serialized or traversed.
    parent: Option<CellAddress>,
    listeners: Vec<(SubscriptionId, EventCallback)>,
    next_subscription: u64,
    renderer: Option<Box<dyn Renderer>>,
    handles: FxHashMap<RenderKey, RenderHandle>,
}

impl fmt::Debug for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Grid")
            .field("lifecycle", &self.lifecycle)
            .field("rows", &self.rows.ids())
            .field("columns", &self.columns.ids())
            .field("title_rows", &self.title_count)
            .field("footer_rows", &self.footer_count)
            .field("parent", &self.parent)
            .finish_non_exhaustive()
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self::new()
    }
}

impl Grid {
    pub fn new() -> Self {
        Self::with_options(GridOptions::default())
    }

    pub fn with_options(options: GridOptions) -> Self {
        Self {
            lifecycle: Lifecycle::Ready,
            rows: OrderedAxis::new(AxisKind::Row),
            columns: OrderedAxis::new(AxisKind::Column),
            title_count: 0,
            footer_count: 0,
            options,
            parent: None,
            listeners: Vec::new(),
            next_subscription: 0,
            renderer: None,
            handles: FxHashMap::default(),
        }
    }

    pub fn options(&self) -> &GridOptions {
        &self.options
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn is_destroyed(&self) -> bool {
        self.lifecycle == Lifecycle::Destroyed
    }

    /// The cell this grid is nested in, if any.
    pub fn parent_cell(&self) -> Option<&CellAddress> {
        self.parent.as_ref()
    }

    pub(crate) fn set_parent_cell(&mut self, parent: Option<CellAddress>) {
        self.parent = parent;
    }

    fn ensure_live(&self) -> Result<()> {
        if self.lifecycle == Lifecycle::Destroyed {
            log::warn!("operation on destroyed grid rejected");
            return Err(GridError::UseAfterDestroy);
        }
        Ok(())
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn row_count_of(&self, kind: RowKind) -> usize {
        self.section(kind).len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Index range of the rows of `kind` in row order.
    pub fn section(&self, kind: RowKind) -> Range<usize> {
        let len = self.rows.len();
        match kind {
            RowKind::Title => 0..self.title_count,
            RowKind::Body => self.title_count..len - self.footer_count,
            RowKind::Footer => len - self.footer_count..len,
        }
    }

    pub fn row<'a>(&self, row: impl Into<EntityRef<'a>>) -> Option<&Row> {
        match row.into() {
            EntityRef::Id(id) => self.rows.get(id),
            EntityRef::Position(p) => self.rows.at(p),
        }
    }

    pub fn column<'a>(&self, column: impl Into<EntityRef<'a>>) -> Option<&Column> {
        match column.into() {
            EntityRef::Id(id) => self.columns.get(id),
            EntityRef::Position(p) => self.columns.at(p),
        }
    }

    pub fn row_at(&self, position: usize) -> Option<&Row> {
        self.rows.at(position)
    }

    pub fn column_at(&self, position: usize) -> Option<&Column> {
        self.columns.at(position)
    }

    /// Rows in order: title, body, footer.
    pub fn rows(&self) -> impl Iterator<Item = &Row> + '_ {
        self.rows.iter()
    }

    pub fn rows_of(&self, kind: RowKind) -> impl Iterator<Item = &Row> + '_ {
        self.rows.iter_range(self.section(kind))
    }

    pub fn columns(&self) -> impl Iterator<Item = &Column> + '_ {
        self.columns.iter()
    }

    pub fn row_ids(&self) -> &[EntityId] {
        self.rows.ids()
    }

    pub fn column_ids(&self) -> &[EntityId] {
        self.columns.ids()
    }

    pub fn row_index<'a>(&self, row: impl Into<EntityRef<'a>>) -> Option<usize> {
        self.row(row).map(Row::position)
    }

    pub fn column_index<'a>(&self, column: impl Into<EntityRef<'a>>) -> Option<usize> {
        self.column(column).map(Column::position)
    }

    pub fn get_cell<'r, 'c>(
        &self,
        row: impl Into<EntityRef<'r>>,
        column: impl Into<EntityRef<'c>>,
    ) -> Option<&Cell> {
        let column = self.column(column)?.id().clone();
        self.row(row)?.cell(column.as_str())
    }

    pub fn get_cell_mut<'r, 'c>(
        &mut self,
        row: impl Into<EntityRef<'r>>,
        column: impl Into<EntityRef<'c>>,
    ) -> Option<&mut Cell> {
        let column = self.column(column)?.id().clone();
        let row = self.row(row)?.id().clone();
        self.rows.get_mut(row.as_str())?.cell_mut(column.as_str())
    }

    /// Cells of a row in column order.
    pub fn row_cells<'a>(&self, row: impl Into<EntityRef<'a>>) -> Vec<&Cell> {
        let Some(row) = self.row(row) else {
            return Vec::new();
        };
        self.columns
            .iter()
            .filter_map(|column| row.cell(column.id().as_str()))
            .collect()
    }

    /// Cells of a column in row order.
    pub fn column_cells<'a>(&self, column: impl Into<EntityRef<'a>>) -> Vec<&Cell> {
        let Some(column) = self.column(column) else {
            return Vec::new();
        };
        self.rows
            .iter()
            .filter_map(|row| row.cell(column.id().as_str()))
            .collect()
    }

    /// Copy definition of an existing row: same kind-independent content, no id.
    pub fn row_definition<'a>(&self, row: impl Into<EntityRef<'a>>) -> Option<RowDefinition> {
        let row = self.row(row)?;
        let content = self
            .columns
            .iter()
            .filter_map(|column| {
                row.cell(column.id().as_str())
                    .map(|cell| (column.id().clone(), CellDefinition::copy_of(cell.content())))
            })
            .collect();
        Some(RowDefinition {
            id: None,
            content,
            generate_missing_columns: false,
            hidden: !row.is_visible(),
        })
    }

    // =========================================================================
    // Structural mutation
    // =========================================================================

    /// Add a row of `kind`. Cells for every column come from, in order of
    /// precedence: the definition's content, the column's template for `kind`,
    /// the grid-wide default for `kind`. `position` resolves inside the kind's
    /// section and defaults to its end.
    pub fn add_row(
        &mut self,
        kind: RowKind,
        definition: RowDefinition,
        position: Option<Position>,
    ) -> Result<EntityId> {
        self.ensure_live()?;
        let RowDefinition {
            id,
            content,
            generate_missing_columns,
            hidden,
        } = definition;

        let id = match id {
            Some(id) => self.rows.validate_id(id)?,
            None => self.rows.generate_id(&self.options.ids, &self.options.row_prefix),
        };
        let section = self.section(kind);
        let index = self.rows.resolve(&position.unwrap_or(Position::Last), section, None)?;

        let mut explicit: FxHashMap<EntityId, Content> = FxHashMap::default();
        let mut missing_columns: Vec<EntityId> = Vec::new();
        for (column, definition) in content {
            if !self.columns.contains(column.as_str()) {
                if !generate_missing_columns {
                    log::warn!("row '{}': ignoring content for unknown column '{}'", id, column);
                    continue;
                }
                if !missing_columns.contains(&column) {
                    missing_columns.push(column.clone());
                }
            }
            explicit.insert(column, Content::from_definition(definition, &self.options)?);
        }

        // Everything validated; commit.
        let mut events = Vec::with_capacity(missing_columns.len() + 1);
        for column_id in &missing_columns {
            let index = self.columns.len();
            let column = Column::new(column_id.clone(), ColumnDefaults::default());
            self.commit_column(column, index, &mut FxHashMap::default());
            events.push(GridEvent::ColumnAdded { id: column_id.clone(), position: index });
        }

        let mut row = self.build_row(&id, kind, &mut explicit);
        row.visible = !hidden;
        self.commit_row(row, index);
        log::debug!("added {} row '{}' at {}", kind, id, index);

        for column_id in &missing_columns {
            self.materialize_column(column_id);
        }
        self.materialize_row(&id);

        events.push(GridEvent::RowAdded { id: id.clone(), kind, position: index });
        for event in events {
            self.emit(event);
        }
        Ok(id)
    }

    /// Add a column. Each existing row gets one new cell: explicit content for
    /// that row, else the column's template for the row's kind, else the
    /// grid-wide default. `position` defaults to the end.
    pub fn add_column(&mut self, definition: ColumnDefinition, position: Option<Position>) -> Result<EntityId> {
        self.ensure_live()?;
        let ColumnDefinition {
            id,
            content,
            title_default,
            body_default,
            footer_default,
            generate_missing_rows,
            hidden,
        } = definition;
        // While replaying a descriptor its row list is authoritative.
        let generate_missing_rows = generate_missing_rows && self.lifecycle != Lifecycle::Constructing;

        let id = match id {
            Some(id) => self.columns.validate_id(id)?,
            None => self.columns.generate_id(&self.options.ids, &self.options.column_prefix),
        };
        let section = 0..self.columns.len();
        let index = self.columns.resolve(&position.unwrap_or(Position::Last), section, None)?;

        let mut defaults = ColumnDefaults::default();
        for (kind, definition) in [
            (RowKind::Title, title_default),
            (RowKind::Body, body_default),
            (RowKind::Footer, footer_default),
        ] {
            if let Some(definition) = definition {
                defaults.set(kind, Some(Content::from_definition(definition, &self.options)?));
            }
        }

        let mut explicit: FxHashMap<EntityId, Content> = FxHashMap::default();
        let mut missing_rows: Vec<EntityId> = Vec::new();
        for (row, definition) in content {
            if !self.rows.contains(row.as_str()) {
                if !generate_missing_rows {
                    log::warn!("column '{}': ignoring content for unknown row '{}'", id, row);
                    continue;
                }
                if !missing_rows.contains(&row) {
                    missing_rows.push(row.clone());
                }
            }
            explicit.insert(row, Content::from_definition(definition, &self.options)?);
        }

        // Everything validated; commit.
        let mut events = Vec::with_capacity(missing_rows.len() + 1);
        for row_id in &missing_rows {
            let index = self.rows.len() - self.footer_count;
            let row = self.build_row(row_id, RowKind::Body, &mut FxHashMap::default());
            self.commit_row(row, index);
            events.push(GridEvent::RowAdded {
                id: row_id.clone(),
                kind: RowKind::Body,
                position: index,
            });
        }

        let mut column = Column::new(id.clone(), defaults);
        column.visible = !hidden;
        self.commit_column(column, index, &mut explicit);
        log::debug!("added column '{}' at {}", id, index);

        for row_id in &missing_rows {
            self.materialize_row(row_id);
        }
        self.materialize_column(&id);

        events.push(GridEvent::ColumnAdded { id: id.clone(), position: index });
        for event in events {
            self.emit(event);
        }
        Ok(id)
    }

    fn build_row(&self, id: &EntityId, kind: RowKind, explicit: &mut FxHashMap<EntityId, Content>) -> Row {
        let mut row = Row::new(id.clone(), kind);
        let grid_default = self.options.defaults.get(kind);
        for column in self.columns.iter() {
            let content = explicit
                .remove(column.id().as_str())
                .unwrap_or_else(|| column.fallback_content(kind, grid_default));
            row.insert_cell(Cell::new(id.clone(), column.id().clone(), content));
        }
        row
    }

    fn commit_row(&mut self, row: Row, index: usize) {
        match row.kind() {
            RowKind::Title => self.title_count += 1,
            RowKind::Footer => self.footer_count += 1,
            RowKind::Body => {}
        }
        self.rows.insert_at(row, index);
    }

    fn commit_column(&mut self, column: Column, index: usize, explicit: &mut FxHashMap<EntityId, Content>) {
        let column_id = column.id().clone();
        let defaults = &self.options.defaults;
        for row in self.rows.values_mut() {
            let row_id = row.id().clone();
            let kind = row.kind();
            let content = explicit
                .remove(row_id.as_str())
                .unwrap_or_else(|| column.fallback_content(kind, defaults.get(kind)));
            row.insert_cell(Cell::new(row_id, column_id.clone(), content));
        }
        self.columns.insert_at(column, index);
    }

    /// Remove a row and its cells. Returns `false` if there is no such row.
    pub fn remove_row(&mut self, id: &str) -> Result<bool> {
        self.ensure_live()?;
        let Some(position) = self.rows.index_of(id) else {
            return Ok(false);
        };
        let Some(row) = self.rows.remove(id) else {
            return Ok(false);
        };
        match row.kind() {
            RowKind::Title => self.title_count -= 1,
            RowKind::Footer => self.footer_count -= 1,
            RowKind::Body => {}
        }
        self.teardown_row(&row);
        log::debug!("removed {} row '{}' from {}", row.kind(), id, position);
        self.emit(GridEvent::RowRemoved {
            id: row.id().clone(),
            kind: row.kind(),
            position,
        });
        Ok(true)
    }

    /// Remove a column and its cell in every row. Returns `false` if there is
    /// no such column.
    pub fn remove_column(&mut self, id: &str) -> Result<bool> {
        self.ensure_live()?;
        let Some(position) = self.columns.index_of(id) else {
            return Ok(false);
        };
        let Some(column) = self.columns.remove(id) else {
            return Ok(false);
        };
        for row in self.rows.values_mut() {
            row.remove_cell(id);
        }
        self.teardown_column(column.id());
        log::debug!("removed column '{}' from {}", id, position);
        self.emit(GridEvent::ColumnRemoved {
            id: column.id().clone(),
            position,
        });
        Ok(true)
    }

    /// Move a row within its section. Returns the new index, or `None` if
    /// there is no such row.
    pub fn move_row(&mut self, id: &str, position: Position) -> Result<Option<usize>> {
        self.ensure_live()?;
        let Some((kind, before)) = self.rows.get(id).map(|r| (r.kind(), r.position())) else {
            return Ok(None);
        };
        let section = self.section(kind);
        let moved = self.rows.move_in(id, &position, section)?;
        if let Some(after) = moved {
            if after != before {
                self.emit(GridEvent::Reordered {
                    axis: AxisKind::Row,
                    id: EntityId::from(id),
                    position: after,
                });
            }
        }
        Ok(moved)
    }

    pub fn move_column(&mut self, id: &str, position: Position) -> Result<Option<usize>> {
        self.ensure_live()?;
        let Some(before) = self.columns.index_of(id) else {
            return Ok(None);
        };
        let moved = self.columns.move_to(id, &position)?;
        if let Some(after) = moved {
            if after != before {
                self.emit(GridEvent::Reordered {
                    axis: AxisKind::Column,
                    id: EntityId::from(id),
                    position: after,
                });
            }
        }
        Ok(moved)
    }

    /// Partial reorder of rows, applied inside each section separately.
    pub fn order_rows<S: AsRef<str>>(&mut self, ids: &[S]) -> Result<()> {
        self.ensure_live()?;
        let mut changed = Vec::new();
        for kind in RowKind::ALL {
            let section = self.section(kind);
            changed.extend(self.rows.reorder_in(ids, section));
        }
        self.emit_reordered(AxisKind::Row, changed);
        Ok(())
    }

    pub fn order_columns<S: AsRef<str>>(&mut self, ids: &[S]) -> Result<()> {
        self.ensure_live()?;
        let changed = self.columns.reorder(ids);
        self.emit_reordered(AxisKind::Column, changed);
        Ok(())
    }

    /// Stable sort of each row section with a less-than predicate.
    pub fn sort_rows<F>(&mut self, mut less: F) -> Result<()>
    where
        F: FnMut(&Row, &Row) -> bool,
    {
        self.ensure_live()?;
        let mut changed = Vec::new();
        for kind in RowKind::ALL {
            let section = self.section(kind);
            changed.extend(self.rows.sort_in(section, &mut less));
        }
        self.emit_reordered(AxisKind::Row, changed);
        Ok(())
    }

    pub fn sort_columns<F>(&mut self, less: F) -> Result<()>
    where
        F: FnMut(&Column, &Column) -> bool,
    {
        self.ensure_live()?;
        let changed = self.columns.sort_by(less);
        self.emit_reordered(AxisKind::Column, changed);
        Ok(())
    }

    /// Sort each row section by the content of one column: numerically when
    /// both cells parse as numbers, case-insensitively otherwise. Returns
    /// `false` if there is no such column.
    pub fn sort_rows_by_column(&mut self, column: &str, direction: SortDirection) -> Result<bool> {
        self.ensure_live()?;
        if !self.columns.contains(column) {
            return Ok(false);
        }
        self.sort_rows(|a, b| match (a.cell(column), b.cell(column)) {
            (Some(x), Some(y)) => {
                let ord = compare_content(x.content(), y.content());
                match direction {
                    SortDirection::Ascending => ord == Ordering::Less,
                    SortDirection::Descending => ord == Ordering::Greater,
                }
            }
            _ => false,
        })?;
        Ok(true)
    }

    fn emit_reordered(&mut self, axis: AxisKind, changed: Vec<(EntityId, usize)>) {
        if !changed.is_empty() {
            log::debug!("{} {} entities changed position", changed.len(), axis);
        }
        for (id, position) in changed {
            self.emit(GridEvent::Reordered { axis, id, position });
        }
    }

    // =========================================================================
    // Content
    // =========================================================================

    /// Replace a cell's content. Returns `false` if either side does not resolve.
    pub fn set_cell<'r, 'c>(
        &mut self,
        row: impl Into<EntityRef<'r>>,
        column: impl Into<EntityRef<'c>>,
        definition: impl Into<CellDefinition>,
    ) -> Result<bool> {
        self.ensure_live()?;
        let (Some(row_id), Some(column_id)) = (
            self.row(row).map(|r| r.id().clone()),
            self.column(column).map(|c| c.id().clone()),
        ) else {
            return Ok(false);
        };
        let content = Content::from_definition(definition.into(), &self.options)?;
        let Some(cell) = self
            .rows
            .get_mut(row_id.as_str())
            .and_then(|r| r.cell_mut(column_id.as_str()))
        else {
            return Ok(false);
        };
        cell.replace_content(content);

        if let Some(renderer) = self.renderer.as_mut() {
            let key = RenderKey::Cell(row_id.clone(), column_id.clone());
            if let Some(old) = self.handles.remove(&key) {
                renderer.teardown(old);
            }
            if let Some(cell) = self.rows.get(row_id.as_str()).and_then(|r| r.cell(column_id.as_str())) {
                let handle = renderer.materialize(RenderTarget::Cell(cell));
                self.handles.insert(key, handle);
            }
        }
        Ok(true)
    }

    /// Set or clear a column's default template for rows of `kind`. Existing
    /// cells are unaffected. Returns `false` if there is no such column.
    pub fn set_column_default(
        &mut self,
        column: &str,
        kind: RowKind,
        definition: Option<CellDefinition>,
    ) -> Result<bool> {
        self.ensure_live()?;
        if !self.columns.contains(column) {
            return Ok(false);
        }
        let content = definition
            .map(|d| Content::from_definition(d, &self.options))
            .transpose()?;
        if let Some(column) = self.columns.get_mut(column) {
            column.defaults.set(kind, content);
        }
        Ok(true)
    }

    // =========================================================================
    // Visibility
    // =========================================================================

    /// Show or hide a row. `on_complete` runs when the renderer finishes its
    /// transition, or immediately when there is nothing to animate.
    pub fn set_row_visible(&mut self, id: &str, visible: bool, on_complete: Option<Completion>) -> Result<bool> {
        self.ensure_live()?;
        let Some(row) = self.rows.get_mut(id) else {
            return Ok(false);
        };
        row.visible = visible;
        let key = RenderKey::Row(row.id().clone());
        self.notify_visibility(key, visible, on_complete);
        Ok(true)
    }

    pub fn set_column_visible(&mut self, id: &str, visible: bool, on_complete: Option<Completion>) -> Result<bool> {
        self.ensure_live()?;
        let Some(column) = self.columns.get_mut(id) else {
            return Ok(false);
        };
        column.visible = visible;
        let key = RenderKey::Column(column.id().clone());
        self.notify_visibility(key, visible, on_complete);
        Ok(true)
    }

    fn notify_visibility(&mut self, key: RenderKey, visible: bool, on_complete: Option<Completion>) {
        match (self.renderer.as_mut(), self.handles.get(&key)) {
            (Some(renderer), Some(handle)) => renderer.set_visible(*handle, visible, on_complete),
            _ => {
                if let Some(done) = on_complete {
                    done();
                }
            }
        }
    }

    // =========================================================================
    // Serialization
    // =========================================================================

    /// Descriptor of the whole grid: columns (with their templates) in order,
    /// then rows title-body-footer, each row's cells in column order. Without
    /// content only ids, flags and section counts are emitted.
    pub fn serialize(&self, include_content: bool) -> Result<GridDescriptor> {
        self.ensure_live()?;
        let template = |content: Option<&Content>| -> Result<Option<CellValue>> {
            match content {
                Some(c) if include_content => Ok(Some(CellValue::Typed(c.serialize()?))),
                _ => Ok(None),
            }
        };

        let mut columns = Vec::with_capacity(self.columns.len());
        for column in self.columns.iter() {
            let defaults = column.defaults();
            columns.push(ColumnDescriptor {
                column_id: Some(column.id().to_string()),
                title_content: template(defaults.get(RowKind::Title))?,
                body_content: template(defaults.get(RowKind::Body))?,
                footer_content: template(defaults.get(RowKind::Footer))?,
                content: None,
                generate_missing_rows: false,
                hidden: !column.is_visible(),
            });
        }

        let mut rows = Vec::with_capacity(self.rows.len());
        for row in self.rows.iter() {
            let content = if include_content {
                let mut map = OrderedMap::new();
                for column in self.columns.iter() {
                    if let Some(cell) = row.cell(column.id().as_str()) {
                        map.insert(column.id().to_string(), CellValue::Typed(cell.content().serialize()?));
                    }
                }
                Some(map)
            } else {
                None
            };
            rows.push(RowDescriptor {
                row_id: Some(row.id().to_string()),
                content,
                generate_missing_columns: false,
                hidden: !row.is_visible(),
            });
        }

        Ok(GridDescriptor {
            columns,
            rows,
            title_row_count: self.title_count,
            footer_row_count: self.footer_count,
        })
    }

    /// Rebuild a grid by replaying `add_column` for each column descriptor and
    /// then `add_row` for each row descriptor, in order. Columns never generate
    /// rows during the replay; only the rows listed in the descriptor exist.
    pub fn deserialize(descriptor: &GridDescriptor, options: GridOptions) -> Result<Grid> {
        descriptor.validate()?;
        let mut grid = Grid::with_options(options);
        grid.lifecycle = Lifecycle::Constructing;
        for column in &descriptor.columns {
            grid.add_column(ColumnDefinition::from(column), None)?;
        }
        for (i, row) in descriptor.rows.iter().enumerate() {
            grid.add_row(descriptor.kind_of_row(i), RowDefinition::from(row), None)?;
        }
        grid.lifecycle = Lifecycle::Ready;
        Ok(grid)
    }

    pub fn to_json(&self) -> Result<String> {
        self.serialize(true)?.to_json()
    }

    pub fn from_json(json: &str, options: GridOptions) -> Result<Grid> {
        Grid::deserialize(&GridDescriptor::from_json(json)?, options)
    }

    /// Independent copy: rows, columns and cells are copied (nested grids
    /// recursively, opaque content aliased). Subscribers and renderer are not.
    pub fn deep_copy(&self) -> Grid {
        Grid {
            lifecycle: match self.lifecycle {
                Lifecycle::Destroyed => Lifecycle::Destroyed,
                _ => Lifecycle::Ready,
            },
            rows: self.rows.clone(),
            columns: self.columns.clone(),
            title_count: self.title_count,
            footer_count: self.footer_count,
            options: self.options.clone(),
            parent: None,
            listeners: Vec::new(),
            next_subscription: 0,
            renderer: None,
            handles: FxHashMap::default(),
        }
    }

    /// Tear down rendered state and release all rows, columns and cells.
    /// Idempotent.
    pub fn destroy(&mut self) {
        if self.lifecycle == Lifecycle::Destroyed {
            return;
        }
        self.teardown_all();
        self.renderer = None;
        self.rows.drain();
        self.columns.drain();
        self.title_count = 0;
        self.footer_count = 0;
        self.listeners.clear();
        self.lifecycle = Lifecycle::Destroyed;
        log::debug!("grid destroyed");
    }

    // =========================================================================
    // Events
    // =========================================================================

    pub fn subscribe(&mut self, callback: EventCallback) -> Result<SubscriptionId> {
        self.ensure_live()?;
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, callback));
        Ok(id)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sub, _)| *sub != id);
        self.listeners.len() != before
    }

    fn emit(&mut self, event: GridEvent) {
        for (_, callback) in self.listeners.iter_mut() {
            callback(&event);
        }
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    /// Attach a renderer, replacing any previous one, and materialize every
    /// existing column, row and cell.
    pub fn attach_renderer(&mut self, renderer: Box<dyn Renderer>) -> Result<()> {
        self.ensure_live()?;
        self.teardown_all();
        self.renderer = Some(renderer);
        let columns: Vec<EntityId> = self.columns.ids().to_vec();
        for id in &columns {
            self.materialize_column(id);
        }
        let rows: Vec<EntityId> = self.rows.ids().to_vec();
        for id in &rows {
            self.materialize_row(id);
        }
        Ok(())
    }

    /// Tear down every handle and hand the renderer back.
    pub fn detach_renderer(&mut self) -> Option<Box<dyn Renderer>> {
        self.teardown_all();
        self.renderer.take()
    }

    pub fn row_handle(&self, id: &str) -> Option<RenderHandle> {
        self.handles.get(&RenderKey::Row(EntityId::from(id))).copied()
    }

    pub fn column_handle(&self, id: &str) -> Option<RenderHandle> {
        self.handles.get(&RenderKey::Column(EntityId::from(id))).copied()
    }

    pub fn cell_handle(&self, row: &str, column: &str) -> Option<RenderHandle> {
        self.handles
            .get(&RenderKey::Cell(EntityId::from(row), EntityId::from(column)))
            .copied()
    }

    /// Materialize a row and any of its cells that are not yet materialized.
    fn materialize_row(&mut self, id: &EntityId) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };
        let Some(row) = self.rows.get(id.as_str()) else {
            return;
        };
        let key = RenderKey::Row(id.clone());
        if !self.handles.contains_key(&key) {
            let handle = renderer.materialize(RenderTarget::Row(row));
            self.handles.insert(key, handle);
        }
        for column in self.columns.iter() {
            let key = RenderKey::Cell(id.clone(), column.id().clone());
            if self.handles.contains_key(&key) {
                continue;
            }
            if let Some(cell) = row.cell(column.id().as_str()) {
                let handle = renderer.materialize(RenderTarget::Cell(cell));
                self.handles.insert(key, handle);
            }
        }
    }

    /// Materialize a column and any of its cells that are not yet materialized.
    fn materialize_column(&mut self, id: &EntityId) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };
        let Some(column) = self.columns.get(id.as_str()) else {
            return;
        };
        let key = RenderKey::Column(id.clone());
        if !self.handles.contains_key(&key) {
            let handle = renderer.materialize(RenderTarget::Column(column));
            self.handles.insert(key, handle);
        }
        for row in self.rows.iter() {
            let key = RenderKey::Cell(row.id().clone(), id.clone());
            if self.handles.contains_key(&key) {
                continue;
            }
            if let Some(cell) = row.cell(id.as_str()) {
                let handle = renderer.materialize(RenderTarget::Cell(cell));
                self.handles.insert(key, handle);
            }
        }
    }

    fn teardown_row(&mut self, row: &Row) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };
        for cell in row.cells() {
            let key = RenderKey::Cell(row.id().clone(), cell.column_id().clone());
            if let Some(handle) = self.handles.remove(&key) {
                renderer.teardown(handle);
            }
        }
        if let Some(handle) = self.handles.remove(&RenderKey::Row(row.id().clone())) {
            renderer.teardown(handle);
        }
    }

    fn teardown_column(&mut self, id: &EntityId) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };
        for row in self.rows.iter() {
            if let Some(handle) = self.handles.remove(&RenderKey::Cell(row.id().clone(), id.clone())) {
                renderer.teardown(handle);
            }
        }
        if let Some(handle) = self.handles.remove(&RenderKey::Column(id.clone())) {
            renderer.teardown(handle);
        }
    }

    fn teardown_all(&mut self) {
        match self.renderer.as_mut() {
            Some(renderer) => {
                for (_, handle) in self.handles.drain() {
                    renderer.teardown(handle);
                }
            }
            None => self.handles.clear(),
        }
    }

    // =========================================================================
    // Invariants
    // =========================================================================

    /// Check axis consistency, section contiguity and the cell cross product.
    pub fn check_invariants(&self) -> std::result::Result<(), String> {
        self.rows.check_invariants()?;
        self.columns.check_invariants()?;

        if self.title_count + self.footer_count > self.rows.len() {
            return Err(format!(
                "section counts {}+{} exceed {} rows",
                self.title_count,
                self.footer_count,
                self.rows.len()
            ));
        }
        for kind in RowKind::ALL {
            for row in self.rows.iter_range(self.section(kind)) {
                if row.kind() != kind {
                    return Err(format!(
                        "{} row '{}' sits in the {} section",
                        row.kind(),
                        row.id(),
                        kind
                    ));
                }
            }
        }

        for row in self.rows.iter() {
            if row.cell_count() != self.columns.len() {
                return Err(format!(
                    "row '{}' has {} cells for {} columns",
                    row.id(),
                    row.cell_count(),
                    self.columns.len()
                ));
            }
            for column in self.columns.iter() {
                match row.cell(column.id().as_str()) {
                    None => return Err(format!("missing cell ({}, {})", row.id(), column.id())),
                    Some(cell) if cell.row_id() != row.id() || cell.column_id() != column.id() => {
                        return Err(format!(
                            "cell at ({}, {}) claims ({}, {})",
                            row.id(),
                            column.id(),
                            cell.row_id(),
                            cell.column_id()
                        ))
                    }
                    Some(_) => {}
                }
            }
        }
        Ok(())
    }
}

/// Ordering used by `sort_rows_by_column`. Text sorts before other content.
fn compare_content(a: &Content, b: &Content) -> Ordering {
    match (a.as_text(), b.as_text()) {
        (Some(x), Some(y)) => match (x.trim().parse::<f64>(), y.trim().parse::<f64>()) {
            (Ok(m), Ok(n)) => m.partial_cmp(&n).unwrap_or(Ordering::Equal),
            _ => x.to_lowercase().cmp(&y.to_lowercase()),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
