// Grid operations behind the `tgrid` subcommands.
// Pure functions: descriptor text in, grid or report out. No IO, no clap.

use serde::Serialize;

use tabgrid_config::Settings;
use tabgrid_engine::{
    CellDefinition, ColumnDefinition, EntityId, Grid, Position, RowDefinition, RowKind, SortDirection,
};

use crate::error::CliError;

// ---------------------------------------------------------------------------
// Loading and output
// ---------------------------------------------------------------------------

/// Build a grid from descriptor JSON using the configured options.
pub fn load(json: &str, settings: &Settings) -> Result<Grid, CliError> {
    let grid = Grid::from_json(json, settings.grid_options())?;
    log::debug!("loaded grid: {} rows x {} columns", grid.row_count(), grid.column_count());
    Ok(grid)
}

/// Descriptor JSON of `grid`, with or without cell content.
pub fn to_output(grid: &Grid, include_content: bool) -> Result<String, CliError> {
    Ok(grid.serialize(include_content)?.to_json()?)
}

// ---------------------------------------------------------------------------
// Argument parsing
// ---------------------------------------------------------------------------

/// Split `key=value`. The key must be non-empty; the value may be empty.
pub fn parse_assignment(arg: &str) -> Result<(String, String), CliError> {
    let (key, value) = arg
        .split_once('=')
        .ok_or_else(|| CliError::args(format!("expected KEY=VALUE, got {:?}", arg)))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(CliError::args(format!("empty key in {:?}", arg)));
    }
    Ok((key.to_string(), value.to_string()))
}

pub fn parse_kind(text: &str) -> Result<RowKind, CliError> {
    match text.trim().to_ascii_lowercase().as_str() {
        "title" | "head" => Ok(RowKind::Title),
        "body" => Ok(RowKind::Body),
        "footer" | "foot" => Ok(RowKind::Footer),
        other => Err(CliError::args(format!("unknown row kind {:?}", other))
            .with_hint("row kinds are title, body, footer")),
    }
}

/// `first`/`last`/index, or an offset (`up`, `down`, `+n`, `-n`) when an
/// anchor is given.
pub fn parse_position(to: &str, anchor: Option<&str>) -> Result<Position, CliError> {
    let position = match anchor {
        Some(anchor) => Position::relative(to, anchor)?,
        None => to.parse::<Position>()?,
    };
    Ok(position)
}

// ---------------------------------------------------------------------------
// inspect
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Inspection {
    pub columns: Vec<String>,
    pub title_rows: Vec<String>,
    pub body_rows: Vec<String>,
    pub footer_rows: Vec<String>,
    pub cells: usize,
    pub nested_grids: usize,
    pub hidden_rows: usize,
    pub hidden_columns: usize,
}

pub fn inspect(grid: &Grid) -> Inspection {
    let ids = |kind: RowKind| grid.rows_of(kind).map(|r| r.id().to_string()).collect::<Vec<_>>();
    let nested_grids = grid
        .rows()
        .flat_map(|row| grid.row_cells(row))
        .filter(|cell| cell.content().as_grid().is_some())
        .count();

    Inspection {
        columns: grid.column_ids().iter().map(|id| id.to_string()).collect(),
        title_rows: ids(RowKind::Title),
        body_rows: ids(RowKind::Body),
        footer_rows: ids(RowKind::Footer),
        cells: grid.row_count() * grid.column_count(),
        nested_grids,
        hidden_rows: grid.rows().filter(|r| !r.is_visible()).count(),
        hidden_columns: grid.columns().filter(|c| !c.is_visible()).count(),
    }
}

impl Inspection {
    pub fn to_text(&self) -> String {
        let list = |ids: &[String]| if ids.is_empty() { "-".to_string() } else { ids.join(", ") };
        let mut out = String::new();
        out.push_str(&format!("columns ({}): {}\n", self.columns.len(), list(&self.columns)));
        out.push_str(&format!("title   ({}): {}\n", self.title_rows.len(), list(&self.title_rows)));
        out.push_str(&format!("body    ({}): {}\n", self.body_rows.len(), list(&self.body_rows)));
        out.push_str(&format!("footer  ({}): {}\n", self.footer_rows.len(), list(&self.footer_rows)));
        out.push_str(&format!(
            "cells: {}  nested grids: {}  hidden rows: {}  hidden columns: {}\n",
            self.cells, self.nested_grids, self.hidden_rows, self.hidden_columns
        ));
        out
    }
}

// ---------------------------------------------------------------------------
// reorder / sort / move
// ---------------------------------------------------------------------------

pub fn reorder(grid: &mut Grid, rows: &[String], columns: &[String]) -> Result<(), CliError> {
    if !rows.is_empty() {
        grid.order_rows(rows)?;
    }
    if !columns.is_empty() {
        grid.order_columns(columns)?;
    }
    Ok(())
}

pub fn sort(grid: &mut Grid, column: &str, descending: bool) -> Result<(), CliError> {
    let direction = if descending {
        SortDirection::Descending
    } else {
        SortDirection::Ascending
    };
    if !grid.sort_rows_by_column(column, direction)? {
        return Err(CliError::args(format!("unknown column {:?}", column)));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Row(String),
    Column(String),
}

/// Move a row (within its section) or a column. Returns the new index.
pub fn move_entity(grid: &mut Grid, target: &Target, position: Position) -> Result<usize, CliError> {
    let moved = match target {
        Target::Row(id) => grid.move_row(id, position)?,
        Target::Column(id) => grid.move_column(id, position)?,
    };
    moved.ok_or_else(|| {
        let what = match target {
            Target::Row(id) => format!("unknown row {:?}", id),
            Target::Column(id) => format!("unknown column {:?}", id),
        };
        CliError::args(what)
    })
}

// ---------------------------------------------------------------------------
// add-row / add-column
// ---------------------------------------------------------------------------

/// Add a row. Whether unknown columns named in `cells` are created follows
/// the `[generate]` settings.
pub fn add_row(
    grid: &mut Grid,
    kind: RowKind,
    id: Option<&str>,
    cells: &[(String, String)],
    at: Option<Position>,
    settings: &Settings,
) -> Result<EntityId, CliError> {
    let mut def = RowDefinition::new().generate_missing_columns(settings.generate.missing_columns);
    if let Some(id) = id {
        def = def.id(id);
    }
    for (column, value) in cells {
        def = def.cell(column.as_str(), CellDefinition::from(value.as_str()));
    }
    Ok(grid.add_row(kind, def, at)?)
}

/// Add a column with per-kind defaults. Whether unknown rows named in
/// `cells` are created follows the `[generate]` settings.
pub fn add_column(
    grid: &mut Grid,
    id: Option<&str>,
    cells: &[(String, String)],
    defaults: &[(RowKind, String)],
    at: Option<Position>,
    settings: &Settings,
) -> Result<EntityId, CliError> {
    let mut def = ColumnDefinition::new().generate_missing_rows(settings.generate.missing_rows);
    if let Some(id) = id {
        def = def.id(id);
    }
    for (row, value) in cells {
        def = def.cell(row.as_str(), value.as_str());
    }
    for (kind, value) in defaults {
        def = def.default_for(*kind, value.as_str());
    }
    Ok(grid.add_column(def, at)?)
}
