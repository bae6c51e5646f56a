//! Test harness for grid operations with event tracking.
//!
//! `GridHarness` wraps a `Grid` and:
//! - Collects every emitted `GridEvent`
//! - Checks the grid invariants after each op
//! - Provides `apply_ops` with atomic/non-atomic semantics
//!
//! Atomic batches snapshot the grid with `deep_copy` and restore it when an
//! op fails, discarding the events the failed batch produced.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::axis::Position;
use crate::error::GridError;
use crate::events::{EventCollector, SubscriptionId};
use crate::grid::{ColumnDefinition, Grid, RowDefinition};
use crate::identity::RowKind;

/// Operation to apply to a grid.
#[derive(Debug, Clone)]
pub enum Op {
    AddRow {
        kind: RowKind,
        id: Option<String>,
        cells: Vec<(String, String)>,
        position: Option<Position>,
    },
    AddColumn {
        id: Option<String>,
        body_default: Option<String>,
        position: Option<Position>,
    },
    RemoveRow(String),
    RemoveColumn(String),
    MoveRow { id: String, position: Position },
    MoveColumn { id: String, position: Position },
    SetCell { row: String, column: String, value: String },
}

/// Result of applying operations.
#[derive(Debug, Clone)]
pub struct ApplyResult {
    /// Number of ops successfully applied (0 after an atomic rollback).
    pub applied: usize,
    /// Index of the failing op and its error.
    pub error: Option<(usize, GridError)>,
}

pub struct GridHarness {
    grid: Grid,
    events: Arc<Mutex<EventCollector>>,
    subscription: SubscriptionId,
}

impl GridHarness {
    pub fn new() -> Self {
        Self::with_grid(Grid::new())
    }

    pub fn with_grid(mut grid: Grid) -> Self {
        let events = Arc::new(Mutex::new(EventCollector::new()));
        let subscription = Self::attach(&mut grid, &events);
        Self {
            grid,
            events,
            subscription,
        }
    }

    fn attach(grid: &mut Grid, events: &Arc<Mutex<EventCollector>>) -> SubscriptionId {
        let sink = Arc::clone(events);
        grid.subscribe(Box::new(move |event| {
            sink.lock().unwrap().push(event.clone());
        }))
        .expect("harness grid is live")
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }

    pub fn events(&self) -> MutexGuard<'_, EventCollector> {
        self.events.lock().unwrap()
    }

    pub fn clear_events(&self) {
        self.events.lock().unwrap().clear();
    }

    /// Apply operations with specified atomicity.
    ///
    /// - `atomic=true`: All-or-nothing. On error, restore the grid and drop
    ///   the batch's events.
    /// - `atomic=false`: Partial apply. On error, keep changes up to the failing op.
    pub fn apply_ops(&mut self, ops: &[Op], atomic: bool) -> ApplyResult {
        let snapshot = atomic.then(|| self.grid.deep_copy());
        let events_before = self.events().len();

        let mut applied = 0;
        let mut error = None;
        for (idx, op) in ops.iter().enumerate() {
            match self.apply_single_op(op) {
                Ok(()) => {
                    applied += 1;
                    if let Err(violation) = self.grid.check_invariants() {
                        panic!("invariant broken after op {idx} ({op:?}): {violation}");
                    }
                }
                Err(e) => {
                    error = Some((idx, e));
                    break;
                }
            }
        }

        if let (Some(snapshot), Some(_)) = (snapshot, &error) {
            self.grid.unsubscribe(self.subscription);
            self.grid = snapshot;
            self.subscription = Self::attach(&mut self.grid, &self.events);

            let mut events = self.events.lock().unwrap();
            let kept: Vec<_> = events.events()[..events_before].to_vec();
            events.clear();
            for event in kept {
                events.push(event);
            }
            return ApplyResult { applied: 0, error };
        }

        ApplyResult { applied, error }
    }

    fn apply_single_op(&mut self, op: &Op) -> Result<(), GridError> {
        match op {
            Op::AddRow {
                kind,
                id,
                cells,
                position,
            } => {
                let mut def = RowDefinition::new();
                if let Some(id) = id {
                    def = def.id(id.as_str());
                }
                for (column, value) in cells {
                    def = def.cell(column.as_str(), value.as_str());
                }
                self.grid.add_row(*kind, def, position.clone())?;
            }
            Op::AddColumn {
                id,
                body_default,
                position,
            } => {
                let mut def = ColumnDefinition::new();
                if let Some(id) = id {
                    def = def.id(id.as_str());
                }
                if let Some(text) = body_default {
                    def = def.default_for(RowKind::Body, text.as_str());
                }
                self.grid.add_column(def, position.clone())?;
            }
            Op::RemoveRow(id) => {
                self.grid.remove_row(id)?;
            }
            Op::RemoveColumn(id) => {
                self.grid.remove_column(id)?;
            }
            Op::MoveRow { id, position } => {
                self.grid.move_row(id, position.clone())?;
            }
            Op::MoveColumn { id, position } => {
                self.grid.move_column(id, position.clone())?;
            }
            Op::SetCell { row, column, value } => {
                self.grid.set_cell(row.as_str(), column.as_str(), value.as_str())?;
            }
        }
        Ok(())
    }
}

impl Default for GridHarness {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::AxisKind;

    fn add_row(id: &str) -> Op {
        Op::AddRow {
            kind: RowKind::Body,
            id: Some(id.to_string()),
            cells: Vec::new(),
            position: None,
        }
    }

    fn add_column(id: &str) -> Op {
        Op::AddColumn {
            id: Some(id.to_string()),
            body_default: Some("-".to_string()),
            position: None,
        }
    }

    #[test]
    fn test_harness_basic_apply() {
        let mut harness = GridHarness::new();
        let ops = vec![add_column("a"), add_row("r1"), add_row("r2")];

        let result = harness.apply_ops(&ops, false);

        assert_eq!(result.applied, 3);
        assert!(result.error.is_none());
        assert_eq!(harness.grid().row_count(), 2);

        let events = harness.events();
        assert_eq!(events.columns_added().len(), 1);
        assert_eq!(events.rows_added().len(), 2);
    }

    #[test]
    fn test_harness_atomic_rollback() {
        let mut harness = GridHarness::new();
        harness.apply_ops(&[add_column("a"), add_row("r1")], false);
        harness.clear_events();
        let before = harness.grid().serialize(true).unwrap();

        let ops = vec![
            add_row("r2"),
            Op::MoveRow {
                id: "r2".to_string(),
                position: Position::First,
            },
            add_row("r1"),
            add_row("never reached"),
        ];
        let result = harness.apply_ops(&ops, true);

        assert_eq!(result.applied, 0);
        assert!(matches!(result.error, Some((2, GridError::DuplicateId { .. }))));
        assert_eq!(harness.grid().serialize(true).unwrap(), before);
        assert!(harness.events().is_empty(), "no events survive a rollback");

        // The restored grid still reports to the harness
        harness.apply_ops(&[add_row("r3")], true);
        assert_eq!(harness.events().rows_added().len(), 1);
    }

    #[test]
    fn test_harness_partial_apply() {
        let mut harness = GridHarness::new();
        let ops = vec![
            add_column("a"),
            add_row("r1"),
            add_row("r2"),
            Op::MoveRow {
                id: "r2".to_string(),
                position: Position::after("missing"),
            },
            add_row("r3"),
        ];

        let result = harness.apply_ops(&ops, false);

        assert_eq!(result.applied, 3);
        assert!(matches!(result.error, Some((3, GridError::InvalidPosition(_)))));
        assert_eq!(harness.grid().row_count(), 2);
        assert!(harness.events().reordered(AxisKind::Row).is_empty());
    }

    #[test]
    fn test_harness_content_and_removal() {
        let mut harness = GridHarness::new();
        let ops = vec![
            add_column("a"),
            add_column("b"),
            add_row("r1"),
            Op::SetCell {
                row: "r1".to_string(),
                column: "b".to_string(),
                value: "v".to_string(),
            },
            Op::MoveColumn {
                id: "b".to_string(),
                position: Position::First,
            },
            Op::RemoveColumn("a".to_string()),
            Op::RemoveRow("r1".to_string()),
        ];

        let result = harness.apply_ops(&ops, true);

        assert_eq!(result.applied, ops.len());
        assert_eq!(harness.grid().column_ids().len(), 1);
        assert_eq!(harness.grid().column_ids()[0], "b");
        assert_eq!(harness.grid().row_count(), 0);
        let events = harness.events();
        assert_eq!(events.columns_removed().len(), 1);
        assert_eq!(events.rows_removed().len(), 1);
        assert_eq!(events.reordered(AxisKind::Column).len(), 1);
    }
}
