//! Structural change notifications.
//!
//! A renderer (or any other consumer) subscribes to a grid and receives one
//! event per structural change, after the change is fully applied. Callbacks
//! get no access to the grid, so they can never observe it mid-mutation.

use crate::identity::{AxisKind, EntityId, RowKind};

/// Events emitted by `Grid` mutations.
#[derive(Debug, Clone, PartialEq)]
pub enum GridEvent {
    RowAdded { id: EntityId, kind: RowKind, position: usize },
    /// `position` is where the row was before removal.
    RowRemoved { id: EntityId, kind: RowKind, position: usize },
    ColumnAdded { id: EntityId, position: usize },
    ColumnRemoved { id: EntityId, position: usize },
    /// An entity changed index through a move, reorder or sort.
    Reordered { axis: AxisKind, id: EntityId, position: usize },
}

/// Callback type for receiving grid events.
pub type EventCallback = Box<dyn FnMut(&GridEvent) + Send>;

/// Token returned by `Grid::subscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

/// Simple event collector for testing.
#[derive(Debug, Default)]
pub struct EventCollector {
    events: Vec<GridEvent>,
}

impl EventCollector {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn push(&mut self, event: GridEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[GridEvent] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Ids of added rows, in event order.
    pub fn rows_added(&self) -> Vec<&EntityId> {
        self.events
            .iter()
            .filter_map(|e| match e {
                GridEvent::RowAdded { id, .. } => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn rows_removed(&self) -> Vec<&EntityId> {
        self.events
            .iter()
            .filter_map(|e| match e {
                GridEvent::RowRemoved { id, .. } => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn columns_added(&self) -> Vec<&EntityId> {
        self.events
            .iter()
            .filter_map(|e| match e {
                GridEvent::ColumnAdded { id, .. } => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn columns_removed(&self) -> Vec<&EntityId> {
        self.events
            .iter()
            .filter_map(|e| match e {
                GridEvent::ColumnRemoved { id, .. } => Some(id),
                _ => None,
            })
            .collect()
    }

    /// `(id, new position)` of reordered entities on `axis`.
    pub fn reordered(&self, axis: AxisKind) -> Vec<(&EntityId, usize)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                GridEvent::Reordered { axis: a, id, position } if *a == axis => Some((id, *position)),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_collector_filtering() {
        let mut collector = EventCollector::new();

        collector.push(GridEvent::ColumnAdded { id: "a".into(), position: 0 });
        collector.push(GridEvent::RowAdded { id: "r1".into(), kind: RowKind::Body, position: 0 });
        collector.push(GridEvent::Reordered { axis: AxisKind::Row, id: "r1".into(), position: 1 });
        collector.push(GridEvent::Reordered { axis: AxisKind::Column, id: "a".into(), position: 2 });
        collector.push(GridEvent::RowRemoved { id: "r1".into(), kind: RowKind::Body, position: 1 });

        assert_eq!(collector.len(), 5);
        assert_eq!(collector.columns_added(), vec![&EntityId::from("a")]);
        assert_eq!(collector.rows_added().len(), 1);
        assert_eq!(collector.rows_removed().len(), 1);
        assert!(collector.columns_removed().is_empty());
        assert_eq!(collector.reordered(AxisKind::Row), vec![(&EntityId::from("r1"), 1)]);

        collector.clear();
        assert!(collector.is_empty());
    }
}
