// Renderer integration: materialize once, tear down on removal, visibility hooks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tabgrid_engine::*;

#[derive(Debug, Default)]
struct Log {
    next: u64,
    live: Vec<(RenderHandle, String)>,
    torn_down: Vec<String>,
    visibility: Vec<(String, bool)>,
}

/// Renderer that records what it was asked to do. Visibility transitions
/// complete on `finish_transitions`, like an animated renderer would.
#[derive(Clone, Default)]
struct Recording {
    log: Arc<Mutex<Log>>,
    pending: Arc<Mutex<Vec<Completion>>>,
}

impl Recording {
    fn live(&self) -> Vec<String> {
        let log = self.log.lock().unwrap();
        let mut live: Vec<String> = log.live.iter().map(|(_, name)| name.clone()).collect();
        live.sort();
        live
    }

    fn torn_down(&self) -> Vec<String> {
        let mut gone = self.log.lock().unwrap().torn_down.clone();
        gone.sort();
        gone
    }

    fn finish_transitions(&self) {
        let pending: Vec<Completion> = self.pending.lock().unwrap().drain(..).collect();
        for done in pending {
            done();
        }
    }
}

impl Renderer for Recording {
    fn materialize(&mut self, target: RenderTarget<'_>) -> RenderHandle {
        let name = match target {
            RenderTarget::Row(row) => format!("row:{}", row.id()),
            RenderTarget::Column(column) => format!("col:{}", column.id()),
            RenderTarget::Cell(cell) => format!("cell:{}/{}", cell.row_id(), cell.column_id()),
        };
        let mut log = self.log.lock().unwrap();
        log.next += 1;
        let handle = RenderHandle(log.next);
        log.live.push((handle, name));
        handle
    }

    fn teardown(&mut self, handle: RenderHandle) {
        let mut log = self.log.lock().unwrap();
        if let Some(i) = log.live.iter().position(|(h, _)| *h == handle) {
            let (_, name) = log.live.remove(i);
            log.torn_down.push(name);
        }
    }

    fn set_visible(&mut self, handle: RenderHandle, visible: bool, on_complete: Option<Completion>) {
        let mut log = self.log.lock().unwrap();
        let name = log
            .live
            .iter()
            .find(|(h, _)| *h == handle)
            .map(|(_, name)| name.clone())
            .unwrap_or_default();
        log.visibility.push((name, visible));
        if let Some(done) = on_complete {
            self.pending.lock().unwrap().push(done);
        }
    }
}

fn small_grid() -> Grid {
    let mut grid = Grid::new();
    grid.add_column(ColumnDefinition::new().id("a"), None).unwrap();
    grid.add_row(RowKind::Body, RowDefinition::new().id("r1").cell("a", "x"), None)
        .unwrap();
    grid
}

#[test]
fn test_attach_materializes_everything_once() {
    let mut grid = small_grid();
    let recording = Recording::default();
    grid.attach_renderer(Box::new(recording.clone())).unwrap();

    assert_eq!(recording.live(), vec!["cell:r1/a", "col:a", "row:r1"]);
    assert!(grid.row_handle("r1").is_some());
    assert!(grid.column_handle("a").is_some());
    assert!(grid.cell_handle("r1", "a").is_some());
}

#[test]
fn test_added_entities_materialize_and_removed_tear_down() {
    let mut grid = small_grid();
    let recording = Recording::default();
    grid.attach_renderer(Box::new(recording.clone())).unwrap();

    grid.add_column(ColumnDefinition::new().id("b").cell("r9", "new").generate_missing_rows(true), None)
        .unwrap();
    assert_eq!(
        recording.live(),
        vec!["cell:r1/a", "cell:r1/b", "cell:r9/a", "cell:r9/b", "col:a", "col:b", "row:r1", "row:r9"]
    );

    grid.remove_column("a").unwrap();
    assert_eq!(recording.torn_down(), vec!["cell:r1/a", "cell:r9/a", "col:a"]);

    grid.remove_row("r9").unwrap();
    assert_eq!(recording.live(), vec!["cell:r1/b", "col:b", "row:r1"]);
    assert!(grid.cell_handle("r9", "b").is_none());
}

#[test]
fn test_set_cell_rematerializes_the_cell() {
    let mut grid = small_grid();
    let recording = Recording::default();
    grid.attach_renderer(Box::new(recording.clone())).unwrap();
    let before = grid.cell_handle("r1", "a");

    grid.set_cell("r1", "a", "y").unwrap();

    assert_ne!(grid.cell_handle("r1", "a"), before);
    assert_eq!(recording.torn_down(), vec!["cell:r1/a"]);
    assert_eq!(recording.live().len(), 3);
}

#[test]
fn test_visibility_completion_waits_for_renderer() {
    let mut grid = small_grid();
    let recording = Recording::default();
    grid.attach_renderer(Box::new(recording.clone())).unwrap();

    let done = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&done);
    grid.set_row_visible("r1", false, Some(Box::new(move || flag.store(true, Ordering::SeqCst))))
        .unwrap();

    assert!(!grid.row("r1").unwrap().is_visible());
    assert!(!done.load(Ordering::SeqCst));
    recording.finish_transitions();
    assert!(done.load(Ordering::SeqCst));
    assert_eq!(
        recording.log.lock().unwrap().visibility,
        vec![("row:r1".to_string(), false)]
    );
}

#[test]
fn test_visibility_without_renderer_completes_immediately() {
    let mut grid = small_grid();
    let done = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&done);
    assert!(grid
        .set_column_visible("a", false, Some(Box::new(move || flag.store(true, Ordering::SeqCst))))
        .unwrap());
    assert!(done.load(Ordering::SeqCst));
    assert!(!grid.set_column_visible("missing", true, None).unwrap());
}

#[test]
fn test_destroy_and_detach_tear_everything_down() {
    let mut grid = small_grid();
    let recording = Recording::default();
    grid.attach_renderer(Box::new(recording.clone())).unwrap();
    assert!(grid.detach_renderer().is_some());
    assert!(recording.live().is_empty());

    let second = Recording::default();
    grid.attach_renderer(Box::new(second.clone())).unwrap();
    grid.destroy();
    assert!(second.live().is_empty());
    assert_eq!(second.torn_down().len(), 3);
    assert_eq!(grid.attach_renderer(Box::new(Recording::default())).unwrap_err(), GridError::UseAfterDestroy);
}
