//! Interface to the rendering layer.
//!
//! The grid calls a `Renderer` to materialize each row, column and cell once
//! when it is attached, to tear it down when it is removed, and to toggle its
//! visibility. Visual transitions run on the renderer's schedule; it reports
//! completion through the optional `Completion` hook.

use crate::content::Cell;
use crate::entity::{Column, Row};
use crate::identity::EntityId;

/// Renderer-assigned handle for a materialized row, column or cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderHandle(pub u64);

/// Invoked by the renderer once a visibility transition has finished.
pub type Completion = Box<dyn FnOnce() + Send>;

/// What is being materialized.
#[derive(Debug, Clone, Copy)]
pub enum RenderTarget<'a> {
    Row(&'a Row),
    Column(&'a Column),
    Cell(&'a Cell),
}

pub trait Renderer: Send {
    fn materialize(&mut self, target: RenderTarget<'_>) -> RenderHandle;

    fn teardown(&mut self, handle: RenderHandle);

    /// Renderers without transitions can keep the default, which completes at once.
    fn set_visible(&mut self, handle: RenderHandle, visible: bool, on_complete: Option<Completion>) {
        let _ = (handle, visible);
        if let Some(done) = on_complete {
            done();
        }
    }
}

/// Key under which the grid remembers a handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum RenderKey {
    Row(EntityId),
    Column(EntityId),
    Cell(EntityId, EntityId),
}
