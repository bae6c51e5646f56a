//! Construction options shared by a grid and the grids nested inside it.

use std::fmt;
use std::sync::Arc;

use crate::content::{DetachedSnapshot, OpaqueHandle};
use crate::identity::{IdSequence, RowKind};

/// Rebuilds opaque content from the snapshot stored in a descriptor.
pub type OpaqueLoader = Arc<dyn Fn(&serde_json::Value) -> OpaqueHandle + Send + Sync>;

/// Grid-wide fallback text for each row kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KindDefaults {
    pub title: String,
    pub body: String,
    pub footer: String,
}

impl KindDefaults {
    pub fn get(&self, kind: RowKind) -> &str {
        match kind {
            RowKind::Title => &self.title,
            RowKind::Body => &self.body,
            RowKind::Footer => &self.footer,
        }
    }
}

#[derive(Clone)]
pub struct GridOptions {
    /// Id counters. Cloned options share them, so nested grids draw from the
    /// same family as their parent.
    pub ids: IdSequence,
    pub row_prefix: String,
    pub column_prefix: String,
    /// Last-resort content when neither the row nor the column supplies one.
    pub defaults: KindDefaults,
    /// When unset, opaque snapshots load as `DetachedSnapshot`.
    pub opaque_loader: Option<OpaqueLoader>,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            ids: IdSequence::new(),
            row_prefix: "_r".to_string(),
            column_prefix: "_c".to_string(),
            defaults: KindDefaults::default(),
            opaque_loader: None,
        }
    }
}

impl fmt::Debug for GridOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridOptions")
            .field("ids", &self.ids)
            .field("row_prefix", &self.row_prefix)
            .field("column_prefix", &self.column_prefix)
            .field("defaults", &self.defaults)
            .field("opaque_loader", &self.opaque_loader.is_some())
            .finish()
    }
}

impl GridOptions {
    pub fn with_ids(mut self, ids: IdSequence) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_prefixes(mut self, row: impl Into<String>, column: impl Into<String>) -> Self {
        self.row_prefix = row.into();
        self.column_prefix = column.into();
        self
    }

    pub fn with_defaults(mut self, defaults: KindDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_opaque_loader<F>(mut self, loader: F) -> Self
    where
        F: Fn(&serde_json::Value) -> OpaqueHandle + Send + Sync + 'static,
    {
        self.opaque_loader = Some(Arc::new(loader));
        self
    }

    pub(crate) fn load_opaque(&self, snapshot: &serde_json::Value) -> OpaqueHandle {
        match &self.opaque_loader {
            Some(load) => load(snapshot),
            None => Arc::new(DetachedSnapshot(snapshot.clone())),
        }
    }
}
