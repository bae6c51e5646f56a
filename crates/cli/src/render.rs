// Plain-text table renderer for `tgrid render`.
//
// `TextRenderer` materializes every row, column and cell into a text
// fragment; `render_table` lays the fragments out using the grid's handles,
// skipping hidden rows and columns and ruling off the title and footer
// sections.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tabgrid_engine::{Content, Grid, RenderHandle, RenderTarget, Renderer, RowKind};

use crate::error::CliError;

/// Text for one cell's content. Nested grids show their shape, opaque content
/// its snapshot.
pub fn content_text(content: &Content) -> String {
    match content {
        Content::Text(s) => s.clone(),
        Content::Grid(grid) => format!("[grid {}x{}]", grid.row_count(), grid.column_count()),
        Content::Opaque(handle) => {
            let snapshot = handle.snapshot();
            match snapshot.as_str() {
                Some(s) => s.to_string(),
                None => snapshot.to_string(),
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TextRenderer {
    fragments: Arc<Mutex<HashMap<RenderHandle, String>>>,
    next: u64,
}

impl TextRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    fn fragment(&self, handle: Option<RenderHandle>) -> String {
        let Some(handle) = handle else {
            return String::new();
        };
        self.fragments
            .lock()
            .map(|f| f.get(&handle).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    pub fn live_fragments(&self) -> usize {
        self.fragments.lock().map(|f| f.len()).unwrap_or(0)
    }
}

impl Renderer for TextRenderer {
    fn materialize(&mut self, target: RenderTarget<'_>) -> RenderHandle {
        self.next += 1;
        let handle = RenderHandle(self.next);
        let text = match target {
            RenderTarget::Row(row) => row.id().to_string(),
            RenderTarget::Column(column) => column.id().to_string(),
            RenderTarget::Cell(cell) => content_text(cell.content()),
        };
        if let Ok(mut fragments) = self.fragments.lock() {
            fragments.insert(handle, text);
        }
        handle
    }

    fn teardown(&mut self, handle: RenderHandle) {
        if let Ok(mut fragments) = self.fragments.lock() {
            fragments.remove(&handle);
        }
    }
}

/// Render `grid` as an aligned text table. The header line shows column ids;
/// with `row_ids` each line starts with the row id.
pub fn render_table(grid: &mut Grid, row_ids: bool) -> Result<String, CliError> {
    let renderer = TextRenderer::new();
    grid.attach_renderer(Box::new(renderer.clone()))?;

    let columns: Vec<String> = grid
        .columns()
        .filter(|c| c.is_visible())
        .map(|c| c.id().to_string())
        .collect();

    let mut header: Vec<String> = Vec::new();
    if row_ids {
        header.push(String::new());
    }
    header.extend(columns.iter().map(|id| renderer.fragment(grid.column_handle(id))));

    let mut sections: Vec<Vec<Vec<String>>> = Vec::new();
    for kind in RowKind::ALL {
        let mut lines = Vec::new();
        for row in grid.rows_of(kind).filter(|r| r.is_visible()) {
            let id = row.id().as_str();
            let mut line = Vec::new();
            if row_ids {
                line.push(renderer.fragment(grid.row_handle(id)));
            }
            line.extend(columns.iter().map(|c| renderer.fragment(grid.cell_handle(id, c))));
            lines.push(line);
        }
        sections.push(lines);
    }

    grid.detach_renderer();

    let width = header.len();
    let mut widths = vec![0usize; width];
    for line in std::iter::once(&header).chain(sections.iter().flatten()) {
        for (i, text) in line.iter().enumerate() {
            widths[i] = widths[i].max(text.chars().count());
        }
    }

    let format_line = |line: &[String]| -> String {
        let cells: Vec<String> = line
            .iter()
            .enumerate()
            .map(|(i, text)| format!("{:<w$}", text, w = widths[i]))
            .collect();
        format!("| {} |", cells.join(" | "))
    };
    let rule = format!(
        "+{}+",
        widths.iter().map(|w| "-".repeat(w + 2)).collect::<Vec<_>>().join("+")
    );

    let mut out = String::new();
    out.push_str(&rule);
    out.push('\n');
    out.push_str(&format_line(&header));
    out.push('\n');
    out.push_str(&rule);
    out.push('\n');
    for lines in sections.iter().filter(|s| !s.is_empty()) {
        for line in lines {
            out.push_str(&format_line(line));
            out.push('\n');
        }
        out.push_str(&rule);
        out.push('\n');
    }
    Ok(out)
}
