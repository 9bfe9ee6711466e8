//! Browser filter columns
//!
//! The host's preset browser exposes a handful of filter columns (category,
//! creator, tags, ...). Surfaces step a cursor across the columns and through
//! the items of each column. The column cursor is clamped to the last column,
//! so the selected index is always valid while columns exist.

use crate::display::TextGrid;

/// One filter column with its item cursor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterColumn {
    name: String,
    items: Vec<String>,
    cursor: usize,
}

impl FilterColumn {
    pub fn new(name: impl Into<String>, items: Vec<String>) -> Self {
        Self {
            name: name.into(),
            items,
            cursor: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn selected_item(&self) -> Option<&str> {
        self.items.get(self.cursor).map(String::as_str)
    }

    pub fn select_next_item(&mut self) {
        if self.cursor + 1 < self.items.len() {
            self.cursor += 1;
        }
    }

    pub fn select_previous_item(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    /// Move the cursor by a page of `page_size` items
    pub fn scroll_page(&mut self, page_size: usize, forward: bool) {
        let last = self.items.len().saturating_sub(1);
        self.cursor = if forward {
            (self.cursor + page_size).min(last)
        } else {
            self.cursor.saturating_sub(page_size)
        };
    }

    pub fn set_cursor(&mut self, index: usize) {
        self.cursor = index.min(self.items.len().saturating_sub(1));
    }

    /// Back to the first entry ("all")
    pub fn reset(&mut self) {
        self.cursor = 0;
    }
}

/// Column and content-type cursors of a browser session
#[derive(Debug, Clone, Default)]
pub struct FilterCursor {
    columns: Vec<FilterColumn>,
    selected: usize,
    content_types: Vec<String>,
    content_type: usize,
}

impl FilterCursor {
    pub fn new(columns: Vec<FilterColumn>) -> Self {
        Self {
            columns,
            ..Default::default()
        }
    }

    pub fn with_content_types(mut self, names: Vec<String>) -> Self {
        self.content_types = names;
        self.content_type = 0;
        self
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(FilterColumn::name).collect()
    }

    pub fn column(&self, index: usize) -> Option<&FilterColumn> {
        self.columns.get(index)
    }

    pub fn column_mut(&mut self, index: usize) -> Option<&mut FilterColumn> {
        self.columns.get_mut(index)
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    /// None only when there are no columns
    pub fn selected_column(&self) -> Option<&FilterColumn> {
        self.columns.get(self.selected)
    }

    pub fn selected_column_mut(&mut self) -> Option<&mut FilterColumn> {
        self.columns.get_mut(self.selected)
    }

    pub fn select_previous_filter_column(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// Advance, stopping at the last column
    pub fn select_next_filter_column(&mut self) {
        if self.selected + 1 < self.columns.len() {
            self.selected += 1;
        }
    }

    pub fn reset_filter_column(&mut self, index: usize) {
        if let Some(column) = self.columns.get_mut(index) {
            column.reset();
        }
    }

    pub fn has_previous_content_type(&self) -> bool {
        self.content_type > 0
    }

    pub fn has_next_content_type(&self) -> bool {
        self.content_type + 1 < self.content_types.len()
    }

    pub fn select_previous_content_type(&mut self) {
        if self.has_previous_content_type() {
            self.content_type -= 1;
        }
    }

    pub fn select_next_content_type(&mut self) {
        if self.has_next_content_type() {
            self.content_type += 1;
        }
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_types.get(self.content_type).map(String::as_str)
    }

    /// Column names on `row`, selected items on `row + 1`; the selected
    /// column is marked with `>`
    pub fn render(&self, grid: &mut TextGrid, row: usize) {
        grid.clear_row(row).clear_row(row + 1);
        for (i, column) in self.columns.iter().enumerate() {
            let name = if i == self.selected {
                format!(">{}", column.name())
            } else {
                column.name().to_string()
            };
            grid.set_cell(row, i, &name)
                .set_cell(row + 1, i, column.selected_item().unwrap_or(""));
        }
    }
}
