// SPDX-License-Identifier: Apache-2.0

//! Aligned columns for text output.

use std::fmt::Write;

/// Collects rows and pads every column to its widest cell.
pub struct TablePrinter {
    column_widths: Vec<usize>,
    rows: Vec<Vec<String>>,
}

impl TablePrinter {
    /// Creates a printer for `column_count` columns.
    pub fn new(column_count: usize) -> Self {
        Self {
            column_widths: vec![0; column_count],
            rows: Vec::new(),
        }
    }

    /// Adds a row; cells past the column count are printed unpadded.
    pub fn add_row(&mut self, cells: &[&str]) {
        for (width, cell) in self.column_widths.iter_mut().zip(cells) {
            *width = (*width).max(cell.chars().count());
        }
        self.rows
            .push(cells.iter().map(ToString::to_string).collect());
    }

    /// Renders rows with `indent` spaces in front and two spaces between columns.
    pub fn render(&self, indent: usize) -> String {
        let mut output = String::new();

        for row in &self.rows {
            output.push_str(&" ".repeat(indent));
            let last = row.len().saturating_sub(1);
            for (i, cell) in row.iter().enumerate() {
                match self.column_widths.get(i) {
                    Some(&width) if i < last => {
                        let _ = write!(output, "{cell:<width$}  ");
                    }
                    _ => output.push_str(cell),
                }
            }
            output.push('\n');
        }

        output
    }
}
