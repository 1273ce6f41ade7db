//! Shapes handed to the parsers by the external extraction step.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One recognised table cell. A cell spanning several rows or columns is
/// replicated once per (row, column) it covers before it reaches the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableCell {
    /// Which table of the document this cell belongs to.
    #[serde(default)]
    pub table_index: u32,
    pub row_id: u32,
    pub column_id: u32,
    /// Reading order of the cell's table; rows are emitted in ascending order.
    #[serde(default)]
    pub table_order: u32,
    pub text: String,
}

impl TableCell {
    pub fn new(row_id: u32, column_id: u32, text: impl Into<String>) -> Self {
        Self {
            table_index: 0,
            row_id,
            column_id,
            table_order: 0,
            text: text.into(),
        }
    }

    pub fn in_table(mut self, table_index: u32, table_order: u32) -> Self {
        self.table_index = table_index;
        self.table_order = table_order;
        self
    }
}

/// A positioned text run from a layout-aware extractor (top-left origin).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFragment {
    pub text: String,
    pub x: f64,
    pub y: f64,
}

/// Everything a parser may be given. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementInput {
    /// One string per extracted page.
    Pages(Vec<String>),
    Cells(Vec<TableCell>),
    Fragments(Vec<TextFragment>),
}

impl StatementInput {
    pub fn pages<I, S>(pages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        StatementInput::Pages(pages.into_iter().map(Into::into).collect())
    }

    pub fn kind(&self) -> InputKind {
        match self {
            StatementInput::Pages(_) => InputKind::PageText,
            StatementInput::Cells(_) => InputKind::TableCells,
            StatementInput::Fragments(_) => InputKind::Fragments,
        }
    }
}

/// Which extraction a bank's parser is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputKind {
    PageText,
    TableCells,
    Fragments,
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InputKind::PageText => "page text",
            InputKind::TableCells => "table cells",
            InputKind::Fragments => "positioned text",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_json_shapes() {
        let pages: StatementInput = serde_json::from_str(r#"{"pages": ["a", "b"]}"#).unwrap();
        assert_eq!(pages.kind(), InputKind::PageText);

        let cells: StatementInput = serde_json::from_str(
            r#"{"cells": [{"row_id": 1, "column_id": 0, "text": "Fecha"}]}"#,
        )
        .unwrap();
        match cells {
            StatementInput::Cells(cells) => {
                assert_eq!(cells[0], TableCell::new(1, 0, "Fecha"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
