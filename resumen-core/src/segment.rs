//! Line and table segmentation shared by the bank parsers.

use std::collections::{BTreeMap, HashMap};

use crate::input::{TableCell, TextFragment};

/// Default vertical distance under which two fragments share a line.
pub const DEFAULT_LINE_THRESHOLD: f64 = 10.0;

/// Flatten pages into trimmed, non-empty lines, dropping pure separator rules.
pub fn page_lines(pages: &[String]) -> Vec<String> {
    pages
        .iter()
        .flat_map(|page| page.lines())
        .map(str::trim)
        .filter(|line| !line.is_empty() && !is_separator_line(line))
        .map(str::to_string)
        .collect()
}

/// Flatten pages into lines keeping leading whitespace.
///
/// Fixed-width layouts slice by character column, so indentation matters.
pub fn raw_page_lines(pages: &[String]) -> Vec<String> {
    pages
        .iter()
        .flat_map(|page| page.split('\n'))
        .map(|line| line.trim_end().to_string())
        .collect()
}

/// A run of `_` or `-` used as a horizontal rule.
pub fn is_separator_line(line: &str) -> bool {
    let line = line.trim();
    line.chars().count() >= 3 && line.chars().all(|c| c == '-' || c == '_')
}

/// One logical table row, keyed by column id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableRow {
    pub table_order: u32,
    pub cells: BTreeMap<u32, String>,
}

impl TableRow {
    /// Text of a column, if the row has a cell there.
    pub fn col(&self, column_id: u32) -> Option<&str> {
        self.cells.get(&column_id).map(String::as_str)
    }

    /// Text of a column, empty when absent.
    pub fn text(&self, column_id: u32) -> &str {
        self.col(column_id).unwrap_or("")
    }

    pub fn is_blank(&self) -> bool {
        self.cells.values().all(|t| t.trim().is_empty())
    }
}

/// Group cells into rows by `(table_index, row_id)`.
///
/// Rows keep their first-appearance order within a table and are then stably
/// ordered by `table_order`.
pub fn group_table_rows(cells: &[TableCell]) -> Vec<TableRow> {
    let mut index: HashMap<(u32, u32), usize> = HashMap::new();
    let mut rows: Vec<TableRow> = Vec::new();

    for cell in cells {
        let key = (cell.table_index, cell.row_id);
        let slot = *index.entry(key).or_insert_with(|| {
            rows.push(TableRow {
                table_order: cell.table_order,
                cells: BTreeMap::new(),
            });
            rows.len() - 1
        });
        rows[slot]
            .cells
            .insert(cell.column_id, cell.text.trim().to_string());
    }

    rows.sort_by_key(|row| row.table_order);
    rows
}

/// Rebuild text lines from positioned fragments.
///
/// Fragments are sorted top to bottom then left to right; a fragment joins the
/// current line while its `y` stays within `y_threshold` of the line's first
/// fragment. Each line is ordered by `x` and joined with single spaces.
pub fn lines_from_fragments(fragments: &[TextFragment], y_threshold: f64) -> Vec<String> {
    let mut sorted: Vec<&TextFragment> = fragments
        .iter()
        .filter(|f| !f.text.trim().is_empty())
        .collect();
    sorted.sort_by(|a, b| a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x)));

    let mut lines: Vec<Vec<&TextFragment>> = Vec::new();
    let mut line_y: Option<f64> = None;
    for fragment in sorted {
        match (line_y, lines.last_mut()) {
            (Some(y), Some(line)) if (fragment.y - y).abs() <= y_threshold => line.push(fragment),
            _ => {
                line_y = Some(fragment.y);
                lines.push(vec![fragment]);
            }
        }
    }

    lines
        .into_iter()
        .map(|mut line| {
            line.sort_by(|a, b| a.x.total_cmp(&b.x));
            line.iter()
                .map(|f| f.text.trim())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_lines_drops_blanks_and_rules() {
        let pages = vec![
            "  SALDO ANTERIOR  \n\n------------\n".to_string(),
            "____\n03/01/23 Impuesto\n".to_string(),
        ];
        assert_eq!(page_lines(&pages), vec!["SALDO ANTERIOR", "03/01/23 Impuesto"]);
    }

    #[test]
    fn test_raw_lines_keep_indentation() {
        let pages = vec!["  31/12/22   Saldo   \r\nx".to_string()];
        assert_eq!(raw_page_lines(&pages), vec!["  31/12/22   Saldo", "x"]);
    }

    #[test]
    fn test_separator_detection() {
        assert!(is_separator_line("  -------  "));
        assert!(is_separator_line("___"));
        assert!(!is_separator_line("-"));
        assert!(!is_separator_line("- SALDO FINAL"));
    }

    #[test]
    fn test_group_table_rows() {
        let cells = vec![
            TableCell::new(0, 1, "Descripción").in_table(1, 5),
            TableCell::new(0, 0, "Fecha").in_table(1, 5),
            TableCell::new(3, 0, "01/01/24").in_table(0, 2),
            TableCell::new(3, 1, " Pago ").in_table(0, 2),
            TableCell::new(4, 1, "más texto").in_table(0, 2),
        ];
        let rows = group_table_rows(&cells);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].col(0), Some("01/01/24"));
        assert_eq!(rows[0].text(1), "Pago");
        assert_eq!(rows[1].col(0), None);
        assert_eq!(rows[2].col(0), Some("Fecha"));
        assert_eq!(rows[2].col(1), Some("Descripción"));
    }

    #[test]
    fn test_lines_from_fragments() {
        let frag = |text: &str, x: f64, y: f64| TextFragment {
            text: text.to_string(),
            x,
            y,
        };
        let fragments = vec![
            frag("1.000,00", 400.0, 101.0),
            frag("05/01/2024", 10.0, 100.0),
            frag("COMPRA", 80.0, 104.0),
            frag("SALDO FINAL AL DIA", 10.0, 130.0),
            frag(" ", 50.0, 130.0),
        ];
        assert_eq!(
            lines_from_fragments(&fragments, DEFAULT_LINE_THRESHOLD),
            vec!["05/01/2024 COMPRA 1.000,00", "SALDO FINAL AL DIA"]
        );
    }
}
