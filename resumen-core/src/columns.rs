//! Fixed-width column layouts described as data.
//!
//! A layout is a list of `ColumnSpec`s whose boundaries hang off header labels
//! (or absolute columns) plus a small per-bank nudge. All positions are
//! character indices so accented headers (`Débitos`) do not shift the slices.

/// Which edge of a header label an anchor measures from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Start,
    End,
}

/// A column boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// `offset` characters from one edge of a header label.
    Label {
        label: &'static str,
        edge: Edge,
        offset: isize,
    },
    /// An absolute character column.
    Column(usize),
}

impl Anchor {
    pub const fn start_of(label: &'static str, offset: isize) -> Self {
        Anchor::Label {
            label,
            edge: Edge::Start,
            offset,
        }
    }

    pub const fn end_of(label: &'static str, offset: isize) -> Self {
        Anchor::Label {
            label,
            edge: Edge::End,
            offset,
        }
    }

    fn resolve(&self, header: &str) -> Option<usize> {
        match *self {
            Anchor::Column(col) => Some(col),
            Anchor::Label {
                label,
                edge,
                offset,
            } => {
                let (start, end) = find_label(header, label)?;
                let base = match edge {
                    Edge::Start => start,
                    Edge::End => end,
                };
                Some(base.saturating_add_signed(offset))
            }
        }
    }
}

/// One named field: characters `[start, end)` of each data line. A missing
/// `end` runs to the end of the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub field: &'static str,
    pub start: Anchor,
    pub end: Option<Anchor>,
}

impl ColumnSpec {
    pub const fn new(field: &'static str, start: Anchor, end: Option<Anchor>) -> Self {
        Self { field, start, end }
    }

    /// Absolute `[start, end)` columns.
    pub const fn fixed(field: &'static str, start: usize, end: Option<usize>) -> Self {
        Self {
            field,
            start: Anchor::Column(start),
            end: match end {
                Some(end) => Some(Anchor::Column(end)),
                None => None,
            },
        }
    }
}

/// Column boundaries resolved against one header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout {
    columns: Vec<(&'static str, usize, Option<usize>)>,
}

impl ColumnLayout {
    /// Resolve `specs` against `header`. `None` when any label is missing.
    pub fn locate(header: &str, specs: &[ColumnSpec]) -> Option<Self> {
        let mut columns = Vec::with_capacity(specs.len());
        for spec in specs {
            let start = spec.start.resolve(header)?;
            let end = match &spec.end {
                Some(anchor) => Some(anchor.resolve(header)?),
                None => None,
            };
            columns.push((spec.field, start, end));
        }
        Some(Self { columns })
    }

    /// A layout that needs no header.
    pub fn absolute(specs: &[ColumnSpec]) -> Option<Self> {
        Self::locate("", specs)
    }

    /// Trimmed text of `field` on `line`; empty for unknown fields or when the
    /// line is shorter than the column.
    pub fn slice(&self, line: &str, field: &str) -> String {
        let Some(&(_, start, end)) = self.columns.iter().find(|(name, _, _)| *name == field) else {
            return String::new();
        };
        let len = line.chars().count();
        let end = end.unwrap_or(len).min(len);
        if start >= end {
            return String::new();
        }
        line.chars()
            .skip(start)
            .take(end - start)
            .collect::<String>()
            .trim()
            .to_string()
    }
}

/// Character span of `label` in `header`, bounded on both sides by a
/// non-alphanumeric character (or the line edge).
pub fn find_label(header: &str, label: &str) -> Option<(usize, usize)> {
    for (byte_idx, _) in header.match_indices(label) {
        let before = header[..byte_idx].chars().next_back();
        let after = header[byte_idx + label.len()..].chars().next();
        let bounded = |c: Option<char>| c.is_none_or(|c| !c.is_alphanumeric());
        if bounded(before) && bounded(after) {
            let start = header[..byte_idx].chars().count();
            return Some((start, start + label.chars().count()));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "   Fecha   Conceptos                          Referencias                                Débitos       Créditos              Saldo  ";

    #[test]
    fn test_find_label_uses_character_offsets() {
        assert_eq!(find_label(HEADER, "Fecha"), Some((3, 8)));
        assert_eq!(find_label(HEADER, "Conceptos"), Some((11, 20)));
        assert_eq!(find_label(HEADER, "Débitos"), Some((89, 96)));
        assert_eq!(find_label(HEADER, "Créditos"), Some((103, 111)));
        assert_eq!(find_label(HEADER, "Saldo"), Some((125, 130)));
        assert_eq!(find_label(HEADER, "Monto"), None);
    }

    #[test]
    fn test_find_label_is_word_bounded() {
        assert_eq!(find_label("SALDOS  SALDO", "SALDO"), Some((8, 13)));
        assert_eq!(find_label("SALDOS", "SALDO"), None);
    }

    #[test]
    fn test_locate_and_slice() {
        let specs = [
            ColumnSpec::new(
                "fecha",
                Anchor::start_of("Fecha", -1),
                Some(Anchor::start_of("Conceptos", 0)),
            ),
            ColumnSpec::new(
                "debitos",
                Anchor::start_of("Débitos", -6),
                Some(Anchor::end_of("Débitos", 1)),
            ),
            ColumnSpec::new("saldo", Anchor::start_of("Saldo", -9), None),
        ];
        let layout = ColumnLayout::locate(HEADER, &specs).unwrap();
        let line = "  03/01/23 Impuesto a los debitos - tasa gene 0012745                                        0,89                                   ";
        assert_eq!(layout.slice(line, "fecha"), "03/01/23");
        assert_eq!(layout.slice(line, "debitos"), "0,89");
        assert_eq!(layout.slice(line, "saldo"), "");
        assert_eq!(layout.slice("short", "debitos"), "");
        assert_eq!(layout.slice(line, "nope"), "");
    }

    #[test]
    fn test_locate_missing_label() {
        let specs = [ColumnSpec::new("x", Anchor::start_of("Importe", 0), None)];
        assert!(ColumnLayout::locate(HEADER, &specs).is_none());
    }

    #[test]
    fn test_absolute_layout() {
        let layout = ColumnLayout::absolute(&[
            ColumnSpec::fixed("FECHA", 0, Some(9)),
            ColumnSpec::fixed("SALDO", 12, None),
        ])
        .unwrap();
        assert_eq!(layout.slice("02/05/24 x 1.000,00", "FECHA"), "02/05/24");
        assert_eq!(layout.slice("02/05/24 x 1.000,00", "SALDO"), ".000,00");
    }
}
