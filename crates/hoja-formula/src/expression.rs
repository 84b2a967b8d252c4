//! Reference scanning and substitution
//!
//! [`parse_expression`] rewrites a formula's references into the current
//! values of the cells they name, producing a plain arithmetic/function-call
//! string for the evaluator. Alongside it reports every reference with its
//! character offsets in the original input, for highlighting and caret
//! placement in an editor.

use hoja_core::{CellRange, Coord, Sheet};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::number::is_number_literal;

/// Largest range that is expanded into an argument list
///
/// Bigger ranges are left as literal text and rejected by the call-shape check.
pub const MAX_RANGE_CELLS: u64 = 1_000_000;

static REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Z]+)([0-9]+)(?::([A-Z]+)([0-9]+))?").expect("reference regex must compile")
});

static INTERPOLATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&([A-Z]+[0-9]+)").expect("interpolation regex must compile"));

/// A cell or range mentioned in a formula
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Character offset of the first character, counted in the original input
    pub start: usize,
    /// Character offset one past the last character
    pub end: usize,
    /// Reference text (`A1` or `A1:B3`)
    pub text: String,
    /// The cells named by the reference
    pub range: CellRange,
}

impl Reference {
    /// All coordinates covered by this reference, row-major
    pub fn coords(&self) -> Vec<Coord> {
        self.range.cells().collect()
    }

    /// Is the reference a range (as opposed to a single cell)?
    pub fn is_range(&self) -> bool {
        self.text.contains(':')
    }

    /// Does a caret at `offset` sit on this reference?
    ///
    /// Both ends are inclusive, so a caret right after `A1` in `=A1` counts.
    pub fn contains_offset(&self, offset: usize) -> bool {
        self.start <= offset && offset <= self.end
    }
}

/// Find the reference under a caret position
pub fn reference_at(references: &[Reference], caret: usize) -> Option<&Reference> {
    references.iter().find(|r| r.contains_offset(caret))
}

/// Result of [`parse_expression`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedExpression {
    /// The expression with every reference replaced by values
    pub expression: String,
    /// References in order of appearance
    pub references: Vec<Reference>,
    /// Every cell read during substitution, in order, duplicates included
    pub cells: Vec<Coord>,
}

impl ParsedExpression {
    /// Does the substitution read the given cell?
    pub fn touches(&self, coord: Coord) -> bool {
        self.cells.contains(&coord)
    }
}

/// Piece of a scanned formula body
#[derive(Debug)]
enum Segment {
    /// Unchanged text, byte span in the body
    Text(usize, usize),
    /// A quoted literal and the `&ID` interpolations found inside it
    Quoted {
        quote: char,
        span: (usize, usize),
        interpolations: Vec<(usize, usize, Coord)>,
    },
    /// A live reference, byte span in the body
    Reference(usize, usize, CellRange),
}

/// The scanned body of a formula
struct Scan<'a> {
    /// Formula text after the `=`, trimmed, with `;` normalized inside parentheses
    body: String,
    /// The original input
    original: &'a str,
    /// Byte offset of `body` within `original`
    base: usize,
    segments: Vec<Segment>,
}

impl<'a> Scan<'a> {
    fn new(value: &'a str) -> Option<Self> {
        let rest = value.strip_prefix('=')?;
        let trimmed = rest.trim();
        let leading = rest.len() - rest.trim_start().len();
        let body = normalize_separators(trimmed);
        let segments = segment(&body);
        Some(Self {
            body,
            original: value,
            base: 1 + leading,
            segments,
        })
    }

    /// Convert a byte offset in the body into a character offset in the original
    fn char_offset(&self, body_offset: usize) -> usize {
        self.original[..self.base + body_offset].chars().count()
    }

    fn reference(&self, start: usize, end: usize, range: CellRange) -> Reference {
        Reference {
            start: self.char_offset(start),
            end: self.char_offset(end),
            text: self.body[start..end].to_string(),
            range,
        }
    }

    fn references(&self) -> Vec<Reference> {
        let mut references = Vec::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(..) => {}
                Segment::Quoted { interpolations, .. } => {
                    for &(start, end, coord) in interpolations {
                        let mut reference = self.reference(start, end, CellRange::single(coord));
                        reference.text = coord.to_id();
                        references.push(reference);
                    }
                }
                Segment::Reference(start, end, range) => {
                    references.push(self.reference(*start, *end, *range));
                }
            }
        }
        references
    }
}

/// Replace `;` with `,` inside parentheses, leaving quoted text alone
fn normalize_separators(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for c in body.chars() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
                out.push(c);
            }
            None => match c {
                '"' | '\'' if body_has_closing(body, out.len(), c) => {
                    quote = Some(c);
                    out.push(c);
                }
                '(' => {
                    depth += 1;
                    out.push(c);
                }
                ')' => {
                    depth = depth.saturating_sub(1);
                    out.push(c);
                }
                ';' if depth > 0 => out.push(','),
                _ => out.push(c),
            },
        }
    }
    out
}

fn body_has_closing(body: &str, at: usize, quote: char) -> bool {
    body[at + quote.len_utf8()..].contains(quote)
}

/// Split a body into text, quoted literals and references
fn segment(body: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut plain_start = 0;
    let mut pos = 0;

    while let Some(c) = body[pos..].chars().next() {
        if c == '"' || c == '\'' {
            if let Some(close) = body[pos + 1..].find(c) {
                let end = pos + 1 + close + 1;
                scan_plain(body, plain_start, pos, &mut segments);
                segments.push(Segment::Quoted {
                    quote: c,
                    span: (pos, end),
                    interpolations: scan_interpolations(body, pos + 1, end - 1),
                });
                pos = end;
                plain_start = end;
                continue;
            }
        }
        pos += c.len_utf8();
    }
    scan_plain(body, plain_start, body.len(), &mut segments);
    segments
}

fn scan_plain(body: &str, start: usize, end: usize, segments: &mut Vec<Segment>) {
    if start >= end {
        return;
    }
    let text = &body[start..end];
    let mut last = 0;

    for caps in REFERENCE.captures_iter(text) {
        let Some(m) = caps.get(0) else { continue };
        let Some(range) = resolve_reference(&caps) else {
            // Malformed candidates stay literal
            continue;
        };
        if m.start() > last {
            segments.push(Segment::Text(start + last, start + m.start()));
        }
        segments.push(Segment::Reference(start + m.start(), start + m.end(), range));
        last = m.end();
    }
    if last < text.len() {
        segments.push(Segment::Text(start + last, end));
    }
}

fn resolve_reference(caps: &regex::Captures<'_>) -> Option<CellRange> {
    let first = Coord::from_id(&format!("{}{}", &caps[1], &caps[2])).ok()?;
    let second = match (caps.get(3), caps.get(4)) {
        (Some(col), Some(row)) => {
            Coord::from_id(&format!("{}{}", col.as_str(), row.as_str())).ok()?
        }
        _ => first,
    };
    let range = CellRange::new(first, second);
    if range.cell_count() > MAX_RANGE_CELLS {
        tracing::debug!("range {} too large to expand", &caps[0]);
        return None;
    }
    Some(range)
}

fn scan_interpolations(body: &str, start: usize, end: usize) -> Vec<(usize, usize, Coord)> {
    INTERPOLATION
        .captures_iter(&body[start..end])
        .filter_map(|caps| {
            let m = caps.get(0)?;
            let coord = Coord::from_id(&caps[1]).ok()?;
            Some((start + m.start(), start + m.end(), coord))
        })
        .collect()
}

/// Value token for a cell: bare number or double-quoted string
fn value_token(sheet: &Sheet, coord: Coord) -> String {
    let cell = sheet.get(coord);
    let value = cell.display_value();
    if is_number_literal(value) {
        value.to_string()
    } else {
        format!("\"{}\"", value.replace('"', "\"\""))
    }
}

/// Substitute references in a formula with the values they name
///
/// Input that does not start with `=` is returned unchanged with no
/// references. Reference offsets index the original `value`, leading `=` and
/// whitespace included.
///
/// # Example
/// ```rust
/// use hoja_core::{Cell, Coord, Sheet};
/// use hoja_formula::parse_expression;
///
/// let mut sheet = Sheet::new(10, 10);
/// sheet.set(Cell::new(Coord::new(0, 0), "5")).unwrap();
/// sheet.set(Cell::new(Coord::new(1, 0), "ten")).unwrap();
///
/// let parsed = parse_expression("=SUM(A1,B1)", &sheet);
/// assert_eq!(parsed.expression, "SUM(5,\"ten\")");
/// assert_eq!(parsed.references[0].start, 5);
/// assert_eq!(parsed.references[1].text, "B1");
/// ```
pub fn parse_expression(value: &str, sheet: &Sheet) -> ParsedExpression {
    let Some(scan) = Scan::new(value) else {
        return ParsedExpression {
            expression: value.to_string(),
            references: Vec::new(),
            cells: Vec::new(),
        };
    };

    let mut expression = String::with_capacity(scan.body.len());
    let mut cells = Vec::new();

    for segment in &scan.segments {
        match segment {
            Segment::Text(start, end) => expression.push_str(&scan.body[*start..*end]),
            Segment::Quoted {
                quote,
                span,
                interpolations,
            } => {
                let mut last = span.0;
                for &(start, end, coord) in interpolations {
                    expression.push_str(&scan.body[last..start]);
                    let escaped = quote.to_string().repeat(2);
                    let cell = sheet.get(coord);
                    expression.push_str(&cell.display_value().replace(*quote, &escaped));
                    cells.push(coord);
                    last = end;
                }
                expression.push_str(&scan.body[last..span.1]);
            }
            Segment::Reference(_, _, range) => {
                let tokens: Vec<String> = range
                    .cells()
                    .map(|coord| {
                        cells.push(coord);
                        value_token(sheet, coord)
                    })
                    .collect();
                expression.push_str(&tokens.join(","));
            }
        }
    }

    ParsedExpression {
        expression,
        references: scan.references(),
        cells,
    }
}

/// Find the references in a formula without resolving them
///
/// Offsets follow the same rules as [`parse_expression`].
pub fn scan_references(value: &str) -> Vec<Reference> {
    Scan::new(value)
        .map(|scan| scan.references())
        .unwrap_or_default()
}

/// Every cell a formula reads, without duplicates
pub fn referenced_cells(value: &str) -> Vec<Coord> {
    let mut coords: Vec<Coord> = scan_references(value)
        .iter()
        .flat_map(Reference::coords)
        .collect();
    coords.sort();
    coords.dedup();
    coords
}

#[cfg(test)]
mod tests {
    use super::*;
    use hoja_core::Cell;
    use pretty_assertions::assert_eq;

    fn sheet_with(cells: &[(&str, &str)]) -> Sheet {
        let mut sheet = Sheet::new(20, 20);
        for (id, value) in cells {
            let coord = Coord::from_id(id).unwrap();
            sheet.set(Cell::new(coord, *value)).unwrap();
        }
        sheet
    }

    fn spans(refs: &[Reference]) -> Vec<(usize, usize, &str)> {
        refs.iter()
            .map(|r| (r.start, r.end, r.text.as_str()))
            .collect()
    }

    #[test]
    fn test_plain_text_passthrough() {
        let sheet = Sheet::new(5, 5);
        let parsed = parse_expression("hello A1", &sheet);
        assert_eq!(parsed.expression, "hello A1");
        assert!(parsed.references.is_empty());
        assert!(parsed.cells.is_empty());
    }

    #[test]
    fn test_cell_substitution() {
        let sheet = sheet_with(&[("A1", "5"), ("B1", "10")]);
        let parsed = parse_expression("=SUM(A1,B1)", &sheet);
        assert_eq!(parsed.expression, "SUM(5,10)");
        assert_eq!(spans(&parsed.references), vec![(5, 7, "A1"), (8, 10, "B1")]);
        assert_eq!(parsed.cells, vec![Coord::new(0, 0), Coord::new(1, 0)]);
    }

    #[test]
    fn test_computed_value_preferred() {
        let mut sheet = Sheet::new(5, 5);
        let mut cell = Cell::new(Coord::new(0, 0), "=SUM(1,2)");
        cell.computed_value = Some("3".into());
        sheet.set(cell).unwrap();

        let parsed = parse_expression("=A1*2", &sheet);
        assert_eq!(parsed.expression, "3*2");
    }

    #[test]
    fn test_text_and_empty_cells_are_quoted() {
        let sheet = sheet_with(&[("A1", "say \"hi\"")]);
        let parsed = parse_expression("=A1+B1", &sheet);
        assert_eq!(parsed.expression, "\"say \"\"hi\"\"\"+\"\"");
    }

    #[test]
    fn test_range_expansion_is_row_major_and_normalized() {
        let sheet = sheet_with(&[("A1", "1"), ("B1", "2"), ("A2", "3"), ("B2", "4")]);
        let forward = parse_expression("=SUM(A1:B2)", &sheet);
        let backward = parse_expression("=SUM(B2:A1)", &sheet);
        assert_eq!(forward.expression, "SUM(1,2,3,4)");
        assert_eq!(backward.expression, "SUM(1,2,3,4)");
        assert_eq!(spans(&forward.references), vec![(5, 10, "A1:B2")]);
        assert_eq!(forward.cells.len(), 4);
    }

    #[test]
    fn test_degenerate_range() {
        let sheet = sheet_with(&[("C3", "7")]);
        let parsed = parse_expression("=SUM(C3:C3)", &sheet);
        assert_eq!(parsed.expression, "SUM(7)");
        assert_eq!(parsed.references[0].coords(), vec![Coord::new(2, 2)]);
    }

    #[test]
    fn test_offsets_with_leading_whitespace() {
        let sheet = Sheet::new(5, 5);
        let parsed = parse_expression("=  A1 + B2", &sheet);
        assert_eq!(spans(&parsed.references), vec![(3, 5, "A1"), (8, 10, "B2")]);
    }

    #[test]
    fn test_quoted_text_is_protected() {
        let sheet = sheet_with(&[("A1", "5")]);
        let parsed = parse_expression("=COUNT(\"A1\",'B2',A1)", &sheet);
        assert_eq!(parsed.expression, "COUNT(\"A1\",'B2',5)");
        assert_eq!(spans(&parsed.references), vec![(17, 19, "A1")]);
    }

    #[test]
    fn test_interpolation_inside_quotes() {
        let sheet = sheet_with(&[("A1", "42")]);
        let parsed = parse_expression("=COUNT(\"Total: &A1\")", &sheet);
        assert_eq!(parsed.expression, "COUNT(\"Total: 42\")");
        assert_eq!(spans(&parsed.references), vec![(15, 18, "A1")]);
        assert_eq!(parsed.cells, vec![Coord::new(0, 0)]);
    }

    #[test]
    fn test_semicolon_separators() {
        let sheet = sheet_with(&[("A1", "1"), ("A2", "2")]);
        let parsed = parse_expression("=SUM(A1;A2)", &sheet);
        assert_eq!(parsed.expression, "SUM(1,2)");
        assert_eq!(spans(&parsed.references), vec![(5, 7, "A1"), (8, 10, "A2")]);

        let outside = parse_expression("=A1;A2", &sheet);
        assert_eq!(outside.expression, "1;2");
    }

    #[test]
    fn test_malformed_candidates_stay_literal() {
        let sheet = Sheet::new(5, 5);
        let parsed = parse_expression("=SUM(A0,B1:C0)", &sheet);
        assert_eq!(parsed.expression, "SUM(A0,B1:C0)");
        assert!(parsed.references.is_empty());
    }

    #[test]
    fn test_oversized_range_stays_literal() {
        let sheet = Sheet::new(5, 5);
        let parsed = parse_expression("=SUM(A1:ZZ99999)", &sheet);
        assert_eq!(parsed.expression, "SUM(A1:ZZ99999)");
        assert!(parsed.cells.is_empty());
    }

    #[test]
    fn test_out_of_bounds_reference_reads_empty() {
        let sheet = Sheet::new(2, 2);
        let parsed = parse_expression("=Z99", &sheet);
        assert_eq!(parsed.expression, "\"\"");
        assert_eq!(parsed.references.len(), 1);
    }

    #[test]
    fn test_scan_references_and_caret() {
        let refs = scan_references("=SUM(A1:B2, C3)");
        assert_eq!(spans(&refs), vec![(5, 10, "A1:B2"), (12, 14, "C3")]);
        assert!(refs[0].is_range());

        assert_eq!(reference_at(&refs, 7).map(|r| r.text.as_str()), Some("A1:B2"));
        assert_eq!(reference_at(&refs, 14).map(|r| r.text.as_str()), Some("C3"));
        assert!(reference_at(&refs, 11).is_none());
        assert!(scan_references("A1").is_empty());
    }

    #[test]
    fn test_referenced_cells() {
        let coords = referenced_cells("=SUM(A1:A2)+A1");
        assert_eq!(coords, vec![Coord::new(0, 0), Coord::new(0, 1)]);
    }
}
