use nom_locate::LocatedSpan;

pub type Span<'a> = LocatedSpan<&'a str>;

#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Clone, Copy, Hash)]
pub struct Position {
    pub line: u32,
    pub column: usize,
    /// Byte offset into the source text.
    pub offset: usize,
}

impl Default for Position {
    fn default() -> Self {
        Position {
            line: 1,
            column: 1,
            offset: 0,
        }
    }
}

impl Position {
    pub fn new(line: u32, column: usize, offset: usize) -> Self {
        Position { line, column, offset }
    }
}

#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Clone, Copy, Default, Hash)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Range { start, end }
    }

    /// Smallest range covering both `self` and `other`.
    pub fn merge(&self, other: &Range) -> Range {
        Range {
            start: std::cmp::min(self.start, other.start),
            end: std::cmp::max(self.end, other.end),
        }
    }

    pub fn len(&self) -> usize {
        self.end.offset.saturating_sub(self.start.offset)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, position: &Position) -> bool {
        self.start.offset <= position.offset && position.offset <= self.end.offset
    }
}

impl<'a> From<Span<'a>> for Range {
    fn from(span: Span<'a>) -> Self {
        let fragment = span.fragment();

        Range {
            start: Position {
                line: span.location_line(),
                column: span.get_utf8_column(),
                offset: span.location_offset(),
            },
            end: Position {
                line: span.location_line(),
                column: span.get_utf8_column() + fragment.chars().count(),
                offset: span.location_offset() + fragment.len(),
            },
        }
    }
}

impl<'a> From<Span<'a>> for Position {
    fn from(span: Span<'a>) -> Self {
        Position {
            line: span.location_line(),
            column: span.get_utf8_column(),
            offset: span.location_offset(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::inside(Position::new(1, 3, 2), true)]
    #[case::start(Position::new(1, 1, 0), true)]
    #[case::end(Position::new(1, 5, 4), true)]
    #[case::outside(Position::new(1, 6, 5), false)]
    fn test_contains(#[case] position: Position, #[case] expected: bool) {
        let range = Range::new(Position::new(1, 1, 0), Position::new(1, 5, 4));
        assert_eq!(range.contains(&position), expected);
    }

    #[test]
    fn test_merge() {
        let a = Range::new(Position::new(1, 1, 0), Position::new(1, 3, 2));
        let b = Range::new(Position::new(1, 5, 4), Position::new(1, 8, 7));
        let merged = a.merge(&b);
        assert_eq!(merged.start, a.start);
        assert_eq!(merged.end, b.end);
        assert_eq!(merged.len(), 7);
    }
}
