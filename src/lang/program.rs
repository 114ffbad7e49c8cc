use super::line::{Line, LineNumber};

/// Parsed line program.
///
/// Lines are kept sorted by number; "program order" everywhere in the crate
/// means this order. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    lines: Vec<Line>,
}

impl Program {
    /// Builds a program from already-validated lines.
    ///
    /// The caller guarantees line numbers are unique; the parser enforces it.
    pub(crate) fn from_lines(mut lines: Vec<Line>) -> Self {
        lines.sort_by_key(|l| l.number);
        Program { lines }
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// First line in program order (the entry point).
    pub fn entry(&self) -> Option<LineNumber> {
        self.lines.first().map(|l| l.number)
    }

    pub fn contains(&self, number: LineNumber) -> bool {
        self.index_of(number).is_some()
    }

    pub fn get(&self, number: LineNumber) -> Option<&Line> {
        self.index_of(number).map(|i| &self.lines[i])
    }

    pub fn index_of(&self, number: LineNumber) -> Option<usize> {
        self.lines.binary_search_by_key(&number, |l| l.number).ok()
    }

    /// Program-order successor of `number`, or `None` at the last line.
    pub fn successor(&self, number: LineNumber) -> Option<LineNumber> {
        let i = self.index_of(number)?;
        self.lines.get(i + 1).map(|l| l.number)
    }

    pub fn numbers(&self) -> impl Iterator<Item = LineNumber> + '_ {
        self.lines.iter().map(|l| l.number)
    }
}
