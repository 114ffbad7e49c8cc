use std::collections::HashMap;

use crate::frontend::parser_error::ParseError;
use crate::lang::{Line, LineNumber, Program};
use tracing::debug;

/// Line parser.
///
/// Turns program text into a [`Program`]:
/// - every non-blank, non-comment line starts with a positive line number
/// - an optional `(hint)` directly follows the number
/// - the rest of the line is the instruction text, kept verbatim
///
/// Notes:
/// - Comment lines are unnumbered lines starting with `#` or `'`.
/// - Lines may appear in any order; the program is ordered by number.
pub struct Parser<'a> {
    source: &'a str,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Self {
        Parser { source }
    }

    /// Parses the whole program.
    ///
    /// # Errors
    /// Fails on the first malformed line, on a duplicate line number, or with
    /// `EmptyProgram` if nothing numbered remains.
    pub fn parse(&self) -> Result<Program, ParseError> {
        let mut lines = Vec::new();
        let mut seen: HashMap<LineNumber, usize> = HashMap::new();

        for (i, raw) in self.source.lines().enumerate() {
            let source_line = i + 1;

            let Some(line) = Self::parse_line(source_line, raw)? else {
                continue;
            };

            if let Some(first_source_line) = seen.insert(line.number, source_line) {
                return Err(ParseError::DuplicateLineNumber {
                    number: line.number,
                    source_line,
                    first_source_line,
                });
            }

            lines.push(line);
        }

        if lines.is_empty() {
            return Err(ParseError::EmptyProgram);
        }

        debug!(lines = lines.len(), "program parsed");
        Ok(Program::from_lines(lines))
    }

    /// Parses one source line. Returns `None` for blank and comment lines.
    fn parse_line(source_line: usize, raw: &str) -> Result<Option<Line>, ParseError> {
        let trimmed = raw.trim();

        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('\'') {
            return Ok(None);
        }

        let number_end = trimmed
            .find(|c: char| c.is_whitespace() || c == '(')
            .unwrap_or(trimmed.len());
        let number_text = &trimmed[..number_end];

        if !number_text.starts_with(|c: char| c.is_ascii_digit()) {
            return Err(ParseError::MissingLineNumber { source_line });
        }

        let number = match number_text.parse::<LineNumber>() {
            Ok(n) if n > 0 => n,
            _ => {
                return Err(ParseError::InvalidLineNumber {
                    source_line,
                    text: number_text.to_string(),
                });
            }
        };

        let rest = trimmed[number_end..].trim_start();
        let (task_hint, text) = match rest.strip_prefix('(') {
            Some(after_paren) => {
                let close = after_paren
                    .find(')')
                    .ok_or(ParseError::UnterminatedHint {
                        number,
                        source_line,
                    })?;
                let hint = after_paren[..close].trim().to_lowercase();
                let hint = if hint.is_empty() { None } else { Some(hint) };
                (hint, after_paren[close + 1..].trim())
            }
            None => (None, rest.trim()),
        };

        Ok(Some(Line {
            number,
            task_hint,
            text: text.to_string(),
        }))
    }
}
