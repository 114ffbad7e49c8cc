//! Control-transfer classifier.
//!
//! Finds the structural cues in a line's instruction text and assigns the
//! line exactly one [`ControlShape`] plus an optional error-handler update.
//! Recognized cues (case-insensitive, quoted strings ignored):
//!
//! | cue                                  | result                      |
//! |--------------------------------------|-----------------------------|
//! | `goto <n>`, `go to <n>`              | `UnconditionalJump`         |
//! | `jump to [line] <n>`                 | `UnconditionalJump`         |
//! | `if <cond> [then] goto <n>`          | `ConditionalJump`           |
//! | `call <n>`, `gosub <n>`              | `Call`                      |
//! | `return` (the whole instruction)     | `Return`                    |
//! | `on error goto <n>`                  | `error_handler_update`      |
//!
//! A keyword not followed by a literal integer is plain natural language.

use crate::analysis::cfg::EdgeKind;
use crate::analysis::diagnostics::ValidationError;
use crate::frontend::lexer::{Lexer, Spanned};
use crate::frontend::token::Token;
use crate::lang::{ClassifiedLine, ControlShape, Line, LineNumber, Program};
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
enum Cue {
    Jump { target: u64, keyword: usize },
    Call { target: u64 },
    Return,
    ErrorHandler { target: u64 },
}

impl Cue {
    fn label(&self) -> &'static str {
        match self {
            Cue::Jump { .. } => "goto",
            Cue::Call { .. } => "call",
            Cue::Return => "return",
            Cue::ErrorHandler { .. } => "on error goto",
        }
    }
}

/// Classifies every line, collecting all errors rather than stopping at the
/// first one.
pub fn classify_program(program: &Program) -> Result<Vec<ClassifiedLine>, Vec<ValidationError>> {
    let (classified, errors) = classify_all(program);

    if errors.is_empty() {
        Ok(classified)
    } else {
        Err(errors)
    }
}

/// Classifies every line and keeps going past bad ones.
///
/// A line that fails classification is returned as plain fallthrough so
/// later passes can still check the rest of the program.
pub fn classify_all(program: &Program) -> (Vec<ClassifiedLine>, Vec<ValidationError>) {
    let mut classified = Vec::with_capacity(program.len());
    let mut errors = Vec::new();

    for line in program.lines() {
        match classify_line(line) {
            Ok(c) => classified.push(c),
            Err(mut e) => {
                errors.append(&mut e);
                classified.push(ClassifiedLine::fallthrough(line.number));
            }
        }
    }

    (classified, errors)
}

/// Classifies a single line.
pub fn classify_line(line: &Line) -> Result<ClassifiedLine, Vec<ValidationError>> {
    let mut lexer = Lexer::new(&line.text);
    let tokens: Vec<Spanned> = lexer
        .tokenize()
        .into_iter()
        .filter(|t| t.token != Token::Eof)
        .collect();

    let cues = scan_cues(&tokens);

    let (handlers, primaries): (Vec<&Cue>, Vec<&Cue>) = cues
        .iter()
        .partition(|c| matches!(c, Cue::ErrorHandler { .. }));

    if handlers.len() + primaries.len() > 1 {
        return Err(vec![ValidationError::AmbiguousControl {
            line: line.number,
            cues: cues.iter().map(|c| c.label().to_string()).collect(),
        }]);
    }

    let mut classified = ClassifiedLine::fallthrough(line.number);

    if let Some(Cue::ErrorHandler { target }) = handlers.first() {
        classified.error_handler_update =
            Some(line_target(line.number, *target, EdgeKind::ErrorHandler)?);
    }

    if let Some(cue) = primaries.first() {
        classified.shape = match cue {
            Cue::Jump { target, keyword } => {
                match conditional_predicate(&lexer, &tokens, *keyword) {
                    Some(predicate) => ControlShape::ConditionalJump {
                        target: line_target(line.number, *target, EdgeKind::ConditionalJump)?,
                        predicate,
                    },
                    None => ControlShape::UnconditionalJump {
                        target: line_target(line.number, *target, EdgeKind::Jump)?,
                    },
                }
            }
            Cue::Call { target } => ControlShape::Call {
                target: line_target(line.number, *target, EdgeKind::Call)?,
            },
            Cue::Return => ControlShape::Return,
            Cue::ErrorHandler { .. } => ControlShape::Fallthrough,
        };
    }

    if classified.shape != ControlShape::Fallthrough || classified.error_handler_update.is_some()
    {
        debug!(line = line.number, shape = %classified.shape, handler = ?classified.error_handler_update, "control cue found");
    }

    Ok(classified)
}

fn line_target(line: LineNumber, target: u64, kind: EdgeKind) -> Result<LineNumber, Vec<ValidationError>> {
    LineNumber::try_from(target).map_err(|_| {
        vec![ValidationError::TargetOutOfRange {
            line,
            target,
            kind,
        }]
    })
}

/// Collects every cue in token order.
fn scan_cues(tokens: &[Spanned]) -> Vec<Cue> {
    let mut cues = Vec::new();
    let mut i = 0;

    while i < tokens.len() {
        match &tokens[i].token {
            Token::On if token_at(tokens, i + 1) == Some(&Token::Error) => {
                if let Some((target, next)) = jump_phrase(tokens, i + 2) {
                    cues.push(Cue::ErrorHandler { target });
                    i = next;
                    continue;
                }
            }
            Token::Goto | Token::Go | Token::Jump => {
                if let Some((target, next)) = jump_phrase(tokens, i) {
                    cues.push(Cue::Jump { target, keyword: i });
                    i = next;
                    continue;
                }
            }
            Token::Call | Token::Gosub => {
                if let Some(Token::Integer(target)) = token_at(tokens, i + 1) {
                    cues.push(Cue::Call { target: *target });
                    i += 2;
                    continue;
                }
            }
            Token::Return if is_bare_return(tokens) => {
                cues.push(Cue::Return);
            }
            _ => {}
        }
        i += 1;
    }

    cues
}

fn token_at(tokens: &[Spanned], i: usize) -> Option<&Token> {
    tokens.get(i).map(|s| &s.token)
}

/// Matches `goto <n>`, `go to <n>` or `jump to [line] <n>` starting at `i`.
///
/// Returns the target and the index just past the phrase.
fn jump_phrase(tokens: &[Spanned], i: usize) -> Option<(u64, usize)> {
    let mut j = match token_at(tokens, i)? {
        Token::Goto => i + 1,
        Token::Go | Token::Jump if token_at(tokens, i + 1) == Some(&Token::To) => i + 2,
        _ => return None,
    };

    if token_at(tokens, i) == Some(&Token::Jump) && token_at(tokens, j) == Some(&Token::Line) {
        j += 1;
    }

    match token_at(tokens, j)? {
        Token::Integer(target) => Some((*target, j + 1)),
        _ => None,
    }
}

/// `return` counts only when it is the whole instruction.
fn is_bare_return(tokens: &[Spanned]) -> bool {
    let mut words = tokens.iter().filter(|t| !t.token.is_punct());
    matches!(
        (words.next().map(|t| &t.token), words.next()),
        (Some(Token::Return), None)
    )
}

/// Extracts the verbatim predicate of `if <cond> [then] goto <n>`.
///
/// Returns `None` when no `if` precedes the jump keyword within its clause.
fn conditional_predicate(lexer: &Lexer, tokens: &[Spanned], keyword: usize) -> Option<String> {
    // the `if` must sit in the same clause as the jump
    let back = tokens[..keyword]
        .iter()
        .rev()
        .take_while(|t| !matches!(t.token, Token::Punct('.' | ';' | '!' | '?')))
        .position(|t| t.token == Token::If)?;
    let if_index = keyword - 1 - back;

    let mut end = keyword;
    while end > if_index + 1 {
        match &tokens[end - 1].token {
            Token::Then | Token::Punct(',' | ':') => end -= 1,
            _ => break,
        }
    }

    let predicate = lexer.slice(tokens[if_index].span.end, tokens[end].span.start);
    Some(predicate)
}
