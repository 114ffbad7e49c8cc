use crate::frontend::token::Token;

/// Position of a token inside one line's instruction text.
///
/// `col` is 1-based for diagnostics. `start..end` are char offsets, used to
/// slice verbatim text (e.g. a conditional predicate) back out of the line.
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub col: usize,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub span: Span,
}

/// Lexer for the instruction text of a single line.
///
/// The text is natural language, so the lexer never fails: an unterminated
/// string runs to the end of the line and unknown characters become `Punct`.
pub struct Lexer {
    source: Vec<char>,
    pos: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer {
            source: source.chars().collect(),
            pos: 0,
        }
    }

    fn current(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.current();
        self.pos += 1;
        ch
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_string(&mut self) -> Token {
        self.advance();

        let mut string = String::new();
        while let Some(ch) = self.current() {
            self.advance();
            match ch {
                '"' => break,
                '\\' => {
                    if let Some(escaped) = self.advance() {
                        string.push(escaped);
                    }
                }
                _ => string.push(ch),
            }
        }
        Token::String(string)
    }

    fn read_number(&mut self) -> Token {
        let mut digits = String::new();
        let mut has_dot = false;

        while let Some(ch) = self.current() {
            if ch.is_ascii_digit() {
                digits.push(ch);
                self.advance();
            } else if ch == '.' && !has_dot {
                // `40.` ends a sentence; `4.5` is a decimal
                if self.peek().map(|c| c.is_ascii_digit()).unwrap_or(false) {
                    has_dot = true;
                    digits.push('.');
                    self.advance();
                } else {
                    break;
                }
            } else {
                break;
            }
        }

        // `10th`, `3x`: digits glued to letters are a word, not a target
        if self.current().map(|c| c.is_alphabetic()).unwrap_or(false) {
            while let Some(ch) = self.current() {
                if ch.is_alphanumeric() || ch == '_' {
                    digits.push(ch);
                    self.advance();
                } else {
                    break;
                }
            }
            return Token::Word(digits.to_lowercase());
        }

        if has_dot {
            return Token::Number(digits);
        }

        match digits.parse::<u64>() {
            Ok(value) => Token::Integer(value),
            Err(_) => Token::Number(digits),
        }
    }

    fn read_word(&mut self) -> Token {
        let mut word = String::new();
        while let Some(ch) = self.current() {
            if ch.is_alphanumeric() || ch == '_' {
                word.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        let word = word.to_lowercase();
        Token::keyword(&word).unwrap_or(Token::Word(word))
    }

    pub fn tokenize(&mut self) -> Vec<Spanned> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace();
            let start = self.pos;

            let token = match self.current() {
                None => {
                    tokens.push(Spanned {
                        token: Token::Eof,
                        span: Span {
                            col: start + 1,
                            start,
                            end: start,
                        },
                    });
                    break;
                }
                Some('"') => self.read_string(),
                Some(ch) if ch.is_ascii_digit() => self.read_number(),
                Some(ch) if ch.is_alphabetic() || ch == '_' => self.read_word(),
                Some(ch) => {
                    self.advance();
                    Token::Punct(ch)
                }
            };

            tokens.push(Spanned {
                token,
                span: Span {
                    col: start + 1,
                    start,
                    end: self.pos,
                },
            });
        }

        tokens
    }

    /// Verbatim source text between two char offsets, trimmed.
    pub fn slice(&self, start: usize, end: usize) -> String {
        let end = end.min(self.source.len());
        let start = start.min(end);
        self.source[start..end]
            .iter()
            .collect::<String>()
            .trim()
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(source: &str) -> Vec<Token> {
        Lexer::new(source)
            .tokenize()
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        assert_eq!(
            tokens("GoTo 40"),
            vec![Token::Goto, Token::Integer(40), Token::Eof]
        );
    }

    #[test]
    fn test_words_are_lowercased() {
        assert_eq!(
            tokens("Print Here"),
            vec![
                Token::Word("print".to_string()),
                Token::Word("here".to_string()),
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_string_is_opaque() {
        assert_eq!(
            tokens(r#"print "goto 40""#),
            vec![
                Token::Word("print".to_string()),
                Token::String("goto 40".to_string()),
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_unterminated_string_runs_to_end() {
        assert_eq!(
            tokens(r#"say "hello there"#),
            vec![
                Token::Word("say".to_string()),
                Token::String("hello there".to_string()),
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_sentence_period_after_integer() {
        assert_eq!(
            tokens("goto 40."),
            vec![Token::Goto, Token::Integer(40), Token::Punct('.'), Token::Eof]
        );
    }

    #[test]
    fn test_decimal_is_not_an_integer() {
        assert_eq!(
            tokens("wait 1.5"),
            vec![
                Token::Word("wait".to_string()),
                Token::Number("1.5".to_string()),
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_digits_glued_to_letters_form_a_word() {
        assert_eq!(
            tokens("goto 10th"),
            vec![Token::Goto, Token::Word("10th".to_string()), Token::Eof]
        );
    }

    #[test]
    fn test_spans_and_slice() {
        let mut lexer = Lexer::new("if x > 3 then goto 9");
        let spanned = lexer.tokenize();

        assert_eq!(spanned[0].span.col, 1);
        assert_eq!(spanned[1].span.col, 4);

        let predicate = lexer.slice(spanned[0].span.end, spanned[4].span.start);
        assert_eq!(predicate, "x > 3");
    }
}
