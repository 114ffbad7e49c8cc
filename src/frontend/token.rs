/// Token of a line's instruction text.
///
/// Only the words that can form a control-transfer cue get their own variant.
/// Everything else is an opaque `Word`, `Number`, `String` or `Punct`.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Integer(u64),
    Number(std::string::String),
    String(std::string::String),

    // Control cues
    Goto,
    Go,
    Gosub,
    Jump,
    To,
    Line,
    Call,
    Return,
    If,
    Then,
    On,
    Error,

    /// Any other word, lower-cased.
    Word(std::string::String),

    Punct(char),

    Eof,
}

impl Token {
    /// Recognizes a cue keyword. `word` must already be lower-cased.
    pub fn keyword(word: &str) -> Option<Token> {
        let token = match word {
            "goto" => Token::Goto,
            "go" => Token::Go,
            "gosub" => Token::Gosub,
            "jump" => Token::Jump,
            "to" => Token::To,
            "line" => Token::Line,
            "call" => Token::Call,
            "return" => Token::Return,
            "if" => Token::If,
            "then" => Token::Then,
            "on" => Token::On,
            "error" => Token::Error,
            _ => return None,
        };
        Some(token)
    }

    pub fn is_punct(&self) -> bool {
        matches!(self, Token::Punct(_))
    }

    /// Short kind label used by the line dumper.
    pub fn kind(&self) -> &'static str {
        match self {
            Token::Integer(_) => "int",
            Token::Number(_) => "num",
            Token::String(_) => "str",
            Token::Word(_) => "word",
            Token::Punct(_) => "punct",
            Token::Eof => "eof",
            _ => "cue",
        }
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Integer(n) => write!(f, "{}", n),
            Token::Number(s) => write!(f, "{}", s),
            Token::String(s) => write!(f, "\"{}\"", s),
            Token::Goto => write!(f, "goto"),
            Token::Go => write!(f, "go"),
            Token::Gosub => write!(f, "gosub"),
            Token::Jump => write!(f, "jump"),
            Token::To => write!(f, "to"),
            Token::Line => write!(f, "line"),
            Token::Call => write!(f, "call"),
            Token::Return => write!(f, "return"),
            Token::If => write!(f, "if"),
            Token::Then => write!(f, "then"),
            Token::On => write!(f, "on"),
            Token::Error => write!(f, "error"),
            Token::Word(w) => write!(f, "{}", w),
            Token::Punct(c) => write!(f, "{}", c),
            Token::Eof => write!(f, "<eof>"),
        }
    }
}
