//! Lexer for embedded code
//!
//! Tokenizes the code captured by a directive. Spans are absolute offsets into
//! the whole template, so a fragment is lexed with the offset where its
//! capture starts. Structural tokens ([`TokenKind::Text`],
//! [`TokenKind::OutputOpen`], [`TokenKind::OutputClose`]) are never produced
//! here; the compiler inserts them between fragments.

use super::ast::Span;

/// A token with its span
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, offset: usize, len: usize) -> Self {
        Self {
            kind,
            span: Span::new(offset.into(), len),
        }
    }
}

/// Token types
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Template structure
    Text(String), // literal template text
    OutputOpen { escape: bool },
    OutputClose,

    // Literals
    Number(f64),
    String(String),
    Ident(String),

    // Keywords
    Var,
    Let,
    Const,
    If,
    Else,
    For,
    Of,
    In,
    While,
    Break,
    Continue,
    Throw,
    New,
    Typeof,
    True,
    False,
    Null,
    Undefined,

    // Punctuation
    LParen,   // (
    RParen,   // )
    LBracket, // [
    RBracket, // ]
    LBrace,   // {
    RBrace,   // }
    Dot,      // .
    Comma,    // ,
    Colon,    // :
    Semi,     // ;
    Question, // ?

    // Operators
    Plus,        // +
    Minus,       // -
    Star,        // *
    Slash,       // /
    Percent,     // %
    Increment,   // ++
    Decrement,   // --
    Assign,      // =
    PlusAssign,  // +=
    MinusAssign, // -=
    StarAssign,  // *=
    SlashAssign, // /=
    Eq,          // ==
    Ne,          // !=
    StrictEq,    // ===
    StrictNe,    // !==
    Lt,          // <
    Le,          // <=
    Gt,          // >
    Ge,          // >=
    AndAnd,      // &&
    OrOr,        // ||
    Bang,        // !

    // Special
    Eof,
    Error(String),
}

impl TokenKind {
    /// Map an identifier to its keyword, if it is one
    pub fn from_ident(s: &str) -> TokenKind {
        match s {
            "var" => TokenKind::Var,
            "let" => TokenKind::Let,
            "const" => TokenKind::Const,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "for" => TokenKind::For,
            "of" => TokenKind::Of,
            "in" => TokenKind::In,
            "while" => TokenKind::While,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "throw" => TokenKind::Throw,
            "new" => TokenKind::New,
            "typeof" => TokenKind::Typeof,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            "undefined" => TokenKind::Undefined,
            _ => TokenKind::Ident(s.to_string()),
        }
    }

    /// Human-readable description for error messages
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Text(_) => "template text".to_string(),
            TokenKind::OutputOpen { .. } => "output directive".to_string(),
            TokenKind::OutputClose => "end of output directive".to_string(),
            TokenKind::Number(n) => format!("number `{n}`"),
            TokenKind::String(s) => format!("string {s:?}"),
            TokenKind::Ident(name) => format!("`{name}`"),
            TokenKind::Eof => "end of template".to_string(),
            TokenKind::Error(message) => message.clone(),
            other => format!("`{}`", other.symbol()),
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            TokenKind::Var => "var",
            TokenKind::Let => "let",
            TokenKind::Const => "const",
            TokenKind::If => "if",
            TokenKind::Else => "else",
            TokenKind::For => "for",
            TokenKind::Of => "of",
            TokenKind::In => "in",
            TokenKind::While => "while",
            TokenKind::Break => "break",
            TokenKind::Continue => "continue",
            TokenKind::Throw => "throw",
            TokenKind::New => "new",
            TokenKind::Typeof => "typeof",
            TokenKind::True => "true",
            TokenKind::False => "false",
            TokenKind::Null => "null",
            TokenKind::Undefined => "undefined",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::Dot => ".",
            TokenKind::Comma => ",",
            TokenKind::Colon => ":",
            TokenKind::Semi => ";",
            TokenKind::Question => "?",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::Increment => "++",
            TokenKind::Decrement => "--",
            TokenKind::Assign => "=",
            TokenKind::PlusAssign => "+=",
            TokenKind::MinusAssign => "-=",
            TokenKind::StarAssign => "*=",
            TokenKind::SlashAssign => "/=",
            TokenKind::Eq => "==",
            TokenKind::Ne => "!=",
            TokenKind::StrictEq => "===",
            TokenKind::StrictNe => "!==",
            TokenKind::Lt => "<",
            TokenKind::Le => "<=",
            TokenKind::Gt => ">",
            TokenKind::Ge => ">=",
            TokenKind::AndAnd => "&&",
            TokenKind::OrOr => "||",
            TokenKind::Bang => "!",
            _ => "?",
        }
    }
}

/// Three- and two-character operators, longest first
const OPERATORS: &[&str] = &[
    "===", "!==", "++", "--", "+=", "-=", "*=", "/=", "==", "!=", "<=", ">=", "&&", "||",
];

fn operator_kind(op: &str) -> TokenKind {
    match op {
        "===" => TokenKind::StrictEq,
        "!==" => TokenKind::StrictNe,
        "++" => TokenKind::Increment,
        "--" => TokenKind::Decrement,
        "+=" => TokenKind::PlusAssign,
        "-=" => TokenKind::MinusAssign,
        "*=" => TokenKind::StarAssign,
        "/=" => TokenKind::SlashAssign,
        "==" => TokenKind::Eq,
        "!=" => TokenKind::Ne,
        "<=" => TokenKind::Le,
        ">=" => TokenKind::Ge,
        "&&" => TokenKind::AndAnd,
        _ => TokenKind::OrOr,
    }
}

/// Lexer over one code fragment
pub struct Lexer<'a> {
    code: &'a str,
    /// Offset of `code` within the template
    base: usize,
    /// Current byte position in `code`
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(code: &'a str, base: usize) -> Self {
        Self { code, base, pos: 0 }
    }

    /// Peek at the next character without consuming
    fn peek(&self) -> Option<char> {
        self.code[self.pos..].chars().next()
    }

    /// Peek at the character after the next one
    fn peek_second(&self) -> Option<char> {
        let mut chars = self.code[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn rest(&self) -> &'a str {
        &self.code[self.pos..]
    }

    /// Advance by one character and return it
    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn token(&self, kind: TokenKind, start: usize) -> Token {
        Token::new(kind, self.base + start, self.pos - start)
    }

    /// Skip whitespace and comments
    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('/') if self.peek_second() == Some('/') => {
                    while let Some(c) = self.advance() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                Some('/') if self.peek_second() == Some('*') => {
                    self.pos += 2;
                    match self.rest().find("*/") {
                        Some(end) => self.pos += end + 2,
                        None => self.pos = self.code.len(),
                    }
                }
                _ => return,
            }
        }
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Token {
        self.skip_trivia();
        let start = self.pos;

        if let Some(op) = OPERATORS.iter().find(|op| self.rest().starts_with(*op)) {
            self.pos += op.len();
            return self.token(operator_kind(op), start);
        }

        let Some(c) = self.peek() else {
            return self.token(TokenKind::Eof, start);
        };

        let kind = match c {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '.' => TokenKind::Dot,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            ';' => TokenKind::Semi,
            '?' => TokenKind::Question,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '=' => TokenKind::Assign,
            '<' => TokenKind::Lt,
            '>' => TokenKind::Gt,
            '!' => TokenKind::Bang,
            '"' | '\'' => return self.lex_string(c),
            '0'..='9' => return self.lex_number(),
            c if c.is_alphabetic() || c == '_' || c == '$' => return self.lex_ident(),
            _ => {
                self.advance();
                return self.token(
                    TokenKind::Error(format!("unexpected character `{c}`")),
                    start,
                );
            }
        };
        self.advance();
        self.token(kind, start)
    }

    /// Lex a string literal
    fn lex_string(&mut self, quote: char) -> Token {
        let start = self.pos;
        self.advance(); // consume opening quote

        let mut value = String::new();

        loop {
            match self.advance() {
                None => {
                    return self.token(TokenKind::Error("unclosed string".to_string()), start);
                }
                Some(c) if c == quote => break,
                Some('\\') => match self.advance() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('r') => value.push('\r'),
                    Some('0') => value.push('\0'),
                    Some(c) => value.push(c),
                    None => {
                        return self.token(TokenKind::Error("unclosed string".to_string()), start);
                    }
                },
                Some(c) => value.push(c),
            }
        }

        self.token(TokenKind::String(value), start)
    }

    /// Lex a number: digits, optional fraction, optional exponent
    fn lex_number(&mut self) -> Token {
        let start = self.pos;

        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        if self.peek() == Some('.') && self.peek_second().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let mark = self.pos;
            self.advance();
            if matches!(self.peek(), Some('+' | '-')) {
                self.advance();
            }
            if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.advance();
                }
            } else {
                self.pos = mark;
            }
        }

        let text = &self.code[start..self.pos];
        match text.parse::<f64>() {
            Ok(value) => self.token(TokenKind::Number(value), start),
            Err(_) => self.token(TokenKind::Error(format!("invalid number `{text}`")), start),
        }
    }

    /// Lex an identifier or keyword
    fn lex_ident(&mut self) -> Token {
        let start = self.pos;

        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' || c == '$' {
                self.advance();
            } else {
                break;
            }
        }

        let kind = TokenKind::from_ident(&self.code[start..self.pos]);
        self.token(kind, start)
    }
}

/// Iterator implementation for convenient use
impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.next_token();
        if matches!(token.kind, TokenKind::Eof) {
            None
        } else {
            Some(token)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(s: &str) -> Vec<TokenKind> {
        Lexer::new(s, 0).map(|t| t.kind).collect()
    }

    #[test]
    fn test_ident() {
        assert_eq!(lex(" name "), vec![TokenKind::Ident("name".to_string())]);
    }

    #[test]
    fn test_for_header() {
        assert_eq!(
            lex("for (var i=0;i<3;i++) {"),
            vec![
                TokenKind::For,
                TokenKind::LParen,
                TokenKind::Var,
                TokenKind::Ident("i".to_string()),
                TokenKind::Assign,
                TokenKind::Number(0.0),
                TokenKind::Semi,
                TokenKind::Ident("i".to_string()),
                TokenKind::Lt,
                TokenKind::Number(3.0),
                TokenKind::Semi,
                TokenKind::Ident("i".to_string()),
                TokenKind::Increment,
                TokenKind::RParen,
                TokenKind::LBrace,
            ]
        );
    }

    #[test]
    fn test_member_call() {
        assert_eq!(
            lex("g.h.p('x')"),
            vec![
                TokenKind::Ident("g".to_string()),
                TokenKind::Dot,
                TokenKind::Ident("h".to_string()),
                TokenKind::Dot,
                TokenKind::Ident("p".to_string()),
                TokenKind::LParen,
                TokenKind::String("x".to_string()),
                TokenKind::RParen,
            ]
        );
    }

    #[test]
    fn test_strict_operators() {
        assert_eq!(
            lex("a === b !== c"),
            vec![
                TokenKind::Ident("a".to_string()),
                TokenKind::StrictEq,
                TokenKind::Ident("b".to_string()),
                TokenKind::StrictNe,
                TokenKind::Ident("c".to_string()),
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            lex(r#"'it\'s' "a\nb""#),
            vec![
                TokenKind::String("it's".to_string()),
                TokenKind::String("a\nb".to_string()),
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            lex("42 3.5 1e3"),
            vec![
                TokenKind::Number(42.0),
                TokenKind::Number(3.5),
                TokenKind::Number(1000.0),
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            lex("a /* note */ + // rest\n b"),
            vec![
                TokenKind::Ident("a".to_string()),
                TokenKind::Plus,
                TokenKind::Ident("b".to_string()),
            ]
        );
    }

    #[test]
    fn test_unclosed_string() {
        assert_eq!(
            lex("'abc"),
            vec![TokenKind::Error("unclosed string".to_string())]
        );
    }

    #[test]
    fn test_spans_are_absolute() {
        let tokens: Vec<Token> = Lexer::new(" name", 10).collect();
        assert_eq!(tokens[0].span.offset(), 11);
        assert_eq!(tokens[0].span.len(), 4);
    }
}
