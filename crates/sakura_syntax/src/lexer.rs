//! Byte-walking scanner producing the flat token stream.
//!
//! The lexer elides whitespace and `//` line comments, strips quotes from
//! string literals, resolves escape sequences, and tracks 1-based line and
//! column for every token. The stream always ends with exactly one `Eof`
//! token.
//!
//! Lexical failures never abort the scan: an unterminated string or an
//! unexpected byte becomes an [`TokenKind::Unknown`] token whose lexeme
//! carries the detail ("Unclosed string literal", ...). The parser surfaces
//! those as lex errors when it tries to consume them.

use crate::token::{Token, TokenKind};

pub struct Lexer<'s> {
    bytes: &'s [u8],
    pos: usize,
    line: u32,
    column: u32,
}

impl<'s> Lexer<'s> {
    pub fn new(source: &'s str) -> Self {
        Self {
            bytes: source.as_bytes(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    /// Scans the whole input. The result always ends with `Eof`.
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia();
            let (line, column) = (self.line, self.column);
            let Some(byte) = self.peek() else {
                tokens.push(Token::new(TokenKind::Eof, "", line, column));
                break;
            };

            let token = match byte {
                b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.word(line, column),
                b'0'..=b'9' => self.number(line, column),
                b'"' => self.string(line, column),
                b'\'' => self.char_literal(line, column),
                _ => self.symbol(line, column),
            };
            tokens.push(token);
        }
        tokens
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        if byte == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(byte)
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(b' ') | Some(b'\t') | Some(b'\r') | Some(b'\n') => {
                    self.bump();
                }
                Some(b'/') if self.peek_at(1) == Some(b'/') => {
                    while let Some(byte) = self.peek() {
                        if byte == b'\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                _ => break,
            }
        }
    }

    fn word(&mut self, line: u32, column: u32) -> Token {
        let start = self.pos;
        while let Some(byte) = self.peek() {
            if byte.is_ascii_alphanumeric() || byte == b'_' {
                self.bump();
            } else {
                break;
            }
        }
        let text = std::str::from_utf8(&self.bytes[start..self.pos]).unwrap_or("");

        match text {
            "true" | "false" => Token::new(TokenKind::Bool, text, line, column),
            _ => match TokenKind::keyword(text) {
                Some(kind) => Token::new(kind, text, line, column),
                None => Token::new(TokenKind::Ident, text, line, column),
            },
        }
    }

    fn number(&mut self, line: u32, column: u32) -> Token {
        let start = self.pos;
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.bump();
        }
        let mut kind = TokenKind::Int;
        if self.peek() == Some(b'.') && matches!(self.peek_at(1), Some(b'0'..=b'9')) {
            kind = TokenKind::Float;
            self.bump();
            while matches!(self.peek(), Some(b'0'..=b'9')) {
                self.bump();
            }
        }
        let text = std::str::from_utf8(&self.bytes[start..self.pos]).unwrap_or("");
        Token::new(kind, text, line, column)
    }

    fn escape(&mut self) -> Option<char> {
        match self.bump()? {
            b'n' => Some('\n'),
            b't' => Some('\t'),
            b'r' => Some('\r'),
            b'\\' => Some('\\'),
            b'"' => Some('"'),
            b'\'' => Some('\''),
            b'0' => Some('\0'),
            other => Some(other as char),
        }
    }

    fn string(&mut self, line: u32, column: u32) -> Token {
        self.bump();
        let mut text = String::new();
        loop {
            match self.peek() {
                None | Some(b'\n') => {
                    // Leave the newline for skip_trivia; the literal is lost.
                    return Token::new(TokenKind::Unknown, "Unclosed string literal", line, column);
                }
                Some(b'"') => {
                    self.bump();
                    return Token::new(TokenKind::Str, text, line, column);
                }
                Some(b'\\') => {
                    self.bump();
                    if let Some(ch) = self.escape() {
                        text.push(ch);
                    }
                }
                Some(byte) => {
                    self.bump();
                    text.push(byte as char);
                }
            }
        }
    }

    fn char_literal(&mut self, line: u32, column: u32) -> Token {
        self.bump();
        let ch = match self.peek() {
            None | Some(b'\n') | Some(b'\'') => {
                self.bump();
                return Token::new(
                    TokenKind::Unknown,
                    "Unclosed character literal",
                    line,
                    column,
                );
            }
            Some(b'\\') => {
                self.bump();
                self.escape().unwrap_or('\\')
            }
            Some(byte) => {
                self.bump();
                byte as char
            }
        };
        if self.peek() == Some(b'\'') {
            self.bump();
            Token::new(TokenKind::Char, ch.to_string(), line, column)
        } else {
            Token::new(
                TokenKind::Unknown,
                "Unclosed character literal",
                line,
                column,
            )
        }
    }

    fn symbol(&mut self, line: u32, column: u32) -> Token {
        let first = self.bump().unwrap_or(0);
        let second = self.peek();

        // Two-byte operators take priority over their one-byte prefixes.
        let two = match (first, second) {
            (b'<', Some(b'=')) => Some(TokenKind::Le),
            (b'>', Some(b'=')) => Some(TokenKind::Ge),
            (b'=', Some(b'=')) => Some(TokenKind::EqEq),
            (b'!', Some(b'=')) => Some(TokenKind::NotEq),
            (b'&', Some(b'&')) => Some(TokenKind::AndAnd),
            (b'|', Some(b'|')) => Some(TokenKind::OrOr),
            (b'+', Some(b'+')) => Some(TokenKind::PlusPlus),
            (b'-', Some(b'-')) => Some(TokenKind::MinusMinus),
            (b'+', Some(b'=')) => Some(TokenKind::PlusAssign),
            (b'-', Some(b'=')) => Some(TokenKind::MinusAssign),
            (b'*', Some(b'=')) => Some(TokenKind::StarAssign),
            (b'/', Some(b'=')) => Some(TokenKind::SlashAssign),
            (b'-', Some(b'>')) => Some(TokenKind::Arrow),
            _ => None,
        };
        if let Some(kind) = two {
            let lexeme = format!("{}{}", first as char, second.unwrap_or(0) as char);
            self.bump();
            return Token::new(kind, lexeme, line, column);
        }

        let kind = match first {
            b'+' => TokenKind::Plus,
            b'-' => TokenKind::Minus,
            b'*' => TokenKind::Star,
            b'/' => TokenKind::Slash,
            b'%' => TokenKind::Percent,
            b'<' => TokenKind::Lt,
            b'>' => TokenKind::Gt,
            b'!' => TokenKind::Not,
            b'=' => TokenKind::Assign,
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'[' => TokenKind::LBracket,
            b']' => TokenKind::RBracket,
            b'{' => TokenKind::LBrace,
            b'}' => TokenKind::RBrace,
            b',' => TokenKind::Comma,
            b'.' => TokenKind::Dot,
            b':' => TokenKind::Colon,
            b';' => TokenKind::Semicolon,
            other => {
                return Token::new(
                    TokenKind::Unknown,
                    format!("Unknown character '{}'", other as char),
                    line,
                    column,
                );
            }
        };
        Token::new(kind, (first as char).to_string(), line, column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source).tokenize().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn scans_a_declaration() {
        assert_eq!(
            kinds("let x: int = 42;"),
            vec![
                TokenKind::Let,
                TokenKind::Ident,
                TokenKind::Colon,
                TokenKind::KwInt,
                TokenKind::Assign,
                TokenKind::Int,
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn two_byte_operators_win_over_prefixes() {
        assert_eq!(
            kinds("a <= b -> c != d"),
            vec![
                TokenKind::Ident,
                TokenKind::Le,
                TokenKind::Ident,
                TokenKind::Arrow,
                TokenKind::Ident,
                TokenKind::NotEq,
                TokenKind::Ident,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn comments_and_whitespace_are_elided() {
        assert_eq!(
            kinds("x // the rest is gone\n y"),
            vec![TokenKind::Ident, TokenKind::Ident, TokenKind::Eof]
        );
    }

    #[test]
    fn string_literal_quotes_are_stripped() {
        let tokens = Lexer::new(r#""hi\n there""#).tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Str);
        assert_eq!(tokens[0].lexeme, "hi\n there");
    }

    #[test]
    fn unterminated_string_becomes_unknown() {
        let tokens = Lexer::new("\"oops\nlet x = 1;").tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Unknown);
        assert_eq!(tokens[0].lexeme, "Unclosed string literal");
        // Lexing resumes on the next line.
        assert_eq!(tokens[1].kind, TokenKind::Let);
    }

    #[test]
    fn char_literal_with_escape() {
        let tokens = Lexer::new(r"'\n'").tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Char);
        assert_eq!(tokens[0].lexeme, "\n");
    }

    #[test]
    fn true_and_false_are_bool_literals() {
        assert_eq!(
            kinds("true false"),
            vec![TokenKind::Bool, TokenKind::Bool, TokenKind::Eof]
        );
    }

    #[test]
    fn positions_are_one_based_and_track_lines() {
        let tokens = Lexer::new("a\n  b").tokenize();
        assert_eq!((tokens[0].line, tokens[0].column), (1, 1));
        assert_eq!((tokens[1].line, tokens[1].column), (2, 3));
    }

    #[test]
    fn float_requires_digits_on_both_sides() {
        assert_eq!(
            kinds("1.5 2. 3"),
            vec![
                TokenKind::Float,
                TokenKind::Int,
                TokenKind::Dot,
                TokenKind::Int,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn empty_input_is_just_eof() {
        assert_eq!(kinds(""), vec![TokenKind::Eof]);
    }
}
