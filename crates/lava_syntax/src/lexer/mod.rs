//! Lexer for the Lava language.
//!
//! Converts source text into a flat token stream. Comments and whitespace are dropped; every token carries the byte
//! span it was read from so diagnostics can point back into the source.
//!
//! ## Notes
//! - `>` is never merged into `>>`/`>>>` here (see [`lava_core::lang::operators`]).
//! - Text blocks (`"""…"""`) are lexed as ordinary string literals with incidental indentation stripped.
//! - The lexer keeps going after an error so that one bad literal does not hide the rest of the file.

pub mod tokens;

pub use tokens::{Token, TokenKind};

use crate::diagnostics::SyntaxError;
use crate::span::Span;
use lava_core::lang::{keywords, operators, punctuation};

/// Lexer state over one source string.
pub struct Lexer<'a> {
    source: &'a str,
    pos: usize,
    tokens: Vec<Token>,
    errors: Vec<SyntaxError>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            pos: 0,
            tokens: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Tokenize the whole source. The stream always ends with [`TokenKind::Eof`].
    ///
    /// ## Errors
    /// Returns every lexical error found; the partial token stream is discarded.
    pub fn tokenize(mut self) -> Result<Vec<Token>, Vec<SyntaxError>> {
        while let Some(c) = self.peek() {
            let start = self.pos;
            if c.is_whitespace() {
                self.advance();
            } else if self.rest().starts_with("//") {
                self.skip_line_comment();
            } else if self.rest().starts_with("/*") {
                self.skip_block_comment(start);
            } else if is_ident_start(c) {
                self.scan_identifier(start);
            } else if c.is_ascii_digit() || (c == '.' && self.peek_at(1).is_some_and(|d| d.is_ascii_digit())) {
                self.scan_number(start);
            } else if self.rest().starts_with("\"\"\"") {
                self.scan_text_block(start);
            } else if c == '"' {
                self.scan_string(start);
            } else if c == '\'' {
                self.scan_char(start);
            } else if let Some((id, len)) = punctuation::match_prefix(self.rest()) {
                self.pos += len;
                self.push(TokenKind::Punctuation(id), start);
            } else if let Some((id, len)) = operators::match_prefix(self.rest()) {
                self.pos += len;
                self.push(TokenKind::Operator(id), start);
            } else {
                self.advance();
                self.error(start, format!("unexpected character `{c}`"));
            }
        }
        let end = self.source.len();
        self.tokens.push(Token::new(TokenKind::Eof, Span::at(end)));

        if self.errors.is_empty() {
            Ok(self.tokens)
        } else {
            Err(self.errors)
        }
    }

    // ========================================================================
    // Cursor helpers
    // ========================================================================

    fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn push(&mut self, kind: TokenKind, start: usize) {
        self.tokens.push(Token::new(kind, Span::new(start, self.pos)));
    }

    fn error(&mut self, start: usize, message: impl Into<String>) {
        self.errors.push(SyntaxError::new(message, Span::new(start, self.pos.max(start + 1))));
    }

    // ========================================================================
    // Comments
    // ========================================================================

    fn skip_line_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.advance();
        }
    }

    fn skip_block_comment(&mut self, start: usize) {
        self.pos += 2;
        match self.rest().find("*/") {
            Some(i) => self.pos += i + 2,
            None => {
                self.pos = self.source.len();
                self.error(start, "unterminated block comment");
            }
        }
    }

    // ========================================================================
    // Identifiers
    // ========================================================================

    fn scan_identifier(&mut self, start: usize) {
        while self.peek().is_some_and(is_ident_continue) {
            self.advance();
        }
        let spelling = &self.source[start..self.pos];
        match keywords::from_str(spelling) {
            Some(id) => self.push(TokenKind::Keyword(id), start),
            None => self.push(TokenKind::Ident(spelling.to_string()), start),
        }
    }

    // ========================================================================
    // Numbers
    // ========================================================================

    fn scan_number(&mut self, start: usize) {
        let rest = self.rest();
        let (radix, prefix) = if rest.starts_with("0x") || rest.starts_with("0X") {
            (16, 2)
        } else if rest.starts_with("0b") || rest.starts_with("0B") {
            (2, 2)
        } else {
            (10, 0)
        };
        self.pos += prefix;

        let mut is_float = false;
        while let Some(c) = self.peek() {
            if c.is_digit(radix) || c == '_' {
                self.advance();
            } else if radix == 10 && c == '.' && !is_float && self.peek_at(1).is_none_or(|d| d != '.') {
                is_float = true;
                self.advance();
            } else if radix == 10 && (c == 'e' || c == 'E') {
                is_float = true;
                self.advance();
                if matches!(self.peek(), Some('+' | '-')) {
                    self.advance();
                }
            } else {
                break;
            }
        }

        let digits: String = self.source[start + prefix..self.pos].chars().filter(|c| *c != '_').collect();
        let suffix = self.peek().filter(|c| matches!(c, 'l' | 'L' | 'f' | 'F' | 'd' | 'D'));
        if suffix.is_some() {
            self.advance();
        }

        let kind = match suffix {
            Some('f' | 'F') => digits.parse::<f32>().ok().map(TokenKind::Float),
            Some('d' | 'D') => digits.parse::<f64>().ok().map(TokenKind::Double),
            _ if is_float => digits.parse::<f64>().ok().map(TokenKind::Double),
            Some('l' | 'L') => parse_integral(&digits, radix, true).map(TokenKind::Long),
            _ => parse_integral(&digits, radix, false).map(TokenKind::Int),
        };
        match kind {
            Some(kind) => self.push(kind, start),
            None => self.error(start, format!("malformed or out-of-range number `{}`", &self.source[start..self.pos])),
        }
    }

    // ========================================================================
    // Strings and characters
    // ========================================================================

    fn scan_string(&mut self, start: usize) {
        self.advance();
        let mut value = String::new();
        loop {
            match self.advance() {
                Some('"') => break,
                Some('\\') => match self.scan_escape() {
                    Some(c) => value.push(c),
                    None => self.error(start, "invalid escape sequence"),
                },
                Some('\n') | None => {
                    self.error(start, "unterminated string literal");
                    return;
                }
                Some(c) => value.push(c),
            }
        }
        self.push(TokenKind::String(value), start);
    }

    fn scan_text_block(&mut self, start: usize) {
        self.pos += 3;
        let Some(end) = self.rest().find("\"\"\"") else {
            self.pos = self.source.len();
            self.error(start, "unterminated text block");
            return;
        };
        let raw = &self.rest()[..end];
        self.pos += end + 3;
        self.push(TokenKind::String(strip_text_block(raw)), start);
    }

    fn scan_char(&mut self, start: usize) {
        self.advance();
        let c = match self.advance() {
            Some('\\') => self.scan_escape(),
            Some('\'') | Some('\n') | None => None,
            Some(c) => Some(c),
        };
        match (c, self.peek()) {
            (Some(c), Some('\'')) => {
                self.advance();
                self.push(TokenKind::Char(c), start);
            }
            _ => {
                while self.peek().is_some_and(|c| c != '\'' && c != '\n') {
                    self.advance();
                }
                if self.peek() == Some('\'') {
                    self.advance();
                }
                self.error(start, "malformed character literal");
            }
        }
    }

    fn scan_escape(&mut self) -> Option<char> {
        match self.advance()? {
            'n' => Some('\n'),
            't' => Some('\t'),
            'r' => Some('\r'),
            'b' => Some('\u{8}'),
            'f' => Some('\u{c}'),
            's' => Some(' '),
            '0'..='7' => {
                // Octal escape: up to three digits, max \377.
                let begin = self.pos - 1;
                while self.pos - begin < 3 && self.peek().is_some_and(|c| c.is_digit(8)) {
                    self.advance();
                }
                u32::from_str_radix(&self.source[begin..self.pos], 8)
                    .ok()
                    .filter(|v| *v <= 0o377)
                    .and_then(char::from_u32)
            }
            'u' => {
                while self.peek() == Some('u') {
                    self.advance();
                }
                let hex = self.rest().get(..4)?;
                let v = u32::from_str_radix(hex, 16).ok()?;
                self.pos += 4;
                char::from_u32(v)
            }
            c @ ('\\' | '\'' | '"') => Some(c),
            _ => None,
        }
    }
}

// ============================================================================
// Helper functions
// ============================================================================

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Parse an integer literal body. `int` literals in hex/octal/binary may use all 32 bits (`0xFFFFFFFF == -1`);
/// decimal `int` literals may reach `2147483648` so that the negated minimum can be folded.
fn parse_integral(digits: &str, radix: u32, long: bool) -> Option<i64> {
    let (digits, radix) = if radix == 10 && digits.len() > 1 && digits.starts_with('0') {
        (&digits[1..], 8)
    } else {
        (digits, radix)
    };
    let v = u64::from_str_radix(digits, radix).ok()?;
    match (long, radix) {
        (true, 10) if v <= 1 << 63 => Some(v as i64),
        (true, 10) => None,
        (true, _) => Some(v as i64),
        (false, 10) if v <= 1 << 31 => Some(v as i64),
        (false, 10) => None,
        (false, _) if v <= u64::from(u32::MAX) => Some(i64::from(v as u32 as i32)),
        (false, _) => None,
    }
}

/// Remove the common leading indentation of a text block and the opening line break.
fn strip_text_block(raw: &str) -> String {
    let body = raw.strip_prefix('\n').or_else(|| raw.strip_prefix("\r\n")).unwrap_or(raw);
    let indent = body
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);
    body.lines()
        .map(|l| l.get(indent..).unwrap_or("").trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Convenience function to lex a source string.
#[tracing::instrument(skip_all, fields(source_len = source.len()))]
pub fn lex(source: &str) -> Result<Vec<Token>, Vec<SyntaxError>> {
    Lexer::new(source).tokenize()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use lava_core::lang::keywords::KeywordId;
    use lava_core::lang::operators::OperatorId;
    use lava_core::lang::punctuation::PunctuationId;

    fn kinds(src: &str) -> Vec<TokenKind> {
        lex(src).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_keywords_and_contextual_words() {
        let k = kinds("public record R");
        assert!(k[0].is_keyword(KeywordId::Public));
        assert!(k[1].is_contextual("record"));
        assert_eq!(k[2], TokenKind::Ident("R".into()));
    }

    #[test]
    fn test_generic_close_is_not_shift() {
        let k = kinds("List<List<String>>");
        assert!(k[5].is_operator(OperatorId::Gt));
        assert!(k[6].is_operator(OperatorId::Gt));
    }

    #[test]
    fn test_number_literals() {
        assert_eq!(kinds("42")[0], TokenKind::Int(42));
        assert_eq!(kinds("0xFFFFFFFF")[0], TokenKind::Int(-1));
        assert_eq!(kinds("017")[0], TokenKind::Int(15));
        assert_eq!(kinds("1_000L")[0], TokenKind::Long(1000));
        assert_eq!(kinds("0b101")[0], TokenKind::Int(5));
        assert_eq!(kinds("2.5f")[0], TokenKind::Float(2.5));
        assert_eq!(kinds("1e3")[0], TokenKind::Double(1000.0));
        assert_eq!(kinds(".5")[0], TokenKind::Double(0.5));
        assert_eq!(kinds("2147483648")[0], TokenKind::Int(2147483648));
        assert!(lex("2147483649").is_err());
    }

    #[test]
    fn test_strings_and_chars() {
        assert_eq!(kinds(r#""a\tb""#)[0], TokenKind::String("a\tb".into()));
        assert_eq!(kinds(r"'\n'")[0], TokenKind::Char('\n'));
        assert_eq!(kinds(r"'A'")[0], TokenKind::Char('A'));
        assert_eq!(kinds("\"\"\"\n    hi\n      there\n    \"\"\"")[0], TokenKind::String("hi\n  there\n".into()));
    }

    #[test]
    fn test_comments_are_skipped() {
        let k = kinds("a /* b */ // c\n d");
        assert_eq!(k.len(), 3);
    }

    #[test]
    fn test_spans_are_byte_offsets() {
        let tokens = lex("int  x;").unwrap();
        assert_eq!(tokens[1].span, Span::new(5, 6));
        assert!(tokens[2].kind.is_punctuation(PunctuationId::Semicolon));
    }

    #[test]
    fn test_errors_are_collected() {
        let errs = lex("\"open\n 'xy' #").unwrap_err();
        assert_eq!(errs.len(), 3);
    }
}
