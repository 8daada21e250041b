//! Token cursor over a slice of a file's token stream.

use lava_core::lang::keywords::KeywordId;
use lava_core::lang::operators::OperatorId;
use lava_core::lang::punctuation::PunctuationId;
use lava_syntax::lexer::{Token, TokenKind};
use lava_syntax::{Span, SyntaxError};

/// Half-open range of token indices `[start, end)` into a file's token stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TokenRange {
    pub start: usize,
    pub end: usize,
}

impl TokenRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Cursor restricted to a [`TokenRange`]. Reading past the end yields an end-of-input token.
#[derive(Clone)]
pub struct Cursor<'t> {
    tokens: &'t [Token],
    pos: usize,
    end: usize,
    eof: Token,
}

impl<'t> Cursor<'t> {
    pub fn new(tokens: &'t [Token], range: TokenRange) -> Self {
        let end = range.end.min(tokens.len());
        let eof_pos = tokens
            .get(end)
            .map(|t| t.span.start)
            .or_else(|| tokens.last().map(|t| t.span.end))
            .unwrap_or(0);
        Self {
            tokens,
            pos: range.start.min(end),
            end,
            eof: Token::new(TokenKind::Eof, Span::at(eof_pos)),
        }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn reset(&mut self, pos: usize) {
        self.pos = pos.min(self.end);
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.end || matches!(self.tokens[self.pos].kind, TokenKind::Eof)
    }

    pub fn peek(&self) -> &Token {
        self.nth(0)
    }

    pub fn kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    /// Token `n` positions ahead of the current one.
    pub fn nth(&self, n: usize) -> &Token {
        let i = self.pos + n;
        if i < self.end { &self.tokens[i] } else { &self.eof }
    }

    pub fn span(&self) -> Span {
        self.peek().span
    }

    /// Span of the token just consumed.
    pub fn prev_span(&self) -> Span {
        match self.pos.checked_sub(1).and_then(|i| self.tokens.get(i)) {
            Some(t) => t.span,
            None => self.eof.span,
        }
    }

    pub fn bump(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.end {
            self.pos += 1;
        }
        token
    }

    pub fn is_punct(&self, id: PunctuationId) -> bool {
        self.kind().is_punctuation(id)
    }

    pub fn is_op(&self, id: OperatorId) -> bool {
        self.kind().is_operator(id)
    }

    pub fn is_keyword(&self, id: KeywordId) -> bool {
        self.kind().is_keyword(id)
    }

    pub fn is_ident(&self) -> bool {
        matches!(self.kind(), TokenKind::Ident(_))
    }

    pub fn eat_punct(&mut self, id: PunctuationId) -> bool {
        let hit = self.is_punct(id);
        if hit {
            self.bump();
        }
        hit
    }

    pub fn eat_op(&mut self, id: OperatorId) -> bool {
        let hit = self.is_op(id);
        if hit {
            self.bump();
        }
        hit
    }

    pub fn eat_keyword(&mut self, id: KeywordId) -> bool {
        let hit = self.is_keyword(id);
        if hit {
            self.bump();
        }
        hit
    }

    pub fn eat_contextual(&mut self, word: &str) -> bool {
        let hit = self.kind().is_contextual(word);
        if hit {
            self.bump();
        }
        hit
    }

    pub fn expect_punct(&mut self, id: PunctuationId) -> Result<Span, SyntaxError> {
        if self.is_punct(id) {
            Ok(self.bump().span)
        } else {
            Err(self.unexpected(&format!("`{}`", lava_core::lang::punctuation::as_str(id))))
        }
    }

    pub fn expect_op(&mut self, id: OperatorId) -> Result<Span, SyntaxError> {
        if self.is_op(id) {
            Ok(self.bump().span)
        } else {
            Err(self.unexpected(&format!("`{}`", lava_core::lang::operators::as_str(id))))
        }
    }

    pub fn expect_ident(&mut self) -> Result<(String, Span), SyntaxError> {
        match self.kind() {
            TokenKind::Ident(name) => {
                let name = name.clone();
                Ok((name, self.bump().span))
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    /// "expected X, found Y" at the current token.
    pub fn unexpected(&self, expected: &str) -> SyntaxError {
        SyntaxError::new(format!("expected {expected}, found {}", self.kind().describe()), self.span())
    }

    /// Skip a bracketed group starting at the current opening `(`, `[` or `{`.
    ///
    /// Returns the range strictly inside the brackets; the cursor ends after the closing bracket.
    pub fn skip_group(&mut self) -> Result<TokenRange, SyntaxError> {
        let open_span = self.span();
        let (open, close) = match self.kind() {
            TokenKind::Punctuation(PunctuationId::LParen) => (PunctuationId::LParen, PunctuationId::RParen),
            TokenKind::Punctuation(PunctuationId::LBracket) => (PunctuationId::LBracket, PunctuationId::RBracket),
            TokenKind::Punctuation(PunctuationId::LBrace) => (PunctuationId::LBrace, PunctuationId::RBrace),
            _ => return Err(self.unexpected("`(`, `[` or `{`")),
        };
        self.bump();
        let inner_start = self.pos;
        let mut depth = 1usize;
        while !self.at_end() {
            if self.is_punct(open) {
                depth += 1;
            } else if self.is_punct(close) {
                depth -= 1;
                if depth == 0 {
                    let inner = TokenRange::new(inner_start, self.pos);
                    self.bump();
                    return Ok(inner);
                }
            }
            self.bump();
        }
        Err(SyntaxError::new(
            format!("unclosed `{}`", lava_core::lang::punctuation::as_str(open)),
            open_span,
        ))
    }

    /// Advance to the next `stop` punctuation at bracket depth zero (not consuming it) or the end of the range.
    ///
    /// Returns the skipped range.
    pub fn skip_until(&mut self, stops: &[PunctuationId]) -> TokenRange {
        let start = self.pos;
        let mut depth = 0usize;
        while !self.at_end() {
            match self.kind() {
                TokenKind::Punctuation(p) if depth == 0 && stops.contains(p) => break,
                TokenKind::Punctuation(PunctuationId::LParen | PunctuationId::LBracket | PunctuationId::LBrace) => {
                    depth += 1
                }
                TokenKind::Punctuation(PunctuationId::RParen | PunctuationId::RBracket | PunctuationId::RBrace) => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                }
                _ => {}
            }
            self.bump();
        }
        TokenRange::new(start, self.pos)
    }

    /// Sub-cursor over `range` of the same token stream.
    pub fn sub(&self, range: TokenRange) -> Cursor<'t> {
        Cursor::new(self.tokens, range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lava_syntax::lexer::lex;

    #[test]
    fn test_skip_group_returns_inner_range() {
        let tokens = lex("( a ( b ) c ) d").unwrap();
        let mut c = Cursor::new(&tokens, TokenRange::new(0, tokens.len()));
        let inner = c.skip_group().unwrap();
        assert_eq!(inner, TokenRange::new(1, 6));
        assert_eq!(c.kind().ident(), Some("d"));
    }

    #[test]
    fn test_reading_past_the_range_yields_eof() {
        let tokens = lex("a b c").unwrap();
        let mut c = Cursor::new(&tokens, TokenRange::new(0, 1));
        c.bump();
        assert!(c.at_end());
        assert_eq!(*c.kind(), TokenKind::Eof);
        assert_eq!(c.span(), Span::at(tokens[1].span.start));
    }

    #[test]
    fn test_skip_until_respects_nesting() {
        let tokens = lex("f(a, b), c; d").unwrap();
        let mut c = Cursor::new(&tokens, TokenRange::new(0, tokens.len()));
        let skipped = c.skip_until(&[PunctuationId::Comma, PunctuationId::Semicolon]);
        assert_eq!(skipped, TokenRange::new(0, 6));
        assert!(c.is_punct(PunctuationId::Comma));
    }

    #[test]
    fn test_unclosed_group() {
        let tokens = lex("{ a").unwrap();
        let mut c = Cursor::new(&tokens, TokenRange::new(0, tokens.len()));
        assert!(c.skip_group().unwrap_err().message.contains("unclosed"));
    }
}
