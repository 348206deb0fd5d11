//! Tokenizer: a stream of `(kind, lexeme, line, col)` tokens ending in EOF.

use crate::diagnostic::Diagnostic;
use crate::lexeme::TokenKind;
use crate::span::{Span, Spanned};

pub struct Lexer<'src> {
    source: &'src [u8],
    pos: usize,
    line: u32,
    col: u32,
    diagnostics: Vec<Diagnostic>,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source: source.as_bytes(),
            pos: 0,
            line: 1,
            col: 1,
            diagnostics: Vec::new(),
        }
    }

    pub fn tokenize(mut self) -> (Vec<Spanned<TokenKind>>, Vec<Diagnostic>) {
        let mut tokens = Vec::new();

        loop {
            let tok = self.next_token();
            let is_eof = matches!(tok.node, TokenKind::Eof);
            tokens.push(tok);
            if is_eof {
                break;
            }
        }

        (tokens, self.diagnostics)
    }

    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.source.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let ch = self.peek()?;
        self.pos += 1;
        if ch == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(b' ') | Some(b'\t') | Some(b'\r') => {
                    self.bump();
                }
                Some(b'#') => {
                    while let Some(c) = self.peek() {
                        if c == b'\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                _ => break,
            }
        }
    }

    fn here(&self, start_pos: usize, start_line: u32, start_col: u32) -> Span {
        Span::new(start_pos as u32, self.pos as u32, start_line, start_col)
    }

    fn scan_ident(&mut self) -> Spanned<TokenKind> {
        let (start_pos, start_line, start_col) = (self.pos, self.line, self.col);

        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == b'_' {
                self.bump();
            } else {
                break;
            }
        }

        let text = std::str::from_utf8(&self.source[start_pos..self.pos])
            .unwrap_or("")
            .to_string();
        Spanned::new(TokenKind::Ident(text), self.here(start_pos, start_line, start_col))
    }

    fn scan_number(&mut self) -> Spanned<TokenKind> {
        let (start_pos, start_line, start_col) = (self.pos, self.line, self.col);
        let mut is_float = false;

        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.bump();
            } else if c == b'.' && !is_float && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                self.bump();
            } else {
                break;
            }
        }

        let text = std::str::from_utf8(&self.source[start_pos..self.pos]).unwrap_or("0");
        let span = self.here(start_pos, start_line, start_col);

        if is_float {
            let value: f64 = text.parse().unwrap_or(0.0);
            Spanned::new(TokenKind::Float(value), span)
        } else {
            match text.parse::<i64>() {
                Ok(value) => Spanned::new(TokenKind::Int(value), span),
                Err(_) => {
                    self.diagnostics.push(
                        Diagnostic::error("digit conversion failed", span)
                            .with_note(format!("'{text}' does not fit in a 64-bit integer")),
                    );
                    Spanned::new(TokenKind::Int(0), span)
                }
            }
        }
    }

    fn scan_string(&mut self) -> Spanned<TokenKind> {
        let (start_pos, start_line, start_col) = (self.pos, self.line, self.col);
        self.bump(); // opening quote
        let mut text = String::new();

        loop {
            match self.peek() {
                None | Some(b'\n') => {
                    let span = self.here(start_pos, start_line, start_col);
                    self.diagnostics
                        .push(Diagnostic::error("unterminated string literal", span));
                    break;
                }
                Some(b'"') => {
                    self.bump();
                    break;
                }
                Some(c) => {
                    text.push(c as char);
                    self.bump();
                }
            }
        }

        Spanned::new(TokenKind::Str(text), self.here(start_pos, start_line, start_col))
    }

    fn next_token(&mut self) -> Spanned<TokenKind> {
        self.skip_whitespace_and_comments();

        let (start_pos, start_line, start_col) = (self.pos, self.line, self.col);
        let Some(c) = self.peek() else {
            return Spanned::new(TokenKind::Eof, self.here(start_pos, start_line, start_col));
        };

        if c == b'\n' {
            self.bump();
            return Spanned::new(TokenKind::Eol, self.here(start_pos, start_line, start_col));
        }

        if c.is_ascii_alphabetic() || c == b'_' {
            return self.scan_ident();
        }

        if c.is_ascii_digit() {
            return self.scan_number();
        }

        if c == b'"' {
            return self.scan_string();
        }

        macro_rules! one {
            ($kind:expr) => {{
                self.bump();
                Spanned::new($kind, self.here(start_pos, start_line, start_col))
            }};
        }

        macro_rules! two {
            ($second:expr, $then:expr, $else_:expr) => {{
                self.bump();
                if self.peek() == Some($second) {
                    self.bump();
                    Spanned::new($then, self.here(start_pos, start_line, start_col))
                } else {
                    Spanned::new($else_, self.here(start_pos, start_line, start_col))
                }
            }};
        }

        match c {
            b'(' => one!(TokenKind::LParen),
            b')' => one!(TokenKind::RParen),
            b'{' => one!(TokenKind::LBrace),
            b'}' => one!(TokenKind::RBrace),
            b',' => one!(TokenKind::Comma),
            b'@' => one!(TokenKind::At),
            b'+' => one!(TokenKind::Plus),
            b'-' => one!(TokenKind::Minus),
            b'*' => one!(TokenKind::Star),
            b'/' => one!(TokenKind::Slash),
            b'%' => one!(TokenKind::Percent),
            b'~' => one!(TokenKind::Tilde),
            b'^' => one!(TokenKind::Caret),
            b'=' => two!(b'=', TokenKind::Eq, TokenKind::Equal),
            b'!' => two!(b'=', TokenKind::Neq, TokenKind::Bang),
            b'<' => two!(b'<', TokenKind::Shl, TokenKind::Lt).and_then_lte(self, b'='),
            b'>' => two!(b'>', TokenKind::Shr, TokenKind::Gt).and_then_gte(self, b'='),
            b'&' => one!(TokenKind::Amp),
            b'|' => one!(TokenKind::Pipe),
            other => {
                self.bump();
                let span = self.here(start_pos, start_line, start_col);
                self.diagnostics.push(Diagnostic::error(
                    format!("unexpected character '{}'", other as char),
                    span,
                ));
                Spanned::new(TokenKind::Eol, span)
            }
        }
    }
}

// `<` / `<=` and `>` / `>=` need a second disambiguation step after the
// `<<` / `>>` check above; small helper trait keeps `next_token`'s match
// arms uniform instead of hand-duplicating the lookahead there.
trait ThenCompare {
    fn and_then_lte(self, lex: &mut Lexer, byte: u8) -> Spanned<TokenKind>;
    fn and_then_gte(self, lex: &mut Lexer, byte: u8) -> Spanned<TokenKind>;
}

impl ThenCompare for Spanned<TokenKind> {
    fn and_then_lte(self, lex: &mut Lexer, byte: u8) -> Spanned<TokenKind> {
        if self.node == TokenKind::Lt && lex.peek() == Some(byte) {
            lex.bump();
            Spanned::new(TokenKind::Lte, lex.here(self.span.start as usize, self.span.line, self.span.col))
        } else {
            self
        }
    }

    fn and_then_gte(self, lex: &mut Lexer, byte: u8) -> Spanned<TokenKind> {
        if self.node == TokenKind::Gt && lex.peek() == Some(byte) {
            lex.bump();
            Spanned::new(TokenKind::Gte, lex.here(self.span.start as usize, self.span.line, self.span.col))
        } else {
            self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src)
            .tokenize()
            .0
            .into_iter()
            .map(|t| t.node)
            .collect()
    }

    #[test]
    fn tokenizes_a_subroutine_header() {
        let toks = kinds("sub main()\n");
        assert_eq!(
            toks,
            vec![
                TokenKind::Ident("sub".into()),
                TokenKind::Ident("main".into()),
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::Eol,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn distinguishes_comparison_operators() {
        let toks = kinds("< <= > >= == != << >>");
        assert_eq!(
            toks,
            vec![
                TokenKind::Lt,
                TokenKind::Lte,
                TokenKind::Gt,
                TokenKind::Gte,
                TokenKind::Eq,
                TokenKind::Neq,
                TokenKind::Shl,
                TokenKind::Shr,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn integers_and_identifiers() {
        let toks = kinds("x = 42");
        assert_eq!(
            toks,
            vec![
                TokenKind::Ident("x".into()),
                TokenKind::Equal,
                TokenKind::Int(42),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn reports_unterminated_string() {
        let (_, diags) = Lexer::new("\"abc").tokenize();
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn line_and_col_advance_across_newlines() {
        let (toks, _) = Lexer::new("a\nb").tokenize();
        // a, Eol, b, Eof
        assert_eq!(toks[2].span.line, 2);
        assert_eq!(toks[2].span.col, 1);
    }
}
