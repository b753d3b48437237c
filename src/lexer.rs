//! A minimal scanner that turns PLC source text into a [Token] stream.
//!
//! Lexing is explicitly out of scope for this crate (§6 of the design
//! spec): the parser only depends on the token *contract* in [crate::token].
//! This module exists so the rest of the pipeline is actually exercisable
//! from source text; it does the least work needed to classify characters
//! into the five [TokenKind] categories plus [TokenKind::Operator]. It does
//! not attempt keyword recognition (that's the parser's job, via
//! [Token::is_word]) or escape expansion (also the parser's job, since only
//! it knows whether it's building a [crate::ast::Literal::Character] or
//! [crate::ast::Literal::String]).
use crate::token::{Token, TokenKind};

/// Scans PLC source text into a flat, owned [Vec] of [Token]s, terminated
/// implicitly by running out of input (there is no explicit `Eof` token;
/// the parser treats an empty remaining slice as end-of-stream).
pub fn scan(source: &str) -> Vec<Token> {
    Scanner::new(source).scan_all()
}

/// Stateful scanner over a `&str`. Mirrors the classic `start`/`current`
/// slicing idiom: `start` marks the beginning of the lexeme under
/// construction, `current` trails behind as characters are consumed.
struct Scanner<'a> {
    source: &'a str,
    start: &'a str,
    current: &'a str,
}

impl<'a> Scanner<'a> {
    fn new(source: &'a str) -> Self {
        Scanner {
            source,
            start: source,
            current: source,
        }
    }

    fn scan_all(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace();
            self.start = self.current;
            if self.is_at_end() {
                break;
            }

            let offset = self.offset();
            let c = self.advance();
            let token = match c {
                c if is_id_start(c) => self.identifier(offset),
                c if c.is_ascii_digit() => self.number(offset),
                '\'' => self.character(offset),
                '"' => self.string(offset),
                '(' | ')' | '[' | ']' | ',' | ':' | ';' | '+' | '-' | '*' | '/' | '^' => {
                    self.make_operator(offset)
                }
                '&' => self.two_char_operator(offset, '&'),
                '|' => self.two_char_operator(offset, '|'),
                '=' => self.maybe_equals(offset, '='),
                '!' => self.maybe_equals(offset, '='),
                '<' => self.maybe_equals(offset, '='),
                '>' => self.maybe_equals(offset, '='),
                other => panic!("lexer: unexpected character {other:?} at byte {offset}"),
            };
            tokens.push(token);
        }
        tokens
    }

    fn offset(&self) -> usize {
        self.source.len() - self.current.len()
    }

    fn is_at_end(&self) -> bool {
        self.current.is_empty()
    }

    fn advance(&mut self) -> char {
        let c = self.current.chars().next().expect("advance at end");
        self.current = &self.current[c.len_utf8()..];
        c
    }

    fn peek(&self) -> char {
        self.current.chars().next().unwrap_or('\0')
    }

    fn peek_next(&self) -> char {
        let mut chars = self.current.chars();
        chars.next();
        chars.next().unwrap_or('\0')
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), ' ' | '\t' | '\n' | '\r') {
            self.advance();
        }
    }

    fn lexeme(&self) -> &'a str {
        let extent = self.start.len() - self.current.len();
        &self.start[..extent]
    }

    fn identifier(&mut self, offset: usize) -> Token {
        while is_id_continue(self.peek()) {
            self.advance();
        }
        Token::new(TokenKind::Identifier, self.lexeme(), offset)
    }

    fn number(&mut self, offset: usize) -> Token {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        let mut kind = TokenKind::Integer;
        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            kind = TokenKind::Decimal;
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        Token::new(kind, self.lexeme(), offset)
    }

    /// Scans the body of a character literal. The opening `'` has already
    /// been consumed. Escapes are left unexpanded in the token's literal
    /// text (without the surrounding quotes); the parser expands them.
    fn character(&mut self, offset: usize) -> Token {
        if self.peek() == '\\' {
            self.advance();
        }
        self.advance();
        assert_eq!('\'', self.advance(), "unterminated character literal");

        let full = self.lexeme();
        let inner = &full[1..full.len() - 1];
        Token::new(TokenKind::Character, inner, offset)
    }

    /// Scans the body of a string literal. The opening `"` has already been
    /// consumed.
    fn string(&mut self, offset: usize) -> Token {
        while self.peek() != '"' && !self.is_at_end() {
            if self.peek() == '\\' {
                self.advance();
            }
            self.advance();
        }
        assert_eq!('"', self.advance(), "unterminated string literal");

        let full = self.lexeme();
        let inner = &full[1..full.len() - 1];
        Token::new(TokenKind::String, inner, offset)
    }

    fn make_operator(&mut self, offset: usize) -> Token {
        Token::new(TokenKind::Operator, self.lexeme(), offset)
    }

    /// Consumes a second copy of `repeated` (for `&&`/`||`), panicking if
    /// it isn't there -- the grammar has no single-character `&` or `|`.
    fn two_char_operator(&mut self, offset: usize, repeated: char) -> Token {
        let matched = self.peek() == repeated;
        assert!(matched, "expected doubled '{repeated}' operator");
        self.advance();
        self.make_operator(offset)
    }

    /// Consumes an optional trailing `=` after an operator that may come in
    /// a one- or two-character form (`= ==`, `! !=`, `< <=`, `> >=`).
    fn maybe_equals(&mut self, offset: usize, trailing: char) -> Token {
        if self.peek() == trailing {
            self.advance();
        }
        self.make_operator(offset)
    }
}

fn is_id_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_id_continue(c: char) -> bool {
    is_id_start(c) || c.is_ascii_digit()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn scans_a_minimal_function() {
        let tokens = scan("FUN main(): Integer DO RETURN 0; END");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        use TokenKind::*;
        assert_eq!(
            kinds,
            vec![
                Identifier, Identifier, Operator, Operator, Operator, Identifier, Identifier,
                Identifier, Identifier, Integer, Operator, Identifier,
            ]
        );
    }

    #[test]
    fn scans_operators_greedily() {
        let tokens = scan("a == b != c && d || e <= f >= g");
        let ops: Vec<_> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Operator)
            .map(|t| t.literal.as_str())
            .collect();
        assert_eq!(ops, vec!["==", "!=", "&&", "||", "<=", ">="]);
    }

    #[test]
    fn offsets_point_at_each_token() {
        let tokens = scan("xs[1]");
        assert_eq!(tokens[0].offset, 0); // xs
        assert_eq!(tokens[1].offset, 2); // [
        assert_eq!(tokens[2].offset, 3); // 1
        assert_eq!(tokens[3].offset, 4); // ]
    }

    #[test]
    fn character_and_string_literals_keep_escapes_unexpanded() {
        let tokens = scan(r#"'\n' "a\tb""#);
        assert_eq!(tokens[0].kind, TokenKind::Character);
        assert_eq!(tokens[0].literal, r"\n");
        assert_eq!(tokens[1].kind, TokenKind::String);
        assert_eq!(tokens[1].literal, r"a\tb");
    }

    #[test]
    fn decimal_requires_digit_after_dot() {
        let tokens = scan("1.5");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Decimal);
        assert_eq!(tokens[0].literal, "1.5");
    }
}
