//! Recursive-descent parser: token stream -> [Source] AST (§4.1).
//!
//! Every production below mirrors a line of the grammar in the design spec
//! directly; there is no Pratt table here (contrast the teacher's
//! `compiler.rs`, which drives a `ParserRule` table keyed by [Precedence]).
//! PLC's operator ladder is fixed and small enough that a hand-written
//! chain of `parse_logical`/`parse_comparison`/`parse_additive`/
//! `parse_multiplicative` functions is the more direct translation of the
//! grammar, and it keeps every level's associativity (always left, even
//! for `^`) visible in the loop rather than in a table entry.
use std::str::FromStr;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;

use crate::ast::*;
use crate::error::ParseError;
use crate::token::{Token, TokenKind};

/// Reserved words: identifier-kind tokens whose literal text is one of
/// these are keywords, never ordinary names (§6).
const RESERVED: &[&str] = &[
    "LIST", "VAR", "VAL", "FUN", "LET", "IF", "ELSE", "DO", "END", "WHILE", "SWITCH", "CASE",
    "DEFAULT", "RETURN", "NIL", "TRUE", "FALSE",
];

fn is_reserved(word: &str) -> bool {
    RESERVED.contains(&word)
}

/// Parses a complete token stream into a [Source] AST, or fails with a
/// [ParseError] carrying the offset of the offending token.
pub fn parse(tokens: &[Token]) -> Result<Source, ParseError> {
    Parser::new(tokens).parse_source()
}

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    ids: NodeIdGenerator,
    /// Offset to report when the stream is exhausted: one byte past the
    /// last token's literal, or `0` for an empty stream.
    end_offset: usize,
}

impl<'t> Parser<'t> {
    fn new(tokens: &'t [Token]) -> Self {
        let end_offset = tokens.last().map(|t| t.offset + t.literal.len()).unwrap_or(0);
        Parser { tokens, pos: 0, ids: NodeIdGenerator::default(), end_offset }
    }

    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn current_offset(&self) -> usize {
        self.peek().map(|t| t.offset).unwrap_or(self.end_offset)
    }

    fn advance(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn check_word(&self, word: &str) -> bool {
        self.peek().is_some_and(|t| t.is_word(word))
    }

    fn check_op(&self, op: &str) -> bool {
        self.peek().is_some_and(|t| t.is_op(op))
    }

    fn match_word(&mut self, word: &str) -> bool {
        let hit = self.check_word(word);
        if hit {
            self.pos += 1;
        }
        hit
    }

    fn match_op(&mut self, op: &str) -> bool {
        let hit = self.check_op(op);
        if hit {
            self.pos += 1;
        }
        hit
    }

    fn expect_word(&mut self, word: &str) -> Result<(), ParseError> {
        if self.match_word(word) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{word}'")))
        }
    }

    fn expect_op(&mut self, op: &str) -> Result<(), ParseError> {
        if self.match_op(op) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{op}'")))
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.current_offset())
    }

    /// Consumes a plain (non-reserved) identifier, used for names and type
    /// names alike -- the grammar never distinguishes them syntactically.
    fn expect_identifier(&mut self) -> Result<String, ParseError> {
        match self.peek() {
            Some(t) if t.kind == TokenKind::Identifier && !is_reserved(&t.literal) => {
                let literal = t.literal.clone();
                self.pos += 1;
                Ok(literal)
            }
            _ => Err(self.error("expected an identifier")),
        }
    }

    fn fresh(&mut self) -> NodeId {
        self.ids.fresh()
    }

    // ---- source = global* function* EOF ----

    fn parse_source(&mut self) -> Result<Source, ParseError> {
        let mut globals = Vec::new();
        while self.check_word("LIST") || self.check_word("VAR") || self.check_word("VAL") {
            globals.push(self.parse_global()?);
        }
        let mut functions = Vec::new();
        while self.check_word("FUN") {
            functions.push(self.parse_function()?);
        }
        if !self.is_at_end() {
            return Err(self.error("expected a global or function declaration"));
        }
        Ok(Source { globals, functions })
    }

    fn parse_global(&mut self) -> Result<Global, ParseError> {
        let offset = self.current_offset();
        let global = if self.match_word("LIST") {
            self.parse_list_global(offset)
        } else if self.match_word("VAR") {
            self.parse_mutable_global(offset)
        } else if self.match_word("VAL") {
            self.parse_immutable_global(offset)
        } else {
            Err(self.error("expected 'LIST', 'VAR', or 'VAL'"))
        }?;
        self.expect_op(";")?;
        Ok(global)
    }

    fn parse_list_global(&mut self, offset: usize) -> Result<Global, ParseError> {
        let name = self.expect_identifier()?;
        self.expect_op(":")?;
        let type_name = self.expect_identifier()?;
        self.expect_op("=")?;
        let list_offset = self.current_offset();
        self.expect_op("[")?;
        let mut elements = Vec::new();
        if !self.check_op("]") {
            elements.push(self.parse_expression()?);
            while self.match_op(",") {
                elements.push(self.parse_expression()?);
            }
        }
        self.expect_op("]")?;
        let initializer = Expr::List { id: self.fresh(), elements, offset: list_offset };
        Ok(Global {
            id: self.fresh(),
            kind: GlobalKind::List,
            name,
            type_name,
            mutable: true,
            initializer: Some(initializer),
            offset,
        })
    }

    fn parse_mutable_global(&mut self, offset: usize) -> Result<Global, ParseError> {
        let name = self.expect_identifier()?;
        self.expect_op(":")?;
        let type_name = self.expect_identifier()?;
        let initializer =
            if self.match_op("=") { Some(self.parse_expression()?) } else { None };
        Ok(Global {
            id: self.fresh(),
            kind: GlobalKind::Var,
            name,
            type_name,
            mutable: true,
            initializer,
            offset,
        })
    }

    fn parse_immutable_global(&mut self, offset: usize) -> Result<Global, ParseError> {
        let name = self.expect_identifier()?;
        self.expect_op(":")?;
        let type_name = self.expect_identifier()?;
        self.expect_op("=")?;
        let initializer = self.parse_expression()?;
        Ok(Global {
            id: self.fresh(),
            kind: GlobalKind::Val,
            name,
            type_name,
            mutable: false,
            initializer: Some(initializer),
            offset,
        })
    }

    // ---- function = "FUN" IDENT "(" params? ")" (":" IDENT)? "DO" block "END" ----

    fn parse_function(&mut self) -> Result<Function, ParseError> {
        let offset = self.current_offset();
        self.expect_word("FUN")?;
        let name = self.expect_identifier()?;
        self.expect_op("(")?;
        let mut param_names = Vec::new();
        let mut param_type_names = Vec::new();
        if !self.check_op(")") {
            loop {
                param_names.push(self.expect_identifier()?);
                self.expect_op(":")?;
                param_type_names.push(self.expect_identifier()?);
                if !self.match_op(",") {
                    break;
                }
            }
        }
        self.expect_op(")")?;
        let return_type_name =
            if self.match_op(":") { Some(self.expect_identifier()?) } else { None };
        self.expect_word("DO")?;
        let body = self.parse_block()?;
        self.expect_word("END")?;
        Ok(Function {
            id: self.fresh(),
            name,
            param_names,
            param_type_names,
            return_type_name,
            body,
            offset,
        })
    }

    fn at_block_terminator(&self) -> bool {
        self.is_at_end()
            || self.check_word("END")
            || self.check_word("ELSE")
            || self.check_word("CASE")
            || self.check_word("DEFAULT")
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut statements = Vec::new();
        while !self.at_block_terminator() {
            statements.push(self.parse_statement()?);
        }
        Ok(statements)
    }

    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        let offset = self.current_offset();
        if self.match_word("LET") {
            return self.parse_declaration(offset);
        }
        if self.match_word("SWITCH") {
            return self.parse_switch(offset);
        }
        if self.match_word("IF") {
            return self.parse_if(offset);
        }
        if self.match_word("WHILE") {
            return self.parse_while(offset);
        }
        if self.match_word("RETURN") {
            let value = self.parse_expression()?;
            self.expect_op(";")?;
            return Ok(Stmt::Return { id: self.fresh(), value, offset });
        }

        let expr = self.parse_expression()?;
        let stmt = if self.match_op("=") {
            let value = self.parse_expression()?;
            Stmt::Assignment { receiver: expr, value, offset }
        } else {
            Stmt::Expression(expr)
        };
        self.expect_op(";")?;
        Ok(stmt)
    }

    fn parse_declaration(&mut self, offset: usize) -> Result<Stmt, ParseError> {
        let name = self.expect_identifier()?;
        let type_name = if self.match_op(":") { Some(self.expect_identifier()?) } else { None };
        let initializer =
            if self.match_op("=") { Some(self.parse_expression()?) } else { None };
        self.expect_op(";")?;
        Ok(Stmt::Declaration { id: self.fresh(), name, type_name, initializer, offset })
    }

    fn parse_if(&mut self, offset: usize) -> Result<Stmt, ParseError> {
        let cond = self.parse_expression()?;
        self.expect_word("DO")?;
        let then_branch = self.parse_block()?;
        let else_branch = if self.match_word("ELSE") { self.parse_block()? } else { Vec::new() };
        self.expect_word("END")?;
        Ok(Stmt::If { cond, then_branch, else_branch, offset })
    }

    fn parse_switch(&mut self, offset: usize) -> Result<Stmt, ParseError> {
        let cond = self.parse_expression()?;
        let mut cases = Vec::new();
        while self.check_word("CASE") {
            let case_offset = self.current_offset();
            self.advance();
            let value = self.parse_expression()?;
            self.expect_op(":")?;
            let body = self.parse_block()?;
            cases.push(Case { id: self.fresh(), value: Some(value), body, offset: case_offset });
        }
        let default_offset = self.current_offset();
        self.expect_word("DEFAULT")?;
        let body = self.parse_block()?;
        cases.push(Case { id: self.fresh(), value: None, body, offset: default_offset });
        self.expect_word("END")?;
        Ok(Stmt::Switch { cond, cases, offset })
    }

    fn parse_while(&mut self, offset: usize) -> Result<Stmt, ParseError> {
        let cond = self.parse_expression()?;
        self.expect_word("DO")?;
        let body = self.parse_block()?;
        self.expect_word("END")?;
        Ok(Stmt::While { cond, body, offset })
    }

    // ---- expression = logical; fixed left-associative precedence ladder ----

    fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_logical()
    }

    fn parse_logical(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_level(&["&&", "||"], Self::parse_comparison)
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_level(&["<", ">", "==", "!="], Self::parse_additive)
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_level(&["+", "-"], Self::parse_multiplicative)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_level(&["*", "/", "^"], Self::parse_primary)
    }

    /// One level of the precedence ladder: parse an operand via `next`,
    /// then fold in `(op operand)*` left-associatively for any operator in
    /// `operators`. `^` is parsed here too (at the multiplicative level),
    /// not given its own right-associative level, per §4.1.
    fn parse_binary_level(
        &mut self,
        operators: &[&str],
        next: fn(&mut Self) -> Result<Expr, ParseError>,
    ) -> Result<Expr, ParseError> {
        let mut left = next(self)?;
        loop {
            let Some(op) = operators.iter().find(|op| self.check_op(op)) else { break };
            let offset = self.current_offset();
            let op = op.to_string();
            self.advance();
            let right = next(self)?;
            left = Expr::Binary {
                id: self.fresh(),
                op,
                left: Box::new(left),
                right: Box::new(right),
                offset,
            };
        }
        Ok(left)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let offset = self.current_offset();

        if self.match_word("NIL") {
            return Ok(Expr::Literal { id: self.fresh(), value: Literal::Nil, offset });
        }
        if self.match_word("TRUE") {
            return Ok(Expr::Literal { id: self.fresh(), value: Literal::Boolean(true), offset });
        }
        if self.match_word("FALSE") {
            return Ok(Expr::Literal { id: self.fresh(), value: Literal::Boolean(false), offset });
        }

        match self.peek().map(|t| t.kind) {
            Some(TokenKind::Integer) => {
                let literal = self.advance().unwrap().literal.clone();
                let value = BigInt::parse_bytes(literal.as_bytes(), 10)
                    .ok_or_else(|| ParseError::new(format!("invalid integer literal '{literal}'"), offset))?;
                return Ok(Expr::Literal { id: self.fresh(), value: Literal::Integer(value), offset });
            }
            Some(TokenKind::Decimal) => {
                let literal = self.advance().unwrap().literal.clone();
                let value = BigDecimal::from_str(&literal)
                    .map_err(|_| ParseError::new(format!("invalid decimal literal '{literal}'"), offset))?;
                return Ok(Expr::Literal { id: self.fresh(), value: Literal::Decimal(value), offset });
            }
            Some(TokenKind::Character) => {
                let literal = self.advance().unwrap().literal.clone();
                let value = expand_character_escape(&literal, offset)?;
                return Ok(Expr::Literal { id: self.fresh(), value: Literal::Character(value), offset });
            }
            Some(TokenKind::String) => {
                let literal = self.advance().unwrap().literal.clone();
                let value = expand_string_escapes(&literal);
                return Ok(Expr::Literal { id: self.fresh(), value: Literal::String(value), offset });
            }
            _ => {}
        }

        if self.match_op("(") {
            let inner = self.parse_expression()?;
            self.expect_op(")")?;
            return Ok(Expr::Group { id: self.fresh(), inner: Box::new(inner), offset });
        }

        if self.peek().is_some_and(|t| t.kind == TokenKind::Identifier && !is_reserved(&t.literal)) {
            let name = self.advance().unwrap().literal.clone();

            if self.match_op("(") {
                let mut args = Vec::new();
                if !self.check_op(")") {
                    args.push(self.parse_expression()?);
                    while self.match_op(",") {
                        args.push(self.parse_expression()?);
                    }
                }
                self.expect_op(")")?;
                return Ok(Expr::Call { id: self.fresh(), name, args, offset });
            }

            if self.match_op("[") {
                let index = self.parse_expression()?;
                self.expect_op("]")?;
                return Ok(Expr::Access {
                    id: self.fresh(),
                    name,
                    index: Some(Box::new(index)),
                    offset,
                });
            }

            return Ok(Expr::Access { id: self.fresh(), name, index: None, offset });
        }

        Err(self.error("expected an expression"))
    }
}

fn expand_escape(escape: char) -> Option<char> {
    Some(match escape {
        'b' => '\u{8}',
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        '\'' => '\'',
        '"' => '"',
        '\\' => '\\',
        _ => return None,
    })
}

/// Expands the body of a [TokenKind::Character] token (surrounding quotes
/// already stripped by the lexer) into a single `char`.
fn expand_character_escape(literal: &str, offset: usize) -> Result<char, ParseError> {
    let mut chars = literal.chars();
    let first = chars
        .next()
        .ok_or_else(|| ParseError::new("empty character literal", offset))?;
    let value = if first == '\\' {
        let escape = chars
            .next()
            .ok_or_else(|| ParseError::new("dangling escape in character literal", offset))?;
        expand_escape(escape)
            .ok_or_else(|| ParseError::new(format!("unknown escape '\\{escape}'"), offset))?
    } else {
        first
    };
    if chars.next().is_some() {
        return Err(ParseError::new("character literal holds more than one character", offset));
    }
    Ok(value)
}

/// Expands every escape in the body of a [TokenKind::String] token
/// (surrounding quotes already stripped by the lexer), including `\\` to a
/// single backslash.
fn expand_string_escapes(literal: &str) -> String {
    let mut out = String::with_capacity(literal.len());
    let mut chars = literal.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escape) = chars.next() {
                out.push(expand_escape(escape).unwrap_or(escape));
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::lexer::scan;

    fn parse_str(source: &str) -> Result<Source, ParseError> {
        let tokens = scan(source);
        parse(&tokens)
    }

    #[test]
    fn parses_minimal_main() {
        let source = parse_str("FUN main(): Integer DO RETURN 0; END").unwrap();
        assert!(source.globals.is_empty());
        assert_eq!(source.functions.len(), 1);
        assert_eq!(source.functions[0].name, "main");
        assert_eq!(source.functions[0].return_type_name.as_deref(), Some("Integer"));
        assert_eq!(source.functions[0].body.len(), 1);
    }

    #[test]
    fn parses_val_global_with_initializer() {
        let source = parse_str("VAL answer: Integer = 42; FUN main(): Integer DO RETURN 0; END").unwrap();
        assert_eq!(source.globals.len(), 1);
        assert_eq!(source.globals[0].name, "answer");
        assert!(!source.globals[0].mutable);
        assert!(source.globals[0].initializer.is_some());
    }

    #[test]
    fn parses_list_global() {
        let source = parse_str("LIST xs: Integer = [1,2,3]; FUN main(): Integer DO RETURN 0; END").unwrap();
        let global = &source.globals[0];
        assert_eq!(global.kind, GlobalKind::List);
        match global.initializer.as_ref().unwrap() {
            Expr::List { elements, .. } => assert_eq!(elements.len(), 3),
            other => panic!("expected a list initializer, got {other:?}"),
        }
    }

    #[test]
    fn left_associates_additive_operators() {
        let source = parse_str("FUN main(): Integer DO RETURN 1 - 2 - 3; END").unwrap();
        match &source.functions[0].body[0] {
            Stmt::Return { value: Expr::Binary { op, left, .. }, .. } => {
                assert_eq!(op, "-");
                assert!(matches!(**left, Expr::Binary { .. }));
            }
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn caret_is_left_associative_not_right() {
        // 2 ^ 3 ^ 2 parses as (2 ^ 3) ^ 2, matching the rest of the ladder
        // (the grammar explicitly calls out no right-associativity for ^).
        let source = parse_str("FUN main(): Integer DO RETURN 2 ^ 3 ^ 2; END").unwrap();
        match &source.functions[0].body[0] {
            Stmt::Return { value: Expr::Binary { op, left, .. }, .. } => {
                assert_eq!(op, "^");
                assert!(matches!(**left, Expr::Binary { .. }));
            }
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn parses_switch_with_default() {
        let source = parse_str(
            "FUN main(): Integer DO LET x: Integer = 2; SWITCH x CASE 1: RETURN 10; CASE 2: RETURN 20; DEFAULT RETURN 30; END END",
        )
        .unwrap();
        match &source.functions[0].body[1] {
            Stmt::Switch { cases, .. } => {
                assert_eq!(cases.len(), 3);
                assert!(cases[0].value.is_some());
                assert!(cases[2].value.is_none());
            }
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn parses_list_index_access_and_assignment() {
        let source = parse_str(
            "LIST xs: Integer = [1,2,3]; FUN main(): Integer DO xs[1] = 9; RETURN xs[1]; END",
        )
        .unwrap();
        match &source.functions[0].body[0] {
            Stmt::Assignment { receiver: Expr::Access { name, index, .. }, .. } => {
                assert_eq!(name, "xs");
                assert!(index.is_some());
            }
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn expands_character_and_string_escapes() {
        let source = parse_str(r#"FUN main(): Integer DO LET c: Character = '\n'; LET s: String = "a\tb"; RETURN 0; END"#).unwrap();
        match &source.functions[0].body[0] {
            Stmt::Declaration { initializer: Some(Expr::Literal { value: Literal::Character(c), .. }), .. } => {
                assert_eq!(*c, '\n');
            }
            other => panic!("unexpected statement: {other:?}"),
        }
        match &source.functions[0].body[1] {
            Stmt::Declaration { initializer: Some(Expr::Literal { value: Literal::String(s), .. }), .. } => {
                assert_eq!(s, "a\tb");
            }
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn unexpected_token_carries_an_offset() {
        let err = parse_str("FUN main(): Integer DO RETURN ; END").unwrap_err();
        assert!(err.offset > 0);
    }

    #[test]
    fn exhausted_stream_reports_end_offset() {
        let err = parse_str("FUN main(): Integer DO RETURN 0;").unwrap_err();
        assert_eq!(err.offset, "FUN main(): Integer DO RETURN 0;".len());
    }
}
