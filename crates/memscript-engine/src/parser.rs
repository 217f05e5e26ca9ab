//! Recursive-descent parser over the logos token stream.
//!
//! Precedence, loosest first: `||`, `&&`, equality, comparison, additive,
//! multiplicative, unary, postfix (`.field`, `[index]`, `(args)`).

use crate::ast::{BinOp, Expr, Stmt, StmtKind, UnaryOp};
use crate::lexer::Token;
use logos::Logos;
use memscript_core::{Error, Result};
use std::ops::Range;

pub fn parse(src: &str) -> Result<Vec<Stmt>> {
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(src);
    while let Some(item) = lexer.next() {
        let span = lexer.span();
        match item {
            Ok(token) => tokens.push((token, span)),
            Err(()) => {
                return Err(Error::parse(
                    line_of(src, span.start),
                    format!("unexpected character {:?}", &src[span.clone()]),
                ))
            }
        }
    }
    let mut parser = Parser {
        src,
        tokens,
        pos: 0,
    };
    let mut stmts = Vec::new();
    while !parser.at_end() {
        stmts.push(parser.statement()?);
    }
    Ok(stmts)
}

fn line_of(src: &str, offset: usize) -> usize {
    src[..offset.min(src.len())]
        .bytes()
        .filter(|b| *b == b'\n')
        .count()
        + 1
}

struct Parser<'a> {
    src: &'a str,
    tokens: Vec<(Token, Range<usize>)>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn line(&self) -> usize {
        match self.tokens.get(self.pos).or_else(|| self.tokens.last()) {
            Some((_, span)) => line_of(self.src, span.start),
            None => 1,
        }
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(t, _)| t.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn check(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token) -> Result<()> {
        if self.check(&token) {
            return Ok(());
        }
        let found = match self.peek() {
            Some(t) => format!("found '{}'", t),
            None => "found end of script".to_string(),
        };
        Err(Error::parse(
            self.line(),
            format!("expected '{}', {}", token, found),
        ))
    }

    fn expect_ident(&mut self) -> Result<String> {
        match self.advance() {
            Some(Token::Ident(name)) => Ok(name),
            Some(t) => Err(Error::parse(
                self.line(),
                format!("expected a name, found '{}'", t),
            )),
            None => Err(Error::parse(self.line(), "expected a name")),
        }
    }

    // --- statements ---

    fn statement(&mut self) -> Result<Stmt> {
        let line = self.line();
        let kind = match self.peek() {
            Some(Token::Let) => {
                self.pos += 1;
                let name = self.expect_ident()?;
                self.expect(Token::Assign)?;
                let value = self.expression()?;
                self.expect(Token::Semi)?;
                StmtKind::Let { name, value }
            }
            Some(Token::If) => {
                self.pos += 1;
                self.if_tail()?
            }
            Some(Token::While) => {
                self.pos += 1;
                let cond = self.expression()?;
                let body = self.block()?;
                StmtKind::While { cond, body }
            }
            Some(Token::For) => {
                self.pos += 1;
                let var = self.expect_ident()?;
                self.expect(Token::In)?;
                let iter = self.expression()?;
                let body = self.block()?;
                StmtKind::For { var, iter, body }
            }
            Some(Token::Break) => {
                self.pos += 1;
                self.expect(Token::Semi)?;
                StmtKind::Break
            }
            Some(Token::Continue) => {
                self.pos += 1;
                self.expect(Token::Semi)?;
                StmtKind::Continue
            }
            _ => {
                let expr = self.expression()?;
                if self.check(&Token::Assign) {
                    let assignable = matches!(
                        expr,
                        Expr::Ident(_) | Expr::Index { .. } | Expr::Field { .. }
                    );
                    if !assignable {
                        return Err(Error::parse(line, "left side cannot be assigned to"));
                    }
                    let value = self.expression()?;
                    self.expect(Token::Semi)?;
                    StmtKind::Assign {
                        target: expr,
                        value,
                    }
                } else {
                    self.expect(Token::Semi)?;
                    StmtKind::Expr(expr)
                }
            }
        };
        Ok(Stmt { line, kind })
    }

    fn if_tail(&mut self) -> Result<StmtKind> {
        let cond = self.expression()?;
        let then_block = self.block()?;
        let else_block = if self.check(&Token::Else) {
            if self.check(&Token::If) {
                // else-if chains nest as a one-statement else block
                let line = self.line();
                let kind = self.if_tail()?;
                Some(vec![Stmt { line, kind }])
            } else {
                Some(self.block()?)
            }
        } else {
            None
        };
        Ok(StmtKind::If {
            cond,
            then_block,
            else_block,
        })
    }

    fn block(&mut self) -> Result<Vec<Stmt>> {
        self.expect(Token::LBrace)?;
        let mut stmts = Vec::new();
        while !self.check(&Token::RBrace) {
            if self.at_end() {
                return Err(Error::parse(self.line(), "unclosed block, expected '}'"));
            }
            stmts.push(self.statement()?);
        }
        Ok(stmts)
    }

    // --- expressions ---

    fn expression(&mut self) -> Result<Expr> {
        self.or_expr()
    }

    fn or_expr(&mut self) -> Result<Expr> {
        let mut lhs = self.and_expr()?;
        while self.check(&Token::OrOr) {
            let rhs = self.and_expr()?;
            lhs = binary(BinOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> Result<Expr> {
        let mut lhs = self.equality()?;
        while self.check(&Token::AndAnd) {
            let rhs = self.equality()?;
            lhs = binary(BinOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn equality(&mut self) -> Result<Expr> {
        let mut lhs = self.comparison()?;
        loop {
            let op = match self.peek() {
                Some(Token::EqEq) => BinOp::Eq,
                Some(Token::NotEq) => BinOp::Ne,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.comparison()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn comparison(&mut self) -> Result<Expr> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Lt) => BinOp::Lt,
                Some(Token::Le) => BinOp::Le,
                Some(Token::Gt) => BinOp::Gt,
                Some(Token::Ge) => BinOp::Ge,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.term()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr> {
        let mut lhs = self.factor()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.factor()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn factor(&mut self) -> Result<Expr> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                Some(Token::Percent) => BinOp::Rem,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr> {
        let op = match self.peek() {
            Some(Token::Bang) => Some(UnaryOp::Not),
            Some(Token::Minus) => Some(UnaryOp::Neg),
            _ => None,
        };
        if let Some(op) = op {
            self.pos += 1;
            let expr = self.unary()?;
            return Ok(Expr::Unary {
                op,
                expr: Box::new(expr),
            });
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr> {
        let mut expr = self.primary()?;
        loop {
            if self.check(&Token::Dot) {
                let name = self.expect_ident()?;
                expr = Expr::Field {
                    target: Box::new(expr),
                    name,
                };
            } else if self.check(&Token::LBracket) {
                let index = self.expression()?;
                self.expect(Token::RBracket)?;
                expr = Expr::Index {
                    target: Box::new(expr),
                    index: Box::new(index),
                };
            } else if self.check(&Token::LParen) {
                let mut args = Vec::new();
                if !self.check(&Token::RParen) {
                    loop {
                        args.push(self.expression()?);
                        if self.check(&Token::RParen) {
                            break;
                        }
                        self.expect(Token::Comma)?;
                    }
                }
                expr = Expr::Call {
                    target: Box::new(expr),
                    args,
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr> {
        let line = self.line();
        match self.advance() {
            Some(Token::Null) => Ok(Expr::Null),
            Some(Token::True) => Ok(Expr::Bool(true)),
            Some(Token::False) => Ok(Expr::Bool(false)),
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Str(s)) => Ok(Expr::Str(s)),
            Some(Token::Ident(name)) => Ok(Expr::Ident(name)),
            Some(Token::LParen) => {
                let expr = self.expression()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            Some(Token::LBracket) => {
                let mut items = Vec::new();
                if !self.check(&Token::RBracket) {
                    loop {
                        items.push(self.expression()?);
                        if self.check(&Token::RBracket) {
                            break;
                        }
                        self.expect(Token::Comma)?;
                    }
                }
                Ok(Expr::Array(items))
            }
            Some(Token::LBrace) => {
                let mut fields = Vec::new();
                if !self.check(&Token::RBrace) {
                    loop {
                        let key = match self.advance() {
                            Some(Token::Str(s)) => s,
                            Some(Token::Ident(s)) => s,
                            other => {
                                return Err(Error::parse(
                                    line,
                                    format!(
                                        "expected object key, found {}",
                                        other.map_or("end of script".to_string(), |t| format!(
                                            "'{}'",
                                            t
                                        ))
                                    ),
                                ))
                            }
                        };
                        self.expect(Token::Colon)?;
                        fields.push((key, self.expression()?));
                        if self.check(&Token::RBrace) {
                            break;
                        }
                        self.expect(Token::Comma)?;
                    }
                }
                Ok(Expr::Object(fields))
            }
            Some(t) => Err(Error::parse(
                line,
                format!("unexpected '{}' in expression", t),
            )),
            None => Err(Error::parse(line, "unexpected end of script")),
        }
    }
}

fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_let_and_call() {
        let stmts = parse(r#"let g = graph.read_graph(); log(g);"#).unwrap();
        assert_eq!(stmts.len(), 2);
        assert!(matches!(stmts[0].kind, StmtKind::Let { .. }));
        assert!(matches!(stmts[1].kind, StmtKind::Expr(Expr::Call { .. })));
    }

    #[test]
    fn precedence_binds_mul_over_add() {
        let stmts = parse("let x = 1 + 2 * 3;").unwrap();
        let StmtKind::Let { value, .. } = &stmts[0].kind else {
            panic!()
        };
        let Expr::Binary { op: BinOp::Add, rhs, .. } = value else {
            panic!("expected +, got {:?}", value)
        };
        assert!(matches!(**rhs, Expr::Binary { op: BinOp::Mul, .. }));
    }

    #[test]
    fn parses_for_over_array_literal() {
        let stmts = parse(r#"for name in ["a", "b"] { log(name); }"#).unwrap();
        assert!(matches!(stmts[0].kind, StmtKind::For { .. }));
    }

    #[test]
    fn parses_else_if_chain() {
        let src = "if a { log(1); } else if b { log(2); } else { log(3); }";
        let stmts = parse(src).unwrap();
        let StmtKind::If { else_block, .. } = &stmts[0].kind else {
            panic!()
        };
        let inner = else_block.as_ref().unwrap();
        assert!(matches!(inner[0].kind, StmtKind::If { .. }));
    }

    #[test]
    fn parses_index_assignment() {
        let stmts = parse(r#"xs[0] = 5;"#).unwrap();
        assert!(matches!(
            stmts[0].kind,
            StmtKind::Assign {
                target: Expr::Index { .. },
                ..
            }
        ));
    }

    #[test]
    fn object_literal_with_ident_and_string_keys() {
        let stmts = parse(r#"let e = { name: "a", "entityType": "t" };"#).unwrap();
        let StmtKind::Let { value: Expr::Object(fields), .. } = &stmts[0].kind else {
            panic!()
        };
        assert_eq!(fields[0].0, "name");
        assert_eq!(fields[1].0, "entityType");
    }

    #[test]
    fn missing_semicolon_reports_line() {
        let err = parse("let x = 1;\nlet y = 2").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("line 2"), "{}", msg);
    }

    #[test]
    fn literal_is_not_assignable() {
        let err = parse("3 = 4;").unwrap_err();
        assert!(err.to_string().contains("assigned"));
    }

    #[test]
    fn unclosed_block_is_an_error() {
        assert!(parse("while true { log(1);").is_err());
    }
}
