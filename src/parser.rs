// src/parser.rs

use tracing::debug;

use crate::ast::{BinOp, Term};
use crate::error::{SyntaxError, SyntaxErrorKind};
use crate::lexer::{tokenize, Keyword, Spanned, Token};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Assoc {
    Left,
    Right,
    NonAssoc,
}

#[derive(Debug, Clone, Copy)]
enum Infix {
    Op(BinOp),
    Cons,
}

// Binary operators handled by precedence climbing. Unary minus, `^` and
// application bind tighter than everything here and are parsed below it.
fn infix_info(token: &Token) -> Option<(Infix, u8, Assoc)> {
    let info = match token {
        Token::EqEq => (Infix::Op(BinOp::Eq), 1, Assoc::NonAssoc),
        Token::NotEq => (Infix::Op(BinOp::Ne), 1, Assoc::NonAssoc),
        Token::Less => (Infix::Op(BinOp::Lt), 1, Assoc::NonAssoc),
        Token::LessEq => (Infix::Op(BinOp::Le), 1, Assoc::NonAssoc),
        Token::Greater => (Infix::Op(BinOp::Gt), 1, Assoc::NonAssoc),
        Token::GreaterEq => (Infix::Op(BinOp::Ge), 1, Assoc::NonAssoc),
        Token::Colon => (Infix::Cons, 2, Assoc::Right),
        Token::Plus => (Infix::Op(BinOp::Add), 3, Assoc::Left),
        Token::Minus => (Infix::Op(BinOp::Sub), 3, Assoc::Left),
        Token::Star => (Infix::Op(BinOp::Mul), 4, Assoc::Left),
        Token::Slash => (Infix::Op(BinOp::Div), 4, Assoc::Left),
        _ => return None,
    };
    Some(info)
}

const LOWEST_PRECEDENCE: u8 = 1;

// Nesting (parentheses, right-associative chains, prefix operators) recurses;
// the stack is grown on demand once it runs low.
const STACK_RED_ZONE: usize = 64 * 1024;
const STACK_GROWTH_SIZE: usize = 1024 * 1024;

fn starts_atom(token: &Token) -> bool {
    matches!(
        token,
        Token::Number(_)
            | Token::Ident(_)
            | Token::LParen
            | Token::Lambda
            | Token::Keyword(
                Keyword::Let | Keyword::LetRec | Keyword::If | Keyword::Nil | Keyword::Hd | Keyword::Tl
            )
    )
}

// --- The Parser ---
pub struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    pub fn new(input: &str) -> Result<Self, SyntaxError> {
        Ok(Parser {
            tokens: tokenize(input)?,
            pos: 0,
        })
    }

    // The token vector always ends with `Token::Eof` and `pos` never moves past it.
    fn peek(&self) -> &Token { &self.tokens[self.pos].token }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].token.clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn error_here(&self, expected: &str) -> SyntaxError {
        let spanned = &self.tokens[self.pos];
        let kind = match &spanned.token {
            Token::Eof => SyntaxErrorKind::UnexpectedEnd {
                expected: expected.to_string(),
            },
            found => SyntaxErrorKind::UnexpectedToken {
                found: found.to_string(),
                expected: expected.to_string(),
            },
        };
        SyntaxError { kind, line: spanned.line, col: spanned.col }
    }

    fn expect(&mut self, token: Token, expected: &str) -> Result<(), SyntaxError> {
        if *self.peek() == token {
            self.advance();
            Ok(())
        } else {
            Err(self.error_here(expected))
        }
    }

    fn expect_ident(&mut self) -> Result<String, SyntaxError> {
        match self.peek() {
            Token::Ident(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.error_here("an identifier")),
        }
    }

    pub fn parse(&mut self) -> Result<Term, SyntaxError> {
        let term = self.parse_expr()?;
        if *self.peek() != Token::Eof {
            return Err(self.error_here("an operator or end of input"));
        }
        Ok(term)
    }

    fn parse_expr(&mut self) -> Result<Term, SyntaxError> {
        self.parse_binary(LOWEST_PRECEDENCE)
    }

    fn parse_binary(&mut self, min_prec: u8) -> Result<Term, SyntaxError> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH_SIZE, || self.parse_binary_impl(min_prec))
    }

    fn parse_binary_impl(&mut self, min_prec: u8) -> Result<Term, SyntaxError> {
        let mut lhs = self.parse_unary()?;

        while let Some((infix, prec, assoc)) = infix_info(self.peek()) {
            if prec < min_prec {
                break;
            }
            self.advance();

            let next_min = match assoc {
                Assoc::Right => prec,
                Assoc::Left | Assoc::NonAssoc => prec + 1,
            };
            let rhs = self.parse_binary(next_min)?;
            lhs = match infix {
                Infix::Op(op) => Term::binop(op, lhs, rhs),
                Infix::Cons => Term::cons(lhs, rhs),
            };

            if assoc == Assoc::NonAssoc {
                if let Some((_, next_prec, _)) = infix_info(self.peek()) {
                    if next_prec == prec {
                        let spanned = &self.tokens[self.pos];
                        return Err(SyntaxError {
                            kind: SyntaxErrorKind::NonAssociative(spanned.token.to_string()),
                            line: spanned.line,
                            col: spanned.col,
                        });
                    }
                }
            }
        }

        Ok(lhs)
    }

    // `---2` nests to the right; the operand covers a whole application chain.
    fn parse_unary(&mut self) -> Result<Term, SyntaxError> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH_SIZE, || self.parse_unary_impl())
    }

    fn parse_unary_impl(&mut self) -> Result<Term, SyntaxError> {
        if *self.peek() == Token::Minus {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Term::neg(operand));
        }
        self.parse_power()
    }

    // `^` is right associative and binds tighter than unary minus: `-3^2` is `-(3^2)`.
    fn parse_power(&mut self) -> Result<Term, SyntaxError> {
        let base = self.parse_application()?;
        if *self.peek() == Token::Caret {
            self.advance();
            let exponent = self.parse_unary()?;
            return Ok(Term::binop(BinOp::Pow, base, exponent));
        }
        Ok(base)
    }

    fn parse_application(&mut self) -> Result<Term, SyntaxError> {
        let mut app = self.parse_atom()?;
        while starts_atom(self.peek()) {
            let arg = self.parse_atom()?;
            app = Term::app(app, arg);
        }
        Ok(app)
    }

    fn parse_atom(&mut self) -> Result<Term, SyntaxError> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH_SIZE, || self.parse_atom_impl())
    }

    fn parse_atom_impl(&mut self) -> Result<Term, SyntaxError> {
        match self.peek().clone() {
            Token::Number(n) => {
                self.advance();
                Ok(Term::Num(n))
            }
            Token::Ident(name) => {
                self.advance();
                Ok(Term::Var(name))
            }
            Token::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(Token::RParen, "')'")?;
                Ok(inner)
            }
            Token::Lambda => self.parse_lambda(),
            Token::Keyword(Keyword::Let) => self.parse_let(false),
            Token::Keyword(Keyword::LetRec) => self.parse_let(true),
            Token::Keyword(Keyword::If) => self.parse_if(),
            Token::Keyword(Keyword::Nil) => {
                self.advance();
                Ok(Term::Nil)
            }
            Token::Keyword(Keyword::Hd) => {
                self.advance();
                Ok(Term::head(self.parse_atom()?))
            }
            Token::Keyword(Keyword::Tl) => {
                self.advance();
                Ok(Term::tail(self.parse_atom()?))
            }
            _ => Err(self.error_here("an expression")),
        }
    }

    // Binder bodies extend as far right as possible.
    fn parse_lambda(&mut self) -> Result<Term, SyntaxError> {
        self.advance(); // consume '\' or 'λ'
        let param = self.expect_ident()?;
        self.expect(Token::Dot, "'.' in lambda")?;
        let body = self.parse_expr()?;
        Ok(Term::lam(&param, body))
    }

    fn parse_let(&mut self, is_rec: bool) -> Result<Term, SyntaxError> {
        self.advance(); // consume 'let' or 'letrec'
        let name = self.expect_ident()?;
        self.expect(Token::Assign, "'='")?;
        let bound = self.parse_expr()?;
        self.expect(Token::Keyword(Keyword::In), "'in'")?;
        let body = self.parse_expr()?;

        if is_rec {
            Ok(Term::letrec_in(&name, bound, body))
        } else {
            Ok(Term::let_in(&name, bound, body))
        }
    }

    fn parse_if(&mut self) -> Result<Term, SyntaxError> {
        self.advance(); // consume 'if'
        let cond = self.parse_expr()?;
        self.expect(Token::Keyword(Keyword::Then), "'then'")?;
        let then_branch = self.parse_expr()?;
        self.expect(Token::Keyword(Keyword::Else), "'else'")?;
        let else_branch = self.parse_expr()?;
        Ok(Term::if_then_else(cond, then_branch, else_branch))
    }
}

// Convenience function for parsing
pub fn parse(input: &str) -> Result<Term, SyntaxError> {
    let term = Parser::new(input)?.parse()?;
    debug!(term = %term, "parsed");
    Ok(term)
}
