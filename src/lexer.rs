// src/lexer.rs

use std::fmt;

use phf::phf_map;

use crate::error::{SyntaxError, SyntaxErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Let,
    LetRec,
    In,
    If,
    Then,
    Else,
    Nil,
    Hd,
    Tl,
}

static KEYWORDS: phf::Map<&'static str, Keyword> = phf_map! {
    "let" => Keyword::Let,
    "letrec" => Keyword::LetRec,
    "in" => Keyword::In,
    "if" => Keyword::If,
    "then" => Keyword::Then,
    "else" => Keyword::Else,
    "nil" => Keyword::Nil,
    "hd" => Keyword::Hd,
    "tl" => Keyword::Tl,
};

impl Keyword {
    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::Let => "let",
            Keyword::LetRec => "letrec",
            Keyword::In => "in",
            Keyword::If => "if",
            Keyword::Then => "then",
            Keyword::Else => "else",
            Keyword::Nil => "nil",
            Keyword::Hd => "hd",
            Keyword::Tl => "tl",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Ident(String),
    Keyword(Keyword),
    Lambda,
    Dot,
    LParen,
    RParen,
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Colon,
    Assign,
    EqEq,
    NotEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{}", n),
            Token::Ident(name) => write!(f, "{}", name),
            Token::Keyword(kw) => write!(f, "{}", kw.as_str()),
            Token::Lambda => write!(f, "\\"),
            Token::Dot => write!(f, "."),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Caret => write!(f, "^"),
            Token::Colon => write!(f, ":"),
            Token::Assign => write!(f, "="),
            Token::EqEq => write!(f, "=="),
            Token::NotEq => write!(f, "!="),
            Token::Less => write!(f, "<"),
            Token::LessEq => write!(f, "<="),
            Token::Greater => write!(f, ">"),
            Token::GreaterEq => write!(f, ">="),
            Token::Eof => write!(f, "end of input"),
        }
    }
}

/// A token together with the position of its first character.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub line: usize,
    pub col: usize,
}

pub struct Lexer {
    input: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    fn current_char(&self) -> Option<char> { self.input.get(self.pos).copied() }
    fn peek_char(&self) -> Option<char> { self.input.get(self.pos + 1).copied() }

    fn advance(&mut self) {
        if let Some(c) = self.current_char() {
            if c == '\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
            self.pos += 1;
        }
    }

    fn skip_whitespace(&mut self) {
        loop {
            while let Some(c) = self.current_char() {
                if c.is_whitespace() {
                    self.advance();
                } else {
                    break;
                }
            }

            // Comments run from '#' to the end of the line.
            if self.current_char() == Some('#') {
                while let Some(c) = self.current_char() {
                    if c == '\n' {
                        break;
                    }
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    fn error(&self, kind: SyntaxErrorKind) -> SyntaxError {
        SyntaxError { kind, line: self.line, col: self.col }
    }

    /// Consumes the whole input. The returned vector always ends with `Token::Eof`.
    pub fn tokenize(mut self) -> Result<Vec<Spanned>, SyntaxError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace();
            let (line, col) = (self.line, self.col);
            let token = self.next_token()?;
            let done = token == Token::Eof;
            tokens.push(Spanned { token, line, col });
            if done {
                return Ok(tokens);
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, SyntaxError> {
        let c = match self.current_char() {
            Some(c) => c,
            None => return Ok(Token::Eof),
        };

        if c.is_ascii_digit() {
            return self.lex_number();
        }
        // 'λ' is alphabetic, so it must be claimed before identifiers are.
        if (c.is_alphabetic() && c != 'λ') || c == '_' {
            return Ok(self.lex_word());
        }

        let two_char = match (c, self.peek_char()) {
            ('=', Some('=')) => Some(Token::EqEq),
            ('!', Some('=')) => Some(Token::NotEq),
            ('<', Some('=')) => Some(Token::LessEq),
            ('>', Some('=')) => Some(Token::GreaterEq),
            _ => None,
        };
        if let Some(token) = two_char {
            self.advance();
            self.advance();
            return Ok(token);
        }

        let token = match c {
            '\\' | 'λ' => Token::Lambda,
            '.' => Token::Dot,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '^' => Token::Caret,
            ':' => Token::Colon,
            '=' => Token::Assign,
            '<' => Token::Less,
            '>' => Token::Greater,
            other => return Err(self.error(SyntaxErrorKind::UnexpectedChar(other))),
        };
        self.advance();
        Ok(token)
    }

    fn lex_number(&mut self) -> Result<Token, SyntaxError> {
        let start_line = self.line;
        let start_col = self.col;
        let mut s = String::new();

        self.take_digits(&mut s);

        // A '.' only belongs to the number when a digit follows it.
        if self.current_char() == Some('.') && self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
            s.push('.');
            self.advance();
            self.take_digits(&mut s);
        }

        if self.exponent_follows() {
            if let Some(c) = self.current_char() {
                s.push(c);
            }
            self.advance();
            if let Some(sign @ ('+' | '-')) = self.current_char() {
                s.push(sign);
                self.advance();
            }
            self.take_digits(&mut s);
        }

        s.parse::<f64>()
            .map(Token::Number)
            .map_err(|_| SyntaxError {
                kind: SyntaxErrorKind::InvalidNumber(s),
                line: start_line,
                col: start_col,
            })
    }

    fn exponent_follows(&self) -> bool {
        let at = |offset: usize| self.input.get(self.pos + offset).copied();
        match (at(0), at(1), at(2)) {
            (Some('e' | 'E'), Some(d), _) if d.is_ascii_digit() => true,
            (Some('e' | 'E'), Some('+' | '-'), Some(d)) => d.is_ascii_digit(),
            _ => false,
        }
    }

    fn take_digits(&mut self, s: &mut String) {
        while let Some(c) = self.current_char() {
            if c.is_ascii_digit() {
                s.push(c);
                self.advance();
            } else {
                break;
            }
        }
    }

    fn lex_word(&mut self) -> Token {
        let mut word = String::new();
        while let Some(c) = self.current_char() {
            if c.is_alphanumeric() || c == '_' || c == '\'' {
                word.push(c);
                self.advance();
            } else {
                break;
            }
        }
        match KEYWORDS.get(word.as_str()) {
            Some(kw) => Token::Keyword(*kw),
            None => Token::Ident(word),
        }
    }
}

pub fn tokenize(input: &str) -> Result<Vec<Spanned>, SyntaxError> {
    Lexer::new(input).tokenize()
}
