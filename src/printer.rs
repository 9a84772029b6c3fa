// src/printer.rs

use std::fmt;

use crate::ast::{BinOp, Term};

const STACK_RED_ZONE: usize = 32 * 1024;
const STACK_GROWTH_SIZE: usize = 1024 * 1024;

/// Renders a float the way the reference REPL does: integral values keep a
/// trailing `.0`, very small or very large magnitudes switch to exponent form
/// with a signed two-digit exponent, and negative zero prints as `0.0`.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "nan".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "inf".to_string() } else { "-inf".to_string() };
    }
    if n == 0.0 {
        return "0.0".to_string();
    }

    let magnitude = n.abs();
    if magnitude < 1e-4 || magnitude >= 1e16 {
        return exponent_form(n);
    }
    if n.fract() == 0.0 {
        format!("{:.1}", n)
    } else {
        format!("{}", n)
    }
}

// `1e-5` -> `1e-05`, `1.5e20` -> `1.5e+20`
fn exponent_form(n: f64) -> String {
    let raw = format!("{:e}", n);
    match raw.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => raw,
    }
}

// Negative literals only arise from evaluation. As an operand of application,
// `hd` or `tl` they are parenthesized so that `f (-2.0)` is not read back as a
// subtraction.
struct Operand<'a>(&'a Term);

impl fmt::Display for Operand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Term::Num(n) if *n < 0.0 => write!(f, "({})", format_number(*n)),
            term => write!(f, "{}", term),
        }
    }
}

// Atoms print bare; every compound term carries its own parentheses.
impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH_SIZE, || self.write_to(f))
    }
}

impl Term {
    fn write_to(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Num(n) => write!(f, "{}", format_number(*n)),
            Term::Var(name) => write!(f, "{}", name),
            Term::Nil => write!(f, "nil"),
            Term::Lam(param, body) => write!(f, "(\\{}.{})", param, body),
            Term::App(func, arg) => write!(f, "({} {})", Operand(func), Operand(arg)),
            Term::BinOp(BinOp::Pow, base, exponent) => {
                write!(f, "({} ^ {})", Operand(base), exponent)
            }
            Term::BinOp(op, lhs, rhs) => write!(f, "({} {} {})", lhs, op.symbol(), rhs),
            Term::Neg(operand) => write!(f, "(-{})", operand),
            Term::If(cond, then_branch, else_branch) => {
                write!(f, "(if {} then {} else {})", cond, then_branch, else_branch)
            }
            Term::Let(name, value, body) => write!(f, "(let {} = {} in {})", name, value, body),
            Term::LetRec(name, value, body) => {
                write!(f, "(letrec {} = {} in {})", name, value, body)
            }
            Term::Cons(head, tail) => {
                write!(f, "({}", head)?;
                let mut rest = tail;
                while let Term::Cons(next, after) = rest.as_ref() {
                    write!(f, " : {}", next)?;
                    rest = after;
                }
                write!(f, " : {})", rest)
            }
            Term::Head(list) => write!(f, "(hd {})", Operand(list)),
            Term::Tail(list) => write!(f, "(tl {})", Operand(list)),
        }
    }
}

/// The canonical textual form of a term.
pub fn linearize(term: &Term) -> String {
    term.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn show(input: &str) -> String {
        linearize(&parse(input).unwrap())
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(8.0), "8.0");
        assert_eq!(format_number(-6.0), "-6.0");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(0.1), "0.1");
        assert_eq!(format_number(0.0001), "0.0001");
        assert_eq!(format_number(0.00001), "1e-05");
        assert_eq!(format_number(1.5e-7), "1.5e-07");
        assert_eq!(format_number(1e15), "1000000000000000.0");
        assert_eq!(format_number(1e16), "1e+16");
        assert_eq!(format_number(-0.0), "0.0");
        assert_eq!(format_number(f64::INFINITY), "inf");
        assert_eq!(format_number(f64::NEG_INFINITY), "-inf");
        assert_eq!(format_number(f64::NAN), "nan");
    }

    #[test]
    fn test_compounds_are_parenthesized() {
        assert_eq!(show("\\x.(\\y.y)x"), "(\\x.((\\y.y) x))");
        assert_eq!(show("f a b"), "((f a) b)");
        assert_eq!(show("1 + 2 * 3"), "(1.0 + (2.0 * 3.0))");
        assert_eq!(show("--5"), "(-(-5.0))");
        assert_eq!(show("2^3^2"), "(2.0 ^ (3.0 ^ 2.0))");
    }

    #[test]
    fn test_extensions() {
        assert_eq!(show("if a then b else c"), "(if a then b else c)");
        assert_eq!(show("let x = 1 in x"), "(let x = 1.0 in x)");
        assert_eq!(show("letrec f = f in f"), "(letrec f = f in f)");
        assert_eq!(show("1 : 2 : nil"), "(1.0 : 2.0 : nil)");
        assert_eq!(show("(1 : nil) : xs"), "((1.0 : nil) : xs)");
        assert_eq!(show("hd (tl xs)"), "(hd (tl xs))");
    }

    #[test]
    fn test_negative_literal_in_application() {
        let term = Term::app(Term::var("f"), Term::Num(-2.0));
        assert_eq!(linearize(&term), "(f (-2.0))");
        let term = Term::binop(BinOp::Sub, Term::var("a"), Term::Num(-6.0));
        assert_eq!(linearize(&term), "(a - -6.0)");
    }

    #[test]
    fn test_negative_literal_under_list_destructors() {
        let term = Term::head(Term::Num(-2.0));
        assert_eq!(linearize(&term), "(hd (-2.0))");
        assert_eq!(parse(&linearize(&term)).unwrap(), Term::head(Term::neg(Term::Num(2.0))));
        let term = Term::tail(Term::Num(-0.5));
        assert_eq!(linearize(&term), "(tl (-0.5))");
        assert!(parse(&linearize(&term)).is_ok());
    }

    #[test]
    fn test_deeply_nested_term_prints() {
        let depth = 100_000;
        let mut term = Term::var("x");
        for _ in 0..depth {
            term = Term::binop(BinOp::Add, term, Term::Num(1.0));
        }
        let printed = linearize(&term);
        assert!(printed.starts_with(&"(".repeat(depth)));
        assert!(printed.ends_with(" + 1.0)"));
        assert_eq!(printed.matches('+').count(), depth);
    }

    #[test]
    fn test_printed_form_parses_back() {
        for input in [
            "\\x.\\y.x y",
            "(\\x.x * x) -2 * -3",
            "letrec f = \\n.if n <= 0 then nil else n : f (n - 1) in hd tl f 3",
            "a == b",
            "-f x ^ 2",
        ] {
            let term = parse(input).unwrap();
            assert_eq!(parse(&linearize(&term)).unwrap(), term, "{}", input);
        }
    }
}
