// src/lib.rs

// --- Module Declarations ---
pub mod ast;
pub mod error;
pub mod evaluator;
pub mod lexer;
pub mod parser;
pub mod printer;
pub mod substitution;

// --- Public API Re-exports ---
pub use ast::{BinOp, Term};
pub use error::{Error, EvalError, SyntaxError, SyntaxErrorKind};
pub use evaluator::{Budget, EvalConfig, Evaluator, Unbounded};
pub use parser::parse;
pub use printer::{format_number, linearize};
pub use substitution::{free_vars, substitute};

/// Evaluates `expr` to normal form without any budget.
///
/// Evaluation is total: terms that cannot reduce further (free variables,
/// arithmetic on functions, conditions that are not numbers) are returned as
/// residual terms rather than errors. A term with no normal form does not return.
pub fn evaluate(expr: Term) -> Term {
    match Evaluator::new(Unbounded).evaluate(expr) {
        Ok(term) => term,
        Err(never) => match never {},
    }
}

/// Evaluates `expr` under the budgets in `config`.
pub fn evaluate_with(expr: Term, config: &EvalConfig) -> Result<Term, EvalError> {
    Evaluator::new(*config).evaluate(expr)
}

/// Parses, evaluates and linearizes `source`.
pub fn interpret(source: &str) -> Result<String, Error> {
    interpret_with(source, &EvalConfig::default())
}

pub fn interpret_with(source: &str, config: &EvalConfig) -> Result<String, Error> {
    let term = parse(source)?;
    let result = evaluate_with(term, config)?;
    Ok(linearize(&result))
}
