// src/evaluator.rs

use std::convert::Infallible;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::ast::{truth, BinOp, Term};
use crate::error::EvalError;
use crate::substitution::substitute;

// Strict sub-evaluations grow the native stack on demand once it runs low.
const STACK_RED_ZONE: usize = 64 * 1024;
const STACK_GROWTH_SIZE: usize = 1024 * 1024;

/// Resource budgets for a single evaluation. The default is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvalConfig {
    /// Maximum number of reduction steps before giving up.
    pub max_steps: Option<u64>,
    /// Maximum nesting of strict sub-evaluations (operands, conditions, list
    /// elements). Guards the native stack.
    pub max_depth: Option<usize>,
}

impl EvalConfig {
    pub fn with_max_steps(mut self, limit: u64) -> Self {
        self.max_steps = Some(limit);
        self
    }

    pub fn with_max_depth(mut self, limit: usize) -> Self {
        self.max_depth = Some(limit);
        self
    }
}

/// Decides when an evaluation has used too many resources.
pub trait Budget {
    type Error;

    /// Called after every reduction step with the running total.
    fn check_steps(&self, steps: u64) -> Result<(), Self::Error>;

    /// Called before entering a strict sub-evaluation at `depth`.
    fn check_depth(&self, depth: usize) -> Result<(), Self::Error>;
}

impl Budget for EvalConfig {
    type Error = EvalError;

    fn check_steps(&self, steps: u64) -> Result<(), EvalError> {
        match self.max_steps {
            Some(limit) if steps > limit => Err(EvalError::StepLimitExceeded { limit }),
            _ => Ok(()),
        }
    }

    fn check_depth(&self, depth: usize) -> Result<(), EvalError> {
        match self.max_depth {
            Some(limit) if depth >= limit => Err(EvalError::DepthLimitExceeded { limit }),
            _ => Ok(()),
        }
    }
}

/// No limits at all. Evaluation under this budget cannot fail.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unbounded;

impl Budget for Unbounded {
    type Error = Infallible;

    fn check_steps(&self, _steps: u64) -> Result<(), Infallible> {
        Ok(())
    }

    fn check_depth(&self, _depth: usize) -> Result<(), Infallible> {
        Ok(())
    }
}

// --- The Evaluator ---
//
// Call-by-name reduction to weak-head normal form. Arguments are substituted
// unevaluated; the loop in `whnf` keeps pending arguments on an explicit spine so
// that tail-position reductions never grow the native stack. Only strict
// positions (arithmetic operands, conditions, list scrutinees) recurse, and that
// recursion is counted against `max_depth`.
pub struct Evaluator<B: Budget = EvalConfig> {
    budget: B,
    steps: u64,
    depth: usize,
}

impl<B: Budget> Evaluator<B> {
    pub fn new(budget: B) -> Self {
        Evaluator { budget, steps: 0, depth: 0 }
    }

    /// Reduction steps performed so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Evaluates a term to the normal form used for display.
    pub fn evaluate(&mut self, term: Term) -> Result<Term, B::Error> {
        let result = self.normalize(Rc::new(term))?;
        debug!(steps = self.steps, "evaluation finished");
        Ok(Rc::try_unwrap(result).unwrap_or_else(|shared| shared.as_ref().clone()))
    }

    /// Weak-head normal form followed by completion of list cells.
    pub fn normalize(&mut self, term: Rc<Term>) -> Result<Rc<Term>, B::Error> {
        let head = self.whnf(term)?;
        self.complete(head)
    }

    pub fn whnf(&mut self, term: Rc<Term>) -> Result<Rc<Term>, B::Error> {
        let mut focus = term;
        let mut spine: Vec<Rc<Term>> = Vec::new();

        loop {
            let next = match focus.as_ref() {
                Term::App(func, arg) => {
                    spine.push(Rc::clone(arg));
                    Rc::clone(func)
                }

                Term::Lam(param, body) => match spine.pop() {
                    Some(arg) => {
                        self.tick()?;
                        trace!(param = %param, "beta reduction");
                        substitute(body, param, &arg)
                    }
                    None => return Ok(focus),
                },

                Term::Let(name, value, body) => {
                    self.tick()?;
                    trace!(name = %name, "let unfolding");
                    substitute(body, name, value)
                }

                // `letrec f = v in b` continues as `b[f := letrec f = v in v]`, so each
                // use of `f` unfolds one more level on demand.
                Term::LetRec(name, value, body) => {
                    self.tick()?;
                    trace!(name = %name, "letrec unfolding");
                    let unfolded = Rc::new(Term::LetRec(name.clone(), Rc::clone(value), Rc::clone(value)));
                    substitute(body, name, &unfolded)
                }

                Term::If(cond, then_branch, else_branch) => {
                    let cond_value = self.nested(|ev| ev.whnf(Rc::clone(cond)))?;
                    match cond_value.as_ref() {
                        Term::Num(n) => {
                            self.tick()?;
                            let taken = *n != 0.0;
                            trace!(taken, "conditional");
                            if taken {
                                Rc::clone(then_branch)
                            } else {
                                Rc::clone(else_branch)
                            }
                        }
                        _ => {
                            let cond_nf = self.nested(|ev| ev.complete(cond_value))?;
                            let stuck = Rc::new(Term::If(cond_nf, Rc::clone(then_branch), Rc::clone(else_branch)));
                            return self.residual(stuck, spine);
                        }
                    }
                }

                Term::Head(list) | Term::Tail(list) => {
                    let is_head = matches!(focus.as_ref(), Term::Head(_));
                    let list_value = self.nested(|ev| ev.whnf(Rc::clone(list)))?;
                    match list_value.as_ref() {
                        Term::Cons(head, tail) => {
                            self.tick()?;
                            if is_head {
                                Rc::clone(head)
                            } else {
                                Rc::clone(tail)
                            }
                        }
                        _ => {
                            let list_nf = self.nested(|ev| ev.complete(list_value))?;
                            let stuck = if is_head {
                                Term::Head(list_nf)
                            } else {
                                Term::Tail(list_nf)
                            };
                            return self.residual(Rc::new(stuck), spine);
                        }
                    }
                }

                Term::BinOp(op, lhs, rhs) => {
                    let value = self.binary(*op, lhs, rhs)?;
                    return self.residual(value, spine);
                }

                Term::Neg(operand) => {
                    let value = self.nested(|ev| ev.whnf(Rc::clone(operand)))?;
                    let result = match value.as_ref() {
                        Term::Num(n) => {
                            self.tick()?;
                            Rc::new(Term::Num(-n))
                        }
                        _ => Rc::new(Term::Neg(self.nested(|ev| ev.complete(value))?)),
                    };
                    return self.residual(result, spine);
                }

                Term::Num(_) | Term::Var(_) | Term::Nil | Term::Cons(..) => {
                    return self.residual(focus, spine);
                }
            };
            focus = next;
        }
    }

    // Arithmetic is strict in both operands. `==`/`!=` also compare list data,
    // forcing only as much of the lists as is needed to find a difference.
    fn binary(&mut self, op: BinOp, lhs: &Rc<Term>, rhs: &Rc<Term>) -> Result<Rc<Term>, B::Error> {
        let l = self.nested(|ev| ev.whnf(Rc::clone(lhs)))?;
        let r = self.nested(|ev| ev.whnf(Rc::clone(rhs)))?;

        if let (Term::Num(a), Term::Num(b)) = (l.as_ref(), r.as_ref()) {
            self.tick()?;
            return Ok(Rc::new(Term::Num(op.apply(*a, *b))));
        }

        if matches!(op, BinOp::Eq | BinOp::Ne) {
            if let Some(equal) = self.data_eq(Rc::clone(&l), Rc::clone(&r))? {
                self.tick()?;
                return Ok(Rc::new(Term::Num(truth(equal == (op == BinOp::Eq)))));
            }
        }

        let l = self.nested(|ev| ev.complete(l))?;
        let r = self.nested(|ev| ev.complete(r))?;
        Ok(Rc::new(Term::BinOp(op, l, r)))
    }

    // Structural equality of weak-head values. `None` when either side is not data.
    fn data_eq(&mut self, lhs: Rc<Term>, rhs: Rc<Term>) -> Result<Option<bool>, B::Error> {
        let (mut l, mut r) = (lhs, rhs);
        loop {
            match (l.as_ref(), r.as_ref()) {
                (Term::Num(a), Term::Num(b)) => return Ok(Some(a == b)),
                (Term::Nil, Term::Nil) => return Ok(Some(true)),
                (Term::Nil | Term::Num(_), Term::Cons(..))
                | (Term::Cons(..), Term::Nil | Term::Num(_))
                | (Term::Nil, Term::Num(_))
                | (Term::Num(_), Term::Nil) => return Ok(Some(false)),
                (Term::Cons(h1, t1), Term::Cons(h2, t2)) => {
                    let (h1, h2, t1, t2) = (Rc::clone(h1), Rc::clone(h2), Rc::clone(t1), Rc::clone(t2));
                    let heads_equal = self.nested(|ev| {
                        let a = ev.whnf(h1)?;
                        let b = ev.whnf(h2)?;
                        ev.data_eq(a, b)
                    })?;
                    if heads_equal != Some(true) {
                        return Ok(heads_equal);
                    }
                    l = self.nested(|ev| ev.whnf(t1))?;
                    r = self.nested(|ev| ev.whnf(t2))?;
                }
                _ => return Ok(None),
            }
        }
    }

    // Brings a weak-head value to normal form. Only list cells need work: heads
    // are normalized and tails are forced, walking the spine without recursion.
    fn complete(&mut self, term: Rc<Term>) -> Result<Rc<Term>, B::Error> {
        if !matches!(term.as_ref(), Term::Cons(..)) {
            return Ok(term);
        }

        let mut heads = Vec::new();
        let mut rest = term;
        while let Term::Cons(head, tail) = rest.as_ref() {
            let (head, tail) = (Rc::clone(head), Rc::clone(tail));
            heads.push(self.nested(|ev| ev.normalize(head))?);
            rest = self.nested(|ev| ev.whnf(tail))?;
        }

        Ok(heads
            .into_iter()
            .rev()
            .fold(rest, |tail, head| Rc::new(Term::Cons(head, tail))))
    }

    // A head that cannot consume the pending arguments: rebuild the application
    // around its normal form and leave the arguments unevaluated.
    fn residual(&mut self, head: Rc<Term>, spine: Vec<Rc<Term>>) -> Result<Rc<Term>, B::Error> {
        if spine.is_empty() {
            return Ok(head);
        }
        let head = self.nested(|ev| ev.complete(head))?;
        Ok(spine
            .into_iter()
            .rev()
            .fold(head, |func, arg| Rc::new(Term::App(func, arg))))
    }

    fn tick(&mut self) -> Result<(), B::Error> {
        self.steps += 1;
        self.budget.check_steps(self.steps)
    }

    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, B::Error>) -> Result<T, B::Error> {
        self.budget.check_depth(self.depth)?;
        self.depth += 1;
        let result = stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH_SIZE, || f(self));
        self.depth -= 1;
        result
    }
}
