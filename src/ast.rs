// src/ast.rs

use std::rc::Rc;

// AST Definition
//
// Children are reference counted: a substitution inserts the same unevaluated
// argument at every occurrence, and untouched subtrees are shared between the
// old and the new term.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Num(f64),
    Var(String),
    Lam(String, Rc<Term>),
    App(Rc<Term>, Rc<Term>),
    BinOp(BinOp, Rc<Term>, Rc<Term>),
    Neg(Rc<Term>),
    If(Rc<Term>, Rc<Term>, Rc<Term>),
    Let(String, Rc<Term>, Rc<Term>),
    LetRec(String, Rc<Term>, Rc<Term>),
    Nil,
    Cons(Rc<Term>, Rc<Term>),
    Head(Rc<Term>),
    Tail(Rc<Term>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Pow => "^",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
        }
    }

    /// Applies the operator to two numbers. Comparisons yield 1.0 or 0.0.
    pub fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            BinOp::Add => a + b,
            BinOp::Sub => a - b,
            BinOp::Mul => a * b,
            BinOp::Div => a / b,
            BinOp::Pow => a.powf(b),
            BinOp::Eq => truth(a == b),
            BinOp::Ne => truth(a != b),
            BinOp::Lt => truth(a < b),
            BinOp::Le => truth(a <= b),
            BinOp::Gt => truth(a > b),
            BinOp::Ge => truth(a >= b),
        }
    }
}

pub fn truth(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

// Dropping a long operator chain or list recursively would overflow the
// stack, so uniquely owned compound children are detached onto a worklist and
// released one at a time.
impl Drop for Term {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        self.detach_children(&mut pending);
        while let Some(child) = pending.pop() {
            if let Ok(mut term) = Rc::try_unwrap(child) {
                term.detach_children(&mut pending);
            }
        }
    }
}

impl Term {
    fn detach_children(&mut self, pending: &mut Vec<Rc<Term>>) {
        let mut detach = |child: &mut Rc<Term>| {
            if Rc::strong_count(child) == 1 && !child.is_leaf() {
                pending.push(std::mem::replace(child, Rc::new(Term::Nil)));
            }
        };
        match self {
            Term::Num(_) | Term::Var(_) | Term::Nil => {}
            Term::Lam(_, a) | Term::Neg(a) | Term::Head(a) | Term::Tail(a) => detach(a),
            Term::App(a, b)
            | Term::BinOp(_, a, b)
            | Term::Cons(a, b)
            | Term::Let(_, a, b)
            | Term::LetRec(_, a, b) => {
                detach(a);
                detach(b);
            }
            Term::If(a, b, c) => {
                detach(a);
                detach(b);
                detach(c);
            }
        }
    }

    fn is_leaf(&self) -> bool {
        matches!(self, Term::Num(_) | Term::Var(_) | Term::Nil)
    }
}

// Constructors that wrap children in `Rc`, used by the parser and the tests.
impl Term {
    pub fn var(name: &str) -> Term {
        Term::Var(name.to_string())
    }

    pub fn lam(param: &str, body: Term) -> Term {
        Term::Lam(param.to_string(), Rc::new(body))
    }

    pub fn app(func: Term, arg: Term) -> Term {
        Term::App(Rc::new(func), Rc::new(arg))
    }

    pub fn binop(op: BinOp, lhs: Term, rhs: Term) -> Term {
        Term::BinOp(op, Rc::new(lhs), Rc::new(rhs))
    }

    pub fn neg(operand: Term) -> Term {
        Term::Neg(Rc::new(operand))
    }

    pub fn if_then_else(cond: Term, then_branch: Term, else_branch: Term) -> Term {
        Term::If(Rc::new(cond), Rc::new(then_branch), Rc::new(else_branch))
    }

    pub fn let_in(name: &str, bound: Term, body: Term) -> Term {
        Term::Let(name.to_string(), Rc::new(bound), Rc::new(body))
    }

    pub fn letrec_in(name: &str, bound: Term, body: Term) -> Term {
        Term::LetRec(name.to_string(), Rc::new(bound), Rc::new(body))
    }

    pub fn cons(head: Term, tail: Term) -> Term {
        Term::Cons(Rc::new(head), Rc::new(tail))
    }

    pub fn head(list: Term) -> Term {
        Term::Head(Rc::new(list))
    }

    pub fn tail(list: Term) -> Term {
        Term::Tail(Rc::new(list))
    }
}
