// src/substitution.rs

use std::collections::HashSet;
use std::rc::Rc;

use crate::ast::Term;

const STACK_RED_ZONE: usize = 32 * 1024;
const STACK_GROWTH_SIZE: usize = 1024 * 1024;

/// Names that occur free in `term`.
pub fn free_vars(term: &Term) -> HashSet<String> {
    let mut free = HashSet::new();
    collect_free(term, &mut Vec::new(), &mut free);
    free
}

fn collect_free<'a>(term: &'a Term, bound: &mut Vec<&'a str>, free: &mut HashSet<String>) {
    stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH_SIZE, || collect_free_impl(term, bound, free))
}

fn collect_free_impl<'a>(term: &'a Term, bound: &mut Vec<&'a str>, free: &mut HashSet<String>) {
    match term {
        Term::Num(_) | Term::Nil => {}
        Term::Var(name) => {
            if !bound.contains(&name.as_str()) {
                free.insert(name.clone());
            }
        }
        Term::Lam(param, body) => {
            bound.push(param);
            collect_free(body, bound, free);
            bound.pop();
        }
        Term::App(a, b) | Term::BinOp(_, a, b) | Term::Cons(a, b) => {
            collect_free(a, bound, free);
            collect_free(b, bound, free);
        }
        Term::Neg(a) | Term::Head(a) | Term::Tail(a) => collect_free(a, bound, free),
        Term::If(c, t, e) => {
            collect_free(c, bound, free);
            collect_free(t, bound, free);
            collect_free(e, bound, free);
        }
        // `let` scopes over the body only.
        Term::Let(name, value, body) => {
            collect_free(value, bound, free);
            bound.push(name);
            collect_free(body, bound, free);
            bound.pop();
        }
        Term::LetRec(name, value, body) => {
            bound.push(name);
            collect_free(value, bound, free);
            collect_free(body, bound, free);
            bound.pop();
        }
    }
}

/// Whether `name` occurs free anywhere in `term`.
pub fn occurs_free(term: &Term, name: &str) -> bool {
    stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH_SIZE, || occurs_free_impl(term, name))
}

fn occurs_free_impl(term: &Term, name: &str) -> bool {
    match term {
        Term::Num(_) | Term::Nil => false,
        Term::Var(v) => v == name,
        Term::Lam(param, body) => param != name && occurs_free(body, name),
        Term::App(a, b) | Term::BinOp(_, a, b) | Term::Cons(a, b) => {
            occurs_free(a, name) || occurs_free(b, name)
        }
        Term::Neg(a) | Term::Head(a) | Term::Tail(a) => occurs_free(a, name),
        Term::If(c, t, e) => occurs_free(c, name) || occurs_free(t, name) || occurs_free(e, name),
        Term::Let(x, value, body) => occurs_free(value, name) || (x != name && occurs_free(body, name)),
        Term::LetRec(x, value, body) => x != name && (occurs_free(value, name) || occurs_free(body, name)),
    }
}

/// Every variable and binder name mentioned in `term`, bound or free.
pub fn all_names(term: &Term) -> HashSet<String> {
    let mut names = HashSet::new();
    collect_names(term, &mut names);
    names
}

fn collect_names(term: &Term, names: &mut HashSet<String>) {
    stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH_SIZE, || collect_names_impl(term, names))
}

fn collect_names_impl(term: &Term, names: &mut HashSet<String>) {
    match term {
        Term::Num(_) | Term::Nil => {}
        Term::Var(name) => {
            names.insert(name.clone());
        }
        Term::Lam(param, body) => {
            names.insert(param.clone());
            collect_names(body, names);
        }
        Term::App(a, b) | Term::BinOp(_, a, b) | Term::Cons(a, b) => {
            collect_names(a, names);
            collect_names(b, names);
        }
        Term::Neg(a) | Term::Head(a) | Term::Tail(a) => collect_names(a, names),
        Term::If(c, t, e) => {
            collect_names(c, names);
            collect_names(t, names);
            collect_names(e, names);
        }
        Term::Let(x, value, body) | Term::LetRec(x, value, body) => {
            names.insert(x.clone());
            collect_names(value, names);
            collect_names(body, names);
        }
    }
}

/// Capture-avoiding substitution `term[name := replacement]`.
///
/// A binder is renamed only when it would capture a free variable of
/// `replacement` and `name` actually occurs free underneath it. Fresh names are
/// the binder's name followed by one or more primes, chosen so they clash with
/// nothing in `term` or `replacement`. Subtrees that do not mention `name` are
/// shared with the input rather than copied.
pub fn substitute(term: &Rc<Term>, name: &str, replacement: &Rc<Term>) -> Rc<Term> {
    let mut subst = Substitution {
        root: term.as_ref(),
        name,
        replacement,
        replacement_free: free_vars(replacement),
        taken: None,
    };
    let result = subst.apply(term);
    keep(result, term)
}

fn keep(rewritten: Option<Rc<Term>>, original: &Rc<Term>) -> Rc<Term> {
    rewritten.unwrap_or_else(|| Rc::clone(original))
}

struct Substitution<'a> {
    root: &'a Term,
    name: &'a str,
    replacement: &'a Rc<Term>,
    replacement_free: HashSet<String>,
    // Built on the first rename; most substitutions never need it.
    taken: Option<HashSet<String>>,
}

impl<'a> Substitution<'a> {
    // `None` means the term does not change.
    fn apply(&mut self, term: &Rc<Term>) -> Option<Rc<Term>> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH_SIZE, || self.apply_impl(term))
    }

    fn apply_impl(&mut self, term: &Rc<Term>) -> Option<Rc<Term>> {
        match term.as_ref() {
            Term::Num(_) | Term::Nil => None,
            Term::Var(v) => (v == self.name).then(|| Rc::clone(self.replacement)),
            Term::Lam(param, body) => {
                let (param, mut scopes) = self.under_binder(param, &[body])?;
                let body = scopes.pop()?;
                Some(Rc::new(Term::Lam(param, body)))
            }
            Term::App(f, a) => self.pair(f, a).map(|(f, a)| Rc::new(Term::App(f, a))),
            Term::BinOp(op, l, r) => self.pair(l, r).map(|(l, r)| Rc::new(Term::BinOp(*op, l, r))),
            Term::Cons(h, t) => self.pair(h, t).map(|(h, t)| Rc::new(Term::Cons(h, t))),
            Term::Neg(a) => self.apply(a).map(|a| Rc::new(Term::Neg(a))),
            Term::Head(a) => self.apply(a).map(|a| Rc::new(Term::Head(a))),
            Term::Tail(a) => self.apply(a).map(|a| Rc::new(Term::Tail(a))),
            Term::If(c, t, e) => {
                let (new_c, new_t, new_e) = (self.apply(c), self.apply(t), self.apply(e));
                if new_c.is_none() && new_t.is_none() && new_e.is_none() {
                    return None;
                }
                Some(Rc::new(Term::If(keep(new_c, c), keep(new_t, t), keep(new_e, e))))
            }
            Term::Let(x, value, body) => {
                let new_value = self.apply(value);
                let new_body = self.under_binder(x, &[body]);
                if new_value.is_none() && new_body.is_none() {
                    return None;
                }
                let (x, body) = match new_body {
                    Some((renamed, mut scopes)) => (renamed, scopes.pop()?),
                    None => (x.clone(), Rc::clone(body)),
                };
                Some(Rc::new(Term::Let(x, keep(new_value, value), body)))
            }
            Term::LetRec(x, value, body) => {
                let (x, mut scopes) = self.under_binder(x, &[value, body])?;
                let body = scopes.pop()?;
                let value = scopes.pop()?;
                Some(Rc::new(Term::LetRec(x, value, body)))
            }
        }
    }

    fn pair(&mut self, a: &Rc<Term>, b: &Rc<Term>) -> Option<(Rc<Term>, Rc<Term>)> {
        let (new_a, new_b) = (self.apply(a), self.apply(b));
        if new_a.is_none() && new_b.is_none() {
            return None;
        }
        Some((keep(new_a, a), keep(new_b, b)))
    }

    /// Substitutes inside the terms a binder for `param` scopes over, renaming
    /// the binder first if it would capture a free variable of the replacement.
    fn under_binder(&mut self, param: &str, scopes: &[&Rc<Term>]) -> Option<(String, Vec<Rc<Term>>)> {
        if param == self.name {
            return None;
        }

        let captures = self.replacement_free.contains(param)
            && scopes.iter().any(|scope| occurs_free(scope, self.name));

        if captures {
            let fresh = self.fresh_name(param);
            let fresh_var = Rc::new(Term::Var(fresh.clone()));
            let rewritten = scopes
                .iter()
                .map(|scope| {
                    let renamed = substitute(scope, param, &fresh_var);
                    let result = self.apply(&renamed);
                    keep(result, &renamed)
                })
                .collect();
            return Some((fresh, rewritten));
        }

        let results: Vec<Option<Rc<Term>>> = scopes.iter().map(|scope| self.apply(scope)).collect();
        if results.iter().all(Option::is_none) {
            return None;
        }
        let rewritten = results
            .into_iter()
            .zip(scopes)
            .map(|(result, scope)| keep(result, scope))
            .collect();
        Some((param.to_string(), rewritten))
    }

    fn fresh_name(&mut self, base: &str) -> String {
        let (root, replacement, name) = (self.root, self.replacement, self.name);
        let taken = self.taken.get_or_insert_with(|| {
            let mut taken = all_names(root);
            taken.extend(all_names(replacement));
            taken.insert(name.to_string());
            taken
        });

        let mut candidate = format!("{}'", base);
        while taken.contains(&candidate) {
            candidate.push('\'');
        }
        taken.insert(candidate.clone());
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn subst(term: &str, name: &str, replacement: &str) -> Term {
        let term = Rc::new(parse(term).unwrap());
        let replacement = Rc::new(parse(replacement).unwrap());
        substitute(&term, name, &replacement).as_ref().clone()
    }

    #[test]
    fn test_deep_body_is_renamed() {
        let mut body = Term::var("x");
        for _ in 0..100_000 {
            body = Term::binop(crate::ast::BinOp::Add, body, Term::var("y"));
        }
        let term = Rc::new(Term::lam("y", body));
        let result = substitute(&term, "x", &Rc::new(Term::var("y")));
        assert!(matches!(result.as_ref(), Term::Lam(param, _) if param == "y'"));
        assert!(occurs_free(&result, "y"));
        assert!(all_names(&result).contains("y'"));
    }

    #[test]
    fn test_free_vars() {
        let term = parse("\\x.x y (let z = w in z) (letrec f = f g in f)").unwrap();
        let free = free_vars(&term);
        let mut names: Vec<_> = free.into_iter().collect();
        names.sort();
        assert_eq!(names, vec!["g", "w", "y"]);
    }

    #[test]
    fn test_let_value_is_outside_the_binder() {
        let term = parse("let x = x in x").unwrap();
        assert!(occurs_free(&term, "x"));
        let term = parse("letrec x = x in x").unwrap();
        assert!(!occurs_free(&term, "x"));
    }

    #[test]
    fn test_replaces_free_occurrences() {
        assert_eq!(subst("x + y * x", "x", "2"), parse("2 + y * 2").unwrap());
    }

    #[test]
    fn test_shadowed_binder_is_untouched() {
        assert_eq!(subst("\\x.x", "x", "y"), parse("\\x.x").unwrap());
        assert_eq!(
            subst("x (let x = x in x)", "x", "1"),
            parse("1 (let x = 1 in x)").unwrap()
        );
        assert_eq!(subst("letrec x = x in x", "x", "1"), parse("letrec x = x in x").unwrap());
    }

    #[test]
    fn test_capturing_binder_is_renamed() {
        assert_eq!(subst("\\y.x y", "x", "y"), parse("\\y'.y y'").unwrap());
    }

    #[test]
    fn test_rename_skips_names_in_use() {
        assert_eq!(
            subst("\\y.\\y'.x y y'", "x", "y"),
            parse("\\y''.\\y'.y y'' y'").unwrap()
        );
    }

    #[test]
    fn test_binder_not_renamed_when_name_absent() {
        // Nothing is substituted under the binder, so it keeps its name.
        assert_eq!(subst("(\\y.y) x", "x", "y"), parse("(\\y.y) y").unwrap());
    }

    #[test]
    fn test_let_binder_renamed() {
        assert_eq!(
            subst("let y = x in y x", "x", "y"),
            parse("let y' = y in y' y").unwrap()
        );
        assert_eq!(
            subst("letrec y = x y in y", "x", "y"),
            parse("letrec y' = y y' in y'").unwrap()
        );
    }

    #[test]
    fn test_unchanged_subtrees_are_shared() {
        let term = Rc::new(parse("(\\a.a) x").unwrap());
        let replacement = Rc::new(Term::Num(1.0));
        let result = substitute(&term, "x", &replacement);
        match (term.as_ref(), result.as_ref()) {
            (Term::App(old_f, _), Term::App(new_f, new_a)) => {
                assert!(Rc::ptr_eq(old_f, new_f));
                assert!(Rc::ptr_eq(new_a, &replacement));
            }
            _ => panic!("expected applications"),
        }

        let untouched = substitute(&term, "z", &replacement);
        assert!(Rc::ptr_eq(&term, &untouched));
    }
}
