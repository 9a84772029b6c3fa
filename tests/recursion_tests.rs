// tests/recursion_tests.rs

use lazy_lambda::{Error, EvalError};
use test_utils::*;

#[cfg(test)]
mod letrec_tests {
    use super::*;

    #[test]
    fn test_factorial() {
        let factorial = r"
            letrec fact = \n.
                if n < 2 then 1
                else n * fact (n - 1)
            in fact 10
        ";
        assert_eq!(eval_str(factorial), "3628800.0");
    }

    #[test]
    fn test_accumulating_factorial() {
        let factorial_acc = r"
            letrec fact = \n.\acc.
                if n < 2 then acc
                else fact (n - 1) (n * acc)
            in fact 8 1
        ";
        assert_eq!(eval_str(factorial_acc), "40320.0");
    }

    #[test]
    fn test_mutual_recursion_through_let() {
        let parity = r"
            letrec even = \n.
                let odd = \m. if m == 0 then 0 else even (m - 1) in
                if n == 0 then 1 else odd (n - 1)
            in even 10
        ";
        assert_eq!(eval_str(parity), "1.0");
    }

    #[test]
    fn test_recursive_value_is_a_function() {
        assert_eq!(eval_str(r"letrec f = \x.f in f 1 2 3 4"), r"(\x.(letrec f = (\x.f) in (\x.f)))");
    }
}

#[cfg(test)]
mod tail_call_tests {
    use super::*;

    #[test]
    fn test_countdown_runs_many_steps() {
        let countdown = r"
            letrec countdown = \n.
                if n < 1 then 0
                else countdown (n - 1)
            in countdown 150
        ";
        let (result, steps) = eval_counting(countdown);
        assert_eq!(result, "0.0");
        assert!(steps >= 10_000, "only {} steps", steps);
    }

    #[test]
    fn test_endless_tail_loop_hits_step_budget_not_the_stack() {
        // Each iteration is a tail call, so a long run only costs time.
        let spin = r"letrec spin = \x. spin x in spin 1";
        assert_eq!(
            eval_budgeted(spin, 200_000),
            Err(Error::Eval(EvalError::StepLimitExceeded { limit: 200_000 }))
        );
    }

    #[test]
    fn test_self_reference_hits_step_budget() {
        assert_eq!(
            eval_budgeted("letrec x = x in x", 10_000),
            Err(Error::Eval(EvalError::StepLimitExceeded { limit: 10_000 }))
        );
    }

    #[test]
    fn test_strict_self_reference_hits_depth_budget() {
        assert_eq!(
            eval_budgeted("letrec x = 1 + x in x", 1_000_000),
            Err(Error::Eval(EvalError::DepthLimitExceeded { limit: 5_000 }))
        );
    }

    #[test]
    fn test_countdown_is_quick() {
        let countdown = r"letrec c = \n. if n == 0 then 42 else c (n - 1) in c 60";
        match eval_with_timeout(countdown, 2_000) {
            Ok(result) => assert_eq!(result, "42.0"),
            Err(msg) => panic!("{}", msg),
        }
    }
}

#[cfg(test)]
mod list_tests {
    use super::*;

    #[test]
    fn test_sum() {
        assert_eq!(eval_str(&with_prelude("sum (1 : 2 : 3 : 4 : nil)")), "10.0");
        assert_eq!(eval_str(&with_prelude("sum nil")), "0.0");
    }

    #[test]
    fn test_insertion_sort() {
        assert_eq!(
            eval_str(&with_prelude("sort (3 : 1 : 4 : 1 : 5 : 9 : 2 : 6 : nil)")),
            "(1.0 : 1.0 : 2.0 : 3.0 : 4.0 : 5.0 : 6.0 : 9.0 : nil)"
        );
        assert_eq!(eval_str(&with_prelude("sort nil")), "nil");
    }

    #[test]
    fn test_map() {
        assert_eq!(
            eval_str(&with_prelude(r"map (\x.x * 10) (1 : 2 : 3 : nil)")),
            "(10.0 : 20.0 : 30.0 : nil)"
        );
    }

    #[test]
    fn test_infinite_list_head_and_tail() {
        assert_eq!(eval_str("letrec ones = 1 : ones in hd (tl (tl ones))"), "1.0");
        assert_eq!(eval_str(&with_prelude("hd (tl (tl (from 5)))")), "7.0");
    }

    #[test]
    fn test_take_from_infinite_list() {
        assert_eq!(
            eval_str(&with_prelude("take 4 (from 1)")),
            "(1.0 : 2.0 : 3.0 : 4.0 : nil)"
        );
        assert_eq!(
            eval_str(&with_prelude(r"sum (take 5 (map (\x.x * x) (from 1)))")),
            "55.0"
        );
    }

    #[test]
    fn test_unused_infinite_list_is_not_forced() {
        assert_eq!(eval_str(&with_prelude("(\\xs.3) (from 0)")), "3.0");
        assert_eq!(eval_str(&with_prelude("let xs = from 0 in if xs == nil then 1 else 2")), "2.0");
    }

    #[test]
    fn test_printing_an_infinite_list_exhausts_the_budget() {
        assert!(matches!(
            eval_budgeted("letrec ones = 1 : ones in ones", 5_000),
            Err(Error::Eval(EvalError::StepLimitExceeded { .. }))
        ));
    }
}
