//! Fixed sample programs used by tests, benches and the CLI.

use num_bigint::BigUint;

use crate::eval::Evaluator;
use crate::format::{of_dag, of_ternary, FormatError};
use crate::marshal;

/// `△ (△ (△ △)) △`, returns its argument.
pub const ID_TERNARY: &str = "21100";

/// Boolean negation: `△ (△ (△ △) (△ △ △)) △`.
pub const NOT_TERNARY: &str = "22102000";

/// Natural-number successor over little-endian bit lists.
pub const SUCC_DAG: &str = "\
0 △ △
1 △ 0
2 △ 1
3 2 △
4 △ 3
5 △ 4
6 5 3
7 △ 6
8 △ 7
9 0 8
10 △ 9
11 △ 10
12 11 0
13 △ 12
14 1 △
15 △ 14
16 15 △
17 △ 16
18 0 17
19 △ 18
20 0 1
21 0 0
22 △ 21
23 △ 22
24 0 23
25 △ 20
26 25 24
27 △ 26
28 27 △
29 △ 28
30 △ 29
31 0 30
32 △ 31
33 △ 32
34 33 0
35 △ 19
36 35 34
37 0 36
38 △ 37
39 △ 13
40 0 39
41 △ 40
42 △ 41
43 42 0
44 △ 38
45 44 43
46 0 45
47 39 46
47";

/// Structural equality of two trees, returning a Church-style boolean:
/// `equal a b t f` is `t` when `a` and `b` are the same tree, else `f`.
pub const EQUAL_TERNARY: &str = concat!(
    "2121212021201121101021212002120021201120021201120021212002120021201021200212",
    "0021212002120021201021101021201021101020212010211010202021101020212011211010",
    "2121200212002120112002120112002121200212002120102120021200212120021200212010",
    "2110102120102110102021201021101020202110102021201122202210202021101020202021",
    "1010212120021200212011200212011201202110102120112110102120102110102020202020",
    "2110102120112011201220211010202021101021212002120021201120021201120021201120",
    "1120021201120112002120112011201120021201120112011200212120021200212010212002",
    "1200212011200212011200212011201120021201120112002120112011201021212002120021",
    "2011200212011200212011201021201121101021201021101020202110102021201120102121",
    "2002120021201120021201120021201120102120112110102120102110102020211010202020",
    "20202021101010211010",
);

/// Doubly recursive Fibonacci over naturals.
pub const FIB_RECURSIVE_TERNARY: &str = concat!(
    "2121202121201121211002110010202120212120212000212011202121212011200020202121",
    "2011212110021100102021202120122100021212021212021212021200021201021200020102",
    "1202120112120112000101020011201020110212011212011212110021100101020021202120",
    "1121202120212000102120212011211001021212011212110021100102021202120120021202",
    "1212120112000202022002120112010020011201102120112120112121100211001010102121",
    "2021202120001021200021202121202120002120102120002010212120212000102021212011",
    "2121100211001020212021201200212021212120112000202022002120112010020011201102",
    "1201121201121211002110010102022102002020021201121201121211002110010102121201",
    "1212110021100102021202120120021202121212011200020202200212011201002001120110",
    "2120112120112121100211001010200",
);

/// Fibonacci by iterating a pair, linear in its argument.
pub const FIB_LINEAR_TERNARY: &str = concat!(
    "2120220010212121201121211002110010202120212012211000212011201120120021212021",
    "2120212000212010212000201021201120212120212000212010212000201021201120112021",
    "2021200010212011201120212021200010212120212021200010212021200010202120112021",
    "2120112121100211001020212021201200212021212120112000202022002120112010020011",
    "2011021201121201121211002110010100202120110212120212120212000212010212000201",
    "0212011202121201121211002110010202120212012220202100002121202120212000102120",
    "2121202120002120102120002010212011202120212000102120112012001120212011212021",
    "2021200010010202120112120120022222102002021212002210200021100020222121200221",
    "0200021100202102010001021201121201121211002110010102121201121211002110010202",
    "1202120112120212000222021212011212110021100102021202120120021201121202120212",
    "0001021200101021201121201121211002110010100212010212012212120112121100211001",
    "0202120212012002120112120212021200010212002102001021201121201121211002110010",
    "1002120112010212011200021201221100021202120112120212000212011202121201120002",
    "0001011201021201121201121211002110010102002120112120112121100211001010202210",
    "02100",
);

pub fn id<E: Evaluator>(e: &mut E) -> E::Tree {
    let leaf = e.leaf();
    let s1 = e.stem(leaf.clone());
    let s2 = e.stem(s1);
    e.fork(s2, leaf)
}

pub fn not<E: Evaluator>(e: &mut E) -> E::Tree {
    let leaf = e.leaf();
    let s1 = e.stem(leaf.clone());
    let k = e.fork(leaf.clone(), leaf.clone());
    let inner = e.fork(s1, k);
    e.fork(inner, leaf)
}

pub fn succ<E: Evaluator>(e: &mut E) -> Result<E::Tree, FormatError> {
    of_dag(e, SUCC_DAG)
}

pub fn equal<E: Evaluator>(e: &mut E) -> Result<E::Tree, FormatError> {
    of_ternary(e, EQUAL_TERNARY)
}

pub fn fib_recursive<E: Evaluator>(e: &mut E) -> Result<E::Tree, FormatError> {
    of_ternary(e, FIB_RECURSIVE_TERNARY)
}

pub fn fib_linear<E: Evaluator>(e: &mut E) -> Result<E::Tree, FormatError> {
    of_ternary(e, FIB_LINEAR_TERNARY)
}

/// A program whose application to `△` nests `n` S-rule reductions, each
/// waiting on the next.
///
/// `T0 = △ △ id` and `Tk = △ (△ T(k-1)) △`. A recursive evaluator needs
/// host-stack depth proportional to `n` to reduce `Tn △`. The result is
/// `id` for `n = 0`, then alternates between `△ △` (odd `n`) and
/// `△ △ (△ △)` (even `n`).
pub fn nested_starlings<E: Evaluator>(e: &mut E, n: usize) -> E::Tree {
    let leaf = e.leaf();
    let i = id(e);
    let mut t = e.fork(leaf.clone(), i);
    for _ in 0..n {
        let s = e.stem(t);
        t = e.fork(s, leaf.clone());
    }
    t
}

/// Ternary form of `nested_starlings(n)` applied to `△`.
pub fn nested_starlings_result(n: usize) -> &'static str {
    match n {
        0 => ID_TERNARY,
        n if n % 2 == 1 => "10",
        _ => "2010",
    }
}

/// Apply a natural-number program to `n` and read the result back.
pub fn run_nat<E: Evaluator>(e: &mut E, program: E::Tree, n: u64) -> Result<BigUint, FormatError> {
    let arg = marshal::of_u64(e, n);
    let result = e.apply(program, arg)?;
    Ok(marshal::to_nat(e, &result)?)
}

/// Fibonacci computed on the host, for checking the tree programs.
/// Counts from `fib(0) = fib(1) = 1`, as the tree programs do.
pub fn fib(n: u64) -> BigUint {
    let mut a = BigUint::from(1u32);
    let mut b = BigUint::from(1u32);
    for _ in 0..n {
        let next = &a + &b;
        a = std::mem::replace(&mut b, next);
    }
    a
}

/// `equal a b` applied to two marker trees, decoded as a host boolean.
pub fn trees_equal<E: Evaluator>(
    e: &mut E,
    equal: &E::Tree,
    a: E::Tree,
    b: E::Tree,
) -> Result<bool, FormatError> {
    let tt = marshal::of_bool(e, true);
    let ff = marshal::of_bool(e, false);
    let r = e.apply(equal.clone(), a)?;
    let r = e.apply(r, b)?;
    let r = e.apply(r, tt)?;
    let r = e.apply(r, ff)?;
    Ok(marshal::to_bool(e, &r)?)
}

/// One row of the reduction-rule table: `a b` must reduce to `expected`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuleCase {
    pub rule: &'static str,
    pub a: String,
    pub b: String,
    pub expected: String,
}

/// Every reduction rule instantiated over `△`, `△ △` and `△ △ △`, in
/// ternary form.
pub fn rule_table() -> Vec<RuleCase> {
    const T: [&str; 3] = ["0", "10", "200"];
    let mut cases = Vec::new();
    let mut case = |rule: &'static str, expected: String, a: String, b: &str| {
        cases.push(RuleCase {
            rule,
            a,
            b: b.to_string(),
            expected,
        })
    };

    for z in T {
        case("leaf", format!("1{z}"), "0".into(), z);
    }
    for y in T {
        for z in T {
            case("stem", format!("2{y}{z}"), format!("1{y}"), z);
            case("K", y.to_string(), format!("20{y}"), z);
            // S with x = △ △: △ △ z (y z) = z
            case("S", z.to_string(), format!("2110{y}"), z);
        }
    }
    for z in T {
        // S with x = △, y = △: △ z (△ z)
        case("S", format!("2{z}1{z}"), "2100".into(), z);
        for yc in T {
            // S with x = △, y = △ yc: △ z (△ yc z)
            case("S", format!("2{z}2{yc}{z}"), format!("2101{yc}"), z);
        }
    }
    for w in T {
        for x in T {
            for y in T {
                case("triage leaf", w.to_string(), format!("22{w}{x}{y}"), "0");
            }
        }
        for y in T {
            for u in T {
                let b = format!("1{u}");
                case("triage stem", format!("1{u}"), format!("22{w}0{y}"), &b);
                case("triage stem", format!("20{u}"), format!("22{w}10{y}"), &b);
            }
        }
        for x in T {
            for u in T {
                for v in T {
                    let b = format!("2{u}{v}");
                    case("triage fork", format!("2{u}{v}"), format!("22{w}{x}0"), &b);
                    case("triage fork", u.to_string(), format!("22{w}{x}10"), &b);
                }
            }
        }
    }
    cases
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::{MemoEvaluator, ReferenceEvaluator, StackEvaluator};
    use crate::format::to_ternary;

    #[test]
    fn test_constants_decode_to_named_builders() {
        let mut e = StackEvaluator::new();
        let i = id(&mut e);
        assert_eq!(to_ternary(&mut e, &i).unwrap(), ID_TERNARY);
        let n = not(&mut e);
        assert_eq!(to_ternary(&mut e, &n).unwrap(), NOT_TERNARY);
        let eq = equal(&mut e).unwrap();
        assert_eq!(to_ternary(&mut e, &eq).unwrap(), EQUAL_TERNARY);
    }

    #[test]
    fn test_not() {
        let mut e = ReferenceEvaluator::new();
        let n = not(&mut e);
        let ff = marshal::of_bool(&mut e, false);
        let tt = marshal::of_bool(&mut e, true);
        let r = e.apply(n.clone(), ff).unwrap();
        assert!(marshal::to_bool(&mut e, &r).unwrap());
        let r = e.apply(n, tt).unwrap();
        assert!(!marshal::to_bool(&mut e, &r).unwrap());
    }

    #[test]
    fn test_succ() {
        let mut e = MemoEvaluator::new();
        let s = succ(&mut e).unwrap();
        for n in [0u64, 1, 2, 3, 7, 8, 65535, 65543] {
            assert_eq!(run_nat(&mut e, s, n).unwrap(), BigUint::from(n + 1));
        }
    }

    #[test]
    fn test_equal() {
        let mut e = MemoEvaluator::new();
        let eq = equal(&mut e).unwrap();
        let samples = [not(&mut e), marshal::of_bool(&mut e, true), marshal::of_bool(&mut e, false)];
        for (i, a) in samples.iter().enumerate() {
            for (j, b) in samples.iter().enumerate() {
                assert_eq!(trees_equal(&mut e, &eq, *a, *b).unwrap(), i == j);
            }
        }
    }

    #[test]
    fn test_fib_programs() {
        let mut e = MemoEvaluator::new();
        let linear = fib_linear(&mut e).unwrap();
        let recursive = fib_recursive(&mut e).unwrap();
        assert_eq!(run_nat(&mut e, linear, 9).unwrap(), BigUint::from(55u32));
        assert_eq!(run_nat(&mut e, recursive, 9).unwrap(), BigUint::from(55u32));
        assert_eq!(run_nat(&mut e, linear, 90).unwrap(), fib(90));
    }

    #[test]
    fn test_host_fib() {
        assert_eq!(fib(0), BigUint::from(1u32));
        assert_eq!(fib(1), BigUint::from(1u32));
        assert_eq!(fib(26), BigUint::from(196418u32));
        assert_eq!(fib(90), BigUint::from(4660046610375530309u64));
        assert_eq!(fib(100).to_string(), "573147844013817084101");
    }

    #[test]
    fn test_rule_table_on_reference() {
        let cases = rule_table();
        assert_eq!(cases.len(), 285);
        let mut e = ReferenceEvaluator::new();
        for c in cases {
            let a = of_ternary(&mut e, &c.a).unwrap();
            let b = of_ternary(&mut e, &c.b).unwrap();
            let r = e.apply(a, b).unwrap();
            assert_eq!(to_ternary(&mut e, &r).unwrap(), c.expected, "rule {} on {} {}", c.rule, c.a, c.b);
        }
    }

    #[test]
    fn test_nested_starlings_small() {
        let mut e = ReferenceEvaluator::new();
        let leaf = e.leaf();
        for n in 0..8 {
            let t = nested_starlings(&mut e, n);
            let r = e.apply(t, leaf.clone()).unwrap();
            assert_eq!(to_ternary(&mut e, &r).unwrap(), nested_starlings_result(n), "n = {}", n);
        }
    }
}
