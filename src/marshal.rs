//! Conversions between host values and trees.
//!
//! Booleans are `△` (false) and `△ △` (true). Lists are right-nested
//! forks ending in `△`. Naturals are lists of bits, least significant
//! first. Strings are lists of naturals, one per Unicode scalar value.
//!
//! Everything here goes through the [`Evaluator`] contract only, so the
//! `to_*` direction forces lazy values as it walks them.

use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};
use thiserror::Error;

use crate::eval::{EvalError, Evaluator, Shape};

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MarshalError {
    #[error("tree is not a bool")]
    NotABool,
    #[error("tree is not a list")]
    NotAList,
    #[error("{0} is not a Unicode scalar value")]
    InvalidCodePoint(u64),
    #[error(transparent)]
    Eval(#[from] EvalError),
}

pub fn of_bool<E: Evaluator>(e: &mut E, b: bool) -> E::Tree {
    let leaf = e.leaf();
    if b {
        e.stem(leaf)
    } else {
        leaf
    }
}

/// Any stem counts as true.
pub fn to_bool<E: Evaluator>(e: &mut E, t: &E::Tree) -> Result<bool, MarshalError> {
    match e.shape(t)? {
        Shape::Leaf => Ok(false),
        Shape::Stem(_) => Ok(true),
        Shape::Fork(..) => Err(MarshalError::NotABool),
    }
}

pub fn of_list<E: Evaluator>(e: &mut E, items: Vec<E::Tree>) -> E::Tree {
    let mut list = e.leaf();
    for item in items.into_iter().rev() {
        list = e.fork(item, list);
    }
    list
}

pub fn to_list<E: Evaluator>(e: &mut E, t: &E::Tree) -> Result<Vec<E::Tree>, MarshalError> {
    let mut items = Vec::new();
    let mut cur = t.clone();
    loop {
        match e.shape(&cur)? {
            Shape::Leaf => return Ok(items),
            Shape::Stem(_) => return Err(MarshalError::NotAList),
            Shape::Fork(head, tail) => {
                items.push(head);
                cur = tail;
            }
        }
    }
}

pub fn of_nat<E: Evaluator>(e: &mut E, n: &BigUint) -> E::Tree {
    let bits: Vec<E::Tree> = (0..n.bits()).map(|i| of_bool(e, n.bit(i))).collect();
    of_list(e, bits)
}

pub fn to_nat<E: Evaluator>(e: &mut E, t: &E::Tree) -> Result<BigUint, MarshalError> {
    let bits = to_list(e, t)?;
    let mut n = BigUint::zero();
    for (i, bit) in bits.iter().enumerate() {
        if to_bool(e, bit)? {
            n.set_bit(i as u64, true);
        }
    }
    Ok(n)
}

pub fn of_u64<E: Evaluator>(e: &mut E, n: u64) -> E::Tree {
    of_nat(e, &BigUint::from(n))
}

pub fn of_string<E: Evaluator>(e: &mut E, s: &str) -> E::Tree {
    let chars: Vec<E::Tree> = s.chars().map(|c| of_u64(e, c as u64)).collect();
    of_list(e, chars)
}

pub fn to_string<E: Evaluator>(e: &mut E, t: &E::Tree) -> Result<String, MarshalError> {
    let mut s = String::new();
    for c in to_list(e, t)? {
        let n = to_nat(e, &c)?;
        let code = n.to_u64().unwrap_or(u64::MAX);
        let ch = u32::try_from(code)
            .ok()
            .and_then(char::from_u32)
            .ok_or(MarshalError::InvalidCodePoint(code))?;
        s.push(ch);
    }
    Ok(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::{LazyEvaluator, MemoEvaluator, StackEvaluator};

    #[test]
    fn test_bools() {
        let mut e = StackEvaluator::new();
        let t = of_bool(&mut e, true);
        let f = of_bool(&mut e, false);
        assert!(to_bool(&mut e, &t).unwrap());
        assert!(!to_bool(&mut e, &f).unwrap());
        let pair = e.fork(t, f);
        assert_eq!(to_bool(&mut e, &pair), Err(MarshalError::NotABool));
    }

    #[test]
    fn test_nat_layout_is_lsb_first() {
        let mut e = MemoEvaluator::new();
        let six = of_u64(&mut e, 6);
        let bits = to_list(&mut e, &six).unwrap();
        let bits: Vec<bool> = bits.iter().map(|b| to_bool(&mut e, b).unwrap()).collect();
        assert_eq!(bits, vec![false, true, true]);
        let zero = of_u64(&mut e, 0);
        assert_eq!(zero, e.leaf());
    }

    #[test]
    fn test_big_nat() {
        let mut e = StackEvaluator::new();
        let n: BigUint = "573147844013817084101".parse().unwrap();
        let t = of_nat(&mut e, &n);
        assert_eq!(to_nat(&mut e, &t).unwrap(), n);
    }

    #[test]
    fn test_unicode_string() {
        let mut e = LazyEvaluator::new();
        let t = of_string(&mut e, "héllo △");
        assert_eq!(to_string(&mut e, &t).unwrap(), "héllo △");
    }

    #[test]
    fn test_not_a_list() {
        let mut e = StackEvaluator::new();
        let leaf = e.leaf();
        let s = e.stem(leaf.clone());
        let bad = e.fork(leaf, s);
        assert_eq!(to_list(&mut e, &bad), Err(MarshalError::NotAList));
    }

    #[test]
    fn test_surrogate_is_rejected() {
        let mut e = StackEvaluator::new();
        let c = of_u64(&mut e, 0xD800);
        let s = of_list(&mut e, vec![c]);
        assert_eq!(
            to_string(&mut e, &s),
            Err(MarshalError::InvalidCodePoint(0xD800))
        );
    }
}
