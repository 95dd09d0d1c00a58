//! Parenthesized application syntax over `△`.
//!
//! Encoding writes `△`, `△ u` or `△ u v` at the top level and wraps
//! nested stems and forks in parentheses. Decoding accepts any
//! left-associative application of `△` and parenthesized groups, so
//! `△ △ △` and `(△ △) △` denote the same fork.

use super::FormatError;
use crate::diagnostic::Diagnostic;
use crate::eval::{Evaluator, Shape};
use crate::span::Span;

enum Item<T> {
    Tree(T, bool),
    Text(&'static str),
}

pub fn to_readable<E: Evaluator>(e: &mut E, t: &E::Tree) -> Result<String, FormatError> {
    let mut out = String::new();
    let mut todo = vec![Item::Tree(t.clone(), false)];
    while let Some(item) = todo.pop() {
        let (t, nested) = match item {
            Item::Text(s) => {
                out.push_str(s);
                continue;
            }
            Item::Tree(t, nested) => (t, nested),
        };
        let shape = e.shape(&t)?;
        if let Shape::Leaf = shape {
            out.push('△');
            continue;
        }
        out.push_str(if nested { "(△ " } else { "△ " });
        if nested {
            todo.push(Item::Text(")"));
        }
        match shape {
            Shape::Leaf => {}
            Shape::Stem(u) => todo.push(Item::Tree(u, true)),
            Shape::Fork(u, v) => {
                todo.push(Item::Tree(v, true));
                todo.push(Item::Text(" "));
                todo.push(Item::Tree(u, true));
            }
        }
    }
    Ok(out)
}

/// A group and the application accumulated in it so far.
struct Group<T> {
    open: usize,
    acc: Option<T>,
}

impl<T> Group<T> {
    fn push<E: Evaluator<Tree = T>>(&mut self, e: &mut E, x: T) -> Result<(), FormatError> {
        self.acc = Some(match self.acc.take() {
            None => x,
            Some(f) => e.apply(f, x)?,
        });
        Ok(())
    }
}

pub fn of_readable<E: Evaluator>(e: &mut E, s: &str) -> Result<E::Tree, FormatError> {
    let mut top: Group<E::Tree> = Group { open: 0, acc: None };
    // innermost last
    let mut open: Vec<Group<E::Tree>> = Vec::new();

    for (i, c) in s.char_indices() {
        match c {
            '△' => {
                let leaf = e.leaf();
                open.last_mut().unwrap_or(&mut top).push(e, leaf)?;
            }
            '(' => open.push(Group { open: i, acc: None }),
            ')' => {
                let Some(group) = open.pop() else {
                    return Err(
                        Diagnostic::error("unmatched ')'".to_string(), Span::at(i, 1)).into(),
                    );
                };
                let Some(value) = group.acc else {
                    let span = Span::at(group.open, 1).merge(Span::at(i, 1));
                    return Err(Diagnostic::error("empty parentheses".to_string(), span).into());
                };
                open.last_mut().unwrap_or(&mut top).push(e, value)?;
            }
            c if c.is_whitespace() => {}
            _ => {
                return Err(Diagnostic::error(
                    format!("unexpected character: '{}'", c),
                    Span::at(i, c.len_utf8()),
                )
                .with_help("terms are built from '△', parentheses and spaces".to_string())
                .into())
            }
        }
    }

    if let Some(group) = open.last() {
        return Err(Diagnostic::error("unmatched '('".to_string(), Span::at(group.open, 1)).into());
    }
    top.acc.ok_or_else(|| {
        Diagnostic::error("empty term".to_string(), Span::at(0, s.len())).into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::{ReferenceEvaluator, StackEvaluator};
    use crate::format::ternary::{of_ternary, to_ternary};

    #[test]
    fn test_encoding() {
        let mut e = StackEvaluator::new();
        let cases = [
            ("0", "△"),
            ("10", "△ △"),
            ("200", "△ △ △"),
            ("21100", "△ (△ (△ △)) △"),
            ("22102000", "△ (△ (△ △) (△ △ △)) △"),
        ];
        for (ternary, readable) in cases {
            let t = of_ternary(&mut e, ternary).unwrap();
            assert_eq!(to_readable(&mut e, &t).unwrap(), readable);
        }
    }

    #[test]
    fn test_decoding_applies_left_to_right() {
        let mut e = ReferenceEvaluator::new();
        for (readable, ternary) in [
            ("△", "0"),
            ("△ △ △", "200"),
            ("(△ △) △", "200"),
            ("△ (△ (△ △)) △", "21100"),
            ("  △(△△)  ", "110"),
        ] {
            let t = of_readable(&mut e, readable).unwrap();
            assert_eq!(to_ternary(&mut e, &t).unwrap(), ternary, "{}", readable);
        }
        // (△ △ △) △ reduces by K
        let t = of_readable(&mut e, "△ △ △ △").unwrap();
        assert_eq!(to_ternary(&mut e, &t).unwrap(), "0");
    }

    #[test]
    fn test_round_trip() {
        let mut e = StackEvaluator::new();
        let t = of_ternary(&mut e, "221210201020100").unwrap();
        let text = to_readable(&mut e, &t).unwrap();
        let back = of_readable(&mut e, &text).unwrap();
        assert_eq!(to_ternary(&mut e, &back).unwrap(), "221210201020100");
    }

    #[test]
    fn test_rejects_malformed() {
        let mut e = StackEvaluator::new();
        let message = |e: &mut StackEvaluator, s: &str| match of_readable(e, s).unwrap_err() {
            FormatError::Syntax(d) => (d.message, d.span),
            other => panic!("expected syntax error, got {:?}", other),
        };
        assert_eq!(message(&mut e, "△ ()"), ("empty parentheses".to_string(), Span::new(4, 6)));
        assert_eq!(message(&mut e, "△ (△"), ("unmatched '('".to_string(), Span::new(4, 5)));
        assert_eq!(message(&mut e, "△)"), ("unmatched ')'".to_string(), Span::new(3, 4)));
        assert_eq!(message(&mut e, ")△"), ("unmatched ')'".to_string(), Span::new(0, 1)));
        assert_eq!(message(&mut e, "(△))"), ("unmatched ')'".to_string(), Span::new(5, 6)));
        assert_eq!(message(&mut e, "((△) △"), ("unmatched '('".to_string(), Span::new(0, 1)));
        assert_eq!(message(&mut e, "   "), ("empty term".to_string(), Span::new(0, 3)));
        assert_eq!(
            message(&mut e, "△ x").0,
            "unexpected character: 'x'".to_string()
        );
    }
}
