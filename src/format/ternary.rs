//! Prefix ternary encoding: `0` leaf, `1u` stem, `2uv` fork.

use super::FormatError;
use crate::diagnostic::Diagnostic;
use crate::eval::{Evaluator, Shape};
use crate::span::Span;

pub fn to_ternary<E: Evaluator>(e: &mut E, t: &E::Tree) -> Result<String, FormatError> {
    let mut out = String::new();
    let mut todo = vec![t.clone()];
    while let Some(t) = todo.pop() {
        match e.shape(&t)? {
            Shape::Leaf => out.push('0'),
            Shape::Stem(u) => {
                out.push('1');
                todo.push(u);
            }
            Shape::Fork(u, v) => {
                out.push('2');
                todo.push(v);
                todo.push(u);
            }
        }
    }
    Ok(out)
}

/// Constructor still waiting for children.
enum Pending<T> {
    Stem,
    ForkLeft,
    ForkRight(T),
}

pub fn of_ternary<E: Evaluator>(e: &mut E, s: &str) -> Result<E::Tree, FormatError> {
    let mut pending: Vec<Pending<E::Tree>> = Vec::new();

    for (i, c) in s.char_indices() {
        let mut value = match c {
            '0' => e.leaf(),
            '1' => {
                pending.push(Pending::Stem);
                continue;
            }
            '2' => {
                pending.push(Pending::ForkLeft);
                continue;
            }
            _ => {
                return Err(Diagnostic::error(
                    format!("unexpected character in ternary encoding: '{}'", c),
                    Span::at(i, c.len_utf8()),
                )
                .into())
            }
        };

        // close every constructor the new subtree completes
        loop {
            match pending.pop() {
                None => {
                    let rest = i + 1;
                    if rest < s.len() {
                        return Err(Diagnostic::error(
                            "trailing input after a complete tree".to_string(),
                            Span::at(rest, s.len() - rest),
                        )
                        .into());
                    }
                    return Ok(value);
                }
                Some(Pending::Stem) => value = e.stem(value),
                Some(Pending::ForkLeft) => {
                    pending.push(Pending::ForkRight(value));
                    break;
                }
                Some(Pending::ForkRight(u)) => value = e.fork(u, value),
            }
        }
    }

    Err(Diagnostic::error(
        "unexpected end of ternary encoding".to_string(),
        Span::at(s.len(), 0),
    )
    .with_note(format!("{} subtrees still missing", missing(&pending)))
    .into())
}

fn missing<T>(pending: &[Pending<T>]) -> usize {
    1 + pending
        .iter()
        .filter(|p| matches!(p, Pending::ForkLeft))
        .count()
}
