//! Shared-subterm encoding.
//!
//! One binding per line:
//!
//! ```text
//! 0 △ △        0 := △ △
//! 1 △ 0        1 := △ 0
//! 2 1 0        2 := 1 0
//! 2            the program is 2
//! ```
//!
//! `name a b` binds an application, `name a` an alias, and a line with
//! a single name ends the program. `△` is the only predefined name.
//! Output is linear in the number of distinct subterms, so trees with
//! exponential sharing stay small.

use std::collections::HashMap;

use super::FormatError;
use crate::diagnostic::Diagnostic;
use crate::eval::{EvalError, Evaluator, Shape};
use crate::span::Span;

pub const LEAF_NAME: &str = "△";

enum Visit<T> {
    Enter(T),
    Exit(T, Vec<T>),
}

/// Names every `a b` application once.
struct Bindings {
    lines: Vec<String>,
    names: HashMap<String, String>,
}

impl Bindings {
    fn apply(&mut self, a: &str, b: &str) -> String {
        let key = format!("{} {}", a, b);
        if let Some(name) = self.names.get(&key) {
            return name.clone();
        }
        let name = self.lines.len().to_string();
        self.lines.push(format!("{} {}", name, key));
        self.names.insert(key, name.clone());
        name
    }
}

pub fn to_dag<E: Evaluator>(e: &mut E, t: &E::Tree) -> Result<String, FormatError> {
    let mut bindings = Bindings {
        lines: Vec::new(),
        names: HashMap::new(),
    };
    let mut keys: HashMap<E::Tree, String> = HashMap::new();
    let mut todo = vec![Visit::Enter(t.clone())];

    while let Some(visit) = todo.pop() {
        match visit {
            Visit::Enter(node) => {
                if keys.contains_key(&node) {
                    continue;
                }
                let children = match e.shape(&node)? {
                    Shape::Leaf => Vec::new(),
                    Shape::Stem(u) => vec![u],
                    Shape::Fork(u, v) => vec![u, v],
                };
                todo.push(Visit::Exit(node, children.clone()));
                todo.extend(children.into_iter().rev().map(Visit::Enter));
            }
            Visit::Exit(node, children) => {
                if keys.contains_key(&node) {
                    continue;
                }
                let mut current = LEAF_NAME.to_string();
                for child in &children {
                    let child_key = keys
                        .get(child)
                        .ok_or_else(|| EvalError::invariant("child visited after parent"))?;
                    current = bindings.apply(&current, child_key);
                }
                keys.insert(node, current);
            }
        }
    }

    let root = keys
        .get(t)
        .ok_or_else(|| EvalError::invariant("root left unnamed"))?;
    bindings.lines.push(root.clone());
    Ok(bindings.lines.join("\n"))
}

pub fn of_dag<E: Evaluator>(e: &mut E, s: &str) -> Result<E::Tree, FormatError> {
    let mut env: HashMap<&str, E::Tree> = HashMap::new();
    env.insert(LEAF_NAME, e.leaf());

    let mut offset = 0;
    for line in s.split('\n') {
        let line_start = offset;
        offset += line.len() + 1;

        match tokens(line, line_start).as_slice() {
            [] => continue,
            [result] => return lookup(&env, *result),
            [(name, _), alias] => {
                let value = lookup(&env, *alias)?;
                env.insert(*name, value);
            }
            [(name, _), a, b] => {
                let a = lookup(&env, *a)?;
                let b = lookup(&env, *b)?;
                let value = e.apply(a, b)?;
                env.insert(*name, value);
            }
            [_, _, _, (extra, span), ..] => {
                return Err(Diagnostic::error(
                    format!("too many tokens in binding, starting at '{}'", extra),
                    *span,
                )
                .with_note("a binding is 'name a b' or 'name a'".to_string())
                .into())
            }
        }
    }

    Err(Diagnostic::error(
        "shared-subterm encoding is not terminated by a result name".to_string(),
        Span::at(s.len(), 0),
    )
    .into())
}

fn lookup<T: Clone>(env: &HashMap<&str, T>, (name, span): (&str, Span)) -> Result<T, FormatError> {
    env.get(name).cloned().ok_or_else(|| {
        Diagnostic::error(format!("unbound name '{}'", name), span)
            .with_help(format!("'{}' is the only predefined name", LEAF_NAME))
            .into()
    })
}

/// Whitespace-separated tokens of one line with their byte spans.
fn tokens(line: &str, line_start: usize) -> Vec<(&str, Span)> {
    let mut out = Vec::new();
    let mut start = None;
    for (i, c) in line.char_indices() {
        match (c.is_whitespace(), start) {
            (true, Some(s)) => {
                out.push((&line[s..i], Span::at(line_start + s, i - s)));
                start = None;
            }
            (false, None) => start = Some(i),
            _ => {}
        }
    }
    if let Some(s) = start {
        out.push((&line[s..], Span::at(line_start + s, line.len() - s)));
    }
    out
}
