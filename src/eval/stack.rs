//! Iterative evaluator over argument spines.
//!
//! A term `△ a1 a2 ... an` is held as a spine: the vector of its
//! arguments, last argument first, so the top of the vector is `a1`.
//! Values are spines of length at most two:
//!
//! ```text
//! △         []
//! △ u       [u]
//! △ u v     [v, u]
//! ```
//!
//! `apply(a, b)` pushes `b` under `a`'s arguments and reduces while
//! three or more arguments remain. The S rule needs the value of `y z`
//! before it can continue; that sub-reduction becomes a new frame on an
//! explicit worklist, and its result fills a hole in the parent spine.
//! Host-stack depth stays constant however deep the reduction goes.

use std::rc::Rc;

use super::{EvalError, Evaluator, Shape, Stats};
use crate::config::EngineConfig;
use crate::error::StepBudget;

enum Node {
    Leaf,
    Stem(Value),
    Fork(Value, Value),
}

/// Shared handle to a fully reduced tree.
#[derive(Clone)]
pub struct Value(Rc<Node>);

impl Value {
    fn node(&self) -> &Node {
        &self.0
    }

    /// Push this value's arguments onto `spine`, first argument on top.
    fn push_args(&self, spine: &mut Vec<Value>) {
        match self.node() {
            Node::Leaf => {}
            Node::Stem(u) => spine.push(u.clone()),
            Node::Fork(u, v) => {
                spine.push(v.clone());
                spine.push(u.clone());
            }
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Value {}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::ptr::hash(Rc::as_ptr(&self.0), state);
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Value({:p})", Rc::as_ptr(&self.0))
    }
}

// Deep trees would overflow a derived recursive drop.
impl Drop for Value {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        take_children(self, &mut pending);
        while let Some(mut v) = pending.pop() {
            take_children(&mut v, &mut pending);
        }
    }
}

fn take_children(v: &mut Value, pending: &mut Vec<Value>) {
    if let Some(node) = Rc::get_mut(&mut v.0) {
        match std::mem::replace(node, Node::Leaf) {
            Node::Leaf => {}
            Node::Stem(u) => pending.push(u),
            Node::Fork(u, w) => {
                pending.push(u);
                pending.push(w);
            }
        }
    }
}

/// A spine under reduction. `hole` is the index in the parent frame's
/// spine that receives this frame's value.
struct Frame {
    spine: Vec<Value>,
    hole: Option<usize>,
}

pub struct StackEvaluator {
    leaf: Value,
    budget: StepBudget,
    allocated: usize,
}

impl StackEvaluator {
    pub fn new() -> Self {
        Self::with_config(&EngineConfig::default())
    }

    pub fn with_config(config: &EngineConfig) -> Self {
        Self {
            leaf: Value(Rc::new(Node::Leaf)),
            budget: StepBudget::new(config.step_limit),
            allocated: 1,
        }
    }

    fn alloc(&mut self, node: Node) -> Value {
        self.allocated += 1;
        Value(Rc::new(node))
    }

    /// Close a spine of at most two arguments into a value.
    fn value_of(&mut self, spine: Vec<Value>) -> Result<Value, EvalError> {
        if spine.len() > 2 {
            return Err(EvalError::invariant(format!(
                "spine of {} arguments is not a value",
                spine.len()
            )));
        }
        let mut args = spine.into_iter();
        Ok(match (args.next(), args.next()) {
            (None, _) => self.leaf.clone(),
            (Some(u), None) => self.alloc(Node::Stem(u)),
            (Some(v), Some(u)) => self.alloc(Node::Fork(u, v)),
        })
    }

    fn reduce(&mut self, spine: Vec<Value>) -> Result<Value, EvalError> {
        let mut work = vec![Frame { spine, hole: None }];

        while let Some(mut frame) = work.pop() {
            let n = frame.spine.len();
            if n < 3 {
                let value = self.value_of(frame.spine)?;
                match (frame.hole, work.last_mut()) {
                    (None, _) => return Ok(value),
                    (Some(i), Some(parent)) => parent.spine[i] = value,
                    (Some(_), None) => {
                        return Err(EvalError::invariant("reduced frame lost its parent"))
                    }
                }
                continue;
            }

            self.budget.tick()?;
            let [z, y, x]: [Value; 3] = frame
                .spine
                .split_off(n - 3)
                .try_into()
                .map_err(|_| EvalError::invariant("spine split did not yield three arguments"))?;

            match x.node() {
                // △ △ y z = y
                Node::Leaf => y.push_args(&mut frame.spine),
                // △ (△ x0) y z = x0 z (y z)
                Node::Stem(x0) => {
                    let mut child = vec![z.clone()];
                    y.push_args(&mut child);
                    let hole = frame.spine.len();
                    frame.spine.push(self.leaf.clone());
                    frame.spine.push(z);
                    x0.push_args(&mut frame.spine);
                    work.push(frame);
                    work.push(Frame {
                        spine: child,
                        hole: Some(hole),
                    });
                    continue;
                }
                Node::Fork(w, x1) => match z.node() {
                    Node::Leaf => w.push_args(&mut frame.spine),
                    Node::Stem(u) => {
                        frame.spine.push(u.clone());
                        x1.push_args(&mut frame.spine);
                    }
                    Node::Fork(u, v) => {
                        frame.spine.push(v.clone());
                        frame.spine.push(u.clone());
                        y.push_args(&mut frame.spine);
                    }
                },
            }
            work.push(frame);
        }

        Err(EvalError::invariant("worklist drained without a result"))
    }
}

impl Default for StackEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator for StackEvaluator {
    type Tree = Value;

    fn leaf(&mut self) -> Value {
        self.leaf.clone()
    }

    fn stem(&mut self, u: Value) -> Value {
        self.alloc(Node::Stem(u))
    }

    fn fork(&mut self, u: Value, v: Value) -> Value {
        self.alloc(Node::Fork(u, v))
    }

    fn apply(&mut self, a: Value, b: Value) -> Result<Value, EvalError> {
        log::trace!("stack: apply at step {}", self.budget.steps);
        let mut spine = vec![b];
        a.push_args(&mut spine);
        self.reduce(spine)
    }

    fn shape(&mut self, x: &Value) -> Result<Shape<Value>, EvalError> {
        Ok(match x.node() {
            Node::Leaf => Shape::Leaf,
            Node::Stem(u) => Shape::Stem(u.clone()),
            Node::Fork(u, v) => Shape::Fork(u.clone(), v.clone()),
        })
    }

    fn stats(&self) -> Stats {
        Stats {
            steps: self.budget.steps,
            nodes: self.allocated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ternary(e: &mut StackEvaluator, t: &Value) -> String {
        let mut out = String::new();
        let mut todo = vec![t.clone()];
        while let Some(t) = todo.pop() {
            match e.shape(&t).unwrap() {
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
        out
    }

    #[test]
    fn test_spine_layout() {
        let mut e = StackEvaluator::new();
        let l = e.leaf();
        let s = e.stem(l.clone());
        let f = e.fork(s.clone(), l.clone());
        let mut spine = Vec::new();
        f.push_args(&mut spine);
        assert_eq!(spine, vec![l.clone(), s.clone()]);
        assert!(matches!(e.value_of(spine).unwrap().node(), Node::Fork(..)));
    }

    #[test]
    fn test_small_applications_take_no_steps() {
        let mut e = StackEvaluator::new();
        let l = e.leaf();
        let s = e.apply(l.clone(), l.clone()).unwrap();
        let f = e.apply(s, l).unwrap();
        assert_eq!(ternary(&mut e, &f), "200");
        assert_eq!(e.stats().steps, 0);
    }

    #[test]
    fn test_s_rule_fills_hole() {
        let mut e = StackEvaluator::new();
        let l = e.leaf();
        // id = △ (△ (△ △)) △, id △ = △ △ △ (△ △) = △
        let s1 = e.stem(l.clone());
        let s2 = e.stem(s1.clone());
        let id = e.fork(s2, l.clone());
        let r = e.apply(id.clone(), l.clone()).unwrap();
        assert_eq!(ternary(&mut e, &r), "0");
        let r = e.apply(id, s1).unwrap();
        assert_eq!(ternary(&mut e, &r), "10");
        assert_eq!(e.stats().steps, 4);
    }

    #[test]
    fn test_value_of_rejects_long_spine() {
        let mut e = StackEvaluator::new();
        let l = e.leaf();
        let err = e.value_of(vec![l.clone(), l.clone(), l]).unwrap_err();
        assert!(matches!(err, EvalError::InvariantViolation { .. }));
    }

    #[test]
    fn test_deep_value_drops_without_overflow() {
        let mut e = StackEvaluator::new();
        let mut t = e.leaf();
        for _ in 0..1_000_000 {
            t = e.stem(t);
        }
        drop(t);
        assert_eq!(e.stats().nodes, 1_000_001);
    }
}

