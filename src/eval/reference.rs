//! Recursive evaluator over reference-counted trees.
//!
//! The simplest faithful reading of the reduction rules. Depth of
//! reduction is bounded by the host call stack. Dropping a tree is
//! iterative, so deep inputs are released without recursion.

use std::hash::{Hash, Hasher};
use std::rc::Rc;

use super::{EvalError, Evaluator, Shape, Stats};
use crate::config::EngineConfig;
use crate::error::StepBudget;

#[derive(Debug)]
enum Node {
    Leaf,
    Stem(Tree),
    Fork(Tree, Tree),
}

/// Shared handle to an immutable tree node.
#[derive(Clone, Debug)]
pub struct Tree(Rc<Node>);

impl Drop for Tree {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        take_children(self, &mut pending);
        while let Some(mut t) = pending.pop() {
            take_children(&mut t, &mut pending);
        }
    }
}

fn take_children(t: &mut Tree, pending: &mut Vec<Tree>) {
    if let Some(node) = Rc::get_mut(&mut t.0) {
        match std::mem::replace(node, Node::Leaf) {
            Node::Leaf => {}
            Node::Stem(u) => pending.push(u),
            Node::Fork(u, v) => {
                pending.push(u);
                pending.push(v);
            }
        }
    }
}

impl PartialEq for Tree {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Tree {}

impl Hash for Tree {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Rc::as_ptr(&self.0), state);
    }
}

pub struct ReferenceEvaluator {
    leaf: Tree,
    budget: StepBudget,
    allocated: usize,
}

impl ReferenceEvaluator {
    pub fn new() -> Self {
        Self::with_config(&EngineConfig::default())
    }

    pub fn with_config(config: &EngineConfig) -> Self {
        Self {
            leaf: Tree(Rc::new(Node::Leaf)),
            budget: StepBudget::new(config.step_limit),
            allocated: 1,
        }
    }

    fn alloc(&mut self, node: Node) -> Tree {
        self.allocated += 1;
        Tree(Rc::new(node))
    }
}

impl Default for ReferenceEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator for ReferenceEvaluator {
    type Tree = Tree;

    fn leaf(&mut self) -> Tree {
        self.leaf.clone()
    }

    fn stem(&mut self, u: Tree) -> Tree {
        self.alloc(Node::Stem(u))
    }

    fn fork(&mut self, u: Tree, v: Tree) -> Tree {
        self.alloc(Node::Fork(u, v))
    }

    fn apply(&mut self, a: Tree, b: Tree) -> Result<Tree, EvalError> {
        self.budget.tick()?;
        match &*a.0 {
            Node::Leaf => Ok(self.stem(b)),
            Node::Stem(x) => Ok(self.fork(x.clone(), b)),
            Node::Fork(x, y) => match &*x.0 {
                Node::Leaf => Ok(y.clone()),
                Node::Stem(x1) => {
                    let xb = self.apply(x1.clone(), b.clone())?;
                    let yb = self.apply(y.clone(), b)?;
                    self.apply(xb, yb)
                }
                Node::Fork(w, x1) => match &*b.0 {
                    Node::Leaf => Ok(w.clone()),
                    Node::Stem(u) => self.apply(x1.clone(), u.clone()),
                    Node::Fork(u, v) => {
                        let yu = self.apply(y.clone(), u.clone())?;
                        self.apply(yu, v.clone())
                    }
                },
            },
        }
    }

    fn shape(&mut self, x: &Tree) -> Result<Shape<Tree>, EvalError> {
        Ok(match &*x.0 {
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
