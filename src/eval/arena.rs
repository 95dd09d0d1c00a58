//! Recursive evaluator over a columnar node arena.
//!
//! Nodes live in three parallel columns indexed by [`NodeId`]: a tag
//! byte, a left child and a right child. Record 0 is the unique leaf.
//! Records are never freed; the arena doubles when full.

use super::{EvalError, Evaluator, Shape, Stats};
use crate::config::EngineConfig;
use crate::error::StepBudget;

const TAG_LEAF: u8 = 0;
const TAG_STEM: u8 = 1;
const TAG_FORK: u8 = 2;

/// Index of a record in an [`ArenaEvaluator`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const LEAF: NodeId = NodeId(0);

    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

pub struct ArenaEvaluator {
    tags: Vec<u8>,
    left: Vec<u32>,
    right: Vec<u32>,
    /// Next unused record.
    free_from: usize,
    capacity: usize,
    budget: StepBudget,
}

impl ArenaEvaluator {
    pub fn new() -> Self {
        Self::with_config(&EngineConfig::default())
    }

    pub fn with_config(config: &EngineConfig) -> Self {
        let capacity = config.arena_capacity.max(1);
        let mut tags = Vec::with_capacity(capacity);
        let mut left = Vec::with_capacity(capacity);
        let mut right = Vec::with_capacity(capacity);
        tags.push(TAG_LEAF);
        left.push(0);
        right.push(0);
        Self {
            tags,
            left,
            right,
            free_from: 1,
            capacity,
            budget: StepBudget::new(config.step_limit),
        }
    }

    /// Number of records the arena holds without growing.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn grow(&mut self) -> Result<(), EvalError> {
        let requested = self.capacity.saturating_mul(2);
        if requested > u32::MAX as usize {
            return Err(EvalError::ResourceExhausted {
                resource: "arena",
                requested,
            });
        }
        log::debug!("arena: growing from {} to {} records", self.capacity, requested);
        let extra = requested - self.tags.len();
        self.tags.reserve_exact(extra);
        self.left.reserve_exact(extra);
        self.right.reserve_exact(extra);
        self.capacity = requested;
        Ok(())
    }

    fn alloc(&mut self, tag: u8, u: NodeId, v: NodeId) -> Result<NodeId, EvalError> {
        if self.free_from == self.capacity {
            self.grow()?;
        }
        let id = NodeId(self.free_from as u32);
        self.tags.push(tag);
        self.left.push(u.0);
        self.right.push(v.0);
        self.free_from += 1;
        Ok(id)
    }

    /// Decode the record behind `x`, checking its tag and bounds.
    fn node(&self, x: NodeId) -> Result<Shape<NodeId>, EvalError> {
        let i = x.index();
        if i >= self.free_from {
            return Err(EvalError::invariant(format!(
                "index {} outside the {} allocated records",
                i, self.free_from
            )));
        }
        match self.tags[i] {
            TAG_LEAF => Ok(Shape::Leaf),
            TAG_STEM => Ok(Shape::Stem(NodeId(self.left[i]))),
            TAG_FORK => Ok(Shape::Fork(NodeId(self.left[i]), NodeId(self.right[i]))),
            tag => Err(EvalError::invariant(format!(
                "tag {} at index {} not 0, 1 or 2",
                tag, i
            ))),
        }
    }

    fn try_stem(&mut self, u: NodeId) -> Result<NodeId, EvalError> {
        self.alloc(TAG_STEM, u, NodeId::LEAF)
    }

    fn try_fork(&mut self, u: NodeId, v: NodeId) -> Result<NodeId, EvalError> {
        self.alloc(TAG_FORK, u, v)
    }
}

impl Default for ArenaEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator for ArenaEvaluator {
    type Tree = NodeId;

    fn leaf(&mut self) -> NodeId {
        NodeId::LEAF
    }

    /// # Panics
    ///
    /// When the arena cannot address another record. Running out of
    /// storage outside `apply` is fatal.
    fn stem(&mut self, u: NodeId) -> NodeId {
        match self.try_stem(u) {
            Ok(id) => id,
            Err(e) => panic!("{}", e),
        }
    }

    fn fork(&mut self, u: NodeId, v: NodeId) -> NodeId {
        match self.try_fork(u, v) {
            Ok(id) => id,
            Err(e) => panic!("{}", e),
        }
    }

    fn apply(&mut self, a: NodeId, b: NodeId) -> Result<NodeId, EvalError> {
        self.budget.tick()?;
        match self.node(a)? {
            Shape::Leaf => self.try_stem(b),
            Shape::Stem(x) => self.try_fork(x, b),
            Shape::Fork(x, y) => match self.node(x)? {
                Shape::Leaf => Ok(y),
                Shape::Stem(x1) => {
                    let xb = self.apply(x1, b)?;
                    let yb = self.apply(y, b)?;
                    self.apply(xb, yb)
                }
                Shape::Fork(w, x1) => match self.node(b)? {
                    Shape::Leaf => Ok(w),
                    Shape::Stem(u) => self.apply(x1, u),
                    Shape::Fork(u, v) => {
                        let yu = self.apply(y, u)?;
                        self.apply(yu, v)
                    }
                },
            },
        }
    }

    fn shape(&mut self, x: &NodeId) -> Result<Shape<NodeId>, EvalError> {
        self.node(*x)
    }

    fn stats(&self) -> Stats {
        Stats {
            steps: self.budget.steps,
            nodes: self.free_from,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small(capacity: usize) -> ArenaEvaluator {
        ArenaEvaluator::with_config(&EngineConfig {
            arena_capacity: capacity,
            ..EngineConfig::default()
        })
    }

    #[test]
    fn test_leaf_is_record_zero() {
        let mut e = ArenaEvaluator::new();
        assert_eq!(e.leaf(), NodeId(0));
        assert_eq!(e.shape(&NodeId(0)).unwrap(), Shape::Leaf);
        assert_eq!(e.stats().nodes, 1);
    }

    #[test]
    fn test_growth_keeps_handles_valid() {
        let mut e = small(4);
        let l = e.leaf();
        let mut chain = vec![l];
        for _ in 0..100 {
            let top = *chain.last().unwrap();
            chain.push(e.stem(top));
        }
        assert!(e.capacity() >= 101);
        for pair in chain.windows(2) {
            assert_eq!(e.shape(&pair[1]).unwrap(), Shape::Stem(pair[0]));
        }
        assert_eq!(e.stats().nodes, 101);
    }

    #[test]
    fn test_foreign_handle_is_invariant_violation() {
        let mut big = ArenaEvaluator::new();
        let l = big.leaf();
        let mut x = l;
        for _ in 0..10 {
            x = big.stem(x);
        }
        let mut tiny = small(4);
        let err = tiny.shape(&x).unwrap_err();
        assert!(matches!(err, EvalError::InvariantViolation { .. }));
        let leaf = tiny.leaf();
        assert!(matches!(
            tiny.apply(x, leaf),
            Err(EvalError::InvariantViolation { .. })
        ));
    }

    #[test]
    fn test_corrupt_tag_is_reported() {
        let mut e = ArenaEvaluator::new();
        let l = e.leaf();
        let s = e.stem(l);
        e.tags[s.index()] = 7;
        assert_eq!(
            e.shape(&s),
            Err(EvalError::invariant("tag 7 at index 1 not 0, 1 or 2"))
        );
    }

    #[test]
    fn test_triage_rules() {
        let mut e = ArenaEvaluator::new();
        let l = e.leaf();
        let s = e.stem(l);
        // △ (△ w x) y with w = △ △, x = △, y = △
        let wx = e.fork(s, l);
        let f = e.fork(wx, l);
        assert_eq!(e.apply(f, l).unwrap(), s);
        let ss = e.stem(s);
        let r = e.apply(f, ss).unwrap();
        assert_eq!(e.shape(&r).unwrap(), Shape::Stem(s));
        let sl = e.fork(s, l);
        let r = e.apply(f, sl).unwrap();
        assert_eq!(e.shape(&r).unwrap(), Shape::Fork(s, l));
        assert_eq!(e.stats().steps, 3 + 1 + 2);
    }
}
