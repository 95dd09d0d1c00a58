//! Hash-consing evaluator with a memoized `apply`.
//!
//! Every distinct shape is stored once, so structurally equal trees get
//! equal ids and an id pair identifies an application exactly. Results
//! of `apply` are cached by that pair.

use rustc_hash::FxHashMap;

use super::{EvalError, Evaluator, Shape, Stats};
use crate::config::EngineConfig;
use crate::error::StepBudget;

/// Interned tree. Equal ids are structurally equal trees.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(pub u32);

impl Id {
    pub const LEAF: Id = Id(0);
}

/// Apply-cache counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

pub struct MemoEvaluator {
    decode: Vec<Shape<Id>>,
    intern: FxHashMap<Shape<Id>, Id>,
    cache: FxHashMap<(Id, Id), Id>,
    hits: u64,
    misses: u64,
    budget: StepBudget,
}

impl MemoEvaluator {
    pub fn new() -> Self {
        Self::with_config(&EngineConfig::default())
    }

    pub fn with_config(config: &EngineConfig) -> Self {
        let mut intern = FxHashMap::default();
        intern.insert(Shape::Leaf, Id::LEAF);
        Self {
            decode: vec![Shape::Leaf],
            intern,
            cache: FxHashMap::default(),
            hits: 0,
            misses: 0,
            budget: StepBudget::new(config.step_limit),
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.cache.len(),
        }
    }

    /// Report cache counters through the log.
    pub fn log_cache_stats(&self) {
        let s = self.cache_stats();
        log::debug!(
            "memo: {} interned shapes, {} cached applications, {} hits, {} misses",
            self.decode.len(),
            s.entries,
            s.hits,
            s.misses
        );
    }

    fn intern(&mut self, shape: Shape<Id>) -> Result<Id, EvalError> {
        if let Some(&id) = self.intern.get(&shape) {
            return Ok(id);
        }
        let next = self.decode.len();
        let id = u32::try_from(next).map_err(|_| EvalError::ResourceExhausted {
            resource: "intern table",
            requested: next + 1,
        })?;
        self.decode.push(shape);
        self.intern.insert(shape, Id(id));
        Ok(Id(id))
    }

    fn decode(&self, x: Id) -> Result<Shape<Id>, EvalError> {
        self.decode.get(x.0 as usize).copied().ok_or_else(|| {
            EvalError::invariant(format!(
                "id {} outside the {} interned shapes",
                x.0,
                self.decode.len()
            ))
        })
    }

    fn reduce(&mut self, a: Id, b: Id) -> Result<Id, EvalError> {
        match self.decode(a)? {
            Shape::Leaf => self.intern(Shape::Stem(b)),
            Shape::Stem(x) => self.intern(Shape::Fork(x, b)),
            Shape::Fork(x, y) => match self.decode(x)? {
                Shape::Leaf => Ok(y),
                Shape::Stem(x1) => {
                    let xb = self.apply(x1, b)?;
                    let yb = self.apply(y, b)?;
                    self.apply(xb, yb)
                }
                Shape::Fork(w, x1) => match self.decode(b)? {
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
}

impl Default for MemoEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator for MemoEvaluator {
    type Tree = Id;

    fn leaf(&mut self) -> Id {
        Id::LEAF
    }

    /// # Panics
    ///
    /// When the intern table cannot address another shape.
    fn stem(&mut self, u: Id) -> Id {
        match self.intern(Shape::Stem(u)) {
            Ok(id) => id,
            Err(e) => panic!("{}", e),
        }
    }

    fn fork(&mut self, u: Id, v: Id) -> Id {
        match self.intern(Shape::Fork(u, v)) {
            Ok(id) => id,
            Err(e) => panic!("{}", e),
        }
    }

    fn apply(&mut self, a: Id, b: Id) -> Result<Id, EvalError> {
        if let Some(&r) = self.cache.get(&(a, b)) {
            self.hits += 1;
            return Ok(r);
        }
        self.misses += 1;
        self.budget.tick()?;
        let r = self.reduce(a, b)?;
        self.cache.insert((a, b), r);
        Ok(r)
    }

    fn shape(&mut self, x: &Id) -> Result<Shape<Id>, EvalError> {
        self.decode(*x)
    }

    fn stats(&self) -> Stats {
        Stats {
            steps: self.budget.steps,
            nodes: self.decode.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_consing_shares_equal_shapes() {
        let mut e = MemoEvaluator::new();
        let l = e.leaf();
        let a = e.stem(l);
        let b = e.stem(l);
        assert_eq!(a, b);
        let f = e.fork(a, l);
        let g = e.fork(b, l);
        assert_eq!(f, g);
        assert_eq!(e.stats().nodes, 3);
    }

    #[test]
    fn test_repeated_apply_hits_cache() {
        let mut e = MemoEvaluator::new();
        let l = e.leaf();
        let s1 = e.stem(l);
        let s2 = e.stem(s1);
        let id = e.fork(s2, l);
        let r1 = e.apply(id, s1).unwrap();
        let steps = e.stats().steps;
        let r2 = e.apply(id, s1).unwrap();
        assert_eq!(r1, r2);
        assert_eq!(r1, s1);
        assert_eq!(e.stats().steps, steps);
        assert_eq!(e.cache_stats().hits, 1);
    }

    #[test]
    fn test_results_are_interned() {
        let mut e = MemoEvaluator::new();
        let l = e.leaf();
        let built = e.stem(l);
        let reduced = e.apply(l, l).unwrap();
        assert_eq!(built, reduced);
    }

    #[test]
    fn test_unknown_id_is_invariant_violation() {
        let mut e = MemoEvaluator::new();
        assert!(matches!(
            e.shape(&Id(42)),
            Err(EvalError::InvariantViolation { .. })
        ));
        let l = e.leaf();
        assert!(matches!(
            e.apply(Id(42), l),
            Err(EvalError::InvariantViolation { .. })
        ));
    }
}
