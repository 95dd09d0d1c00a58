//! Evaluation strategies for tree calculus.
//!
//! Tree calculus has one value type, the unlabelled tree built from
//! `Leaf`, `Stem(u)` and `Fork(u, v)`, and one operation, `apply`.
//! Applying `a` to `b` rewrites by the shape of `a` (and, for forks
//! whose left child is a fork, by the shape of `b`):
//!
//! ```text
//! △ b                 = △ b               leaf: grow a stem
//! (△ x) b             = △ x b             stem: grow a fork
//! (△ △ y) b           = y                 K
//! (△ (△ x) y) b       = x b (y b)         S
//! (△ (△ w x) y) △     = w                 triage on leaf
//! (△ (△ w x) y) (△ u) = x u               triage on stem
//! (△ (△ w x) y) (△ u v) = y u v           triage on fork
//! ```
//!
//! Five strategies implement this relation behind one [`Evaluator`]
//! trait. They agree on every result and differ only in memory layout,
//! host-stack usage, laziness and sharing:
//!
//! - [`reference::ReferenceEvaluator`]: recursive, over `Rc` trees
//! - [`arena::ArenaEvaluator`]: recursive, over a columnar arena of `u32` handles
//! - [`stack::StackEvaluator`]: iterative, over argument spines and a worklist
//! - [`lazy::LazyEvaluator`]: iterative call-by-need with suspended reducers
//! - [`memo::MemoEvaluator`]: hash-consed ids with an apply cache

pub mod arena;
pub mod lazy;
pub mod memo;
pub mod reference;
pub mod stack;

use std::hash::Hash;

use crate::config::EngineConfig;
pub use crate::error::EvalError;

pub use arena::ArenaEvaluator;
pub use lazy::LazyEvaluator;
pub use memo::MemoEvaluator;
pub use reference::ReferenceEvaluator;
pub use stack::StackEvaluator;

// ─── Types ─────────────────────────────────────────────────────────

/// Head shape of a tree, as exposed by [`Evaluator::shape`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Shape<T> {
    Leaf,
    Stem(T),
    Fork(T, T),
}

impl<T> Shape<T> {
    /// Ternary digit of this shape: 0, 1 or 2.
    pub fn arity(&self) -> u8 {
        match self {
            Shape::Leaf => 0,
            Shape::Stem(_) => 1,
            Shape::Fork(..) => 2,
        }
    }

    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> Shape<U> {
        match self {
            Shape::Leaf => Shape::Leaf,
            Shape::Stem(u) => Shape::Stem(f(u)),
            Shape::Fork(u, v) => Shape::Fork(f(u), f(v)),
        }
    }
}

/// Work counters of one evaluator instance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    /// Rewrite rules fired (one per row of the reduction table).
    pub steps: u64,
    /// Nodes held in private storage or allocated so far.
    pub nodes: usize,
}

// ─── Evaluator Trait ───────────────────────────────────────────────

/// The five-operation contract shared by every strategy.
///
/// `Tree` is an opaque handle. Its `Eq`/`Hash` compare handle identity
/// (pointer or index), never structure: equal handles denote the same
/// tree, unequal handles may still denote structurally equal trees.
/// Encoders use this to visit a shared subterm once.
///
/// Construction never reduces. `apply` reduces (or, for the lazy
/// strategy, schedules a reduction). `shape` is the forcing boundary:
/// no consumer observes a head shape without going through it.
pub trait Evaluator {
    type Tree: Clone + Eq + Hash;

    fn leaf(&mut self) -> Self::Tree;

    fn stem(&mut self, u: Self::Tree) -> Self::Tree;

    fn fork(&mut self, u: Self::Tree, v: Self::Tree) -> Self::Tree;

    fn apply(&mut self, a: Self::Tree, b: Self::Tree) -> Result<Self::Tree, EvalError>;

    /// Force `x` to head normal form and expose its shape.
    fn shape(&mut self, x: &Self::Tree) -> Result<Shape<Self::Tree>, EvalError>;

    fn stats(&self) -> Stats;

    /// Destructure `x` into one of three continuations.
    fn triage<T>(
        &mut self,
        x: &Self::Tree,
        on_leaf: impl FnOnce() -> T,
        on_stem: impl FnOnce(Self::Tree) -> T,
        on_fork: impl FnOnce(Self::Tree, Self::Tree) -> T,
    ) -> Result<T, EvalError> {
        Ok(match self.shape(x)? {
            Shape::Leaf => on_leaf(),
            Shape::Stem(u) => on_stem(u),
            Shape::Fork(u, v) => on_fork(u, v),
        })
    }
}

// ─── Strategy Selection ────────────────────────────────────────────

/// Names the available evaluation strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Strategy {
    Reference,
    Arena,
    Stack,
    Lazy,
    Memo,
}

/// A computation that works for any evaluator, run by [`Strategy::run`].
pub trait StrategyFn {
    type Output;

    fn call<E: Evaluator>(self, e: &mut E) -> Self::Output;
}

impl Strategy {
    pub const ALL: [Strategy; 5] = [
        Strategy::Reference,
        Strategy::Arena,
        Strategy::Stack,
        Strategy::Lazy,
        Strategy::Memo,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Strategy::Reference => "reference",
            Strategy::Arena => "arena",
            Strategy::Stack => "stack",
            Strategy::Lazy => "lazy",
            Strategy::Memo => "memo",
        }
    }

    /// Whether reduction depth is bounded by the host call stack.
    pub fn recursive(self) -> bool {
        matches!(
            self,
            Strategy::Reference | Strategy::Arena | Strategy::Memo
        )
    }

    /// Build a fresh evaluator of this strategy and hand it to `f`.
    pub fn run<F: StrategyFn>(self, config: &EngineConfig, f: F) -> F::Output {
        log::debug!("running on the {} evaluator", self.name());
        match self {
            Strategy::Reference => f.call(&mut ReferenceEvaluator::with_config(config)),
            Strategy::Arena => f.call(&mut ArenaEvaluator::with_config(config)),
            Strategy::Stack => f.call(&mut StackEvaluator::with_config(config)),
            Strategy::Lazy => f.call(&mut LazyEvaluator::with_config(config)),
            Strategy::Memo => {
                let mut e = MemoEvaluator::with_config(config);
                let out = f.call(&mut e);
                e.log_cache_stats();
                out
            }
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reference" | "ref" => Ok(Strategy::Reference),
            "arena" | "mem" => Ok(Strategy::Arena),
            "stack" | "stacks" => Ok(Strategy::Stack),
            "lazy" => Ok(Strategy::Lazy),
            "memo" | "hashcons" => Ok(Strategy::Memo),
            _ => Err(format!(
                "unknown strategy '{}' (expected one of: {})",
                s,
                Strategy::ALL.map(Strategy::name).join(", ")
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct LeafTernary;

    impl StrategyFn for LeafTernary {
        type Output = u8;

        fn call<E: Evaluator>(self, e: &mut E) -> u8 {
            let leaf = e.leaf();
            let stem = e.stem(leaf.clone());
            let fork = e.fork(stem, leaf);
            e.shape(&fork).unwrap().arity()
        }
    }

    #[test]
    fn test_strategy_names_round_trip() {
        for s in Strategy::ALL {
            assert_eq!(s.name().parse::<Strategy>(), Ok(s));
            assert_eq!(s.to_string(), s.name());
        }
        assert_eq!("hashcons".parse::<Strategy>(), Ok(Strategy::Memo));
        assert!("eager".parse::<Strategy>().is_err());
    }

    #[test]
    fn test_run_dispatches_every_strategy() {
        let config = EngineConfig::default();
        for s in Strategy::ALL {
            assert_eq!(s.run(&config, LeafTernary), 2, "{}", s);
        }
    }

    #[test]
    fn test_shape_map_and_arity() {
        let shape: Shape<u32> = Shape::Fork(1, 2);
        assert_eq!(shape.map(|x| x * 10), Shape::Fork(10, 20));
        assert_eq!(Shape::<u32>::Leaf.arity(), 0);
        assert_eq!(Shape::Stem(5).arity(), 1);
    }

    #[test]
    fn test_recursive_strategies() {
        assert!(Strategy::Reference.recursive());
        assert!(!Strategy::Stack.recursive());
        assert!(!Strategy::Lazy.recursive());
    }
}
