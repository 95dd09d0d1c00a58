//! Call-by-need evaluator with suspended reducers.
//!
//! An [`Expr`] is a mutable cell holding a pending application: an
//! optional head expression and a spine of arguments laid out as in
//! [`super::stack`] (last argument first). A cell with no head and at
//! most two arguments is in head normal form. `apply` never reduces; it
//! only allocates a cell. Reduction happens when a consumer asks for a
//! shape, and overwrites the cell in place so that every holder of the
//! cell sees the result and no cell is reduced twice.
//!
//! A reducer that needs the head form of another cell suspends and
//! pushes that cell onto an explicit scheduler stack. The suspended
//! reducer resumes once the cell it waits on is forced.
//!
//! A cell whose function part is still pending keeps it as a shared
//! head reference rather than copying its spine. Copying would
//! duplicate the work still owed by that spine.

use std::cell::RefCell;
use std::rc::Rc;

use super::{EvalError, Evaluator, Shape, Stats};
use crate::config::EngineConfig;
use crate::error::StepBudget;

#[derive(Default)]
struct Thunk {
    /// Function part still to be spliced in; `None` means `△`.
    head: Option<Expr>,
    args: Vec<Expr>,
}

impl Thunk {
    fn is_forced(&self) -> bool {
        self.head.is_none() && self.args.len() < 3
    }
}

/// Shared handle to a possibly unevaluated tree.
#[derive(Clone)]
pub struct Expr(Rc<RefCell<Thunk>>);

impl Expr {
    fn new(head: Option<Expr>, args: Vec<Expr>) -> Self {
        Expr(Rc::new(RefCell::new(Thunk { head, args })))
    }

    fn thunk(&self) -> Result<std::cell::Ref<'_, Thunk>, EvalError> {
        self.0
            .try_borrow()
            .map_err(|_| EvalError::invariant("expression depends on itself"))
    }

    fn thunk_mut(&self) -> Result<std::cell::RefMut<'_, Thunk>, EvalError> {
        self.0
            .try_borrow_mut()
            .map_err(|_| EvalError::invariant("expression depends on itself"))
    }

    /// Whether this cell is already in head normal form.
    pub fn is_forced(&self) -> bool {
        self.0.try_borrow().map(|t| t.is_forced()).unwrap_or(false)
    }

    /// The head shape, if forced.
    fn forced_shape(&self) -> Result<Option<Shape<Expr>>, EvalError> {
        let t = self.thunk()?;
        if !t.is_forced() {
            return Ok(None);
        }
        Ok(Some(match t.args.as_slice() {
            [] => Shape::Leaf,
            [u] => Shape::Stem(u.clone()),
            [v, u] => Shape::Fork(u.clone(), v.clone()),
            _ => return Err(EvalError::invariant("forced cell with three arguments")),
        }))
    }
}

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Expr {}

impl std::hash::Hash for Expr {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::ptr::hash(Rc::as_ptr(&self.0), state);
    }
}

impl std::fmt::Debug for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Expr({:p})", Rc::as_ptr(&self.0))
    }
}

impl Drop for Expr {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        take_children(self, &mut pending);
        while let Some(mut e) = pending.pop() {
            take_children(&mut e, &mut pending);
        }
    }
}

fn take_children(e: &mut Expr, pending: &mut Vec<Expr>) {
    if let Some(cell) = Rc::get_mut(&mut e.0) {
        let thunk = std::mem::take(cell.get_mut());
        pending.extend(thunk.head);
        pending.extend(thunk.args);
    }
}

enum Step {
    /// The cell reached head normal form.
    Done,
    /// The cell waits on another cell.
    Suspend(Expr),
    /// The cell was rewritten and may rewrite again.
    Continue,
}

pub struct LazyEvaluator {
    leaf: Expr,
    budget: StepBudget,
    allocated: usize,
}

impl LazyEvaluator {
    pub fn new() -> Self {
        Self::with_config(&EngineConfig::default())
    }

    pub fn with_config(config: &EngineConfig) -> Self {
        Self {
            leaf: Expr::new(None, Vec::new()),
            budget: StepBudget::new(config.step_limit),
            allocated: 1,
        }
    }

    fn alloc(&mut self, head: Option<Expr>, args: Vec<Expr>) -> Expr {
        self.allocated += 1;
        Expr::new(head, args)
    }

    /// Reduce `root` to head normal form in place.
    pub fn force(&mut self, root: &Expr) -> Result<(), EvalError> {
        if root.is_forced() {
            return Ok(());
        }
        let mut reducers = vec![root.clone()];
        while let Some(cur) = reducers.last().cloned() {
            match self.step(&cur)? {
                Step::Done => {
                    reducers.pop();
                }
                Step::Suspend(dep) => reducers.push(dep),
                Step::Continue => {}
            }
        }
        Ok(())
    }

    /// One scheduling step of the reducer for `cur`. The budget is
    /// charged before the cell is touched, so an exhausted budget leaves
    /// the cell denoting the same tree.
    fn step(&mut self, cur: &Expr) -> Result<Step, EvalError> {
        let mut cell = cur.thunk_mut()?;

        if let Some(head) = cell.head.clone() {
            let h = head.thunk()?;
            if !h.is_forced() {
                drop(h);
                return Ok(Step::Suspend(head));
            }
            let spliced = h.args.clone();
            drop(h);
            cell.head = None;
            cell.args.extend(spliced);
            return Ok(Step::Continue);
        }

        let n = cell.args.len();
        if n < 3 {
            return Ok(Step::Done);
        }

        let x = cell.args[n - 1].clone();
        let y = cell.args[n - 2].clone();
        let z = cell.args[n - 3].clone();
        let Some(x_shape) = x.forced_shape()? else {
            return Ok(Step::Suspend(x));
        };

        match x_shape {
            // △ △ y z = y
            Shape::Leaf => {
                self.budget.tick()?;
                cell.args.truncate(n - 3);
                cell.head = Some(y);
            }
            // △ (△ x0) y z = x0 z (y z)
            Shape::Stem(x0) => {
                self.budget.tick()?;
                let yz = self.alloc(Some(y), vec![z.clone()]);
                cell.args.truncate(n - 3);
                cell.args.push(yz);
                cell.args.push(z);
                cell.head = Some(x0);
            }
            Shape::Fork(w, x1) => {
                let Some(z_shape) = z.forced_shape()? else {
                    return Ok(Step::Suspend(z));
                };
                self.budget.tick()?;
                cell.args.truncate(n - 3);
                match z_shape {
                    Shape::Leaf => cell.head = Some(w),
                    Shape::Stem(u) => {
                        cell.args.push(u);
                        cell.head = Some(x1);
                    }
                    Shape::Fork(u, v) => {
                        cell.args.push(v);
                        cell.args.push(u);
                        cell.head = Some(y);
                    }
                }
            }
        }
        Ok(Step::Continue)
    }
}

impl Default for LazyEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator for LazyEvaluator {
    type Tree = Expr;

    fn leaf(&mut self) -> Expr {
        self.leaf.clone()
    }

    fn stem(&mut self, u: Expr) -> Expr {
        self.alloc(None, vec![u])
    }

    fn fork(&mut self, u: Expr, v: Expr) -> Expr {
        self.alloc(None, vec![v, u])
    }

    fn apply(&mut self, a: Expr, b: Expr) -> Result<Expr, EvalError> {
        let spliced = {
            let t = a.thunk()?;
            t.is_forced().then(|| t.args.clone())
        };
        Ok(match spliced {
            Some(args) => {
                let mut spine = Vec::with_capacity(args.len() + 1);
                spine.push(b);
                spine.extend(args);
                self.alloc(None, spine)
            }
            None => self.alloc(Some(a), vec![b]),
        })
    }

    fn shape(&mut self, x: &Expr) -> Result<Shape<Expr>, EvalError> {
        self.force(x)?;
        x.forced_shape()?
            .ok_or_else(|| EvalError::invariant("forcing left the cell unreduced"))
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

    fn id(e: &mut LazyEvaluator) -> Expr {
        let l = e.leaf();
        let s1 = e.stem(l.clone());
        let s2 = e.stem(s1);
        e.fork(s2, l)
    }

    #[test]
    fn test_apply_defers_work() {
        let mut e = LazyEvaluator::new();
        let l = e.leaf();
        let i = id(&mut e);
        let r = e.apply(i, l).unwrap();
        assert!(!r.is_forced());
        assert_eq!(e.stats().steps, 0);
        assert_eq!(e.shape(&r).unwrap(), Shape::Leaf);
        assert!(r.is_forced());
        assert_eq!(e.stats().steps, 2);
    }

    #[test]
    fn test_small_applications_are_values() {
        let mut e = LazyEvaluator::new();
        let l = e.leaf();
        let s = e.apply(l.clone(), l.clone()).unwrap();
        assert!(s.is_forced());
        let f = e.apply(s, l.clone()).unwrap();
        assert_eq!(e.shape(&f).unwrap(), Shape::Fork(l.clone(), l));
    }

    #[test]
    fn test_pending_function_is_shared_not_copied() {
        let mut e = LazyEvaluator::new();
        let l = e.leaf();
        let i = id(&mut e);
        // f = id (△ △): pending, reduces to △ △
        let s = e.stem(l.clone());
        let f = e.apply(i, s).unwrap();
        let a = e.apply(f.clone(), l.clone()).unwrap();
        let b = e.apply(f.clone(), l.clone()).unwrap();
        assert_eq!(e.shape(&a).unwrap(), Shape::Fork(l.clone(), l.clone()));
        let after_first = e.stats().steps;
        assert!(f.is_forced());
        assert_eq!(e.shape(&b).unwrap(), Shape::Fork(l.clone(), l));
        // `id` is not reduced again for `b`
        assert_eq!(e.stats().steps, after_first);
    }

    #[test]
    fn test_step_limit_leaves_cell_consistent() {
        let config = EngineConfig {
            step_limit: Some(1),
            ..EngineConfig::default()
        };
        let mut e = LazyEvaluator::with_config(&config);
        let l = e.leaf();
        let i = id(&mut e);
        let r = e.apply(i, l).unwrap();
        assert_eq!(
            e.shape(&r),
            Err(EvalError::StepLimitExceeded { limit: 1 })
        );
        assert!(!r.is_forced());
    }

    #[test]
    fn test_deep_pending_chain_drops() {
        let mut e = LazyEvaluator::new();
        let l = e.leaf();
        let i = id(&mut e);
        let mut t = l;
        for _ in 0..200_000 {
            t = e.apply(i.clone(), t).unwrap();
        }
        drop(t);
    }
}
