pub mod config;
pub mod diagnostic;
pub mod error;
pub mod eval;
pub mod format;
pub mod marshal;
pub mod programs;
pub mod span;

// Re-exports: the evaluation contract and its strategies
pub use config::EngineConfig;
pub use error::EvalError;
pub use eval::{
    ArenaEvaluator, Evaluator, LazyEvaluator, MemoEvaluator, ReferenceEvaluator, Shape,
    StackEvaluator, Stats, Strategy, StrategyFn,
};
pub use format::{Format, FormatError};
pub use marshal::MarshalError;

use diagnostic::render_diagnostics;

/// Decode `source` in `format` (or by inference), rendering any syntax
/// diagnostic to stderr under `filename`.
pub fn decode_source<E: Evaluator>(
    e: &mut E,
    source: &str,
    format: Option<Format>,
    filename: &str,
) -> Result<(E::Tree, Format), FormatError> {
    let decoded = match format {
        Some(f) => f.decode(e, source).map(|t| (t, f)),
        None => Format::infer(e, source),
    };
    if let Err(FormatError::Syntax(d)) = &decoded {
        render_diagnostics(std::slice::from_ref(d), filename, source);
    }
    decoded
}
