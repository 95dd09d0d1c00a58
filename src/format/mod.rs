//! Text encodings of trees and of marshalled host values.

pub mod dag;
pub mod readable;
pub mod ternary;

use num_bigint::BigUint;
use thiserror::Error;

use crate::diagnostic::Diagnostic;
use crate::eval::{EvalError, Evaluator};
use crate::marshal::{self, MarshalError};
use crate::span::Span;

pub use dag::{of_dag, to_dag};
pub use readable::{of_readable, to_readable};
pub use ternary::{of_ternary, to_ternary};

#[derive(Debug, Error)]
pub enum FormatError {
    /// Malformed input text.
    #[error("{0}")]
    Syntax(Diagnostic),
    /// The tree cannot be shown as the requested host value.
    #[error(transparent)]
    Marshal(MarshalError),
    /// Evaluation failed while building or inspecting the tree.
    #[error(transparent)]
    Eval(#[from] EvalError),
}

impl From<Diagnostic> for FormatError {
    fn from(d: Diagnostic) -> Self {
        FormatError::Syntax(d)
    }
}

impl From<MarshalError> for FormatError {
    fn from(e: MarshalError) -> Self {
        match e {
            MarshalError::Eval(e) => FormatError::Eval(e),
            other => FormatError::Marshal(other),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Format {
    Bool,
    Ternary,
    Nat,
    Readable,
    Dag,
    String,
}

impl Format {
    pub const ALL: [Format; 6] = [
        Format::Bool,
        Format::Ternary,
        Format::Nat,
        Format::Readable,
        Format::Dag,
        Format::String,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Format::Bool => "bool",
            Format::Ternary => "ternary",
            Format::Nat => "nat",
            Format::Readable => "readable",
            Format::Dag => "dag",
            Format::String => "string",
        }
    }

    pub fn decode<E: Evaluator>(self, e: &mut E, s: &str) -> Result<E::Tree, FormatError> {
        match self {
            Format::Bool => match s {
                "true" => Ok(marshal::of_bool(e, true)),
                "false" => Ok(marshal::of_bool(e, false)),
                _ => Err(Diagnostic::error(
                    "invalid boolean".to_string(),
                    Span::at(0, s.len()),
                )
                .with_help("expected 'true' or 'false'".to_string())
                .into()),
            },
            Format::Nat => {
                let digits_only = !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
                let n = digits_only
                    .then(|| s.parse::<BigUint>().ok())
                    .flatten()
                    .ok_or_else(|| {
                        Diagnostic::error(
                            "invalid natural number".to_string(),
                            Span::at(0, s.len()),
                        )
                    })?;
                Ok(marshal::of_nat(e, &n))
            }
            Format::String => Ok(marshal::of_string(e, s)),
            Format::Ternary => of_ternary(e, s),
            Format::Readable => of_readable(e, s),
            Format::Dag => of_dag(e, s),
        }
    }

    pub fn encode<E: Evaluator>(self, e: &mut E, t: &E::Tree) -> Result<String, FormatError> {
        Ok(match self {
            Format::Bool => marshal::to_bool(e, t)?.to_string(),
            Format::Nat => marshal::to_nat(e, t)?.to_string(),
            Format::String => marshal::to_string(e, t)?,
            Format::Ternary => to_ternary(e, t)?,
            Format::Readable => to_readable(e, t)?,
            Format::Dag => to_dag(e, t)?,
        })
    }

    /// Decode with the first format that accepts `s`, trying bool,
    /// ternary, nat, readable, dag and string in that order.
    pub fn infer<E: Evaluator>(e: &mut E, s: &str) -> Result<(E::Tree, Format), FormatError> {
        let mut last = None;
        for format in Format::ALL {
            match format.decode(e, s) {
                Ok(t) => {
                    log::debug!("inferred format {} for input of {} bytes", format, s.len());
                    return Ok((t, format));
                }
                Err(err @ FormatError::Eval(_)) => return Err(err),
                Err(err) => last = Some(err),
            }
        }
        Err(last.unwrap_or_else(|| {
            Diagnostic::error("could not infer format".to_string(), Span::at(0, s.len())).into()
        }))
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bool" => Ok(Format::Bool),
            "ternary" => Ok(Format::Ternary),
            "nat" => Ok(Format::Nat),
            "readable" | "term" => Ok(Format::Readable),
            "dag" => Ok(Format::Dag),
            "string" => Ok(Format::String),
            _ => Err(format!(
                "unknown format '{}' (expected one of: {})",
                s,
                Format::ALL.map(Format::name).join(", ")
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::StackEvaluator;

    fn inferred(s: &str) -> Format {
        let mut e = StackEvaluator::new();
        Format::infer(&mut e, s).unwrap().1
    }

    #[test]
    fn test_inference_order() {
        assert_eq!(inferred("true"), Format::Bool);
        assert_eq!(inferred("21100"), Format::Ternary);
        assert_eq!(inferred("10"), Format::Ternary);
        assert_eq!(inferred("42"), Format::Nat);
        assert_eq!(inferred("△ (△ △)"), Format::Readable);
        assert_eq!(inferred("0 △ △\n0"), Format::Dag);
        assert_eq!(inferred("hello world"), Format::String);
    }

    #[test]
    fn test_marshalled_round_trips() {
        let mut e = StackEvaluator::new();
        for (format, text) in [
            (Format::Bool, "false"),
            (Format::Nat, "65543"),
            (Format::String, "tree calculus △"),
        ] {
            let t = format.decode(&mut e, text).unwrap();
            assert_eq!(format.encode(&mut e, &t).unwrap(), text);
        }
    }

    #[test]
    fn test_encode_mismatch_is_marshal_error() {
        let mut e = StackEvaluator::new();
        let t = Format::Ternary.decode(&mut e, "200").unwrap();
        assert!(matches!(
            Format::Bool.encode(&mut e, &t),
            Err(FormatError::Marshal(MarshalError::NotABool))
        ));
    }

    #[test]
    fn test_names_round_trip() {
        for f in Format::ALL {
            assert_eq!(f.name().parse::<Format>(), Ok(f));
        }
        assert_eq!("term".parse::<Format>(), Ok(Format::Readable));
        assert!("json".parse::<Format>().is_err());
    }
}
