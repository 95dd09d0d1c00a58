use std::collections::HashMap;
use std::path::PathBuf;
use std::process;

use clap::Args;
use rayon::prelude::*;

use treecalc::format::{of_dag, of_readable, of_ternary, to_dag, to_readable, to_ternary};
use treecalc::{marshal, programs, Evaluator, FormatError, Strategy, StrategyFn};

#[derive(Args)]
pub struct CheckArgs {
    /// Strategies to check (repeatable; default: all)
    #[arg(long, short)]
    pub strategy: Vec<Strategy>,
    /// Argument of the linear Fibonacci case
    #[arg(long, default_value_t = 90)]
    pub fib: u64,
    /// Argument of the recursive Fibonacci case
    #[arg(long, default_value_t = 12)]
    pub fib_recursive: u64,
    /// Nesting depth checked on the non-recursive strategies
    #[arg(long, default_value_t = 100_000)]
    pub depth: usize,
    /// Abort any case after this many rewrites
    #[arg(long)]
    pub step_limit: Option<u64>,
    /// Path to a treecalc.toml
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// One conformance case: its outcome in ternary or host form, and the
/// outcome required regardless of strategy, if fixed.
struct Case {
    name: String,
    result: String,
    expected: Option<String>,
}

#[derive(Clone, Copy)]
struct Suite {
    fib: u64,
    fib_recursive: u64,
    depth: Option<usize>,
}

/// Trees the equality and round-trip cases range over.
const SAMPLES: [&str; 5] = ["0", "10", "200", programs::ID_TERNARY, programs::NOT_TERNARY];

const SUCC_INPUTS: [u64; 8] = [0, 1, 2, 3, 7, 8, 65535, 65543];

impl StrategyFn for Suite {
    type Output = Vec<Case>;

    fn call<E: Evaluator>(self, e: &mut E) -> Vec<Case> {
        let mut cases = Vec::new();
        let mut record = |name: String, result: Result<String, FormatError>, expected: Option<String>| {
            cases.push(Case {
                name,
                result: result.unwrap_or_else(|err| format!("error: {}", err)),
                expected,
            })
        };

        for rule in programs::rule_table() {
            let result = apply_ternary(e, &rule.a, &rule.b);
            record(
                format!("{} rule: {} {}", rule.rule, rule.a, rule.b),
                result,
                Some(rule.expected),
            );
        }

        for b in [false, true] {
            let result = (|| -> Result<String, FormatError> {
                let not = programs::not(e);
                let x = marshal::of_bool(e, b);
                let r = e.apply(not, x)?;
                Ok(marshal::to_bool(e, &r)?.to_string())
            })();
            record(format!("not {}", b), result, Some((!b).to_string()));
        }

        for a in SAMPLES {
            for b in SAMPLES {
                let result = (|| -> Result<String, FormatError> {
                    let equal = programs::equal(e)?;
                    let x = of_ternary(e, a)?;
                    let y = of_ternary(e, b)?;
                    Ok(programs::trees_equal(e, &equal, x, y)?.to_string())
                })();
                record(format!("equal {} {}", a, b), result, Some((a == b).to_string()));
            }
        }

        for n in SUCC_INPUTS {
            let result = (|| -> Result<String, FormatError> {
                let succ = programs::succ(e)?;
                Ok(programs::run_nat(e, succ, n)?.to_string())
            })();
            record(format!("succ {}", n), result, Some((n + 1).to_string()));
        }

        let result = (|| -> Result<String, FormatError> {
            let fib = programs::fib_linear(e)?;
            Ok(programs::run_nat(e, fib, self.fib)?.to_string())
        })();
        record(
            format!("linear fib {}", self.fib),
            result,
            Some(programs::fib(self.fib).to_string()),
        );

        let result = (|| -> Result<String, FormatError> {
            let fib = programs::fib_recursive(e)?;
            Ok(programs::run_nat(e, fib, self.fib_recursive)?.to_string())
        })();
        record(
            format!("recursive fib {}", self.fib_recursive),
            result,
            Some(programs::fib(self.fib_recursive).to_string()),
        );

        for text in SAMPLES.iter().copied().chain([programs::EQUAL_TERNARY]) {
            let short = &text[..text.len().min(12)];
            let dag = (|| -> Result<String, FormatError> {
                let t = of_ternary(e, text)?;
                let encoded = to_dag(e, &t)?;
                let back = of_dag(e, &encoded)?;
                to_ternary(e, &back)
            })();
            record(format!("dag round trip {}", short), dag, Some(text.to_string()));
            let readable = (|| -> Result<String, FormatError> {
                let t = of_ternary(e, text)?;
                let encoded = to_readable(e, &t)?;
                let back = of_readable(e, &encoded)?;
                to_ternary(e, &back)
            })();
            record(
                format!("readable round trip {}", short),
                readable,
                Some(text.to_string()),
            );
        }

        if let Some(n) = self.depth {
            let result = (|| -> Result<String, FormatError> {
                let t = programs::nested_starlings(e, n);
                let leaf = e.leaf();
                let r = e.apply(t, leaf)?;
                to_ternary(e, &r)
            })();
            record(
                format!("nested starlings {}", n),
                result,
                Some(programs::nested_starlings_result(n).to_string()),
            );
        }

        cases
    }
}

fn apply_ternary<E: Evaluator>(e: &mut E, a: &str, b: &str) -> Result<String, FormatError> {
    let a = of_ternary(e, a)?;
    let b = of_ternary(e, b)?;
    let r = e.apply(a, b)?;
    to_ternary(e, &r)
}

pub fn cmd_check(args: CheckArgs) {
    let config = super::resolve_config(args.config.as_ref(), None, args.step_limit);
    let strategies = super::selected_strategies(&args.strategy);
    let suite_for = |strategy: Strategy| Suite {
        fib: args.fib,
        fib_recursive: args.fib_recursive,
        depth: (!strategy.recursive()).then_some(args.depth),
    };

    let reference: HashMap<String, String> = Strategy::Reference
        .run(&config, suite_for(Strategy::Reference))
        .into_iter()
        .map(|c| (c.name, c.result))
        .collect();

    let results: Vec<(Strategy, Vec<Case>)> = strategies
        .par_iter()
        .map(|&strategy| (strategy, strategy.run(&config, suite_for(strategy))))
        .collect();

    let mut failed = 0usize;
    eprintln!("{:<10} {:>8} {:>8}", "Strategy", "Passed", "Failed");
    eprintln!("{}", "-".repeat(28));
    for (strategy, cases) in &results {
        let mut failures = Vec::new();
        for case in cases {
            if let Some(expected) = &case.expected {
                if &case.result != expected {
                    failures.push(format!(
                        "{}: got {}, expected {}",
                        case.name, case.result, expected
                    ));
                    continue;
                }
            }
            if let Some(r) = reference.get(&case.name) {
                if r != &case.result {
                    failures.push(format!(
                        "{}: got {}, reference evaluator gives {}",
                        case.name, case.result, r
                    ));
                }
            }
        }
        eprintln!(
            "{:<10} {:>8} {:>8}",
            strategy.name(),
            cases.len() - failures.len(),
            failures.len()
        );
        for f in &failures {
            eprintln!("  FAIL {}", f);
        }
        failed += failures.len();
    }

    if failed > 0 {
        eprintln!("\n{} case(s) failed", failed);
        process::exit(1);
    }
    eprintln!("\nOK: {} strategies conform", results.len());
}
