use std::path::PathBuf;
use std::process;
use std::time::Instant;

use clap::Args;
use statrs::statistics::{Data, OrderStatistics, Statistics};
use thiserror::Error;

use treecalc::{programs, EvalError, Evaluator, FormatError, Strategy, StrategyFn};

#[derive(Args)]
pub struct BenchArgs {
    /// Strategies to time (repeatable; default: all)
    #[arg(long, short)]
    pub strategy: Vec<Strategy>,
    /// Samples per workload
    #[arg(long, default_value_t = 10)]
    pub repeat: usize,
    /// Argument of the linear Fibonacci workload
    #[arg(long, default_value_t = 90)]
    pub fib: u64,
    /// Argument of the recursive Fibonacci workload
    #[arg(long, default_value_t = 20)]
    pub fib_recursive: u64,
    /// Nesting depth of the deep-reduction workload (non-recursive strategies only)
    #[arg(long, default_value_t = 100_000)]
    pub depth: usize,
    /// Abort any sample after this many rewrites
    #[arg(long)]
    pub step_limit: Option<u64>,
    /// Path to a treecalc.toml
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Emit a JSON report on stdout instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Clone, Copy)]
enum Workload {
    /// Decode every sample program.
    Setup,
    LinearFib(u64),
    RecursiveFib(u64),
    NestedStarlings(usize),
}

impl Workload {
    fn label(self) -> String {
        match self {
            Workload::Setup => "setup".to_string(),
            Workload::LinearFib(n) => format!("linear fib {}", n),
            Workload::RecursiveFib(n) => format!("recursive fib {}", n),
            Workload::NestedStarlings(n) => format!("nested starlings {}", n),
        }
    }
}

#[derive(Debug, Error)]
enum BenchError {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Eval(#[from] EvalError),
    #[error("{workload} produced {got}, expected {want}")]
    WrongResult {
        workload: String,
        got: String,
        want: String,
    },
}

struct Sample {
    seconds: f64,
    steps: u64,
}

impl StrategyFn for Workload {
    type Output = Result<Sample, String>;

    fn call<E: Evaluator>(self, e: &mut E) -> Self::Output {
        let start = Instant::now();
        self.execute(e).map_err(|err| err.to_string())?;
        let seconds = start.elapsed().as_secs_f64();
        Ok(Sample {
            seconds,
            steps: e.stats().steps,
        })
    }
}

impl Workload {
    fn execute<E: Evaluator>(self, e: &mut E) -> Result<(), BenchError> {
        match self {
            Workload::Setup => {
                programs::succ(e)?;
                programs::equal(e)?;
                programs::fib_recursive(e)?;
                programs::fib_linear(e)?;
            }
            Workload::LinearFib(n) => {
                let fib = programs::fib_linear(e)?;
                let got = programs::run_nat(e, fib, n)?;
                self.check(got.to_string(), &programs::fib(n).to_string())?;
            }
            Workload::RecursiveFib(n) => {
                let fib = programs::fib_recursive(e)?;
                let got = programs::run_nat(e, fib, n)?;
                self.check(got.to_string(), &programs::fib(n).to_string())?;
            }
            Workload::NestedStarlings(n) => {
                let t = programs::nested_starlings(e, n);
                let leaf = e.leaf();
                let r = e.apply(t, leaf)?;
                // forces the lazy strategy too
                let text = treecalc::format::to_ternary(e, &r)?;
                self.check(text, programs::nested_starlings_result(n))?;
            }
        }
        Ok(())
    }

    fn check(self, got: String, want: &str) -> Result<(), BenchError> {
        if got == want {
            return Ok(());
        }
        Err(BenchError::WrongResult {
            workload: self.label(),
            got,
            want: want.to_string(),
        })
    }
}

/// Summary of one (strategy, workload) cell.
struct Summary {
    strategy: Strategy,
    workload: String,
    min: f64,
    max: f64,
    mean: f64,
    median: f64,
    steps: u64,
}

fn summarize(strategy: Strategy, workload: Workload, samples: &[Sample]) -> Summary {
    let seconds: Vec<f64> = samples.iter().map(|s| s.seconds).collect();
    let min: f64 = Statistics::min(seconds.iter());
    let max: f64 = Statistics::max(seconds.iter());
    let mean: f64 = Statistics::mean(seconds.iter());
    let mut data = Data::new(seconds);
    Summary {
        strategy,
        workload: workload.label(),
        min,
        max,
        mean,
        median: data.median(),
        steps: samples.last().map_or(0, |s| s.steps),
    }
}

pub fn cmd_bench(args: BenchArgs) {
    if args.repeat == 0 {
        eprintln!("error: --repeat must be at least 1");
        process::exit(1);
    }
    let config = super::resolve_config(args.config.as_ref(), None, args.step_limit);
    let strategies = super::selected_strategies(&args.strategy);

    let mut summaries = Vec::new();
    for strategy in strategies {
        let mut workloads = vec![
            Workload::Setup,
            Workload::LinearFib(args.fib),
            Workload::RecursiveFib(args.fib_recursive),
        ];
        if !strategy.recursive() {
            workloads.push(Workload::NestedStarlings(args.depth));
        }
        for workload in workloads {
            log::info!("{}: {}", strategy, workload.label());
            let mut samples = Vec::with_capacity(args.repeat);
            for _ in 0..args.repeat {
                match strategy.run(&config, workload) {
                    Ok(sample) => samples.push(sample),
                    Err(e) => {
                        eprintln!("error: {} on {}: {}", workload.label(), strategy, e);
                        process::exit(1);
                    }
                }
            }
            summaries.push(summarize(strategy, workload, &samples));
        }
    }

    if args.json {
        println!("{}", json_report(&summaries));
    } else {
        print_table(&summaries, args.repeat);
    }
}

fn print_table(summaries: &[Summary], repeat: usize) {
    println!("Benchmark: {} samples per workload (in seconds)", repeat);
    println!(
        "{:<10} {:<26} {:>10} {:>10} {:>10} {:>10} {:>12}",
        "Strategy", "Workload", "Min", "Max", "Average", "Median", "Steps"
    );
    println!("{}", "-".repeat(94));
    for s in summaries {
        println!(
            "{:<10} {:<26} {:>10.6} {:>10.6} {:>10.6} {:>10.6} {:>12}",
            s.strategy.name(),
            s.workload,
            s.min,
            s.max,
            s.mean,
            s.median,
            s.steps
        );
    }
}

fn json_report(summaries: &[Summary]) -> String {
    let rows: Vec<String> = summaries
        .iter()
        .map(|s| {
            format!(
                "  {{\"strategy\": \"{}\", \"workload\": \"{}\", \"min\": {}, \"max\": {}, \"mean\": {}, \"median\": {}, \"steps\": {}}}",
                s.strategy.name(),
                s.workload,
                s.min,
                s.max,
                s.mean,
                s.median,
                s.steps
            )
        })
        .collect();
    format!("[\n{}\n]", rows.join(",\n"))
}
