use std::io::Read;
use std::path::PathBuf;
use std::process;
use std::time::{Duration, Instant};

use clap::Args;

use treecalc::diagnostic::Diagnostic;
use treecalc::span::Span;
use treecalc::{decode_source, programs, Evaluator, Format, FormatError, Stats, Strategy, StrategyFn};

#[derive(Args)]
pub struct EvalArgs {
    /// Inputs applied in order to the identity program ('-' reads stdin)
    #[arg(required = true)]
    pub inputs: Vec<String>,
    /// Evaluation strategy (reference, arena, stack, lazy, memo)
    #[arg(long, short)]
    pub strategy: Option<Strategy>,
    /// Input format, or 'infer' to guess per input
    #[arg(long, default_value = "infer")]
    pub from: String,
    /// Output format (default: format of the last input)
    #[arg(long)]
    pub to: Option<Format>,
    /// Treat inputs as file paths
    #[arg(long)]
    pub file: bool,
    /// Abort after this many rewrites
    #[arg(long)]
    pub step_limit: Option<u64>,
    /// Path to a treecalc.toml
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Print reduction statistics to stderr
    #[arg(long)]
    pub stats: bool,
}

/// One input after reading, before decoding.
struct Source {
    name: String,
    text: String,
}

struct EvalRun<'a> {
    sources: &'a [Source],
    from: Option<Format>,
    to: Option<Format>,
}

struct EvalOutput {
    text: String,
    stats: Stats,
    elapsed: Duration,
}

impl StrategyFn for EvalRun<'_> {
    type Output = Result<EvalOutput, FormatError>;

    fn call<E: Evaluator>(self, e: &mut E) -> Self::Output {
        let start = Instant::now();
        let mut current = programs::id(e);
        let mut last = Format::Readable;
        for source in self.sources {
            let (value, format) = decode_source(e, &source.text, self.from, &source.name)?;
            log::debug!("{}: decoded as {}", source.name, format);
            if self.from.is_none() && format == Format::String {
                Diagnostic::warning(
                    "no tree format matches; input read as a string".to_string(),
                    Span::at(0, source.text.len()),
                )
                .with_help("pass --from to choose a format explicitly".to_string())
                .render(&source.name, &source.text);
            }
            current = e.apply(current, value)?;
            last = format;
        }
        let text = self.to.unwrap_or(last).encode(e, &current)?;
        Ok(EvalOutput {
            text,
            stats: e.stats(),
            elapsed: start.elapsed(),
        })
    }
}

pub fn cmd_eval(args: EvalArgs) {
    let from = match args.from.as_str() {
        "infer" => None,
        name => match name.parse::<Format>() {
            Ok(f) => Some(f),
            Err(e) => {
                eprintln!("error: {}", e);
                process::exit(1);
            }
        },
    };
    let config = super::resolve_config(args.config.as_ref(), args.strategy, args.step_limit);
    let sources: Vec<Source> = args
        .inputs
        .iter()
        .map(|input| read_source(input, args.file))
        .collect();

    let run = EvalRun {
        sources: &sources,
        from,
        to: args.to,
    };
    match config.strategy.run(&config, run) {
        Ok(out) => {
            println!("{}", out.text);
            if args.stats {
                eprintln!(
                    "strategy: {}  steps: {}  nodes: {}  time: {:.3}ms",
                    config.strategy,
                    out.stats.steps,
                    out.stats.nodes,
                    out.elapsed.as_secs_f64() * 1000.0
                );
            }
        }
        // already rendered against its source
        Err(FormatError::Syntax(_)) => process::exit(1),
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    }
}

fn read_source(input: &str, from_file: bool) -> Source {
    if input == "-" {
        let mut text = String::new();
        if let Err(e) = std::io::stdin().read_to_string(&mut text) {
            eprintln!("error: cannot read stdin: {}", e);
            process::exit(1);
        }
        return Source {
            name: "<stdin>".to_string(),
            text: strip_newline(text),
        };
    }
    if from_file {
        return match std::fs::read_to_string(input) {
            Ok(text) => Source {
                name: input.to_string(),
                text: strip_newline(text),
            },
            Err(e) => {
                eprintln!("error: cannot read '{}': {}", input, e);
                process::exit(1);
            }
        };
    }
    Source {
        name: "<argument>".to_string(),
        text: input.to_string(),
    }
}

fn strip_newline(mut text: String) -> String {
    while text.ends_with('\n') || text.ends_with('\r') {
        text.pop();
    }
    text
}
