use clap::{ArgAction, Parser, Subcommand};

mod cli;

#[derive(Parser)]
#[command(
    name = "treecalc",
    version,
    about = "Tree calculus evaluator: five strategies, one semantics"
)]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply each input to the identity program and print the result
    Eval(cli::eval::EvalArgs),
    /// Time the sample workloads on each strategy
    Bench(cli::bench::BenchArgs),
    /// Run the conformance suite against each strategy
    Check(cli::check::CheckArgs),
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Eval(args) => cli::eval::cmd_eval(args),
        Command::Bench(args) => cli::bench::cmd_bench(args),
        Command::Check(args) => cli::check::cmd_check(args),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    if let Err(e) = simple_logger::SimpleLogger::new().with_level(level).init() {
        eprintln!("warning: cannot initialize logging: {}", e);
    }
}
